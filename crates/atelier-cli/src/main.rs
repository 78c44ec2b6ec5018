//! Atelier CLI - themed asset batch generation from the command line

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{generate, kinds, quota, serve, variations};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Generate themed batches of stickers, renders, and animations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a batch of assets from one prompt and export them
    Generate {
        /// Theme prompt (e.g., "red balloon")
        prompt: String,

        /// Asset kind (see `atelier kinds`)
        #[arg(long, short, default_value = "sticker")]
        kind: String,

        /// Number of variations (defaults to generation.variation_count)
        #[arg(long, short)]
        count: Option<usize>,

        /// Provider to use (gemini, mock)
        #[arg(long)]
        provider: Option<String>,

        /// Output directory
        #[arg(long, short, default_value = "atelier-output")]
        output: String,

        /// Image format for static assets (png, jpeg, webp)
        #[arg(long, default_value = "png")]
        format: String,
    },

    /// Print the variation prompts for a theme without generating assets
    Variations {
        /// Theme prompt
        prompt: String,

        /// Asset kind the variations are for
        #[arg(long, short, default_value = "sticker")]
        kind: String,

        /// Number of variations
        #[arg(long, short, default_value = "10")]
        count: usize,

        /// Provider to use (gemini, mock)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Provider to use (gemini, mock)
        #[arg(long)]
        provider: Option<String>,
    },

    /// Show today's generation quota
    Quota,

    /// List asset kinds
    Kinds,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            prompt,
            kind,
            count,
            provider,
            output,
            format,
        } => generate::run(&prompt, &kind, count, provider.as_deref(), &output, &format),
        Commands::Variations {
            prompt,
            kind,
            count,
            provider,
        } => variations::run(&prompt, &kind, count, provider.as_deref()),
        Commands::Serve {
            host,
            port,
            provider,
        } => serve::run(&host, port, provider.as_deref()),
        Commands::Quota => quota::run(),
        Commands::Kinds => kinds::run(),
    }
}
