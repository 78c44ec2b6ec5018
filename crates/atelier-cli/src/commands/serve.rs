//! Run the HTTP server

use anyhow::{Context, Result};
use atelier_gen::orchestrator::RunSettings;
use atelier_gen::ThreadSleeper;
use atelier_server::AppState;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

pub fn run(host: &str, port: u16, provider: Option<&str>) -> Result<()> {
    let config = super::load_config()?;
    let (service, credentials) = super::service_for(provider, &config)?;

    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid host '{}'", host))?;
    let addr = SocketAddr::new(ip, port);

    let state = AppState::new(
        service,
        credentials,
        Arc::new(ThreadSleeper),
        RunSettings::from_config(&config.generation),
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    println!("Listening on http://{}", addr);
    runtime
        .block_on(atelier_server::serve(addr, state))
        .context("Server error")
}
