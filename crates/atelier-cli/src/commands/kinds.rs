//! List asset kinds

use anyhow::Result;
use atelier_gen::AssetKind;

pub fn run() -> Result<()> {
    println!("{:<14} {:<10} {}", "KIND", "OUTPUT", "BACKGROUND");
    for kind in AssetKind::ALL {
        let output = if kind.is_motion() { "video" } else { "image" };
        let background = if kind.strips_background() {
            "transparent"
        } else {
            "kept"
        };
        println!("{:<14} {:<10} {}", kind.as_str(), output, background);
    }
    Ok(())
}
