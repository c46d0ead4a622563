use crate::settings::{Settings, SourceKind};
use anyhow::Result;
use std::path::Path;

/// Prints the effective, validated configuration.
pub fn run(path: &Path, settings: &Settings) -> Result<()> {
    let config = settings.update_config()?;

    println!("config: {}", path.display());
    if !path.exists() {
        println!("  (file not found, using defaults)");
    }
    println!();
    println!("schedule");
    println!("  {:<20} {:?}", "data interval:", config.data_interval);
    println!("  {:<20} {:?}", "interface interval:", config.interface_interval);
    println!("  {:<20} {:?}", "poll interval:", config.poll_interval);
    println!("  {:<20} {}", "waiting strategy:", config.waiting_strategy.as_str());
    println!();
    println!("source");
    match settings.source.kind {
        SourceKind::Command => {
            println!("  {:<20} {}", "command:", settings.source.command.join(" "));
        }
        SourceKind::Http => {
            println!(
                "  {:<20} {}",
                "url:",
                settings.source.url.as_deref().unwrap_or_default()
            );
        }
    }
    println!("  {:<20} {}s", "timeout:", settings.source.timeout_secs);
    Ok(())
}
