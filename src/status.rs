// Status display — which ledger is in use and how much it holds.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::ledger;

/// Display ledger and configuration status to the terminal.
pub fn show(config: &Config) -> Result<()> {
    let path = &config.ledger_path;

    if !Path::new(path).exists() {
        println!("Ledger: {} (not created yet)", path.display());
        println!("\nIt is created by the first `skycurate repost` run.");
    } else {
        let ledger = ledger::open_ledger(path)?;
        let file_size = std::fs::metadata(path)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!(
            "Ledger: {} ({}, {} backend)",
            path.display(),
            file_size,
            ledger.backend()
        );
        println!("Reposted posts recorded: {}", ledger.len());
    }

    println!("Service: {}", config.service_url);
    match &config.feed_uri {
        Some(uri) => println!("Default feed: {uri}"),
        None => println!("Default feed: not set (SKYCURATE_FEED_URI)"),
    }
    match &config.list_uri {
        Some(uri) => println!("Default list: {uri}"),
        None => println!("Default list: not set (SKYCURATE_LIST_URI)"),
    }
    if config.require_credentials().is_err() {
        println!("Credentials: missing (BLUESKY_HANDLE / BLUESKY_APP_PASSWORD)");
    } else {
        println!("Credentials: configured for @{}", config.bluesky_handle);
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
