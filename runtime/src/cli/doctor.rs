//! Environment readiness check.

use super::output;
use crate::config::{Config, CONFIG_ENV, DEFAULT_CONFIG_FILE};
use crate::renderer::chromium::{find_chromium, CHROMIUM_PATH_ENV};
use anyhow::Result;
use std::path::Path;

/// Check Chromium availability and the effective configuration.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let chromium = find_chromium();
    let config = Config::load(config_path);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium,
            "config_ok": config.is_ok(),
            "config_error": config.as_ref().err().map(|e| e.to_string()),
            "rules_version": config.as_ref().ok().map(|c| c.rules.version),
            "ready": chromium.is_some() && config.is_ok(),
        }));
        return Ok(());
    }

    println!("SocialCheck Doctor");
    println!("==================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Install Chrome or set {CHROMIUM_PATH_ENV}."),
    }

    match &config {
        Ok(c) => {
            let source = match config_path {
                Some(p) => p.display().to_string(),
                None => std::env::var(CONFIG_ENV)
                    .ok()
                    .filter(|p| !p.is_empty())
                    .or_else(|| Path::new(DEFAULT_CONFIG_FILE).exists().then(|| DEFAULT_CONFIG_FILE.to_string()))
                    .unwrap_or_else(|| "built-in defaults".to_string()),
            };
            println!("[OK] Config: {source} (rules v{})", c.rules.version);
            println!(
                "     {} keyword(s), concurrency {}, {} session(s)",
                c.keywords.len(),
                c.concurrency,
                c.sessions
            );
        }
        Err(e) => println!("[!!] Config invalid: {e}"),
    }

    println!();
    if chromium.is_some() && config.is_ok() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
