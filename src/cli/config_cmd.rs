use std::path::Path;

use anyhow::Result;

use crate::cli::context::config_location;
use crate::cli::output::{to_json, OutputOptions};
use crate::core::config::AppConfig;

pub fn init(config_path: Option<&Path>, _opts: &OutputOptions) -> Result<()> {
    let path = config_location(config_path);
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save(&path) {
        Ok(()) => {
            println!("Generated config at {}", path.display());
            println!("  Set quota.total_gb to your monthly cap and store.endpoints to your settings servers.");
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn path(config_path: Option<&Path>, _opts: &OutputOptions) -> Result<()> {
    println!("{}", config_location(config_path).display());
    Ok(())
}

pub fn check(config_path: Option<&Path>, opts: &OutputOptions) -> Result<()> {
    let path = config_location(config_path);
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `bwcalc config init` to create one.");
        std::process::exit(1);
    }

    let config = match AppConfig::load(Some(&path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if opts.is_json() {
        let payload = serde_json::json!({
            "path": path,
            "valid": issues.is_empty(),
            "issues": issues,
            "config": config,
        });
        println!("{}", to_json(&payload, opts.pretty)?);
        if !issues.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    if issues.is_empty() {
        println!("Config is valid: {}", path.display());
        println!("  Monthly quota: {} GB", config.quota.total_gb);
        if config.store.endpoints.is_empty() {
            println!("  No endpoints configured, local store only.");
        } else {
            println!("  Endpoints: {}", config.store.endpoints.join(", "));
        }
    } else {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}
