use std::path::Path;

use anyhow::{Context, Result};
use colored::{control, Colorize};
use serde::Serialize;

use crate::cli::context;
use crate::cli::output::{print_notices, to_json, OutputOptions};
use crate::core::store::probe::{self, ProbeResult};
use crate::core::store::{self, StoreKind};

#[derive(Serialize)]
struct ProbePayload {
    endpoints: Vec<ProbeResult>,
    selected: StoreKind,
    location: String,
}

fn render(payload: &ProbePayload, use_color: bool) -> String {
    control::set_override(use_color);
    let mut lines = vec![" Settings servers".bold().to_string()];
    if payload.endpoints.is_empty() {
        lines.push(format!("  {}", "No endpoints configured".dimmed()));
    }
    for result in &payload.endpoints {
        let state = if result.reachable {
            "reachable".green()
        } else {
            "unreachable".red()
        };
        lines.push(format!("  {:<24} {}", result.endpoint.cyan(), state));
    }
    lines.push(format!("  {}  {}", "Using".cyan(), payload.location));
    lines.join("\n")
}

/// Probe every endpoint, then report which backend a session would use.
pub async fn run(config_path: Option<&Path>, opts: &OutputOptions) -> Result<()> {
    let config = context::load_config(config_path)?;
    let endpoints = probe::probe_all(&config.store.endpoints, probe::PROBE_TIMEOUT).await;
    let selection = store::select_backend(&config.store)
        .await
        .context("failed to open the settings store")?;

    let payload = ProbePayload {
        endpoints,
        selected: selection.store.kind(),
        location: selection.store.location(),
    };

    if let Some(notice) = selection.notice {
        print_notices(&[notice]);
    }
    if opts.is_json() {
        println!("{}", to_json(&payload, opts.pretty)?);
    } else {
        println!("{}", render(&payload, opts.use_color));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_marks_each_endpoint() {
        let payload = ProbePayload {
            endpoints: vec![
                ProbeResult {
                    endpoint: "10.0.0.5:2379".to_string(),
                    reachable: false,
                },
                ProbeResult {
                    endpoint: "10.0.0.6:2379".to_string(),
                    reachable: true,
                },
            ],
            selected: StoreKind::Networked,
            location: "etcd at 10.0.0.6:2379".to_string(),
        };
        let output = render(&payload, false);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[1].contains("10.0.0.5:2379") && lines[1].ends_with("unreachable"));
        assert!(lines[2].contains("10.0.0.6:2379") && lines[2].ends_with(" reachable"));
        assert!(output.contains("Using  etcd at 10.0.0.6:2379"));
        assert!(!output.contains('\x1b'));
    }
}
