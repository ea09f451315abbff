use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::context;
use crate::cli::output::{to_json, OutputOptions};
use crate::cli::renderer;
use crate::core::chart::BoundsOverride;
use crate::core::input::parse_gb;

/// Parse an optional bound; bad numbers are reported and ignored.
fn parse_bound(name: &str, text: Option<String>) -> Option<f64> {
    let text = text?;
    match parse_gb(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(bound = name, input = %text, error = %e, "rejected chart bound");
            eprintln!("Warning: ignoring --{}: {}", name, e);
            None
        }
    }
}

/// Show this month's per-day history. Given bounds are validated against
/// the data and persisted.
pub async fn show(
    config_path: Option<&Path>,
    min: Option<String>,
    max: Option<String>,
    opts: &OutputOptions,
) -> Result<()> {
    let config = context::load_config(config_path)?;
    let now = context::now();
    let mut session = context::open_session(&config, &now).await?;

    let requested = BoundsOverride {
        min: parse_bound("min", min),
        max: parse_bound("max", max),
    };

    let data = if requested.min.is_some() || requested.max.is_some() {
        let data = session.set_chart_bounds(requested);
        session
            .flush(false)
            .await
            .context("failed to save chart bounds")?;
        data
    } else {
        session.chart(BoundsOverride::default())
    };

    if opts.is_json() {
        println!("{}", to_json(&data, opts.pretty)?);
    } else {
        println!("{}", renderer::render_chart(&data, opts.use_color));
    }
    Ok(())
}

/// Remove the most recent day of history.
pub async fn delete_last(config_path: Option<&Path>, opts: &OutputOptions) -> Result<()> {
    let config = context::load_config(config_path)?;
    let now = context::now();
    let mut session = context::open_session(&config, &now).await?;

    let deleted = session
        .delete_latest_day()
        .await
        .context("failed to delete history")?;

    if opts.is_json() {
        let payload = serde_json::json!({ "deleted": deleted });
        println!("{}", to_json(&payload, opts.pretty)?);
    } else {
        match deleted {
            Some(day) => println!("Deleted day {} from {}", day, session.location()),
            None => println!("No history recorded this month."),
        }
    }
    Ok(())
}
