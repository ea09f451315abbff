use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::context;
use crate::cli::output::{to_json, OutputOptions};
use crate::cli::renderer;
use crate::core::config::AppConfig;
use crate::core::input::parse_usage;
use crate::core::models::projection::Projection;
use crate::core::projector::ProjectionError;
use crate::core::session::{FlushSummary, Session, Tracked};
use crate::core::store::StoreKind;

#[derive(Serialize)]
pub struct ReportPayload {
    pub store: StoreKind,
    pub location: String,
    pub used: Tracked<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_recorded_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Projection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<FlushSummary>,
}

impl ReportPayload {
    pub fn new(session: &Session, outcome: &Result<Projection, ProjectionError>) -> Self {
        let (projection, error) = match outcome {
            Ok(p) => (Some(p.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            store: session.store_kind(),
            location: session.location(),
            used: session.used(),
            last_recorded_day: session.snapshot().last_day,
            projection,
            error,
            saved: None,
        }
    }
}

/// Recompute against the current clock and config.
pub fn recompute(session: &mut Session, config: &AppConfig) -> Result<Projection, ProjectionError> {
    let now = context::now();
    session
        .recompute(config.quota.total_gb, &now, config.quota.rounding())
        .cloned()
}

/// Text form of a projection outcome.
pub fn render_text(
    session: &Session,
    outcome: &Result<Projection, ProjectionError>,
    use_color: bool,
) -> String {
    match outcome {
        Ok(p) => renderer::render_report(p, &session.location(), use_color),
        Err(e) => renderer::render_projection_error(e, &session.location(), use_color),
    }
}

pub fn describe_flush(session: &Session, summary: &FlushSummary) -> String {
    let mut text = format!("Saved to {}", session.location());
    if !summary.samples.is_empty() {
        text.push_str(&format!(" ({} day", summary.samples.len()));
        if summary.samples.len() != 1 {
            text.push('s');
        }
        if summary.interpolated() > 0 {
            text.push_str(&format!(", {} interpolated", summary.interpolated()));
        }
        text.push(')');
    }
    text
}

pub async fn run(
    config_path: Option<&Path>,
    used: Option<String>,
    no_save: bool,
    no_fill: bool,
    opts: &OutputOptions,
) -> Result<()> {
    let config = context::load_config(config_path)?;
    let now = context::now();
    let mut session = context::open_session(&config, &now).await?;

    if let Some(text) = used {
        match parse_usage(&text) {
            Ok(value) => session.set_used(value),
            Err(e) => {
                tracing::warn!(input = %text, error = %e, "rejected bandwidth used");
                eprintln!(
                    "Warning: {}. Keeping stored value {} GB.",
                    e,
                    session.used().current
                );
            }
        }
    }

    let outcome = session
        .recompute(config.quota.total_gb, &now, config.quota.rounding())
        .cloned();

    let saved = if no_save {
        None
    } else {
        let fill = config.history.fill_missing_days && !no_fill;
        Some(session.flush(fill).await.context("failed to save settings")?)
    };

    if opts.is_json() {
        let mut payload = ReportPayload::new(&session, &outcome);
        payload.saved = saved;
        println!("{}", to_json(&payload, opts.pretty)?);
    } else {
        println!("{}", render_text(&session, &outcome, opts.use_color));
        if let (Some(summary), true) = (&saved, opts.verbose) {
            eprintln!("{}", describe_flush(&session, summary));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::history::DailySample;
    use crate::core::store::LocalStore;
    use chrono::NaiveDate;

    async fn local_session(dir: &Path) -> Session {
        let store = LocalStore::open(dir.join("settings.json")).unwrap();
        let today = NaiveDate::from_ymd_opt(2023, 6, 16).unwrap();
        Session::load(Box::new(store), "/bw", today).await.unwrap()
    }

    fn sample(day: u32, interpolated: bool) -> DailySample {
        DailySample {
            day,
            value: 40.0,
            interpolated,
        }
    }

    #[tokio::test]
    async fn flush_description_counts_days() {
        let dir = tempfile::tempdir().unwrap();
        let session = local_session(dir.path()).await;

        let nothing = FlushSummary::default();
        assert!(describe_flush(&session, &nothing).starts_with("Saved to local file"));
        assert!(!describe_flush(&session, &nothing).contains('('));

        let filled = FlushSummary {
            samples: vec![sample(14, true), sample(15, true), sample(16, false)],
            bounds_written: false,
        };
        assert!(describe_flush(&session, &filled).ends_with("(3 days, 2 interpolated)"));
    }

    #[tokio::test]
    async fn payload_carries_error_instead_of_projection() {
        let dir = tempfile::tempdir().unwrap();
        let session = local_session(dir.path()).await;
        let outcome = Err(ProjectionError::MonthBoundary {
            year: 2023,
            month: 6,
        });
        let payload = ReportPayload::new(&session, &outcome);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("projection").is_none());
        assert!(json["error"].as_str().unwrap().contains("undefined"));
        assert_eq!(json["store"], "local");
        assert!(json.get("last_recorded_day").is_none());
    }
}
