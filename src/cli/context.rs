use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use crate::cli::output::print_notices;
use crate::core::config::AppConfig;
use crate::core::session::Session;

/// Resolve the config location: `--config` if given, else the XDG default.
pub fn config_location(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::config_path)
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = AppConfig::load(path).context("cannot start without a config file")?;
    for issue in config.validate() {
        tracing::warn!(%issue, "config issue");
    }
    Ok(config)
}

/// Open the session for `now`, printing any backend notices to stderr.
pub async fn open_session(config: &AppConfig, now: &NaiveDateTime) -> Result<Session> {
    let (session, mut notices) = Session::open(config, now.date())
        .await
        .context("failed to open the settings store")?;
    if session.rolled_over() {
        notices.push("New month: last month's daily history was cleared.".to_string());
    }
    print_notices(&notices);
    Ok(session)
}

/// Local wall-clock time; every projection is measured against it.
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
