pub mod etcd;
pub mod local;
pub mod probe;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::config::StoreConfig;

pub use etcd::EtcdStore;
pub use local::LocalStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access local settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Local settings at {path} are corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to load TLS material from {path}: {message}")]
    Tls { path: PathBuf, message: String },
    #[error("Request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} rejected the request (HTTP {status}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("Unexpected response from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Local,
    Networked,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Networked => write!(f, "networked"),
        }
    }
}

/// Flat string key/value persistence for session settings.
#[async_trait]
pub trait SettingsStore: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> StoreKind;

    /// Where the values live, for display ("etcd at 10.0.0.5:2379").
    fn location(&self) -> String;

    /// Every entry whose key starts with `prefix`, keyed by full key.
    async fn get_prefix(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Key layout under the configured base key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsKeys {
    base: String,
}

impl SettingsKeys {
    pub fn new(base_key: &str) -> Self {
        Self {
            base: base_key.trim_end_matches('/').to_string(),
        }
    }

    /// Prefix covering every setting, with the trailing separator.
    pub fn all(&self) -> String {
        format!("{}/", self.base)
    }

    pub fn current_used(&self) -> String {
        format!("{}/bwCurrentUsed", self.base)
    }

    pub fn per_day_remaining(&self) -> String {
        format!("{}/bwPerDayRemaining", self.base)
    }

    pub fn month_of_year(&self) -> String {
        format!("{}/monthOfYear", self.base)
    }

    pub fn chart_min(&self) -> String {
        format!("{}/bwMin", self.base)
    }

    pub fn chart_max(&self) -> String {
        format!("{}/bwMax", self.base)
    }

    pub fn day_prefix(&self) -> String {
        format!("{}/dayOfMonth/", self.base)
    }

    pub fn day(&self, label: &str) -> String {
        format!("{}{}", self.day_prefix(), label)
    }
}

/// The backend chosen at startup plus any notice for the user.
#[derive(Debug)]
pub struct Selection {
    pub store: Box<dyn SettingsStore>,
    pub notice: Option<String>,
}

/// Probe the configured endpoints and pick a backend.
///
/// The first reachable endpoint selects the networked store. When none
/// answers, or its client cannot be built, the local store is used and a
/// notice explains why. Failing to open the local store is fatal.
pub async fn select_backend(config: &StoreConfig) -> Result<Selection, StoreError> {
    if config.endpoints.is_empty() {
        tracing::debug!("no endpoints configured, using local store");
        return Ok(Selection {
            store: Box::new(open_local(config)?),
            notice: None,
        });
    }

    let notice = match probe::first_reachable(&config.endpoints, probe::PROBE_TIMEOUT).await {
        Some(endpoint) => match EtcdStore::connect(&endpoint, config) {
            Ok(store) => {
                tracing::info!(%endpoint, "using networked settings store");
                return Ok(Selection {
                    store: Box::new(store),
                    notice: None,
                });
            }
            Err(e) => format!(
                "Cannot use settings server {}: {}. Using local fallback.",
                endpoint, e
            ),
        },
        None => "Unable to reach settings servers, using local fallback.".to_string(),
    };

    tracing::warn!("{}", notice);
    Ok(Selection {
        store: Box::new(open_local(config)?),
        notice: Some(notice),
    })
}

pub fn open_local(config: &StoreConfig) -> Result<LocalStore, StoreError> {
    let path = config
        .local_path
        .clone()
        .unwrap_or_else(local::default_path);
    LocalStore::open(path)
}

pub fn request_timeout(config: &StoreConfig) -> Duration {
    Duration::from_secs(config.timeout_secs.max(1))
}
