use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::projector::RoundingPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No config file at {0} (run `bwcalc config init` to create one)")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Monthly bandwidth cap in GB
    #[serde(default = "default_total_gb")]
    pub total_gb: f64,
    /// Decimals kept for the cumulative allowance; 0 rounds to whole GB
    #[serde(default)]
    pub allowed_precision: u32,
}

fn default_total_gb() -> f64 {
    1229.0
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            total_gb: default_total_gb(),
            allowed_precision: 0,
        }
    }
}

impl QuotaConfig {
    pub fn rounding(&self) -> RoundingPolicy {
        RoundingPolicy::from_precision(self.allowed_precision)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Networked store endpoints as "host:port", probed in order
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_base_key")]
    pub base_key: String,
    /// Request timeout for the networked store, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// PEM file holding the client certificate and private key
    pub cert_path: Option<PathBuf>,
    /// PEM file with an extra root certificate for the server
    pub ca_path: Option<PathBuf>,
    /// Location of the local fallback store
    pub local_path: Option<PathBuf>,
}

fn default_base_key() -> String {
    "/bwcalc".to_string()
}
fn default_timeout_secs() -> u64 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            base_key: default_base_key(),
            timeout_secs: default_timeout_secs(),
            cert_path: None,
            ca_path: None,
            local_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Interpolate days the program was not run on
    #[serde(default = "default_true")]
    pub fill_missing_days: bool,
}

fn default_true() -> bool {
    true
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fill_missing_days: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("bwcalc").join("config.toml")
    }

    /// Load config from `path`, or the default location when `None`.
    /// A missing file is an error: the quota total has no sensible default.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Serialize and write this config to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.quota.total_gb.is_finite() || self.quota.total_gb <= 0.0 {
            issues.push(format!(
                "Invalid quota.total_gb: {} (must be a positive number)",
                self.quota.total_gb
            ));
        }
        if self.quota.allowed_precision > 6 {
            issues.push(format!(
                "Invalid quota.allowed_precision: {} (must be 0-6)",
                self.quota.allowed_precision
            ));
        }
        if self.store.base_key.trim_matches('/').is_empty() {
            issues.push("store.base_key must not be empty".to_string());
        }
        if self.store.timeout_secs == 0 {
            issues.push("store.timeout_secs must be at least 1".to_string());
        }
        for endpoint in &self.store.endpoints {
            if split_endpoint(endpoint).is_none() {
                issues.push(format!(
                    "Invalid endpoint: '{}' (must be host:port)",
                    endpoint
                ));
            }
        }
        for (field, path) in [
            ("cert_path", &self.store.cert_path),
            ("ca_path", &self.store.ca_path),
        ] {
            if let Some(p) = path {
                if !p.is_file() {
                    issues.push(format!("store.{} does not exist: {}", field, p.display()));
                }
            }
        }
        issues
    }
}

/// Split "host:port" into its parts. The port must be numeric.
pub fn split_endpoint(endpoint: &str) -> Option<(&str, u16)> {
    let (host, port) = endpoint.rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Default config should be valid, got: {:?}", issues);
    }

    #[test]
    fn default_rounding_is_whole_gb() {
        let config = AppConfig::default();
        assert_eq!(config.quota.rounding(), RoundingPolicy::WholeGb);
    }

    #[test]
    fn default_fills_missing_days() {
        assert!(HistoryConfig::default().fill_missing_days);
    }

    #[test]
    fn validate_catches_non_positive_total() {
        let mut config = AppConfig::default();
        config.quota.total_gb = 0.0;
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("total_gb")));
    }

    #[test]
    fn validate_catches_bad_endpoint() {
        let mut config = AppConfig::default();
        config.store.endpoints = vec!["10.0.0.5".to_string(), "10.0.0.6:2379".to_string()];
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("10.0.0.5"));
    }

    #[test]
    fn validate_catches_empty_base_key() {
        let mut config = AppConfig::default();
        config.store.base_key = "/".to_string();
        assert!(config.validate().iter().any(|i| i.contains("base_key")));
    }

    #[test]
    fn validate_catches_missing_cert() {
        let mut config = AppConfig::default();
        config.store.cert_path = Some(PathBuf::from("/definitely/not/here.pem"));
        assert!(config.validate().iter().any(|i| i.contains("cert_path")));
    }

    #[test]
    fn split_endpoint_forms() {
        assert_eq!(split_endpoint("10.150.30.17:2379"), Some(("10.150.30.17", 2379)));
        assert_eq!(split_endpoint("etcd.local:443"), Some(("etcd.local", 443)));
        assert_eq!(split_endpoint("[::1]:2379"), Some(("::1", 2379)));
        assert_eq!(split_endpoint("nohost"), None);
        assert_eq!(split_endpoint(":2379"), None);
        assert_eq!(split_endpoint("host:port"), None);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[quota]
total_gb = 500.5
allowed_precision = 2

[store]
endpoints = ["10.150.30.17:2379"]
base_key = "/nate/CalcBandwidth"
timeout_secs = 3

[history]
fill_missing_days = false
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.quota.total_gb, 500.5);
        assert_eq!(config.quota.rounding(), RoundingPolicy::Decimals(2));
        assert_eq!(config.store.endpoints, vec!["10.150.30.17:2379"]);
        assert_eq!(config.store.base_key, "/nate/CalcBandwidth");
        assert_eq!(config.store.timeout_secs, 3);
        assert!(config.store.cert_path.is_none());
        assert!(!config.history.fill_missing_days);
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.quota.total_gb, 1229.0);
        assert_eq!(config.store.base_key, "/bwcalc");
        assert!(config.store.endpoints.is_empty());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn load_unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[quota\ntotal_gb = ").unwrap();
        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.quota.total_gb = 750.0;
        config.store.endpoints = vec!["127.0.0.1:2379".to_string()];
        config.save(&path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.quota.total_gb, 750.0);
        assert_eq!(loaded.store.endpoints, vec!["127.0.0.1:2379"]);
    }

    #[test]
    fn config_path_uses_xdg_when_set() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test_xdg_config");
        let path = AppConfig::config_path();
        std::env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(path, PathBuf::from("/tmp/test_xdg_config/bwcalc/config.toml"));
    }
}
