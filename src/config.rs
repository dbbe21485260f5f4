use crate::errors::{AppError, AppResult};
use crate::factory::FixtureMode;
use crate::store::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "AISEO_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    pub storage_key: String,
    pub fixture_mode: FixtureMode,
    pub delivery: DeliveryMode,
    pub report_endpoint: Option<String>,
    pub api_key: Option<String>,
    pub bind: String,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".ai-seo-audit"),
            storage: StorageBackend::Sqlite,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            fixture_mode: FixtureMode::Randomized,
            delivery: DeliveryMode::Local,
            report_endpoint: None,
            api_key: None,
            bind: "127.0.0.1:54321".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file (when it exists), then `AISEO_*` variables.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) if path.is_file() => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> AppResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(value) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("STORAGE") {
            self.storage = parse_enum("STORAGE", &value)?;
        }
        if let Some(value) = lookup("STORAGE_KEY") {
            self.storage_key = value;
        }
        if let Some(value) = lookup("FIXTURE_MODE") {
            self.fixture_mode = parse_enum("FIXTURE_MODE", &value)?;
        }
        if let Some(value) = lookup("DELIVERY") {
            self.delivery = parse_enum("DELIVERY", &value)?;
        }
        if let Some(value) = lookup("REPORT_ENDPOINT") {
            self.report_endpoint = Some(value).filter(|v| !v.trim().is_empty());
        }
        if let Some(value) = lookup("API_KEY") {
            self.api_key = Some(value).filter(|v| !v.trim().is_empty());
        }
        if let Some(value) = lookup("BIND") {
            self.bind = value;
        }
        if let Some(value) = lookup("LOG") {
            self.log_filter = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.storage_key.trim().is_empty() {
            return Err(AppError::Validation("storageKey cannot be empty".to_string()));
        }
        if self.delivery == DeliveryMode::Remote && self.report_endpoint.is_none() {
            return Err(AppError::Validation(
                "reportEndpoint is required when delivery is remote".to_string(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("audit.db")
    }

    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_enum<T: for<'de> Deserialize<'de>>(name: &str, value: &str) -> AppResult<T> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_ascii_lowercase())).map_err(|_| {
        AppError::Validation(format!("Unsupported value for {}{}: {}", ENV_PREFIX, name, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn yaml_overrides_only_listed_fields() {
        let config = AppConfig::from_yaml("dataDir: /tmp/audit\nfixtureMode: demo\n").expect("yaml");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/audit"));
        assert_eq!(config.fixture_mode, FixtureMode::Demo);
        assert_eq!(config.storage, StorageBackend::Sqlite);
        assert_eq!(config.storage_key, "aiseo_audit_data");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/audit/audit.db"));
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml("  \n").expect("empty"), AppConfig::default());
    }

    #[test]
    fn env_wins_over_file_values() {
        let mut config = AppConfig::from_yaml("storage: sqlite\nbind: 0.0.0.0:1\n").expect("yaml");
        config
            .apply_env(env(&[
                ("STORAGE", "Memory"),
                ("DELIVERY", "remote"),
                ("REPORT_ENDPOINT", "http://localhost:9/functions/v1/generate-report"),
                ("API_KEY", ""),
            ]))
            .expect("env");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.delivery, DeliveryMode::Remote);
        assert_eq!(config.bind, "0.0.0.0:1");
        assert_eq!(config.api_key, None);
        config.validate().expect("remote with endpoint is valid");
    }

    #[test]
    fn rejects_unknown_env_enum() {
        let mut config = AppConfig::default();
        let error = config.apply_env(env(&[("STORAGE", "redis")])).expect_err("unknown backend");
        assert!(error.to_string().contains("AISEO_STORAGE"));
    }

    #[test]
    fn remote_delivery_requires_endpoint() {
        let config = AppConfig {
            delivery: DeliveryMode::Remote,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_falls_back_to_defaults_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.yaml");
        let config = AppConfig::load(Some(&path)).expect("load");
        assert_eq!(config.bind, AppConfig::default().bind);
    }
}
