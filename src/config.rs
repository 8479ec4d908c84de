use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::compression::CompressionLevel;
use crate::layout::DEFAULT_LAYOUT;

/// Push request timeout when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main lokiship configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub loki: LokiConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// A label attached to every event, rendered from a layout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetLabel {
    pub name: String,
    pub layout: String,
}

impl TargetLabel {
    pub fn new(name: impl Into<String>, layout: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: layout.into(),
        }
    }
}

/// Loki target settings. String settings may contain layout tokens such as
/// `${environment:LOKI_HOST}`; they are rendered once when the transport is created.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LokiConfig {
    /// Base URI of the Loki server (http or https)
    pub endpoint: Option<String>,
    /// Sent as `X-Scope-OrgID`
    pub tenant: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub proxy_url: Option<String>,
    /// `user` or `domain\user`
    pub proxy_user: Option<String>,
    pub proxy_password: Option<String>,
    /// Sort each stream by timestamp before sending. Needed before Loki 2.4, which
    /// rejected out-of-order writes.
    pub order_writes: bool,
    /// Upper bound on one push request, connect through response
    pub timeout_secs: u64,
    pub compression: CompressionLevel,
    /// Turn every record property into a label. Can create many streams; use with care.
    pub event_properties_as_labels: bool,
    pub labels: Vec<TargetLabel>,
    /// Layout of the pushed line
    pub layout: String,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            tenant: None,
            username: None,
            password: None,
            proxy_url: None,
            proxy_user: None,
            proxy_password: None,
            order_writes: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            compression: CompressionLevel::default(),
            event_properties_as_labels: false,
            labels: Vec::new(),
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}

impl LokiConfig {
    /// Copy with secrets replaced, for display
    pub fn masked(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        Self {
            password: mask(&self.password),
            proxy_password: mask(&self.proxy_password),
            ..self.clone()
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("LOKISHIP_CONFIG") {
            let path = Self::expand_path(Path::new(&env_path));
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from LOKISHIP_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("LOKISHIP_DIR") {
            let path = Self::expand_path(Path::new(&dir)).join("lokiship.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from LOKISHIP_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/lokiship/lokiship.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("lokiship").join("lokiship.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./lokiship.yaml (for development)
        let local_config = PathBuf::from("lokiship.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.loki.endpoint.is_none());
        assert!(!config.loki.order_writes);
        assert_eq!(config.loki.timeout_secs, 30);
        assert_eq!(config.loki.compression, CompressionLevel::Optimal);
        assert_eq!(config.loki.layout, DEFAULT_LAYOUT);
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
log_level: debug
loki:
  endpoint: "http://localhost:3100"
  tenant: team-a
  username: user
  password: pass
  proxy_url: "http://proxy:8080"
  proxy_user: 'corp\bob'
  proxy_password: secret
  order_writes: true
  timeout_secs: 5
  compression: none
  event_properties_as_labels: true
  labels:
    - name: env
      layout: prod
    - name: level
      layout: "${level:lowercase=true}"
  layout: "${message}"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.loki.endpoint.as_deref(), Some("http://localhost:3100"));
        assert_eq!(config.loki.proxy_user.as_deref(), Some("corp\\bob"));
        assert!(config.loki.order_writes);
        assert_eq!(config.loki.timeout_secs, 5);
        assert_eq!(config.loki.compression, CompressionLevel::None);
        assert_eq!(config.loki.labels.len(), 2);
        assert_eq!(config.loki.labels[1], TargetLabel::new("level", "${level:lowercase=true}"));
        assert_eq!(config.loki.layout, "${message}");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("loki:\n  endpoint: http://x:3100\n").unwrap();
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.loki.compression, CompressionLevel::Optimal);
        assert_eq!(config.loki.layout, DEFAULT_LAYOUT);
    }

    #[test]
    fn test_masked_hides_secrets() {
        let loki = LokiConfig {
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            proxy_password: Some("proxy".to_string()),
            ..LokiConfig::default()
        };
        let masked = loki.masked();
        assert_eq!(masked.username.as_deref(), Some("user"));
        assert_eq!(masked.password.as_deref(), Some("********"));
        assert_eq!(masked.proxy_password.as_deref(), Some("********"));
        assert_eq!(LokiConfig::default().masked().password, None);
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lokiship.yaml");
        fs::write(&path, "loki:\n  endpoint: https://loki.example.com\n  order_writes: true\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.loki.endpoint.as_deref(), Some("https://loki.example.com"));
        assert!(config.loki.order_writes);
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yaml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/etc");
        assert_eq!(Config::expand_path(&path), PathBuf::from("/usr/local/etc"));
    }

    #[test]
    fn test_log_level_filters() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Off.to_level_filter(), log::LevelFilter::Off);
    }
}
