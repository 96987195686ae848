use serde::Deserialize;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid API host {0:?}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub api: ApiConfig,
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: SourceConfig::default(),
            api: ApiConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            path: PathBuf::from("data/schedule.json"),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 4001,
        }
    }
}

impl Config {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .api
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.api.host.clone()))?;
        Ok(SocketAddr::new(ip, self.api.port))
    }
}

pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Loads the YAML config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(yaml) => parse_config(&yaml),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 4001);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:4001");
        assert_eq!(parse_config("").unwrap(), config);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_config("api:\n  port: 8080\nlog_filter: debug\n").unwrap();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.source.path, PathBuf::from("data/schedule.json"));
    }

    #[test]
    fn test_invalid_host() {
        let mut config = Config::default();
        config.api.host = "clinic.local".to_string();
        assert!(matches!(config.socket_addr(), Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(matches!(parse_config("api: [1, 2"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_from_file_or_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_config(&dir.path().join("missing.yaml")).unwrap(), Config::default());

        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "source:\n  path: /tmp/rows.json\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.source.path, PathBuf::from("/tmp/rows.json"));
    }
}
