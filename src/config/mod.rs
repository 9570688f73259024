//! Configuration module for the positioning service

mod template;

use crate::utils::error::{Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub use crate::engine::EngineConfig;
pub use template::generate_commented_config_template;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "wifipos.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log filter used when `WIFIPOS_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Matching engine tunables
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Fingerprint storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upload password configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_addr: String,
}

/// Fingerprint storage configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path; defaults to the user data dir
    pub db_path: Option<String>,
}

/// Upload password configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JSON file holding the Argon2 hash of the upload password
    pub password_file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            engine: EngineConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string() }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { password_file: "password.json".to_string() }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> Option<PathBuf> {
        self.db_path.as_ref().map(PathBuf::from)
    }
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::ConfigError(format!(
                "server.bind_addr '{}' is not a socket address",
                self.server.bind_addr
            )));
        }
        if self.auth.password_file.trim().is_empty() {
            return Err(Error::ConfigError("auth.password_file must be set".to_string()));
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        if std::path::Path::new(CONFIG_FILE).exists() {
            return Self::from_file(CONFIG_FILE);
        }

        if let Some(mut path) = dirs::config_dir() {
            path.push("wifipos");
            path.push(CONFIG_FILE);
            if path.exists() {
                return Self::from_file(path);
            }
        }

        debug!("no configuration file found, using defaults");
        let mut config = Self::default();
        config.merge_env()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(threads) = env::var("THREAD_NUM") {
            self.engine.worker_count = threads.trim().parse().map_err(|e| {
                Error::ConfigError(format!("THREAD_NUM must be a positive integer: {}", e))
            })?;
        }

        if let Ok(bind) = env::var("WIFIPOS_BIND") {
            self.server.bind_addr = bind;
        }

        if let Ok(db_path) = env::var("WIFIPOS_DB_PATH") {
            self.storage.db_path = Some(db_path);
        }

        if let Ok(password_file) = env::var("WIFIPOS_PASSWORD_FILE") {
            self.auth.password_file = password_file;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.engine.worker_count, 3);
        assert_eq!(config.auth.password_file, "password.json");
        assert!(config.storage.db_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("wifipos.toml");

        let mut config = Config::default();
        config.engine.top_k = 7;
        config.storage.db_path = Some("/tmp/fp.db".to_string());
        config.save(&config_path).unwrap();

        let mut loaded = None;
        temp_env::with_vars_unset(
            vec!["THREAD_NUM", "WIFIPOS_BIND", "WIFIPOS_DB_PATH", "WIFIPOS_PASSWORD_FILE"],
            || loaded = Some(Config::from_file(&config_path).unwrap()),
        );
        assert_eq!(loaded, Some(config));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("wifipos.toml");
        std::fs::write(&path, "[engine]\nmargin = 0.8\n").unwrap();
        let mut loaded = None;
        temp_env::with_var_unset("THREAD_NUM", || loaded = Some(Config::from_file(&path).unwrap()));
        let cfg = loaded.unwrap();
        assert!((cfg.engine.margin - 0.8).abs() < f64::EPSILON);
        assert_eq!(cfg.engine.top_k, 4);
        assert_eq!(cfg.server, ServerConfig::default());
    }

    #[test]
    fn test_merge_env() {
        temp_env::with_vars(
            vec![
                ("THREAD_NUM", Some("6")),
                ("WIFIPOS_BIND", Some("127.0.0.1:9000")),
                ("WIFIPOS_DB_PATH", Some("/var/lib/wifipos/fp.db")),
                ("WIFIPOS_PASSWORD_FILE", Some("/etc/wifipos/password.json")),
            ],
            || {
                let mut config = Config::default();
                config.merge_env().unwrap();

                assert_eq!(config.engine.worker_count, 6);
                assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
                assert_eq!(config.storage.db_path(), Some(PathBuf::from("/var/lib/wifipos/fp.db")));
                assert_eq!(config.auth.password_file, "/etc/wifipos/password.json");
            },
        );
    }

    #[test]
    fn test_merge_env_rejects_bad_thread_num() {
        temp_env::with_var("THREAD_NUM", Some("many"), || {
            let mut config = Config::default();
            assert_matches!(config.merge_env(), Err(Error::ConfigError(_)));
        });
    }

    #[test]
    fn test_validate_rejects_bad_bind_addr() {
        let mut config = Config::default();
        config.server.bind_addr = "localhost".to_string();
        assert_matches!(config.validate(), Err(Error::ConfigError(_)));
    }

    #[test]
    fn test_default_toml_parses_back() {
        let toml_str = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
