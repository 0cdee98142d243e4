use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const ENV_SERVER_URL: &str = "ACTUAL_SERVER_URL";
pub const ENV_SYNC_ID: &str = "ACTUAL_SYNC_ID";
pub const ENV_SERVER_PASSWORD: &str = "ACTUAL_PASSWORD";
pub const ENV_FILE_PASSWORD: &str = "ACTUAL_FILE_PASSWORD";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DATA_DIR: &str = "ACTUAL_DATA_DIR";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECS";

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Process configuration. Resolved once at startup from an optional YAML
/// file, then overridden by environment variables.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub sync_id: String,
    #[serde(default)]
    pub server_password: Option<String>,
    #[serde(default)]
    pub file_password: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server_url: String::new(),
            sync_id: String::new(),
            server_password: None,
            file_password: None,
            port: DEFAULT_PORT,
            data_dir: default_data_dir(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Loads the config file (explicit path, else the default path if it
    /// exists) and applies the process environment on top.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::load`], with `lookup` standing in for the environment.
    pub fn load_with_env<F>(config_path: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = Self::default_config_path()?;
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "actualbudget", "budget-proxy")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Overrides fields from `lookup`. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(sync_id) = get(ENV_SYNC_ID) {
            self.sync_id = sync_id;
        }
        if let Some(password) = get(ENV_SERVER_PASSWORD) {
            self.server_password = Some(password);
        }
        if let Some(password) = get(ENV_FILE_PASSWORD) {
            self.file_password = Some(password);
        }
        if let Some(port) = get(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} must be a port number, got '{port}'"))?;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = secs.trim().parse().with_context(|| {
                format!("{ENV_REQUEST_TIMEOUT} must be a number of seconds, got '{secs}'")
            })?;
        }
        Ok(())
    }

    /// Names of required settings that are missing or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server_url.trim().is_empty() {
            missing.push(ENV_SERVER_URL);
        }
        if self.sync_id.trim().is_empty() {
            missing.push(ENV_SYNC_ID);
        }
        missing
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
server_url: "http://localhost:5006"
sync_id: "1cfdbb80-6274-49bf-b0c2-737235a4c81f"
server_password: "hunter2"
port: 8080
data_dir: "/var/lib/budget-proxy"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.server_url, "http://localhost:5006");
        assert_eq!(config.sync_id, "1cfdbb80-6274-49bf-b0c2-737235a4c81f");
        assert_eq!(config.server_password.as_deref(), Some("hunter2"));
        assert!(config.file_password.is_none());
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/budget-proxy"));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.missing_required(), vec![ENV_SERVER_URL, ENV_SYNC_ID]);
    }

    #[test]
    fn test_env_overrides_file_values() -> Result<()> {
        let mut config: AppConfig = serde_yaml::from_str("server_url: http://file:5006\nport: 4000")?;
        config.apply_env(env(&[
            (ENV_SERVER_URL, "http://env:5006"),
            (ENV_SYNC_ID, "abc"),
            (ENV_FILE_PASSWORD, "secret"),
            (ENV_PORT, "9000"),
            (ENV_REQUEST_TIMEOUT, "5"),
        ]))?;

        assert_eq!(config.server_url, "http://env:5006");
        assert_eq!(config.sync_id, "abc");
        assert_eq!(config.file_password.as_deref(), Some("secret"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.missing_required().is_empty());
        Ok(())
    }

    #[test]
    fn test_blank_env_values_are_ignored() -> Result<()> {
        let mut config = AppConfig::default();
        config.apply_env(env(&[(ENV_SERVER_URL, "   "), (ENV_SERVER_PASSWORD, "")]))?;

        assert!(config.server_url.is_empty());
        assert!(config.server_password.is_none());
        assert_eq!(config.missing_required(), vec![ENV_SERVER_URL, ENV_SYNC_ID]);
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(env(&[(ENV_PORT, "http")]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("PORT must be a port number"));
    }

    #[test]
    fn test_load_with_env_layers_lookup_over_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("config.yaml");
        fs::write(&path, "server_url: http://file:5006\nsync_id: from-file\n")?;

        let config = AppConfig::load_with_env(path.to_str(), env(&[(ENV_SYNC_ID, "from-env")]))?;
        assert_eq!(config.server_url, "http://file:5006");
        assert_eq!(config.sync_id, "from-env");

        let config = AppConfig::load_with_env(path.to_str(), env(&[]))?;
        assert_eq!(config.sync_id, "from-file");
        Ok(())
    }
}
