use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use crate::session::ResetPolicy;

pub const BASE_URL_ENV: &str = "PDFCHAT_BASE_URL";

const DEFAULT_BANNER_SECS: u64 = 3;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub dark_theme: Option<bool>,
    pub banner_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub reset_policy: Option<ResetPolicy>,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user config directory; a missing file yields defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&config_content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Service address: explicit override, then `PDFCHAT_BASE_URL`, then file, then default
    pub fn resolve_base_url(&self, cli_override: Option<&str>) -> String {
        cli_override
            .map(str::to_string)
            .or_else(|| std::env::var(BASE_URL_ENV).ok().filter(|url| !url.is_empty()))
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn banner_window(&self) -> Duration {
        Duration::from_secs(self.banner_secs.unwrap_or(DEFAULT_BANNER_SECS))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy.unwrap_or_default()
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("pdfchat")
                .join("logs")
        })
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;

        Ok(config_dir.join("pdfchat").join("config.json"))
    }
}
