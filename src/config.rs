//! Configuration: TOML file, environment overrides, built-in defaults.
//!
//! ```toml
//! [api]
//! base_url = "https://api.bls.gov/publicAPI"
//! version = "v2"
//! timeout_secs = 30
//! access_key = "..."   # or set BLS_API_KEY
//!
//! [plot]
//! width = 1000
//! height = 600
//! locale = "en"
//! ```

use crate::error::{Error, Result};
use crate::models::AccessKey;
use crate::viz::PlotOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "bls.toml";
pub const DEFAULT_BASE_URL: &str = "https://api.bls.gov/publicAPI";
pub const ENV_ACCESS_KEY: &str = "BLS_API_KEY";
pub const ENV_BASE_URL: &str = "BLS_BASE_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// Unauthenticated, smaller limits, no key.
    V1,
    #[default]
    V2,
}

impl ApiVersion {
    pub fn as_path(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: ApiVersion,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub access_key: Option<AccessKey>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            version: ApiVersion::V2,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            access_key: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub plot: PlotOptions,
}

impl Config {
    /// Parse TOML text; `origin` is only used in error messages.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg = Self::from_toml_str(&text, path)?;
        log::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Load `path` if given, else `bls.toml` in the working directory if it
    /// exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply `BLS_API_KEY` and `BLS_BASE_URL` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_ACCESS_KEY).map(AccessKey::new) {
            if !key.is_empty() {
                self.api.access_key = Some(key);
            }
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.to_string();
            }
        }
    }
}
