// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::storage::FileStore;
use anyhow::{Error, Result};
use http::Uri;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Environment variable that replaces the configured endpoint.
pub const ENDPOINT_ENV: &str = "INVAHELP_ENDPOINT";

fn default_user_agent() -> String {
    format!("invahelp/{}", env!("CARGO_PKG_VERSION"))
}
fn default_max_redirects() -> usize {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Spreadsheet web-app URL (usually ending in `/exec`). Empty means the
    /// remote source is not configured and only local storage is used.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// No timeout unless set; a hung request then delays only its own call.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            request_timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;

        Ok(config)
    }

    /// Loads the file if present, otherwise defaults, then applies the
    /// environment override. A file that exists but is broken is an error.
    pub fn load_or_default(ctx: &dyn AppContext) -> Result<Self> {
        let mut config = match Self::load(ctx) {
            Ok(c) => c,
            Err(e) if Self::is_missing_config_error(&e) => Self::default(),
            Err(e) => return Err(e),
        };
        if let Ok(endpoint) = env::var(ENDPOINT_ENV)
            && !endpoint.trim().is_empty()
        {
            config.endpoint = endpoint.trim().to_string();
        }
        Ok(config)
    }

    /// Helper to detect whether an anyhow::Error indicates that the config file was missing.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    /// Save configuration using an explicit context.
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.get_config_file_path()?;
        FileStore::with_lock(&path, || {
            let toml_str = toml::to_string_pretty(self)?;
            FileStore::atomic_write(&path, toml_str)?;
            Ok(())
        })?;
        Ok(())
    }

    /// Get the path string using an explicit context.
    pub fn get_path_string(ctx: &dyn AppContext) -> Result<String> {
        let path = ctx.get_config_file_path()?;
        Ok(path.to_string_lossy().to_string())
    }

    /// Parsed endpoint, `None` when unconfigured.
    pub fn endpoint_uri(&self) -> Result<Option<Uri>> {
        let raw = self.endpoint.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let uri: Uri = raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid endpoint '{}': {}", raw, e))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => Ok(Some(uri)),
            _ => Err(anyhow::anyhow!(
                "Invalid endpoint '{}': expected an http(s) URL",
                raw
            )),
        }
    }
}
