use std::{collections::HashMap, env, time::Duration};

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::channels::DEFAULT_LIMIT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub port: u16,
    pub allow_insecure_transports: bool,
    pub catalog: CatalogConfig,
    pub channels: ChannelsConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub channels_path: String,
    pub streams_path: String,
    pub logos_path: String,
    pub blocklist_path: String,
    pub user_agent: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelsConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub serve_stale: bool,
}

type Vars = HashMap<String, String>;

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &Vars) -> Result<Self, ConfigError> {
        let port = var_u16(vars, "PORT", 4020)?;
        let allow_insecure_transports = var_bool(vars, "ALLOW_INSECURE_TRANSPORT").unwrap_or(false);
        let catalog = CatalogConfig::from_vars(vars, allow_insecure_transports)?;
        let channels = ChannelsConfig::from_vars(vars)?;

        Ok(Self {
            port,
            allow_insecure_transports,
            catalog,
            channels,
        })
    }
}

impl CatalogConfig {
    fn from_vars(vars: &Vars, allow_insecure_transports: bool) -> Result<Self, ConfigError> {
        const DEFAULT_BASE_URL: &str = "https://iptv-org.github.io/api";

        let config = Self {
            base_url: var_string(vars, "IPTV_API_BASE_URL", DEFAULT_BASE_URL),
            channels_path: var_string(vars, "IPTV_CHANNELS_PATH", "/channels.json"),
            streams_path: var_string(vars, "IPTV_STREAMS_PATH", "/streams.json"),
            logos_path: var_string(vars, "IPTV_LOGOS_PATH", "/logos.json"),
            blocklist_path: var_string(vars, "IPTV_BLOCKLIST_PATH", "/blocklist.json"),
            user_agent: var_string(vars, "IPTV_USER_AGENT", "iptv-service-rs/0.1"),
            request_timeout_ms: var_u64(vars, "IPTV_REQUEST_TIMEOUT_MS", 15_000)?,
        };

        config.validate(allow_insecure_transports)?;
        Ok(config)
    }

    fn validate(&self, allow_insecure_transports: bool) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "IPTV_REQUEST_TIMEOUT_MS must be greater than zero.".into(),
            ));
        }

        for path in [
            &self.channels_path,
            &self.streams_path,
            &self.logos_path,
            &self.blocklist_path,
        ] {
            let url = self.endpoint(path)?;
            if url.scheme() != "https" && !allow_insecure_transports {
                return Err(ConfigError::Message(
                    "IPTV API endpoints must use HTTPS unless ALLOW_INSECURE_TRANSPORT=true"
                        .into(),
                ));
            }
        }

        Ok(())
    }

    /// Resolves a collection path against the base URL, keeping any path
    /// prefix the base already carries (`/api` + `/streams.json`).
    pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
        let base = format!("{}/", self.base_url.trim().trim_end_matches('/'));
        let base = Url::parse(&base)
            .map_err(|err| ConfigError::Message(format!("Invalid IPTV_API_BASE_URL: {err}")))?;
        base.join(path.trim().trim_start_matches('/'))
            .map_err(|err| ConfigError::Message(format!("Invalid IPTV API path: {err}")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ChannelsConfig {
    fn from_vars(vars: &Vars) -> Result<Self, ConfigError> {
        let max_limit = var_usize(vars, "CHANNELS_MAX_LIMIT", 500)?;
        if max_limit == 0 {
            return Err(ConfigError::Message(
                "CHANNELS_MAX_LIMIT must be greater than zero.".into(),
            ));
        }
        let default_limit =
            var_usize(vars, "CHANNELS_DEFAULT_LIMIT", DEFAULT_LIMIT)?.min(max_limit);
        let serve_stale = var_bool(vars, "CHANNELS_SERVE_STALE").unwrap_or(true);

        Ok(Self {
            default_limit,
            max_limit,
            serve_stale,
        })
    }
}

fn var_string(vars: &Vars, key: &str, default: &str) -> String {
    vars.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn var_u16(vars: &Vars, key: &str, default: u16) -> Result<u16, ConfigError> {
    match vars.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid u16"))),
        None => Ok(default),
    }
}

fn var_u64(vars: &Vars, key: &str, default: u64) -> Result<u64, ConfigError> {
    match vars.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid u64"))),
        None => Ok(default),
    }
}

fn var_usize(vars: &Vars, key: &str, default: usize) -> Result<usize, ConfigError> {
    match vars.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid usize"))),
        None => Ok(default),
    }
}

fn var_bool(vars: &Vars, key: &str) -> Option<bool> {
    match vars.get(key).map(|value| value.trim().to_lowercase()) {
        Some(value) if value == "true" => Some(true),
        Some(value) if value == "false" => Some(false),
        _ => None,
    }
}
