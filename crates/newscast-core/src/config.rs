//! Process configuration.
//!
//! A `Config` is built once at startup (defaults, then an optional TOML file,
//! then environment overrides) and handed to each component's constructor.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{NewscastError, NewscastResult};

/// Largest number of device tokens the push gateway accepts per multicast.
pub const MAX_BATCH_LIMIT: usize = 500;

/// Upper bound for every interval and timeout setting, in seconds.
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Upper bound for `push.active_window_days`.
pub const MAX_ACTIVE_WINDOW_DAYS: i64 = 3650;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "newscast.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub stream: StreamConfig,
    pub push: PushConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
            shutdown_grace_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "newscast".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// How often the change detector polls the news list.
    pub poll_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    /// Upper bound for a single frame write to one client.
    pub write_timeout_secs: u64,
    /// Frames buffered per client before writes start to wait.
    pub client_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            heartbeat_interval_secs: 15,
            write_timeout_secs: 10,
            client_buffer: 32,
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub endpoint: String,
    pub project_id: String,
    /// OAuth2 bearer sent to FCM. These tokens expire after about an hour,
    /// so a long-running server should use `access_token_file` instead.
    pub access_token: String,
    /// File holding the current bearer, re-read before every send. An
    /// external refresher rewrites it; takes precedence over `access_token`.
    pub access_token_file: Option<PathBuf>,
    pub batch_limit: usize,
    /// Devices refreshed within this many days count as active.
    pub active_window_days: i64,
    pub request_timeout_secs: u64,
    /// In-flight gateway requests while fanning out one batch.
    pub concurrency: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://fcm.googleapis.com/v1".to_string(),
            project_id: String::new(),
            access_token: String::new(),
            access_token_file: None,
            batch_limit: MAX_BATCH_LIMIT,
            active_window_days: 30,
            request_timeout_secs: 10,
            concurrency: 16,
        }
    }
}

impl PushConfig {
    pub fn active_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.active_window_days)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token → subject.
    pub tokens: HashMap<String, String>,
}

impl Config {
    /// Load configuration for this process.
    ///
    /// An explicit `path` must exist. Without one, `newscast.toml` in the
    /// working directory is used if present. Environment overrides are
    /// applied last and the result is validated.
    pub fn load(path: Option<&Path>) -> NewscastResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> NewscastResult<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> NewscastResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> NewscastResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REDIS_URL") {
            self.redis.url = url;
        }
        if let Some(host) = lookup("NEWSCAST_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("NEWSCAST_PORT") {
            self.server.port = port.parse().map_err(|_| {
                NewscastError::config(format!("NEWSCAST_PORT is not a port: {}", port))
            })?;
        }
        if let Some(token) = lookup("NEWSCAST_PUSH_ACCESS_TOKEN") {
            self.push.access_token = token;
        }
        if let Some(path) = lookup("NEWSCAST_PUSH_ACCESS_TOKEN_FILE") {
            self.push.access_token_file = Some(PathBuf::from(path));
        }
        if let Some(project) = lookup("NEWSCAST_PUSH_PROJECT_ID") {
            self.push.project_id = project;
        }
        Ok(())
    }

    /// Reject settings the engine cannot start with.
    pub fn validate(&self) -> NewscastResult<()> {
        let intervals = [
            ("stream.poll_interval_secs", self.stream.poll_interval_secs),
            ("stream.heartbeat_interval_secs", self.stream.heartbeat_interval_secs),
            ("stream.write_timeout_secs", self.stream.write_timeout_secs),
            ("push.request_timeout_secs", self.push.request_timeout_secs),
        ];
        for (name, value) in intervals {
            if value == 0 || value > MAX_INTERVAL_SECS {
                return Err(NewscastError::config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_INTERVAL_SECS, value
                )));
            }
        }

        if self.stream.client_buffer == 0 {
            return Err(NewscastError::config("stream.client_buffer must be greater than zero"));
        }
        if self.push.batch_limit == 0 || self.push.batch_limit > MAX_BATCH_LIMIT {
            return Err(NewscastError::config(format!(
                "push.batch_limit must be between 1 and {}, got {}",
                MAX_BATCH_LIMIT, self.push.batch_limit
            )));
        }
        if self.push.concurrency == 0 {
            return Err(NewscastError::config("push.concurrency must be greater than zero"));
        }
        if !(1..=MAX_ACTIVE_WINDOW_DAYS).contains(&self.push.active_window_days) {
            return Err(NewscastError::config(format!(
                "push.active_window_days must be between 1 and {}, got {}",
                MAX_ACTIVE_WINDOW_DAYS, self.push.active_window_days
            )));
        }
        Ok(())
    }
}
