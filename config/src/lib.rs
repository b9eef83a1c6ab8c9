//! Configuration file loading for Retro clients.
//!
//! The file lives at `~/.retro/config.toml` unless `RETRO_CONFIG` points
//! elsewhere. Every section and field is optional:
//!
//! ```toml
//! [http]
//! base_url = "http://localhost:8000/"
//! timeout_ms = 30000
//! user_agent = "narrative/${USER}"
//!
//! [retry]
//! max_retries = 2
//! initial_delay_ms = 500
//! max_delay_ms = 8000
//! jitter_factor = 0.25
//!
//! [channel]
//! dedup = "share"            # or "independent"
//! request_timeout_ms = 5000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use retro_channel::ChannelOptions;
use retro_transport::{HttpTransportConfig, RetryConfig, TransportInitError};
use retro_types::DedupPolicy;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "RETRO_CONFIG";

/// Server address used when `[http] base_url` is absent.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Upper bound accepted for `jitter_factor`.
const MAX_JITTER_FACTOR: f64 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    /// The file the error came from, if it came from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetroConfig {
    pub http: Option<HttpSection>,
    pub retry: Option<RetrySection>,
    pub channel: Option<ChannelSection>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    /// Supports `${ENV_VAR}` expansion.
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    /// Supports `${ENV_VAR}` expansion.
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter_factor: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSection {
    pub dedup: Option<DedupPolicy>,
    pub request_timeout_ms: Option<u64>,
}

/// Fully resolved settings, ready to build a client from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub http: HttpTransportConfig,
    pub channel: ChannelOptions,
}

impl ResolvedConfig {
    /// Defaults for a server at `base_url`.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            http: transport_config(base_url)?,
            channel: ChannelOptions::default(),
        })
    }
}

impl RetroConfig {
    /// Load from [`config_path`]. `Ok(None)` when there is no config file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        Self::load_from(&path)
    }

    /// Load from an explicit path. `Ok(None)` when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Apply defaults and validate.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let http = self.http.clone().unwrap_or_default();
        let base_url = http
            .base_url
            .as_deref()
            .map_or_else(|| DEFAULT_BASE_URL.to_string(), expand_env_vars);

        let mut transport = transport_config(&base_url)?;
        if let Some(ms) = http.timeout_ms {
            transport.timeout = positive_millis("http.timeout_ms", ms)?;
        }
        if let Some(agent) = http.user_agent.as_deref() {
            let agent = expand_env_vars(agent);
            if agent.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "http.user_agent",
                    reason: "must not be empty".to_string(),
                });
            }
            transport.user_agent = agent;
        }
        if let Some(retry) = &self.retry {
            transport.retry = resolve_retry(retry)?;
        }

        let channel = self.channel.clone().unwrap_or_default();
        let request_timeout = channel
            .request_timeout_ms
            .map(|ms| positive_millis("channel.request_timeout_ms", ms))
            .transpose()?;

        Ok(ResolvedConfig {
            http: transport,
            channel: ChannelOptions {
                dedup: channel.dedup.unwrap_or_default(),
                request_timeout,
            },
        })
    }
}

fn transport_config(base_url: &str) -> Result<HttpTransportConfig, ConfigError> {
    HttpTransportConfig::new(base_url).map_err(|err| ConfigError::Invalid {
        field: "http.base_url",
        reason: match err {
            TransportInitError::BaseUrl { reason, .. } => reason,
            other => other.to_string(),
        },
    })
}

fn resolve_retry(section: &RetrySection) -> Result<RetryConfig, ConfigError> {
    let mut retry = RetryConfig::default();
    if let Some(max_retries) = section.max_retries {
        retry.max_retries = max_retries;
    }
    if let Some(ms) = section.initial_delay_ms {
        retry.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = section.max_delay_ms {
        retry.max_delay = Duration::from_millis(ms);
    }
    if let Some(jitter) = section.jitter_factor {
        if !(0.0..=MAX_JITTER_FACTOR).contains(&jitter) {
            return Err(ConfigError::Invalid {
                field: "retry.jitter_factor",
                reason: format!("{jitter} is outside 0.0..=1.0"),
            });
        }
        retry.jitter_factor = jitter;
    }
    if retry.initial_delay > retry.max_delay {
        return Err(ConfigError::Invalid {
            field: "retry.initial_delay_ms",
            reason: format!(
                "{}ms exceeds max_delay_ms ({}ms)",
                retry.initial_delay.as_millis(),
                retry.max_delay.as_millis()
            ),
        });
    }
    Ok(retry)
}

fn positive_millis(field: &'static str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

/// Replace every `${NAME}` with the value of environment variable `NAME`.
///
/// Unset variables expand to the empty string. An unterminated `${` is kept
/// verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &after[..end];
        if !name.is_empty() {
            out.push_str(&env::var(name).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// `$RETRO_CONFIG` if set and non-empty, else `~/.retro/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".retro").join("config.toml"))
}
