use std::{net::SocketAddr, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use sinkhole_hosts::{DEFAULT_FETCH_TIMEOUT, ReloadPolicy, Source, SourceError};
use thiserror::Error;
use tracing::{Level, level_filters::LevelFilter};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        LevelFilter::from_level(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// IP address to listen on for DNS queries.
    #[serde(default = "default_server_ip")]
    pub ip: String,
    /// Port to listen on for DNS queries.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Logging level for the server.
    #[serde(default)]
    pub log_level: LogLevel,
    /// Time budget for a single request in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.ip, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.ip.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: default_server_ip(),
            port: default_server_port(),
            log_level: LogLevel::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverConfig {
    Forwarder {
        #[serde(default)]
        upstreams: Vec<SocketAddr>,
    },
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::Forwarder {
            upstreams: vec![SocketAddr::from(([1, 1, 1, 1], 53))],
        }
    }
}

/// The `[remotehosts]` section as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteHostsConfig {
    /// Hosts list URLs, fetched in this order.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Reload interval such as `5m` or `1h30m`. Empty or `0` fetches once at startup.
    #[serde(default)]
    pub reload: String,
    #[serde(default)]
    pub policy: ReloadPolicy,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,
    /// Refuse to start when the first reload fails.
    #[serde(default = "default_true")]
    pub fail_on_initial_error: bool,
}

impl Default for RemoteHostsConfig {
    fn default() -> Self {
        Self {
            sources: vec![],
            reload: String::new(),
            policy: ReloadPolicy::default(),
            fetch_timeout: default_fetch_timeout(),
            fail_on_initial_error: true,
        }
    }
}

/// `[remotehosts]` after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRemoteHosts {
    pub sources: Vec<Source>,
    pub reload: Duration,
    pub policy: ReloadPolicy,
    pub fetch_timeout: Duration,
    pub fail_on_initial_error: bool,
}

impl RemoteHostsConfig {
    pub fn validate(&self) -> Result<ValidatedRemoteHosts, ConfigError> {
        let sources = self
            .sources
            .iter()
            .map(|s| Source::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        let reload = if self.reload.trim().is_empty() {
            Duration::ZERO
        } else {
            non_negative("reload", &self.reload).map_err(|e| match e {
                ConfigError::NegativeDuration { value, .. } => ConfigError::NegativeReload(value),
                other => other,
            })?
        };

        let fetch_timeout = non_negative("fetch_timeout", &self.fetch_timeout)?;
        if fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroFetchTimeout);
        }

        Ok(ValidatedRemoteHosts {
            sources,
            reload,
            policy: self.policy,
            fetch_timeout,
            fail_on_initial_error: self.fail_on_initial_error,
        })
    }
}

fn non_negative(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let nanos = parse_duration(value.trim()).map_err(|reason| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        reason,
    })?;

    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .map_err(|_| ConfigError::NegativeDuration {
            field,
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub resolver: ResolverConfig,
    pub remotehosts: RemoteHostsConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found")]
    NotFound,
    #[error("failed to decode config: {0}")]
    Decode(String),
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),
    #[error(transparent)]
    InvalidSource(#[from] SourceError),
    #[error("invalid duration for {field} {value:?}: {reason}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid negative duration for reload {0:?}")]
    NegativeReload(String),
    #[error("invalid negative duration for {field} {value:?}")]
    NegativeDuration { field: &'static str, value: String },
    #[error("fetch_timeout must be greater than zero")]
    ZeroFetchTimeout,
}

fn decode_from_path(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound)?;
    toml::from_str(&content).map_err(|e| ConfigError::Decode(e.message().into()))
}

/// Load the config, writing the defaults to `config_path` if there is no file yet.
pub fn load_config(config_path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let config_path = config_path.as_ref();
    match decode_from_path(config_path) {
        Ok(cfg) => Ok(cfg),
        Err(ConfigError::NotFound) => create_default_config(config_path),
        Err(e) => Err(e.into()),
    }
}

pub fn create_default_config(path: &Path) -> anyhow::Result<Config> {
    let cfg = Config::default();

    let toml_str = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml_str)?;

    Ok(cfg)
}

/// Parse a duration like `300ms`, `-1.5h` or `2h45m` into signed nanoseconds.
///
/// Every number needs a unit (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`) except a bare `0`.
pub fn parse_duration(input: &str) -> Result<i128, String> {
    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err("empty duration".into());
    }

    let overflow = || "duration out of range".to_string();
    let mut total: u128 = 0;

    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after) = rest.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(after) => after.split_at(after.bytes().take_while(u8::is_ascii_digit).count()),
            None => ("", after),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(format!("expected a number at {rest:?}"));
        }

        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            "" => return Err("missing unit".into()),
            other => return Err(format!("unknown unit {other:?}")),
        };

        let int: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let mut value = int.checked_mul(scale).ok_or_else(overflow)?;

        if !frac_part.is_empty() {
            // Digits beyond nanosecond precision are dropped.
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| overflow())?;
            value += frac * scale / 10u128.pow(digits.len() as u32);
        }

        total = total.checked_add(value).ok_or_else(overflow)?;
        if total > i64::MAX as u128 {
            return Err(overflow());
        }

        rest = after;
    }

    let total = total as i128;
    Ok(if negative { -total } else { total })
}

fn default_server_ip() -> String {
    "0.0.0.0".into()
}

fn default_server_port() -> u16 {
    53
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_fetch_timeout() -> String {
    format!("{}s", DEFAULT_FETCH_TIMEOUT.as_secs())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
