use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9900;
pub const DEFAULT_CERT_PATH: &str = "./ssl/server.cert";
pub const DEFAULT_KEY_PATH: &str = "./ssl/server.key";
pub const DEFAULT_CONFIG_PATH: &str = "./ssecast.toml";
pub const KEEPALIVE_INTERVAL_SECS: u64 = 10; // ping cadence
pub const SHUTDOWN_GRACE_MS: u64 = 500; // delay between /exit and process exit
pub const SUBSCRIBER_QUEUE: usize = 256; // frames buffered per subscriber before eviction

/// Top-level config (ssecast.toml + SSECAST_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub relay: RelaySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenConfig {
    /// Parse the `host:port` startup argument.
    ///
    /// Either half may be empty and falls back to its default, so `:8080`
    /// and `localhost` are both accepted. IPv6 hosts must be bracketed.
    pub fn from_arg(arg: &str) -> Result<Self> {
        let arg = arg.trim();
        let (host, port) = if let Some(rest) = arg.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                RelayError::Config(format!("unterminated IPv6 host in '{arg}'"))
            })?;
            let port = match tail {
                "" => "",
                t => t.strip_prefix(':').ok_or_else(|| {
                    RelayError::Config(format!("expected ':' after IPv6 host in '{arg}'"))
                })?,
            };
            (host, port)
        } else {
            match arg.split_once(':') {
                Some((host, port)) => (host, port),
                None => (arg, ""),
            }
        };

        let host = if host.is_empty() {
            default_host()
        } else {
            host.to_string()
        };
        let port = if port.is_empty() {
            default_port()
        } else {
            port.parse::<u16>()
                .map_err(|_| RelayError::Config(format!("invalid port '{port}'")))?
        };
        Ok(Self { host, port })
    }

    /// `host:port` form suitable for logs and `TcpListener::bind`.
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// When false the relay serves plain HTTP. Intended for local development.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_cert_path")]
    pub cert_path: String,
    #[serde(default = "default_key_path")]
    pub key_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cert_path: default_cert_path(),
            key_path: default_key_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Seconds between `ping` events.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Milliseconds between an accepted `/exit` and termination.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Per-subscriber queue depth. A subscriber whose queue fills up is evicted.
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            keepalive_secs: default_keepalive_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            subscriber_queue: default_subscriber_queue(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_cert_path() -> String {
    DEFAULT_CERT_PATH.to_string()
}
fn default_key_path() -> String {
    DEFAULT_KEY_PATH.to_string()
}
fn default_keepalive_secs() -> u64 {
    KEEPALIVE_INTERVAL_SECS
}
fn default_shutdown_grace_ms() -> u64 {
    SHUTDOWN_GRACE_MS
}
fn default_subscriber_queue() -> usize {
    SUBSCRIBER_QUEUE
}

impl RelayConfig {
    /// Load config from a TOML file with SSECAST_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. SSECAST_CONFIG env var
    ///   3. ./ssecast.toml
    ///
    /// A missing file is not an error; every field has a default.
    /// Nested keys are split on a double underscore: `SSECAST_RELAY__KEEPALIVE_SECS=5`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("SSECAST_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let config: RelayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SSECAST_").split("__"))
            .extract()
            .map_err(|e| RelayError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(path = %path, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.relay.keepalive_secs == 0 {
            return Err(RelayError::Config(
                "relay.keepalive_secs must be at least 1".to_string(),
            ));
        }
        if self.relay.subscriber_queue == 0 {
            return Err(RelayError::Config(
                "relay.subscriber_queue must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
