//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::nickname::generate_nickname;
use crate::irc::commands::DEFAULT_CHUNK_LEN;
use crate::irc::connection::ConnectionOptions;

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Milliseconds between outbound queue drains (one line per drain).
    #[serde(default = "default_queue_interval_ms")]
    pub queue_interval_ms: u64,
    #[serde(default = "default_chunk_len")]
    pub message_chunk_len: usize,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_interval_ms: default_queue_interval_ms(),
            message_chunk_len: default_chunk_len(),
            accept_invalid_certs: false,
            logging: LoggingConfig::default(),
            servers: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            queue_interval: Duration::from_millis(self.queue_interval_ms),
            chunk_len: self.message_chunk_len,
            accept_invalid_certs: self.accept_invalid_certs,
            log_raw: self.logging.log_raw,
        }
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// One IRC server plus the identity to register with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// User-facing label (e.g. `"libera"`).
    pub name: String,
    /// Hostname or IP address of the IRC server.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub tls: bool,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level: `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub log_raw: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_raw: true,
        }
    }
}

fn default_queue_interval_ms() -> u64 {
    1500
}
fn default_chunk_len() -> usize {
    DEFAULT_CHUNK_LEN
}
fn default_nickname() -> String {
    generate_nickname()
}
fn default_port() -> u16 {
    6697
}
fn default_true() -> bool {
    true
}
fn default_mode() -> String {
    "+i".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
