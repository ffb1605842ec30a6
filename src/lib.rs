//! Client-side IRC connection engine.
//!
//! Owns one TCP/TLS connection per server, frames the inbound byte stream
//! into lines and publishes them as `raw` events on an [`EventBus`], sends
//! outbound lines through a flood-limited queue, and reconnects when the
//! transport drops. Parsing lines into structured messages is left to
//! listeners (see [`parse_message`](crate::irc::commands::parse_message)).
//!
//! ```no_run
//! use asyncirc::{Engine, EngineConfig};
//!
//! # async fn run() -> asyncirc::Result<()> {
//! let engine = Engine::new(EngineConfig::default());
//! engine.on("raw", |ev| {
//!     println!("<< {}", ev.text().unwrap_or_default());
//!     Ok(())
//! });
//! let conn = engine.connect("irc.libera.chat", 6697, true).await?;
//! conn.register("crab", "crab", "Ferris", None, None)?;
//! conn.join("#rust");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod irc;
pub mod logging;
pub mod plugin;

pub use config::{EngineConfig, LoggingConfig, ServerConfig};
pub use error::{EngineError, Result};
pub use event::{Event, EventBus};
pub use crate::irc::commands::{parse_message, Channels};
pub use crate::irc::connection::{Connection, ConnectionOptions, ConnectionState};
pub use crate::irc::identity::{resolve_user, Identity, UserRef};
pub use crate::irc::manager::{reconnect, Engine};
pub use crate::irc::transport::ConnectionParams;
pub use crate::irc::wrapper::ConnectionWrapper;
pub use plugin::{Plugin, PluginRegistry};
