use crate::irc::connection::Connection;
use crate::irc::wrapper::ConnectionWrapper;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const CONNECTED: &str = "connected";
pub const RAW: &str = "raw";
pub const CONNECTION_LOST: &str = "connection-lost";
pub const REGISTRATION_COMPLETE: &str = "registration-complete";
pub const IRC_SEND: &str = "irc-send";
pub const PLUGIN_REGISTERED: &str = "plugin-registered";

/// A signal emission. The variant fixes both the signal name and the sender.
#[derive(Debug, Clone)]
pub enum Event {
    /// The transport is up and the Connection entered `Open`.
    Connected(Arc<Connection>),

    /// One framed inbound line, terminator and trailing whitespace removed.
    Raw {
        connection: Arc<Connection>,
        text: String,
    },

    /// The transport went away. Sent with the wrapper, not the dead Connection.
    ConnectionLost(ConnectionWrapper),

    /// PASS/USER/NICK have been queued.
    RegistrationComplete(Arc<Connection>),

    /// A line was written to the transport.
    IrcSend { text: String },

    PluginRegistered { name: String },

    /// Signals published by external consumers (parsed-message fan-out, plugins).
    Custom {
        name: String,
        connection: Option<Arc<Connection>>,
        context: BTreeMap<String, String>,
    },
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::Connected(_) => CONNECTED,
            Event::Raw { .. } => RAW,
            Event::ConnectionLost(_) => CONNECTION_LOST,
            Event::RegistrationComplete(_) => REGISTRATION_COMPLETE,
            Event::IrcSend { .. } => IRC_SEND,
            Event::PluginRegistered { .. } => PLUGIN_REGISTERED,
            Event::Custom { name, .. } => name.as_str(),
        }
    }

    /// The Connection that sent this event, if it was sent by one directly.
    pub fn connection(&self) -> Option<&Arc<Connection>> {
        match self {
            Event::Connected(conn) | Event::RegistrationComplete(conn) => Some(conn),
            Event::Raw { connection, .. } => Some(connection),
            Event::Custom { connection, .. } => connection.as_ref(),
            _ => None,
        }
    }

    /// Text payload for `raw`, `irc-send` and `plugin-registered`.
    pub fn text(&self) -> Option<&str> {
        match self {
            Event::Raw { text, .. } | Event::IrcSend { text } => Some(text.as_str()),
            Event::PluginRegistered { name } => Some(name.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_event_uses_its_own_name() {
        let mut context = BTreeMap::new();
        context.insert("target".to_string(), "#rust".to_string());
        let ev = Event::Custom {
            name: "privmsg".into(),
            connection: None,
            context,
        };
        assert_eq!(ev.name(), "privmsg");
        assert!(ev.connection().is_none());
        assert!(ev.text().is_none());
    }

    #[test]
    fn builtin_names() {
        assert_eq!(Event::IrcSend { text: "PING x".into() }.name(), IRC_SEND);
        assert_eq!(
            Event::PluginRegistered { name: "core".into() }.text(),
            Some("core")
        );
    }
}
