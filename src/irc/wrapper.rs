//! Stable handle across reconnects.
//!
//! A [`ConnectionWrapper`] points at exactly one [`Connection`] at a time and
//! forwards every operation to it. Reconnection swaps the target under a
//! write lock; readers always see either the old or the new Connection.

use crate::error::Result;
use crate::event::Event;
use crate::irc::commands::Channels;
use crate::irc::connection::{Connection, ConnectionState};
use crate::irc::transport::ConnectionParams;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};

pub(crate) type WrapperSlot = RwLock<Arc<Connection>>;

#[derive(Clone)]
pub struct ConnectionWrapper {
    slot: Arc<WrapperSlot>,
}

impl ConnectionWrapper {
    /// Wrap `connection` and record this wrapper on it, so a lost transport
    /// is reported with the wrapper as the sender.
    pub fn new(connection: Arc<Connection>) -> Self {
        let wrapper = Self {
            slot: Arc::new(RwLock::new(connection.clone())),
        };
        connection.attach(&wrapper);
        wrapper
    }

    /// The Connection operations are currently forwarded to.
    pub fn current(&self) -> Arc<Connection> {
        self.slot.read().clone()
    }

    /// Point at `connection` from now on.
    pub fn repoint(&self, connection: Arc<Connection>) {
        connection.attach(self);
        *self.slot.write() = connection;
    }

    /// Same handle (not merely the same target).
    pub fn ptr_eq(&self, other: &ConnectionWrapper) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn downgrade(&self) -> Weak<WrapperSlot> {
        Arc::downgrade(&self.slot)
    }

    pub(crate) fn upgrade(weak: &Weak<WrapperSlot>) -> Option<Self> {
        weak.upgrade().map(|slot| Self { slot })
    }

    pub fn writeln(&self, line: impl Into<String>) {
        self.current().writeln(line);
    }

    pub fn register(
        &self,
        nick: &str,
        user: &str,
        realname: &str,
        mode: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        self.current().register(nick, user, realname, mode, password)
    }

    pub fn join(&self, channels: impl Into<Channels>) {
        self.current().join(channels);
    }

    pub fn part(&self, channels: impl Into<Channels>) {
        self.current().part(channels);
    }

    pub fn say(&self, target: &str, message: &str) {
        self.current().say(target, message);
    }

    pub fn send_command(&self, name: &str, args: &[&str]) {
        self.current().send_command(name, args);
    }

    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.current().on(event, handler);
    }

    pub async fn close(&self) -> Result<()> {
        self.current().close().await
    }

    pub fn state(&self) -> ConnectionState {
        self.current().state()
    }

    pub fn params(&self) -> ConnectionParams {
        self.current().params().clone()
    }

    pub fn nickname(&self) -> String {
        self.current().nickname()
    }

    pub fn set_nickname(&self, nick: &str) {
        self.current().set_nickname(nick);
    }

    pub fn server_supports(&self, key: &str) -> Option<String> {
        self.current().server_supports(key)
    }
}

impl std::fmt::Debug for ConnectionWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWrapper")
            .field("connection", &*self.slot.read())
            .finish()
    }
}
