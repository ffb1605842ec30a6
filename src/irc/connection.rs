//! The live state of one transport session.
//!
//! A [`Connection`] is built around an already-established stream, moves to
//! `Open` on [`start`](Connection::start), and from then on two tasks drive
//! it: a reader that frames inbound bytes into `raw` events, and a drain
//! task that writes at most one queued line per interval. When the reader
//! sees EOF or an error the Connection moves to `Closed` and emits
//! `connection-lost` with its wrapper as the sender.

use crate::error::{EngineError, Result};
use crate::event::{Event, EventBus};
use crate::irc::commands::{self, Channels};
use crate::irc::transport::{BoxedStream, ConnectionParams};
use crate::irc::wrapper::{ConnectionWrapper, WrapperSlot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Per-connection tuning, carried over to reconnected sessions.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Drain period: at most one queued line is written per interval.
    pub queue_interval: Duration,
    /// PRIVMSG payload size used by [`Connection::say`].
    pub chunk_len: usize,
    pub accept_invalid_certs: bool,
    /// Log every framed inbound line at debug level.
    pub log_raw: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            queue_interval: Duration::from_millis(1500),
            chunk_len: commands::DEFAULT_CHUNK_LEN,
            accept_invalid_certs: false,
            log_raw: true,
        }
    }
}

/// Registration and server-advertised state.
#[derive(Debug, Default)]
struct Session {
    nickname: String,
    previous_nickname: Option<String>,
    server_supports: HashMap<String, String>,
    caps: HashSet<String>,
    last_ping_sent_at: Option<DateTime<Utc>>,
    last_pong_received_at: Option<DateTime<Utc>>,
}

pub struct Connection {
    id: u64,
    params: ConnectionParams,
    options: ConnectionOptions,
    bus: Arc<EventBus>,
    state: Mutex<ConnectionState>,
    inbound: Mutex<Vec<u8>>,
    queue: Mutex<VecDeque<String>>,
    session: Mutex<Session>,
    reader: Mutex<Option<ReadHalf<BoxedStream>>>,
    writer: tokio::sync::Mutex<WriteHalf<BoxedStream>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    wrapper: Mutex<Weak<WrapperSlot>>,
}

impl Connection {
    /// Wrap an established transport. The Connection stays in `Connecting`
    /// and nothing runs until [`start`](Self::start).
    pub fn new(
        stream: BoxedStream,
        params: ConnectionParams,
        options: ConnectionOptions,
        bus: Arc<EventBus>,
    ) -> Arc<Self> {
        let (reader, writer) = tokio::io::split(stream);
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            params,
            options,
            bus,
            state: Mutex::new(ConnectionState::Connecting),
            inbound: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            session: Mutex::new(Session::default()),
            reader: Mutex::new(Some(reader)),
            writer: tokio::sync::Mutex::new(writer),
            tasks: Mutex::new(Vec::new()),
            wrapper: Mutex::new(Weak::new()),
        })
    }

    /// Enter `Open`: reset per-session state, emit `connected`, then spawn
    /// the drain and reader tasks. Must run inside a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                return Err(EngineError::Closed);
            }
            *state = ConnectionState::Open;
        }
        self.inbound.lock().clear();
        self.queue.lock().clear();
        *self.session.lock() = Session::default();

        self.bus.send(&Event::Connected(self.clone()))?;
        tracing::info!(conn = self.id, "Connection success.");

        let drain = tokio::spawn(self.clone().drain_queue());
        let mut tasks = vec![drain];
        if let Some(reader) = self.reader.lock().take() {
            tasks.push(tokio::spawn(self.clone().read_loop(reader)));
        }
        self.tasks.lock().extend(tasks);
        Ok(())
    }

    async fn read_loop(self: Arc<Self>, mut reader: ReadHalf<BoxedStream>) {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if let Err(e) = self.data_received(&buf[..n]) {
                        // Same as the transport dropping: the session is over.
                        tracing::error!(conn = self.id, "Receive failed: {e}");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(conn = self.id, "Read error: {e}");
                    break;
                }
            }
        }
        self.connection_lost();
    }

    /// Append bytes to the inbound buffer and emit one `raw` event per
    /// complete `\n`-terminated line. A trailing partial line stays buffered.
    pub fn data_received(self: &Arc<Self>, data: &[u8]) -> Result<()> {
        self.inbound.lock().extend_from_slice(data);

        loop {
            let line = {
                let mut inbound = self.inbound.lock();
                let Some(index) = inbound.iter().position(|b| *b == b'\n') else {
                    break;
                };
                let mut line: Vec<u8> = inbound.drain(..=index).collect();
                line.pop();
                line
            };
            let text = String::from_utf8(line)?.trim_end().to_string();
            if self.options.log_raw {
                tracing::debug!(conn = self.id, "{}", text);
            }
            self.bus.send(&Event::Raw {
                connection: self.clone(),
                text,
            })?;
        }
        Ok(())
    }

    /// Transport went away: move to `Closed` and tell whoever holds the
    /// wrapper. A Connection that was closed deliberately stays quiet.
    fn connection_lost(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Closed {
                return;
            }
            *state = ConnectionState::Closed;
        }
        self.abort_tasks();
        tracing::error!(conn = self.id, host = %self.params.host, "Connection lost.");

        match self.wrapper() {
            Some(wrapper) => {
                if let Err(e) = self.bus.send(&Event::ConnectionLost(wrapper)) {
                    tracing::error!(conn = self.id, "connection-lost handler failed: {e}");
                }
            }
            None => tracing::warn!(conn = self.id, "No wrapper holds this connection"),
        }
    }

    /// Deliberate shutdown. Does not emit `connection-lost`.
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Closed {
                return Ok(());
            }
            *state = ConnectionState::Closed;
        }
        self.abort_tasks();
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }

    fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    async fn drain_queue(self: Arc<Self>) {
        loop {
            if self.state() == ConnectionState::Closed {
                break;
            }
            let next = self.queue.lock().pop_front();
            if let Some(line) = next {
                if let Err(e) = self.write_raw(&line).await {
                    tracing::warn!(conn = self.id, "Write failed: {e}");
                    break;
                }
            }
            tokio::time::sleep(self.options.queue_interval).await;
        }
    }

    /// Write one line plus `\r\n` straight to the transport and emit
    /// `irc-send`. Everything else goes through [`writeln`](Self::writeln).
    pub(crate) async fn write_raw(&self, line: &str) -> Result<()> {
        if self.state() == ConnectionState::Closed {
            return Err(EngineError::Closed);
        }
        {
            let mut writer = self.writer.lock().await;
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\r\n").await?;
            writer.flush().await?;
        }
        tracing::trace!(conn = self.id, ">> {}", line);
        self.bus.send(&Event::IrcSend {
            text: line.to_string(),
        })
    }

    /// Queue a line for the drain task. Never blocks, never writes.
    pub fn writeln(&self, line: impl Into<String>) {
        self.queue.lock().push_back(line.into());
    }

    /// Queue PASS (if any), USER and NICK, emit `registration-complete` and
    /// record `nick` as current without waiting for the server.
    pub fn register(
        self: &Arc<Self>,
        nick: &str,
        user: &str,
        realname: &str,
        mode: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        {
            let mut queue = self.queue.lock();
            if let Some(password) = password.filter(|p| !p.is_empty()) {
                queue.push_back(commands::pass_line(password));
            }
            queue.push_back(commands::user_line(user, mode.unwrap_or("+i"), realname));
            queue.push_back(commands::nick_line(nick));
        }
        let sent = self.bus.send(&Event::RegistrationComplete(self.clone()));
        self.session.lock().nickname = nick.to_string();
        sent
    }

    pub fn join(&self, channels: impl Into<Channels>) {
        self.writeln(commands::join_line(&channels.into()));
    }

    pub fn part(&self, channels: impl Into<Channels>) {
        self.writeln(commands::part_line(&channels.into()));
    }

    pub fn say(&self, target: &str, message: &str) {
        for line in commands::privmsg_lines(target, message, self.options.chunk_len) {
            self.writeln(line);
        }
    }

    /// Queue any verb without a dedicated method: `MODE #chan +o :alice`.
    pub fn send_command(&self, name: &str, args: &[&str]) {
        self.writeln(commands::format_command(name, args));
    }

    /// Register a handler on this Connection's bus.
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        tracing::debug!("Registering function for event {}", event);
        self.bus.connect(event, handler);
    }

    pub(crate) fn attach(&self, wrapper: &ConnectionWrapper) {
        *self.wrapper.lock() = wrapper.downgrade();
    }

    /// The wrapper currently holding this Connection, if it is still alive.
    pub fn wrapper(&self) -> Option<ConnectionWrapper> {
        ConnectionWrapper::upgrade(&self.wrapper.lock())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn queued(&self) -> Vec<String> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Bytes received but not yet resolved into a complete line.
    pub fn pending_inbound(&self) -> Vec<u8> {
        self.inbound.lock().clone()
    }

    pub fn nickname(&self) -> String {
        self.session.lock().nickname.clone()
    }

    pub fn previous_nickname(&self) -> Option<String> {
        self.session.lock().previous_nickname.clone()
    }

    pub fn set_nickname(&self, nick: &str) {
        let mut session = self.session.lock();
        let old = std::mem::replace(&mut session.nickname, nick.to_string());
        session.previous_nickname = Some(old);
    }

    pub fn server_supports(&self, key: &str) -> Option<String> {
        self.session.lock().server_supports.get(key).cloned()
    }

    pub fn set_server_support(&self, key: impl Into<String>, value: impl Into<String>) {
        self.session
            .lock()
            .server_supports
            .insert(key.into(), value.into());
    }

    pub fn caps(&self) -> HashSet<String> {
        self.session.lock().caps.clone()
    }

    pub fn add_cap(&self, cap: impl Into<String>) {
        self.session.lock().caps.insert(cap.into());
    }

    pub fn has_cap(&self, cap: &str) -> bool {
        self.session.lock().caps.contains(cap)
    }

    pub fn mark_ping_sent(&self) {
        self.session.lock().last_ping_sent_at = Some(Utc::now());
    }

    pub fn mark_pong_received(&self) {
        self.session.lock().last_pong_received_at = Some(Utc::now());
    }

    pub fn last_ping_sent_at(&self) -> Option<DateTime<Utc>> {
        self.session.lock().last_ping_sent_at
    }

    pub fn last_pong_received_at(&self) -> Option<DateTime<Utc>> {
        self.session.lock().last_pong_received_at
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("host", &self.params.host)
            .field("port", &self.params.port)
            .field("state", &self.state())
            .finish()
    }
}
