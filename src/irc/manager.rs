//! Connection setup and reconnection.
//!
//! [`Engine`] owns the event bus shared by every Connection it opens and
//! installs the reconnection reaction on it: when `connection-lost` fires,
//! one immediate attempt is made to reopen the same host/port/TLS and the
//! wrapper is repointed to the new Connection. There is no backoff and no
//! retry cap.

use crate::config::{EngineConfig, ServerConfig};
use crate::error::Result;
use crate::event::{signal, Event, EventBus};
use crate::irc::connection::{Connection, ConnectionOptions};
use crate::irc::transport::{self, BoxedStream, ConnectionParams};
use crate::irc::wrapper::ConnectionWrapper;
use crate::plugin::{self, Plugin, PluginRegistry};
use std::sync::Arc;

pub struct Engine {
    bus: Arc<EventBus>,
    config: EngineConfig,
    plugins: PluginRegistry,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_bus(Arc::new(EventBus::new()), config)
    }

    /// Use an existing bus. The reconnection reaction and plugin bookkeeping
    /// are registered on it.
    pub fn with_bus(bus: Arc<EventBus>, config: EngineConfig) -> Self {
        install_reconnect(&bus);
        let plugins = PluginRegistry::install(&bus);
        Self {
            bus,
            config,
            plugins,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        tracing::debug!("Registering function for event {}", event);
        self.bus.connect(event, handler);
    }

    pub fn plugins(&self) -> Vec<String> {
        self.plugins.names()
    }

    pub fn load_plugins(&self, plugins: &[&dyn Plugin]) -> Result<()> {
        plugin::load_plugins(&self.bus, &self.plugins, plugins)
    }

    /// Open a transport to `server:port` and return once the Connection is
    /// `Open`. Transport failures are returned as-is.
    pub async fn connect(&self, server: &str, port: u16, use_tls: bool) -> Result<ConnectionWrapper> {
        let params = ConnectionParams::new(server, port, use_tls);
        let options = self.config.connection_options();
        let stream = transport::establish(&params, options.accept_invalid_certs).await?;
        open(stream, params, options, self.bus.clone())
    }

    /// Run the engine over a caller-supplied stream. `params` is what a
    /// reconnect will dial.
    pub fn connect_stream(&self, stream: BoxedStream, params: ConnectionParams) -> Result<ConnectionWrapper> {
        open(stream, params, self.config.connection_options(), self.bus.clone())
    }

    /// Connect, register and join the channels of a configured server.
    /// Username and realname default to the nickname.
    pub async fn connect_server(&self, server: &ServerConfig) -> Result<ConnectionWrapper> {
        let wrapper = self.connect(&server.host, server.port, server.tls).await?;
        let user = server.username.as_deref().unwrap_or(&server.nickname);
        let realname = server.realname.as_deref().unwrap_or(&server.nickname);
        wrapper.register(
            &server.nickname,
            user,
            realname,
            Some(server.mode.as_str()),
            server.password.as_deref(),
        )?;
        if !server.channels.is_empty() {
            wrapper.join(server.channels.clone());
        }
        Ok(wrapper)
    }
}

fn open(
    stream: BoxedStream,
    params: ConnectionParams,
    options: ConnectionOptions,
    bus: Arc<EventBus>,
) -> Result<ConnectionWrapper> {
    let conn = Connection::new(stream, params, options, bus);
    let wrapper = ConnectionWrapper::new(conn.clone());
    conn.start()?;
    Ok(wrapper)
}

/// Reopen the wrapper's connection with the same parameters, options and
/// bus, then repoint the wrapper. A single attempt; its failure is returned.
pub async fn reconnect(wrapper: &ConnectionWrapper) -> Result<()> {
    let old = wrapper.current();
    let params = old.params().clone();
    let options = old.options().clone();
    let stream = transport::establish(&params, options.accept_invalid_certs).await?;

    let conn = Connection::new(stream, params, options, old.bus().clone());
    tracing::error!(conn = conn.id(), host = %conn.params().host, "Reconnecting...");
    conn.attach(wrapper);
    conn.start()?;
    wrapper.repoint(conn);
    Ok(())
}

/// On `connection-lost`, spawn [`reconnect`] for the wrapper that lost its
/// connection. Failures are logged; nothing retries them.
pub fn install_reconnect(bus: &EventBus) {
    bus.connect(signal::CONNECTION_LOST, |ev| {
        let Event::ConnectionLost(wrapper) = ev else {
            return Ok(());
        };
        let handle = tokio::runtime::Handle::try_current()?;
        let wrapper = wrapper.clone();
        handle.spawn(async move {
            if let Err(e) = reconnect(&wrapper).await {
                tracing::error!("Reconnect to {} failed: {e}", wrapper.params().host);
            }
        });
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::connection::ConnectionState;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            queue_interval_ms: 10,
            ..EngineConfig::default()
        }
    }

    async fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
    }

    #[tokio::test]
    async fn connect_frames_inbound_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let engine = Engine::new(fast_config());
        let raw = Arc::new(Mutex::new(Vec::new()));
        let sink = raw.clone();
        engine.on("raw", move |ev| {
            sink.lock().push(ev.text().unwrap_or_default().to_string());
            Ok(())
        });

        let (wrapper, accepted) = tokio::join!(engine.connect("127.0.0.1", port, false), listener.accept());
        let wrapper = wrapper.unwrap();
        let (mut server, _) = accepted.unwrap();
        assert_eq!(wrapper.state(), ConnectionState::Open);

        server.write_all(b":srv NOTICE * :hello\r\nPING :").await.unwrap();
        server.write_all(b"tok\r\n").await.unwrap();
        wait_for("two raw lines", || raw.lock().len() == 2).await;
        assert_eq!(*raw.lock(), vec![":srv NOTICE * :hello", "PING :tok"]);

        wrapper.close().await.unwrap();
    }

    #[tokio::test]
    async fn connect_server_registers_and_joins() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = Engine::new(fast_config());
        let server_cfg = ServerConfig {
            name: "local".into(),
            host: "127.0.0.1".into(),
            port,
            tls: false,
            nickname: "crab".into(),
            username: None,
            realname: Some("Ferris".into()),
            mode: "+i".into(),
            password: None,
            channels: vec!["#rust".into(), "#irc".into()],
        };

        let (wrapper, accepted) = tokio::join!(engine.connect_server(&server_cfg), listener.accept());
        let wrapper = wrapper.unwrap();
        let (server, _) = accepted.unwrap();
        assert_eq!(wrapper.nickname(), "crab");

        let mut lines = BufReader::new(server).lines();
        let mut got = Vec::new();
        for _ in 0..3 {
            got.push(lines.next_line().await.unwrap().unwrap());
        }
        assert_eq!(got, vec!["USER crab +i crab :Ferris", "NICK crab", "JOIN #rust,#irc"]);
        wrapper.close().await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_propagates() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let engine = Engine::new(fast_config());
        assert!(engine.connect("127.0.0.1", port, false).await.is_err());
    }

    #[tokio::test]
    async fn lost_connection_reconnects_and_repoints_wrapper() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let engine = Engine::new(fast_config());
        let lost = Arc::new(Mutex::new(Vec::<ConnectionWrapper>::new()));
        let sink = lost.clone();
        engine.on("connection-lost", move |ev| {
            if let Event::ConnectionLost(w) = ev {
                sink.lock().push(w.clone());
            }
            Ok(())
        });

        let (wrapper, accepted) = tokio::join!(engine.connect("127.0.0.1", port, false), listener.accept());
        let wrapper = wrapper.unwrap();
        let first = wrapper.current();
        let (first_server, _) = accepted.unwrap();

        // Server hangs up; the reaction dials back in.
        drop(first_server);
        let (second_server, _) = listener.accept().await.unwrap();
        wait_for("repoint", || wrapper.current().id() != first.id()).await;

        assert_eq!(first.state(), ConnectionState::Closed);
        assert_eq!(wrapper.state(), ConnectionState::Open);
        assert_eq!(wrapper.params(), first.params().clone());
        {
            let lost = lost.lock();
            assert_eq!(lost.len(), 1);
            assert!(lost[0].ptr_eq(&wrapper));
        }

        wrapper.writeln("PING :after");
        let mut lines = BufReader::new(second_server).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "PING :after");
        assert!(first.queued().is_empty());

        wrapper.close().await.unwrap();
    }

    #[tokio::test]
    async fn reconnect_failure_is_returned() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = Engine::new(fast_config());

        let (client, _server) = tokio::io::duplex(256);
        let wrapper = engine
            .connect_stream(Box::new(client), ConnectionParams::new("127.0.0.1", port, false))
            .unwrap();
        drop(listener);

        assert!(reconnect(&wrapper).await.is_err());
        wrapper.close().await.unwrap();
    }
}
