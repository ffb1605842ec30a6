//! Named-signal registry.
//!
//! Handlers for a signal run synchronously, in registration order, on the
//! task that emitted it. A failing handler stops the fan-out for that
//! emission and its error is returned to the emitter; handlers registered
//! after it do not run. There is no unregister.

use crate::error::{EngineError, Result};
use crate::event::signal::Event;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub type Handler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `name`. Registering the same closure twice
    /// delivers twice.
    pub fn connect<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(name.into())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Deliver `event` to every handler registered under `event.name()`.
    pub fn send(&self, event: &Event) -> Result<()> {
        // Snapshot so handlers may register further handlers while running.
        let handlers: Vec<Handler> = match self.handlers.read().get(event.name()) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };

        for handler in handlers {
            handler(event).map_err(|reason| EngineError::Handler {
                signal: event.name().to_string(),
                reason,
            })?;
        }
        Ok(())
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let mut names: Vec<_> = handlers.keys().collect();
        names.sort();
        f.debug_struct("EventBus").field("signals", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn custom(name: &str) -> Event {
        Event::Custom {
            name: name.to_string(),
            connection: None,
            context: Default::default(),
        }
    }

    #[test]
    fn fan_out_runs_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for id in 1..=3 {
            let seen = seen.clone();
            bus.connect("irc-send", move |ev| {
                seen.lock().push((id, ev.text().map(str::to_string)));
                Ok(())
            });
        }

        bus.send(&Event::IrcSend {
            text: "NICK crab".into(),
        })
        .unwrap();

        let seen = seen.lock();
        let order: Vec<_> = seen.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(seen.iter().all(|(_, t)| t.as_deref() == Some("NICK crab")));
    }

    #[test]
    fn same_handler_twice_delivers_twice() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        let handler = move |_: &Event| {
            *c.lock() += 1;
            Ok(())
        };
        bus.connect("tick", handler.clone());
        bus.connect("tick", handler);

        bus.send(&custom("tick")).unwrap();
        assert_eq!(*count.lock(), 2);
        assert_eq!(bus.handler_count("tick"), 2);
    }

    #[test]
    fn failing_handler_aborts_remaining_fan_out() {
        let bus = EventBus::new();
        let reached = Arc::new(Mutex::new(Vec::new()));

        let r = reached.clone();
        bus.connect("boom", move |_| {
            r.lock().push("first");
            Ok(())
        });
        bus.connect("boom", |_| anyhow::bail!("listener exploded"));
        let r = reached.clone();
        bus.connect("boom", move |_| {
            r.lock().push("third");
            Ok(())
        });

        let err = bus.send(&custom("boom")).unwrap_err();
        match err {
            EngineError::Handler { signal, reason } => {
                assert_eq!(signal, "boom");
                assert_eq!(reason.to_string(), "listener exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*reached.lock(), vec!["first"]);
    }

    #[test]
    fn unknown_signal_is_a_no_op() {
        let bus = EventBus::new();
        assert!(bus.send(&custom("nobody-listens")).is_ok());
        assert_eq!(bus.handler_count("nobody-listens"), 0);
    }

    #[test]
    fn handler_may_register_during_emission() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.connect("grow", move |_| {
            inner.connect("grow", |_| Ok(()));
            Ok(())
        });

        bus.send(&custom("grow")).unwrap();
        assert_eq!(bus.handler_count("grow"), 2);
    }
}
