//! Plugin bookkeeping.
//!
//! Plugins are external: they attach listeners to the bus. The engine only
//! remembers which plugin names have registered (via `plugin-registered`)
//! so each one is loaded once.

use crate::error::Result;
use crate::event::{signal, Event, EventBus};
use parking_lot::Mutex;
use std::sync::Arc;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Attach this plugin's handlers.
    fn register(&self, bus: &EventBus) -> anyhow::Result<()>;
}

/// Names seen on `plugin-registered`, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    names: Arc<Mutex<Vec<String>>>,
}

impl PluginRegistry {
    /// Create a registry that records every `plugin-registered` on `bus`.
    pub fn install(bus: &EventBus) -> Self {
        let registry = Self::default();
        let names = registry.names.clone();
        bus.connect(signal::PLUGIN_REGISTERED, move |ev| {
            if let Some(name) = ev.text() {
                names.lock().push(name.to_string());
            }
            Ok(())
        });
        registry
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.lock().iter().any(|n| n == name)
    }
}

/// Register every plugin not already known to `registry`, announcing each
/// on `plugin-registered`. Stops at the first failure.
pub fn load_plugins(bus: &EventBus, registry: &PluginRegistry, plugins: &[&dyn Plugin]) -> Result<()> {
    for plugin in plugins {
        if registry.contains(plugin.name()) {
            tracing::debug!("Plugin {} already loaded", plugin.name());
            continue;
        }
        plugin
            .register(bus)
            .map_err(|reason| crate::error::EngineError::Handler {
                signal: signal::PLUGIN_REGISTERED.to_string(),
                reason,
            })?;
        bus.send(&Event::PluginRegistered {
            name: plugin.name().to_string(),
        })?;
        tracing::info!("Loaded plugin {}", plugin.name());
    }
    Ok(())
}
