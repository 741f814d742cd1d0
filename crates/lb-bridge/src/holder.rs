//! Per-bridge configuration holder.

use std::sync::{Arc, PoisonError, RwLock};

use lb_core::{BridgeError, Configuration};

/// Holds the active configuration.
///
/// Written only by `configure`; read by every other operation. A
/// reconfiguration swaps the whole value, so readers see either the old or
/// the new configuration, never a mix.
#[derive(Debug, Default)]
pub struct ConfigurationHolder {
    current: RwLock<Option<Arc<Configuration>>>,
}

impl ConfigurationHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<Configuration>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The active configuration, or `NotConfigured`.
    pub fn require(&self) -> Result<Arc<Configuration>, BridgeError> {
        self.get().ok_or(BridgeError::NotConfigured)
    }

    /// Installs `config`, returning the one it replaced.
    pub fn replace(&self, config: Configuration) -> Option<Arc<Configuration>> {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(config))
    }

    pub fn is_set(&self) -> bool {
        self.get().is_some()
    }
}
