//! Named transport registry.
//!
//! Callers register custom transports under a name before opening any
//! client, then select one by name in the client configuration. The first
//! lookup seals the registry: later registrations fail, and lookups from
//! then on read an immutable map without taking the lock.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::RegistryError;
use crate::transport::Transport;

type TransportMap = HashMap<String, Arc<dyn Transport>>;

#[derive(Debug, Default)]
struct Pending {
    transports: TransportMap,
    sealed: bool,
}

/// Maps names to shared transports.
#[derive(Debug, Default)]
pub struct TransportRegistry {
    pending: Mutex<Pending>,
    sealed: OnceLock<TransportMap>,
}

impl TransportRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `transport` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Sealed`] once any lookup has happened and
    /// [`RegistryError::Duplicate`] if the name is taken.
    pub fn register(
        &self,
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut pending = self.pending.lock();
        if pending.sealed {
            return Err(RegistryError::Sealed { name });
        }
        if pending.transports.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        tracing::debug!(transport = %name, "registered transport");
        pending.transports.insert(name, transport);
        Ok(())
    }

    /// Look up a transport, sealing the registry on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Transport>, RegistryError> {
        self.seal()
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Whether the registry has been sealed by a lookup.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed.get().is_some()
    }

    /// Registered names, in no particular order. Seals the registry.
    pub fn names(&self) -> Vec<String> {
        self.seal().keys().cloned().collect()
    }

    fn seal(&self) -> &TransportMap {
        self.sealed.get_or_init(|| {
            let mut pending = self.pending.lock();
            pending.sealed = true;
            std::mem::take(&mut pending.transports)
        })
    }
}
