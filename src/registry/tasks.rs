//! Task identity registry.

use super::stores::StoreRegistry;
use crate::{Error, ErrorContext, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Explicit registry shared by reference between task managers.
///
/// Owns the cache namespaces and the set of live task uids. A uid is released
/// when the [`Registration`] returned by [`TaskRegistry::register`] is dropped.
pub struct TaskRegistry {
    stores: StoreRegistry,
    uids: Mutex<HashSet<String>>,
}

impl TaskRegistry {
    pub fn new(stores: StoreRegistry) -> Arc<Self> {
        Arc::new(Self {
            stores,
            uids: Mutex::new(HashSet::new()),
        })
    }

    /// Registry with process-local stores.
    pub fn in_memory() -> Arc<Self> {
        Self::new(StoreRegistry::in_memory())
    }

    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    /// Claim `uid`. Fails if another live task already holds it.
    pub fn register(self: &Arc<Self>, uid: impl Into<String>) -> Result<Registration> {
        let uid = uid.into();
        let inserted = self
            .uids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uid.clone());
        if !inserted {
            return Err(Error::configuration_with_context(
                format!("uid \"{}\" is already registered", uid),
                ErrorContext::new()
                    .with_field_path("uid")
                    .with_source("task_registry"),
            ));
        }
        tracing::debug!(uid = %uid, "task registered");
        Ok(Registration {
            registry: Arc::downgrade(self),
            uid,
        })
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.uids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(uid)
    }

    pub fn len(&self) -> usize {
        self.uids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unregister(&self, uid: &str) {
        self.uids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uid);
        tracing::debug!(uid, "task unregistered");
    }
}

/// Lifecycle guard for a registered uid.
pub struct Registration {
    registry: Weak<TaskRegistry>,
    uid: String,
}

impl Registration {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn registry(&self) -> Option<Arc<TaskRegistry>> {
        self.registry.upgrade()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.uid);
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration").field("uid", &self.uid).finish()
    }
}
