//! Default snapshots.
//!
//! The first time a key is constructed, the value its field holds is recorded
//! here under `(schema, key id)`. The snapshot never changes afterwards and is
//! what reset-to-default and binding merges fall back to.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

type Snapshot = Arc<dyn Any + Send + Sync>;

static GLOBAL_DEFAULTS: OnceLock<Arc<DefaultRegistry>> = OnceLock::new();

/// Table of default snapshots keyed by schema name and key id.
#[derive(Default)]
pub struct DefaultRegistry {
    snapshots: scc::HashMap<(String, String), Snapshot>,
}

impl DefaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> Arc<DefaultRegistry> {
        Arc::clone(GLOBAL_DEFAULTS.get_or_init(|| Arc::new(DefaultRegistry::new())))
    }

    /// Returns the stored snapshot, recording `capture()` first if the key has
    /// none yet.
    pub fn snapshot<T, F>(&self, schema: &str, key: &str, capture: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let slot = (schema.to_string(), key.to_string());
        if let Some(existing) = self.snapshots.read_sync(&slot, |_, v| Arc::clone(v)) {
            match existing.downcast::<T>() {
                Ok(value) => return value,
                Err(_) => {
                    // Schema changed the field's type within one process.
                    warn!(schema, key, "default snapshot has a different type, not reusing it");
                    return Arc::new(capture());
                }
            }
        }

        let value = Arc::new(capture());
        match self
            .snapshots
            .insert_sync(slot, Arc::clone(&value) as Snapshot)
        {
            Ok(()) => {
                debug!(schema, key, "recorded default snapshot");
                value
            }
            // Lost a race against another registration: keep the first one.
            Err((slot, _)) => self
                .snapshots
                .read_sync(&slot, |_, v| Arc::clone(v))
                .and_then(|existing| existing.downcast::<T>().ok())
                .unwrap_or(value),
        }
    }

    /// The stored snapshot, if any and of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self, schema: &str, key: &str) -> Option<Arc<T>> {
        let slot = (schema.to_string(), key.to_string());
        self.snapshots
            .read_sync(&slot, |_, v| Arc::clone(v))
            .and_then(|existing| existing.downcast::<T>().ok())
    }

    pub fn contains(&self, schema: &str, key: &str) -> bool {
        self.snapshots
            .contains_sync(&(schema.to_string(), key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
