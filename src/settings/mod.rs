//! Settings pages built from an explicit schema.
//!
//! A [`Schema`] declares groups of fields; a [`SettingsController`] turns it
//! into a [`SettingsPage`] of typed keys, persists them per user through a
//! [`StorageBackend`], and writes applied values back to the fields.

pub mod controller;
pub mod defaults;
pub mod events;
pub mod factory;
pub mod group;
pub mod hash;
pub mod key;
pub mod kinds;
pub mod page;
pub mod schema;
pub mod storage;

pub use controller::{
    ApplyHandler, ControllerBuilder, DEFAULT_SCOPE, Settings, SettingsContext, SettingsController,
};
pub use defaults::DefaultRegistry;
pub use events::{DeferredQueue, DeferredTask, EventBus, SettingsEvent};
pub use factory::{FactoryChain, KeyContext, KeyFactory};
pub use group::SettingsGroup;
pub use hash::{Fnv1aHasher, PassThroughHasher, Sha256Hasher, UserIdHasher};
pub use key::{AnyKey, HeaderKey, KeyKind, SettingsKey};
pub use kinds::{BindingKind, Number, Selection, Toggle};
pub use page::SettingsPage;
pub use schema::{Choice, FieldAccessor, FieldDescriptor, GroupSchema, Schema};
pub use storage::{FileStorage, MemoryStorage, NullStorage, ScopedReader, ScopedWriter, StorageBackend};
