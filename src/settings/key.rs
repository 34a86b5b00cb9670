//! Settings keys.
//!
//! A [`SettingsKey`] wraps one schema field: it keeps a working value that
//! the UI edits, validates every assignment through its [`KeyKind`], and
//! writes the value back to the field on apply.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{Result, SettingsError};

use super::defaults::DefaultRegistry;
use super::schema::FieldAccessor;
use super::storage::{ScopedReader, ScopedWriter};

/// Per-type behaviour of a key: validation and string form.
pub trait KeyKind: 'static {
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Short kind name used in errors.
    const NAME: &'static str;

    /// Accepts `value`, possibly normalizing it in place, or rejects it.
    fn validate(&self, key: &str, value: &mut Self::Value, default: &Self::Value) -> Result<()>;

    /// Persisted string form of `value`.
    fn serialize(&self, key: &str, value: &Self::Value, default: &Self::Value) -> Result<String>;

    /// Parses a persisted string; the result is validated by the caller.
    fn deserialize(&self, key: &str, raw: &str) -> Result<Self::Value>;

    fn display(&self, value: &Self::Value) -> String {
        format!("{:?}", value)
    }
}

/// Object-safe view over keys of every kind.
pub trait AnyKey: Any {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn label(&self) -> &str;
    fn kind_name(&self) -> &'static str;

    /// Decorative entries are listed in their group only.
    fn is_header(&self) -> bool {
        false
    }

    fn is_changed(&self) -> bool;

    /// Writes the working value to the field and clears the changed flag.
    fn apply(&mut self);

    /// Reloads the working value from the field, discarding edits.
    fn reset(&mut self);

    /// Replaces the working value with the default snapshot and writes it to
    /// the field. Nothing is saved. Returns whether the working value changed.
    fn load_default(&mut self) -> bool;

    /// Replaces the working value with the stored one, or the default when
    /// nothing usable is stored. Returns whether the working value changed.
    fn load(&mut self, reader: &dyn ScopedReader) -> bool;

    fn save(&self, writer: &mut dyn ScopedWriter) -> Result<()>;

    fn display_value(&self) -> String;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A typed key over one field.
pub struct SettingsKey<K: KeyKind> {
    id: String,
    name: String,
    label: String,
    kind: K,
    accessor: FieldAccessor<K::Value>,
    default: Arc<K::Value>,
    value: K::Value,
    changed: bool,
}

impl<K: KeyKind> SettingsKey<K> {
    /// Creates the key, recording the field's current value as the default
    /// snapshot when this key id has none yet.
    pub fn new(
        schema: &str,
        id: String,
        name: impl Into<String>,
        label: Option<String>,
        kind: K,
        accessor: FieldAccessor<K::Value>,
        defaults: &DefaultRegistry,
    ) -> Self {
        let name = name.into();
        let default = defaults.snapshot(schema, &id, || accessor.get());
        let value = (*default).clone();
        let mut key = Self {
            label: label.unwrap_or_else(|| name.clone()),
            id,
            name,
            kind,
            accessor,
            default,
            value,
            changed: false,
        };
        key.reset();
        key
    }

    #[inline]
    pub fn value(&self) -> &K::Value {
        &self.value
    }

    #[inline]
    pub fn default_value(&self) -> &K::Value {
        &self.default
    }

    #[inline]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Value currently held by the field.
    pub fn field_value(&self) -> K::Value {
        self.accessor.get()
    }

    /// Assigns the working value.
    ///
    /// Equal values are ignored. Returns whether the value changed; a rejected
    /// value leaves the key untouched.
    pub(crate) fn set_value(&mut self, value: K::Value) -> Result<bool> {
        if value == self.value {
            return Ok(false);
        }
        let mut value = value;
        self.kind.validate(&self.id, &mut value, &self.default)?;
        if value == self.value {
            return Ok(false);
        }
        self.value = value;
        self.changed = true;
        Ok(true)
    }

    /// Validated copy of `value`, or the default if it is rejected.
    fn repaired(&self, mut value: K::Value) -> K::Value {
        match self.kind.validate(&self.id, &mut value, &self.default) {
            Ok(()) => value,
            Err(err) => {
                warn!(key = %self.id, error = %err, "replacing invalid value with default");
                (*self.default).clone()
            }
        }
    }

    fn replace(&mut self, value: K::Value) -> bool {
        if value == self.value {
            return false;
        }
        self.value = value;
        self.changed = true;
        true
    }
}

impl<K: KeyKind> AnyKey for SettingsKey<K> {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn kind_name(&self) -> &'static str {
        K::NAME
    }

    fn is_changed(&self) -> bool {
        self.changed
    }

    fn apply(&mut self) {
        self.accessor.set(self.value.clone());
        self.changed = false;
    }

    fn reset(&mut self) {
        let live = self.accessor.get();
        self.value = self.repaired(live);
        self.changed = false;
    }

    fn load_default(&mut self) -> bool {
        let default = self.repaired((*self.default).clone());
        let changed = self.replace(default);
        self.apply();
        changed
    }

    fn load(&mut self, reader: &dyn ScopedReader) -> bool {
        let stored = match reader.try_read(&self.id) {
            Some(raw) => match self.kind.deserialize(&self.id, &raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key = %self.id, error = %err, "ignoring unreadable stored value");
                    None
                }
            },
            None => None,
        };
        let value = self.repaired(stored.unwrap_or_else(|| (*self.default).clone()));
        self.replace(value)
    }

    fn save(&self, writer: &mut dyn ScopedWriter) -> Result<()> {
        let raw = self.kind.serialize(&self.id, &self.value, &self.default)?;
        writer.write(&self.id, raw);
        Ok(())
    }

    fn display_value(&self) -> String {
        self.kind.display(&self.value)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<K: KeyKind> fmt::Debug for SettingsKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsKey")
            .field("id", &self.id)
            .field("kind", &K::NAME)
            .field("value", &self.value)
            .field("changed", &self.changed)
            .finish()
    }
}

/// A decorative header between keys.
#[derive(Debug, Clone)]
pub struct HeaderKey {
    id: String,
    text: String,
}

impl HeaderKey {
    pub fn new(id: String, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

impl AnyKey for HeaderKey {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.text
    }

    fn label(&self) -> &str {
        &self.text
    }

    fn kind_name(&self) -> &'static str {
        "header"
    }

    fn is_header(&self) -> bool {
        true
    }

    fn is_changed(&self) -> bool {
        false
    }

    fn apply(&mut self) {}

    fn reset(&mut self) {}

    fn load_default(&mut self) -> bool {
        false
    }

    fn load(&mut self, _reader: &dyn ScopedReader) -> bool {
        false
    }

    fn save(&self, _writer: &mut dyn ScopedWriter) -> Result<()> {
        Ok(())
    }

    fn display_value(&self) -> String {
        String::new()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcasts a key to its typed form.
pub fn downcast_key<'a, K: KeyKind>(key: &'a dyn AnyKey) -> Result<&'a SettingsKey<K>> {
    key.as_any()
        .downcast_ref::<SettingsKey<K>>()
        .ok_or_else(|| SettingsError::KindMismatch {
            key: key.id().to_string(),
            expected: K::NAME,
        })
}

/// Mutable form of [`downcast_key`].
pub fn downcast_key_mut<'a, K: KeyKind>(key: &'a mut dyn AnyKey) -> Result<&'a mut SettingsKey<K>> {
    let id = key.id().to_string();
    key.as_any_mut()
        .downcast_mut::<SettingsKey<K>>()
        .ok_or(SettingsError::KindMismatch {
            key: id,
            expected: K::NAME,
        })
}
