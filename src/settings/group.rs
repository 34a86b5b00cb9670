//! A group of keys built from one [`GroupSchema`].

use std::cell::Cell;

use super::key::AnyKey;
use super::schema::VisibilityFn;

pub struct SettingsGroup {
    name: String,
    label: String,
    keys: Vec<Box<dyn AnyKey>>,
    visibility: Option<VisibilityFn>,
    /// Cached result of the visibility predicate.
    visible: Cell<bool>,
    visibility_dirty: Cell<bool>,
    /// Visibility last reported by a tick.
    reported: Cell<bool>,
}

impl SettingsGroup {
    pub(crate) fn new(
        name: String,
        label: String,
        keys: Vec<Box<dyn AnyKey>>,
        visibility: Option<VisibilityFn>,
    ) -> Self {
        Self {
            name,
            label,
            keys,
            visibility,
            visible: Cell::new(true),
            visibility_dirty: Cell::new(true),
            reported: Cell::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Every entry, headers included, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &dyn AnyKey> {
        self.keys.iter().map(|key| key.as_ref())
    }

    /// Keys excluding headers.
    pub fn keys(&self) -> impl Iterator<Item = &dyn AnyKey> {
        self.entries().filter(|key| !key.is_header())
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> &mut dyn AnyKey {
        self.keys[index].as_mut()
    }

    pub(crate) fn entry(&self, index: usize) -> &dyn AnyKey {
        self.keys[index].as_ref()
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_changed(&self) -> bool {
        self.keys.iter().any(|key| key.is_changed())
    }

    pub fn has_visibility_rule(&self) -> bool {
        self.visibility.is_some()
    }

    pub fn apply(&mut self) {
        for key in &mut self.keys {
            key.apply();
        }
    }

    pub fn reset(&mut self) {
        for key in &mut self.keys {
            key.reset();
        }
    }

    /// Returns whether any key changed.
    pub fn load_default(&mut self) -> bool {
        let mut changed = false;
        for key in &mut self.keys {
            changed |= key.load_default();
        }
        changed
    }

    pub(crate) fn mark_visibility_dirty(&self) {
        if self.visibility.is_some() {
            self.visibility_dirty.set(true);
        }
    }

    pub(crate) fn visibility_rule(&self) -> Option<&VisibilityFn> {
        self.visibility.as_ref()
    }

    pub(crate) fn cached_visibility(&self) -> Option<bool> {
        (!self.visibility_dirty.get()).then(|| self.visible.get())
    }

    pub(crate) fn store_visibility(&self, visible: bool) {
        self.visible.set(visible);
        self.visibility_dirty.set(false);
    }

    /// Swaps the reported visibility, returning the previous one.
    pub(crate) fn report_visibility(&self, visible: bool) -> bool {
        self.reported.replace(visible)
    }
}
