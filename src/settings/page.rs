//! A settings page: every group of one schema, with a flat key index.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, SettingsError};

use super::defaults::DefaultRegistry;
use super::events::{DeferredQueue, DeferredTask, EventBus, SettingsEvent};
use super::factory::{FactoryChain, KeyContext};
use super::group::SettingsGroup;
use super::key::{AnyKey, HeaderKey, KeyKind, SettingsKey, downcast_key, downcast_key_mut};
use super::kinds::Toggle;
use super::schema::{GroupEntry, Schema, key_id};
use super::storage::{ScopedReader, ScopedWriter};

pub struct SettingsPage {
    schema: String,
    groups: Vec<SettingsGroup>,
    /// Key id to (group, entry) position; headers are not indexed.
    index: HashMap<String, (usize, usize)>,
    bus: EventBus,
    pending: DeferredQueue<DeferredTask>,
}

impl SettingsPage {
    /// Builds one key per field through the factory chain. Fields no factory
    /// recognizes are left out.
    pub fn build(
        schema: &Schema,
        factories: &FactoryChain,
        defaults: &DefaultRegistry,
        bus: EventBus,
    ) -> Self {
        let mut groups = Vec::with_capacity(schema.groups().len());
        let mut index = HashMap::new();

        for (group_index, group) in schema.groups().iter().enumerate() {
            let mut keys: Vec<Box<dyn AnyKey>> = Vec::with_capacity(group.entries().len());
            let mut headers = 0usize;
            for entry in group.entries() {
                match entry {
                    GroupEntry::Header(text) => {
                        let id = format!("{}.#{}", group.name(), headers);
                        headers += 1;
                        keys.push(Box::new(HeaderKey::new(id, text.clone())));
                    }
                    GroupEntry::Field(field) => {
                        let id = key_id(group.name(), field.name());
                        let cx = KeyContext {
                            schema: schema.name(),
                            group: group.name(),
                            id: &id,
                            defaults,
                        };
                        match factories.create(field, &cx) {
                            Some(key) => {
                                index.insert(id, (group_index, keys.len()));
                                keys.push(key);
                            }
                            None => {
                                debug!(key = %id, declared = field.type_name(), "no key factory for field")
                            }
                        }
                    }
                }
            }
            groups.push(SettingsGroup::new(
                group.name().to_string(),
                group.display_label().to_string(),
                keys,
                group.visibility().cloned(),
            ));
        }

        let page = Self {
            schema: schema.name().to_string(),
            groups,
            index,
            bus,
            pending: DeferredQueue::new(),
        };
        for (i, group) in page.groups.iter().enumerate() {
            group.report_visibility(page.is_group_visible(i));
        }
        debug!(schema = %page.schema, keys = page.index.len(), "settings page built");
        page
    }

    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn groups(&self) -> &[SettingsGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&SettingsGroup> {
        self.groups.iter().find(|group| group.name() == name)
    }

    /// Every non-header key in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &dyn AnyKey> {
        self.groups.iter().flat_map(|group| group.keys())
    }

    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys().map(|key| key.id())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn locate(&self, id: &str) -> Result<(usize, usize)> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| SettingsError::UnknownKey(id.to_string()))
    }

    pub fn any_key(&self, id: &str) -> Result<&dyn AnyKey> {
        let (group, entry) = self.locate(id)?;
        Ok(self.groups[group].entry(entry))
    }

    pub fn key<K: KeyKind>(&self, id: &str) -> Result<&SettingsKey<K>> {
        downcast_key(self.any_key(id)?)
    }

    /// Working value of a key.
    pub fn get<K: KeyKind>(&self, id: &str) -> Result<K::Value> {
        Ok(self.key::<K>(id)?.value().clone())
    }

    /// Assigns a key's working value.
    ///
    /// Returns whether the value changed. Invalid values are rejected and
    /// leave the key as it was. Turning on a toggle with an exclusive group
    /// turns off every other toggle of that group before this returns.
    pub fn set<K: KeyKind>(&mut self, id: &str, value: K::Value) -> Result<bool> {
        let (group, entry) = self.locate(id)?;
        let changed = downcast_key_mut::<K>(self.groups[group].entry_mut(entry))?.set_value(value)?;
        if changed {
            self.notify(id);
        }
        self.enforce_exclusive(group, entry);
        Ok(changed)
    }

    fn enforce_exclusive(&mut self, group: usize, entry: usize) {
        let Some(toggle) = self.groups[group]
            .entry(entry)
            .as_any()
            .downcast_ref::<SettingsKey<Toggle>>()
        else {
            return;
        };
        if !*toggle.value() {
            return;
        }
        let Some(exclusive) = toggle.kind().exclusive_group.clone() else {
            return;
        };

        let mut switched_off = Vec::new();
        for (g, settings_group) in self.groups.iter_mut().enumerate() {
            for e in 0..settings_group.len() {
                if (g, e) == (group, entry) {
                    continue;
                }
                let Some(other) = settings_group
                    .entry_mut(e)
                    .as_any_mut()
                    .downcast_mut::<SettingsKey<Toggle>>()
                else {
                    continue;
                };
                if other.kind().exclusive_group.as_deref() != Some(exclusive.as_str()) {
                    continue;
                }
                // Validation of a toggle never fails.
                if let Ok(true) = other.set_value(false) {
                    switched_off.push(other.id().to_string());
                }
            }
        }
        for id in switched_off {
            self.notify(&id);
        }
    }

    fn notify(&mut self, id: &str) {
        self.bus.emit(SettingsEvent::ValueChanged { key: id.to_string() });
        self.invalidate_visibility();
    }

    fn invalidate_visibility(&mut self) {
        for group in &self.groups {
            group.mark_visibility_dirty();
        }
        self.pending.schedule(DeferredTask::RefreshVisibility);
    }

    pub fn is_changed(&self) -> bool {
        self.groups.iter().any(SettingsGroup::is_changed)
    }

    /// Writes every working value back to its field.
    pub fn apply(&mut self) {
        for group in &mut self.groups {
            group.apply();
        }
    }

    /// Reloads every working value from its field.
    pub fn reset(&mut self) {
        for group in &mut self.groups {
            group.reset();
        }
        self.invalidate_visibility();
    }

    /// Restores every default snapshot. Returns whether anything changed.
    pub fn load_default(&mut self) -> bool {
        let mut changed = false;
        for group in &mut self.groups {
            changed |= group.load_default();
        }
        self.invalidate_visibility();
        changed
    }

    /// Loads stored values, falling back to defaults for keys with nothing
    /// stored. Returns whether anything changed.
    pub fn load(&mut self, reader: &dyn ScopedReader) -> bool {
        let mut changed = false;
        for group in &mut self.groups {
            for e in 0..group.len() {
                changed |= group.entry_mut(e).load(reader);
            }
        }
        self.invalidate_visibility();
        changed
    }

    pub fn save(&self, writer: &mut dyn ScopedWriter) -> Result<()> {
        for key in self.keys() {
            key.save(writer)?;
        }
        Ok(())
    }

    /// Whether a group is shown, resolving its predicate if a key changed
    /// since the last resolution.
    pub fn is_group_visible(&self, index: usize) -> bool {
        let Some(group) = self.groups.get(index) else {
            return false;
        };
        if let Some(visible) = group.cached_visibility() {
            return visible;
        }
        let visible = group.visibility_rule().is_none_or(|rule| rule(self));
        group.store_visibility(visible);
        visible
    }

    pub fn visible_groups(&self) -> impl Iterator<Item = &SettingsGroup> {
        self.groups
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_group_visible(*i))
            .map(|(_, group)| group)
    }

    /// Resolves deferred work queued since the previous tick. Returns the
    /// number of groups whose visibility flipped.
    pub fn tick(&mut self) -> usize {
        let tasks: Vec<DeferredTask> = self.pending.drain().collect();
        let mut flipped = 0;
        for task in tasks {
            match task {
                DeferredTask::RefreshVisibility => {
                    for (i, group) in self.groups.iter().enumerate() {
                        let visible = self.is_group_visible(i);
                        if group.report_visibility(visible) != visible {
                            flipped += 1;
                            self.bus.emit(SettingsEvent::VisibilityChanged {
                                group: group.name().to_string(),
                                visible,
                            });
                        }
                    }
                }
            }
        }
        flipped
    }

    pub fn has_pending_work(&self) -> bool {
        !self.pending.is_empty()
    }
}
