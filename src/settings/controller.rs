//! Settings controller: storage, user switching and the apply lifecycle
//! for one schema, plus the per-type controller cache.

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::input::{Binding, BindingMediator};

use super::defaults::DefaultRegistry;
use super::events::{EventBus, SettingsEvent};
use super::factory::{FactoryChain, KeyFactory};
use super::hash::{PassThroughHasher, UserIdHasher, hash_user_id};
use super::key::KeyKind;
use super::page::SettingsPage;
use super::schema::Schema;
use super::storage::{NullStorage, StorageBackend};

/// Storage scope used before any user is active.
pub const DEFAULT_SCOPE: &str = "default";

/// Called after every apply with the applied page.
pub type ApplyHandler = Box<dyn Fn(&SettingsPage) -> anyhow::Result<()>>;

pub struct ControllerBuilder {
    schema: Schema,
    factories: Vec<Box<dyn KeyFactory>>,
    storage: Box<dyn StorageBackend>,
    hasher: Box<dyn UserIdHasher>,
    salt: String,
    handlers: Vec<(String, ApplyHandler)>,
    defaults: Option<Arc<DefaultRegistry>>,
}

impl ControllerBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            factories: Vec::new(),
            storage: Box::new(NullStorage),
            hasher: Box::new(PassThroughHasher),
            salt: String::new(),
            handlers: Vec::new(),
            defaults: None,
        }
    }

    /// Adds a factory tried before the built-in ones, after any added earlier.
    pub fn factory(mut self, factory: impl KeyFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn storage(mut self, storage: impl StorageBackend + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    pub fn boxed_storage(mut self, storage: Box<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    pub fn hasher(mut self, hasher: impl UserIdHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn boxed_hasher(mut self, hasher: Box<dyn UserIdHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn on_applied<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&SettingsPage) -> anyhow::Result<()> + 'static,
    {
        self.handlers.push((name.into(), Box::new(handler)));
        self
    }

    /// Default snapshot table; the process-wide one when not set.
    pub fn defaults(mut self, defaults: Arc<DefaultRegistry>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Validates the schema and builds the default page.
    pub fn build(self) -> Result<SettingsController> {
        self.schema.validate()?;

        let defaults = self.defaults.unwrap_or_else(DefaultRegistry::global);
        let factories = FactoryChain::new(self.factories);
        let bus = EventBus::new();
        let default_page = SettingsPage::build(&self.schema, &factories, &defaults, bus.clone());
        debug!(
            schema = self.schema.name(),
            keys = default_page.len(),
            handlers = self.handlers.len(),
            "settings controller created"
        );

        Ok(SettingsController {
            schema: self.schema,
            factories,
            storage: self.storage,
            hasher: self.hasher,
            salt: self.salt,
            handlers: self.handlers,
            defaults,
            bus,
            default_page,
            user_page: None,
            user: None,
        })
    }
}

struct ActiveUser {
    raw: String,
    hashed: String,
}

/// Entry point for one schema.
///
/// Until a user is set, every operation works on the default page and the
/// [`DEFAULT_SCOPE`] storage scope.
pub struct SettingsController {
    schema: Schema,
    factories: FactoryChain,
    storage: Box<dyn StorageBackend>,
    hasher: Box<dyn UserIdHasher>,
    salt: String,
    handlers: Vec<(String, ApplyHandler)>,
    defaults: Arc<DefaultRegistry>,
    bus: EventBus,
    default_page: SettingsPage,
    user_page: Option<SettingsPage>,
    user: Option<ActiveUser>,
}

impl SettingsController {
    pub fn builder(schema: Schema) -> ControllerBuilder {
        ControllerBuilder::new(schema)
    }

    /// Controller with null storage and pass-through hashing.
    pub fn new(schema: Schema) -> Result<Self> {
        ControllerBuilder::new(schema).build()
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn defaults(&self) -> &Arc<DefaultRegistry> {
        &self.defaults
    }

    /// The active page: the user's once a user is set.
    pub fn page(&self) -> &SettingsPage {
        self.user_page.as_ref().unwrap_or(&self.default_page)
    }

    pub fn page_mut(&mut self) -> &mut SettingsPage {
        match &mut self.user_page {
            Some(page) => page,
            None => &mut self.default_page,
        }
    }

    pub fn default_page(&self) -> &SettingsPage {
        &self.default_page
    }

    pub fn get<K: KeyKind>(&self, id: &str) -> Result<K::Value> {
        self.page().get::<K>(id)
    }

    pub fn set<K: KeyKind>(&mut self, id: &str, value: K::Value) -> Result<bool> {
        self.page_mut().set::<K>(id, value)
    }

    pub fn subscribe(&self) -> Receiver<SettingsEvent> {
        self.bus.subscribe()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.raw.as_str())
    }

    pub fn hashed_user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.hashed.as_str())
    }

    /// Storage scope of the active user.
    pub fn storage_scope(&self) -> &str {
        self.hashed_user_id().unwrap_or(DEFAULT_SCOPE)
    }

    /// Activates a user: restores the baseline defaults, loads the user's
    /// stored values and writes them to the fields.
    ///
    /// Emits [`SettingsEvent::UserChanged`] once. When the user's stored
    /// values cannot be read, the user starts from defaults and the storage
    /// error is returned.
    pub fn set_user_id(&mut self, id: &str) -> Result<()> {
        let hashed = hash_user_id(self.hasher.as_ref(), &self.salt, id);
        debug!(schema = self.schema.name(), scope = %hashed, "switching settings user");

        self.default_page.load_default();
        if self.user_page.is_none() {
            self.user_page = Some(SettingsPage::build(
                &self.schema,
                &self.factories,
                &self.defaults,
                self.bus.clone(),
            ));
        }
        self.user = Some(ActiveUser {
            raw: id.to_string(),
            hashed,
        });

        let loaded = self.load().map(drop);
        if let Err(err) = &loaded {
            warn!(user = id, error = %err, "cannot load user settings, using defaults");
            self.page_mut().load_default();
        }
        let applied = self.apply(false);
        self.bus.emit(SettingsEvent::UserChanged {
            user: id.to_string(),
        });
        loaded.and(applied)
    }

    /// Replaces working values with the stored ones, or defaults where
    /// nothing is stored. Returns whether anything changed.
    pub fn load(&mut self) -> Result<bool> {
        let scope = self.storage_scope().to_string();
        let reader = self.storage.read(&scope)?;
        let page = match &mut self.user_page {
            Some(page) => page,
            None => &mut self.default_page,
        };
        let changed = page.load(reader.as_ref());
        drop(reader);
        debug!(schema = self.schema.name(), scope = %scope, changed, "settings loaded");
        self.bus.emit(SettingsEvent::Loaded);
        Ok(changed)
    }

    pub fn save(&self) -> Result<()> {
        let scope = self.storage_scope();
        let mut writer = self.storage.write(scope)?;
        self.page().save(writer.as_mut())?;
        writer.commit()?;
        debug!(schema = self.schema.name(), scope, "settings saved");
        self.bus.emit(SettingsEvent::Saved);
        Ok(())
    }

    /// Writes working values to the fields, runs the on-applied handlers and
    /// optionally saves.
    ///
    /// A failing handler is logged and the remaining handlers still run.
    pub fn apply(&mut self, save: bool) -> Result<()> {
        self.page_mut().apply();
        let page = self.page();
        for (name, handler) in &self.handlers {
            if let Err(err) = handler(page) {
                error!(handler = %name, error = %err, "settings apply handler failed");
            }
        }
        self.bus.emit(SettingsEvent::Applied);
        if save {
            self.save()?;
        }
        Ok(())
    }

    /// Discards unapplied edits.
    pub fn reset(&mut self) {
        self.page_mut().reset();
    }

    /// Restores every default snapshot and writes it to the fields, without
    /// saving.
    pub fn load_default(&mut self) -> bool {
        self.page_mut().load_default()
    }

    pub fn reset_default(&mut self) -> bool {
        self.load_default()
    }

    /// Runs deferred work for the active page.
    pub fn tick(&mut self) -> usize {
        self.page_mut().tick()
    }

    /// Registers every binding field with the mediator under its key id.
    pub fn register_bindings(&self, mediator: &mut BindingMediator) -> usize {
        let mut registered = 0;
        for (id, field) in self.schema.fields() {
            if let Some(accessor) = field.accessor::<Binding>() {
                mediator.register(id, accessor.clone());
                registered += 1;
            }
        }
        registered
    }
}

/// A settings type with a fixed schema.
pub trait Settings: 'static {
    fn schema() -> Schema;

    /// Adjusts the controller before it is built.
    fn configure(builder: ControllerBuilder) -> ControllerBuilder {
        builder
    }
}

/// Owns one controller per [`Settings`] type, built on first use.
pub struct SettingsContext {
    defaults: Arc<DefaultRegistry>,
    controllers: HashMap<TypeId, SettingsController>,
}

impl SettingsContext {
    /// Context sharing the process-wide default snapshots.
    pub fn new() -> Self {
        Self::with_defaults(DefaultRegistry::global())
    }

    /// Context with its own default snapshots.
    pub fn isolated() -> Self {
        Self::with_defaults(Arc::new(DefaultRegistry::new()))
    }

    pub fn with_defaults(defaults: Arc<DefaultRegistry>) -> Self {
        Self {
            defaults,
            controllers: HashMap::new(),
        }
    }

    pub fn defaults(&self) -> &Arc<DefaultRegistry> {
        &self.defaults
    }

    pub fn controller<S: Settings>(&mut self) -> Result<&mut SettingsController> {
        match self.controllers.entry(TypeId::of::<S>()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let builder = ControllerBuilder::new(S::schema()).defaults(Arc::clone(&self.defaults));
                let controller = S::configure(builder).build()?;
                Ok(entry.insert(controller))
            }
        }
    }

    pub fn contains<S: Settings>(&self) -> bool {
        self.controllers.contains_key(&TypeId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }
}

impl Default for SettingsContext {
    fn default() -> Self {
        Self::new()
    }
}
