//! Storage backends for persisted settings.
//!
//! Values are plain strings keyed by key id, scoped per (hashed) user.
//! Reading a missing user or key is not an error: the caller falls back to
//! the default.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

/// Read scope over one user's stored values.
pub trait ScopedReader {
    fn try_read(&self, key: &str) -> Option<String>;
}

/// Write scope over one user's stored values. Nothing is persisted until
/// [`ScopedWriter::commit`].
pub trait ScopedWriter {
    fn write(&mut self, key: &str, value: String);
    fn commit(self: Box<Self>) -> anyhow::Result<()>;
}

/// A key/value store addressed by user id.
pub trait StorageBackend {
    fn read(&self, user: &str) -> anyhow::Result<Box<dyn ScopedReader + '_>>;
    fn write(&self, user: &str) -> anyhow::Result<Box<dyn ScopedWriter + '_>>;
}

/// Storage that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

struct NullScope;

impl ScopedReader for NullScope {
    fn try_read(&self, _key: &str) -> Option<String> {
        None
    }
}

impl ScopedWriter for NullScope {
    fn write(&mut self, _key: &str, _value: String) {}

    fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

impl StorageBackend for NullStorage {
    fn read(&self, _user: &str) -> anyhow::Result<Box<dyn ScopedReader + '_>> {
        Ok(Box::new(NullScope))
    }

    fn write(&self, _user: &str) -> anyhow::Result<Box<dyn ScopedWriter + '_>> {
        Ok(Box::new(NullScope))
    }
}

/// In-process key/value store with entries named `user/key`.
///
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<scc::HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_name(user: &str, key: &str) -> String {
        format!("{}/{}", user, key)
    }

    /// Raw stored value, bypassing the scoped API.
    pub fn raw(&self, user: &str, key: &str) -> Option<String> {
        self.entries
            .read_sync(&Self::entry_name(user, key), |_, v| v.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct MemoryReader<'a> {
    storage: &'a MemoryStorage,
    user: String,
}

impl ScopedReader for MemoryReader<'_> {
    fn try_read(&self, key: &str) -> Option<String> {
        self.storage.raw(&self.user, key)
    }
}

struct MemoryWriter<'a> {
    storage: &'a MemoryStorage,
    user: String,
    pending: Vec<(String, String)>,
}

impl ScopedWriter for MemoryWriter<'_> {
    fn write(&mut self, key: &str, value: String) {
        self.pending.push((key.to_string(), value));
    }

    fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryWriter {
            storage,
            user,
            pending,
        } = *self;
        for (key, value) in pending {
            let _ = storage
                .entries
                .upsert_sync(MemoryStorage::entry_name(&user, &key), value);
        }
        Ok(())
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, user: &str) -> anyhow::Result<Box<dyn ScopedReader + '_>> {
        Ok(Box::new(MemoryReader {
            storage: self,
            user: user.to_string(),
        }))
    }

    fn write(&self, user: &str) -> anyhow::Result<Box<dyn ScopedWriter + '_>> {
        Ok(Box::new(MemoryWriter {
            storage: self,
            user: user.to_string(),
            pending: Vec::new(),
        }))
    }
}

/// Placeholder replaced by the user id in a [`FileStorage`] path template.
pub const USER_PLACEHOLDER: &str = "{user}";

/// One JSON file per user holding a flat object of key id to string.
#[derive(Debug, Clone)]
pub struct FileStorage {
    template: String,
}

impl FileStorage {
    /// `template` names the file, e.g. `settings/{user}.json`.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Path of a user's file. Ids that could leave the template's directory
    /// are rejected.
    pub fn path_for(&self, user: &str) -> anyhow::Result<PathBuf> {
        if user.is_empty()
            || user == "."
            || user == ".."
            || user.contains(['/', '\\', '\0'])
        {
            anyhow::bail!("user id {:?} cannot be used in a settings file path", user);
        }
        Ok(PathBuf::from(self.template.replace(USER_PLACEHOLDER, user)))
    }

    fn load_map(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("parsing settings file {}", path.display()))
    }
}

struct FileReader {
    values: BTreeMap<String, String>,
}

impl ScopedReader for FileReader {
    fn try_read(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

struct FileWriter {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ScopedWriter for FileWriter {
    fn write(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn commit(self: Box<Self>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)
            .with_context(|| format!("writing settings file {}", self.path.display()))?;
        debug!(path = %self.path.display(), keys = self.values.len(), "settings file written");
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, user: &str) -> anyhow::Result<Box<dyn ScopedReader + '_>> {
        let values = Self::load_map(&self.path_for(user)?)?;
        Ok(Box::new(FileReader { values }))
    }

    /// Keys already in the file but not rewritten are kept.
    fn write(&self, user: &str) -> anyhow::Result<Box<dyn ScopedWriter + '_>> {
        let path = self.path_for(user)?;
        let values = Self::load_map(&path)?;
        Ok(Box::new(FileWriter { path, values }))
    }
}
