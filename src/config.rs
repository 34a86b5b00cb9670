use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::input::keycode::{MAX_JOYSTICK_BUTTONS, MAX_JOYSTICKS};
use crate::input::{AxisCatalog, KeyCode};
use crate::settings::{
    FileStorage, Fnv1aHasher, MemoryStorage, NullStorage, PassThroughHasher, Sha256Hasher,
    StorageBackend, UserIdHasher,
};

/// Most axes a joystick reports.
pub const MAX_JOYSTICK_AXES: u8 = 28;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default)]
    pub hash: HashKind,
    #[serde(default)]
    pub salt: String,
    #[serde(default = "default_joystick_count")]
    pub joystick_count: u8,
    #[serde(default = "default_joystick_axis_count")]
    pub joystick_axis_count: u8,
    #[serde(default = "default_joystick_button_count")]
    pub joystick_button_count: u8,
    #[serde(default = "default_cancel_key")]
    pub cancel_key: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    None,
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    Passthrough,
    #[default]
    Fnv1a,
    Sha256,
}

impl StorageKind {
    fn as_str(self) -> &'static str {
        match self {
            StorageKind::None => "none",
            StorageKind::Memory => "memory",
            StorageKind::File => "file",
        }
    }
}

impl HashKind {
    fn as_str(self) -> &'static str {
        match self {
            HashKind::Passthrough => "passthrough",
            HashKind::Fnv1a => "fnv1a",
            HashKind::Sha256 => "sha256",
        }
    }
}

fn default_user_id() -> String {
    "player".to_string()
}
fn default_storage_path() -> String {
    "settings/{user}.json".to_string()
}
fn default_joystick_count() -> u8 {
    4
}
fn default_joystick_axis_count() -> u8 {
    10
}
fn default_joystick_button_count() -> u8 {
    20
}
fn default_cancel_key() -> String {
    "ESCAPE".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            storage: StorageKind::default(),
            storage_path: default_storage_path(),
            hash: HashKind::default(),
            salt: String::new(),
            joystick_count: default_joystick_count(),
            joystick_axis_count: default_joystick_axis_count(),
            joystick_button_count: default_joystick_button_count(),
            cancel_key: default_cancel_key(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    /// Load config from file, or create default if not exists
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            let default_config = Self::default();
            default_config.save_to_file(&path)?;
            return Ok(default_config);
        }
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&content)?;

        // Validate configuration
        config.joystick_count = config.joystick_count.clamp(1, MAX_JOYSTICKS);
        config.joystick_axis_count = config.joystick_axis_count.clamp(1, MAX_JOYSTICK_AXES);
        config.joystick_button_count = config.joystick_button_count.clamp(1, MAX_JOYSTICK_BUTTONS);
        if config.user_id.trim().is_empty() {
            config.user_id = default_user_id();
        }
        if config.cancel_key.parse::<KeyCode>().is_err() {
            config.cancel_key = default_cancel_key();
        }

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        // Add comments to make the config file more readable
        let commented = format!(
            "user_id = {:?}            # User activated at start\n\
             storage = {:?}               # Settings storage: none, memory or file\n\
             storage_path = {:?}  # File storage path, {{user}} is the hashed user id\n\
             hash = {:?}                 # User id hashing: passthrough, fnv1a or sha256\n\
             salt = {:?}                      # Prepended to the user id before hashing\n\n\
             # Input scanning used when capturing a new binding\n\
             joystick_count = {}             # Joysticks scanned (1-8)\n\
             joystick_axis_count = {}       # Axes per joystick (1-28)\n\
             joystick_button_count = {}     # Buttons per joystick (1-20)\n\
             cancel_key = {:?}         # Key that cancels a capture\n\n\
             log_filter = {:?}             # Used when RUST_LOG is not set\n",
            self.user_id,
            self.storage.as_str(),
            self.storage_path,
            self.hash.as_str(),
            self.salt,
            self.joystick_count,
            self.joystick_axis_count,
            self.joystick_button_count,
            self.cancel_key,
            self.log_filter,
        );

        fs::write(path, commented)?;
        Ok(())
    }

    pub fn storage_backend(&self) -> Box<dyn StorageBackend> {
        match self.storage {
            StorageKind::None => Box::new(NullStorage),
            StorageKind::Memory => Box::new(MemoryStorage::new()),
            StorageKind::File => Box::new(FileStorage::new(self.storage_path.clone())),
        }
    }

    pub fn user_id_hasher(&self) -> Box<dyn UserIdHasher> {
        match self.hash {
            HashKind::Passthrough => Box::new(PassThroughHasher),
            HashKind::Fnv1a => Box::new(Fnv1aHasher),
            HashKind::Sha256 => Box::new(Sha256Hasher),
        }
    }

    pub fn axis_catalog(&self) -> AxisCatalog {
        AxisCatalog::new(
            self.joystick_count,
            self.joystick_axis_count,
            self.joystick_button_count,
        )
    }

    pub fn cancel_key(&self) -> KeyCode {
        self.cancel_key.parse().unwrap_or(KeyCode::ESCAPE)
    }
}
