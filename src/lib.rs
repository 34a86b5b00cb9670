//! Input bindings and per-user settings pages.
//!
//! [`input`] polls composite key/axis bindings once per frame and captures
//! new bindings; [`settings`] turns an explicit schema of live fields into
//! editable, persisted settings pages.

pub mod config;
pub mod error;
pub mod input;
pub mod settings;
pub mod util;

pub use config::AppConfig;
pub use error::{Result, SettingsError};
pub use input::{
    AxisCatalog, Binding, BindingMediator, InputFilter, InputSnapshot, InputSource, KeyCode,
    RebindOutcome, RebindRequest, Trigger,
};
pub use settings::{
    ControllerBuilder, DefaultRegistry, FieldAccessor, FieldDescriptor, GroupSchema, Schema,
    Settings, SettingsContext, SettingsController, SettingsEvent, SettingsPage,
};
