//! Error types shared by the settings and input modules.

use thiserror::Error;

/// Errors raised by settings keys, pages and controllers.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A value was rejected by the key's validation; the key is unchanged.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("unknown settings key `{0}`")]
    UnknownKey(String),

    /// Typed access used a kind that does not match the key.
    #[error("settings key `{key}` is not a {expected} key")]
    KindMismatch { key: String, expected: &'static str },

    /// The schema violates a construction-time contract.
    #[error("invalid settings schema: {0}")]
    Schema(String),

    #[error("cannot decode stored value for `{key}`: {reason}")]
    Deserialize { key: String, reason: String },

    #[error("settings storage failed: {0}")]
    Storage(#[from] anyhow::Error),
}

impl SettingsError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(key: &str, reason: impl ToString) -> Self {
        Self::Deserialize {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;
