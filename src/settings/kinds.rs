//! Built-in key kinds: toggle, numeric range, named selection and binding.

use std::borrow::Cow;

use crate::error::{Result, SettingsError};
use crate::input::Binding;

use super::key::KeyKind;

/// Boolean switch. Toggles sharing an exclusive group behave like radio
/// buttons: turning one on turns the others off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toggle {
    pub exclusive_group: Option<String>,
}

impl KeyKind for Toggle {
    type Value = bool;
    const NAME: &'static str = "toggle";

    fn validate(&self, _key: &str, _value: &mut bool, _default: &bool) -> Result<()> {
        Ok(())
    }

    fn serialize(&self, _key: &str, value: &bool, _default: &bool) -> Result<String> {
        Ok(value.to_string())
    }

    fn deserialize(&self, key: &str, raw: &str) -> Result<bool> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(SettingsError::decode(key, format!("`{}` is not a boolean", other))),
        }
    }

    fn display(&self, value: &bool) -> String {
        if *value { "On" } else { "Off" }.to_string()
    }
}

/// Numeric value with optional bounds. Integer keys are rounded to whole
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub integer: bool,
}

impl Number {
    pub fn float() -> Self {
        Self {
            min: None,
            max: None,
            integer: false,
        }
    }

    pub fn integer() -> Self {
        Self {
            integer: true,
            ..Self::float()
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Bounds actually enforced; integer keys shrink to whole numbers.
    fn bounds(&self) -> (f64, f64) {
        let mut lo = self.min.unwrap_or(f64::NEG_INFINITY);
        let mut hi = self.max.unwrap_or(f64::INFINITY);
        if self.integer {
            lo = lo.ceil();
            hi = hi.floor();
        }
        (lo, hi)
    }
}

impl KeyKind for Number {
    type Value = f64;
    const NAME: &'static str = "number";

    fn validate(&self, key: &str, value: &mut f64, _default: &f64) -> Result<()> {
        if !value.is_finite() {
            return Err(SettingsError::invalid(key, format!("{} is not a finite number", value)));
        }
        let (lo, hi) = self.bounds();
        if lo > hi {
            return Err(SettingsError::invalid(key, "range contains no whole number"));
        }
        let mut clamped = value.max(lo).min(hi);
        if self.integer {
            clamped = clamped.round().max(lo).min(hi);
        }
        *value = clamped;
        Ok(())
    }

    fn serialize(&self, _key: &str, value: &f64, _default: &f64) -> Result<String> {
        if self.integer {
            Ok(format!("{}", *value as i64))
        } else {
            Ok(value.to_string())
        }
    }

    fn deserialize(&self, key: &str, raw: &str) -> Result<f64> {
        raw.trim()
            .parse::<f64>()
            .map_err(|err| SettingsError::decode(key, err))
    }

    fn display(&self, value: &f64) -> String {
        if self.integer {
            format!("{}", *value as i64)
        } else {
            format!("{:.2}", value)
        }
    }
}

/// One of a fixed list of names, typically the variants of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub options: Vec<&'static str>,
}

impl Selection {
    pub fn new(options: Vec<&'static str>) -> Self {
        Self { options }
    }
}

impl KeyKind for Selection {
    type Value = String;
    const NAME: &'static str = "selection";

    /// Matches case-insensitively and normalizes to the declared spelling.
    fn validate(&self, key: &str, value: &mut String, _default: &String) -> Result<()> {
        match self
            .options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(value.as_str()))
        {
            Some(option) => {
                if value.as_str() != *option {
                    *value = option.to_string();
                }
                Ok(())
            }
            None => Err(SettingsError::invalid(
                key,
                format!("`{}` is not one of {:?}", value, self.options),
            )),
        }
    }

    fn serialize(&self, _key: &str, value: &String, _default: &String) -> Result<String> {
        Ok(value.clone())
    }

    fn deserialize(&self, _key: &str, raw: &str) -> Result<String> {
        Ok(raw.trim().to_string())
    }

    fn display(&self, value: &String) -> String {
        value.clone()
    }
}

/// Composite input binding.
///
/// Empty slots are filled from the default on validation, and only the slots
/// that differ from the default are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingKind;

impl KeyKind for BindingKind {
    type Value = Binding;
    const NAME: &'static str = "binding";

    fn validate(&self, _key: &str, value: &mut Binding, default: &Binding) -> Result<()> {
        let merged = match Binding::merge(default, value) {
            Cow::Owned(merged) => Some(merged),
            Cow::Borrowed(_) => None,
        };
        if let Some(merged) = merged {
            *value = merged;
        }
        Ok(())
    }

    fn serialize(&self, key: &str, value: &Binding, default: &Binding) -> Result<String> {
        serde_json::to_string(&value.overrides(default)).map_err(|err| SettingsError::decode(key, err))
    }

    fn deserialize(&self, key: &str, raw: &str) -> Result<Binding> {
        serde_json::from_str(raw).map_err(|err| SettingsError::decode(key, err))
    }

    fn display(&self, value: &Binding) -> String {
        value.to_string()
    }
}
