//! Input polling: triggers, bindings, the per-frame binding mediator and
//! rebind capture.

pub mod keycode;
pub mod mediator;
pub mod rebind;
#[cfg(test)]
mod tests;
pub mod trigger;

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;

pub use keycode::KeyCode;
pub use mediator::BindingMediator;
pub use rebind::{RebindHandle, RebindOutcome, RebindRequest, RebindState};
pub use trigger::{AXIS_ACTIVATION_THRESHOLD, AxisDirection, AxisRef, Binding, EdgeState, Trigger};

/// Host-provided view of the input devices, sampled once per frame.
pub trait InputSource {
    /// Whether the discrete input is held down.
    fn is_key_active(&self, key: KeyCode) -> bool;
    /// Current value of a named axis in `[-1, 1]`; unknown axes read `0.0`.
    fn read_axis(&self, axis: &str) -> f32;
    /// Number of connected joysticks/controllers.
    fn connected_device_count(&self) -> usize;
}

/// Input state held in memory, filled by the host from its event loop.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    keys: HashSet<KeyCode>,
    axes: HashMap<String, f32>,
    devices: usize,
}

impl InputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: KeyCode) -> &mut Self {
        self.keys.insert(key);
        self
    }

    pub fn release(&mut self, key: KeyCode) -> &mut Self {
        self.keys.remove(&key);
        self
    }

    pub fn set_axis(&mut self, axis: impl Into<String>, value: f32) -> &mut Self {
        self.axes.insert(axis.into(), value.clamp(-1.0, 1.0));
        self
    }

    pub fn set_device_count(&mut self, count: usize) -> &mut Self {
        self.devices = count;
        self
    }

    /// Releases every key and centers every axis.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.axes.clear();
    }
}

impl InputSource for InputSnapshot {
    fn is_key_active(&self, key: KeyCode) -> bool {
        if self.keys.contains(&key) {
            return true;
        }
        // An "any joystick" button is held when that button is held anywhere.
        match key {
            KeyCode::JoystickButton {
                joystick: 0,
                button,
            } => self.keys.iter().any(|held| {
                matches!(held, KeyCode::JoystickButton { button: b, .. } if *b == button)
            }),
            _ => false,
        }
    }

    fn read_axis(&self, axis: &str) -> f32 {
        self.axes.get(axis).copied().unwrap_or(0.0)
    }

    fn connected_device_count(&self) -> usize {
        self.devices
    }
}

bitflags! {
    /// Input categories scanned when reading the next pressed input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputFilter: u8 {
        const KEYBOARD = 0b0000_0001;
        const JOYSTICK_BUTTONS = 0b0000_0010;
        const MOUSE_BUTTONS = 0b0000_0100;
        const MOUSE_AXES = 0b0000_1000;
        const JOYSTICK_AXES = 0b0001_0000;

        const KEYS = Self::KEYBOARD.bits() | Self::JOYSTICK_BUTTONS.bits() | Self::MOUSE_BUTTONS.bits();
        const AXES = Self::MOUSE_AXES.bits() | Self::JOYSTICK_AXES.bits();
        const ALL = Self::KEYS.bits() | Self::AXES.bits();
    }
}

impl InputFilter {
    /// Whether a trigger belongs to an enabled category.
    pub fn admits(&self, trigger: &Trigger, catalog: &AxisCatalog) -> bool {
        match trigger {
            Trigger::Key(KeyCode::Keyboard(_)) => self.contains(InputFilter::KEYBOARD),
            Trigger::Key(KeyCode::Mouse(_)) => self.contains(InputFilter::MOUSE_BUTTONS),
            Trigger::Key(KeyCode::JoystickButton { .. }) => {
                self.contains(InputFilter::JOYSTICK_BUTTONS)
            }
            Trigger::Axis(axis) if catalog.is_mouse_axis(&axis.name) => {
                self.contains(InputFilter::MOUSE_AXES)
            }
            Trigger::Axis(_) => self.contains(InputFilter::JOYSTICK_AXES),
        }
    }
}

/// Default mouse axes.
pub const MOUSE_AXES: &[&str] = &["Mouse X", "Mouse Y", "Mouse ScrollWheel"];

/// The axes and joystick buttons known to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCatalog {
    mouse_axes: Vec<String>,
    joystick_axes: Vec<String>,
    joystick_count: u8,
    joystick_buttons: u8,
}

impl AxisCatalog {
    /// Catalog with the default mouse axes and `Joy{j} Axis{a}` joystick axes.
    pub fn new(joystick_count: u8, axes_per_joystick: u8, buttons_per_joystick: u8) -> Self {
        let joystick_axes = (1..=joystick_count)
            .flat_map(|j| (1..=axes_per_joystick).map(move |a| format!("Joy{} Axis{}", j, a)))
            .collect();
        Self {
            mouse_axes: MOUSE_AXES.iter().map(|s| s.to_string()).collect(),
            joystick_axes,
            joystick_count,
            joystick_buttons: buttons_per_joystick,
        }
    }

    /// Catalog from explicit axis names.
    pub fn with_axes(mouse_axes: Vec<String>, joystick_axes: Vec<String>) -> Self {
        Self {
            mouse_axes,
            joystick_axes,
            joystick_count: 0,
            joystick_buttons: 0,
        }
    }

    pub fn with_joystick_buttons(mut self, joysticks: u8, buttons: u8) -> Self {
        self.joystick_count = joysticks;
        self.joystick_buttons = buttons;
        self
    }

    pub fn mouse_axes(&self) -> &[String] {
        &self.mouse_axes
    }

    pub fn joystick_axes(&self) -> &[String] {
        &self.joystick_axes
    }

    pub fn joystick_count(&self) -> u8 {
        self.joystick_count
    }

    pub fn joystick_buttons(&self) -> u8 {
        self.joystick_buttons
    }

    pub fn is_mouse_axis(&self, name: &str) -> bool {
        self.mouse_axes.iter().any(|axis| axis == name)
    }
}

impl Default for AxisCatalog {
    fn default() -> Self {
        Self::new(4, 10, 20)
    }
}
