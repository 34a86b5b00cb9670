//! Physical triggers and composite bindings.
//!
//! A [`Trigger`] names one physical input. A [`Binding`] is an ordered set of
//! alternative triggers performing one logical action, together with the edge
//! state derived from polling them every frame.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use super::InputSource;
use super::keycode::{KeyCode, UnknownKeyName};

/// Axis magnitude (after applying the trigger's direction) above which an
/// axis trigger counts as active.
pub const AXIS_ACTIVATION_THRESHOLD: f32 = 0.25;

/// Inline capacity of a binding's trigger list.
pub const INLINE_TRIGGERS: usize = 4;

/// Direction of an axis trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisDirection {
    Positive,
    Negative,
}

impl AxisDirection {
    #[inline(always)]
    pub fn sign(self) -> f32 {
        match self {
            AxisDirection::Positive => 1.0,
            AxisDirection::Negative => -1.0,
        }
    }

    #[inline]
    pub fn of(value: f32) -> AxisDirection {
        if value < 0.0 {
            AxisDirection::Negative
        } else {
            AxisDirection::Positive
        }
    }

    #[inline]
    pub fn opposite(self) -> AxisDirection {
        match self {
            AxisDirection::Positive => AxisDirection::Negative,
            AxisDirection::Negative => AxisDirection::Positive,
        }
    }

    fn suffix(self) -> char {
        match self {
            AxisDirection::Positive => '+',
            AxisDirection::Negative => '-',
        }
    }
}

/// One half of a named analog axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisRef {
    pub name: String,
    pub direction: AxisDirection,
}

impl AxisRef {
    pub fn new(name: impl Into<String>, direction: AxisDirection) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn positive(name: impl Into<String>) -> Self {
        Self::new(name, AxisDirection::Positive)
    }

    pub fn negative(name: impl Into<String>) -> Self {
        Self::new(name, AxisDirection::Negative)
    }

    /// Whether `value` read from this axis activates the trigger.
    #[inline]
    pub fn activates(&self, value: f32) -> bool {
        value * self.direction.sign() > AXIS_ACTIVATION_THRESHOLD
    }
}

/// A single physical input source: a discrete key or a signed axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    Key(KeyCode),
    Axis(AxisRef),
}

impl Trigger {
    pub fn key(code: KeyCode) -> Self {
        Trigger::Key(code)
    }

    pub fn axis(name: impl Into<String>, direction: AxisDirection) -> Self {
        Trigger::Axis(AxisRef::new(name, direction))
    }

    pub fn as_key(&self) -> Option<KeyCode> {
        match self {
            Trigger::Key(code) => Some(*code),
            Trigger::Axis(_) => None,
        }
    }

    pub fn as_axis(&self) -> Option<&AxisRef> {
        match self {
            Trigger::Key(_) => None,
            Trigger::Axis(axis) => Some(axis),
        }
    }

    /// Whether the trigger is held right now.
    ///
    /// Axes listed in `muted_axes` are treated as inactive.
    #[inline]
    pub fn is_active(&self, input: &dyn InputSource, muted_axes: &HashSet<String>) -> bool {
        match self {
            Trigger::Key(code) => input.is_key_active(*code),
            Trigger::Axis(axis) => {
                !muted_axes.contains(&axis.name) && axis.activates(input.read_axis(&axis.name))
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Key(code) => write!(f, "{}", code),
            Trigger::Axis(axis) => write!(f, "{}{}", axis.name, axis.direction.suffix()),
        }
    }
}

impl FromStr for Trigger {
    type Err = UnknownKeyName;

    /// Key names never end in a sign, so a trailing `+`/`-` marks an axis.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let direction = match trimmed.chars().last() {
            Some('+') => Some(AxisDirection::Positive),
            Some('-') => Some(AxisDirection::Negative),
            _ => None,
        };
        match direction {
            Some(direction) => {
                let name = trimmed[..trimmed.len() - 1].trim_end();
                if name.is_empty() {
                    return Err(UnknownKeyName(s.to_string()));
                }
                Ok(Trigger::axis(name, direction))
            }
            None => trimmed.parse().map(Trigger::Key),
        }
    }
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Trigger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl From<KeyCode> for Trigger {
    fn from(code: KeyCode) -> Self {
        Trigger::Key(code)
    }
}

impl From<AxisRef> for Trigger {
    fn from(axis: AxisRef) -> Self {
        Trigger::Axis(axis)
    }
}

/// Edge state derived each poll tick. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeState {
    pub pressed: bool,
    pub just_pressed: bool,
    pub just_released: bool,
}

impl EdgeState {
    /// Derives the next state from the previous one and the current level.
    #[inline]
    pub fn next(self, pressed: bool) -> EdgeState {
        EdgeState {
            pressed,
            just_pressed: pressed && !self.pressed,
            just_released: !pressed && self.pressed,
        }
    }
}

/// An ordered list of alternative triggers for one logical action.
///
/// Empty slots (`None`) inherit the default binding's trigger on merge.
/// Equality and serialization cover the trigger list only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Binding {
    triggers: SmallVec<[Option<Trigger>; INLINE_TRIGGERS]>,
    #[serde(skip)]
    state: EdgeState,
}

impl Binding {
    /// Binding with every slot set.
    pub fn new<I, T>(triggers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Trigger>,
    {
        Self::from_slots(triggers.into_iter().map(|t| Some(t.into())))
    }

    /// Binding from explicit slots, `None` marking an empty slot.
    pub fn from_slots<I: IntoIterator<Item = Option<Trigger>>>(slots: I) -> Self {
        Self {
            triggers: slots.into_iter().collect(),
            state: EdgeState::default(),
        }
    }

    /// A binding with `len` empty slots.
    pub fn empty(len: usize) -> Self {
        Self::from_slots(std::iter::repeat_n(None, len))
    }

    #[inline]
    pub fn slots(&self) -> &[Option<Trigger>] {
        &self.triggers
    }

    /// The non-empty triggers in slot order.
    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter().flatten()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// True when no slot holds a trigger.
    pub fn is_unbound(&self) -> bool {
        self.triggers.iter().all(Option::is_none)
    }

    /// Replaces one slot, growing the list with empty slots if needed.
    pub fn set_slot(&mut self, index: usize, trigger: Option<Trigger>) {
        if index >= self.triggers.len() {
            self.triggers.resize(index + 1, None);
        }
        self.triggers[index] = trigger;
    }

    #[inline]
    pub fn state(&self) -> EdgeState {
        self.state
    }

    #[inline]
    pub fn pressed(&self) -> bool {
        self.state.pressed
    }

    #[inline]
    pub fn just_pressed(&self) -> bool {
        self.state.just_pressed
    }

    #[inline]
    pub fn just_released(&self) -> bool {
        self.state.just_released
    }

    /// Clears the edge state.
    pub fn clear_state(&mut self) {
        self.state = EdgeState::default();
    }

    /// Whether any trigger is active.
    pub fn is_active(&self, input: &dyn InputSource, muted_axes: &HashSet<String>) -> bool {
        self.triggers().any(|t| t.is_active(input, muted_axes))
    }

    /// Polls every trigger and advances the edge state.
    ///
    /// Returns `true` when any of the three edge flags changed since the
    /// previous tick.
    pub fn poll(&mut self, input: &dyn InputSource, muted_axes: &HashSet<String>) -> bool {
        let pressed = self.is_active(input, muted_axes);
        self.advance(pressed)
    }

    /// Advances the edge state from an already computed level.
    pub fn advance(&mut self, pressed: bool) -> bool {
        let next = self.state.next(pressed);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// Fills the empty slots of `current` from `default`.
    ///
    /// `current` is first grown to the default's length. The result borrows
    /// `current` when nothing needs filling, including when both arguments are
    /// the same binding.
    pub fn merge<'a>(default: &Binding, current: &'a Binding) -> Cow<'a, Binding> {
        if std::ptr::eq(default, current) {
            return Cow::Borrowed(current);
        }

        let needs_fill = default.triggers.iter().enumerate().any(|(i, slot)| {
            slot.is_some() && current.triggers.get(i).is_none_or(Option::is_none)
        });
        if !needs_fill {
            return Cow::Borrowed(current);
        }

        let mut merged = current.clone();
        if merged.triggers.len() < default.triggers.len() {
            merged.triggers.resize(default.triggers.len(), None);
        }
        for (slot, fallback) in merged.triggers.iter_mut().zip(default.triggers.iter()) {
            if slot.is_none() {
                slot.clone_from(fallback);
            }
        }
        Cow::Owned(merged)
    }

    /// The binding as stored relative to `default`: slots equal to the
    /// default become empty, trailing empty slots are dropped.
    pub fn overrides(&self, default: &Binding) -> Binding {
        let mut slots: SmallVec<[Option<Trigger>; INLINE_TRIGGERS]> = self
            .triggers
            .iter()
            .enumerate()
            .map(|(i, slot)| match default.triggers.get(i) {
                Some(fallback) if fallback == slot => None,
                _ => slot.clone(),
            })
            .collect();
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
        Binding {
            triggers: slots,
            state: EdgeState::default(),
        }
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.triggers == other.triggers
    }
}

impl Eq for Binding {}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for trigger in self.triggers() {
            if !first {
                f.write_str(" / ")?;
            }
            first = false;
            write!(f, "{}", trigger)?;
        }
        if first {
            f.write_str("<unbound>")?;
        }
        Ok(())
    }
}
