//! Per-frame binding poller.
//!
//! The mediator owns the list of binding fields to poll, derives their edge
//! state once per frame and writes a binding back only when its edge state
//! changed. It also hosts rebind capture sessions and answers "which input is
//! pressed right now" queries.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::keycode::{self, KeyCode};
use super::rebind::{
    RebindHandle, RebindOutcome, RebindRequest, RebindSession, RebindState, Step,
};
use super::trigger::{AXIS_ACTIVATION_THRESHOLD, AxisDirection, Binding, Trigger};
use super::{AxisCatalog, InputFilter, InputSource};
use crate::settings::schema::{FieldAccessor, FieldDescriptor};

/// Difference from the rest value that counts as an axis having moved.
const REST_EPSILON: f32 = 0.01;

struct RegisteredBinding {
    name: String,
    accessor: FieldAccessor<Binding>,
}

/// Polls registered bindings every frame.
pub struct BindingMediator {
    bindings: Vec<RegisteredBinding>,
    catalog: AxisCatalog,
    /// Axes resting away from zero since the last device change.
    muted_axes: HashSet<String>,
    rest_values: HashMap<String, f32>,
    device_count: Option<usize>,
    sessions: Vec<RebindSession>,
    next_session: u64,
    write_backs: u64,
}

impl BindingMediator {
    pub fn new(catalog: AxisCatalog) -> Self {
        Self {
            bindings: Vec::new(),
            catalog,
            muted_axes: HashSet::new(),
            rest_values: HashMap::new(),
            device_count: None,
            sessions: Vec::new(),
            next_session: 0,
            write_backs: 0,
        }
    }

    pub fn catalog(&self) -> &AxisCatalog {
        &self.catalog
    }

    /// Registers a binding field to poll.
    pub fn register(&mut self, name: impl Into<String>, accessor: FieldAccessor<Binding>) {
        let name = name.into();
        debug!(binding = %name, "registered binding");
        self.bindings.push(RegisteredBinding { name, accessor });
    }

    /// Registers a schema field, skipping it when it does not hold a binding.
    pub fn register_field(&mut self, field: &FieldDescriptor) -> bool {
        match field.accessor::<Binding>() {
            Some(accessor) => {
                self.register(field.name(), accessor.clone());
                true
            }
            None => {
                warn!(
                    field = field.name(),
                    declared = field.type_name(),
                    "field is not a binding, it will not be polled"
                );
                false
            }
        }
    }

    /// Names of the registered bindings in polling order.
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Number of binding write-backs performed so far.
    pub fn write_backs(&self) -> u64 {
        self.write_backs
    }

    /// Axes currently ignored because they rest away from zero.
    pub fn muted_axes(&self) -> &HashSet<String> {
        &self.muted_axes
    }

    /// Runs one frame: refreshes rest-noise exclusion, polls every binding in
    /// registration order and steps active rebind sessions.
    pub fn update(&mut self, input: &dyn InputSource) {
        self.refresh_rest_noise(input);

        for registered in &self.bindings {
            let mut binding = registered.accessor.get();
            if binding.poll(input, &self.muted_axes) {
                registered.accessor.set(binding);
                self.write_backs += 1;
            }
        }

        if !self.sessions.is_empty() {
            self.step_sessions(|mediator, session| {
                let cancel = session.request.cancel_key;
                let observed = if session.is_cancel(cancel) && input.is_key_active(cancel) {
                    Some(Trigger::Key(cancel))
                } else {
                    mediator.read_next_input(session.request.filter, input)
                };
                session.observe_frame(observed)
            });
        }
    }

    /// Delivers a UI key-down event to active rebind sessions.
    ///
    /// The cancel key reaches a session waiting for its first input even when
    /// the session's filter excludes it.
    pub fn key_down(&mut self, key: KeyCode) {
        if self.sessions.is_empty() {
            return;
        }
        let trigger = Trigger::Key(key);
        self.step_sessions(|mediator, session| {
            if session.is_cancel(key)
                || session.request.filter.admits(&trigger, &mediator.catalog)
            {
                session.observe_key_down(key)
            } else {
                Step::Pending
            }
        });
    }

    fn step_sessions<F>(&mut self, mut step: F)
    where
        F: FnMut(&Self, &mut RebindSession) -> Step,
    {
        let sessions = std::mem::take(&mut self.sessions);
        let mut pending = Vec::with_capacity(sessions.len());
        let mut finished = Vec::new();
        for mut session in sessions {
            match step(self, &mut session) {
                Step::Pending => pending.push(session),
                Step::Finished(outcome) => finished.push((session, outcome)),
            }
        }
        self.sessions = pending;

        // Unsubscribed above; now complete.
        for (mut session, outcome) in finished {
            debug!(handle = ?session.handle, ?outcome, "rebind finished");
            session.complete(outcome);
        }
    }

    /// Starts a capture session. `on_complete` runs exactly once, with `None`
    /// when the capture is cancelled.
    pub fn begin_rebind<F>(&mut self, request: RebindRequest, on_complete: F) -> RebindHandle
    where
        F: FnOnce(Option<RebindOutcome>) + 'static,
    {
        let handle = RebindHandle(self.next_session);
        self.next_session += 1;
        debug!(?handle, mode = ?request.mode, "rebind started");
        self.sessions
            .push(RebindSession::new(handle, request, Box::new(on_complete)));
        handle
    }

    /// Cancels a session. Safe to call on finished or already cancelled
    /// sessions; returns whether the session was still active.
    pub fn cancel_rebind(&mut self, handle: RebindHandle) -> bool {
        let Some(index) = self.sessions.iter().position(|s| s.handle == handle) else {
            return false;
        };
        let mut session = self.sessions.remove(index);
        debug!(?handle, "rebind cancelled");
        session.complete(None);
        true
    }

    /// State of a session; finished and unknown sessions report `Done`.
    pub fn rebind_state(&self, handle: RebindHandle) -> RebindState {
        self.sessions
            .iter()
            .find(|s| s.handle == handle)
            .map_or(RebindState::Done, RebindSession::state)
    }

    pub fn active_rebinds(&self) -> usize {
        self.sessions.len()
    }

    /// Scans for the first active input among the enabled categories.
    ///
    /// Order: keyboard keys, joystick buttons, mouse buttons, mouse axes,
    /// joystick axes.
    pub fn read_next_input(&self, filter: InputFilter, input: &dyn InputSource) -> Option<Trigger> {
        if filter.contains(InputFilter::KEYBOARD)
            && let Some(&code) = keycode::keyboard_codes()
                .iter()
                .find(|&&code| input.is_key_active(code))
        {
            return Some(Trigger::Key(code));
        }

        if filter.contains(InputFilter::JOYSTICK_BUTTONS)
            && let Some(code) = keycode::joystick_codes(
                self.catalog.joystick_count(),
                self.catalog.joystick_buttons(),
            )
            .find(|&code| input.is_key_active(code))
        {
            return Some(Trigger::Key(code));
        }

        if filter.contains(InputFilter::MOUSE_BUTTONS)
            && let Some(code) = keycode::mouse_codes().find(|&code| input.is_key_active(code))
        {
            return Some(Trigger::Key(code));
        }

        if filter.contains(InputFilter::MOUSE_AXES)
            && let Some(trigger) = self.scan_axes(self.catalog.mouse_axes(), input)
        {
            return Some(trigger);
        }

        if filter.contains(InputFilter::JOYSTICK_AXES) {
            return self.scan_axes(self.catalog.joystick_axes(), input);
        }

        None
    }

    fn scan_axes(&self, axes: &[String], input: &dyn InputSource) -> Option<Trigger> {
        axes.iter()
            .filter(|name| !self.muted_axes.contains(name.as_str()))
            .find_map(|name| {
                let value = input.read_axis(name);
                (value.abs() > AXIS_ACTIVATION_THRESHOLD)
                    .then(|| Trigger::axis(name.clone(), AxisDirection::of(value)))
            })
    }

    /// Resamples axis rest values when the device count changes, and unmutes
    /// axes that moved away from their rest value.
    fn refresh_rest_noise(&mut self, input: &dyn InputSource) {
        let count = input.connected_device_count();
        if self.device_count != Some(count) {
            self.device_count = Some(count);
            self.muted_axes.clear();
            self.rest_values.clear();

            for name in self.sampled_axes() {
                let rest = input.read_axis(&name);
                if rest.abs() > REST_EPSILON {
                    self.rest_values.insert(name.clone(), rest);
                    self.muted_axes.insert(name);
                }
            }
            debug!(
                devices = count,
                muted = self.muted_axes.len(),
                "resampled axis rest values"
            );
            return;
        }

        if self.muted_axes.is_empty() {
            return;
        }
        let rest_values = &self.rest_values;
        self.muted_axes.retain(|name| {
            let rest = rest_values.get(name).copied().unwrap_or(0.0);
            (input.read_axis(name) - rest).abs() <= REST_EPSILON
        });
    }

    /// Joystick axes from the catalog plus every non-mouse axis a registered
    /// binding refers to.
    fn sampled_axes(&self) -> Vec<String> {
        let mut axes: Vec<String> = self.catalog.joystick_axes().to_vec();
        for registered in &self.bindings {
            let binding = registered.accessor.get();
            for axis in binding.triggers().filter_map(Trigger::as_axis) {
                if !self.catalog.is_mouse_axis(&axis.name) && !axes.contains(&axis.name) {
                    axes.push(axis.name.clone());
                }
            }
        }
        axes
    }
}

impl Default for BindingMediator {
    fn default() -> Self {
        Self::new(AxisCatalog::default())
    }
}
