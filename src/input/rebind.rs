//! Rebind capture: "press any key" sessions driven by the binding mediator.

use super::keycode::KeyCode;
use super::trigger::{AxisDirection, AxisRef, Trigger};
use super::InputFilter;

/// What a rebind session captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebindMode {
    /// One trigger.
    Single,
    /// A negative/positive pair forming a virtual axis.
    AxisPair,
}

/// Parameters of a capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct RebindRequest {
    pub mode: RebindMode,
    pub filter: InputFilter,
    pub cancel_key: KeyCode,
}

impl RebindRequest {
    pub fn single(filter: InputFilter) -> Self {
        Self {
            mode: RebindMode::Single,
            filter,
            cancel_key: KeyCode::ESCAPE,
        }
    }

    pub fn axis_pair(filter: InputFilter) -> Self {
        Self {
            mode: RebindMode::AxisPair,
            filter,
            cancel_key: KeyCode::ESCAPE,
        }
    }

    pub fn with_cancel_key(mut self, key: KeyCode) -> Self {
        self.cancel_key = key;
        self
    }
}

/// Result of a completed capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebindOutcome {
    Single(Trigger),
    Pair { negative: Trigger, positive: Trigger },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebindState {
    WaitingFirst,
    WaitingSecond,
    Done,
}

/// Identifies a session hosted by a [`super::BindingMediator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RebindHandle(pub(crate) u64);

pub(crate) type CompletionFn = Box<dyn FnOnce(Option<RebindOutcome>)>;

pub(crate) enum Step {
    Pending,
    Finished(Option<RebindOutcome>),
}

pub(crate) struct RebindSession {
    pub(crate) handle: RebindHandle,
    pub(crate) request: RebindRequest,
    state: RebindState,
    first: Option<Trigger>,
    /// Inputs held while disarmed are ignored; arms once nothing is held.
    armed: bool,
    on_complete: Option<CompletionFn>,
}

impl RebindSession {
    pub(crate) fn new(handle: RebindHandle, request: RebindRequest, on_complete: CompletionFn) -> Self {
        Self {
            handle,
            request,
            state: RebindState::WaitingFirst,
            first: None,
            armed: false,
            on_complete: Some(on_complete),
        }
    }

    pub(crate) fn state(&self) -> RebindState {
        self.state
    }

    /// Whether `key` cancels this session regardless of the filter.
    pub(crate) fn is_cancel(&self, key: KeyCode) -> bool {
        self.state == RebindState::WaitingFirst && key == self.request.cancel_key
    }

    /// Feeds the input found by this frame's scan.
    pub(crate) fn observe_frame(&mut self, observed: Option<Trigger>) -> Step {
        match observed {
            None => {
                self.armed = true;
                Step::Pending
            }
            Some(_) if !self.armed => Step::Pending,
            Some(trigger) => self.accept(trigger),
        }
    }

    /// Feeds a discrete key-down event from the UI.
    pub(crate) fn observe_key_down(&mut self, key: KeyCode) -> Step {
        self.accept(Trigger::Key(key))
    }

    fn accept(&mut self, trigger: Trigger) -> Step {
        // The accepted input is usually still held on the next scan.
        self.armed = false;

        match self.state {
            RebindState::WaitingFirst => {
                if trigger == Trigger::Key(self.request.cancel_key) {
                    return self.finish(None);
                }
                match (self.request.mode, &trigger) {
                    (RebindMode::Single, _) => self.finish(Some(RebindOutcome::Single(trigger))),
                    // A moved axis already is the pair.
                    (RebindMode::AxisPair, Trigger::Axis(axis)) => {
                        let (negative, positive) = match axis.direction {
                            AxisDirection::Negative => (axis.clone(), flip(axis)),
                            AxisDirection::Positive => (flip(axis), axis.clone()),
                        };
                        self.finish(Some(RebindOutcome::Pair {
                            negative: Trigger::Axis(negative),
                            positive: Trigger::Axis(positive),
                        }))
                    }
                    (RebindMode::AxisPair, Trigger::Key(_)) => {
                        self.first = Some(trigger);
                        self.state = RebindState::WaitingSecond;
                        Step::Pending
                    }
                }
            }
            RebindState::WaitingSecond => match self.first.take() {
                Some(first) if first == trigger => self.finish(None),
                Some(first) => self.finish(Some(RebindOutcome::Pair {
                    negative: first,
                    positive: trigger,
                })),
                None => self.finish(None),
            },
            RebindState::Done => Step::Pending,
        }
    }

    fn finish(&mut self, outcome: Option<RebindOutcome>) -> Step {
        self.state = RebindState::Done;
        Step::Finished(outcome)
    }

    /// Invokes the completion callback; later calls do nothing.
    pub(crate) fn complete(&mut self, outcome: Option<RebindOutcome>) {
        self.state = RebindState::Done;
        if let Some(callback) = self.on_complete.take() {
            callback(outcome);
        }
    }
}

fn flip(axis: &AxisRef) -> AxisRef {
    AxisRef::new(axis.name.clone(), axis.direction.opposite())
}
