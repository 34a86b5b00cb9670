//! Change notifications and the deferred per-tick work queue.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender};

/// Notification broadcast to every subscriber of a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    /// A key's working value changed.
    ValueChanged { key: String },
    /// The active user changed; carries the raw user id.
    UserChanged { user: String },
    /// Working values were written back to their fields.
    Applied,
    Saved,
    Loaded,
    /// A group's visibility flipped since the previous tick.
    VisibilityChanged { group: String, visible: bool },
}

/// Broadcasts events to all live subscribers.
///
/// Subscribers whose receiver was dropped are forgotten on the next emit.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Vec<Sender<SettingsEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SettingsEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.borrow_mut().push(sender);
        receiver
    }

    pub fn emit(&self, event: SettingsEvent) {
        self.subscribers
            .borrow_mut()
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// Work marked during a frame and resolved on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    RefreshVisibility,
}

/// FIFO of deferred tasks; a task already queued is not queued twice.
#[derive(Debug, Default)]
pub struct DeferredQueue<T> {
    tasks: VecDeque<T>,
}

impl<T: PartialEq> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    pub fn schedule(&mut self, task: T) {
        if !self.tasks.contains(&task) {
            self.tasks.push_back(task);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.tasks.drain(..)
    }
}
