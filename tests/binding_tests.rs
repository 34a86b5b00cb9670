//! Frame-driven tests of binding polling and rebind capture.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use keyconf::input::{
    AxisCatalog, AxisDirection, Binding, BindingMediator, InputFilter, InputSnapshot, KeyCode,
    RebindOutcome, RebindRequest, RebindState, Trigger,
};
use keyconf::settings::{
    BindingKind, ControllerBuilder, DefaultRegistry, FieldAccessor, FieldDescriptor, GroupSchema,
    Schema, SettingsController,
};

struct Controls {
    jump: Rc<RefCell<Binding>>,
    steer_left: Rc<RefCell<Binding>>,
    steer_right: Rc<RefCell<Binding>>,
    volume: Rc<RefCell<f64>>,
}

impl Controls {
    fn new() -> Self {
        Self {
            jump: Rc::new(RefCell::new(Binding::new([Trigger::Key(KeyCode::SPACE)]))),
            steer_left: Rc::new(RefCell::new(Binding::new([Trigger::axis(
                "Joy1 Axis1",
                AxisDirection::Negative,
            )]))),
            steer_right: Rc::new(RefCell::new(Binding::new([Trigger::axis(
                "Joy1 Axis1",
                AxisDirection::Positive,
            )]))),
            volume: Rc::new(RefCell::new(0.5)),
        }
    }

    fn controller(&self) -> SettingsController {
        let schema = Schema::new("Controls").group(
            GroupSchema::new("Player")
                .field(FieldDescriptor::new(
                    "Jump",
                    FieldAccessor::shared(&self.jump),
                ))
                .field(FieldDescriptor::new(
                    "SteerLeft",
                    FieldAccessor::shared(&self.steer_left),
                ))
                .field(FieldDescriptor::new(
                    "SteerRight",
                    FieldAccessor::shared(&self.steer_right),
                ))
                .field(FieldDescriptor::new(
                    "Volume",
                    FieldAccessor::shared(&self.volume),
                )),
        );
        ControllerBuilder::new(schema)
            .defaults(Arc::new(DefaultRegistry::new()))
            .build()
            .expect("Failed to build controller")
    }
}

fn edges(binding: &Rc<RefCell<Binding>>) -> (bool, bool, bool) {
    let state = binding.borrow().state();
    (state.pressed, state.just_pressed, state.just_released)
}

#[test]
fn test_jump_edges_over_frames() {
    let controls = Controls::new();
    let controller = controls.controller();
    let mut mediator = BindingMediator::default();
    assert_eq!(controller.register_bindings(&mut mediator), 3);

    let mut input = InputSnapshot::new();
    let mut observed = Vec::new();
    for held in [false, true, true, false] {
        if held {
            input.press(KeyCode::SPACE);
        } else {
            input.release(KeyCode::SPACE);
        }
        mediator.update(&input);
        observed.push(edges(&controls.jump));
    }

    assert_eq!(
        observed,
        vec![
            (false, false, false),
            (true, true, false),
            (true, false, false),
            (false, false, true),
        ]
    );
    assert_eq!(mediator.write_backs(), 3);
}

#[test]
fn test_axis_bindings_follow_stick() {
    let controls = Controls::new();
    let controller = controls.controller();
    let mut mediator = BindingMediator::default();
    controller.register_bindings(&mut mediator);

    let mut input = InputSnapshot::new();
    input.set_device_count(1);
    mediator.update(&input);

    input.set_axis("Joy1 Axis1", -0.8);
    mediator.update(&input);
    assert!(controls.steer_left.borrow().just_pressed());
    assert!(!controls.steer_right.borrow().pressed());

    input.set_axis("Joy1 Axis1", 0.1);
    mediator.update(&input);
    assert!(controls.steer_left.borrow().just_released());
    assert!(!controls.steer_right.borrow().pressed());
}

#[test]
fn test_drifting_stick_does_not_press() {
    let controls = Controls::new();
    let controller = controls.controller();
    let mut mediator = BindingMediator::new(AxisCatalog::new(1, 2, 4));
    controller.register_bindings(&mut mediator);

    let mut input = InputSnapshot::new();
    input.set_device_count(1).set_axis("Joy1 Axis1", 0.6);
    for _ in 0..3 {
        mediator.update(&input);
        assert!(!controls.steer_right.borrow().pressed());
    }

    input.set_axis("Joy1 Axis1", 1.0);
    mediator.update(&input);
    assert!(controls.steer_right.borrow().pressed());
}

#[test]
fn test_rebind_then_apply() {
    let controls = Controls::new();
    let mut controller = controls.controller();
    let mut mediator = BindingMediator::default();
    controller.register_bindings(&mut mediator);

    let captured: Rc<RefCell<Option<Option<RebindOutcome>>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&captured);
    let handle = mediator.begin_rebind(
        RebindRequest::single(InputFilter::KEYS),
        move |outcome| *sink.borrow_mut() = Some(outcome),
    );

    let mut input = InputSnapshot::new();
    mediator.update(&input);
    assert_eq!(mediator.rebind_state(handle), RebindState::WaitingFirst);

    let f = KeyCode::Keyboard(0x46);
    input.press(f);
    mediator.update(&input);
    assert_eq!(mediator.rebind_state(handle), RebindState::Done);

    let outcome = captured.borrow_mut().take();
    let trigger = match outcome {
        Some(Some(RebindOutcome::Single(trigger))) => trigger,
        other => panic!("expected a captured trigger, got {other:?}"),
    };
    assert_eq!(trigger, Trigger::Key(f));

    controller
        .set::<BindingKind>("Player.Jump", Binding::new([trigger]))
        .expect("Failed to set jump");
    controller.apply(false).expect("Failed to apply");
    assert_eq!(controls.jump.borrow().to_string(), "F");

    // F is still held: the next frame sees the new binding pressed.
    mediator.update(&input);
    assert!(controls.jump.borrow().just_pressed());
}

#[test]
fn test_rebind_cancelled_by_escape() {
    let mut mediator = BindingMediator::default();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let handle = mediator.begin_rebind(
        RebindRequest::single(InputFilter::ALL),
        move |outcome| sink.borrow_mut().push(outcome),
    );

    let mut input = InputSnapshot::new();
    mediator.update(&input);
    input.press(KeyCode::ESCAPE);
    for _ in 0..3 {
        mediator.update(&input);
    }
    mediator.cancel_rebind(handle);

    assert_eq!(*calls.borrow(), vec![None]);
    assert_eq!(mediator.active_rebinds(), 0);
}

#[test]
fn test_axis_pair_capture_from_keys() {
    let mut mediator = BindingMediator::default();
    let captured = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&captured);
    let handle = mediator.begin_rebind(
        RebindRequest::axis_pair(InputFilter::KEYBOARD),
        move |outcome| *sink.borrow_mut() = Some(outcome),
    );

    let left = KeyCode::Keyboard(0x41);
    let right = KeyCode::Keyboard(0x44);
    let mut input = InputSnapshot::new();
    mediator.update(&input);

    input.press(left);
    mediator.update(&input);
    assert_eq!(mediator.rebind_state(handle), RebindState::WaitingSecond);

    // Still holding the first key does not count as the second one.
    mediator.update(&input);
    input.release(left);
    mediator.update(&input);
    input.press(right);
    mediator.update(&input);

    assert_eq!(
        captured.borrow_mut().take(),
        Some(Some(RebindOutcome::Pair {
            negative: Trigger::Key(left),
            positive: Trigger::Key(right),
        }))
    );
}
