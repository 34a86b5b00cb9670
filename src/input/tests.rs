//! Unit tests for input module.

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    use crate::input::rebind::RebindMode;
    use crate::input::*;
    use crate::settings::schema::{FieldAccessor, FieldDescriptor};

    fn key(name: &str) -> Trigger {
        Trigger::Key(name.parse().expect("Failed to parse key name"))
    }

    fn shared_binding(binding: Binding) -> (Rc<RefCell<Binding>>, FieldAccessor<Binding>) {
        let cell = Rc::new(RefCell::new(binding));
        let accessor = FieldAccessor::shared(&cell);
        (cell, accessor)
    }

    type Captured = Rc<RefCell<Vec<Option<RebindOutcome>>>>;

    fn capture_sink() -> (Captured, impl FnOnce(Option<RebindOutcome>) + 'static) {
        let captured: Captured = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&captured);
        (captured, move |outcome| sink.borrow_mut().push(outcome))
    }

    #[test]
    fn test_trigger_display_and_parse() {
        assert_eq!(key("SPACE").to_string(), "SPACE");
        assert_eq!(
            Trigger::axis("Joy1 Axis2", AxisDirection::Negative).to_string(),
            "Joy1 Axis2-"
        );
        assert_eq!(
            "Mouse X+".parse::<Trigger>(),
            Ok(Trigger::axis("Mouse X", AxisDirection::Positive))
        );
        assert_eq!("esc".parse::<Trigger>(), Ok(Trigger::Key(KeyCode::ESCAPE)));
        assert!("definitely not a key".parse::<Trigger>().is_err());
    }

    #[test]
    fn test_trigger_axis_threshold() {
        let right = Trigger::axis("Joy1 Axis1", AxisDirection::Positive);
        let left = Trigger::axis("Joy1 Axis1", AxisDirection::Negative);
        let muted = HashSet::new();
        let mut input = InputSnapshot::new();

        input.set_axis("Joy1 Axis1", 0.2);
        assert!(!right.is_active(&input, &muted));

        input.set_axis("Joy1 Axis1", 0.3);
        assert!(right.is_active(&input, &muted));
        assert!(!left.is_active(&input, &muted));

        input.set_axis("Joy1 Axis1", -0.9);
        assert!(left.is_active(&input, &muted));

        let muted: HashSet<String> = ["Joy1 Axis1".to_string()].into_iter().collect();
        assert!(!left.is_active(&input, &muted));
    }

    #[test]
    fn test_any_joystick_button() {
        let mut input = InputSnapshot::new();
        input.press(KeyCode::JoystickButton {
            joystick: 3,
            button: 5,
        });
        assert!(input.is_key_active(KeyCode::JoystickButton {
            joystick: 0,
            button: 5
        }));
        assert!(!input.is_key_active(KeyCode::JoystickButton {
            joystick: 0,
            button: 4
        }));
        assert!(!input.is_key_active(KeyCode::JoystickButton {
            joystick: 1,
            button: 5
        }));
    }

    #[test]
    fn test_edge_sequence() {
        let mut binding = Binding::new([key("SPACE")]);
        let levels = [false, true, true, false];
        let expected = [
            (false, false, false),
            (true, true, false),
            (true, false, false),
            (false, false, true),
        ];
        let expected_changed = [false, true, true, true];

        for ((level, want), want_changed) in levels.iter().zip(expected).zip(expected_changed) {
            let changed = binding.advance(*level);
            let state = binding.state();
            assert_eq!(
                (state.pressed, state.just_pressed, state.just_released),
                want
            );
            assert_eq!(changed, want_changed);
        }
    }

    #[test]
    fn test_mediator_writes_back_only_on_change() {
        let (cell, accessor) = shared_binding(Binding::new([key("SPACE")]));
        let writes = Rc::new(RefCell::new(0u32));
        let counter = Rc::clone(&writes);
        let inner = accessor.clone();
        let counting = FieldAccessor::new(
            move || inner.get(),
            move |value| {
                *counter.borrow_mut() += 1;
                accessor.set(value);
            },
        );

        let mut mediator = BindingMediator::default();
        mediator.register("Controls.Jump", counting);

        let mut input = InputSnapshot::new();
        let mut writes_per_tick = Vec::new();
        for level in [false, true, true, false] {
            if level {
                input.press(KeyCode::SPACE);
            } else {
                input.release(KeyCode::SPACE);
            }
            let before = *writes.borrow();
            mediator.update(&input);
            writes_per_tick.push(*writes.borrow() - before);
        }

        // Tick 0 matches the baseline; every later tick moves an edge flag.
        assert_eq!(writes_per_tick, vec![0, 1, 1, 1]);
        assert_eq!(mediator.write_backs(), 3);

        // Holding the key again settles on (pressed, no edges): no write.
        input.press(KeyCode::SPACE);
        mediator.update(&input);
        mediator.update(&input);
        let before = *writes.borrow();
        mediator.update(&input);
        assert_eq!(*writes.borrow(), before);
        assert!(cell.borrow().pressed());
    }

    #[test]
    fn test_mediator_polls_in_registration_order() {
        let mut mediator = BindingMediator::default();
        let (_, jump) = shared_binding(Binding::new([key("SPACE")]));
        let (_, fire) = shared_binding(Binding::new([key("F")]));
        mediator.register("Jump", jump);
        mediator.register("Fire", fire);
        assert_eq!(mediator.registered().collect::<Vec<_>>(), vec!["Jump", "Fire"]);
    }

    #[test]
    fn test_register_field_skips_non_bindings() {
        let mut mediator = BindingMediator::default();
        let volume = Rc::new(RefCell::new(0.5f64));
        let jump = Rc::new(RefCell::new(Binding::new([key("SPACE")])));

        assert!(!mediator.register_field(&FieldDescriptor::new(
            "Volume",
            FieldAccessor::shared(&volume)
        )));
        assert!(mediator.register_field(&FieldDescriptor::new("Jump", FieldAccessor::shared(&jump))));
        assert_eq!(mediator.len(), 1);
    }

    #[test]
    fn test_merge_fills_empty_slots() {
        let default = Binding::new([key("A"), key("B")]);
        let saved = Binding::from_slots([None, Some(key("C"))]);

        let merged = Binding::merge(&default, &saved);
        assert_eq!(merged.as_ref(), &Binding::new([key("A"), key("C")]));
    }

    #[test]
    fn test_merge_grows_shorter_binding() {
        let default = Binding::new([key("A"), key("B"), key("MOUSE1")]);
        let saved = Binding::new([key("Q")]);

        let merged = Binding::merge(&default, &saved);
        assert_eq!(
            merged.into_owned(),
            Binding::new([key("Q"), key("B"), key("MOUSE1")])
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let default = Binding::from_slots([Some(key("A")), None, Some(key("B"))]);
        let cases = [
            Binding::empty(0),
            Binding::empty(4),
            Binding::from_slots([None, Some(key("C"))]),
            Binding::new([key("X"), key("Y"), key("Z"), key("W")]),
        ];
        for current in cases {
            let once = Binding::merge(&default, &current).into_owned();
            let twice = Binding::merge(&default, &once).into_owned();
            assert_eq!(once, twice, "merging {current} twice");
        }
    }

    #[test]
    fn test_merge_same_binding_is_borrowed() {
        let binding = Binding::from_slots([None, Some(key("C"))]);
        let merged = Binding::merge(&binding, &binding);
        assert!(matches!(merged, Cow::Borrowed(b) if std::ptr::eq(b, &binding)));
    }

    #[test]
    fn test_overrides_keep_only_custom_slots() {
        let default = Binding::new([key("A"), key("B")]);
        let current = Binding::new([key("A"), key("C")]);
        assert_eq!(
            current.overrides(&default),
            Binding::from_slots([None, Some(key("C"))])
        );
        assert!(default.overrides(&default).is_empty());
    }

    #[test]
    fn test_binding_display() {
        assert_eq!(Binding::empty(2).to_string(), "<unbound>");
        let binding = Binding::from_slots([Some(key("SPACE")), None, Some(key("MOUSE0"))]);
        assert_eq!(binding.to_string(), "SPACE / MOUSE0");
    }

    #[test]
    fn test_binding_serde_skips_state() {
        let mut binding = Binding::new([key("SPACE")]);
        binding.advance(true);

        let json = serde_json::to_string(&binding).expect("Failed to serialize binding");
        let restored: Binding = serde_json::from_str(&json).expect("Failed to parse binding");
        assert_eq!(restored, binding);
        assert!(!restored.pressed());
        assert!(!restored.just_pressed());
    }

    #[test]
    fn test_read_next_input_priority() {
        let mediator = BindingMediator::default();
        let mut input = InputSnapshot::new();
        input
            .press(KeyCode::Mouse(1))
            .press(KeyCode::JoystickButton {
                joystick: 1,
                button: 2,
            })
            .press(KeyCode::SPACE)
            .set_axis("Joy1 Axis1", 1.0);

        assert_eq!(
            mediator.read_next_input(InputFilter::ALL, &input),
            Some(Trigger::Key(KeyCode::SPACE))
        );
        assert_eq!(
            mediator.read_next_input(InputFilter::JOYSTICK_BUTTONS | InputFilter::MOUSE_BUTTONS, &input),
            Some(Trigger::Key(KeyCode::JoystickButton {
                joystick: 1,
                button: 2
            }))
        );
        assert_eq!(
            mediator.read_next_input(InputFilter::MOUSE_BUTTONS, &input),
            Some(Trigger::Key(KeyCode::Mouse(1)))
        );
        assert_eq!(
            mediator.read_next_input(InputFilter::AXES, &input),
            Some(Trigger::axis("Joy1 Axis1", AxisDirection::Positive))
        );

        input.clear();
        assert_eq!(mediator.read_next_input(InputFilter::ALL, &input), None);
    }

    #[test]
    fn test_mouse_axes_before_joystick_axes() {
        let mediator = BindingMediator::default();
        let mut input = InputSnapshot::new();
        input.set_axis("Joy2 Axis3", -0.8).set_axis("Mouse Y", -0.5);

        assert_eq!(
            mediator.read_next_input(InputFilter::AXES, &input),
            Some(Trigger::axis("Mouse Y", AxisDirection::Negative))
        );
        assert_eq!(
            mediator.read_next_input(InputFilter::JOYSTICK_AXES, &input),
            Some(Trigger::axis("Joy2 Axis3", AxisDirection::Negative))
        );
    }

    #[test]
    fn test_rest_noise_mutes_drifting_axis() {
        let (cell, accessor) = shared_binding(Binding::new([Trigger::axis(
            "Joy1 Axis1",
            AxisDirection::Positive,
        )]));
        let mut mediator = BindingMediator::default();
        mediator.register("Steer", accessor);

        // A stick resting at 0.4 when the controller connects.
        let mut input = InputSnapshot::new();
        input.set_device_count(1).set_axis("Joy1 Axis1", 0.4);
        mediator.update(&input);
        assert!(mediator.muted_axes().contains("Joy1 Axis1"));
        assert!(!cell.borrow().pressed());
        assert_eq!(mediator.read_next_input(InputFilter::AXES, &input), None);

        // Moving it away from the rest value unmutes it.
        input.set_axis("Joy1 Axis1", 0.9);
        mediator.update(&input);
        assert!(mediator.muted_axes().is_empty());
        assert!(cell.borrow().pressed());
    }

    #[test]
    fn test_rest_noise_resampled_on_device_change() {
        let mut mediator = BindingMediator::default();
        let mut input = InputSnapshot::new();
        input.set_device_count(1).set_axis("Joy2 Axis4", -0.3);
        mediator.update(&input);
        assert!(mediator.muted_axes().contains("Joy2 Axis4"));

        input.set_axis("Joy2 Axis4", 0.0).set_device_count(0);
        mediator.update(&input);
        assert!(mediator.muted_axes().is_empty());
    }

    #[test]
    fn test_rebind_single_capture() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let handle = mediator.begin_rebind(RebindRequest::single(InputFilter::KEYS), sink);
        assert_eq!(mediator.rebind_state(handle), RebindState::WaitingFirst);

        let mut input = InputSnapshot::new();
        mediator.update(&input);
        input.press(KeyCode::Mouse(2));
        mediator.update(&input);

        assert_eq!(
            *captured.borrow(),
            vec![Some(RebindOutcome::Single(Trigger::Key(KeyCode::Mouse(2))))]
        );
        assert_eq!(mediator.rebind_state(handle), RebindState::Done);
        assert_eq!(mediator.active_rebinds(), 0);
    }

    #[test]
    fn test_rebind_ignores_input_held_at_start() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        mediator.begin_rebind(RebindRequest::single(InputFilter::KEYS), sink);

        let mut input = InputSnapshot::new();
        input.press(KeyCode::RETURN);
        mediator.update(&input);
        mediator.update(&input);
        assert!(captured.borrow().is_empty());

        input.release(KeyCode::RETURN);
        mediator.update(&input);
        input.press(KeyCode::SPACE);
        mediator.update(&input);
        assert_eq!(
            *captured.borrow(),
            vec![Some(RebindOutcome::Single(Trigger::Key(KeyCode::SPACE)))]
        );
    }

    #[test]
    fn test_rebind_cancel_key() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let handle = mediator.begin_rebind(RebindRequest::single(InputFilter::ALL), sink);

        let mut input = InputSnapshot::new();
        mediator.update(&input);
        input.press(KeyCode::ESCAPE);
        mediator.update(&input);
        mediator.update(&input);

        assert_eq!(*captured.borrow(), vec![None]);
        assert_eq!(mediator.active_rebinds(), 0);
        assert!(!mediator.cancel_rebind(handle));
        assert_eq!(captured.borrow().len(), 1);
    }

    #[test]
    fn test_rebind_explicit_cancel_is_idempotent() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let handle = mediator.begin_rebind(RebindRequest::single(InputFilter::KEYS), sink);

        assert!(mediator.cancel_rebind(handle));
        assert!(!mediator.cancel_rebind(handle));
        assert_eq!(*captured.borrow(), vec![None]);

        // No longer polled.
        let mut input = InputSnapshot::new();
        input.press(KeyCode::SPACE);
        mediator.update(&input);
        assert_eq!(captured.borrow().len(), 1);
    }

    #[test]
    fn test_rebind_axis_pair_from_keys() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let request = RebindRequest::axis_pair(InputFilter::ALL);
        assert_eq!(request.mode, RebindMode::AxisPair);
        let handle = mediator.begin_rebind(request, sink);

        mediator.key_down(KeyCode::Keyboard(0x41));
        assert_eq!(mediator.rebind_state(handle), RebindState::WaitingSecond);
        mediator.key_down(KeyCode::Keyboard(0x44));

        assert_eq!(
            *captured.borrow(),
            vec![Some(RebindOutcome::Pair {
                negative: key("A"),
                positive: key("D"),
            })]
        );
    }

    #[test]
    fn test_rebind_axis_pair_same_key_cancels() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        mediator.begin_rebind(RebindRequest::axis_pair(InputFilter::KEYS), sink);

        mediator.key_down(KeyCode::Keyboard(0x41));
        mediator.key_down(KeyCode::Keyboard(0x41));
        assert_eq!(*captured.borrow(), vec![None]);
    }

    #[test]
    fn test_rebind_axis_pair_from_axis() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        mediator.begin_rebind(RebindRequest::axis_pair(InputFilter::JOYSTICK_AXES), sink);

        let mut input = InputSnapshot::new();
        mediator.update(&input);
        input.set_axis("Joy1 Axis2", -1.0);
        mediator.update(&input);

        assert_eq!(
            *captured.borrow(),
            vec![Some(RebindOutcome::Pair {
                negative: Trigger::axis("Joy1 Axis2", AxisDirection::Negative),
                positive: Trigger::axis("Joy1 Axis2", AxisDirection::Positive),
            })]
        );
    }

    #[test]
    fn test_key_down_respects_filter() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        mediator.begin_rebind(RebindRequest::single(InputFilter::MOUSE_BUTTONS), sink);

        mediator.key_down(KeyCode::SPACE);
        assert!(captured.borrow().is_empty());
        mediator.key_down(KeyCode::Mouse(0));
        assert_eq!(
            *captured.borrow(),
            vec![Some(RebindOutcome::Single(Trigger::Key(KeyCode::Mouse(0))))]
        );
    }

    #[test]
    fn test_custom_cancel_key() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let request = RebindRequest::single(InputFilter::KEYS).with_cancel_key(KeyCode::Keyboard(0x51));
        mediator.begin_rebind(request, sink);

        mediator.key_down(KeyCode::Keyboard(0x51));
        assert_eq!(*captured.borrow(), vec![None]);
    }

    #[test]
    fn test_axis_capture_cancelled_by_escape() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let handle = mediator.begin_rebind(RebindRequest::axis_pair(InputFilter::AXES), sink);

        let mut input = InputSnapshot::new();
        mediator.update(&input);
        input.press(KeyCode::ESCAPE);
        mediator.update(&input);
        mediator.update(&input);

        assert_eq!(*captured.borrow(), vec![None]);
        assert_eq!(mediator.active_rebinds(), 0);
        assert_eq!(mediator.rebind_state(handle), RebindState::Done);
    }

    #[test]
    fn test_key_down_cancel_ignores_filter() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        mediator.begin_rebind(RebindRequest::single(InputFilter::JOYSTICK_BUTTONS), sink);

        mediator.key_down(KeyCode::SPACE);
        assert!(captured.borrow().is_empty());
        mediator.key_down(KeyCode::ESCAPE);
        mediator.key_down(KeyCode::ESCAPE);
        assert_eq!(*captured.borrow(), vec![None]);
    }

    #[test]
    fn test_cancel_key_held_at_start_needs_new_press() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        mediator.begin_rebind(RebindRequest::single(InputFilter::AXES), sink);

        let mut input = InputSnapshot::new();
        input.press(KeyCode::ESCAPE);
        mediator.update(&input);
        mediator.update(&input);
        assert!(captured.borrow().is_empty());

        input.release(KeyCode::ESCAPE);
        mediator.update(&input);
        input.press(KeyCode::ESCAPE);
        mediator.update(&input);
        assert_eq!(*captured.borrow(), vec![None]);
    }

    #[test]
    fn test_unfiltered_cancel_key_not_paired() {
        let mut mediator = BindingMediator::default();
        let (captured, sink) = capture_sink();
        let handle =
            mediator.begin_rebind(RebindRequest::axis_pair(InputFilter::JOYSTICK_BUTTONS), sink);

        mediator.key_down(KeyCode::JoystickButton {
            joystick: 1,
            button: 2,
        });
        assert_eq!(mediator.rebind_state(handle), RebindState::WaitingSecond);
        mediator.key_down(KeyCode::ESCAPE);
        assert_eq!(mediator.rebind_state(handle), RebindState::WaitingSecond);
        assert!(captured.borrow().is_empty());
    }

    #[test]
    fn test_axis_catalog_names() {
        let catalog = AxisCatalog::new(2, 3, 4);
        assert_eq!(catalog.joystick_axes().len(), 6);
        assert_eq!(catalog.joystick_axes()[0], "Joy1 Axis1");
        assert_eq!(catalog.joystick_axes()[5], "Joy2 Axis3");
        assert!(catalog.is_mouse_axis("Mouse ScrollWheel"));
        assert!(!catalog.is_mouse_axis("Joy1 Axis1"));
    }

    #[test]
    fn test_filter_admits() {
        let catalog = AxisCatalog::default();
        assert!(InputFilter::KEYBOARD.admits(&key("A"), &catalog));
        assert!(!InputFilter::KEYBOARD.admits(&key("MOUSE0"), &catalog));
        assert!(InputFilter::MOUSE_AXES.admits(&Trigger::axis("Mouse X", AxisDirection::Positive), &catalog));
        assert!(!InputFilter::MOUSE_AXES.admits(&Trigger::axis("Joy1 Axis1", AxisDirection::Positive), &catalog));
        assert!(InputFilter::ALL.admits(&Trigger::axis("Joy1 Axis1", AxisDirection::Positive), &catalog));
    }
}
