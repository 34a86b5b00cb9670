use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keyconf::config::AppConfig;
use keyconf::input::{
    AxisDirection, Binding, BindingMediator, InputFilter, InputSnapshot, KeyCode, RebindOutcome,
    RebindRequest, Trigger,
};
use keyconf::settings::{
    BindingKind, Choice, ControllerBuilder, FieldAccessor, FieldDescriptor, GroupSchema, Number,
    Schema, SettingsController, SettingsEvent, Toggle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quality {
    Low,
    Medium,
    High,
}

impl Choice for Quality {
    fn variants() -> &'static [Self] {
        &[Quality::Low, Quality::Medium, Quality::High]
    }

    fn name(&self) -> &'static str {
        match self {
            Quality::Low => "Low",
            Quality::Medium => "Medium",
            Quality::High => "High",
        }
    }
}

/// Live values edited by the demo settings page.
struct DemoFields {
    master_volume: Rc<RefCell<f64>>,
    music_muted: Rc<RefCell<bool>>,
    quality: Rc<RefCell<Quality>>,
    fps_cap: Rc<RefCell<i32>>,
    windowed: Rc<RefCell<bool>>,
    fullscreen: Rc<RefCell<bool>>,
    window_scale: Rc<RefCell<f32>>,
    jump: Rc<RefCell<Binding>>,
    fire: Rc<RefCell<Binding>>,
    steer: Rc<RefCell<Binding>>,
}

impl DemoFields {
    fn new() -> Self {
        Self {
            master_volume: Rc::new(RefCell::new(0.8)),
            music_muted: Rc::new(RefCell::new(false)),
            quality: Rc::new(RefCell::new(Quality::Medium)),
            fps_cap: Rc::new(RefCell::new(60)),
            windowed: Rc::new(RefCell::new(true)),
            fullscreen: Rc::new(RefCell::new(false)),
            window_scale: Rc::new(RefCell::new(1.0)),
            jump: Rc::new(RefCell::new(Binding::new([
                Trigger::Key(KeyCode::SPACE),
                Trigger::Key(KeyCode::JoystickButton {
                    joystick: 0,
                    button: 0,
                }),
            ]))),
            fire: Rc::new(RefCell::new(Binding::new([Trigger::Key(KeyCode::Mouse(0))]))),
            steer: Rc::new(RefCell::new(Binding::new([Trigger::axis(
                "Joy1 Axis1",
                AxisDirection::Positive,
            )]))),
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("Demo")
            .group(
                GroupSchema::new("Audio")
                    .field(
                        FieldDescriptor::new("MasterVolume", FieldAccessor::shared(&self.master_volume))
                            .label("Master volume")
                            .range(0.0, 1.0),
                    )
                    .field(FieldDescriptor::new("MusicMuted", FieldAccessor::shared(&self.music_muted))),
            )
            .group(
                GroupSchema::new("Video")
                    .field(FieldDescriptor::choice("Quality", FieldAccessor::shared(&self.quality)))
                    .field(FieldDescriptor::new("FpsCap", FieldAccessor::shared(&self.fps_cap)).range(30.0, 240.0))
                    .header("Display mode")
                    .field(FieldDescriptor::new("Windowed", FieldAccessor::shared(&self.windowed)).exclusive("display"))
                    .field(
                        FieldDescriptor::new("Fullscreen", FieldAccessor::shared(&self.fullscreen))
                            .exclusive("display"),
                    ),
            )
            .group(
                GroupSchema::new("Window")
                    .field(FieldDescriptor::new("Scale", FieldAccessor::shared(&self.window_scale)).range(0.5, 2.0))
                    .visible_when(|page| page.get::<Toggle>("Video.Windowed").unwrap_or(false)),
            )
            .group(
                GroupSchema::new("Controls")
                    .field(FieldDescriptor::new("Jump", FieldAccessor::shared(&self.jump)))
                    .field(FieldDescriptor::new("Fire", FieldAccessor::shared(&self.fire)))
                    .field(FieldDescriptor::new("Steer", FieldAccessor::shared(&self.steer))),
            )
    }
}

fn log_jump(frame: usize, jump: &Binding) {
    let state = jump.state();
    info!(
        frame,
        pressed = state.pressed,
        just_pressed = state.just_pressed,
        just_released = state.just_released,
        "jump"
    );
}

fn main() -> Result<()> {
    // Load config or create default if not exists
    let config = AppConfig::load_or_create("Settings.toml").context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let fields = DemoFields::new();
    let mut controller: SettingsController = ControllerBuilder::new(fields.schema())
        .boxed_storage(config.storage_backend())
        .boxed_hasher(config.user_id_hasher())
        .salt(config.salt.clone())
        .on_applied("log", |page| {
            info!(changed = page.is_changed(), keys = page.len(), "settings applied");
            Ok(())
        })
        .build()?;
    let events = controller.subscribe();

    controller.set_user_id(&config.user_id)?;
    info!(
        user = %config.user_id,
        scope = controller.storage_scope(),
        "user activated"
    );

    let mut mediator = BindingMediator::new(config.axis_catalog());
    let registered = controller.register_bindings(&mut mediator);
    info!(bindings = registered, "bindings registered");

    // Press and release the jump key over four frames.
    let mut input = InputSnapshot::new();
    input.set_device_count(1);
    for frame in 0..4 {
        match frame {
            1 => {
                input.press(KeyCode::SPACE);
            }
            3 => {
                input.release(KeyCode::SPACE);
            }
            _ => {}
        }
        mediator.update(&input);
        log_jump(frame, &fields.jump.borrow());
    }

    // Capture a new fire binding.
    let captured: Rc<RefCell<Option<Option<RebindOutcome>>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&captured);
    let request = RebindRequest::single(InputFilter::KEYS).with_cancel_key(config.cancel_key());
    mediator.begin_rebind(request, move |outcome| *sink.borrow_mut() = Some(outcome));
    mediator.update(&input);
    input.press("F".parse::<KeyCode>()?);
    mediator.update(&input);
    input.clear();

    match captured.borrow_mut().take() {
        Some(Some(RebindOutcome::Single(trigger))) => {
            info!(%trigger, "captured fire binding");
            controller.set::<BindingKind>("Controls.Fire", Binding::new([trigger]))?;
        }
        Some(other) => info!(?other, "fire capture ended without a single trigger"),
        None => warn!("fire capture still pending"),
    }

    // Switch to fullscreen; the exclusive group turns windowed off.
    controller.set::<Toggle>("Video.Fullscreen", true)?;
    controller.set::<Number>("Video.FpsCap", 500.0)?;
    controller.tick();

    for group in controller.page().groups() {
        let entries: Vec<String> = group
            .keys()
            .map(|key| format!("{} = {}", key.label(), key.display_value()))
            .collect();
        info!(group = group.label(), entries = %entries.join(", "), "settings");
    }

    controller.apply(true)?;
    info!(
        fps_cap = *fields.fps_cap.borrow(),
        windowed = *fields.windowed.borrow(),
        fullscreen = *fields.fullscreen.borrow(),
        fire = %fields.fire.borrow(),
        "fields after apply"
    );

    for event in events.try_iter() {
        if let SettingsEvent::VisibilityChanged { group, visible } = event {
            info!(%group, visible, "group visibility changed");
        }
    }
    Ok(())
}
