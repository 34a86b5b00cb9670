//! Discrete input codes and their canonical names.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of mouse buttons a host can report.
pub const MOUSE_BUTTON_COUNT: u8 = 7;
/// Highest joystick index addressable by a [`KeyCode::JoystickButton`].
pub const MAX_JOYSTICKS: u8 = 8;
/// Buttons per joystick.
pub const MAX_JOYSTICK_BUTTONS: u8 = 20;

/// A stable code for one discrete input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    /// Keyboard key by virtual key code.
    Keyboard(u32),
    /// Mouse button, `0` is the primary button.
    Mouse(u8),
    /// Joystick button. `joystick == 0` matches the button on any joystick.
    JoystickButton { joystick: u8, button: u8 },
}

impl KeyCode {
    pub const ESCAPE: KeyCode = KeyCode::Keyboard(0x1B);
    pub const SPACE: KeyCode = KeyCode::Keyboard(0x20);
    pub const RETURN: KeyCode = KeyCode::Keyboard(0x0D);

    /// Keyboard key for an ASCII letter or digit.
    #[inline]
    pub fn char(c: char) -> Option<KeyCode> {
        let upper = c.to_ascii_uppercase();
        (upper.is_ascii_uppercase() || upper.is_ascii_digit())
            .then(|| KeyCode::Keyboard(upper as u32))
    }

    #[inline]
    pub fn is_keyboard(&self) -> bool {
        matches!(self, KeyCode::Keyboard(_))
    }

    #[inline]
    pub fn is_mouse(&self) -> bool {
        matches!(self, KeyCode::Mouse(_))
    }

    #[inline]
    pub fn is_joystick(&self) -> bool {
        matches!(self, KeyCode::JoystickButton { .. })
    }
}

/// Named keyboard keys outside the contiguous letter/digit/numpad/function ranges.
const NAMED_KEYS: &[(&str, u32)] = &[
    // Navigation keys
    ("SPACE", 0x20),
    ("RETURN", 0x0D),
    ("TAB", 0x09),
    ("ESCAPE", 0x1B),
    ("BACK", 0x08),
    ("DELETE", 0x2E),
    ("INSERT", 0x2D),
    ("HOME", 0x24),
    ("END", 0x23),
    ("PAGEUP", 0x21),
    ("PAGEDOWN", 0x22),
    ("UP", 0x26),
    ("DOWN", 0x28),
    ("LEFT", 0x25),
    ("RIGHT", 0x27),
    // Lock and special keys
    ("CAPITAL", 0x14),
    ("NUMLOCK", 0x90),
    ("SCROLL", 0x91),
    ("PAUSE", 0x13),
    ("SNAPSHOT", 0x2C),
    // Numpad operators
    ("MULTIPLY", 0x6A),
    ("ADD", 0x6B),
    ("SEPARATOR", 0x6C),
    ("SUBTRACT", 0x6D),
    ("DECIMAL", 0x6E),
    ("DIVIDE", 0x6F),
    // OEM keys
    ("OEM_1", 0xBA),
    ("OEM_PLUS", 0xBB),
    ("OEM_COMMA", 0xBC),
    ("OEM_MINUS", 0xBD),
    ("OEM_PERIOD", 0xBE),
    ("OEM_2", 0xBF),
    ("OEM_3", 0xC0),
    ("OEM_4", 0xDB),
    ("OEM_5", 0xDC),
    ("OEM_6", 0xDD),
    ("OEM_7", 0xDE),
    ("OEM_8", 0xDF),
    ("OEM_102", 0xE2),
    // Modifiers
    ("LSHIFT", 0xA0),
    ("RSHIFT", 0xA1),
    ("LCTRL", 0xA2),
    ("RCTRL", 0xA3),
    ("LALT", 0xA4),
    ("RALT", 0xA5),
    ("LWIN", 0x5B),
    ("RWIN", 0x5C),
];

/// Alternate spellings accepted by the parser only.
const KEY_ALIASES: &[(&str, KeyCode)] = &[
    ("ESC", KeyCode::Keyboard(0x1B)),
    ("ENTER", KeyCode::Keyboard(0x0D)),
    ("BACKSPACE", KeyCode::Keyboard(0x08)),
    ("CAPSLOCK", KeyCode::Keyboard(0x14)),
    ("LBUTTON", KeyCode::Mouse(0)),
    ("RBUTTON", KeyCode::Mouse(1)),
    ("MBUTTON", KeyCode::Mouse(2)),
    ("XBUTTON1", KeyCode::Mouse(3)),
    ("XBUTTON2", KeyCode::Mouse(4)),
];

static NAME_TO_VK: LazyLock<HashMap<&'static str, u32>> =
    LazyLock::new(|| NAMED_KEYS.iter().copied().collect());

static VK_TO_NAME: LazyLock<HashMap<u32, &'static str>> =
    LazyLock::new(|| NAMED_KEYS.iter().map(|&(name, vk)| (vk, name)).collect());

/// Every keyboard code in scan order.
static KEYBOARD_SCAN: LazyLock<Vec<KeyCode>> = LazyLock::new(|| {
    let mut codes = Vec::with_capacity(128);
    codes.extend((0x41u32..=0x5A).map(KeyCode::Keyboard));
    codes.extend((0x30u32..=0x39).map(KeyCode::Keyboard));
    codes.extend((0x60u32..=0x69).map(KeyCode::Keyboard));
    codes.extend((0x70u32..=0x87).map(KeyCode::Keyboard));
    codes.extend(NAMED_KEYS.iter().map(|&(_, vk)| KeyCode::Keyboard(vk)));
    codes
});

/// Keyboard codes scanned when looking for the next pressed input.
#[inline]
pub fn keyboard_codes() -> &'static [KeyCode] {
    &KEYBOARD_SCAN
}

/// Mouse button codes in scan order.
pub fn mouse_codes() -> impl Iterator<Item = KeyCode> {
    (0..MOUSE_BUTTON_COUNT).map(KeyCode::Mouse)
}

/// Joystick button codes for `joysticks` devices with `buttons` buttons each.
pub fn joystick_codes(joysticks: u8, buttons: u8) -> impl Iterator<Item = KeyCode> {
    (1..=joysticks.min(MAX_JOYSTICKS)).flat_map(move |joystick| {
        (0..buttons.min(MAX_JOYSTICK_BUTTONS))
            .map(move |button| KeyCode::JoystickButton { joystick, button })
    })
}

/// Converts a virtual key code to its key name.
#[inline]
pub fn vk_to_key_name(vk: u32) -> String {
    match vk {
        // A-Z, 0-9
        0x41..=0x5A | 0x30..=0x39 => char::from_u32(vk).map(String::from).unwrap_or_default(),
        // Numpad 0-9
        0x60..=0x69 => format!("NUMPAD{}", vk - 0x60),
        // F1-F24
        0x70..=0x87 => format!("F{}", vk - 0x70 + 1),
        _ => match VK_TO_NAME.get(&vk) {
            Some(name) => (*name).to_string(),
            // Unknown key - format as hex
            None => format!("VK_{:02X}", vk),
        },
    }
}

/// Parses a key name into a virtual key code.
pub fn key_name_to_vk(key_name: &str) -> Option<u32> {
    let key = key_name.to_ascii_uppercase();

    // letter and number keys
    if key.len() == 1
        && let Some(c) = key.chars().next()
        && (c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Some(c as u32);
    }

    // F1-F24
    if let Some(rest) = key.strip_prefix('F')
        && let Ok(num) = rest.parse::<u32>()
        && (1..=24).contains(&num)
    {
        return Some(0x70 + num - 1);
    }

    // Numpad keys
    if let Some(rest) = key.strip_prefix("NUMPAD")
        && let Ok(num) = rest.parse::<u32>()
        && num <= 9
    {
        return Some(0x60 + num);
    }

    if let Some(hex) = key.strip_prefix("VK_") {
        return u32::from_str_radix(hex, 16).ok();
    }

    NAME_TO_VK.get(key.as_str()).copied()
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            KeyCode::Keyboard(vk) => f.write_str(&vk_to_key_name(vk)),
            KeyCode::Mouse(button) => write!(f, "MOUSE{}", button),
            KeyCode::JoystickButton {
                joystick: 0,
                button,
            } => write!(f, "JOYSTICK_BUTTON{}", button),
            KeyCode::JoystickButton { joystick, button } => {
                write!(f, "JOY{}_BUTTON{}", joystick, button)
            }
        }
    }
}

/// Error returned when a key name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name `{0}`")]
pub struct UnknownKeyName(pub String);

impl FromStr for KeyCode {
    type Err = UnknownKeyName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        let unknown = || UnknownKeyName(s.to_string());

        if let Some(&(_, code)) = KEY_ALIASES.iter().find(|(alias, _)| *alias == name) {
            return Ok(code);
        }

        if let Some(rest) = name.strip_prefix("MOUSE")
            && let Ok(button) = rest.parse::<u8>()
        {
            return if button < MOUSE_BUTTON_COUNT {
                Ok(KeyCode::Mouse(button))
            } else {
                Err(unknown())
            };
        }

        if let Some(rest) = name.strip_prefix("JOYSTICK_BUTTON") {
            let button = rest.parse::<u8>().map_err(|_| unknown())?;
            if button >= MAX_JOYSTICK_BUTTONS {
                return Err(unknown());
            }
            return Ok(KeyCode::JoystickButton {
                joystick: 0,
                button,
            });
        }

        if let Some(rest) = name.strip_prefix("JOY")
            && let Some((joystick, button)) = rest.split_once("_BUTTON")
        {
            let joystick = joystick.parse::<u8>().map_err(|_| unknown())?;
            let button = button.parse::<u8>().map_err(|_| unknown())?;
            if joystick == 0 || joystick > MAX_JOYSTICKS || button >= MAX_JOYSTICK_BUTTONS {
                return Err(unknown());
            }
            return Ok(KeyCode::JoystickButton { joystick, button });
        }

        key_name_to_vk(&name)
            .map(KeyCode::Keyboard)
            .ok_or_else(unknown)
    }
}

impl Serialize for KeyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
