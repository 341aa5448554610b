//! Boot-protocol keyboard report and a US-layout ASCII table.
//!
//! ```text
//! Byte 0:   modifiers (LCtrl LShift LAlt LGUI RCtrl RShift RAlt RGUI, bit 0 first)
//! Byte 1:   reserved, always 0
//! Byte 2-7: up to six pressed usages
//! ```
//!
//! The host answers with a one-byte LED output report (num, caps, scroll,
//! compose, kana); it reaches the application through
//! [`HidReportHandler::set_report`](super::HidReportHandler::set_report).

pub const KEYBOARD_REPORT_SIZE: usize = 8;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8,
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    /// All keys released.
    pub const fn empty() -> Self {
        Self {
            modifier: 0,
            keycodes: [0; 6],
        }
    }

    pub const fn single(modifier: u8, keycode: u8) -> Self {
        Self {
            modifier,
            keycodes: [keycode, 0, 0, 0, 0, 0],
        }
    }

    pub fn to_bytes(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        let mut out = [0u8; KEYBOARD_REPORT_SIZE];
        out[0] = self.modifier;
        out[2..].copy_from_slice(&self.keycodes);
        out
    }

    /// Copy the report into `buf`; 0 when `buf` is too short.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match buf.get_mut(..KEYBOARD_REPORT_SIZE) {
            Some(dst) => {
                dst.copy_from_slice(&self.to_bytes());
                KEYBOARD_REPORT_SIZE
            }
            None => 0,
        }
    }
}

pub const MODIFIER_LEFT_CTRL: u8 = 1 << 0;
pub const MODIFIER_LEFT_SHIFT: u8 = 1 << 1;
pub const MODIFIER_LEFT_ALT: u8 = 1 << 2;
pub const MODIFIER_LEFT_GUI: u8 = 1 << 3;
pub const MODIFIER_RIGHT_CTRL: u8 = 1 << 4;
pub const MODIFIER_RIGHT_SHIFT: u8 = 1 << 5;
pub const MODIFIER_RIGHT_ALT: u8 = 1 << 6;
pub const MODIFIER_RIGHT_GUI: u8 = 1 << 7;

// ASCII to usage code (US layout)

/// Map a character to `(modifier, keycode)` on a US keyboard.
///
/// Returns `None` for anything outside printable ASCII plus the few
/// control characters that have a dedicated key.
pub fn ascii_to_keycode(ch: char) -> Option<(u8, u8)> {
    const SHIFT: u8 = MODIFIER_LEFT_SHIFT;

    let code = match ch {
        'a'..='z' => (0, 0x04 + (ch as u8 - b'a')),
        'A'..='Z' => (SHIFT, 0x04 + (ch as u8 - b'A')),
        '1'..='9' => (0, 0x1E + (ch as u8 - b'1')),
        '0' => (0, 0x27),

        '!' => (SHIFT, 0x1E),
        '@' => (SHIFT, 0x1F),
        '#' => (SHIFT, 0x20),
        '$' => (SHIFT, 0x21),
        '%' => (SHIFT, 0x22),
        '^' => (SHIFT, 0x23),
        '&' => (SHIFT, 0x24),
        '*' => (SHIFT, 0x25),
        '(' => (SHIFT, 0x26),
        ')' => (SHIFT, 0x27),

        '\r' | '\n' => (0, 0x28), // Enter
        '\x1B' => (0, 0x29),       // Escape
        '\x08' => (0, 0x2A),       // Backspace
        '\t' => (0, 0x2B),
        ' ' => (0, 0x2C),

        '-' => (0, 0x2D),
        '_' => (SHIFT, 0x2D),
        '=' => (0, 0x2E),
        '+' => (SHIFT, 0x2E),
        '[' => (0, 0x2F),
        '{' => (SHIFT, 0x2F),
        ']' => (0, 0x30),
        '}' => (SHIFT, 0x30),
        '\\' => (0, 0x31),
        '|' => (SHIFT, 0x31),
        ';' => (0, 0x33),
        ':' => (SHIFT, 0x33),
        '\'' => (0, 0x34),
        '"' => (SHIFT, 0x34),
        '`' => (0, 0x35),
        '~' => (SHIFT, 0x35),
        ',' => (0, 0x36),
        '<' => (SHIFT, 0x36),
        '.' => (0, 0x37),
        '>' => (SHIFT, 0x37),
        '/' => (0, 0x38),
        '?' => (SHIFT, 0x38),

        '\x7F' => (0, 0x4C), // Delete
        _ => return None,
    };
    Some(code)
}

/// Report descriptor matching [`KeyboardReport`] plus the LED output byte.
pub const KEYBOARD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x08, //   Report Count (8)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Var, Abs)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Const)
    0x05, 0x08, //   Usage Page (LED)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Var, Abs)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Const)
    0x05, 0x07, //   Usage Page (Keyboard)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x00, //   Usage Maximum (255)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x00, //   Input (Data, Array, Abs)
    0xC0, // End Collection
];
