//! Relative mouse report with vertical wheel and horizontal pan.
//!
//! ```text
//! Byte 0: buttons (bit 0 left, 1 right, 2 middle, 3 back, 4 forward)
//! Byte 1: X      (i8)
//! Byte 2: Y      (i8)
//! Byte 3: wheel  (i8)
//! Byte 4: pan    (i8, Consumer page AC Pan)
//! ```
//!
//! The first three bytes match the boot-protocol mouse, so a BIOS that
//! only reads the boot layout still sees buttons and motion.

pub const MOUSE_REPORT_SIZE: usize = 5;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
    pub pan: i8,
}

impl MouseReport {
    pub const BUTTON_LEFT: u8 = 1 << 0;
    pub const BUTTON_RIGHT: u8 = 1 << 1;
    pub const BUTTON_MIDDLE: u8 = 1 << 2;
    pub const BUTTON_BACKWARD: u8 = 1 << 3;
    pub const BUTTON_FORWARD: u8 = 1 << 4;

    pub fn to_bytes(&self) -> [u8; MOUSE_REPORT_SIZE] {
        [
            self.buttons,
            self.x as u8,
            self.y as u8,
            self.wheel as u8,
            self.pan as u8,
        ]
    }

    /// Copy the report into `buf`; 0 when `buf` is too short.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match buf.get_mut(..MOUSE_REPORT_SIZE) {
            Some(dst) => {
                dst.copy_from_slice(&self.to_bytes());
                MOUSE_REPORT_SIZE
            }
            None => 0,
        }
    }
}

/// Report descriptor matching [`MouseReport`].
pub const MOUSE_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x05, //     Usage Maximum (5)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x05, //     Report Count (5)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Var, Abs)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x03, //     Report Size (3)
    0x81, 0x01, //     Input (Const)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x06, //     Input (Data, Var, Rel)
    0x05, 0x0C, //     Usage Page (Consumer)
    0x0A, 0x38, 0x02, //     Usage (AC Pan)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x06, //     Input (Data, Var, Rel)
    0xC0, //   End Collection
    0xC0, // End Collection
];
