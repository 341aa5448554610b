//! Consumer-control report: one 16-bit usage from page 0x0C.
//!
//! Usage 0 means "released". Common values are 0x00E9 volume up,
//! 0x00EA volume down, 0x00E2 mute and 0x00CD play/pause.

pub const CONSUMER_REPORT_SIZE: usize = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsumerReport {
    pub usage: u16,
}

impl ConsumerReport {
    /// Little-endian usage; 0 when `buf` is too short.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match buf.get_mut(..CONSUMER_REPORT_SIZE) {
            Some(dst) => {
                dst.copy_from_slice(&self.usage.to_le_bytes());
                CONSUMER_REPORT_SIZE
            }
            None => 0,
        }
    }
}

/// Report descriptor for a single array usage in 0..=0x3FF.
pub const CONSUMER_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x03, //   Logical Maximum (0x3FF)
    0x19, 0x00, //   Usage Minimum (0)
    0x2A, 0xFF, 0x03, //   Usage Maximum (0x3FF)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x10, //   Report Size (16)
    0x81, 0x00, //   Input (Data, Array, Abs)
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_is_little_endian() {
        let mut buf = [0u8; 2];
        assert_eq!(ConsumerReport { usage: 0x0223 }.serialize(&mut buf), 2);
        assert_eq!(buf, [0x23, 0x02]);
        assert_eq!(ConsumerReport::default().serialize(&mut [0u8; 1]), 0);
    }
}
