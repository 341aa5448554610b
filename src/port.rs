//! Platform hooks the device core calls into.
//!
//! Each MCU family (nRF52, SAMD, RP2040, ESP32-S2/S3, CH32, ...) provides
//! one implementation. Only the firmware-update reboot is mandatory.

use crate::config::SERIAL_ID_MAX_BYTES;

pub trait Port {
    /// Bring up the USB peripheral on root hub port `rhport`.
    fn init_device(&self, _rhport: u8) {}

    /// Reboot into the firmware-update loader. Called when the host
    /// performs the 1200 baud touch on the first CDC port.
    fn enter_dfu(&self);

    /// Copy the chip's unique id into `serial_id` and return how many
    /// bytes are valid. Zero means the platform has no unique id.
    fn serial_number(&self, _serial_id: &mut [u8; SERIAL_ID_MAX_BYTES]) -> usize {
        0
    }
}
