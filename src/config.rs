//! Crate-wide constants and compile-time configuration.
//!
//! Descriptor defaults, table capacities, and protocol constants live
//! here so they can be tuned in one place.

// USB device

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;

/// bcdUSB reported in the device descriptor (USB 2.0).
pub const USB_BCD: u16 = 0x0200;

/// bcdDevice reported in the device descriptor.
pub const DEVICE_BCD: u16 = 0x0100;

/// Default string descriptor language (English - United States).
pub const LANGUAGE_ID: u16 = 0x0409;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "usbd-composite";
pub const USB_PRODUCT: &str = "Composite USB Device";

/// Maximum bus current drawn in the configured state (mA).
pub const USB_MAX_POWER_MA: u16 = 100;

/// Control endpoint 0 packet size.
pub const EP0_SIZE: u8 = 64;

// Configuration descriptor

/// Built-in configuration descriptor buffer size.
/// Supply a larger buffer with `set_configuration_buffer` if needed.
pub const CONFIG_DESC_BUFFER_SIZE: usize = 256;

/// Maximum interface number count in one configuration.
pub const MAX_INTERFACES: u8 = 16;

/// Maximum number of registered interface providers.
pub const MAX_PROVIDERS: usize = 8;

/// Highest endpoint number per direction (endpoint 0 is control).
pub const MAX_ENDPOINT_NUMBER: u8 = 15;

// String descriptors

/// String table capacity including the language, manufacturer,
/// product and serial slots.
pub const STRING_DESCRIPTOR_MAX: usize = 12;

/// Strings are truncated to this many UTF-16 code units.
pub const STRING_DESCRIPTOR_MAX_CHARS: usize = 32;

/// Bytes of platform unique id rendered as the fallback serial string.
pub const SERIAL_ID_MAX_BYTES: usize = 16;

// CDC serial

/// Number of CDC instances the protocol engine is built for.
pub const CDC_INSTANCE_MAX: u8 = 2;

/// CDC notification endpoint size.
pub const CDC_NOTIF_EP_SIZE: u16 = 8;

/// CDC data endpoint size.
pub const CDC_EP_SIZE: u16 = 64;

/// Interface name registered by `SerialPort::begin`.
pub const CDC_INTERFACE_NAME: &str = "USB Serial";

/// A host dropping DTR while the line is at this baud rate asks the
/// device to reboot into its firmware-update loader.
pub const TOUCH_1200_BAUD: u32 = 1200;

// Bulk endpoints (MIDI, MSC, vendor, video)

/// Bulk endpoint size (full speed).
pub const BULK_PACKET_SIZE: u16 = 64;

// MIDI

/// Maximum number of virtual cables on one MIDI interface.
pub const MIDI_CABLE_MAX: u8 = 8;

// Mass storage

/// Logical units one mass-storage interface can expose.
pub const MSC_LUN_MAX: u8 = 2;

// HID

/// Default HID interrupt polling interval (ms).
pub const HID_POLL_MS: u8 = 10;

/// HID interrupt endpoint size.
pub const HID_EP_SIZE: u16 = 16;

// Task

/// Period of the timer that pumps the protocol engine (µs).
pub const USB_TASK_INTERVAL_US: u32 = 1000;
