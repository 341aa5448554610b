//! usbd-composite: device-side USB composite configuration builder.
//!
//! Application code creates one [`usb::UsbDevice`], constructs the class
//! objects it needs (CDC serial, MIDI, HID, mass storage, vendor, video)
//! and calls `begin(&mut device)` on each. The device answers the host's
//! descriptor requests by composing every registered interface provider
//! into one configuration descriptor, numbering interfaces and endpoints
//! as it goes.
//!
//! The USB protocol engine itself (control transfers, FIFOs, the PHY) is
//! external. The class objects reach it through the small `*Transport`
//! traits, the platform through [`port::Port`], and the engine's periodic
//! work runs through [`task::DeviceTask`].
//!
//! The crate is `no_std`. Unit tests run on the host.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════════════════
// Device core
// ═══════════════════════════════════════════════════════════════════════════

pub mod descriptor;
pub mod port;
pub mod task;
pub mod usb;

// ═══════════════════════════════════════════════════════════════════════════
// Interface classes
// ═══════════════════════════════════════════════════════════════════════════

pub mod cdc;
pub mod hid;
pub mod midi;
pub mod msc;
pub mod vendor;
pub mod video;

// ═══════════════════════════════════════════════════════════════════════════
// Host mode
// ═══════════════════════════════════════════════════════════════════════════

pub mod host;

#[cfg(test)]
mod testing;

pub use error::{Error, Resource};
pub use usb::{InterfaceProvider, UsbDevice};
