//! USB device core - identifier allocation, interface registration, and
//! configuration descriptor composition.
//!
//! Class adapters (CDC, MIDI, HID, ...) implement [`InterfaceProvider`]
//! and register with a [`UsbDevice`]. Nothing is numbered at
//! registration time: interface numbers and endpoint addresses are handed
//! out by a fresh [`ResourceAllocator`] each time the configuration is
//! composed, in registration order.

pub mod allocator;
pub mod composer;
pub mod device;
pub mod registry;

pub use allocator::{Direction, EndpointAddress, EndpointPolicy, ResourceAllocator, StringTable};
pub use composer::{compose, Composition, ConfigAttributes};
pub use device::UsbDevice;
pub use registry::{InterfaceProvider, InterfaceRegistry};
