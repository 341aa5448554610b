//! Unified error type for usbd-composite.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

use core::fmt;

/// Identifier table that ran out of room during allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// Interface numbers.
    Interface,
    /// Device-to-host endpoint addresses.
    EndpointIn,
    /// Host-to-device endpoint addresses.
    EndpointOut,
    /// String descriptor table.
    String,
    /// Interface registry slots.
    Provider,
    /// CDC instance slots.
    CdcInstance,
}

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Allocation
    /// An identifier table is full. Recoverable by registering fewer
    /// interfaces.
    ResourceExhausted(Resource),

    // Composition
    /// The configuration does not fit in the descriptor buffer.
    DescriptorOverflow {
        /// Bytes the composition needs.
        required: usize,
        /// Bytes the buffer can hold.
        capacity: usize,
    },

    /// A provider wrote a different number of bytes (or requested a
    /// different set of identifiers) in the fill pass than it declared in
    /// the length pass.
    ProviderMismatch {
        /// Registration index of the offending provider.
        index: usize,
        /// Length reported by the length pass.
        declared: usize,
        /// Length produced by the fill pass.
        written: usize,
    },

    // Generic
    /// Argument outside the accepted range.
    InvalidArgument,

    // Host-controller bridge
    /// SPI bus transfer failed.
    Spi,

    /// GPIO pin could not be driven.
    Pin,
}

impl From<Resource> for Error {
    fn from(r: Resource) -> Self {
        Error::ResourceExhausted(r)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Interface => "interface",
            Resource::EndpointIn => "IN endpoint",
            Resource::EndpointOut => "OUT endpoint",
            Resource::String => "string descriptor",
            Resource::Provider => "interface provider",
            Resource::CdcInstance => "CDC instance",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ResourceExhausted(r) => write!(f, "{} table exhausted", r),
            Error::DescriptorOverflow { required, capacity } => write!(
                f,
                "configuration needs {} bytes, buffer holds {}",
                required, capacity
            ),
            Error::ProviderMismatch {
                index,
                declared,
                written,
            } => write!(
                f,
                "provider {} declared {} bytes but wrote {}",
                index, declared, written
            ),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::Spi => f.write_str("SPI transfer failed"),
            Error::Pin => f.write_str("GPIO pin error"),
        }
    }
}
