//! Interface providers and the ordered registry that holds them.

use crate::config::MAX_PROVIDERS;
use crate::descriptor::DescriptorWriter;
use crate::error::{Error, Resource};
use crate::usb::allocator::{EndpointPolicy, ResourceAllocator};
use heapless::Vec;

/// Anything that contributes a block of interface descriptors to the
/// configuration (CDC, MIDI, HID, mass storage, vendor, video).
///
/// `write_descriptor` runs twice per composition: once with a measuring
/// writer and once with the real buffer. It must request the same
/// identifiers from `alloc`, in the same order, and emit the same number
/// of bytes both times.
pub trait InterfaceProvider {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error>;

    /// Length of this provider's descriptor block on its own.
    fn descriptor_len(&self) -> Result<usize, Error> {
        let mut alloc = ResourceAllocator::new(EndpointPolicy::DEFAULT);
        let mut out = DescriptorWriter::measure();
        self.write_descriptor(&mut alloc, &mut out)?;
        Ok(out.len())
    }
}

/// Provider identity is its address. Zero-sized providers may all sit at
/// the same address, so for them the vtable has to match as well; two
/// zero-sized values of the same type remain indistinguishable.
#[allow(ambiguous_wide_pointer_comparisons)]
fn same_provider(a: &dyn InterfaceProvider, b: &dyn InterfaceProvider) -> bool {
    if core::mem::size_of_val(a) == 0 {
        core::ptr::eq(a, b)
    } else {
        core::ptr::addr_eq(a, b)
    }
}

/// Providers in registration order. Order decides interface numbering.
#[derive(Default)]
pub struct InterfaceRegistry<'a> {
    providers: Vec<&'a dyn InterfaceProvider, MAX_PROVIDERS>,
}

impl<'a> InterfaceRegistry<'a> {
    pub const fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append `provider`. Registering the same provider twice is a no-op.
    pub fn add(&mut self, provider: &'a dyn InterfaceProvider) -> Result<(), Error> {
        if self.contains(provider) {
            return Ok(());
        }
        self.providers
            .push(provider)
            .map_err(|_| Error::ResourceExhausted(Resource::Provider))
    }

    /// Remove `provider`, keeping the order of the others.
    pub fn remove(&mut self, provider: &dyn InterfaceProvider) -> bool {
        match self
            .providers
            .iter()
            .position(|p| same_provider(*p, provider))
        {
            Some(at) => {
                self.providers.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, provider: &dyn InterfaceProvider) -> bool {
        self.providers.iter().any(|p| same_provider(*p, provider))
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn as_slice(&self) -> &[&'a dyn InterfaceProvider] {
        &self.providers
    }
}
