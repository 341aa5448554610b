//! Two-pass configuration descriptor composition.
//!
//! Pass 1 runs every provider against a measuring writer to learn each
//! block's length and the identifiers it takes. Only when the whole
//! configuration fits does pass 2 run, with each provider confined to
//! exactly the slice it declared.

use crate::config::MAX_PROVIDERS;
use crate::descriptor::standard::ConfigurationDescriptor;
use crate::descriptor::DescriptorWriter;
use crate::error::{Error, Resource};
use crate::usb::allocator::{AllocatorState, EndpointPolicy, ResourceAllocator};
use crate::usb::registry::InterfaceProvider;
use heapless::Vec;

/// Fields of the configuration header that are not derived from the
/// providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigAttributes {
    pub attributes: u8,
    pub max_power_ma: u16,
}

/// Outcome of a successful composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composition {
    /// Total configuration length including the header.
    pub len: usize,
    pub interfaces: u8,
}

struct Declared {
    len: usize,
    after: AllocatorState,
}

/// Compose `providers` into `buf`.
///
/// On `DescriptorOverflow` (and on any pass-1 failure) `buf` is left
/// untouched.
pub fn compose(
    providers: &[&dyn InterfaceProvider],
    policy: EndpointPolicy,
    attrs: ConfigAttributes,
    buf: &mut [u8],
) -> Result<Composition, Error> {
    let mut alloc = ResourceAllocator::new(policy);
    let mut declared: Vec<Declared, MAX_PROVIDERS> = Vec::new();

    // Pass 1: lengths and identifier usage.
    let mut total = ConfigurationDescriptor::LEN;
    for provider in providers {
        let mut out = DescriptorWriter::measure();
        provider.write_descriptor(&mut alloc, &mut out)?;
        total += out.len();
        declared
            .push(Declared {
                len: out.len(),
                after: alloc.state(),
            })
            .map_err(|_| Error::ResourceExhausted(Resource::Provider))?;
    }

    if total > buf.len() || total > u16::MAX as usize {
        return Err(Error::DescriptorOverflow {
            required: total,
            capacity: buf.len().min(u16::MAX as usize),
        });
    }

    // Pass 2: fill.
    alloc.reset();
    let (header, mut body) = buf[..total].split_at_mut(ConfigurationDescriptor::LEN);
    for (index, (provider, decl)) in providers.iter().zip(declared.iter()).enumerate() {
        let (slot, rest) = core::mem::take(&mut body).split_at_mut(decl.len);
        body = rest;

        let mut out = DescriptorWriter::new(slot);
        let written = match provider.write_descriptor(&mut alloc, &mut out) {
            Ok(()) => out.len(),
            Err(Error::DescriptorOverflow { required, .. }) => required,
            Err(e) => return Err(e),
        };

        if written != decl.len || alloc.state() != decl.after {
            return Err(Error::ProviderMismatch {
                index,
                declared: decl.len,
                written,
            });
        }
    }

    let interfaces = alloc.interface_count();
    let config = ConfigurationDescriptor {
        total_length: total as u16,
        num_interfaces: interfaces,
        configuration_value: 1,
        configuration: 0,
        attributes: attrs.attributes,
        max_power: (attrs.max_power_ma / 2).min(u8::MAX as u16) as u8,
    };
    header.copy_from_slice(&config.to_bytes());

    Ok(Composition {
        len: total,
        interfaces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::allocator::Direction;
    use core::cell::Cell;

    const ATTRS: ConfigAttributes = ConfigAttributes {
        attributes: ConfigurationDescriptor::ATTR_BUS_POWERED
            | ConfigurationDescriptor::ATTR_REMOTE_WAKEUP,
        max_power_ma: 100,
    };

    /// One interface, one IN endpoint, and `len` bytes of payload.
    struct Block {
        len: usize,
    }

    impl InterfaceProvider for Block {
        fn write_descriptor(
            &self,
            alloc: &mut ResourceAllocator,
            out: &mut DescriptorWriter<'_>,
        ) -> Result<(), Error> {
            let itf = alloc.alloc_interfaces(1)?;
            let ep = alloc.alloc_endpoint(Direction::In)?;
            out.write(&[itf, ep.raw()])?;
            for _ in 2..self.len {
                out.write_u8(0xEE)?;
            }
            Ok(())
        }
    }

    /// Writes one more byte on every call after the first.
    struct Growing {
        calls: Cell<usize>,
    }

    impl InterfaceProvider for Growing {
        fn write_descriptor(
            &self,
            _alloc: &mut ResourceAllocator,
            out: &mut DescriptorWriter<'_>,
        ) -> Result<(), Error> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            for _ in 0..=n {
                out.write_u8(0)?;
            }
            Ok(())
        }
    }

    /// Allocates an extra endpoint in the fill pass only.
    struct GreedyOnFill;

    impl InterfaceProvider for GreedyOnFill {
        fn write_descriptor(
            &self,
            alloc: &mut ResourceAllocator,
            out: &mut DescriptorWriter<'_>,
        ) -> Result<(), Error> {
            if !out.is_measuring() {
                alloc.alloc_endpoint(Direction::Out)?;
            }
            out.write(&[1, 2])
        }
    }

    #[test]
    fn empty_configuration_is_header_only() {
        let mut buf = [0u8; 16];
        let c = compose(&[], EndpointPolicy::DEFAULT, ATTRS, &mut buf).unwrap();
        assert_eq!(c, Composition { len: 9, interfaces: 0 });
        assert_eq!(&buf[..9], &[9, 2, 9, 0, 0, 1, 0, 0xA0, 50]);
    }

    #[test]
    fn providers_are_laid_out_in_registration_order() {
        let a = Block { len: 4 };
        let b = Block { len: 3 };
        let mut buf = [0u8; 32];
        let c = compose(&[&a, &b], EndpointPolicy::DEFAULT, ATTRS, &mut buf).unwrap();
        assert_eq!(c.len, 16);
        assert_eq!(c.interfaces, 2);
        assert_eq!(&buf[2..4], &[16, 0]);
        assert_eq!(buf[4], 2);
        assert_eq!(&buf[9..16], &[0, 0x81, 0xEE, 0xEE, 1, 0x82, 0xEE]);
    }

    #[test]
    fn overflow_leaves_buffer_untouched() {
        let a = Block { len: 20 };
        let mut buf = [0x55u8; 16];
        let err = compose(&[&a], EndpointPolicy::DEFAULT, ATTRS, &mut buf).unwrap_err();
        assert_eq!(
            err,
            Error::DescriptorOverflow {
                required: 29,
                capacity: 16
            }
        );
        assert!(buf.iter().all(|&b| b == 0x55));
    }

    #[test]
    fn exhausted_endpoints_abort_composition() {
        let providers = [Block { len: 2 }, Block { len: 2 }, Block { len: 2 }];
        let policy = EndpointPolicy {
            max_in: 2,
            max_out: 2,
            reserved: &[],
        };
        let list: [&dyn InterfaceProvider; 3] = [&providers[0], &providers[1], &providers[2]];
        let mut buf = [0u8; 64];
        assert_eq!(
            compose(&list, policy, ATTRS, &mut buf),
            Err(Error::ResourceExhausted(Resource::EndpointIn))
        );
    }

    #[test]
    fn length_disagreement_is_reported() {
        let ok = Block { len: 2 };
        let bad = Growing {
            calls: Cell::new(0),
        };
        let mut buf = [0u8; 32];
        let err = compose(&[&ok, &bad], EndpointPolicy::DEFAULT, ATTRS, &mut buf).unwrap_err();
        assert_eq!(
            err,
            Error::ProviderMismatch {
                index: 1,
                declared: 1,
                written: 2
            }
        );
    }

    #[test]
    fn allocation_disagreement_is_reported() {
        let mut buf = [0u8; 32];
        let err = compose(&[&GreedyOnFill], EndpointPolicy::DEFAULT, ATTRS, &mut buf).unwrap_err();
        assert_eq!(
            err,
            Error::ProviderMismatch {
                index: 0,
                declared: 2,
                written: 2
            }
        );
    }

    #[test]
    fn recomposition_restarts_counters() {
        let a = Block { len: 2 };
        let mut first = [0u8; 16];
        let mut second = [0u8; 16];
        compose(&[&a], EndpointPolicy::DEFAULT, ATTRS, &mut first).unwrap();
        compose(&[&a], EndpointPolicy::DEFAULT, ATTRS, &mut second).unwrap();
        assert_eq!(first, second);
    }
}
