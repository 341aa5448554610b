//! Vendor-specific interface with one bulk endpoint pair.
//!
//! Typical use is a WebUSB or libusb channel. The data path is the
//! engine's vendor FIFO, exposed here as a plain byte stream.

use core::cell::Cell;

use crate::config::BULK_PACKET_SIZE;
use crate::descriptor::standard::{EndpointDescriptor, InterfaceDescriptor};
use crate::descriptor::{DescriptorWriter, CLASS_VENDOR};
use crate::error::Error;
use crate::usb::allocator::{Direction, ResourceAllocator};
use crate::usb::{InterfaceProvider, UsbDevice};

/// Vendor side of the external protocol engine.
pub trait VendorTransport {
    fn mounted(&self) -> bool;
    fn available(&self) -> usize;
    fn read(&self, buf: &mut [u8]) -> usize;
    fn write(&self, buf: &[u8]) -> usize;
    fn write_flush(&self);
}

pub struct VendorInterface<'a, T: VendorTransport> {
    transport: &'a T,
    string_index: Cell<u8>,
}

impl<'a, T: VendorTransport> VendorInterface<'a, T> {
    pub const fn new(transport: &'a T) -> Self {
        Self {
            transport,
            string_index: Cell::new(0),
        }
    }

    pub fn set_interface_name(&self, device: &mut UsbDevice<'a>, name: &'a str) -> bool {
        let strid = device.add_string_descriptor(name);
        self.string_index.set(strid);
        device.invalidate_configuration();
        strid > 0
    }

    pub fn begin(&'a self, device: &mut UsbDevice<'a>) -> bool {
        match device.add_interface(self) {
            Ok(()) => true,
            Err(e) => {
                warn!("vendor begin: {}", e);
                false
            }
        }
    }

    pub fn mounted(&self) -> bool {
        self.transport.mounted()
    }

    pub fn available(&self) -> usize {
        self.transport.available()
    }

    pub fn read(&self, buf: &mut [u8]) -> usize {
        self.transport.read(buf)
    }

    /// Queue `data` and push out the partial packet. Returns bytes taken;
    /// nothing is sent while the host has not configured the device.
    pub fn write(&self, data: &[u8]) -> usize {
        if !self.transport.mounted() {
            return 0;
        }
        let n = self.transport.write(data);
        self.transport.write_flush();
        n
    }
}

impl<T: VendorTransport> InterfaceProvider for VendorInterface<'_, T> {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error> {
        let itf = alloc.alloc_interfaces(1)?;
        let ep_out = alloc.alloc_endpoint(Direction::Out)?;
        let ep_in = alloc.alloc_endpoint(Direction::In)?;

        out.write(
            &InterfaceDescriptor {
                interface_number: itf,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: CLASS_VENDOR,
                interface_subclass: 0,
                interface_protocol: 0,
                interface: self.string_index.get(),
            }
            .to_bytes(),
        )?;
        out.write(&EndpointDescriptor::bulk(ep_out.raw(), BULK_PACKET_SIZE).to_bytes())?;
        out.write(&EndpointDescriptor::bulk(ep_in.raw(), BULK_PACKET_SIZE).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::vec::Vec;

    #[derive(Default)]
    struct Loopback {
        mounted: Cell<bool>,
        fifo: RefCell<Vec<u8>>,
        flushes: Cell<usize>,
    }

    impl VendorTransport for Loopback {
        fn mounted(&self) -> bool {
            self.mounted.get()
        }
        fn available(&self) -> usize {
            self.fifo.borrow().len()
        }
        fn read(&self, buf: &mut [u8]) -> usize {
            let mut fifo = self.fifo.borrow_mut();
            let n = buf.len().min(fifo.len());
            buf[..n].copy_from_slice(&fifo[..n]);
            fifo.drain(..n);
            n
        }
        fn write(&self, buf: &[u8]) -> usize {
            self.fifo.borrow_mut().extend_from_slice(buf);
            buf.len()
        }
        fn write_flush(&self) {
            self.flushes.set(self.flushes.get() + 1);
        }
    }

    #[test]
    fn descriptor_bytes() {
        let link = Loopback::default();
        let vendor = VendorInterface::new(&link);
        let mut alloc = ResourceAllocator::new(Default::default());
        let mut buf = [0u8; 23];
        let mut out = DescriptorWriter::new(&mut buf);
        vendor.write_descriptor(&mut alloc, &mut out).unwrap();

        #[rustfmt::skip]
        let expected: [u8; 23] = [
            9, 4, 0, 0, 2, 0xFF, 0, 0, 0,
            7, 5, 0x01, 2, 64, 0, 0,
            7, 5, 0x81, 2, 64, 0, 0,
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn write_needs_a_mounted_device() {
        let link = Loopback::default();
        let vendor = VendorInterface::new(&link);
        assert_eq!(vendor.write(b"ping"), 0);

        link.mounted.set(true);
        assert_eq!(vendor.write(b"ping"), 4);
        assert_eq!(link.flushes.get(), 1);
        assert_eq!(vendor.available(), 4);

        let mut buf = [0u8; 8];
        assert_eq!(vendor.read(&mut buf), 4);
        assert_eq!(&buf[..4], b"ping");
    }
}
