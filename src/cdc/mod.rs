//! CDC-ACM serial port.
//!
//! [`SerialPort`] adapts one CDC instance of the protocol engine to a
//! byte-stream API. The engine owns the FIFOs; this layer only adds
//! connection gating, cooperative yielding while the host is slow, and
//! the 1200 baud "touch" that reboots into the firmware-update loader.


use core::cell::Cell;
use core::fmt;

use crate::config::{CDC_EP_SIZE, CDC_INTERFACE_NAME, CDC_NOTIF_EP_SIZE, TOUCH_1200_BAUD};
use crate::descriptor::standard::{
    EndpointDescriptor, InterfaceAssociationDescriptor, InterfaceDescriptor,
};
use crate::descriptor::{le16, DescriptorWriter, CLASS_CDC, CLASS_CDC_DATA, DESC_CS_INTERFACE};
use crate::error::{Error, Resource};
use crate::port::Port;
use crate::task::Scheduler;
use crate::usb::allocator::{Direction, ResourceAllocator};
use crate::usb::{InterfaceProvider, UsbDevice};

/// Abstract Control Model subclass.
const SUBCLASS_ACM: u8 = 0x02;

/// bcdCDC 1.20.
const CDC_VERSION: u16 = 0x0120;

// Functional descriptor subtypes.
const FUNC_HEADER: u8 = 0x00;
const FUNC_CALL_MANAGEMENT: u8 = 0x01;
const FUNC_ACM: u8 = 0x02;
const FUNC_UNION: u8 = 0x06;

/// Notification endpoint polling interval (ms).
const NOTIF_INTERVAL: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

/// Line coding set by the host (SET_LINE_CODING).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCoding {
    pub baud: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub data_bits: u8,
}

impl Default for LineCoding {
    fn default() -> Self {
        Self {
            baud: 115_200,
            stop_bits: StopBits::One,
            parity: Parity::None,
            data_bits: 8,
        }
    }
}

/// Control line state set by the host (SET_CONTROL_LINE_STATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineState {
    pub dtr: bool,
    pub rts: bool,
}

/// CDC side of the external protocol engine, addressed by instance.
pub trait CdcTransport {
    /// Host has asserted DTR.
    fn connected(&self, instance: u8) -> bool;
    /// Bytes waiting in the receive FIFO.
    fn available(&self, instance: u8) -> usize;
    fn read(&self, instance: u8, buf: &mut [u8]) -> usize;
    fn peek(&self, instance: u8) -> Option<u8>;
    /// Queue bytes for transmission; returns how many were accepted.
    fn write(&self, instance: u8, buf: &[u8]) -> usize;
    /// Free space in the transmit FIFO.
    fn write_available(&self, instance: u8) -> usize;
    fn write_flush(&self, instance: u8);
    fn line_coding(&self, instance: u8) -> LineCoding;
    fn line_state(&self, instance: u8) -> LineState;
}

/// Flush the transmit FIFO of the first `instances` CDC ports.
pub fn flush_all<T: CdcTransport>(transport: &T, instances: u8) {
    for instance in 0..instances {
        transport.write_flush(instance);
    }
}

pub struct SerialPort<'a, T: CdcTransport, S: Scheduler> {
    transport: &'a T,
    scheduler: &'a S,
    instance: Cell<Option<u8>>,
    string_index: Cell<u8>,
    last_dtr: Cell<bool>,
}

impl<'a, T: CdcTransport, S: Scheduler> SerialPort<'a, T, S> {
    pub const fn new(transport: &'a T, scheduler: &'a S) -> Self {
        Self {
            transport,
            scheduler,
            instance: Cell::new(None),
            string_index: Cell::new(0),
            last_dtr: Cell::new(false),
        }
    }

    /// Claim a CDC instance and register with `device`.
    ///
    /// Idempotent. When the instance budget or the registry is exhausted
    /// the port stays inert: every stream call returns 0 / `None`.
    pub fn begin(&'a self, device: &mut UsbDevice<'a>) -> bool {
        if self.instance.get().is_some() {
            return true;
        }

        let Some(instance) = device.alloc_cdc_instance() else {
            warn!("serial begin: {}", Error::ResourceExhausted(Resource::CdcInstance));
            return false;
        };
        if self.string_index.get() == 0 {
            self.string_index
                .set(device.add_string_descriptor(CDC_INTERFACE_NAME));
        }
        if let Err(e) = device.add_interface(self) {
            warn!("serial begin: {}", e);
            device.release_cdc_instance(instance);
            return false;
        }

        self.instance.set(Some(instance));
        debug!("serial port begun as CDC instance {}", instance);
        true
    }

    /// Unregister and give the instance slot back. The configuration is
    /// recomposed on the next host request.
    pub fn end(&self, device: &mut UsbDevice<'_>) {
        if let Some(instance) = self.instance.take() {
            device.remove_interface(self);
            device.release_cdc_instance(instance);
        }
    }

    pub fn instance(&self) -> Option<u8> {
        self.instance.get()
    }

    pub fn is_begun(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Host has the port open. Yields once when it does not, so a caller
    /// spinning on this keeps the device task running.
    pub fn connected(&self) -> bool {
        let connected = self
            .instance
            .get()
            .is_some_and(|i| self.transport.connected(i));
        if !connected {
            self.scheduler.yield_now();
        }
        connected
    }

    // Line coding / state

    pub fn line_coding(&self) -> LineCoding {
        self.instance
            .get()
            .map(|i| self.transport.line_coding(i))
            .unwrap_or_default()
    }

    pub fn baud(&self) -> u32 {
        self.line_coding().baud
    }

    pub fn stop_bits(&self) -> StopBits {
        self.line_coding().stop_bits
    }

    pub fn parity(&self) -> Parity {
        self.line_coding().parity
    }

    pub fn data_bits(&self) -> u8 {
        self.line_coding().data_bits
    }

    fn line_state(&self) -> LineState {
        self.instance
            .get()
            .map(|i| self.transport.line_state(i))
            .unwrap_or_default()
    }

    pub fn dtr(&self) -> bool {
        self.line_state().dtr
    }

    pub fn rts(&self) -> bool {
        self.line_state().rts
    }

    /// Line-state callback from the engine for this port's instance.
    ///
    /// A DTR drop on instance 0 while the line is at 1200 baud calls
    /// `port.enter_dfu()`. Returns `true` when it did.
    pub fn line_state_changed<P: Port>(&self, dtr: bool, _rts: bool, port: &P) -> bool {
        let was_dtr = self.last_dtr.replace(dtr);
        if dtr || !was_dtr || self.instance.get() != Some(0) {
            return false;
        }
        if self.baud() != TOUCH_1200_BAUD {
            return false;
        }

        info!("1200 baud touch, entering firmware update");
        port.enter_dfu();
        true
    }

    // Receive

    /// Bytes ready to read. Yields once when there are none.
    pub fn available(&self) -> usize {
        let n = self
            .instance
            .get()
            .map_or(0, |i| self.transport.available(i));
        if n == 0 {
            self.scheduler.yield_now();
        }
        n
    }

    pub fn peek(&self) -> Option<u8> {
        self.transport.peek(self.instance.get()?)
    }

    pub fn read(&self) -> Option<u8> {
        let mut byte = [0u8; 1];
        (self.read_into(&mut byte) == 1).then_some(byte[0])
    }

    pub fn read_into(&self, buf: &mut [u8]) -> usize {
        self.instance
            .get()
            .map_or(0, |i| self.transport.read(i, buf))
    }

    // Transmit

    /// Queue `data`, yielding to the device task whenever the FIFO is
    /// full. Stops early if the host disconnects; the count written so far
    /// is returned and the rest is dropped.
    pub fn write(&self, data: &[u8]) -> usize {
        let Some(instance) = self.instance.get() else {
            return 0;
        };

        let mut remaining = data;
        while !remaining.is_empty() && self.transport.connected(instance) {
            let n = self.transport.write(instance, remaining);
            remaining = &remaining[n..];
            if !remaining.is_empty() {
                self.scheduler.yield_now();
            }
        }
        data.len() - remaining.len()
    }

    pub fn write_byte(&self, byte: u8) -> usize {
        self.write(&[byte])
    }

    pub fn available_for_write(&self) -> usize {
        self.instance
            .get()
            .map_or(0, |i| self.transport.write_available(i))
    }

    pub fn flush(&self) {
        if let Some(i) = self.instance.get() {
            self.transport.write_flush(i);
        }
    }
}

impl<T: CdcTransport, S: Scheduler> fmt::Write for &SerialPort<'_, T, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if (*self).write(s.as_bytes()) == s.len() {
            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}

impl<T: CdcTransport, S: Scheduler> InterfaceProvider for SerialPort<'_, T, S> {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error> {
        let itf = alloc.alloc_interfaces(2)?;
        let ep_notif = alloc.alloc_endpoint(Direction::In)?;
        let ep_out = alloc.alloc_endpoint(Direction::Out)?;
        let ep_in = alloc.alloc_endpoint(Direction::In)?;
        let data_itf = itf + 1;

        out.write(
            &InterfaceAssociationDescriptor {
                first_interface: itf,
                interface_count: 2,
                function_class: CLASS_CDC,
                function_subclass: SUBCLASS_ACM,
                function_protocol: 0,
                function: 0,
            }
            .to_bytes(),
        )?;

        // Communication interface
        out.write(
            &InterfaceDescriptor {
                interface_number: itf,
                alternate_setting: 0,
                num_endpoints: 1,
                interface_class: CLASS_CDC,
                interface_subclass: SUBCLASS_ACM,
                interface_protocol: 0,
                interface: self.string_index.get(),
            }
            .to_bytes(),
        )?;
        let version = le16(CDC_VERSION);
        out.write(&[5, DESC_CS_INTERFACE, FUNC_HEADER, version[0], version[1]])?;
        out.write(&[5, DESC_CS_INTERFACE, FUNC_CALL_MANAGEMENT, 0, data_itf])?;
        // Supports line coding and serial state notifications.
        out.write(&[4, DESC_CS_INTERFACE, FUNC_ACM, 0x02])?;
        out.write(&[5, DESC_CS_INTERFACE, FUNC_UNION, itf, data_itf])?;
        out.write(
            &EndpointDescriptor::interrupt(ep_notif.raw(), CDC_NOTIF_EP_SIZE, NOTIF_INTERVAL)
                .to_bytes(),
        )?;

        // Data interface
        out.write(
            &InterfaceDescriptor {
                interface_number: data_itf,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: CLASS_CDC_DATA,
                interface_subclass: 0,
                interface_protocol: 0,
                interface: 0,
            }
            .to_bytes(),
        )?;
        out.write(&EndpointDescriptor::bulk(ep_out.raw(), CDC_EP_SIZE).to_bytes())?;
        out.write(&EndpointDescriptor::bulk(ep_in.raw(), CDC_EP_SIZE).to_bytes())
    }
}
