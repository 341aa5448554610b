//! HID interface provider and typed reports.
//!
//! The provider contributes one HID interface (interrupt IN, optionally
//! interrupt OUT) and forwards reports to the protocol engine through a
//! [`HidTransport`]. Keyboard, mouse and consumer-control helpers build
//! the standard boot-compatible report layouts. Host GET_REPORT and
//! SET_REPORT requests (control pipe or interrupt OUT) come back through
//! an optional [`HidReportHandler`].

pub mod consumer;
pub mod keyboard;
pub mod mouse;


use core::cell::Cell;

use crate::config::{HID_EP_SIZE, HID_POLL_MS};
use crate::descriptor::standard::{EndpointDescriptor, InterfaceDescriptor};
use crate::descriptor::{le16, DescriptorWriter, CLASS_HID, DESC_HID, DESC_HID_REPORT};
use crate::error::Error;
use crate::usb::allocator::{Direction, ResourceAllocator};
use crate::usb::{InterfaceProvider, UsbDevice};

use consumer::ConsumerReport;
use keyboard::KeyboardReport;
use mouse::MouseReport;

/// bcdHID 1.11.
const HID_VERSION: u16 = 0x0111;

/// Largest typed report (keyboard).
const MAX_TYPED_REPORT: usize = keyboard::KEYBOARD_REPORT_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
    Consumer(ConsumerReport),
}

impl HidReport {
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        match self {
            HidReport::Keyboard(r) => r.serialize(buf),
            HidReport::Mouse(r) => r.serialize(buf),
            HidReport::Consumer(r) => r.serialize(buf),
        }
    }
}

/// Boot interface protocol advertised in the interface descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BootProtocol {
    #[default]
    None = 0,
    Keyboard = 1,
    Mouse = 2,
}

/// HID side of the external protocol engine.
pub trait HidTransport {
    /// The IN endpoint can accept another report.
    fn ready(&self) -> bool;

    /// Queue `report`. A non-zero `report_id` is prepended by the engine.
    fn report(&self, report_id: u8, report: &[u8]) -> bool;
}

/// Report type from the high byte of a GET/SET_REPORT `wValue`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ReportType {
    Invalid = 0,
    Input = 1,
    Output = 2,
    Feature = 3,
}

impl From<u8> for ReportType {
    fn from(raw: u8) -> Self {
        match raw {
            1 => ReportType::Input,
            2 => ReportType::Output,
            3 => ReportType::Feature,
            _ => ReportType::Invalid,
        }
    }
}

/// Application side of host-initiated report transfers.
pub trait HidReportHandler {
    /// Fill `buf` for a GET_REPORT request and return the length used.
    /// Returning 0 makes the engine stall the request.
    fn get_report(&self, report_id: u8, report_type: ReportType, buf: &mut [u8]) -> usize;

    /// A SET_REPORT request or an interrupt OUT report arrived. OUT
    /// endpoint data is delivered as [`ReportType::Output`] with
    /// `report_id` 0 when the descriptor uses no report ids.
    fn set_report(&self, report_id: u8, report_type: ReportType, data: &[u8]);
}

pub struct HidInterface<'a, T: HidTransport> {
    transport: &'a T,
    handler: Option<&'a dyn HidReportHandler>,
    report_descriptor: &'a [u8],
    protocol: BootProtocol,
    poll_interval_ms: u8,
    out_endpoint: bool,
    begun: Cell<bool>,
}

impl<'a, T: HidTransport> HidInterface<'a, T> {
    pub fn new(transport: &'a T, report_descriptor: &'a [u8]) -> Self {
        Self {
            transport,
            handler: None,
            report_descriptor,
            protocol: BootProtocol::None,
            poll_interval_ms: HID_POLL_MS,
            out_endpoint: false,
            begun: Cell::new(false),
        }
    }

    // Configuration (before `begin`)

    pub fn set_poll_interval(&mut self, interval_ms: u8) {
        self.poll_interval_ms = interval_ms;
    }

    pub fn set_boot_protocol(&mut self, protocol: BootProtocol) {
        self.protocol = protocol;
    }

    /// Add an interrupt OUT endpoint for host-to-device reports.
    pub fn enable_out_endpoint(&mut self, enabled: bool) {
        self.out_endpoint = enabled;
    }

    pub fn set_report_descriptor(&mut self, report_descriptor: &'a [u8]) {
        self.report_descriptor = report_descriptor;
    }

    pub fn set_report_handler(&mut self, handler: &'a dyn HidReportHandler) {
        self.handler = Some(handler);
    }

    /// Answer a GET_DESCRIPTOR(Report) request.
    pub fn report_descriptor(&self) -> &'a [u8] {
        self.report_descriptor
    }

    /// Register with `device`. Fails without a report descriptor.
    pub fn begin(&'a self, device: &mut UsbDevice<'a>) -> bool {
        if self.begun.get() {
            return true;
        }
        if self.report_descriptor.is_empty() {
            warn!("HID begin without report descriptor");
            return false;
        }
        match device.add_interface(self) {
            Ok(()) => {
                self.begun.set(true);
                true
            }
            Err(e) => {
                warn!("HID interface not added: {}", e);
                false
            }
        }
    }

    // Host-initiated reports, called by the engine

    /// Answer GET_REPORT. 0 (stall) without a handler.
    pub fn get_report(&self, report_id: u8, report_type: ReportType, buf: &mut [u8]) -> usize {
        match self.handler {
            Some(handler) => handler.get_report(report_id, report_type, buf).min(buf.len()),
            None => 0,
        }
    }

    /// Deliver SET_REPORT or OUT endpoint data. Dropped without a handler.
    pub fn set_report(&self, report_id: u8, report_type: ReportType, data: &[u8]) {
        match self.handler {
            Some(handler) => handler.set_report(report_id, report_type, data),
            None => trace!("HID set_report {} dropped, no handler", report_id),
        }
    }

    // Reports

    pub fn ready(&self) -> bool {
        self.transport.ready()
    }

    pub fn send_report(&self, report_id: u8, report: &[u8]) -> bool {
        self.transport.report(report_id, report)
    }

    pub fn send(&self, report_id: u8, report: &HidReport) -> bool {
        let mut buf = [0u8; MAX_TYPED_REPORT];
        let n = report.serialize(&mut buf);
        self.send_report(report_id, &buf[..n])
    }

    // Keyboard

    pub fn keyboard_report(&self, report_id: u8, modifier: u8, keycodes: [u8; 6]) -> bool {
        let report = KeyboardReport { modifier, keycodes };
        self.send(report_id, &HidReport::Keyboard(report))
    }

    /// Press the key that types `ch`. Characters without a key on a US
    /// layout send nothing and return `false`.
    pub fn keyboard_press(&self, report_id: u8, ch: char) -> bool {
        match keyboard::ascii_to_keycode(ch) {
            Some((modifier, keycode)) => self.send(
                report_id,
                &HidReport::Keyboard(KeyboardReport::single(modifier, keycode)),
            ),
            None => {
                debug!("no keycode for char {}", ch as u32);
                false
            }
        }
    }

    pub fn keyboard_release(&self, report_id: u8) -> bool {
        self.send(report_id, &HidReport::Keyboard(KeyboardReport::empty()))
    }

    // Mouse

    pub fn mouse_report(
        &self,
        report_id: u8,
        buttons: u8,
        x: i8,
        y: i8,
        wheel: i8,
        pan: i8,
    ) -> bool {
        let report = MouseReport {
            buttons,
            x,
            y,
            wheel,
            pan,
        };
        self.send(report_id, &HidReport::Mouse(report))
    }

    pub fn mouse_move(&self, report_id: u8, x: i8, y: i8) -> bool {
        self.mouse_report(report_id, 0, x, y, 0, 0)
    }

    /// Vertical `wheel` and horizontal `pan` in one report.
    pub fn mouse_scroll(&self, report_id: u8, wheel: i8, pan: i8) -> bool {
        self.mouse_report(report_id, 0, 0, 0, wheel, pan)
    }

    pub fn mouse_button_press(&self, report_id: u8, buttons: u8) -> bool {
        self.mouse_report(report_id, buttons, 0, 0, 0, 0)
    }

    pub fn mouse_button_release(&self, report_id: u8) -> bool {
        self.mouse_report(report_id, 0, 0, 0, 0, 0)
    }

    // Consumer control

    pub fn consumer_control(&self, report_id: u8, usage: u16) -> bool {
        self.send(report_id, &HidReport::Consumer(ConsumerReport { usage }))
    }
}

impl<T: HidTransport> InterfaceProvider for HidInterface<'_, T> {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error> {
        if self.report_descriptor.is_empty() {
            return Ok(());
        }
        let report_len = u16::try_from(self.report_descriptor.len())
            .map_err(|_| Error::InvalidArgument)?;

        let itf = alloc.alloc_interfaces(1)?;
        let ep_out = if self.out_endpoint {
            Some(alloc.alloc_endpoint(Direction::Out)?)
        } else {
            None
        };
        let ep_in = alloc.alloc_endpoint(Direction::In)?;

        let subclass = if self.protocol == BootProtocol::None { 0 } else { 1 };
        out.write(
            &InterfaceDescriptor {
                interface_number: itf,
                alternate_setting: 0,
                num_endpoints: 1 + ep_out.is_some() as u8,
                interface_class: CLASS_HID,
                interface_subclass: subclass,
                interface_protocol: self.protocol as u8,
                interface: 0,
            }
            .to_bytes(),
        )?;

        let version = le16(HID_VERSION);
        let len = le16(report_len);
        out.write(&[
            9,
            DESC_HID,
            version[0],
            version[1],
            0, // country code
            1, // one class descriptor follows
            DESC_HID_REPORT,
            len[0],
            len[1],
        ])?;

        if let Some(ep) = ep_out {
            out.write(
                &EndpointDescriptor::interrupt(ep.raw(), HID_EP_SIZE, self.poll_interval_ms)
                    .to_bytes(),
            )?;
        }
        out.write(
            &EndpointDescriptor::interrupt(ep_in.raw(), HID_EP_SIZE, self.poll_interval_ms)
                .to_bytes(),
        )
    }
}
