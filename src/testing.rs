//! Host-side test doubles for the protocol engine and platform hooks.

use core::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

use crate::cdc::{CdcTransport, LineCoding, LineState};
use crate::config::SERIAL_ID_MAX_BYTES;
use crate::hid::{HidReportHandler, HidTransport, ReportType};
use crate::midi::MidiTransport;
use crate::port::Port;
use crate::task::Scheduler;

// ═══════════════════════════════════════════════════════════════════════════
// Platform
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct FakePort {
    pub serial: Vec<u8>,
    pub dfu_calls: Cell<usize>,
    pub init_calls: Cell<usize>,
}

impl FakePort {
    pub fn with_serial(id: &[u8]) -> Self {
        Self {
            serial: id.to_vec(),
            ..Default::default()
        }
    }
}

impl Port for FakePort {
    fn init_device(&self, _rhport: u8) {
        self.init_calls.set(self.init_calls.get() + 1);
    }

    fn enter_dfu(&self) {
        self.dfu_calls.set(self.dfu_calls.get() + 1);
    }

    fn serial_number(&self, serial_id: &mut [u8; SERIAL_ID_MAX_BYTES]) -> usize {
        let n = self.serial.len().min(SERIAL_ID_MAX_BYTES);
        serial_id[..n].copy_from_slice(&self.serial[..n]);
        n
    }
}

/// Counts yields; optionally runs a hook on each one.
#[derive(Default)]
pub struct CountingScheduler {
    pub yields: Cell<usize>,
}

impl Scheduler for CountingScheduler {
    fn yield_now(&self) {
        self.yields.set(self.yields.get() + 1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CDC
// ═══════════════════════════════════════════════════════════════════════════

/// Single-port CDC engine. Every instance number maps to the same FIFOs.
pub struct FakeCdc {
    pub connected: Cell<bool>,
    pub rx: RefCell<VecDeque<u8>>,
    pub tx: RefCell<Vec<u8>>,
    /// Bytes accepted per `write` call.
    pub chunk: Cell<usize>,
    /// Drop the connection once this many bytes have been written.
    pub disconnect_after: Cell<Option<usize>>,
    pub coding: Cell<LineCoding>,
    pub state: Cell<LineState>,
    pub flushed: RefCell<Vec<u8>>,
}

impl Default for FakeCdc {
    fn default() -> Self {
        Self {
            connected: Cell::new(true),
            rx: RefCell::default(),
            tx: RefCell::default(),
            chunk: Cell::new(usize::MAX),
            disconnect_after: Cell::new(None),
            coding: Cell::new(LineCoding::default()),
            state: Cell::new(LineState {
                dtr: true,
                rts: false,
            }),
            flushed: RefCell::default(),
        }
    }
}

impl CdcTransport for FakeCdc {
    fn connected(&self, _instance: u8) -> bool {
        self.connected.get()
    }

    fn available(&self, _instance: u8) -> usize {
        self.rx.borrow().len()
    }

    fn read(&self, _instance: u8, buf: &mut [u8]) -> usize {
        let mut rx = self.rx.borrow_mut();
        let n = buf.len().min(rx.len());
        for (slot, b) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = b;
        }
        n
    }

    fn peek(&self, _instance: u8) -> Option<u8> {
        self.rx.borrow().front().copied()
    }

    fn write(&self, _instance: u8, buf: &[u8]) -> usize {
        let n = buf.len().min(self.chunk.get());
        let mut tx = self.tx.borrow_mut();
        tx.extend_from_slice(&buf[..n]);
        if let Some(limit) = self.disconnect_after.get() {
            if tx.len() >= limit {
                self.connected.set(false);
            }
        }
        n
    }

    fn write_available(&self, _instance: u8) -> usize {
        self.chunk.get().min(64)
    }

    fn write_flush(&self, instance: u8) {
        self.flushed.borrow_mut().push(instance);
    }

    fn line_coding(&self, _instance: u8) -> LineCoding {
        self.coding.get()
    }

    fn line_state(&self, _instance: u8) -> LineState {
        self.state.get()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MIDI
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct FakeMidi {
    pub rx: RefCell<VecDeque<[u8; 4]>>,
    pub tx: RefCell<Vec<[u8; 4]>>,
    pub stream: RefCell<Vec<(u8, Vec<u8>)>>,
}

impl FakeMidi {
    pub fn push_rx(&self, packet: [u8; 4]) {
        self.rx.borrow_mut().push_back(packet);
    }
}

impl MidiTransport for FakeMidi {
    fn packets_available(&self) -> usize {
        self.rx.borrow().len()
    }

    fn packet_peek(&self, index: usize) -> Option<[u8; 4]> {
        self.rx.borrow().get(index).copied()
    }

    fn packet_read(&self) -> Option<[u8; 4]> {
        self.rx.borrow_mut().pop_front()
    }

    fn packet_write(&self, packet: &[u8; 4]) -> bool {
        self.tx.borrow_mut().push(*packet);
        true
    }

    fn stream_write(&self, cable: u8, bytes: &[u8]) -> usize {
        self.stream.borrow_mut().push((cable, bytes.to_vec()));
        bytes.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HID
// ═══════════════════════════════════════════════════════════════════════════

/// HID engine and application handler in one. `feature` answers
/// GET_REPORT; SET_REPORT payloads land in `received`.
pub struct FakeHid {
    pub accept: Cell<bool>,
    pub sent: RefCell<Vec<(u8, Vec<u8>)>>,
    pub feature: RefCell<Vec<u8>>,
    pub received: RefCell<Vec<(u8, ReportType, Vec<u8>)>>,
}

impl Default for FakeHid {
    fn default() -> Self {
        Self {
            accept: Cell::new(true),
            sent: RefCell::default(),
            feature: RefCell::default(),
            received: RefCell::default(),
        }
    }
}

impl HidReportHandler for FakeHid {
    fn get_report(&self, _report_id: u8, report_type: ReportType, buf: &mut [u8]) -> usize {
        if report_type != ReportType::Feature {
            return 0;
        }
        let feature = self.feature.borrow();
        let n = feature.len().min(buf.len());
        buf[..n].copy_from_slice(&feature[..n]);
        n
    }

    fn set_report(&self, report_id: u8, report_type: ReportType, data: &[u8]) {
        self.received
            .borrow_mut()
            .push((report_id, report_type, data.to_vec()));
    }
}

impl HidTransport for FakeHid {
    fn ready(&self) -> bool {
        self.accept.get()
    }

    fn report(&self, report_id: u8, report: &[u8]) -> bool {
        if !self.accept.get() {
            return false;
        }
        self.sent.borrow_mut().push((report_id, report.to_vec()));
        true
    }
}
