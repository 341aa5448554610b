//! End-to-end tests for usbd-composite through its public API.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use usbd_composite::cdc::{CdcTransport, LineCoding, LineState, SerialPort};
use usbd_composite::config::{SERIAL_ID_MAX_BYTES, TOUCH_1200_BAUD};
use usbd_composite::midi::{descriptor_len_for, MidiPacket, MidiPort, MidiTransport};
use usbd_composite::port::Port;
use usbd_composite::task::{DeviceEngine, DeviceTask, TaskOutcome};
use usbd_composite::{Error, UsbDevice};

// ═══════════════════════════════════════════════════════════════════════════
// Fakes
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Board {
    dfu: Cell<usize>,
}

impl Port for Board {
    fn enter_dfu(&self) {
        self.dfu.set(self.dfu.get() + 1);
    }

    fn serial_number(&self, serial_id: &mut [u8; SERIAL_ID_MAX_BYTES]) -> usize {
        serial_id[..4].copy_from_slice(&[0x01, 0x23, 0xAB, 0xCD]);
        4
    }
}

/// Protocol engine double covering the CDC and MIDI paths.
#[derive(Default)]
struct Engine {
    polls: Cell<usize>,
    dtr: Cell<bool>,
    baud: Cell<u32>,
    cdc_tx: RefCell<Vec<u8>>,
    midi_rx: RefCell<VecDeque<[u8; 4]>>,
    midi_tx: RefCell<Vec<[u8; 4]>>,
}

impl DeviceEngine for &Engine {
    fn task(&self) {
        self.polls.set(self.polls.get() + 1);
    }
}

impl CdcTransport for Engine {
    fn connected(&self, _instance: u8) -> bool {
        self.dtr.get()
    }
    fn available(&self, _instance: u8) -> usize {
        0
    }
    fn read(&self, _instance: u8, _buf: &mut [u8]) -> usize {
        0
    }
    fn peek(&self, _instance: u8) -> Option<u8> {
        None
    }
    fn write(&self, _instance: u8, buf: &[u8]) -> usize {
        // 16-byte FIFO that drains on every call.
        let n = buf.len().min(16);
        self.cdc_tx.borrow_mut().extend_from_slice(&buf[..n]);
        n
    }
    fn write_available(&self, _instance: u8) -> usize {
        16
    }
    fn write_flush(&self, _instance: u8) {}
    fn line_coding(&self, _instance: u8) -> LineCoding {
        LineCoding {
            baud: self.baud.get(),
            ..LineCoding::default()
        }
    }
    fn line_state(&self, _instance: u8) -> LineState {
        LineState {
            dtr: self.dtr.get(),
            rts: false,
        }
    }
}

impl MidiTransport for Engine {
    fn packets_available(&self) -> usize {
        self.midi_rx.borrow().len()
    }
    fn packet_peek(&self, index: usize) -> Option<[u8; 4]> {
        self.midi_rx.borrow().get(index).copied()
    }
    fn packet_read(&self) -> Option<[u8; 4]> {
        self.midi_rx.borrow_mut().pop_front()
    }
    fn packet_write(&self, packet: &[u8; 4]) -> bool {
        self.midi_tx.borrow_mut().push(*packet);
        true
    }
    fn stream_write(&self, _cable: u8, bytes: &[u8]) -> usize {
        bytes.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn serial_and_two_cable_midi_compose_and_touch() {
    let board = Board::default();
    let engine = Engine::default();
    engine.baud.set(115_200);
    let task: DeviceTask<NoopRawMutex, &Engine> = DeviceTask::new(&engine);
    let serial = SerialPort::new(&engine, &task);
    let midi = MidiPort::new(&engine, 2);

    let mut device = UsbDevice::new();
    device.begin(0, &board);
    assert!(serial.begin(&mut device));
    assert!(midi.begin(&mut device));

    let config = device.configuration_descriptor(0).unwrap();
    assert_eq!(descriptor_len_for(2), 124);
    assert_eq!(config.len(), 9 + 66 + 124);
    assert_eq!(&config[..9], &[9, 2, 199, 0, 4, 1, 0, 0xA0, 50]);
    // MIDI control interface follows the two CDC interfaces.
    assert_eq!(&config[9 + 66..9 + 66 + 9], &[9, 4, 2, 0, 0, 1, 1, 0, 0]);
    // MIDI endpoints continue the per-direction numbering.
    assert_eq!(&config[169..172], &[9, 5, 0x02]);
    assert_eq!(&config[184..187], &[9, 5, 0x83]);

    let serial_string = device.string_descriptor(3, 0x0409).unwrap();
    assert_eq!(serial_string.char_count(), 8);

    // Host opens the port, then drops DTR at 1200 baud.
    engine.dtr.set(true);
    assert!(!serial.line_state_changed(true, false, &board));
    engine.baud.set(TOUCH_1200_BAUD);
    engine.dtr.set(false);
    assert!(serial.line_state_changed(false, false, &board));
    assert!(!serial.line_state_changed(false, false, &board));
    assert_eq!(board.dfu.get(), 1);
}

#[test]
fn serial_write_drives_the_task_loop() {
    let engine = Engine::default();
    engine.dtr.set(true);
    let task: DeviceTask<NoopRawMutex, &Engine> = DeviceTask::new(&engine);
    let serial = SerialPort::new(&engine, &task);
    let mut device = UsbDevice::new();
    assert!(serial.begin(&mut device));

    let message = [b'x'; 40];
    assert_eq!(serial.write(&message), 40);
    assert_eq!(engine.cdc_tx.borrow().len(), 40);
    // 16 + 16 + 8: two yields.
    assert_eq!(engine.polls.get(), 2);

    // Nothing to read: one yield per call.
    assert_eq!(serial.available(), 0);
    assert_eq!(engine.polls.get(), 3);
}

#[test]
fn task_shim_skips_while_guard_is_held() {
    let engine = Engine::default();
    let task: DeviceTask<NoopRawMutex, &Engine> = DeviceTask::new(&engine);

    assert_eq!(task.run(), TaskOutcome::Ran);
    {
        let _held = task.hold().unwrap();
        assert_eq!(task.run(), TaskOutcome::Skipped);
    }
    assert_eq!(task.run(), TaskOutcome::Ran);
    assert_eq!(engine.polls.get(), 2);
}

#[test]
fn midi_packets_flow_both_ways() {
    let engine = Engine::default();
    let midi = MidiPort::new(&engine, 1);

    let mut note = MidiPacket::new(0);
    note.set_note(0, 60, 100);
    assert!(midi.write_packet(&note));
    assert_eq!(engine.midi_tx.borrow()[0], [0x09, 0x90, 60, 100]);

    engine.midi_rx.borrow_mut().push_back([0x08, 0x80, 60, 64]);
    assert_eq!(midi.available(), 3);
    assert_eq!(midi.read(), Some(0x80));
    assert_eq!(midi.read(), Some(60));
    assert_eq!(midi.read(), Some(64));
    assert_eq!(midi.read(), None);
}

#[test]
fn small_buffer_reports_overflow() {
    let engine = Engine::default();
    let midi = MidiPort::new(&engine, 8);
    let serial_task: DeviceTask<NoopRawMutex, &Engine> = DeviceTask::new(&engine);
    let serial = SerialPort::new(&engine, &serial_task);

    let mut device = UsbDevice::new();
    assert!(serial.begin(&mut device));
    assert!(midi.begin(&mut device));

    let required = 9 + 66 + descriptor_len_for(8);
    assert_eq!(
        device.compose(),
        Err(Error::DescriptorOverflow {
            required,
            capacity: 256
        })
    );
    assert!(device.configuration_descriptor(0).is_none());

    device.remove_interface(&midi);
    assert_eq!(device.configuration_descriptor(0).map(<[u8]>::len), Some(75));
}
