//! USB-MIDI interface provider with packet and byte-stream views.
//!
//! The descriptor exposes one MIDIStreaming interface with up to eight
//! virtual cables, each an embedded/external jack pair in both
//! directions. At runtime [`MidiPort`] offers whole 4-byte packets
//! (`read_packet` / `write_packet`) and a serial-style byte stream that
//! unpacks inbound packets into their MIDI bytes.

pub mod packet;

use core::cell::{Cell, RefCell};

use heapless::Deque;

use crate::config::{BULK_PACKET_SIZE, MIDI_CABLE_MAX};
use crate::descriptor::standard::{EndpointDescriptor, InterfaceDescriptor};
use crate::descriptor::{le16, DescriptorWriter, CLASS_AUDIO, DESC_CS_ENDPOINT, DESC_CS_INTERFACE};
use crate::error::Error;
use crate::usb::allocator::{Direction, ResourceAllocator};
use crate::usb::{InterfaceProvider, UsbDevice};

pub use packet::{EventType, MidiPacket};

const SUBCLASS_AUDIO_CONTROL: u8 = 0x01;
const SUBCLASS_MIDI_STREAMING: u8 = 0x03;

/// bcdADC / bcdMSC 1.00.
const AUDIO_VERSION: u16 = 0x0100;

// Class-specific subtypes.
const CS_HEADER: u8 = 0x01;
const CS_MIDI_IN_JACK: u8 = 0x02;
const CS_MIDI_OUT_JACK: u8 = 0x03;
const CS_EP_GENERAL: u8 = 0x01;

const JACK_EMBEDDED: u8 = 0x01;
const JACK_EXTERNAL: u8 = 0x02;

/// AC interface + AC header + MS interface + MS header.
const HEAD_LEN: usize = 9 + 9 + 9 + 7;
/// Four jacks per cable.
const JACK_LEN: usize = 6 + 6 + 9 + 9;

const fn ep_len(cables: u8) -> usize {
    9 + 4 + cables as usize
}

/// Length of the MIDI descriptor block for `cables` virtual cables.
pub const fn descriptor_len_for(cables: u8) -> usize {
    HEAD_LEN + JACK_LEN * cables as usize + 2 * ep_len(cables)
}

// Jack ids, four per cable starting at 1.
const fn jack_in_embedded(cable: u8) -> u8 {
    (cable - 1) * 4 + 1
}
const fn jack_in_external(cable: u8) -> u8 {
    (cable - 1) * 4 + 2
}
const fn jack_out_embedded(cable: u8) -> u8 {
    (cable - 1) * 4 + 3
}
const fn jack_out_external(cable: u8) -> u8 {
    (cable - 1) * 4 + 4
}

/// MIDI side of the external protocol engine.
pub trait MidiTransport {
    /// Complete packets waiting in the receive FIFO.
    fn packets_available(&self) -> usize;
    /// Look at the `index`-th queued packet without consuming it.
    fn packet_peek(&self, index: usize) -> Option<[u8; 4]>;
    fn packet_read(&self) -> Option<[u8; 4]>;
    fn packet_write(&self, packet: &[u8; 4]) -> bool;
    /// Frame raw MIDI bytes into packets on `cable`; returns bytes taken.
    fn stream_write(&self, cable: u8, bytes: &[u8]) -> usize;
}

pub struct MidiPort<'a, T: MidiTransport> {
    transport: &'a T,
    cables: Cell<u8>,
    cable_names: Cell<[u8; MIDI_CABLE_MAX as usize]>,
    string_index: Cell<u8>,
    /// Bytes of the last inbound packet not yet handed out by `read`.
    pending: RefCell<Deque<u8, 3>>,
    begun: Cell<bool>,
}

impl<'a, T: MidiTransport> MidiPort<'a, T> {
    /// Port with `cables` virtual cables, clamped to 1..=8.
    pub fn new(transport: &'a T, cables: u8) -> Self {
        Self {
            transport,
            cables: Cell::new(cables.clamp(1, MIDI_CABLE_MAX)),
            cable_names: Cell::new([0; MIDI_CABLE_MAX as usize]),
            string_index: Cell::new(0),
            pending: RefCell::new(Deque::new()),
            begun: Cell::new(false),
        }
    }

    /// Change the cable count. Refused once the port has begun, since the
    /// descriptor shape is fixed from then on.
    pub fn set_cables(&self, cables: u8) -> bool {
        if self.begun.get() || cables == 0 || cables > MIDI_CABLE_MAX {
            return false;
        }
        self.cables.set(cables);
        true
    }

    pub fn cables(&self) -> u8 {
        self.cables.get()
    }

    /// Name cable `cable` (1-based) in the jack descriptors.
    pub fn set_cable_name(&self, device: &mut UsbDevice<'a>, cable: u8, name: &'a str) -> bool {
        if cable == 0 || cable > MIDI_CABLE_MAX {
            return false;
        }
        let strid = device.add_string_descriptor(name);
        let mut names = self.cable_names.get();
        names[(cable - 1) as usize] = strid;
        self.cable_names.set(names);
        device.invalidate_configuration();
        strid > 0
    }

    /// Name the audio control interface.
    pub fn set_interface_name(&self, device: &mut UsbDevice<'a>, name: &'a str) -> bool {
        let strid = device.add_string_descriptor(name);
        self.string_index.set(strid);
        device.invalidate_configuration();
        strid > 0
    }

    /// Register with `device`.
    pub fn begin(&'a self, device: &mut UsbDevice<'a>) -> bool {
        if self.begun.get() {
            return true;
        }
        match device.add_interface(self) {
            Ok(()) => {
                self.begun.set(true);
                true
            }
            Err(e) => {
                warn!("MIDI begin: {}", e);
                false
            }
        }
    }

    // Packet view

    pub fn read_packet(&self) -> Option<MidiPacket> {
        self.transport.packet_read().map(MidiPacket::from_bytes)
    }

    pub fn write_packet(&self, packet: &MidiPacket) -> bool {
        self.transport.packet_write(packet.as_bytes())
    }

    // Byte-stream view

    /// MIDI bytes `read` can still return: the unpacked remainder plus the
    /// payload of every queued packet. Packets with a reserved code index
    /// count for nothing, so a non-zero result always yields a byte.
    pub fn available(&self) -> usize {
        let queued: usize = (0..self.transport.packets_available())
            .filter_map(|i| self.transport.packet_peek(i))
            .map(|raw| MidiPacket::from_bytes(raw).payload_len())
            .sum();
        self.pending.borrow().len() + queued
    }

    pub fn read(&self) -> Option<u8> {
        self.fill_pending();
        self.pending.borrow_mut().pop_front()
    }

    pub fn peek(&self) -> Option<u8> {
        self.fill_pending();
        self.pending.borrow().front().copied()
    }

    /// Write one MIDI byte on cable 0.
    pub fn write(&self, byte: u8) -> usize {
        self.transport.stream_write(0, &[byte])
    }

    pub fn write_bytes(&self, cable: u8, bytes: &[u8]) -> usize {
        self.transport.stream_write(cable, bytes)
    }

    /// Packets leave as soon as they are complete; nothing to flush.
    pub fn flush(&self) {}

    /// Unpack packets until one carries MIDI bytes or the FIFO is empty.
    fn fill_pending(&self) {
        let mut pending = self.pending.borrow_mut();
        while pending.is_empty() {
            let Some(raw) = self.transport.packet_read() else {
                return;
            };
            let packet = MidiPacket::from_bytes(raw);
            for &b in packet.payload() {
                // Capacity matches the longest payload.
                let _ = pending.push_back(b);
            }
        }
    }
}

impl<T: MidiTransport> InterfaceProvider for MidiPort<'_, T> {
    fn write_descriptor(
        &self,
        alloc: &mut ResourceAllocator,
        out: &mut DescriptorWriter<'_>,
    ) -> Result<(), Error> {
        let cables = self.cables.get();
        let names = self.cable_names.get();

        let itf = alloc.alloc_interfaces(2)?;
        let ep_in = alloc.alloc_endpoint(Direction::In)?;
        let ep_out = alloc.alloc_endpoint(Direction::Out)?;
        let ms_itf = itf + 1;
        let version = le16(AUDIO_VERSION);

        // Audio control
        out.write(
            &InterfaceDescriptor {
                interface_number: itf,
                alternate_setting: 0,
                num_endpoints: 0,
                interface_class: CLASS_AUDIO,
                interface_subclass: SUBCLASS_AUDIO_CONTROL,
                interface_protocol: 0,
                interface: self.string_index.get(),
            }
            .to_bytes(),
        )?;
        let ac_total = le16(9);
        out.write(&[
            9,
            DESC_CS_INTERFACE,
            CS_HEADER,
            version[0],
            version[1],
            ac_total[0],
            ac_total[1],
            1,
            ms_itf,
        ])?;

        // MIDI streaming
        out.write(
            &InterfaceDescriptor {
                interface_number: ms_itf,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: CLASS_AUDIO,
                interface_subclass: SUBCLASS_MIDI_STREAMING,
                interface_protocol: 0,
                interface: 0,
            }
            .to_bytes(),
        )?;
        let ms_total = le16((7 + JACK_LEN * cables as usize + 2 * ep_len(cables)) as u16);
        out.write(&[
            7,
            DESC_CS_INTERFACE,
            CS_HEADER,
            version[0],
            version[1],
            ms_total[0],
            ms_total[1],
        ])?;

        for cable in 1..=cables {
            let name = names[(cable - 1) as usize];
            let (in_emb, in_ext) = (jack_in_embedded(cable), jack_in_external(cable));
            let (out_emb, out_ext) = (jack_out_embedded(cable), jack_out_external(cable));
            out.write(&[6, DESC_CS_INTERFACE, CS_MIDI_IN_JACK, JACK_EMBEDDED, in_emb, name])?;
            out.write(&[6, DESC_CS_INTERFACE, CS_MIDI_IN_JACK, JACK_EXTERNAL, in_ext, name])?;
            out.write(&[
                9,
                DESC_CS_INTERFACE,
                CS_MIDI_OUT_JACK,
                JACK_EMBEDDED,
                out_emb,
                1,
                in_ext,
                1,
                name,
            ])?;
            out.write(&[
                9,
                DESC_CS_INTERFACE,
                CS_MIDI_OUT_JACK,
                JACK_EXTERNAL,
                out_ext,
                1,
                in_emb,
                1,
                name,
            ])?;
        }

        // Host-to-device endpoint feeds the embedded IN jacks.
        out.write(&EndpointDescriptor::bulk(ep_out.raw(), BULK_PACKET_SIZE).to_audio_bytes())?;
        out.write(&[4 + cables, DESC_CS_ENDPOINT, CS_EP_GENERAL, cables])?;
        for cable in 1..=cables {
            out.write_u8(jack_in_embedded(cable))?;
        }

        // Device-to-host endpoint drains the embedded OUT jacks.
        out.write(&EndpointDescriptor::bulk(ep_in.raw(), BULK_PACKET_SIZE).to_audio_bytes())?;
        out.write(&[4 + cables, DESC_CS_ENDPOINT, CS_EP_GENERAL, cables])?;
        for cable in 1..=cables {
            out.write_u8(jack_out_embedded(cable))?;
        }
        Ok(())
    }
}
