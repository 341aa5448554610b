//! USB-MIDI 1.0 event packet.
//!
//! Layout (4 bytes):
//! ```text
//! Byte 0: Header - cable number (high nibble) | code index number (low nibble)
//!         For channel messages the CIN is 0x8 | event type.
//! Byte 1: Status - 0x80 | event type << 4 | channel (0-15)
//! Byte 2: Data 1 (7-bit)
//! Byte 3: Data 2 (7-bit)
//! ```

/// Packet size in bytes.
pub const PACKET_SIZE: usize = 4;

/// MIDI bytes carried by a packet, indexed by code index number.
///
/// CIN 0x0 and 0x1 are reserved and carry nothing; 0xF is a single byte.
pub const CIN_PAYLOAD_LEN: [u8; 16] = [0, 0, 2, 3, 3, 1, 2, 3, 3, 3, 3, 3, 2, 2, 3, 1];

/// Event type, the three bits shared by the header and status bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventType {
    NoteOff = 0,
    NoteOn = 1,
    PolyPressure = 2,
    ControlChange = 3,
    ProgramChange = 4,
    ChannelPressure = 5,
    PitchBend = 6,
    System = 7,
}

impl EventType {
    pub const ALL: [EventType; 8] = [
        EventType::NoteOff,
        EventType::NoteOn,
        EventType::PolyPressure,
        EventType::ControlChange,
        EventType::ProgramChange,
        EventType::ChannelPressure,
        EventType::PitchBend,
        EventType::System,
    ];

    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => EventType::NoteOff,
            1 => EventType::NoteOn,
            2 => EventType::PolyPressure,
            3 => EventType::ControlChange,
            4 => EventType::ProgramChange,
            5 => EventType::ChannelPressure,
            6 => EventType::PitchBend,
            _ => EventType::System,
        }
    }
}

/// Velocity substituted when a note-on with velocity 0 is turned into a
/// note-off.
pub const RELEASE_VELOCITY: u8 = 64;

/// One USB-MIDI event packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MidiPacket([u8; PACKET_SIZE]);

impl MidiPacket {
    /// Empty packet on `cable` (0-15; cable 1 of the descriptor is 0).
    pub const fn new(cable: u8) -> Self {
        Self([(cable & 0x0F) << 4, 0, 0, 0])
    }

    pub const fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; PACKET_SIZE] {
        self.0
    }

    pub const fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }

    pub const fn cable(&self) -> u8 {
        self.0[0] >> 4
    }

    pub fn set_cable(&mut self, cable: u8) -> &mut Self {
        self.0[0] = (self.0[0] & 0x0F) | ((cable & 0x0F) << 4);
        self
    }

    pub const fn code_index(&self) -> u8 {
        self.0[0] & 0x0F
    }

    /// Event type from the status byte.
    pub const fn event_type(&self) -> EventType {
        EventType::from_bits(self.0[1] >> 4)
    }

    /// Event type from the header's code index number.
    pub const fn header_event_type(&self) -> EventType {
        EventType::from_bits(self.0[0])
    }

    /// Raw channel, 0-15.
    pub const fn channel(&self) -> u8 {
        self.0[1] & 0x0F
    }

    /// Channel as musicians count it, 1-16.
    pub const fn logical_channel(&self) -> u8 {
        self.channel() + 1
    }

    pub const fn note(&self) -> u8 {
        self.0[2]
    }

    pub const fn velocity(&self) -> u8 {
        self.0[3]
    }

    /// Number of meaningful MIDI bytes (status included).
    pub const fn payload_len(&self) -> usize {
        CIN_PAYLOAD_LEN[self.code_index() as usize] as usize
    }

    /// The meaningful MIDI bytes, status first.
    pub fn payload(&self) -> &[u8] {
        &self.0[1..1 + self.payload_len()]
    }

    /// Encode a channel event, keeping the cable.
    pub fn set(&mut self, channel: u8, event: EventType, data1: u8, data2: u8) -> &mut Self {
        let ty = event as u8;
        self.0 = [
            (self.0[0] & 0xF0) | 0x08 | ty,
            0x80 | (ty << 4) | (channel & 0x0F),
            data1 & 0x7F,
            data2 & 0x7F,
        ];
        self
    }

    /// Note-on, or note-off at release velocity when `velocity` is 0.
    pub fn set_note(&mut self, channel: u8, note: u8, velocity: u8) -> &mut Self {
        if velocity == 0 {
            self.set(channel, EventType::NoteOff, note, RELEASE_VELOCITY)
        } else {
            self.set(channel, EventType::NoteOn, note, velocity)
        }
    }
}

impl From<[u8; PACKET_SIZE]> for MidiPacket {
    fn from(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<MidiPacket> for [u8; PACKET_SIZE] {
    fn from(packet: MidiPacket) -> Self {
        packet.0
    }
}
