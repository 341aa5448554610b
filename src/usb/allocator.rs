//! Interface number, endpoint address and string index allocation.
//!
//! A [`ResourceAllocator`] is created per composition cycle and reset at
//! the start of each pass, so both passes hand out identical identifiers
//! as long as providers request them in the same order.

use crate::config::{MAX_ENDPOINT_NUMBER, MAX_INTERFACES, STRING_DESCRIPTOR_MAX};
use crate::error::{Error, Resource};
use heapless::Vec;

/// Endpoint direction, relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Device to host.
    In,
    /// Host to device.
    Out,
}

/// Direction-tagged endpoint address (bit 7 set for IN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EndpointAddress(u8);

impl EndpointAddress {
    pub const DIR_IN: u8 = 0x80;

    pub const fn new(direction: Direction, number: u8) -> Self {
        match direction {
            Direction::In => Self(Self::DIR_IN | (number & 0x0F)),
            Direction::Out => Self(number & 0x0F),
        }
    }

    pub const fn number(self) -> u8 {
        self.0 & 0x0F
    }

    pub const fn direction(self) -> Direction {
        if self.0 & Self::DIR_IN != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<EndpointAddress> for u8 {
    fn from(ep: EndpointAddress) -> u8 {
        ep.0
    }
}

/// Per-platform endpoint budget and remap table.
///
/// Addresses listed in `reserved` are owned by the platform (for example a
/// boot-time CDC port wired in ROM) and are skipped during allocation.
/// Ceilings above [`MAX_ENDPOINT_NUMBER`] are capped at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPolicy {
    pub max_in: u8,
    pub max_out: u8,
    pub reserved: &'static [u8],
}

impl EndpointPolicy {
    pub const DEFAULT: Self = Self {
        max_in: MAX_ENDPOINT_NUMBER,
        max_out: MAX_ENDPOINT_NUMBER,
        reserved: &[],
    };

    /// ESP32-S2/S3 with the ROM CDC console enabled keeps OUT 3 and
    /// IN 4/5 for itself and only has six IN endpoints.
    pub const ESP32_CDC_ON_BOOT: Self = Self {
        max_in: 6,
        max_out: MAX_ENDPOINT_NUMBER,
        reserved: &[0x03, 0x84, 0x85],
    };

    fn is_reserved(&self, address: u8) -> bool {
        self.reserved.contains(&address)
    }
}

impl Default for EndpointPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Counter snapshot, used to check that both passes allocate alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorState {
    pub interfaces: u8,
    pub next_in: u8,
    pub next_out: u8,
}

/// Hands out interface numbers and endpoint addresses for one
/// composition cycle.
#[derive(Debug, Clone)]
pub struct ResourceAllocator {
    policy: EndpointPolicy,
    state: AllocatorState,
}

impl ResourceAllocator {
    pub fn new(policy: EndpointPolicy) -> Self {
        let mut alloc = Self {
            policy,
            state: AllocatorState::default(),
        };
        alloc.reset();
        alloc
    }

    /// Restart every counter from zero (endpoints from 1).
    pub fn reset(&mut self) {
        self.state = AllocatorState {
            interfaces: 0,
            next_in: 1,
            next_out: 1,
        };
    }

    /// Reserve `count` consecutive interface numbers, returning the first.
    pub fn alloc_interfaces(&mut self, count: u8) -> Result<u8, Error> {
        let first = self.state.interfaces;
        let next = first
            .checked_add(count)
            .filter(|&n| n <= MAX_INTERFACES)
            .ok_or(Resource::Interface)?;
        self.state.interfaces = next;
        Ok(first)
    }

    /// Reserve the next free endpoint in `direction`.
    pub fn alloc_endpoint(&mut self, direction: Direction) -> Result<EndpointAddress, Error> {
        let (counter, max, resource) = match direction {
            Direction::In => (
                &mut self.state.next_in,
                self.policy.max_in.min(MAX_ENDPOINT_NUMBER),
                Resource::EndpointIn,
            ),
            Direction::Out => (
                &mut self.state.next_out,
                self.policy.max_out.min(MAX_ENDPOINT_NUMBER),
                Resource::EndpointOut,
            ),
        };

        loop {
            let number = *counter;
            if number == 0 || number > max {
                return Err(resource.into());
            }
            *counter += 1;

            let ep = EndpointAddress::new(direction, number);
            if !self.policy.is_reserved(ep.raw()) {
                return Ok(ep);
            }
        }
    }

    /// Interface numbers handed out so far in this pass.
    pub fn interface_count(&self) -> u8 {
        self.state.interfaces
    }

    pub fn state(&self) -> AllocatorState {
        self.state
    }
}

/// Slots left after the four fixed string indices.
const EXTRA_STRINGS: usize = STRING_DESCRIPTOR_MAX - 4;

/// String descriptor table.
///
/// Slot 0 is the language id and slots 1..=3 are the manufacturer,
/// product and serial strings; `add` hands out indices from 4 upwards.
/// Strings are kept by reference, so they must outlive the device.
#[derive(Debug, Clone, Default)]
pub struct StringTable<'a> {
    extra: Vec<&'a str, EXTRA_STRINGS>,
}

impl<'a> StringTable<'a> {
    pub const MANUFACTURER: u8 = 1;
    pub const PRODUCT: u8 = 2;
    pub const SERIAL: u8 = 3;
    pub const FIRST_FREE: u8 = 4;

    pub const fn new() -> Self {
        Self { extra: Vec::new() }
    }

    /// Store `text` and return its 1-based descriptor index, or 0 when the
    /// table is full.
    pub fn add(&mut self, text: &'a str) -> u8 {
        match self.extra.push(text) {
            Ok(()) => Self::FIRST_FREE + (self.extra.len() as u8 - 1),
            Err(_) => 0,
        }
    }

    /// Look up a string added with [`add`](Self::add).
    pub fn get(&self, index: u8) -> Option<&'a str> {
        let slot = index.checked_sub(Self::FIRST_FREE)?;
        self.extra.get(slot as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extra.is_empty()
    }
}
