//! Binary descriptor building blocks.
//!
//! Every provider writes its descriptor block through a
//! [`DescriptorWriter`]. The same writer type runs in two modes:
//!
//! - **measure**: no output buffer, only the byte count advances
//!   (the "query length" pass);
//! - **fill**: bytes are copied into a fixed-capacity buffer and any
//!   write past the end fails with [`Error::DescriptorOverflow`].
//!
//! Providers never branch on the mode, so both passes request the same
//! identifiers in the same order.

pub mod standard;
pub mod string;

use crate::error::Error;

// Descriptor type codes (USB 2.0 Table 9-5 plus class-specific codes).

pub const DESC_DEVICE: u8 = 0x01;
pub const DESC_CONFIGURATION: u8 = 0x02;
pub const DESC_STRING: u8 = 0x03;
pub const DESC_INTERFACE: u8 = 0x04;
pub const DESC_ENDPOINT: u8 = 0x05;
pub const DESC_INTERFACE_ASSOCIATION: u8 = 0x0B;
pub const DESC_HID: u8 = 0x21;
pub const DESC_HID_REPORT: u8 = 0x22;
pub const DESC_CS_INTERFACE: u8 = 0x24;
pub const DESC_CS_ENDPOINT: u8 = 0x25;

// Interface / function class codes.

pub const CLASS_AUDIO: u8 = 0x01;
pub const CLASS_CDC: u8 = 0x02;
pub const CLASS_HID: u8 = 0x03;
pub const CLASS_MSC: u8 = 0x08;
pub const CLASS_CDC_DATA: u8 = 0x0A;
pub const CLASS_VIDEO: u8 = 0x0E;
pub const CLASS_MISC: u8 = 0xEF;
pub const CLASS_VENDOR: u8 = 0xFF;

/// Endpoint transfer type, the low two bits of `bmAttributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferType {
    Control = 0b00,
    Isochronous = 0b01,
    Bulk = 0b10,
    Interrupt = 0b11,
}

/// Cursor over a descriptor output target.
pub struct DescriptorWriter<'b> {
    buf: Option<&'b mut [u8]>,
    pos: usize,
}

impl<'b> DescriptorWriter<'b> {
    /// Writer with no output target; only counts bytes.
    pub fn measure() -> Self {
        Self { buf: None, pos: 0 }
    }

    /// Writer that fills `buf` from its start.
    pub fn new(buf: &'b mut [u8]) -> Self {
        Self {
            buf: Some(buf),
            pos: 0,
        }
    }

    pub fn is_measuring(&self) -> bool {
        self.buf.is_none()
    }

    /// Bytes written (or counted) so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Append raw bytes.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.pos + bytes.len();
        if let Some(buf) = self.buf.as_deref_mut() {
            if end > buf.len() {
                return Err(Error::DescriptorOverflow {
                    required: end,
                    capacity: buf.len(),
                });
            }
            buf[self.pos..end].copy_from_slice(bytes);
        }
        self.pos = end;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        self.write(&[value])
    }
}

/// Little-endian split of a 16-bit descriptor field.
pub(crate) const fn le16(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_counts_without_target() {
        let mut w = DescriptorWriter::measure();
        assert!(w.is_measuring());
        w.write(&[1, 2, 3]).unwrap();
        w.write_u8(4).unwrap();
        assert_eq!(w.len(), 4);
    }

    #[test]
    fn fill_copies_bytes_in_order() {
        let mut buf = [0u8; 8];
        let mut w = DescriptorWriter::new(&mut buf);
        w.write(&[0xAA, 0xBB]).unwrap();
        w.write_u8(0xCC).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(&buf[..3], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn fill_rejects_overflow_and_keeps_position() {
        let mut buf = [0u8; 4];
        let mut w = DescriptorWriter::new(&mut buf);
        w.write(&[1, 2, 3]).unwrap();
        let err = w.write(&[4, 5]).unwrap_err();
        assert_eq!(
            err,
            Error::DescriptorOverflow {
                required: 5,
                capacity: 4
            }
        );
        assert_eq!(w.len(), 3);
        assert_eq!(buf, [1, 2, 3, 0]);
    }
}
