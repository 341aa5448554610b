//! String descriptor encoding (Table 9-16).

use super::DESC_STRING;
use crate::config::STRING_DESCRIPTOR_MAX_CHARS;

const CAPACITY: usize = 2 + 2 * STRING_DESCRIPTOR_MAX_CHARS;

/// An encoded string descriptor: 2-byte header followed by UTF-16LE.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StringDescriptor {
    data: [u8; CAPACITY],
    len: usize,
}

impl StringDescriptor {
    /// String zero: the list of supported language ids (we support one).
    pub fn languages(language_id: u16) -> Self {
        let mut data = [0u8; CAPACITY];
        let id = language_id.to_le_bytes();
        data[..4].copy_from_slice(&[4, DESC_STRING, id[0], id[1]]);
        Self { data, len: 4 }
    }

    /// Encode `text`, truncated to `STRING_DESCRIPTOR_MAX_CHARS` code units.
    /// A character is never split across the truncation boundary.
    pub fn encode(text: &str) -> Self {
        let mut data = [0u8; CAPACITY];
        let mut units = 0;
        let mut pair = [0u16; 2];
        for ch in text.chars() {
            let encoded = ch.encode_utf16(&mut pair);
            if units + encoded.len() > STRING_DESCRIPTOR_MAX_CHARS {
                break;
            }
            for unit in encoded.iter() {
                let at = 2 + 2 * units;
                data[at..at + 2].copy_from_slice(&unit.to_le_bytes());
                units += 1;
            }
        }
        let len = 2 + 2 * units;
        data[0] = len as u8;
        data[1] = DESC_STRING;
        Self { data, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Number of UTF-16 code units carried.
    pub fn char_count(&self) -> usize {
        (self.len - 2) / 2
    }
}

impl core::fmt::Debug for StringDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StringDescriptor")
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_descriptor() {
        assert_eq!(StringDescriptor::languages(0x0409).as_bytes(), &[4, 3, 0x09, 0x04]);
    }

    #[test]
    fn ascii_string_is_utf16le() {
        let s = StringDescriptor::encode("Hi");
        assert_eq!(s.as_bytes(), &[6, 3, b'H', 0, b'i', 0]);
        assert_eq!(s.char_count(), 2);
    }

    #[test]
    fn long_string_is_truncated() {
        let long = "0123456789012345678901234567890123456789";
        let s = StringDescriptor::encode(long);
        assert_eq!(s.char_count(), STRING_DESCRIPTOR_MAX_CHARS);
        assert_eq!(s.as_bytes()[0] as usize, 2 + 2 * STRING_DESCRIPTOR_MAX_CHARS);
    }

    #[test]
    fn surrogate_pair_is_not_split() {
        // 31 ASCII chars + one astral char (2 units) would need 33 units.
        let mut text: heapless::String<64> = heapless::String::new();
        for _ in 0..31 {
            text.push('a').unwrap();
        }
        text.push('\u{1F3B5}').unwrap();
        let s = StringDescriptor::encode(&text);
        assert_eq!(s.char_count(), 31);
    }
}
