// SPDX-License-Identifier: MIT

//! Field codecs shared by the on-disk records.

use core::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;

/// Copies as much of `value` as fits into an `N`-byte field, zero padding the rest.
pub fn encode_truncated<const N: usize>(value: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = value.len().min(N);
    out[..len].copy_from_slice(&value[..len]);
    out
}

pub const NAME_BYTES: usize = 72;

/// Partition name: 36 UTF-16LE code units.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct GptName([u8; NAME_BYTES]);

impl GptName {
    pub const fn empty() -> Self {
        Self([0u8; NAME_BYTES])
    }

    /// Encodes `name`; the encoded form must leave room for a terminating NUL.
    pub fn encode(name: &str) -> GptResult<Self> {
        let mut out = [0u8; NAME_BYTES];
        let mut len = 0usize;
        for unit in name.encode_utf16() {
            if len + 2 >= NAME_BYTES {
                return Err(UsageError::TooLong {
                    field: "Names",
                    len: name.encode_utf16().count() * 2,
                    max: NAME_BYTES,
                }
                .into());
            }
            out[len..len + 2].copy_from_slice(&unit.to_le_bytes());
            len += 2;
        }
        Ok(Self(out))
    }

    pub fn decode(&self) -> String {
        let units: Vec<u16> = self
            .0
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
            .trim_matches('\0')
            .to_string()
    }
}

impl Default for GptName {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for GptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode())
    }
}

impl fmt::Debug for GptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.decode())
    }
}

/// A `mask`-wide field at bit `shift` of a 64-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    pub shift: u32,
    pub mask: u64,
}

impl BitField {
    pub const fn new(name: &'static str, shift: u32, mask: u64) -> Self {
        Self { name, shift, mask }
    }

    #[inline]
    pub const fn get(&self, raw: u64) -> u64 {
        (raw >> self.shift) & self.mask
    }

    /// Returns `raw` with this field replaced by `value`.
    pub fn set(&self, raw: u64, value: u64) -> GptResult<u64> {
        if value & self.mask != value {
            return Err(UsageError::ValueOutOfRange {
                field: self.name,
                value,
                max: self.mask,
            }
            .into());
        }
        Ok((raw & !(self.mask << self.shift)) | (value << self.shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_keeps_prefix() {
        let v: [u8; 4] = encode_truncated(b"abcdef");
        assert_eq!(&v, b"abcd");
    }

    #[test]
    fn name_is_utf16le() {
        let n = GptName::encode("STATE").unwrap();
        assert_eq!(&n.as_bytes()[..4], &[b'S', 0, b'T', 0]);
        assert_eq!(n.decode(), "STATE");
        assert_eq!(GptName::empty().decode(), "");
    }

    #[test]
    fn name_must_leave_room_for_nul() {
        assert!(GptName::encode(&"x".repeat(35)).is_ok());
        let err = GptName::encode(&"x".repeat(36)).unwrap_err();
        assert!(matches!(err, GptError::Usage(UsageError::TooLong { .. })));
    }

    #[test]
    fn bitfield_get_set() {
        let tries = BitField::new("tries", 52, 0xf);
        let raw = tries.set(0, 15).unwrap();
        assert_eq!(raw, 0xf << 52);
        assert_eq!(tries.get(raw), 15);
        let raw = tries.set(raw | 1, 3).unwrap();
        assert_eq!(tries.get(raw), 3);
        assert_eq!(raw & 1, 1);
        assert!(tries.set(raw, 16).is_err());
    }
}
