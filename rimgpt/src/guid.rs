// SPDX-License-Identifier: MIT

use core::fmt;
use core::str::FromStr;

use uuid::Uuid;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;

/// GUID as stored on disk (mixed-endian, first three groups little-endian).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Guid([u8; 16]);

impl Guid {
    pub const NIL: Guid = Guid([0u8; 16]);

    /// Builds a GUID from its textual groups, e.g. `FE3A2A5D-4F32-41A7-B725-ACCC3285A309`
    /// is `from_fields(0xFE3A2A5D, 0x4F32, 0x41A7, [0xB7, 0x25, 0xAC, 0xCC, 0x32, 0x85, 0xA3, 0x09])`.
    pub const fn from_fields(d1: u32, d2: u16, d3: u16, d4: [u8; 8]) -> Self {
        let a = d1.to_le_bytes();
        let b = d2.to_le_bytes();
        let c = d3.to_le_bytes();
        Self([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d4[0], d4[1], d4[2], d4[3], d4[4],
            d4[5], d4[6], d4[7],
        ])
    }

    #[inline]
    pub const fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn to_bytes_le(&self) -> [u8; 16] {
        self.0
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4().to_bytes_le())
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }
}

impl FromStr for Guid {
    type Err = GptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(|u| Self(u.to_bytes_le()))
            .map_err(|_| UsageError::InvalidGuid(s.to_string()).into())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", Uuid::from_bytes_le(self.0).hyphenated())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip_is_uppercase() {
        let g: Guid = "fe3a2a5d-4f32-41a7-b725-accc3285a309".parse().unwrap();
        assert_eq!(g.to_string(), "FE3A2A5D-4F32-41A7-B725-ACCC3285A309");
        assert_eq!(
            g,
            Guid::from_fields(
                0xFE3A2A5D,
                0x4F32,
                0x41A7,
                [0xB7, 0x25, 0xAC, 0xCC, 0x32, 0x85, 0xA3, 0x09]
            )
        );
    }

    #[test]
    fn on_disk_bytes_are_mixed_endian() {
        let g: Guid = "C12A7328-F81F-11D2-BA4B-00A0C93EC93B".parse().unwrap();
        assert_eq!(
            g.as_bytes(),
            &[
                0x28, 0x73, 0x2A, 0xC1, 0x1F, 0xF8, 0xD2, 0x11, 0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E,
                0xC9, 0x3B
            ]
        );
    }

    #[test]
    fn random_guids_differ() {
        let a = Guid::random();
        let b = Guid::random();
        assert_ne!(a, b);
        assert!(!a.is_nil());
        assert!(Guid::NIL.is_nil());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("not-a-guid".parse::<Guid>().is_err());
    }
}
