// SPDX-License-Identifier: MIT

//! Partition entry attribute word.
//!
//! Bit 0 is "required", bit 2 "legacy BIOS bootable". Bits 48..63 are type specific;
//! ChromeOS kernels split them into priority (48..51), tries (52..55) and successful (56).

use core::fmt;

use zerocopy::byteorder::{LittleEndian, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::codec::BitField;
use crate::errors::*;

pub const REQUIRED: BitField = BitField::new("required", 0, 0x1);
pub const LEGACY_BOOT: BitField = BitField::new("legacy_boot", 2, 0x1);
pub const PRIORITY: BitField = BitField::new("priority", 48, 0xf);
pub const TRIES: BitField = BitField::new("tries", 52, 0xf);
pub const SUCCESSFUL: BitField = BitField::new("successful", 56, 0x1);
/// Whole type-specific half word, overlapping the ChromeOS kernel fields.
pub const RAW_16: BitField = BitField::new("raw_16", 48, 0xffff);

pub const MAX_PRIORITY: u64 = 15;
pub const MAX_TRIES: u64 = 15;

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PartitionAttributes(U64<LittleEndian>);

impl PartitionAttributes {
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(U64::new(raw))
    }

    #[inline]
    pub fn raw(&self) -> u64 {
        self.0.get()
    }

    #[inline]
    pub fn get(&self, field: BitField) -> u64 {
        field.get(self.raw())
    }

    pub fn set(&mut self, field: BitField, value: u64) -> GptResult {
        let raw = field.set(self.raw(), value)?;
        self.0.set(raw);
        Ok(())
    }

    pub fn priority(&self) -> u64 {
        self.get(PRIORITY)
    }

    pub fn tries(&self) -> u64 {
        self.get(TRIES)
    }

    pub fn successful(&self) -> bool {
        self.get(SUCCESSFUL) != 0
    }

    pub fn required(&self) -> bool {
        self.get(REQUIRED) != 0
    }

    pub fn legacy_boot(&self) -> bool {
        self.get(LEGACY_BOOT) != 0
    }

    pub fn raw_16(&self) -> u64 {
        self.get(RAW_16)
    }

    pub fn set_priority(&mut self, value: u64) -> GptResult {
        self.set(PRIORITY, value)
    }

    pub fn set_tries(&mut self, value: u64) -> GptResult {
        self.set(TRIES, value)
    }

    pub fn set_successful(&mut self, value: bool) -> GptResult {
        self.set(SUCCESSFUL, value as u64)
    }

    pub fn set_required(&mut self, value: bool) -> GptResult {
        self.set(REQUIRED, value as u64)
    }

    pub fn set_legacy_boot(&mut self, value: bool) -> GptResult {
        self.set(LEGACY_BOOT, value as u64)
    }

    pub fn set_raw_16(&mut self, value: u64) -> GptResult {
        self.set(RAW_16, value)
    }
}

impl fmt::Debug for PartitionAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartitionAttributes({:#018x})", self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_fields_live_in_the_high_word() {
        let mut a = PartitionAttributes::default();
        a.set_priority(2).unwrap();
        a.set_tries(15).unwrap();
        a.set_successful(true).unwrap();
        assert_eq!(a.raw(), (1 << 56) | (15 << 52) | (2 << 48));
        assert_eq!(a.priority(), 2);
        assert_eq!(a.tries(), 15);
        assert!(a.successful());
        assert_eq!(a.raw_16(), 0x1f2);
    }

    #[test]
    fn low_bits_are_independent() {
        let mut a = PartitionAttributes::from_raw(0xf << 48);
        a.set_required(true).unwrap();
        a.set_legacy_boot(true).unwrap();
        assert_eq!(a.raw(), (0xf << 48) | 0b101);
        a.set_required(false).unwrap();
        assert!(!a.required());
        assert!(a.legacy_boot());
        assert_eq!(a.priority(), 15);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut a = PartitionAttributes::default();
        let err = a.set_priority(16).unwrap_err();
        assert!(matches!(
            err,
            GptError::Usage(UsageError::ValueOutOfRange { field: "priority", .. })
        ));
        assert!(a.set_raw_16(0x1_0000).is_err());
        assert_eq!(a.raw(), 0);
    }
}
