// SPDX-License-Identifier: MIT

use zerocopy::byteorder::{LittleEndian, U64};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::attrs::PartitionAttributes;
use crate::codec::GptName;
use crate::errors::*;
use crate::guid::Guid;
use crate::guids::{PartitionKind, TYPE_GUID_KERNEL};

pub const PARTITION_ENTRY_SIZE: usize = 128;

/// One 128-byte entry of the partition array.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct GptPartition {
    pub type_guid: Guid,
    pub unique_guid: Guid,
    pub first_lba: U64<LittleEndian>,
    pub last_lba: U64<LittleEndian>,
    pub attributes: PartitionAttributes,
    pub name: GptName,
}

const _: () = assert!(core::mem::size_of::<GptPartition>() == PARTITION_ENTRY_SIZE);

impl GptPartition {
    pub fn empty() -> Self {
        Self::new_zeroed()
    }

    /// An entry is unused when its type GUID is nil, whatever the other fields hold.
    #[inline]
    pub fn is_unused(&self) -> bool {
        self.type_guid.is_nil()
    }

    #[inline]
    pub fn is_chromeos_kernel(&self) -> bool {
        self.type_guid == TYPE_GUID_KERNEL
    }

    #[inline]
    pub fn kind(&self) -> PartitionKind {
        PartitionKind::from_guid(&self.type_guid)
    }

    /// Inclusive length in blocks. Inverted ranges count as empty.
    pub fn blocks(&self) -> u64 {
        let (first, last) = (self.first_lba.get(), self.last_lba.get());
        if last < first { 0 } else { (last - first).saturating_add(1) }
    }

    #[inline]
    pub fn offset(&self, block_size: u64) -> GptResult<u64> {
        self.first_lba
            .get()
            .checked_mul(block_size)
            .ok_or(CapacityError::Overflow("Partition offset").into())
    }

    #[inline]
    pub fn size(&self, block_size: u64) -> GptResult<u64> {
        self.blocks()
            .checked_mul(block_size)
            .ok_or(CapacityError::Overflow("Partition size").into())
    }

    pub fn label(&self) -> String {
        self.name.decode()
    }
}

impl Default for GptPartition {
    fn default() -> Self {
        Self::empty()
    }
}

/// Reference to partition `number` of `image`, as printed in messages (`disk.bin#3`).
pub fn partition_ref(image: &str, number: u32) -> String {
    format!("{image}#{number}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guids::TYPE_GUID_DATA;

    #[test]
    fn geometry_helpers() {
        let mut p = GptPartition::empty();
        assert!(p.is_unused());
        p.type_guid = TYPE_GUID_DATA;
        p.first_lba.set(34);
        p.last_lba.set(65);
        assert!(!p.is_unused());
        assert!(!p.is_chromeos_kernel());
        assert_eq!(p.blocks(), 32);
        assert_eq!(p.offset(512).unwrap(), 34 * 512);
        assert_eq!(p.size(512).unwrap(), 32 * 512);
        assert_eq!(p.kind(), PartitionKind::Data);
    }

    #[test]
    fn huge_lbas_do_not_wrap() {
        let mut p = GptPartition::empty();
        p.type_guid = TYPE_GUID_DATA;
        p.first_lba.set(0);
        p.last_lba.set(u64::MAX);
        assert_eq!(p.blocks(), u64::MAX);
        p.first_lba.set(u64::MAX / 2);
        assert!(matches!(
            p.offset(512).unwrap_err(),
            GptError::Capacity(CapacityError::Overflow(_))
        ));
        assert!(p.size(512).is_err());
    }

    #[test]
    fn unused_ignores_other_fields() {
        let mut p = GptPartition::empty();
        p.unique_guid = Guid::random();
        p.first_lba.set(100);
        assert!(p.is_unused());
    }

    #[test]
    fn layout_matches_disk_format() {
        let mut p = GptPartition::empty();
        p.type_guid = TYPE_GUID_KERNEL;
        p.first_lba.set(0x22);
        p.name = GptName::encode("KERN-A").unwrap();
        let bytes = p.as_bytes();
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[0..4], &[0x5D, 0x2A, 0x3A, 0xFE]);
        assert_eq!(bytes[32], 0x22);
        assert_eq!(&bytes[56..58], &[b'K', 0]);
        assert_eq!(p.label(), "KERN-A");
        assert_eq!(partition_ref("disk.bin", 2), "disk.bin#2");
    }
}
