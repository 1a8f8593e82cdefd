// SPDX-License-Identifier: MIT

use zerocopy::byteorder::{LittleEndian, U32, U64};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;
use crate::guid::Guid;
use crate::partition::PARTITION_ENTRY_SIZE;

pub const SIGNATURE_EFI: [u8; 8] = *b"EFI PART";
pub const SIGNATURE_CHROMEOS: [u8; 8] = *b"CHROMEOS";
/// Marks a primary header that readers must skip in favour of the backup.
pub const SIGNATURE_IGNOREME: [u8; 8] = *b"IGNOREME";
pub const SIGNATURES: [[u8; 8]; 2] = [SIGNATURE_EFI, SIGNATURE_CHROMEOS];

pub const REVISION: [u8; 4] = [0x00, 0x00, 0x01, 0x00];
pub const HEADER_SIZE: usize = 92;
pub const DEFAULT_PARTITION_ENTRIES: u32 = 128;
/// LBA 0 = PMBR, LBA 1 = primary header.
pub const DEFAULT_PARTITIONS_LBA: u64 = 2;
pub const PRIMARY_HEADER_LBA: u64 = 1;
/// Upper bound accepted for PartitionEntriesNumber when decoding.
pub const MAX_PARTITION_ENTRIES: u32 = 16_384;

/// GPT header, 92 bytes, all integers little-endian.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: [u8; 4],
    pub header_size: U32<LittleEndian>,
    pub header_crc32: U32<LittleEndian>,
    pub reserved: U32<LittleEndian>,
    pub current_lba: U64<LittleEndian>,
    pub backup_lba: U64<LittleEndian>,
    pub first_usable_lba: U64<LittleEndian>,
    pub last_usable_lba: U64<LittleEndian>,
    pub disk_guid: Guid,
    pub entries_lba: U64<LittleEndian>,
    pub num_entries: U32<LittleEndian>,
    pub entry_size: U32<LittleEndian>,
    pub entries_crc32: U32<LittleEndian>,
}

const _: () = assert!(core::mem::size_of::<GptHeader>() == HEADER_SIZE);

impl GptHeader {
    /// Fresh primary header for a disk of `size` bytes.
    ///
    /// The entry array starts `pad_blocks` after LBA 2; the backup copy mirrors it at the end.
    /// Both CRC fields are left zero.
    pub fn create(size: u64, block_size: u64, pad_blocks: u64, entries: u32) -> GptResult<Self> {
        if block_size == 0 {
            return Err(UsageError::Invalid("Block size must not be zero").into());
        }
        if entries == 0 || entries > MAX_PARTITION_ENTRIES {
            return Err(UsageError::ValueOutOfRange {
                field: "entries",
                value: entries as u64,
                max: MAX_PARTITION_ENTRIES as u64,
            }
            .into());
        }
        let blocks = size / block_size;
        let parts_lba = DEFAULT_PARTITIONS_LBA + pad_blocks;
        let parts_blocks = table_blocks(entries, PARTITION_ENTRY_SIZE as u32, block_size);
        let first_usable = parts_lba + parts_blocks;

        // Primary metadata, backup entries and backup header must all fit.
        let required = first_usable + parts_blocks + 1;
        if blocks < required {
            return Err(CapacityError::TooSmall { blocks, required }.into());
        }

        let mut hdr = Self::new_zeroed();
        hdr.signature = SIGNATURE_EFI;
        hdr.revision = REVISION;
        hdr.header_size.set(HEADER_SIZE as u32);
        hdr.current_lba.set(PRIMARY_HEADER_LBA);
        hdr.backup_lba.set(blocks - 1);
        hdr.first_usable_lba.set(first_usable);
        hdr.last_usable_lba.set(blocks - parts_blocks - parts_lba);
        hdr.disk_guid = Guid::random();
        hdr.entries_lba.set(parts_lba);
        hdr.num_entries.set(entries);
        hdr.entry_size.set(PARTITION_ENTRY_SIZE as u32);
        Ok(hdr)
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        SIGNATURES.contains(&self.signature)
    }

    /// CRC32 of the header with its own CRC field zeroed.
    pub fn compute_crc32(&self) -> u32 {
        let mut copy = *self;
        copy.header_crc32.set(0);
        crc32fast::hash(copy.as_bytes())
    }

    /// Refreshes `header_crc32`; `entries_crc32` must already be correct.
    pub fn update_checksum(&mut self) {
        let crc = self.compute_crc32();
        self.header_crc32.set(crc);
    }

    /// Blocks occupied by the entry array described by this header.
    pub fn table_blocks(&self, block_size: u64) -> u64 {
        table_blocks(self.num_entries.get(), self.entry_size.get(), block_size)
    }

    /// Highest LBA holding either header copy.
    #[inline]
    pub fn last_header_lba(&self) -> u64 {
        self.backup_lba.get().max(self.current_lba.get())
    }

    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }
}

#[inline]
pub(crate) fn table_blocks(entries: u32, entry_size: u32, block_size: u64) -> u64 {
    (entries as u64 * entry_size as u64).div_ceil(block_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_default_layout() {
        let h = GptHeader::create(100 * 512, 512, 0, DEFAULT_PARTITION_ENTRIES).unwrap();
        assert_eq!(h.signature, SIGNATURE_EFI);
        assert_eq!(h.revision, REVISION);
        assert_eq!(h.header_size.get(), 92);
        assert_eq!(h.current_lba.get(), 1);
        assert_eq!(h.backup_lba.get(), 99);
        assert_eq!(h.first_usable_lba.get(), 34);
        assert_eq!(h.last_usable_lba.get(), 66);
        assert_eq!(h.entries_lba.get(), 2);
        assert_eq!(h.table_blocks(512), 32);
        assert!(!h.disk_guid.is_nil());
    }

    #[test]
    fn create_with_padding_and_4k_blocks() {
        let h = GptHeader::create(64 * 4096, 4096, 2, DEFAULT_PARTITION_ENTRIES).unwrap();
        assert_eq!(h.entries_lba.get(), 4);
        assert_eq!(h.table_blocks(4096), 4);
        assert_eq!(h.first_usable_lba.get(), 8);
        assert_eq!(h.last_usable_lba.get(), 64 - 4 - 4);
    }

    #[test]
    fn create_rejects_tiny_disks() {
        let err = GptHeader::create(40 * 512, 512, 0, DEFAULT_PARTITION_ENTRIES).unwrap_err();
        assert!(matches!(err, GptError::Capacity(CapacityError::TooSmall { .. })));
    }

    #[test]
    fn checksum_ignores_its_own_field() {
        let mut h = GptHeader::create(100 * 512, 512, 0, 128).unwrap();
        h.update_checksum();
        let crc = h.header_crc32.get();
        assert_ne!(crc, 0);
        assert_eq!(h.compute_crc32(), crc);
        h.update_checksum();
        assert_eq!(h.header_crc32.get(), crc);
        h.last_usable_lba.set(65);
        assert_ne!(h.compute_crc32(), crc);
    }
}
