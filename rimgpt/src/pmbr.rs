// SPDX-License-Identifier: MIT

use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::codec::encode_truncated;
use crate::guid::Guid;
use crate::log_info;

pub const PMBR_SIZE: usize = 512;
pub const BOOT_CODE_SIZE: usize = 424;
pub const SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const MAGIC: [u8; 2] = [0x1D, 0x9A];
pub const PROTECTIVE_GPT: u8 = 0xEE;

/// Legacy partition slot, 16 bytes.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq, Default)]
#[repr(C)]
pub struct MbrEntry {
    pub boot_flag: u8,
    pub start_chs: [u8; 3],
    pub part_type: u8,
    pub end_chs: [u8; 3],
    pub start_lba: U32<LittleEndian>,
    pub sectors: U32<LittleEndian>,
}

impl MbrEntry {
    /// The single 0xEE entry covering the disk, with the fixed CHS values cgpt writes.
    pub fn protective(sectors: u32) -> Self {
        Self {
            boot_flag: 0x00,
            start_chs: [0x00, 0x02, 0x00],
            part_type: PROTECTIVE_GPT,
            end_chs: [0xFF, 0xFF, 0xFF],
            start_lba: U32::new(1),
            sectors: U32::new(sectors),
        }
    }
}

/// Protective MBR in the syslinux/cgpt flavour: boot code, boot GUID, disk id, magic,
/// four legacy slots and the 55 AA signature.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct ProtectiveMbr {
    pub boot_code: [u8; BOOT_CODE_SIZE],
    pub boot_guid: Guid,
    pub disk_id: U32<LittleEndian>,
    pub magic: [u8; 2],
    pub parts: [MbrEntry; 4],
    pub signature: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<ProtectiveMbr>() == PMBR_SIZE);

impl ProtectiveMbr {
    /// A PMBR is recognised only when both the MBR signature and the boot magic are present.
    pub fn is_protective(&self) -> bool {
        self.signature == SIGNATURE && self.magic == MAGIC
    }

    /// Resets every field but the boot code for a disk of `image_size` bytes.
    ///
    /// The sector count is `min(2^32, image_size / 512) - 1`.
    pub fn make_protective(&mut self, image_size: u64) {
        let sectors = (image_size / PMBR_SIZE as u64).min(1 << 32).saturating_sub(1);
        self.boot_guid = Guid::NIL;
        self.disk_id.set(0);
        self.magic = MAGIC;
        self.parts = [MbrEntry::default(); 4];
        self.parts[0] = MbrEntry::protective(sectors as u32);
        self.signature = SIGNATURE;
    }

    /// Installs `code`, truncated to the boot code area and zero padded.
    pub fn set_boot_code(&mut self, code: &[u8]) {
        if code.len() > BOOT_CODE_SIZE {
            log_info!("Bootcode is larger ({} > {})!", code.len(), BOOT_CODE_SIZE);
        }
        self.boot_code = encode_truncated(code);
    }

    pub fn empty() -> Self {
        Self::new_zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_protective_layout() {
        let mut pmbr = ProtectiveMbr::empty();
        assert!(!pmbr.is_protective());
        pmbr.make_protective(100 * 512);
        assert!(pmbr.is_protective());
        let bytes = pmbr.as_bytes();
        assert_eq!(&bytes[440..446], &[0, 0, 0, 0, 0x1D, 0x9A]);
        assert_eq!(
            &bytes[446..462],
            &[0x00, 0x00, 0x02, 0x00, 0xEE, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0, 99, 0, 0, 0]
        );
        assert!(bytes[462..510].iter().all(|&b| b == 0));
        assert_eq!(&bytes[510..512], &[0x55, 0xAA]);
    }

    #[test]
    fn sector_count_is_capped() {
        let mut pmbr = ProtectiveMbr::empty();
        pmbr.make_protective(u64::MAX);
        assert_eq!(pmbr.parts[0].sectors.get(), u32::MAX);
    }

    #[test]
    fn boot_code_is_truncated_and_padded() {
        let mut pmbr = ProtectiveMbr::empty();
        pmbr.boot_code = [0xCC; BOOT_CODE_SIZE];
        pmbr.set_boot_code(b"\xEB\x63");
        assert_eq!(&pmbr.boot_code[..3], &[0xEB, 0x63, 0x00]);
        pmbr.set_boot_code(&[0x90; 1000]);
        assert!(pmbr.boot_code.iter().all(|&b| b == 0x90));
        assert_eq!(pmbr.as_bytes()[BOOT_CODE_SIZE], 0);
    }
}
