// SPDX-License-Identifier: MIT

use crate::define_partition_types;
use crate::errors::*;
use crate::guid::Guid;

define_partition_types! {
    Unused => "unused", "Unused",
        Guid::NIL,
    Stateful => "stateful", "Basic data stateful",
        Guid::from_fields(0xEBD0A0A2, 0xB9E5, 0x4433, [0x87, 0xC0, 0x68, 0xB6, 0xB7, 0x26, 0x99, 0xC7]),
    Data => "data", "Linux data",
        Guid::from_fields(0x0FC63DAF, 0x8483, 0x4772, [0x8E, 0x79, 0x3D, 0x69, 0xD8, 0x47, 0x7D, 0xE4]),
    Kernel => "kernel", "ChromeOS kernel",
        Guid::from_fields(0xFE3A2A5D, 0x4F32, 0x41A7, [0xB7, 0x25, 0xAC, 0xCC, 0x32, 0x85, 0xA3, 0x09]),
    Rootfs => "rootfs", "ChromeOS rootfs",
        Guid::from_fields(0x3CB8E202, 0x3B7E, 0x47DD, [0x8A, 0x3C, 0x7F, 0xF2, 0xA1, 0x3C, 0xFC, 0xEC]),
    Reserved => "reserved", "ChromeOS reserved",
        Guid::from_fields(0x2E0A753D, 0x9E48, 0x43B0, [0x83, 0x37, 0xB1, 0x51, 0x92, 0xCB, 0x1B, 0x5E]),
    Firmware => "firmware", "ChromeOS firmware",
        Guid::from_fields(0xCAB6E88E, 0xABF3, 0x4102, [0xA0, 0x7A, 0xD4, 0xBB, 0x9B, 0xE3, 0xC1, 0xD3]),
    Efi => "efi", "EFI System Partition",
        Guid::from_fields(0xC12A7328, 0xF81F, 0x11D2, [0xBA, 0x4B, 0x00, 0xA0, 0xC9, 0x3E, 0xC9, 0x3B]),
    Minios => "minios", "ChromeOS MINIOS",
        Guid::from_fields(0x09845860, 0x705F, 0x4BB5, [0xB1, 0x6C, 0x8A, 0x8A, 0x09, 0x9C, 0xAF, 0x52]),
    Hibernate => "hibernate", "ChromeOS hibernate",
        Guid::from_fields(0x3F0F8318, 0xF146, 0x4E6B, [0x82, 0x22, 0xC2, 0x8C, 0x8F, 0x02, 0xE0, 0xD5]),
}

/// Types whose entries carry boot attributes worth printing.
pub const BOOTABLE: &[Guid] = &[TYPE_GUID_KERNEL, TYPE_GUID_EFI];

impl PartitionKind {
    #[inline]
    pub fn is_bootable(&self) -> bool {
        BOOTABLE.contains(&self.as_guid())
    }
}

/// Resolves a `-t` argument: a known alias (any case) or a literal GUID.
pub fn type_guid_from_str(value: &str) -> GptResult<Guid> {
    match PartitionKind::from_alias(value.trim()) {
        Some(kind) => Ok(kind.as_guid()),
        None => value.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_case_insensitive() {
        assert_eq!(type_guid_from_str("kernel").unwrap(), TYPE_GUID_KERNEL);
        assert_eq!(type_guid_from_str("KeRnEl").unwrap(), TYPE_GUID_KERNEL);
        assert_eq!(type_guid_from_str("unused").unwrap(), Guid::NIL);
    }

    #[test]
    fn literal_guid_is_accepted() {
        let g = type_guid_from_str("0fc63daf-8483-4772-8e79-3d69d8477de4").unwrap();
        assert_eq!(g, TYPE_GUID_DATA);
        assert_eq!(PartitionKind::from_guid(&g), PartitionKind::Data);
    }

    #[test]
    fn unknown_text_is_usage_error() {
        let err = type_guid_from_str("bogus").unwrap_err();
        assert!(matches!(err, GptError::Usage(UsageError::InvalidGuid(_))));
    }

    #[test]
    fn display_names() {
        assert_eq!(PartitionKind::Kernel.to_string(), "ChromeOS kernel");
        assert_eq!(PartitionKind::Efi.to_string(), "EFI System Partition");
        assert_eq!(PartitionKind::from_alias("STATEFUL"), Some(PartitionKind::Stateful));
        let other = Guid::from_fields(1, 2, 3, [4; 8]);
        assert_eq!(
            PartitionKind::from_guid(&other).to_string(),
            other.to_string()
        );
        assert_eq!(PartitionKind::Kernel.description(), Some("ChromeOS kernel"));
        assert_eq!(PartitionKind::from_guid(&other).description(), None);
    }

    #[test]
    fn bootable_kinds() {
        assert!(PartitionKind::Kernel.is_bootable());
        assert!(PartitionKind::Efi.is_bootable());
        assert!(!PartitionKind::Rootfs.is_bootable());
    }
}
