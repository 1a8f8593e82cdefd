// SPDX-License-Identifier: MIT

use core::fmt;

use rimio::errors::*;

/// Unified error type for GPT tools.
#[derive(Debug)]
pub enum GptError {
    IO(RimIOError),
    /// No valid header signature at any probed location.
    Decode(&'static str),
    Integrity(IntegrityError),
    Usage(UsageError),
    Capacity(CapacityError),
}

/// The decoded table breaks one of the on-disk invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    BelowFirstLba {
        what: &'static str,
        lba: u64,
    },
    BeyondLastHeader {
        what: &'static str,
        lba: u64,
        backup_lba: u64,
    },
    InsideUsable {
        what: &'static str,
        lba: u64,
        first_usable: u64,
        last_usable: u64,
    },
    InsideEntries {
        what: &'static str,
        lba: u64,
        first: u64,
        last: u64,
    },
    InvertedRange {
        number: u32,
        first_lba: u64,
        last_lba: u64,
    },
    Overlap {
        a: u32,
        a_first: u64,
        a_last: u64,
        b: u32,
        b_first: u64,
        b_last: u64,
    },
    BeforeFirstUsable {
        number: u32,
        first_lba: u64,
        first_usable: u64,
    },
    AfterLastUsable {
        number: u32,
        last_lba: u64,
        last_usable: u64,
    },
    DuplicateUniqueGuid,
    EntriesCrc {
        stored: u32,
        computed: u32,
    },
    HeaderCrc {
        stored: u32,
        computed: u32,
    },
}

/// Invalid request from the caller (bad partition number, contradictory options...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    InvalidPartitionNumber(u32),
    PartitionUnused(u32),
    NotLastPartition(u32),
    NotChromeOsKernel(u32),
    NoFreeEntry,
    PrimaryAlreadyIgnored,
    InvalidGuid(String),
    ValueOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    Invalid(&'static str),
}

/// The table does not fit the requested geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    Misaligned {
        size: u64,
        block_size: u64,
    },
    WouldTruncate {
        last_usable: u64,
        max_used: u64,
    },
    TooSmall {
        blocks: u64,
        required: u64,
    },
    NoRoom {
        number: u32,
        first_lba: u64,
        last_lba: u64,
    },
    /// An LBA or byte offset derived from the table does not fit in 64 bits.
    Overflow(&'static str),
}

impl GptError {
    pub fn kind(&self) -> &'static str {
        match self {
            GptError::IO(_) => "I/O error",
            GptError::Decode(_) => "Decode error",
            GptError::Integrity(_) => "Integrity error",
            GptError::Usage(_) => "Usage error",
            GptError::Capacity(_) => "Capacity error",
        }
    }

    #[inline]
    pub fn is_integrity(&self) -> bool {
        matches!(self, GptError::Integrity(_))
    }
}

impl From<RimIOError> for GptError {
    fn from(e: RimIOError) -> Self {
        GptError::IO(e)
    }
}

impl From<std::io::Error> for GptError {
    fn from(e: std::io::Error) -> Self {
        GptError::IO(e.into())
    }
}

impl From<IntegrityError> for GptError {
    fn from(e: IntegrityError) -> Self {
        GptError::Integrity(e)
    }
}

impl From<UsageError> for GptError {
    fn from(e: UsageError) -> Self {
        GptError::Usage(e)
    }
}

impl From<CapacityError> for GptError {
    fn from(e: CapacityError) -> Self {
        GptError::Capacity(e)
    }
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::BelowFirstLba { what, lba } => {
                write!(f, "{what} should not live in LBA {lba}")
            }
            IntegrityError::BeyondLastHeader {
                what,
                lba,
                backup_lba,
            } => write!(
                f,
                "{what} ({lba}) should not be larger than BackupLBA ({backup_lba})"
            ),
            IntegrityError::InsideUsable {
                what,
                lba,
                first_usable,
                last_usable,
            } => write!(
                f,
                "{what} ({lba}) should not be included in usable LBAs [{first_usable},{last_usable}]"
            ),
            IntegrityError::InsideEntries {
                what,
                lba,
                first,
                last,
            } => write!(
                f,
                "{what} ({lba}) should be outside partition entries [{first},{last}]"
            ),
            IntegrityError::InvertedRange {
                number,
                first_lba,
                last_lba,
            } => write!(
                f,
                "Partition {number} ends ({last_lba}) before it starts ({first_lba})"
            ),
            IntegrityError::Overlap {
                a,
                a_first,
                a_last,
                b,
                b_first,
                b_last,
            } => write!(
                f,
                "Overlap in partition entries: [{a_first},{a_last}]#{a}, [{b_first},{b_last}]#{b}"
            ),
            IntegrityError::BeforeFirstUsable {
                number,
                first_lba,
                first_usable,
            } => write!(
                f,
                "Partition {number} must not go earlier ({first_lba}) than FirstUsableLBA={first_usable}"
            ),
            IntegrityError::AfterLastUsable {
                number,
                last_lba,
                last_usable,
            } => write!(
                f,
                "Partition {number} must not go further ({last_lba}) than LastUsableLBA={last_usable}"
            ),
            IntegrityError::DuplicateUniqueGuid => write!(f, "Partition UniqueGUIDs are duplicated"),
            IntegrityError::EntriesCrc { stored, computed } => write!(
                f,
                "GPT Header PartitionArrayCRC32 does not match (stored {stored:#010x}, computed {computed:#010x})"
            ),
            IntegrityError::HeaderCrc { stored, computed } => write!(
                f,
                "GPT Header CRC32 does not match (stored {stored:#010x}, computed {computed:#010x})"
            ),
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::InvalidPartitionNumber(n) => write!(f, "Invalid partition number {n}"),
            UsageError::PartitionUnused(n) => write!(f, "Partition {n} is unused"),
            UsageError::NotLastPartition(n) => {
                write!(f, "Cannot expand partition {n} because it is not allocated at last")
            }
            UsageError::NotChromeOsKernel(n) => write!(f, "Partition {n} is not a ChromeOS kernel"),
            UsageError::NoFreeEntry => write!(f, "No unused partition entry left"),
            UsageError::PrimaryAlreadyIgnored => {
                write!(f, "Sorry, the disk already has primary GPT ignored")
            }
            UsageError::InvalidGuid(s) => write!(f, "Invalid GUID or type alias: {s:?}"),
            UsageError::ValueOutOfRange { field, value, max } => {
                write!(f, "Value {value} out of range for {field} (max {max})")
            }
            UsageError::TooLong { field, len, max } => write!(
                f,
                "Value of {len} bytes cannot be packed into field {field} (len={max})"
            ),
            UsageError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityError::Misaligned { size, block_size } => write!(
                f,
                "New file size {size} is not valid for image files (block size {block_size})"
            ),
            CapacityError::WouldTruncate {
                last_usable,
                max_used,
            } => write!(
                f,
                "Backup partition tables will overlap used partitions (LastUsableLBA {last_usable} < {max_used})"
            ),
            CapacityError::TooSmall { blocks, required } => write!(
                f,
                "Disk of {blocks} blocks is too small for GPT metadata (needs more than {required})"
            ),
            CapacityError::NoRoom {
                number,
                first_lba,
                last_lba,
            } => write!(
                f,
                "Partition {number} would end ({last_lba}) before it starts ({first_lba})"
            ),
            CapacityError::Overflow(what) => write!(f, "{what} is out of range"),
        }
    }
}

impl fmt::Display for GptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GptError::IO(e) => write!(f, "{e}"),
            GptError::Decode(msg) => write!(f, "{msg}"),
            GptError::Integrity(e) => write!(f, "{e}"),
            GptError::Usage(e) => write!(f, "{e}"),
            GptError::Capacity(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GptError::IO(e) => Some(e),
            _ => None,
        }
    }
}

pub type GptResult<T = ()> = Result<T, GptError>;
