// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use rimio::prelude::*;
use zerocopy::{FromBytes, IntoBytes};

use crate::errors::*;
use crate::guid::Guid;
use crate::header::*;
use crate::io_ext::RimIOLbaExt;
use crate::partition::{GptPartition, PARTITION_ENTRY_SIZE, partition_ref};
use crate::pmbr::{PMBR_SIZE, ProtectiveMbr};
use crate::{log_debug, log_info, log_verbose};

pub const DEFAULT_BLOCK_SIZE: u64 = 512;
/// Block sizes probed on plain images, in order.
pub const PROBE_BLOCK_SIZES: [u64; 2] = [DEFAULT_BLOCK_SIZE, 4096];

/// A decoded partition table together with where it came from.
///
/// `header` is the copy the table was loaded from: when `is_secondary` is set it is the
/// backup header, and writes only refresh that copy.
#[derive(Debug, Clone)]
pub struct Gpt {
    pub header: GptHeader,
    pub partitions: Vec<GptPartition>,
    pub pmbr: Option<ProtectiveMbr>,
    pub block_size: u64,
    pub is_secondary: bool,
    /// Image name used in messages (`<image>#<n>`).
    pub image: String,
}

impl Gpt {
    /// New in-memory table for a disk of `size` bytes; nothing is written.
    pub fn create(
        image: &str,
        size: u64,
        block_size: u64,
        pad_blocks: u64,
        entries: u32,
    ) -> GptResult<Self> {
        let header = GptHeader::create(size, block_size, pad_blocks, entries)?;
        Ok(Self {
            header,
            partitions: vec![GptPartition::empty(); entries as usize],
            pmbr: None,
            block_size,
            is_secondary: false,
            image: image.to_string(),
        })
    }

    /// Decodes the table stored in `io`.
    ///
    /// Block devices are probed at their logical block size only, plain images at 512 then
    /// 4096. For each size the primary header (LBA 1) is tried before the last block, so an
    /// ignored or damaged primary falls back to the backup copy at the same block size.
    pub fn load<IO: RimIOGeometry + ?Sized>(io: &mut IO, image: &str) -> GptResult<Self> {
        let size = io.size()?;

        let mut pmbr = None;
        if size >= PMBR_SIZE as u64 {
            let mbr: ProtectiveMbr = io.read_struct(0)?;
            if mbr.is_protective() {
                log_debug!("Found PMBR in {image}");
                pmbr = Some(mbr);
            }
        }

        let block_sizes = match io.logical_block_size()? {
            Some(bs) => vec![bs],
            None => PROBE_BLOCK_SIZES.to_vec(),
        };

        let (header, block_size, is_secondary) = probe_header(io, size, &block_sizes)?
            .ok_or(GptError::Decode("Invalid signature in GPT header."))?;
        log_debug!(
            "Found GPT header in {image} (block size {block_size}, secondary={is_secondary})"
        );

        if header.entry_size.get() as usize != PARTITION_ENTRY_SIZE {
            return Err(GptError::Decode("Unsupported PartitionEntrySize in GPT header."));
        }
        let count = header.num_entries.get();
        if count == 0 || count > MAX_PARTITION_ENTRIES {
            return Err(GptError::Decode("PartitionEntriesNumber out of range in GPT header."));
        }

        let raw = io.read_vec_at_lba(
            header.entries_lba.get(),
            block_size,
            count as usize * PARTITION_ENTRY_SIZE,
        )?;
        let partitions = raw
            .chunks_exact(PARTITION_ENTRY_SIZE)
            .map(|chunk| {
                GptPartition::read_from_bytes(chunk)
                    .map_err(|_| GptError::Decode("Invalid partition entry."))
            })
            .collect::<GptResult<Vec<_>>>()?;

        Ok(Self {
            header,
            partitions,
            pmbr,
            block_size,
            is_secondary,
            image: image.to_string(),
        })
    }

    /// Partition by 1-based number.
    pub fn partition(&self, number: u32) -> GptResult<&GptPartition> {
        self.index(number).map(|i| &self.partitions[i])
    }

    pub fn partition_mut(&mut self, number: u32) -> GptResult<&mut GptPartition> {
        let i = self.index(number)?;
        Ok(&mut self.partitions[i])
    }

    /// Copies `entry` into slot `number`.
    pub fn update_partition(&mut self, entry: &GptPartition, number: u32) -> GptResult {
        *self.partition_mut(number)? = *entry;
        Ok(())
    }

    fn index(&self, number: u32) -> GptResult<usize> {
        if number == 0 || number as usize > self.partitions.len() {
            return Err(UsageError::InvalidPartitionNumber(number).into());
        }
        Ok(number as usize - 1)
    }

    /// `<image>#<number>`.
    pub fn partition_ref(&self, number: u32) -> String {
        partition_ref(&self.image, number)
    }

    /// Used entries with their 1-based numbers.
    pub fn used_partitions(&self) -> impl Iterator<Item = (u32, &GptPartition)> {
        self.partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_unused())
            .map(|(i, p)| (i as u32 + 1, p))
    }

    /// Highest LastLBA of any used entry, or FirstUsableLBA - 1 when the table is empty.
    pub fn max_used_lba(&self) -> u64 {
        self.used_partitions()
            .map(|(_, p)| p.last_lba.get())
            .max()
            .unwrap_or_else(|| self.header.first_usable_lba.get().saturating_sub(1))
    }

    pub fn table_blocks(&self) -> u64 {
        self.header.table_blocks(self.block_size)
    }

    /// Disk size implied by the header: block size times (last header LBA + 1).
    pub fn disk_size(&self) -> GptResult<u64> {
        self.header
            .last_header_lba()
            .checked_add(1)
            .and_then(|blocks| blocks.checked_mul(self.block_size))
            .ok_or(CapacityError::Overflow("Disk size implied by the GPT header").into())
    }

    /// Bytes between the end of the last used partition and LastUsableLBA.
    pub fn free_space(&self) -> u64 {
        let last_usable = self.header.last_usable_lba.get();
        self.block_size
            .saturating_mul(last_usable.saturating_sub(self.max_used_lba()))
    }

    /// Moves the backup metadata so the table describes a disk of `new_size` bytes.
    pub fn resize(&mut self, new_size: u64, check_overlap: bool) -> GptResult {
        let bs = self.block_size;
        if new_size % bs != 0 {
            return Err(CapacityError::Misaligned {
                size: new_size,
                block_size: bs,
            }
            .into());
        }
        let old_size = self.disk_size()?;
        let new_blocks = new_size / bs;
        if old_size == new_size {
            log_verbose!("Image size ({new_size}, LBA={new_blocks}) not changed.");
            return Ok(());
        }
        log_info!(
            "Image size ({new_size}, LBA={new_blocks}) changed from {old_size} (LBA={}).",
            old_size / bs
        );

        let first_usable = self.header.first_usable_lba.get();
        let required = first_usable
            .checked_add(self.table_blocks())
            .and_then(|lba| lba.checked_add(1))
            .ok_or(CapacityError::Overflow("FirstUsableLBA"))?;
        if new_blocks < required {
            return Err(CapacityError::TooSmall {
                blocks: new_blocks,
                required,
            }
            .into());
        }
        let backup_lba = new_blocks - 1;
        let last_usable = backup_lba - first_usable;

        if check_overlap && last_usable < self.header.last_usable_lba.get() {
            let max_used = self.max_used_lba();
            if last_usable < max_used {
                return Err(CapacityError::WouldTruncate {
                    last_usable,
                    max_used,
                }
                .into());
            }
        }

        if self.is_secondary {
            // The loaded copy lives at the end of the disk and moves with it.
            self.header.current_lba.set(backup_lba);
            self.header.entries_lba.set(backup_lba - self.table_blocks());
        } else {
            self.header.backup_lba.set(backup_lba);
        }
        self.header.last_usable_lba.set(last_usable);
        Ok(())
    }

    /// Grows (or shrinks) the last allocated partition up to LastUsableLBA - `reserved_blocks`.
    ///
    /// Returns the size in blocks before and after.
    pub fn expand_partition(&mut self, number: u32, reserved_blocks: u64) -> GptResult<(u64, u64)> {
        let max_used = self.max_used_lba();
        let last_usable = self.header.last_usable_lba.get();
        let name = self.partition_ref(number);
        let p = self.partition_mut(number)?;
        if p.is_unused() {
            return Err(UsageError::PartitionUnused(number).into());
        }
        if max_used > p.last_lba.get() {
            return Err(UsageError::NotLastPartition(number).into());
        }
        let first = p.first_lba.get();
        let new_last = last_usable
            .checked_sub(reserved_blocks)
            .filter(|&last| last >= first)
            .ok_or(CapacityError::NoRoom {
                number,
                first_lba: first,
                last_lba: last_usable.saturating_sub(reserved_blocks),
            })?;

        let old_blocks = p.blocks();
        p.last_lba.set(new_last);
        let new_blocks = p.blocks();
        log_info!("{name} size changed in LBA: {old_blocks} -> {new_blocks}.");
        Ok((old_blocks, new_blocks))
    }

    /// True when `number` is used and ends at the highest used LBA.
    pub fn is_last_partition(&self, number: u32) -> GptResult<bool> {
        let p = self.partition(number)?;
        Ok(!p.is_unused() && self.max_used_lba() == p.last_lba.get())
    }

    pub fn entries_crc32(&self) -> u32 {
        crc32fast::hash(self.partitions.as_bytes())
    }

    /// Refreshes PartitionArrayCRC32, then the header CRC.
    pub fn update_checksum(&mut self) {
        let crc = self.entries_crc32();
        self.header.entries_crc32.set(crc);
        self.header.update_checksum();
    }

    /// The other header copy: CurrentLBA and BackupLBA swapped, entries just before it.
    pub fn backup_header(&self) -> GptHeader {
        let h = &self.header;
        let mut b = *h;
        b.current_lba = h.backup_lba;
        b.backup_lba = h.current_lba;
        b.entries_lba
            .set(h.backup_lba.get().saturating_sub(self.table_blocks()));
        b.update_checksum();
        b
    }

    pub fn check_integrity(&self) -> GptResult {
        let h = &self.header;
        let first_usable = h.first_usable_lba.get();
        let last_usable = h.last_usable_lba.get();
        let entries_first = h.entries_lba.get();
        let entries_last = entries_first
            .saturating_add(self.table_blocks())
            .saturating_sub(1);
        let top = h.last_header_lba();

        let outside_usable = |what: &'static str, lba: u64, outside_entries: bool| {
            if lba < 1 {
                return Err(IntegrityError::BelowFirstLba { what, lba });
            }
            if lba > top {
                return Err(IntegrityError::BeyondLastHeader {
                    what,
                    lba,
                    backup_lba: h.backup_lba.get(),
                });
            }
            if (first_usable..=last_usable).contains(&lba) {
                return Err(IntegrityError::InsideUsable {
                    what,
                    lba,
                    first_usable,
                    last_usable,
                });
            }
            if outside_entries && (entries_first..=entries_last).contains(&lba) {
                return Err(IntegrityError::InsideEntries {
                    what,
                    lba,
                    first: entries_first,
                    last: entries_last,
                });
            }
            Ok(())
        };

        outside_usable("Header", h.current_lba.get(), true)?;
        outside_usable("Backup header", h.backup_lba.get(), true)?;
        outside_usable("Partition entries", entries_first, false)?;
        outside_usable("Partition entries end", entries_last, false)?;

        let mut used: Vec<(u32, &GptPartition)> = self.used_partitions().collect();
        for (number, p) in &used {
            if p.last_lba.get() < p.first_lba.get() {
                return Err(IntegrityError::InvertedRange {
                    number: *number,
                    first_lba: p.first_lba.get(),
                    last_lba: p.last_lba.get(),
                }
                .into());
            }
        }

        used.sort_by_key(|(_, p)| p.first_lba.get());
        for pair in used.windows(2) {
            let (a, pa) = pair[0];
            let (b, pb) = pair[1];
            if pa.last_lba.get() >= pb.first_lba.get() {
                return Err(IntegrityError::Overlap {
                    a,
                    a_first: pa.first_lba.get(),
                    a_last: pa.last_lba.get(),
                    b,
                    b_first: pb.first_lba.get(),
                    b_last: pb.last_lba.get(),
                }
                .into());
            }
        }
        if let Some(&(number, p)) = used.first() {
            if p.first_lba.get() < first_usable {
                return Err(IntegrityError::BeforeFirstUsable {
                    number,
                    first_lba: p.first_lba.get(),
                    first_usable,
                }
                .into());
            }
        }
        if let Some(&(number, p)) = used.last() {
            if p.last_lba.get() > last_usable {
                return Err(IntegrityError::AfterLastUsable {
                    number,
                    last_lba: p.last_lba.get(),
                    last_usable,
                }
                .into());
            }
        }

        let unique: HashSet<Guid> = used.iter().map(|(_, p)| p.unique_guid).collect();
        if unique.len() != used.len() {
            return Err(IntegrityError::DuplicateUniqueGuid.into());
        }

        let computed = self.entries_crc32();
        if computed != h.entries_crc32.get() {
            return Err(IntegrityError::EntriesCrc {
                stored: h.entries_crc32.get(),
                computed,
            }
            .into());
        }
        let computed = h.compute_crc32();
        if computed != h.header_crc32.get() {
            return Err(IntegrityError::HeaderCrc {
                stored: h.header_crc32.get(),
                computed,
            }
            .into());
        }
        Ok(())
    }

    /// Refreshes checksums, validates, then writes the loaded copy and, unless the table
    /// came from the backup, the backup entries and header too.
    pub fn write<IO: RimIO + ?Sized>(&mut self, io: &mut IO) -> GptResult {
        self.update_checksum();
        self.check_integrity()?;

        let bs = self.block_size;
        let parts = self.partitions.as_bytes();
        let h = &self.header;
        io.write_region("GPT Header", h.current_lba.get(), bs, h.as_bytes())?;
        io.write_region("GPT Partitions", h.entries_lba.get(), bs, parts)?;
        log_verbose!(
            "Usable LBA: First={}, Last={}",
            h.first_usable_lba.get(),
            h.last_usable_lba.get()
        );

        if !self.is_secondary {
            let backup = self.backup_header();
            io.write_region("Backup Partitions", backup.entries_lba.get(), bs, parts)?;
            io.write_region("Backup Header", backup.current_lba.get(), bs, backup.as_bytes())?;
        }
        io.flush()?;
        Ok(())
    }

    /// Rewrites sector 0.
    ///
    /// With `create` the PMBR is rebuilt around the current boot code. `boot_code`, when
    /// non-empty, replaces the boot code; `boot_guid` replaces the boot GUID.
    pub fn write_protective_mbr<IO: RimIOGeometry + ?Sized>(
        io: &mut IO,
        create: bool,
        boot_code: Option<&[u8]>,
        boot_guid: Option<Guid>,
    ) -> GptResult<ProtectiveMbr> {
        let mut pmbr: ProtectiveMbr = io.read_struct(0)?;
        if create {
            let size = io.size()?;
            pmbr.make_protective(size);
        }
        if let Some(code) = boot_code.filter(|c| !c.is_empty()) {
            pmbr.set_boot_code(code);
        }
        if let Some(guid) = boot_guid {
            pmbr.boot_guid = guid;
        }
        io.write_struct(0, &pmbr)?;
        io.flush()?;
        Ok(pmbr)
    }
}

fn probe_header<IO: RimIO + ?Sized>(
    io: &mut IO,
    size: u64,
    block_sizes: &[u64],
) -> GptResult<Option<(GptHeader, u64, bool)>> {
    for &bs in block_sizes {
        if bs == 0 || size < 2 * bs {
            continue;
        }
        let candidates = [(PRIMARY_HEADER_LBA, false), (size / bs - 1, true)];
        for (lba, secondary) in candidates {
            let header: GptHeader = io.read_struct_lba(lba, bs)?;
            if header.has_valid_signature() {
                return Ok(Some((header, bs, secondary)));
            }
            log_debug!(
                "No GPT signature at LBA {lba} (block size {bs}): {:?}",
                header.signature_str()
            );
        }
    }
    Ok(None)
}
