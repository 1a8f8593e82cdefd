// SPDX-License-Identifier: MIT

use std::io::Write;
use std::path::{Path, PathBuf};

use rimio::prelude::*;

use super::*;
use crate::attrs::{LEGACY_BOOT, PRIORITY, RAW_16, REQUIRED, SUCCESSFUL, TRIES};
use crate::codec::GptName;
use crate::guid::Guid;
use crate::guids::{TYPE_GUID_DATA, TYPE_GUID_UNUSED};
use crate::partition::GptPartition;
use crate::{log_info, log_verbose};

/// Add, edit or remove a partition entry.
///
/// Without `number` the first unused entry is taken. A new entry starts right after the
/// last used LBA, spans up to LastUsableLBA, gets a random unique GUID and the `data`
/// type; any option given then overrides those defaults. Setting the type to `unused`
/// wipes the entry.
#[derive(Debug, Clone, Default)]
pub struct AddCommand {
    pub image: PathBuf,
    pub number: Option<u32>,
    pub begin: Option<u64>,
    pub sectors: Option<u64>,
    pub type_guid: Option<Guid>,
    pub unique_guid: Option<Guid>,
    pub label: Option<String>,
    pub successful: Option<u64>,
    pub tries: Option<u64>,
    pub priority: Option<u64>,
    pub required: Option<u64>,
    pub legacy_boot: Option<u64>,
    /// Bits 48..63 of the attributes as one value.
    pub raw_16: Option<u64>,
}

impl AddCommand {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Applies the requested changes to `part`, which is entry `number` of `gpt`.
    fn apply(&self, gpt: &Gpt, number: u32, part: &mut GptPartition) -> GptResult {
        if part.is_unused() {
            *part = GptPartition::empty();
            part.first_lba.set(gpt.max_used_lba() + 1);
            part.last_lba.set(gpt.header.last_usable_lba.get());
            part.unique_guid = Guid::random();
            part.type_guid = TYPE_GUID_DATA;
        }

        let attrs = [
            (LEGACY_BOOT, self.legacy_boot),
            (REQUIRED, self.required),
            (PRIORITY, self.priority),
            (TRIES, self.tries),
            (SUCCESSFUL, self.successful),
            (RAW_16, self.raw_16),
        ];
        for (field, value) in attrs {
            if let Some(value) = value {
                part.attributes.set(field, value)?;
            }
        }

        let first = self.begin.unwrap_or(part.first_lba.get());
        let blocks = self.sectors.unwrap_or(part.blocks());
        let last = first
            .checked_add(blocks)
            .and_then(|end| end.checked_sub(1))
            .ok_or(CapacityError::NoRoom {
                number,
                first_lba: first,
                last_lba: 0,
            })?;
        part.first_lba.set(first);
        part.last_lba.set(last);

        if let Some(label) = &self.label {
            part.name = GptName::encode(label)?;
        }
        if let Some(guid) = self.type_guid {
            part.type_guid = guid;
        }
        if let Some(guid) = self.unique_guid {
            part.unique_guid = guid;
        }

        if part.is_unused() {
            *part = GptPartition::empty();
        }
        Ok(())
    }
}

impl SubCommand for AddCommand {
    fn name(&self) -> &'static str {
        "add"
    }

    fn execute(&self, _out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);
        let mut gpt = Gpt::load(&mut io, &name)?;

        let number = match self.number {
            Some(n) => n,
            None => gpt
                .partitions
                .iter()
                .position(|p| p.is_unused())
                .map(|i| i as u32 + 1)
                .ok_or(UsageError::NoFreeEntry)?,
        };

        let mut part = *gpt.partition(number)?;
        let is_new = part.is_unused();
        self.apply(&gpt, number, &mut part)?;
        gpt.update_partition(&part, number)?;
        gpt.write(&mut io)?;
        log_verbose!("Free space left: {} bytes", gpt.free_space());

        let part_ref = gpt.partition_ref(number);
        if part.is_unused() {
            return Ok(Outcome::Message(format!("Deleted (zeroed) {part_ref}.")));
        }
        let verb = if is_new { "Added" } else { "Modified" };
        Ok(Outcome::Message(format!(
            "{verb} {part_ref} ({}+{}).",
            part.first_lba.get(),
            part.blocks()
        )))
    }
}

/// Wipes entry `number` of `image` (same as `add -i <number> -t unused`).
pub fn remove_partition(image: &Path, number: u32) -> GptResult<Outcome> {
    log_info!("Removing partition {number}...");
    let cmd = AddCommand {
        number: Some(number),
        type_guid: Some(TYPE_GUID_UNUSED),
        ..AddCommand::new(image)
    };
    cmd.execute(&mut std::io::sink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guids::TYPE_GUID_KERNEL;

    fn empty_table() -> Gpt {
        Gpt::create("disk", 100 * 512, 512, 0, 128).unwrap()
    }

    #[test]
    fn new_entry_defaults() {
        let gpt = empty_table();
        let mut part = GptPartition::empty();
        AddCommand::new("disk").apply(&gpt, 1, &mut part).unwrap();
        assert_eq!(part.type_guid, TYPE_GUID_DATA);
        assert_eq!(part.first_lba.get(), 34);
        assert_eq!(part.last_lba.get(), 66);
        assert!(!part.unique_guid.is_nil());
    }

    #[test]
    fn options_override_defaults() {
        let gpt = empty_table();
        let mut part = GptPartition::empty();
        let cmd = AddCommand {
            begin: Some(40),
            sectors: Some(10),
            type_guid: Some(TYPE_GUID_KERNEL),
            label: Some("KERN-A".into()),
            priority: Some(2),
            tries: Some(15),
            required: Some(1),
            ..AddCommand::new("disk")
        };
        cmd.apply(&gpt, 1, &mut part).unwrap();
        assert_eq!(part.first_lba.get(), 40);
        assert_eq!(part.last_lba.get(), 49);
        assert!(part.is_chromeos_kernel());
        assert_eq!(part.label(), "KERN-A");
        assert_eq!(part.attributes.priority(), 2);
        assert_eq!(part.attributes.tries(), 15);
        assert!(part.attributes.required());
    }

    #[test]
    fn raw_16_is_applied_last() {
        let gpt = empty_table();
        let mut part = GptPartition::empty();
        let cmd = AddCommand {
            priority: Some(3),
            raw_16: Some(0x0105),
            ..AddCommand::new("disk")
        };
        cmd.apply(&gpt, 1, &mut part).unwrap();
        assert_eq!(part.attributes.raw_16(), 0x0105);
        assert_eq!(part.attributes.priority(), 5);
        assert!(part.attributes.successful());
    }

    #[test]
    fn unused_type_wipes_entry() {
        let gpt = empty_table();
        let mut part = GptPartition::empty();
        part.type_guid = TYPE_GUID_DATA;
        part.first_lba.set(34);
        part.last_lba.set(40);
        part.name = GptName::encode("STATE").unwrap();
        let cmd = AddCommand {
            type_guid: Some(TYPE_GUID_UNUSED),
            ..AddCommand::new("disk")
        };
        cmd.apply(&gpt, 1, &mut part).unwrap();
        assert_eq!(part, GptPartition::empty());
    }

    #[test]
    fn bad_attribute_values_are_rejected() {
        let gpt = empty_table();
        let mut part = GptPartition::empty();
        let cmd = AddCommand {
            successful: Some(2),
            ..AddCommand::new("disk")
        };
        assert!(matches!(
            cmd.apply(&gpt, 1, &mut part).unwrap_err(),
            GptError::Usage(UsageError::ValueOutOfRange { field: "successful", .. })
        ));
    }
}
