// SPDX-License-Identifier: MIT

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rimio::prelude::*;

use super::*;
use crate::guid::Guid;
use crate::log_debug;
use crate::partition::GptPartition;

const SYS_BLOCK: &str = "/sys/block";

/// Locate partitions by type, unique GUID or label.
///
/// Without `drive` every block device under `/sys/block` is scanned and devices without
/// a readable table are skipped. Exits with 1 when nothing matched, or when more than one
/// matched with `single_match`.
#[derive(Debug, Clone, Default)]
pub struct FindCommand {
    pub drive: Option<PathBuf>,
    pub type_guid: Option<Guid>,
    pub unique_guid: Option<Guid>,
    pub label: Option<String>,
    pub numeric: bool,
    pub single_match: bool,
    /// Partition data must also start with this file's content (at `offset`).
    pub match_file: Option<PathBuf>,
    pub offset: u64,
}

impl FindCommand {
    fn matches(&self, p: &GptPartition) -> bool {
        !p.is_unused()
            && self.label.as_ref().is_none_or(|l| *l == p.label())
            && self.unique_guid.is_none_or(|g| g == p.unique_guid)
            && self.type_guid.is_none_or(|g| g == p.type_guid)
    }

    fn drives(&self) -> GptResult<Vec<PathBuf>> {
        if let Some(drive) = &self.drive {
            return Ok(vec![drive.clone()]);
        }
        let mut drives = Vec::new();
        for entry in fs::read_dir(SYS_BLOCK)? {
            let entry = entry?;
            drives.push(Path::new("/dev").join(entry.file_name()));
        }
        drives.sort();
        Ok(drives)
    }

    /// Searches one drive, printing each hit. Returns the number of hits.
    fn search(&self, drive: &Path, pattern: Option<&[u8]>, out: &mut dyn Write) -> GptResult<usize> {
        let name = image_name(drive);
        let mut file = open_image(drive, false)?;
        let mut io = StdRimIO::new(&mut file);
        let gpt = Gpt::load(&mut io, &name)?;

        let mut found = 0;
        for (number, p) in gpt.used_partitions() {
            if !self.matches(p) {
                continue;
            }
            if let Some(pattern) = pattern {
                let Some(offset) = p
                    .offset(gpt.block_size)
                    .ok()
                    .and_then(|start| start.checked_add(self.offset))
                else {
                    log_debug!("{} offset out of range", gpt.partition_ref(number));
                    continue;
                };
                let mut buf = vec![0u8; pattern.len()];
                if let Err(e) = io.read_at(offset, &mut buf) {
                    log_debug!("Cannot read {}: {e}", gpt.partition_ref(number));
                    continue;
                }
                if buf != pattern {
                    continue;
                }
            }
            found += 1;
            if self.numeric {
                writeln!(out, "{number}")?;
            } else {
                writeln!(out, "{}", device_name(&name, number))?;
            }
        }
        Ok(found)
    }
}

/// `/dev/sda` + 3 is `/dev/sda3`, `/dev/mmcblk0` + 3 is `/dev/mmcblk0p3`.
pub fn device_name(image: &str, number: u32) -> String {
    let sep = if image.ends_with(|c: char| c.is_ascii_digit()) {
        "p"
    } else {
        ""
    };
    format!("{image}{sep}{number}")
}

impl SubCommand for FindCommand {
    fn name(&self) -> &'static str {
        "find"
    }

    fn execute(&self, out: &mut dyn Write) -> GptResult<Outcome> {
        if self.type_guid.is_none() && self.unique_guid.is_none() && self.label.is_none() {
            return Err(
                UsageError::Invalid("You must specify at least one of -t, -u, or -l").into(),
            );
        }

        let pattern = match &self.match_file {
            Some(path) => Some(fs::read(path)?),
            None => None,
        };

        let mut found = 0;
        for drive in self.drives()? {
            match self.search(&drive, pattern.as_deref(), out) {
                Ok(n) => found += n,
                Err(e) if self.drive.is_none() => {
                    log_debug!("Skipping {}: {e}", drive.display());
                }
                Err(e) => return Err(e),
            }
        }

        let failed = found < 1 || (self.single_match && found > 1);
        Ok(Outcome::Exit(failed as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::GptName;
    use crate::guids::TYPE_GUID_DATA;

    #[test]
    fn device_names() {
        assert_eq!(device_name("/dev/sda", 3), "/dev/sda3");
        assert_eq!(device_name("/dev/mmcblk0", 3), "/dev/mmcblk0p3");
        assert_eq!(device_name("disk.bin", 1), "disk.bin1");
    }

    #[test]
    fn criteria_are_combined() {
        let mut p = GptPartition::empty();
        let by_label = FindCommand {
            label: Some("STATE".into()),
            ..FindCommand::default()
        };
        assert!(!by_label.matches(&p));

        p.type_guid = TYPE_GUID_DATA;
        p.name = GptName::encode("STATE").unwrap();
        assert!(by_label.matches(&p));

        let both = FindCommand {
            type_guid: Some(TYPE_GUID_DATA),
            unique_guid: Some(Guid::random()),
            ..by_label.clone()
        };
        assert!(!both.matches(&p));
    }

    #[test]
    fn needs_a_criterion() {
        let err = FindCommand::default()
            .execute(&mut std::io::sink())
            .unwrap_err();
        assert!(matches!(err, GptError::Usage(UsageError::Invalid(_))));
    }
}
