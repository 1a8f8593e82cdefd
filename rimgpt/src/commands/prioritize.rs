// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;
use crate::attrs::{MAX_PRIORITY, MAX_TRIES};
use crate::log_verbose;

/// Reorder the priority of all active ChromeOS kernel partitions.
///
/// Kernels keep their relative order and are ranked downwards from the highest priority
/// (`priority`, or the number of distinct active priorities). Lower ranks coalesce at 1;
/// kernels at priority 0 stay inactive unless named with `number`.
#[derive(Debug, Clone, Default)]
pub struct PrioritizeCommand {
    pub image: PathBuf,
    pub priority: Option<u64>,
    /// Kernel to move to the top.
    pub number: Option<u32>,
    /// Move the kernels sharing `number`'s priority along with it.
    pub friends: bool,
}

impl PrioritizeCommand {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Rewrites kernel priorities in `gpt`.
    pub fn reorder(&self, gpt: &mut Gpt) -> GptResult {
        // Group kernels by current priority, keeping table order inside a group.
        let mut groups: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
        for (number, p) in gpt.used_partitions() {
            if p.is_chromeos_kernel() {
                groups
                    .entry(p.attributes.priority())
                    .or_default()
                    .push(number);
            }
        }

        if let Some(number) = self.number {
            let p = gpt.partition(number)?;
            if !p.is_chromeos_kernel() {
                return Err(UsageError::NotChromeOsKernel(number).into());
            }
            let pri = p.attributes.priority();
            // Above every existing group, so it ranks first.
            let top = groups.keys().next_back().map_or(1, |max| max + 1);
            let mut friends = groups.remove(&pri).unwrap_or_default();
            if self.friends {
                groups.insert(top, friends);
            } else {
                friends.retain(|&n| n != number);
                groups.insert(top, vec![number]);
                if !friends.is_empty() {
                    groups.insert(pri, friends);
                }
            }
        }

        groups.remove(&0);

        let highest = self
            .priority
            .filter(|&p| p > 0)
            .unwrap_or(groups.len() as u64)
            .min(MAX_PRIORITY);
        log_verbose!("New highest priority: {highest}");

        for (rank, members) in groups.values().rev().enumerate() {
            let new_priority = highest.saturating_sub(rank as u64).max(1);
            for &number in members {
                let part_ref = gpt.partition_ref(number);
                let attrs = &mut gpt.partition_mut(number)?.attributes;
                let old_priority = attrs.priority();
                if old_priority == new_priority {
                    continue;
                }
                attrs.set_priority(new_priority)?;
                if attrs.tries() < 1 && !attrs.successful() {
                    attrs.set_tries(MAX_TRIES)?;
                }
                log_verbose!("{part_ref} priority changed from {old_priority} to {new_priority}.");
            }
        }
        Ok(())
    }
}

impl SubCommand for PrioritizeCommand {
    fn name(&self) -> &'static str {
        "prioritize"
    }

    fn execute(&self, _out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);
        let mut gpt = Gpt::load(&mut io, &name)?;
        self.reorder(&mut gpt)?;
        gpt.write(&mut io)?;
        Ok(Outcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::Guid;
    use crate::guids::{TYPE_GUID_KERNEL, TYPE_GUID_ROOTFS};

    /// Kernels in slots 1.. with the given priorities, plus a rootfs at the end.
    fn table(priorities: &[u64]) -> Gpt {
        let mut gpt = Gpt::create("disk", 1000 * 512, 512, 0, 128).unwrap();
        let mut lba = 34;
        for (i, &pri) in priorities.iter().enumerate() {
            let p = gpt.partition_mut(i as u32 + 1).unwrap();
            p.type_guid = TYPE_GUID_KERNEL;
            p.unique_guid = Guid::random();
            p.first_lba.set(lba);
            p.last_lba.set(lba + 9);
            p.attributes.set_priority(pri).unwrap();
            p.attributes.set_successful(true).unwrap();
            lba += 10;
        }
        let p = gpt.partition_mut(priorities.len() as u32 + 1).unwrap();
        p.type_guid = TYPE_GUID_ROOTFS;
        p.unique_guid = Guid::random();
        p.first_lba.set(lba);
        p.last_lba.set(lba + 9);
        gpt
    }

    fn priorities(gpt: &Gpt, count: usize) -> Vec<u64> {
        gpt.partitions[..count]
            .iter()
            .map(|p| p.attributes.priority())
            .collect()
    }

    #[test]
    fn compacts_and_keeps_order() {
        let mut gpt = table(&[9, 5, 0, 5]);
        PrioritizeCommand::new("disk").reorder(&mut gpt).unwrap();
        assert_eq!(priorities(&gpt, 4), vec![2, 1, 0, 1]);
    }

    #[test]
    fn explicit_highest_priority() {
        let mut gpt = table(&[3, 2, 1]);
        let cmd = PrioritizeCommand {
            priority: Some(15),
            ..PrioritizeCommand::new("disk")
        };
        cmd.reorder(&mut gpt).unwrap();
        assert_eq!(priorities(&gpt, 3), vec![15, 14, 13]);
    }

    #[test]
    fn lower_ranks_coalesce_at_one() {
        let mut gpt = table(&[3, 2, 1]);
        let cmd = PrioritizeCommand {
            priority: Some(2),
            ..PrioritizeCommand::new("disk")
        };
        cmd.reorder(&mut gpt).unwrap();
        assert_eq!(priorities(&gpt, 3), vec![2, 1, 1]);
    }

    #[test]
    fn named_kernel_goes_first() {
        let mut gpt = table(&[2, 2, 1]);
        let cmd = PrioritizeCommand {
            number: Some(2),
            ..PrioritizeCommand::new("disk")
        };
        cmd.reorder(&mut gpt).unwrap();
        assert_eq!(priorities(&gpt, 3), vec![2, 3, 1]);
    }

    #[test]
    fn friends_move_together() {
        let mut gpt = table(&[1, 3, 1]);
        let cmd = PrioritizeCommand {
            number: Some(1),
            friends: true,
            ..PrioritizeCommand::new("disk")
        };
        cmd.reorder(&mut gpt).unwrap();
        assert_eq!(priorities(&gpt, 3), vec![2, 1, 2]);
    }

    #[test]
    fn inactive_kernel_gets_fresh_tries() {
        let mut gpt = table(&[0, 1]);
        gpt.partition_mut(1)
            .unwrap()
            .attributes
            .set_successful(false)
            .unwrap();
        let cmd = PrioritizeCommand {
            number: Some(1),
            ..PrioritizeCommand::new("disk")
        };
        cmd.reorder(&mut gpt).unwrap();
        let attrs = gpt.partition(1).unwrap().attributes;
        assert_eq!(attrs.priority(), 2);
        assert_eq!(attrs.tries(), 15);
        assert_eq!(gpt.partition(2).unwrap().attributes.priority(), 1);
    }

    #[test]
    fn non_kernel_is_rejected() {
        let mut gpt = table(&[1]);
        let cmd = PrioritizeCommand {
            number: Some(2),
            ..PrioritizeCommand::new("disk")
        };
        assert!(matches!(
            cmd.reorder(&mut gpt).unwrap_err(),
            GptError::Usage(UsageError::NotChromeOsKernel(2))
        ));
    }
}
