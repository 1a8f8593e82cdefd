// SPDX-License-Identifier: MIT

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;

/// Edits the PMBR sector for legacy BIOSes and prints its boot GUID.
#[derive(Debug, Clone, Default)]
pub struct BootCommand {
    pub image: PathBuf,
    /// Partition whose unique GUID becomes the PMBR boot GUID.
    pub number: Option<u32>,
    /// Boot code to install.
    pub bootloader: Option<PathBuf>,
    /// Recreate the legacy partition table.
    pub pmbr: bool,
}

impl BootCommand {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }
}

impl SubCommand for BootCommand {
    fn name(&self) -> &'static str {
        "boot"
    }

    fn execute(&self, out: &mut dyn Write) -> GptResult<Outcome> {
        let boot_code = match &self.bootloader {
            Some(path) => Some(fs::read(path)?),
            None => None,
        };

        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);

        let boot_guid = match self.number {
            Some(n) => Some(Gpt::load(&mut io, &name)?.partition(n)?.unique_guid),
            None => None,
        };
        let pmbr = Gpt::write_protective_mbr(&mut io, self.pmbr, boot_code.as_deref(), boot_guid)?;

        writeln!(out, "{}", pmbr.boot_guid)?;
        Ok(Outcome::Done)
    }
}
