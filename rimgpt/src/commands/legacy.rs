// SPDX-License-Identifier: MIT

use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;
use crate::header::{SIGNATURE_CHROMEOS, SIGNATURE_EFI, SIGNATURE_IGNOREME};
use crate::io_ext::RimIOLbaExt;

/// Switches between standard GPT, legacy ("CHROMEOS") GPT and an ignored primary header.
#[derive(Debug, Clone, Default)]
pub struct LegacyCommand {
    pub image: PathBuf,
    /// Restore the "EFI PART" signature.
    pub efi: bool,
    /// Stamp the primary header "IGNOREME" so readers use the backup. Wins over `efi`.
    pub primary_ignore: bool,
}

impl LegacyCommand {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }
}

impl SubCommand for LegacyCommand {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn execute(&self, _out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);
        let mut gpt = Gpt::load(&mut io, &name)?;

        if self.primary_ignore {
            if gpt.is_secondary {
                return Err(UsageError::PrimaryAlreadyIgnored.into());
            }
            let primary_lba = gpt.header.current_lba.get();
            gpt.header = gpt.backup_header();
            gpt.is_secondary = true;
            gpt.write(&mut io)?;
            io.write_region("Ignored GPT Header", primary_lba, gpt.block_size, &SIGNATURE_IGNOREME)?;
            io.flush()?;
            return Ok(Outcome::Message(format!(
                "Set {name} primary GPT header to IGNOREME."
            )));
        }

        let signature = if self.efi { SIGNATURE_EFI } else { SIGNATURE_CHROMEOS };
        gpt.header.signature = signature;
        gpt.write(&mut io)?;
        Ok(Outcome::Message(format!(
            "Changed GPT signature for {name} to {}.",
            String::from_utf8_lossy(&signature)
        )))
    }
}
