// SPDX-License-Identifier: MIT

use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;

/// Expands the last allocated partition up to LastUsableLBA.
#[derive(Debug, Clone)]
pub struct ExpandCommand {
    pub image: PathBuf,
    pub number: u32,
}

impl SubCommand for ExpandCommand {
    fn name(&self) -> &'static str {
        "expand"
    }

    fn execute(&self, _out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);
        let mut gpt = Gpt::load(&mut io, &name)?;
        let (old_blocks, new_blocks) = gpt.expand_partition(self.number, 0)?;
        gpt.write(&mut io)?;

        let bs = gpt.block_size;
        if old_blocks < new_blocks {
            return Ok(Outcome::Message(format!(
                "Partition {} on disk image file {name} has been extended from {} to {} .",
                self.number,
                old_blocks * bs,
                new_blocks * bs
            )));
        }
        Ok(Outcome::Message(format!(
            "Nothing to expand for disk image {name} partition {}.",
            self.number
        )))
    }
}
