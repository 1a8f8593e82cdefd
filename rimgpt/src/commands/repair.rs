// SPDX-License-Identifier: MIT

use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;

/// Repairs the backup metadata after the image size changed.
#[derive(Debug, Clone)]
pub struct RepairCommand {
    pub image: PathBuf,
}

impl SubCommand for RepairCommand {
    fn name(&self) -> &'static str {
        "repair"
    }

    fn execute(&self, _out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);
        let mut gpt = Gpt::load(&mut io, &name)?;
        let size = io.size()?;
        gpt.resize(size, true)?;
        gpt.write(&mut io)?;
        Ok(Outcome::Message(format!("Disk image file {name} repaired.")))
    }
}
