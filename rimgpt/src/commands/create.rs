// SPDX-License-Identifier: MIT

use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;
use crate::gpt::DEFAULT_BLOCK_SIZE;
use crate::header::DEFAULT_PARTITION_ENTRIES;
use crate::log_info;

/// Create or reset GPT headers and tables.
#[derive(Debug, Clone)]
pub struct CreateCommand {
    pub image: PathBuf,
    /// Zero every sector from LBA 0 up to FirstUsableLBA first.
    pub zero: bool,
    pub pad_blocks: u64,
    /// Defaults to the device logical block size, or 512 for plain images.
    pub block_size: Option<u64>,
    pub entries: u32,
}

impl CreateCommand {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            zero: false,
            pad_blocks: 0,
            block_size: None,
            entries: DEFAULT_PARTITION_ENTRIES,
        }
    }
}

impl SubCommand for CreateCommand {
    fn name(&self) -> &'static str {
        "create"
    }

    fn execute(&self, _out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, true)?;
        let mut io = StdRimIO::new(&mut file);

        let block_size = match self.block_size {
            Some(bs) => bs,
            None => io.logical_block_size()?.unwrap_or(DEFAULT_BLOCK_SIZE),
        };
        if block_size != DEFAULT_BLOCK_SIZE {
            log_info!("Block (sector) size for {name} is set to {block_size} bytes.");
        }

        let size = io.size()?;
        let mut gpt = Gpt::create(&name, size, block_size, self.pad_blocks, self.entries)?;
        if self.zero {
            // Clears stale headers left at other block sizes as well as LBA 1.
            io.zero_fill(0, block_size * gpt.header.first_usable_lba.get())?;
        }
        gpt.write(&mut io)?;
        Ok(Outcome::Message(format!("Created GPT for {name}")))
    }
}
