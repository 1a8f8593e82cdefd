// SPDX-License-Identifier: MIT

//! cgpt-style sub commands.
//!
//! Each command is a plain options struct implementing [`SubCommand`]; the binary maps
//! parsed arguments onto these and runs them. Anything meant for stdout goes to the
//! `out` writer, diagnostics go through the log macros.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::errors::*;
use crate::gpt::Gpt;

mod add;
mod boot;
mod create;
mod expand;
mod find;
mod legacy;
mod prioritize;
mod repair;
mod show;

pub use add::{AddCommand, remove_partition};
pub use boot::BootCommand;
pub use create::CreateCommand;
pub use expand::ExpandCommand;
pub use find::FindCommand;
pub use legacy::LegacyCommand;
pub use prioritize::PrioritizeCommand;
pub use repair::RepairCommand;
pub use show::{ShowCommand, ShowField};

/// What a command asks the caller to do once it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing more to report.
    Done,
    /// Report `OK: <message>`.
    Message(String),
    /// Exit with this status and no message.
    Exit(i32),
}

pub trait SubCommand {
    /// Command name as typed on the command line.
    fn name(&self) -> &'static str;

    fn execute(&self, out: &mut dyn Write) -> GptResult<Outcome>;
}

pub(crate) fn open_image(path: &Path, writable: bool) -> GptResult<File> {
    let file = OpenOptions::new().read(true).write(writable).open(path)?;
    Ok(file)
}

#[inline]
pub(crate) fn image_name(path: &Path) -> String {
    path.display().to_string()
}

