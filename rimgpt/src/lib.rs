// SPDX-License-Identifier: MIT

//! GUID Partition Table editing in the spirit of ChromeOS `cgpt`.
//!
//! [`gpt::Gpt`] holds a decoded table and implements the table operations (load, resize,
//! expand, integrity checks, write). [`commands`] builds the `cgpt`-style sub commands on
//! top of it.

#[doc(hidden)]
pub use paste;

#[macro_use]
mod macros;
mod io_ext;

pub mod attrs;
pub mod codec;
pub mod commands;
pub mod errors;
pub mod gpt;
pub mod guid;
/// Known partition types and their aliases.
pub mod guids;
pub mod header;
pub mod log;
pub mod partition;
/// Protective MBR.
pub mod pmbr;

pub use gpt::{DEFAULT_BLOCK_SIZE, Gpt};
pub use guid::Guid;
pub use guids::{PartitionKind, type_guid_from_str};
