// SPDX-License-Identifier: MIT

mod config;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rimgpt::commands::*;
use rimgpt::header::DEFAULT_PARTITION_ENTRIES;
use rimgpt::log::{LogLevel, set_log_level};
use rimgpt::{Guid, type_guid_from_str};

use crate::config::{CreateSettings, Settings};

#[derive(Parser)]
#[command(name = "rimgpt", version, about = "GUID Partition Table utility", long_about = None)]
struct Cli {
    /// Verbose output, repeat for debug messages
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Debug messages
    #[arg(short, long)]
    debug: bool,

    /// Only print errors
    #[arg(long)]
    quiet: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn log_level(&self, settings: &Settings) -> LogLevel {
        if self.debug || self.verbose > 1 {
            LogLevel::Debug
        } else if self.verbose == 1 {
            LogLevel::Verbose
        } else if self.quiet {
            LogLevel::Quiet
        } else {
            settings.log.level.map_or(LogLevel::Normal, LogLevel::from)
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or reset GPT headers and tables
    Create(CreateArgs),
    /// Edit the PMBR sector for legacy BIOSes
    Boot(BootArgs),
    /// Switch between GPT and ChromeOS legacy signatures
    Legacy(LegacyArgs),
    /// Repair damaged GPT headers and tables
    Repair(ImageArgs),
    /// Expand a partition to fill the free space at the end of the disk
    Expand(ExpandArgs),
    /// Add, edit or remove a partition entry
    Add(AddArgs),
    /// Show partition table and entries
    Show(ShowArgs),
    /// Reorder the priority of all active ChromeOS kernel partitions
    Prioritize(PrioritizeArgs),
    /// Locate a partition by its GUID or label
    Find(FindArgs),
}

#[derive(Args)]
struct ImageArgs {
    image_file: PathBuf,
}

#[derive(Args)]
struct CreateArgs {
    /// Zero the sectors of the GPT table area
    #[arg(short, long)]
    zero: bool,
    /// Additional padding between the primary header and the table, in blocks
    #[arg(short, long = "pad-blocks")]
    pad_blocks: Option<u64>,
    /// Logical block (sector) size in bytes
    #[arg(long = "block_size")]
    block_size: Option<u64>,
    /// Number of partition entries
    #[arg(long)]
    entries: Option<u32>,
    image_file: PathBuf,
}

impl CreateArgs {
    fn into_command(self, defaults: &CreateSettings) -> CreateCommand {
        CreateCommand {
            zero: self.zero,
            pad_blocks: self.pad_blocks.or(defaults.pad_blocks).unwrap_or(0),
            block_size: self.block_size.or(defaults.block_size),
            entries: self
                .entries
                .or(defaults.entries)
                .unwrap_or(DEFAULT_PARTITION_ENTRIES),
            ..CreateCommand::new(self.image_file)
        }
    }
}

#[derive(Args)]
struct BootArgs {
    /// Mark partition as active in the PMBR
    #[arg(short = 'i', long)]
    number: Option<u32>,
    /// Install bootloader code in the PMBR
    #[arg(short, long)]
    bootloader: Option<PathBuf>,
    /// Create a protective MBR
    #[arg(short, long)]
    pmbr: bool,
    image_file: PathBuf,
}

#[derive(Args)]
struct LegacyArgs {
    /// Switch GPT header signature back to "EFI PART"
    #[arg(short, long)]
    efi: bool,
    /// Mark the primary GPT header as ignored
    #[arg(short, long = "primary-ignore")]
    primary_ignore: bool,
    image_file: PathBuf,
}

#[derive(Args)]
struct ExpandArgs {
    /// Partition to expand
    #[arg(short = 'i', long)]
    number: u32,
    image_file: PathBuf,
}

#[derive(Args)]
struct AddArgs {
    /// Partition to modify, a free entry is picked when omitted
    #[arg(short = 'i', long)]
    number: Option<u32>,
    /// Beginning sector
    #[arg(short, long)]
    begin: Option<u64>,
    /// Size in sectors (logical blocks)
    #[arg(short, long)]
    sectors: Option<u64>,
    /// Partition type GUID or alias
    #[arg(short = 't', long = "type-guid", value_parser = parse_type_guid)]
    type_guid: Option<Guid>,
    /// Partition unique ID
    #[arg(short = 'u', long = "unique-guid")]
    unique_guid: Option<Guid>,
    /// Label
    #[arg(short, long)]
    label: Option<String>,
    /// Successful flag
    #[arg(short = 'S', long, value_parser = clap::value_parser!(u64).range(0..=1))]
    successful: Option<u64>,
    /// Tries flag
    #[arg(short = 'T', long, value_parser = clap::value_parser!(u64).range(0..=15))]
    tries: Option<u64>,
    /// Priority flag
    #[arg(short = 'P', long, value_parser = clap::value_parser!(u64).range(0..=15))]
    priority: Option<u64>,
    /// Required flag
    #[arg(short = 'R', long, value_parser = clap::value_parser!(u64).range(0..=1))]
    required: Option<u64>,
    /// Legacy boot flag
    #[arg(short = 'B', long = "boot-legacy", value_parser = clap::value_parser!(u64).range(0..=1))]
    legacy_boot: Option<u64>,
    /// Raw 16-bit attribute value (bits 48-63)
    #[arg(short = 'A', long = "attribute", value_parser = parse_int)]
    raw_16: Option<u64>,
    image_file: PathBuf,
}

impl From<AddArgs> for AddCommand {
    fn from(a: AddArgs) -> Self {
        AddCommand {
            number: a.number,
            begin: a.begin,
            sectors: a.sectors,
            type_guid: a.type_guid,
            unique_guid: a.unique_guid,
            label: a.label,
            successful: a.successful,
            tries: a.tries,
            priority: a.priority,
            required: a.required,
            legacy_boot: a.legacy_boot,
            raw_16: a.raw_16,
            ..AddCommand::new(a.image_file)
        }
    }
}

#[derive(Args)]
struct ShowArgs {
    /// Numeric output only
    #[arg(short, long)]
    numeric: bool,
    /// Quick output
    #[arg(short, long)]
    quick: bool,
    /// Show specified partition only
    #[arg(short = 'i', long)]
    number: Option<u32>,
    /// Beginning sector
    #[arg(short, long)]
    begin: bool,
    /// Partition size (in sectors)
    #[arg(short, long)]
    size: bool,
    /// Partition type GUID
    #[arg(short = 't', long = "type")]
    type_guid: bool,
    /// Partition unique ID
    #[arg(short, long)]
    unique: bool,
    /// Partition label string
    #[arg(short, long)]
    label: bool,
    /// Successful flag
    #[arg(short = 'S', long = "Successful")]
    successful: bool,
    /// Tries flag
    #[arg(short = 'T', long = "Tries")]
    tries: bool,
    /// Priority flag
    #[arg(short = 'P', long = "Priority")]
    priority: bool,
    /// Legacy boot flag
    #[arg(short = 'L', long = "Legacy")]
    legacy: bool,
    /// Raw 16-bit attribute value (bits 48-63)
    #[arg(short = 'A', long = "Attribute")]
    attribute: bool,
    image_file: PathBuf,
}

impl ShowArgs {
    /// First format flag given, in option order.
    fn field(&self) -> Option<ShowField> {
        [
            (self.begin, ShowField::Begin),
            (self.size, ShowField::Size),
            (self.type_guid, ShowField::Type),
            (self.unique, ShowField::Unique),
            (self.label, ShowField::Label),
            (self.successful, ShowField::Successful),
            (self.tries, ShowField::Tries),
            (self.priority, ShowField::Priority),
            (self.legacy, ShowField::Legacy),
            (self.attribute, ShowField::Attribute),
        ]
        .into_iter()
        .find_map(|(set, field)| set.then_some(field))
    }
}

impl From<ShowArgs> for ShowCommand {
    fn from(a: ShowArgs) -> Self {
        ShowCommand {
            numeric: a.numeric,
            quick: a.quick,
            number: a.number,
            field: a.field(),
            ..ShowCommand::new(a.image_file)
        }
    }
}

#[derive(Args)]
struct PrioritizeArgs {
    /// Highest priority to use in the new ordering
    #[arg(short = 'P', long, value_parser = clap::value_parser!(u64).range(0..=15))]
    priority: Option<u64>,
    /// Make this kernel the highest priority
    #[arg(short = 'i', long)]
    number: Option<u32>,
    /// Move kernels sharing the priority of -i along with it
    #[arg(short, long)]
    friends: bool,
    image_file: PathBuf,
}

#[derive(Args)]
struct FindArgs {
    /// Search for partition type GUID or alias
    #[arg(short = 't', long = "type-guid", value_parser = parse_type_guid)]
    type_guid: Option<Guid>,
    /// Search for partition unique ID
    #[arg(short = 'u', long = "unique-guid")]
    unique_guid: Option<Guid>,
    /// Search for partition label
    #[arg(short, long)]
    label: Option<String>,
    /// Print partition numbers instead of device names
    #[arg(short, long)]
    numeric: bool,
    /// Fail if more than one match is found
    #[arg(short = '1', long = "single-match")]
    single_match: bool,
    /// Partition content must match this file
    #[arg(short = 'M', long = "match-file")]
    match_file: Option<PathBuf>,
    /// Byte offset into the partition for -M
    #[arg(short = 'O', long, default_value_t = 0)]
    offset: u64,
    /// Drive or image to search, all block devices when omitted
    drive: Option<PathBuf>,
}

impl From<FindArgs> for FindCommand {
    fn from(a: FindArgs) -> Self {
        FindCommand {
            drive: a.drive,
            type_guid: a.type_guid,
            unique_guid: a.unique_guid,
            label: a.label,
            numeric: a.numeric,
            single_match: a.single_match,
            match_file: a.match_file,
            offset: a.offset,
        }
    }
}

impl Commands {
    fn into_command(self, settings: &Settings) -> Box<dyn SubCommand> {
        match self {
            Commands::Create(a) => Box::new(a.into_command(&settings.create)),
            Commands::Boot(a) => Box::new(BootCommand {
                number: a.number,
                bootloader: a.bootloader,
                pmbr: a.pmbr,
                ..BootCommand::new(a.image_file)
            }),
            Commands::Legacy(a) => Box::new(LegacyCommand {
                efi: a.efi,
                primary_ignore: a.primary_ignore,
                ..LegacyCommand::new(a.image_file)
            }),
            Commands::Repair(a) => Box::new(RepairCommand {
                image: a.image_file,
            }),
            Commands::Expand(a) => Box::new(ExpandCommand {
                image: a.image_file,
                number: a.number,
            }),
            Commands::Add(a) => Box::new(AddCommand::from(a)),
            Commands::Show(a) => Box::new(ShowCommand::from(a)),
            Commands::Prioritize(a) => Box::new(PrioritizeCommand {
                priority: a.priority,
                number: a.number,
                friends: a.friends,
                ..PrioritizeCommand::new(a.image_file)
            }),
            Commands::Find(a) => Box::new(FindCommand::from(a)),
        }
    }
}

fn parse_type_guid(value: &str) -> Result<Guid, String> {
    type_guid_from_str(value).map_err(|e| e.to_string())
}

/// Decimal or `0x` prefixed hexadecimal.
fn parse_int(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{value}': {e}"))
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    set_log_level(cli.log_level(&settings));

    let command = cli.command.into_command(&settings);
    let outcome = {
        let mut out = io::stdout().lock();
        let outcome = command.execute(&mut out).context(command.name())?;
        out.flush()?;
        outcome
    };

    Ok(match outcome {
        Outcome::Done => ExitCode::SUCCESS,
        Outcome::Message(msg) => {
            println!("OK: {msg}");
            ExitCode::SUCCESS
        }
        Outcome::Exit(code) => ExitCode::from(code.clamp(0, 255) as u8),
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "ERROR:".red().bold());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn show_field_follows_option_order() {
        let cli = Cli::parse_from(["rimgpt", "show", "-i", "2", "-P", "-t", "disk.bin"]);
        let Commands::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.field(), Some(ShowField::Type));
    }

    #[test]
    fn add_accepts_aliases_and_hex_attributes() {
        let cli = Cli::parse_from([
            "rimgpt", "add", "-t", "kernel", "-s", "2048", "-A", "0x1f", "disk.bin",
        ]);
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.raw_16, Some(0x1f));
        let cmd = AddCommand::from(args);
        assert_eq!(cmd.type_guid, Some(rimgpt::guids::TYPE_GUID_KERNEL));
        assert_eq!(cmd.sectors, Some(2048));
    }

    #[test]
    fn add_rejects_out_of_range_flags() {
        assert!(Cli::try_parse_from(["rimgpt", "add", "-S", "2", "disk.bin"]).is_err());
        assert!(Cli::try_parse_from(["rimgpt", "add", "-t", "bogus", "disk.bin"]).is_err());
    }

    #[test]
    fn settings_fill_create_defaults() {
        let cli = Cli::parse_from(["rimgpt", "create", "--entries", "64", "disk.bin"]);
        let settings: Settings =
            toml::from_str("[create]\nblock_size = 4096\nentries = 32\n").unwrap();
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        let cmd = args.into_command(&settings.create);
        assert_eq!(cmd.block_size, Some(4096));
        assert_eq!(cmd.entries, 64);
        assert_eq!(cmd.pad_blocks, 0);
    }

    #[test]
    fn log_level_flags_override_settings() {
        let settings: Settings = toml::from_str("[log]\nlevel = \"quiet\"\n").unwrap();
        let cli = Cli::parse_from(["rimgpt", "-v", "repair", "disk.bin"]);
        assert_eq!(cli.log_level(&settings), LogLevel::Verbose);
        let cli = Cli::parse_from(["rimgpt", "repair", "disk.bin"]);
        assert_eq!(cli.log_level(&settings), LogLevel::Quiet);
    }

    #[test]
    fn hex_and_decimal_numbers() {
        assert_eq!(parse_int("0x10"), Ok(16));
        assert_eq!(parse_int("16"), Ok(16));
        assert!(parse_int("0xzz").is_err());
    }
}
