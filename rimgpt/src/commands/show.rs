// SPDX-License-Identifier: MIT

use std::io::Write;
use std::path::PathBuf;

use rimio::prelude::*;

use super::*;
use crate::attrs::PartitionAttributes;
use crate::header::GptHeader;
use crate::io_ext::RimIOLbaExt;
use crate::log_debug;
use crate::partition::GptPartition;

/// Single value printed by `show -i N` with a format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowField {
    Begin,
    Size,
    Type,
    Unique,
    Label,
    Successful,
    Tries,
    Priority,
    Legacy,
    Attribute,
}

/// Show partition table and entries.
#[derive(Debug, Clone, Default)]
pub struct ShowCommand {
    pub image: PathBuf,
    pub numeric: bool,
    pub quick: bool,
    pub number: Option<u32>,
    pub field: Option<ShowField>,
}

impl ShowCommand {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    fn type_name(&self, p: &GptPartition) -> String {
        if self.numeric {
            p.type_guid.to_string()
        } else {
            p.kind().to_string()
        }
    }

    fn attr_text(&self, attrs: &PartitionAttributes, chromeos_kernel: bool) -> String {
        if self.numeric {
            return format!("[{:x}]", attrs.raw_16());
        }
        let mut out = Vec::new();
        if chromeos_kernel {
            out.push(format!("priority={}", attrs.priority()));
            out.push(format!("tries={}", attrs.tries()));
            out.push(format!("successful={}", attrs.successful() as u8));
        }
        if attrs.required() {
            out.push("required=1".to_string());
        }
        if attrs.legacy_boot() {
            out.push("legacy_boot=1".to_string());
        }
        out.join(" ")
    }
}

fn field_value(field: ShowField, p: &GptPartition) -> String {
    let attrs = &p.attributes;
    match field {
        ShowField::Begin => p.first_lba.get().to_string(),
        ShowField::Size => p.blocks().to_string(),
        ShowField::Type => p.type_guid.to_string(),
        ShowField::Unique => p.unique_guid.to_string(),
        ShowField::Label => p.label(),
        ShowField::Successful => (attrs.successful() as u8).to_string(),
        ShowField::Tries => attrs.tries().to_string(),
        ShowField::Priority => attrs.priority().to_string(),
        ShowField::Legacy => (attrs.legacy_boot() as u8).to_string(),
        ShowField::Attribute => format!("[{:x}]", attrs.raw_16()),
    }
}

fn row(out: &mut dyn Write, start: u64, size: u64, part: &str, contents: &str) -> GptResult {
    writeln!(out, "{start:>12} {size:>11} {part:>7}  {contents}")?;
    Ok(())
}

fn detail(out: &mut dyn Write, key: &str, value: &str) -> GptResult {
    writeln!(out, "{:>32}  {key}: {value}", "")?;
    Ok(())
}

impl SubCommand for ShowCommand {
    fn name(&self) -> &'static str {
        "show"
    }

    fn execute(&self, out: &mut dyn Write) -> GptResult<Outcome> {
        let name = image_name(&self.image);
        let mut file = open_image(&self.image, false)?;
        let mut io = StdRimIO::new(&mut file);
        let gpt = Gpt::load(&mut io, &name)?;
        log_debug!("{:?}", gpt.header);

        if self.field.is_some() && self.number.is_none() {
            return Err(UsageError::Invalid("Format arguments must be used with -i.").into());
        }
        if let Some(n) = self.number {
            if n == 0 || n > gpt.header.num_entries.get() {
                return Err(UsageError::InvalidPartitionNumber(n).into());
            }
        }

        let mut print_blocks = false;
        if !(self.quick || self.field.is_some()) {
            writeln!(out, "{:>12} {:>11} {:>7}  {}", "start", "size", "part", "contents")?;
            print_blocks = self.number.is_none();
        }

        let h = &gpt.header;
        if print_blocks {
            if gpt.pmbr.is_some() {
                row(out, 0, 1, "", "PMBR")?;
            }
            if gpt.is_secondary {
                row(out, h.backup_lba.get(), 1, "IGNORED", "Pri GPT header")?;
            } else {
                row(out, h.current_lba.get(), 1, "", "Pri GPT header")?;
                row(out, h.entries_lba.get(), gpt.table_blocks(), "", "Pri GPT table")?;
            }
        }

        for (i, p) in gpt.partitions.iter().enumerate() {
            let number = i as u32 + 1;
            match self.number {
                None if p.is_unused() => continue,
                Some(n) if n != number => continue,
                _ => {}
            }

            if let Some(field) = self.field {
                writeln!(out, "{}", field_value(field, p))?;
                continue;
            }

            let contents = if self.quick {
                self.type_name(p)
            } else {
                format!("Label: \"{}\"", p.label())
            };
            row(
                out,
                p.first_lba.get(),
                p.blocks(),
                &number.to_string(),
                &contents,
            )?;

            if !self.quick {
                detail(out, "Type", &self.type_name(p))?;
                detail(out, "UUID", &p.unique_guid.to_string())?;
                if self.numeric || p.kind().is_bootable() {
                    let text = self.attr_text(&p.attributes, p.is_chromeos_kernel());
                    detail(out, "Attr", &text)?;
                }
            }
        }

        if print_blocks {
            let secondary: GptHeader = if gpt.is_secondary {
                *h
            } else {
                io.read_struct_lba(h.backup_lba.get(), gpt.block_size)?
            };
            row(
                out,
                secondary.entries_lba.get(),
                secondary.table_blocks(gpt.block_size),
                "",
                "Sec GPT table",
            )?;
            row(out, secondary.current_lba.get(), 1, "", "Sec GPT header")?;
        }

        // Integrity is reported only after everything has been printed.
        gpt.check_integrity()?;
        Ok(Outcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guids::TYPE_GUID_KERNEL;

    #[test]
    fn kernel_attributes_text() {
        let cmd = ShowCommand::new("disk");
        let mut attrs = PartitionAttributes::default();
        attrs.set_priority(2).unwrap();
        attrs.set_tries(15).unwrap();
        attrs.set_legacy_boot(true).unwrap();
        assert_eq!(
            cmd.attr_text(&attrs, true),
            "priority=2 tries=15 successful=0 legacy_boot=1"
        );
        assert_eq!(cmd.attr_text(&attrs, false), "legacy_boot=1");

        let numeric = ShowCommand {
            numeric: true,
            ..ShowCommand::new("disk")
        };
        assert_eq!(numeric.attr_text(&attrs, true), "[f2]");
    }

    #[test]
    fn single_values() {
        let mut p = GptPartition::empty();
        p.type_guid = TYPE_GUID_KERNEL;
        p.first_lba.set(34);
        p.last_lba.set(2081);
        p.attributes.set_successful(true).unwrap();
        assert_eq!(field_value(ShowField::Begin, &p), "34");
        assert_eq!(field_value(ShowField::Size, &p), "2048");
        assert_eq!(
            field_value(ShowField::Type, &p),
            "FE3A2A5D-4F32-41A7-B725-ACCC3285A309"
        );
        assert_eq!(field_value(ShowField::Successful, &p), "1");
        assert_eq!(field_value(ShowField::Attribute, &p), "[100]");
    }

    #[test]
    fn row_layout() {
        let mut buf = Vec::new();
        row(&mut buf, 34, 2048, "1", "Label: \"KERN-A\"").unwrap();
        detail(&mut buf, "Type", "ChromeOS kernel").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "          34        2048       1  Label: \"KERN-A\""
        );
        assert_eq!(
            lines.next().unwrap(),
            format!("{}  Type: ChromeOS kernel", " ".repeat(32))
        );
    }
}
