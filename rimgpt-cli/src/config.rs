// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use rimgpt::log::LogLevel;
use serde::Deserialize;

/// Optional settings file (`--config`), command-line flags take precedence.
///
/// ```toml
/// [create]
/// block_size = 4096
/// pad_blocks = 0
/// entries = 128
///
/// [log]
/// level = "verbose"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub create: CreateSettings,
    pub log: LogSettings,
}

/// Defaults for `create`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateSettings {
    pub block_size: Option<u64>,
    pub pad_blocks: Option<u64>,
    pub entries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: Option<Level>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => LogLevel::Quiet,
            Level::Normal => LogLevel::Normal,
            Level::Verbose => LogLevel::Verbose,
            Level::Debug => LogLevel::Debug,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }
}
