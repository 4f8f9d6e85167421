// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use env_logger::Logger;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

/// Remaps a record's level when its target starts with `target_prefix`.
#[derive(Debug, Clone)]
pub struct LevelRule {
    pub target_prefix: String,
    pub from: Level,
    pub to: Level,
}

impl LevelRule {
    pub fn new(target_prefix: &str, from: Level, to: Level) -> Self {
        Self {
            target_prefix: target_prefix.to_string(),
            from,
            to,
        }
    }
}

/// Worker start/stop chatter from actix-server is demoted to debug.
pub fn default_level_rules() -> Vec<LevelRule> {
    vec![LevelRule::new("actix_server", Level::Info, Level::Debug)]
}

struct LevelModifierLogger {
    inner: Logger,
    rules: Vec<LevelRule>,
}

impl LevelModifierLogger {
    fn remap(&self, target: &str, level: Level) -> Level {
        remap_level(&self.rules, target, level)
    }
}

fn remap_level(rules: &[LevelRule], target: &str, level: Level) -> Level {
    rules
        .iter()
        .find(|rule| target.starts_with(&rule.target_prefix) && rule.from == level)
        .map(|rule| rule.to)
        .unwrap_or(level)
}

impl Log for LevelModifierLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let remapped = Metadata::builder()
            .level(self.remap(metadata.target(), metadata.level()))
            .target(metadata.target())
            .build();
        self.inner.enabled(&remapped)
    }

    fn log(&self, record: &Record) {
        let remapped = Record::builder()
            .level(self.remap(record.target(), record.level()))
            .target(record.target())
            .args(*record.args())
            .module_path(record.module_path())
            .file(record.file())
            .line(record.line())
            .build();
        self.inner.log(&remapped);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// `env_logger` with the `timestamp [LEVEL] target: message` line format.
pub fn build_logger(level: LevelFilter) -> Logger {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .build()
}

pub fn init_logger(level: LevelFilter, rules: Vec<LevelRule>) -> Result<(), SetLoggerError> {
    let logger = LevelModifierLogger {
        inner: build_logger(level),
        rules,
    };
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
