// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod logging;
pub mod nonce_store;
pub mod test_config;
pub mod test_fixtures;
pub mod yaml_file;

pub use logging::{LevelRule, default_level_rules, init_logger};
pub use nonce_store::{
    NONCE_HEADER_NAME, NonceOutcome, NonceStore, issue_nonce,
};
pub use test_config::{TestConfigBuilder, test_config};
pub use yaml_file::{YamlFile, YamlFileError};
