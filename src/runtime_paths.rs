// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

pub const USER_TAGS_FILE_NAME: &str = "user_tags.yaml";

#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub users_file: PathBuf,
    pub state_dir: PathBuf,
    pub state_sys_dir: PathBuf,
    pub user_tags_file: PathBuf,
}

impl RuntimePaths {
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        let root_path = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root.to_path_buf()
        };

        ensure_dir_exists(&root_path)?;
        let root_canonical = canonicalize(&root_path, "runtime root")?;

        let state_dir = root_canonical.join("state");
        let state_sys_dir = state_dir.join("sys");
        ensure_dir_exists(&state_sys_dir)?;
        let state_dir = canonicalize(&state_dir, "state directory")?;
        let state_sys_dir = canonicalize(&state_sys_dir, "state/sys directory")?;

        Ok(Self {
            config_file: root_canonical.join("config.yaml"),
            users_file: root_canonical.join("users.yaml"),
            user_tags_file: state_sys_dir.join(USER_TAGS_FILE_NAME),
            root: root_canonical,
            state_dir,
            state_sys_dir,
        })
    }
}

fn ensure_dir_exists(path: &Path) -> Result<(), ConfigError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|e| {
        ConfigError::ValidationError(format!(
            "Failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}

fn canonicalize(path: &Path, label: &str) -> Result<PathBuf, ConfigError> {
    path.canonicalize().map_err(|e| {
        ConfigError::ValidationError(format!(
            "Failed to canonicalize {} '{}': {}",
            label,
            path.display(),
            e
        ))
    })
}
