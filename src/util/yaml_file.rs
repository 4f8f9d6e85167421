// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAX_TEMP_ATTEMPTS: u32 = 100;

#[derive(Debug)]
pub struct YamlFileError {
    message: String,
}

impl YamlFileError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for YamlFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for YamlFileError {}

/// A YAML document on disk that is replaced atomically (temp file, fsync, rename).
#[derive(Debug, Clone)]
pub struct YamlFile {
    path: PathBuf,
    label: &'static str,
}

impl YamlFile {
    pub fn new(path: PathBuf, label: &'static str) -> Self {
        Self { path, label }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file is missing or blank.
    pub fn read<T: DeserializeOwned>(&self) -> Result<Option<T>, YamlFileError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|err| {
            YamlFileError::new(format!("Failed to read {} file: {}", self.label, err))
        })?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|err| YamlFileError::new(format!("Failed to parse {} file: {}", self.label, err)))
    }

    pub fn write<T: Serialize>(&self, value: &T) -> Result<(), YamlFileError> {
        let content = serde_yaml::to_string(value).map_err(|err| {
            YamlFileError::new(format!("Failed to serialize {}: {}", self.label, err))
        })?;
        let parent = self.path.parent().ok_or_else(|| {
            YamlFileError::new(format!("{} file path has no parent directory", self.label))
        })?;

        let mut temp = self.create_temp(parent)?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            fs::set_permissions(&temp.path, metadata.permissions()).map_err(|err| {
                YamlFileError::new(format!(
                    "Failed to set temp {} file permissions: {}",
                    self.label, err
                ))
            })?;
        }
        temp.file.write_all(content.as_bytes()).map_err(|err| {
            YamlFileError::new(format!("Failed to write {} temp file: {}", self.label, err))
        })?;
        temp.file.sync_all().map_err(|err| {
            YamlFileError::new(format!("Failed to sync {} temp file: {}", self.label, err))
        })?;
        fs::rename(&temp.path, &self.path).map_err(|err| {
            YamlFileError::new(format!("Failed to replace {} file: {}", self.label, err))
        })?;
        temp.committed = true;

        #[cfg(unix)]
        {
            if let Err(err) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
                log::warn!("{} directory sync failed: {}", self.label, err);
            }
        }

        Ok(())
    }

    fn create_temp(&self, parent: &Path) -> Result<TempFile, YamlFileError> {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                YamlFileError::new(format!("{} file name is not valid UTF-8", self.label))
            })?;
        for attempt in 0..MAX_TEMP_ATTEMPTS {
            let path = parent.join(format!(".{}.tmp.{}.{}", file_name, std::process::id(), attempt));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => {
                    return Ok(TempFile {
                        file,
                        path,
                        committed: false,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(YamlFileError::new(format!(
                        "Failed to create temp {} file: {}",
                        self.label, err
                    )));
                }
            }
        }
        Err(YamlFileError::new(format!(
            "Failed to create temp {} file after multiple attempts",
            self.label
        )))
    }
}

struct TempFile {
    file: fs::File,
    path: PathBuf,
    committed: bool,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
