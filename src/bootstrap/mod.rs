// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use crate::runtime_paths::RuntimePaths;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod config;
pub mod users;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub created_config: bool,
    pub created_users: bool,
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::Io(err) => write!(f, "Bootstrap I/O error: {}", err),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

/// Prepares a runtime root: default config and seed users when missing, then
/// the state directory layout.
pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let root_path = normalize_root(root)?;

    let created_config = config::ensure_config(&root_path)?;

    let validated_config = Config::load_and_validate(&root_path)?;

    let created_users = users::ensure_users(&root_path)?;

    let runtime_paths = RuntimePaths::from_root(&root_path)?;

    Ok(BootstrapResult {
        validated_config,
        runtime_paths,
        created_config,
        created_users,
    })
}

fn normalize_root(root: &Path) -> Result<PathBuf, BootstrapError> {
    let root_path = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };

    if root_path.exists() {
        if !root_path.is_dir() {
            return Err(BootstrapError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Runtime root is not a directory: {}", root_path.display()),
            )));
        }
        return Ok(root_path);
    }

    std::fs::create_dir_all(&root_path)?;
    log_action(format!(
        "created runtime root directory {}",
        root_path.display()
    ));
    Ok(root_path)
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

pub(crate) fn log_warning(message: impl AsRef<str>) {
    eprintln!("[bootstrap] WARNING: {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::types::YamlUser;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::collections::BTreeMap;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        assert!(result.created_users);
        assert_eq!(result.validated_config.server.port, 7080);
        assert_eq!(result.validated_config.admin.path, "/admin");
        assert_eq!(result.validated_config.user_tags.page_size, 10);
        assert!(result.validated_config.auth.secret.len() >= 32);
        assert!(result.runtime_paths.state_sys_dir.is_dir());

        let users_content = fs::read_to_string(fixture.path().join("users.yaml")).unwrap();
        let users: BTreeMap<String, YamlUser> = serde_yaml::from_str(&users_content).unwrap();
        let admin = users.get("admin@example.com").expect("admin user missing");
        assert_eq!(admin.id, 1);
        assert!(admin.roles.iter().any(|role| role == "admin"));
    }

    #[test]
    fn bootstrap_keeps_existing_files() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-existing").unwrap();
        let first = bootstrap_runtime(fixture.path()).expect("first bootstrap");
        let second = bootstrap_runtime(fixture.path()).expect("second bootstrap");

        assert!(!second.created_config);
        assert!(!second.created_users);
        assert_eq!(
            first.validated_config.auth.secret,
            second.validated_config.auth.secret
        );
    }

    #[test]
    fn bootstrap_rejects_file_as_root() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-file-root").unwrap();
        let file_root = fixture.path().join("not-a-dir");
        fs::write(&file_root, "x").unwrap();

        assert!(matches!(
            bootstrap_runtime(&file_root),
            Err(BootstrapError::Io(_))
        ));
    }
}
