// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{IamError, UsersData, YamlUser, YamlUsersData};
use crate::util::YamlFile;
use std::path::PathBuf;

#[cfg(test)]
use std::sync::RwLock;

pub trait UserStore: Send + Sync {
    fn load(&self) -> Result<UsersData, IamError>;
    fn save(&self, users: &UsersData) -> Result<(), IamError>;
}

pub struct FileUserStore {
    file: YamlFile,
}

impl FileUserStore {
    pub fn new(users_file: PathBuf) -> Result<Self, IamError> {
        if users_file.as_os_str().is_empty() {
            return Err(IamError::FileError("Users file path is empty".to_string()));
        }

        Ok(Self {
            file: YamlFile::new(users_file, "users"),
        })
    }
}

impl UserStore for FileUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        let yaml_users: YamlUsersData = self
            .file
            .read()
            .map_err(|err| IamError::ParseError(err.to_string()))?
            .unwrap_or_default();

        let users: UsersData = yaml_users
            .into_iter()
            .map(|(email, yaml_user)| (email.clone(), yaml_user.into_user(email)))
            .collect();

        let mut seen = std::collections::BTreeSet::new();
        for user in users.values() {
            if !seen.insert(user.id) {
                return Err(IamError::ParseError(format!(
                    "Duplicate user id {} in users file",
                    user.id
                )));
            }
        }

        Ok(users)
    }

    fn save(&self, users: &UsersData) -> Result<(), IamError> {
        let yaml_users: YamlUsersData = users
            .iter()
            .map(|(email, user)| (email.clone(), YamlUser::from(user)))
            .collect();
        self.file
            .write(&yaml_users)
            .map_err(|err| IamError::FileError(err.to_string()))
    }
}

#[cfg(test)]
pub struct MemoryUserStore {
    users: RwLock<UsersData>,
}

#[cfg(test)]
impl MemoryUserStore {
    pub fn from_users(users: Vec<super::User>) -> Self {
        Self {
            users: RwLock::new(
                users
                    .into_iter()
                    .map(|user| (user.email.clone(), user))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
impl UserStore for MemoryUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        match self.users.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => Ok(poisoned.into_inner().clone()),
        }
    }

    fn save(&self, users: &UsersData) -> Result<(), IamError> {
        match self.users.write() {
            Ok(mut guard) => *guard = users.clone(),
            Err(poisoned) => *poisoned.into_inner() = users.clone(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_parses_users_keyed_by_email() {
        let temp = tempfile::tempdir().expect("tempdir");
        let users_path = temp.path().join("users.yaml");
        let yaml = "admin@example.com:\n  id: 1\n  name: \"Admin\"\n  roles:\n    - \"admin\"\nbob@example.com:\n  id: 2\n  name: \"Bob\"\n";
        std::fs::write(&users_path, yaml).expect("write users");

        let store = FileUserStore::new(users_path).expect("store");
        let users = store.load().expect("load users");
        assert_eq!(users.len(), 2);
        let bob = users.get("bob@example.com").expect("bob");
        assert_eq!(bob.id, 2);
        assert_eq!(bob.email, "bob@example.com");
        assert!(bob.roles.is_empty());
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let temp = tempfile::tempdir().expect("tempdir");
        let users_path = temp.path().join("users.yaml");
        let yaml = "a@example.com:\n  id: 1\n  name: \"A\"\nb@example.com:\n  id: 1\n  name: \"B\"\n";
        std::fs::write(&users_path, yaml).expect("write users");

        let store = FileUserStore::new(users_path).expect("store");
        assert!(matches!(store.load(), Err(IamError::ParseError(_))));
    }

    #[test]
    fn save_then_load_preserves_users() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = FileUserStore::new(temp.path().join("users.yaml")).expect("store");
        let mut users = UsersData::new();
        users.insert(
            "carol@example.com".to_string(),
            super::super::User {
                id: 7,
                email: "carol@example.com".to_string(),
                name: "Carol".to_string(),
                roles: vec!["editor".to_string()],
            },
        );

        store.save(&users).expect("save");
        assert_eq!(store.load().expect("load"), users);
    }
}
