// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type UserId = u64;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }

    /// `edit_user` capability: administrators edit anyone, everyone edits themselves.
    pub fn can_edit_user(&self, target: UserId) -> bool {
        self.id == target || self.is_admin()
    }
}

// Structure matching the YAML file format
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YamlUser {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl YamlUser {
    pub fn into_user(self, email: String) -> User {
        User {
            id: self.id,
            email,
            name: self.name,
            roles: self.roles,
        }
    }
}

impl From<&User> for YamlUser {
    fn from(user: &User) -> Self {
        YamlUser {
            id: user.id,
            name: user.name.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IamError {
    UserNotFound(String),
    DuplicateUser(String),
    Validation(String),
    FileError(String),
    ParseError(String),
}

impl std::fmt::Display for IamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IamError::UserNotFound(email) => write!(f, "User not found: {}", email),
            IamError::DuplicateUser(email) => write!(f, "User already exists: {}", email),
            IamError::Validation(msg) => write!(f, "Invalid user data: {}", msg),
            IamError::FileError(msg) => write!(f, "File error: {}", msg),
            IamError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for IamError {}

// The users.yaml file structure: email -> yaml user data
pub type YamlUsersData = BTreeMap<String, YamlUser>;
pub type UsersData = BTreeMap<String, User>;

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: UserId, roles: &[&str]) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            name: format!("User {}", id),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }

    #[test]
    fn users_can_edit_themselves_only() {
        let editor = user(3, &["editor"]);
        assert!(editor.can_edit_user(3));
        assert!(!editor.can_edit_user(4));
    }

    #[test]
    fn admins_can_edit_anyone() {
        let admin = user(1, &[ADMIN_ROLE]);
        assert!(admin.is_admin());
        assert!(admin.can_edit_user(1));
        assert!(admin.can_edit_user(99));
    }
}
