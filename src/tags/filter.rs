// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::TagId;
use crate::iam::{User, UserId};
use std::collections::BTreeSet;

/// Restriction the user listing applies for a selected tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserListConstraint {
    Unrestricted,
    Include(BTreeSet<UserId>),
    /// A tag was selected but nobody carries it.
    MatchNone,
}

impl UserListConstraint {
    pub fn from_members(members: BTreeSet<UserId>) -> Self {
        if members.is_empty() {
            UserListConstraint::MatchNone
        } else {
            UserListConstraint::Include(members)
        }
    }

    pub fn admits(&self, user_id: UserId) -> bool {
        match self {
            UserListConstraint::Unrestricted => true,
            UserListConstraint::Include(members) => members.contains(&user_id),
            UserListConstraint::MatchNone => false,
        }
    }

    pub fn apply(&self, users: Vec<User>) -> Vec<User> {
        users.into_iter().filter(|user| self.admits(user.id)).collect()
    }
}

/// Reads the `user_tag` list parameter. Absent, `0`, and unparsable values
/// mean no tag was selected.
pub fn parse_tag_param(raw: Option<&str>) -> Option<TagId> {
    match raw.map(str::trim)?.parse::<TagId>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}
