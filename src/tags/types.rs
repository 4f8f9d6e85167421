// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};

pub type TagId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSearchPage {
    pub results: Vec<Tag>,
    pub has_more: bool,
}

/// One value posted by the tag editor: either the id of an existing tag or
/// the text of a tag the user typed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSelection {
    Existing(TagId),
    NewName(String),
}

impl TagSelection {
    /// Blank values, `0`, and numeric values that are not a positive id yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }

        let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if value.starts_with('-') {
                return None;
            }
            return match digits.parse::<TagId>() {
                Ok(0) | Err(_) => None,
                Ok(id) => Some(TagSelection::Existing(id)),
            };
        }

        Some(TagSelection::NewName(value.to_string()))
    }
}
