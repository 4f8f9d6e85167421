// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! User tags: free-form labels attached to accounts, searchable for the
//! autocomplete widget and usable as a user-list filter.

mod error;
pub mod filter;
pub mod hooks;
mod service;
mod store;
mod types;

pub use error::{TagError, TagErrorKind};
pub use filter::{UserListConstraint, parse_tag_param};
pub use hooks::{
    ProfileFieldProvider, ProfileTagField, QueryFilter, TagOption, UserSaveListener, UserTags,
};
pub use service::{PreparedTagValues, TagService};
pub use store::{MembershipStore, TagStore, TermStore};
pub use types::{Tag, TagId, TagSearchPage, TagSelection};
