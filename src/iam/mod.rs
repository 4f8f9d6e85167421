// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod jwt;
pub mod middleware;
mod store;
pub(crate) mod types;
mod user_services;

pub use middleware::AuthRequest;
pub use store::{FileUserStore, UserStore};
#[cfg(test)]
pub use store::MemoryUserStore;
pub use types::{ADMIN_ROLE, IamError, User, UserId};
pub use user_services::{NewUser, UserServices};
