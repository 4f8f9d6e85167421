// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod admin;
pub mod api;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod iam;
pub mod runtime_paths;
pub mod tags;
pub mod users;
pub mod util;
