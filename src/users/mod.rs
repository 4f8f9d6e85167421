// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::web;

mod tags;

pub use tags::posted_tag_values;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users").service(
            web::resource("/{id}/tags")
                .route(web::get().to(tags::get_user_tags))
                .route(web::post().to(tags::save_user_tags)),
        ),
    );
}
