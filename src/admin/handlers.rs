// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::admin::{middleware, users};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, admin_path: &str) {
    // Every admin route sits behind the admin role check
    cfg.service(
        web::scope(admin_path)
            .wrap(middleware::RequireAdminMiddleware)
            .service(
                web::resource("/users")
                    .route(web::get().to(users::list_users))
                    .route(web::post().to(users::register_user)),
            )
            .route("/user-tags/filter", web::get().to(users::tag_filter_options)),
    );
}
