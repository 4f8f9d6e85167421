// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::web;
use std::fmt;
use std::sync::Arc;

use crate::config::ValidatedConfig;
use crate::iam::{IamError, UserServices};
use crate::runtime_paths::RuntimePaths;
use crate::tags::{TagError, TagService, TagStore, UserTags};
use crate::util::NonceStore;

#[derive(Debug)]
pub enum AppStateError {
    Users(IamError),
    Tags(TagError),
}

impl fmt::Display for AppStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppStateError::Users(err) => write!(f, "Failed to initialize user services: {}", err),
            AppStateError::Tags(err) => write!(f, "Failed to initialize user tags: {}", err),
        }
    }
}

impl std::error::Error for AppStateError {}

/// Shared services handed to every worker through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<ValidatedConfig>,
    pub runtime_paths: RuntimePaths,
    pub user_services: web::Data<UserServices>,
    pub user_tags: web::Data<UserTags>,
    pub nonce_store: web::Data<NonceStore>,
}

impl AppState {
    pub fn new(config: ValidatedConfig, runtime_paths: RuntimePaths) -> Result<Self, AppStateError> {
        let user_services = UserServices::new(&config, runtime_paths.users_file.clone())
            .map_err(AppStateError::Users)?;
        let store = TagStore::new(runtime_paths.user_tags_file.clone()).map_err(AppStateError::Tags)?;
        let user_tags = UserTags::new(TagService::new(Arc::new(store), &config.user_tags));

        Ok(Self {
            config: web::Data::new(config),
            runtime_paths,
            user_services: web::Data::new(user_services),
            user_tags: web::Data::new(user_tags),
            nonce_store: web::Data::new(NonceStore::new()),
        })
    }

    /// Registers shared data and every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let admin_path = self.config.admin.path.clone();
        cfg.app_data(self.config.clone())
            .app_data(self.user_services.clone())
            .app_data(self.user_tags.clone())
            .app_data(self.nonce_store.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    TagError::validation(message).to_response(),
                )
                .into()
            }))
            .configure(crate::api::configure)
            .configure(crate::users::configure)
            .configure(|cfg| crate::admin::configure(cfg, &admin_path));
    }
}
