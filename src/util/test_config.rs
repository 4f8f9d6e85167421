// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use crate::config::{
    AdminConfig, AuthConfig, LoggingConfig, ServerConfig, UserTagsConfig, ValidatedConfig,
};

#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: ValidatedConfig,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ValidatedConfig {
                server: ServerConfig {
                    host: "127.0.0.1".to_string(),
                    port: 5466,
                    workers: 1,
                },
                admin: AdminConfig {
                    path: "/admin".to_string(),
                },
                auth: AuthConfig {
                    secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
                    issuer: "usertags-test".to_string(),
                    audience: "usertags-test-admin".to_string(),
                    expiration_hours: 1,
                    cookie_name: "user_tags_auth".to_string(),
                },
                logging: LoggingConfig {
                    level: "debug".to_string(),
                },
                user_tags: UserTagsConfig::default(),
            },
        }
    }

    pub fn with_admin_path(mut self, path: &str) -> Self {
        self.config.admin.path = path.to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.config.user_tags.page_size = page_size;
        self
    }

    pub fn with_max_name_chars(mut self, max_name_chars: usize) -> Self {
        self.config.user_tags.max_name_chars = max_name_chars;
        self
    }

    pub fn build(self) -> ValidatedConfig {
        self.config
    }
}

pub fn test_config() -> ValidatedConfig {
    TestConfigBuilder::new().build()
}
