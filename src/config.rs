// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MIN_JWT_SECRET_CHARS: usize = 32;
pub const MAX_PAGE_SIZE: usize = 100;
pub const MAX_TAG_NAME_CHARS: usize = 1024;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub user_tags: UserTagsConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    pub user_tags: UserTagsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl ServerConfig {
    pub fn address_tuple(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdminConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_hours")]
    pub expiration_hours: u64,
    #[serde(default = "default_jwt_cookie_name")]
    pub cookie_name: String,
}

fn default_jwt_issuer() -> String {
    "usertags".to_string()
}

fn default_jwt_audience() -> String {
    "usertags-admin".to_string()
}

fn default_jwt_expiration_hours() -> u64 {
    12
}

fn default_jwt_cookie_name() -> String {
    "user_tags_auth".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UserTagsConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_name_chars")]
    pub max_name_chars: usize,
}

impl Default for UserTagsConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_name_chars: default_max_name_chars(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

fn default_max_name_chars() -> usize {
    200
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join("config.yaml");
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        Self::validate_admin(&self.admin)?;
        Self::validate_auth(&self.auth)?;
        Self::validate_logging(&self.logging)?;
        Self::validate_user_tags(&self.user_tags)?;

        if self.server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be at least 1".to_string(),
            ));
        }

        Ok(ValidatedConfig {
            server: self.server,
            admin: self.admin,
            auth: self.auth,
            logging: self.logging,
            user_tags: self.user_tags,
        })
    }

    fn validate_admin(admin: &AdminConfig) -> Result<(), ConfigError> {
        let path = admin.path.as_str();
        if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "admin.path must start with '/', must not end with '/', and cannot be the site root; got '{}'",
                path
            )));
        }
        if path.starts_with("/api") || path.starts_with("/users") {
            return Err(ConfigError::ValidationError(format!(
                "admin.path '{}' collides with a reserved route",
                path
            )));
        }
        Ok(())
    }

    fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
        if auth.secret.chars().count() < MIN_JWT_SECRET_CHARS {
            return Err(ConfigError::ValidationError(format!(
                "auth.secret must be at least {} characters",
                MIN_JWT_SECRET_CHARS
            )));
        }
        if auth.expiration_hours == 0 {
            return Err(ConfigError::ValidationError(
                "auth.expiration_hours must be at least 1".to_string(),
            ));
        }
        if auth.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.cookie_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        if parse_level_filter(&logging.level).is_none() {
            warn!(
                "Unknown logging.level '{}'; falling back to info",
                logging.level
            );
        }
        Ok(())
    }

    fn validate_user_tags(user_tags: &UserTagsConfig) -> Result<(), ConfigError> {
        if user_tags.page_size == 0 || user_tags.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "user_tags.page_size must be between 1 and {}, got: {}",
                MAX_PAGE_SIZE, user_tags.page_size
            )));
        }
        if user_tags.max_name_chars == 0 || user_tags.max_name_chars > MAX_TAG_NAME_CHARS {
            return Err(ConfigError::ValidationError(format!(
                "user_tags.max_name_chars must be between 1 and {}, got: {}",
                MAX_TAG_NAME_CHARS, user_tags.max_name_chars
            )));
        }
        Ok(())
    }
}

impl ValidatedConfig {
    pub fn log_level(&self) -> LevelFilter {
        parse_level_filter(&self.logging.level).unwrap_or(LevelFilter::Info)
    }

    pub fn is_localhost_only(&self) -> bool {
        matches!(self.server.host.as_str(), "127.0.0.1" | "localhost" | "::1")
    }
}

fn parse_level_filter(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn write_config(fixture: &TestFixtureRoot, body: &str) {
        fs::write(fixture.path().join("config.yaml"), body).expect("write config");
    }

    fn minimal_yaml(extra: &str) -> String {
        format!(
            "server:\n  host: \"127.0.0.1\"\n  port: 7080\nadmin:\n  path: \"/admin\"\nauth:\n  secret: \"{}\"\nlogging:\n  level: \"debug\"\n{}",
            SECRET, extra
        )
    }

    #[test]
    fn load_applies_defaults() {
        let fixture = TestFixtureRoot::new_unique("config-defaults").unwrap();
        write_config(&fixture, &minimal_yaml(""));

        let config = Config::load_and_validate(fixture.path()).expect("valid config");
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.auth.cookie_name, "user_tags_auth");
        assert_eq!(config.auth.expiration_hours, 12);
        assert_eq!(config.user_tags.page_size, 10);
        assert_eq!(config.user_tags.max_name_chars, 200);
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert!(config.is_localhost_only());
    }

    #[test]
    fn load_reads_user_tags_section() {
        let fixture = TestFixtureRoot::new_unique("config-user-tags").unwrap();
        write_config(
            &fixture,
            &minimal_yaml("user_tags:\n  page_size: 25\n  max_name_chars: 64\n"),
        );

        let config = Config::load_and_validate(fixture.path()).expect("valid config");
        assert_eq!(config.user_tags.page_size, 25);
        assert_eq!(config.user_tags.max_name_chars, 64);
    }

    #[test]
    fn rejects_oversized_page_size() {
        let fixture = TestFixtureRoot::new_unique("config-page-size").unwrap();
        write_config(&fixture, &minimal_yaml("user_tags:\n  page_size: 500\n"));

        match Config::load_and_validate(fixture.path()) {
            Err(ConfigError::ValidationError(message)) => assert!(message.contains("page_size")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_short_secret() {
        let fixture = TestFixtureRoot::new_unique("config-secret").unwrap();
        let yaml = minimal_yaml("").replace(SECRET, "short");
        write_config(&fixture, &yaml);

        assert!(matches!(
            Config::load_and_validate(fixture.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_admin_path_at_root() {
        let fixture = TestFixtureRoot::new_unique("config-admin-root").unwrap();
        let yaml = minimal_yaml("").replace("\"/admin\"", "\"/\"");
        write_config(&fixture, &yaml);

        assert!(matches!(
            Config::load_and_validate(fixture.path()),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let fixture = TestFixtureRoot::new_unique("config-log-level").unwrap();
        let yaml = minimal_yaml("").replace("\"debug\"", "\"chatty\"");
        write_config(&fixture, &yaml);

        let config = Config::load_and_validate(fixture.path()).expect("valid config");
        assert_eq!(config.log_level(), LevelFilter::Info);
    }

    #[test]
    fn missing_file_is_load_error() {
        let fixture = TestFixtureRoot::new_unique("config-missing").unwrap();
        assert!(matches!(
            Config::load(fixture.path()),
            Err(ConfigError::LoadError(_))
        ));
    }
}
