// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::jwt::{Claims, JwtService};
use super::store::{FileUserStore, UserStore};
use super::types::{IamError, User, UserId, UsersData};
use crate::config::ValidatedConfig;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Input for registering a user through the admin surface.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

/// Host user management: account lookup, registration, session tokens.
pub struct UserServices {
    store: Arc<dyn UserStore>,
    users: RwLock<UsersData>,
    jwt_service: JwtService,
}

impl UserServices {
    pub fn new(config: &ValidatedConfig, users_file: std::path::PathBuf) -> Result<Self, IamError> {
        let store = Arc::new(FileUserStore::new(users_file)?);
        Self::new_with_store(config, store)
    }

    pub fn new_with_store(
        config: &ValidatedConfig,
        store: Arc<dyn UserStore>,
    ) -> Result<Self, IamError> {
        let users = store.load()?;
        log::info!("Loaded {} user(s)", users.len());
        Ok(UserServices {
            store,
            users: RwLock::new(users),
            jwt_service: JwtService::new(config),
        })
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    fn read_users(&self) -> RwLockReadGuard<'_, UsersData> {
        match self.users.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("User store lock poisoned; continuing with last state");
                poisoned.into_inner()
            }
        }
    }

    fn write_users(&self) -> RwLockWriteGuard<'_, UsersData> {
        match self.users.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("User store lock poisoned; continuing with last state");
                poisoned.into_inner()
            }
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.read_users().get(&normalize_email(email)).cloned()
    }

    pub fn get_user(&self, id: UserId) -> Option<User> {
        self.read_users().values().find(|user| user.id == id).cloned()
    }

    pub fn user_exists(&self, id: UserId) -> bool {
        self.read_users().values().any(|user| user.id == id)
    }

    /// All users ordered by id.
    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.read_users().values().cloned().collect();
        users.sort_by_key(|user| user.id);
        users
    }

    /// Registers a user under the next free id and persists the user file.
    pub fn create_user(&self, new_user: NewUser) -> Result<User, IamError> {
        let email = normalize_email(&new_user.email);
        if email.is_empty() || !email.contains('@') || email.chars().any(char::is_whitespace) {
            return Err(IamError::Validation(format!(
                "'{}' is not a valid email address",
                new_user.email
            )));
        }
        let name = new_user.name.trim().to_string();
        if name.is_empty() {
            return Err(IamError::Validation("Name cannot be empty".to_string()));
        }

        let mut users = self.write_users();
        if users.contains_key(&email) {
            return Err(IamError::DuplicateUser(email));
        }
        let id = users.values().map(|user| user.id).max().unwrap_or(0) + 1;
        let user = User {
            id,
            email: email.clone(),
            name,
            roles: new_user.roles,
        };

        let mut next = users.clone();
        next.insert(email, user.clone());
        self.store.save(&next)?;
        *users = next;

        log::info!("Registered user {} with id {}", user.email, user.id);
        Ok(user)
    }

    /// Verifies the token and resolves it to a user that still exists with the
    /// same id the token was issued for.
    pub fn authenticate(&self, token: &str) -> Option<(User, Claims)> {
        let claims = match self.jwt_service.verify_token(token) {
            Ok(claims) => claims,
            Err(err) => {
                log::debug!("JWT rejected: {}", err);
                return None;
            }
        };
        let user = self.get_user_by_email(&claims.sub)?;
        if user.id != claims.uid {
            log::warn!(
                "JWT for {} carries stale user id {} (current {})",
                claims.sub,
                claims.uid,
                user.id
            );
            return None;
        }
        Some((user, claims))
    }

    pub fn validate_jwt(&self, token: &str) -> Option<User> {
        self.authenticate(token).map(|(user, _)| user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iam::{ADMIN_ROLE, MemoryUserStore};
    use crate::util::test_config::test_config;

    fn admin() -> User {
        User {
            id: 1,
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            roles: vec![ADMIN_ROLE.to_string()],
        }
    }

    fn services_with(users: Vec<User>) -> UserServices {
        UserServices::new_with_store(&test_config(), Arc::new(MemoryUserStore::from_users(users)))
            .expect("services")
    }

    #[test]
    fn create_user_assigns_next_id_and_persists() {
        let store = Arc::new(MemoryUserStore::from_users(vec![admin()]));
        let services =
            UserServices::new_with_store(&test_config(), store.clone()).expect("services");

        let user = services
            .create_user(NewUser {
                email: "  New@Example.com ".to_string(),
                name: "New Person".to_string(),
                roles: Vec::new(),
            })
            .expect("create");

        assert_eq!(user.id, 2);
        assert_eq!(user.email, "new@example.com");
        assert_eq!(services.get_user(2).map(|u| u.name), Some("New Person".to_string()));
        assert!(store.load().unwrap().contains_key("new@example.com"));
    }

    #[test]
    fn create_user_rejects_duplicates_and_bad_input() {
        let services = services_with(vec![admin()]);
        let duplicate = services.create_user(NewUser {
            email: "ADMIN@example.com".to_string(),
            name: "Again".to_string(),
            roles: Vec::new(),
        });
        assert!(matches!(duplicate, Err(IamError::DuplicateUser(_))));

        let bad_email = services.create_user(NewUser {
            email: "nope".to_string(),
            name: "Nope".to_string(),
            roles: Vec::new(),
        });
        assert!(matches!(bad_email, Err(IamError::Validation(_))));

        let blank_name = services.create_user(NewUser {
            email: "blank@example.com".to_string(),
            name: "   ".to_string(),
            roles: Vec::new(),
        });
        assert!(matches!(blank_name, Err(IamError::Validation(_))));
        assert_eq!(services.list_users().len(), 1);
    }

    #[test]
    fn authenticate_round_trips_issued_token() {
        let services = services_with(vec![admin()]);
        let token = services.jwt_service().create_token(&admin()).unwrap();

        let (user, claims) = services.authenticate(&token).expect("authenticated");
        assert_eq!(user.id, 1);
        assert_eq!(claims.sub, "admin@example.com");
        assert!(services.validate_jwt("garbage").is_none());
    }

    #[test]
    fn authenticate_rejects_token_for_removed_user() {
        let services = services_with(vec![admin()]);
        let ghost = User {
            id: 9,
            email: "ghost@example.com".to_string(),
            name: "Ghost".to_string(),
            roles: Vec::new(),
        };
        let token = services.jwt_service().create_token(&ghost).unwrap();
        assert!(services.authenticate(&token).is_none());
    }

    #[test]
    fn list_users_is_ordered_by_id() {
        let mut second = admin();
        second.id = 2;
        second.email = "a-first-alphabetically@example.com".to_string();
        let services = services_with(vec![admin(), second]);

        let ids: Vec<UserId> = services.list_users().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(services.user_exists(2));
        assert!(!services.user_exists(3));
    }
}
