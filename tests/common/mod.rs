// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, test};
use serde_json::Value;
use std::fs;
use usertags::app_state::AppState;
use usertags::config::ValidatedConfig;
use usertags::iam::User;
use usertags::iam::middleware::JwtAuthMiddlewareFactory;
use usertags::runtime_paths::RuntimePaths;
use usertags::util::NONCE_HEADER_NAME;
use usertags::util::test_config::TestConfigBuilder;
use usertags::util::test_fixtures::TestFixtureRoot;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ALICE_EMAIL: &str = "alice@example.com";
pub const BOB_EMAIL: &str = "bob@example.com";

const USERS_YAML: &str = "\
admin@example.com:
  id: 1
  name: \"Admin User\"
  roles:
    - \"admin\"
alice@example.com:
  id: 2
  name: \"Alice\"
  roles:
    - \"editor\"
bob@example.com:
  id: 3
  name: \"Bob\"
";

pub struct TestHarness {
    pub fixture: TestFixtureRoot,
    pub config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub app_state: AppState,
}

pub struct AuthSession {
    pub user: User,
    pub jwt_token: String,
    pub jwt_id: String,
    pub cookie: actix_web::cookie::Cookie<'static>,
    pub nonce: String,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(TestConfigBuilder::new().build())
    }

    pub fn with_config(config: ValidatedConfig) -> Self {
        let fixture = TestFixtureRoot::new_unique("user-tags-suite").expect("fixture root");
        fixture.init_runtime_layout().expect("fixture layout");
        fs::write(fixture.path().join("users.yaml"), USERS_YAML).expect("seed users");

        let runtime_paths = fixture.runtime_paths().expect("runtime paths");
        let app_state =
            AppState::new(config.clone(), runtime_paths.clone()).expect("app state");

        Self {
            fixture,
            config,
            runtime_paths,
            app_state,
        }
    }

    /// Fresh app state over the same runtime root, as after a restart.
    pub fn reload(&self) -> AppState {
        AppState::new(self.config.clone(), self.runtime_paths.clone()).expect("reloaded state")
    }

    pub fn session_for(&self, email: &str) -> AuthSession {
        let user_services = &self.app_state.user_services;
        let user = user_services.get_user_by_email(email).expect("seeded user");
        let jwt_service = user_services.jwt_service();
        let token = jwt_service.create_token(&user).expect("jwt token");
        let claims = jwt_service.verify_token(&token).expect("jwt claims");
        let cookie = jwt_service.create_auth_cookie(&token).into_owned();
        let nonce = self.app_state.nonce_store.get_or_refresh(&claims.jti);

        AuthSession {
            user,
            jwt_token: token,
            jwt_id: claims.jti,
            cookie,
            nonce,
        }
    }

    pub fn admin_auth(&self) -> AuthSession {
        self.session_for(ADMIN_EMAIL)
    }

    pub fn admin_path(&self) -> &str {
        &self.config.admin.path
    }
}

pub fn build_test_app(
    app_state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(JwtAuthMiddlewareFactory)
        .configure(move |cfg| app_state.configure(cfg))
}

pub fn add_auth_headers(
    req: test::TestRequest,
    session: &AuthSession,
    include_nonce: bool,
) -> test::TestRequest {
    let req = req.cookie(session.cookie.clone());
    if include_nonce {
        req.insert_header((NONCE_HEADER_NAME, session.nonce.clone()))
    } else {
        req
    }
}

pub async fn read_json(resp: ServiceResponse) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("json body")
}
