// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};

use crate::iam::types::UserId;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,         // Subject (user email)
    pub uid: UserId,         // Numeric user id
    pub name: String,        // User's full name
    pub groups: Vec<String>, // User roles
    pub iat: i64,            // Issued at
    pub exp: i64,            // Expiration
    pub iss: String,         // Issuer
    pub aud: String,         // Audience
    pub jti: String,         // JWT ID
}

#[derive(Debug, Clone)]
pub enum JwtError {
    Creation(String),
    Verification(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Creation(msg) => write!(f, "Token creation error: {}", msg),
            JwtError::Verification(msg) => write!(f, "Token verification error: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}
