// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagErrorKind {
    Unauthorized,
    Forbidden,
    Validation,
    NotFound,
    Internal,
}

impl TagErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            TagErrorKind::Unauthorized => "unauthorized",
            TagErrorKind::Forbidden => "forbidden",
            TagErrorKind::Validation => "validation",
            TagErrorKind::NotFound => "not_found",
            TagErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagError {
    kind: TagErrorKind,
    message: String,
}

impl TagError {
    pub fn new(kind: TagErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(TagErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(TagErrorKind::Forbidden, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(TagErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TagErrorKind::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(TagErrorKind::Internal, message)
    }

    pub fn kind(&self) -> TagErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            TagErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            TagErrorKind::Forbidden => StatusCode::FORBIDDEN,
            TagErrorKind::Validation => StatusCode::BAD_REQUEST,
            TagErrorKind::NotFound => StatusCode::NOT_FOUND,
            TagErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON error body. Internal details are logged, not returned.
    pub fn to_response(&self) -> HttpResponse {
        let message = match self.kind {
            TagErrorKind::Internal => {
                log::error!("User tags internal error: {}", self.message);
                "Internal error"
            }
            _ => self.message.as_str(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind.code(),
            "message": message,
        }))
    }
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for TagError {}
