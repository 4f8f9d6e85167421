// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::iam::AuthRequest;
use crate::tags::{TagError, TagOption, UserTags};
use crate::util::{NONCE_HEADER_NAME, NonceOutcome, NonceStore, issue_nonce};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
    nonce: Option<String>,
}

fn search_term(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn page_number(raw: Option<&str>) -> usize {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(page)) if page >= 1 => usize::try_from(page).unwrap_or(usize::MAX),
        _ => 1,
    }
}

fn presented_nonce(req: &HttpRequest, query: &SearchQuery) -> Option<String> {
    if let Some(nonce) = query.nonce.as_deref().map(str::trim)
        && !nonce.is_empty()
    {
        return Some(nonce.to_string());
    }
    req.headers()
        .get(NONCE_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Autocomplete search: `{"results": [{"id", "text"}], "pagination": {"more"}}`.
pub async fn search(
    req: HttpRequest,
    query: web::Query<SearchQuery>,
    nonce_store: web::Data<NonceStore>,
    user_tags: web::Data<UserTags>,
) -> HttpResponse {
    let Some(jwt_id) = req.jwt_id() else {
        return TagError::unauthorized("Authentication required").to_response();
    };
    let nonce_ok = presented_nonce(&req, &query)
        .map(|nonce| nonce_store.validate_and_renew(&nonce, &jwt_id))
        .unwrap_or(false);
    if !nonce_ok {
        log::warn!("Tag search rejected: missing or invalid nonce");
        return TagError::unauthorized("Invalid or missing nonce").to_response();
    }

    let term = search_term(query.q.as_deref());
    let page = page_number(query.page.as_deref());
    match user_tags.service().search_tags(&term, page) {
        Ok(found) => {
            log::debug!(
                "Tag search '{}' page {} returned {} result(s)",
                term,
                page,
                found.results.len()
            );
            let results: Vec<TagOption> = found.results.into_iter().map(TagOption::from).collect();
            HttpResponse::Ok().json(json!({
                "results": results,
                "pagination": { "more": found.has_more },
            }))
        }
        Err(err) => err.to_response(),
    }
}

pub async fn issue_search_nonce(req: HttpRequest, nonce_store: web::Data<NonceStore>) -> HttpResponse {
    match issue_nonce(&req, nonce_store.get_ref()) {
        NonceOutcome::Issued { jwt_id, nonce } => {
            log::debug!("Search nonce issued for JWT ID: {}", jwt_id);
            HttpResponse::Ok().json(json!({
                "nonce": nonce,
                "expires_in_seconds": nonce_store.expiry_seconds(),
            }))
        }
        NonceOutcome::Unauthorized => {
            TagError::unauthorized("Authentication required").to_response()
        }
    }
}
