// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::iam::{AuthRequest, UserId, UserServices};
use crate::tags::{ProfileFieldProvider, TagError, TagOption, UserSaveListener, UserTags};

#[derive(Debug, Deserialize)]
pub struct SaveTagsRequest {
    #[serde(default)]
    tags: Option<Vec<Value>>,
}

/// Normalises posted tag values to strings: text as-is, non-negative
/// integers as their decimal form. Anything else is dropped.
pub fn posted_tag_values(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| match value {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => number.as_u64().map(|id| id.to_string()),
            _ => None,
        })
        .collect()
}

fn editable_target(
    req: &HttpRequest,
    user_id: UserId,
    user_services: &UserServices,
) -> Result<crate::iam::User, TagError> {
    let actor = req
        .user_info()
        .ok_or_else(|| TagError::unauthorized("Authentication required"))?;
    if !actor.can_edit_user(user_id) {
        return Err(TagError::forbidden("Not allowed to edit this user"));
    }
    if !user_services.user_exists(user_id) {
        return Err(TagError::not_found(format!("User {} not found", user_id)));
    }
    Ok(actor)
}

pub async fn get_user_tags(
    req: HttpRequest,
    path: web::Path<UserId>,
    user_services: web::Data<UserServices>,
    user_tags: web::Data<UserTags>,
) -> HttpResponse {
    let user_id = path.into_inner();
    if let Err(err) = editable_target(&req, user_id, &user_services) {
        return err.to_response();
    }
    match user_tags.profile_field(user_id) {
        Ok(field) => HttpResponse::Ok().json(field),
        Err(err) => err.to_response(),
    }
}

pub async fn save_user_tags(
    req: HttpRequest,
    path: web::Path<UserId>,
    payload: web::Json<SaveTagsRequest>,
    user_services: web::Data<UserServices>,
    user_tags: web::Data<UserTags>,
) -> HttpResponse {
    let user_id = path.into_inner();
    let actor = match editable_target(&req, user_id, &user_services) {
        Ok(actor) => actor,
        Err(err) => return err.to_response(),
    };

    let values = payload.tags.as_deref().map(posted_tag_values);
    match user_tags.on_profile_update(&actor, user_id, values.as_deref()) {
        Ok(saved) => {
            log::info!(
                "User {} saved {} tag(s) for user {}",
                actor.id,
                saved.len(),
                user_id
            );
            let selected: Vec<TagOption> = saved.into_iter().map(TagOption::from).collect();
            HttpResponse::Ok().json(json!({
                "user_id": user_id,
                "selected": selected,
            }))
        }
        Err(err) => err.to_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posted_values_accept_strings_and_ids() {
        let values = vec![
            json!("3"),
            json!(7),
            json!("New tag"),
            json!(-1),
            json!(2.5),
            json!(null),
            json!({"id": 1}),
        ];
        assert_eq!(
            posted_tag_values(&values),
            vec!["3".to_string(), "7".to_string(), "New tag".to_string()]
        );
    }
}
