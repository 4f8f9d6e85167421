// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::iam::{IamError, NewUser, User, UserId, UserServices};
use crate::tags::{
    QueryFilter, TagError, TagOption, UserListConstraint, UserSaveListener, UserTags,
    parse_tag_param,
};
use crate::users::posted_tag_values;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    user_tag: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    roles: Vec<String>,
    tags: Vec<TagOption>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    email: String,
    name: String,
    #[serde(default)]
    roles: Vec<String>,
    #[serde(default)]
    tags: Option<Vec<Value>>,
}

fn user_row(user: User, user_tags: &UserTags) -> Result<UserRow, TagError> {
    let tags = user_tags
        .service()
        .list_user_tags(user.id)?
        .into_iter()
        .map(TagOption::from)
        .collect();
    Ok(UserRow {
        id: user.id,
        email: user.email,
        name: user.name,
        roles: user.roles,
        tags,
    })
}

fn iam_error_response(err: IamError) -> HttpResponse {
    match err {
        IamError::Validation(message) => TagError::validation(message).to_response(),
        IamError::DuplicateUser(email) => HttpResponse::Conflict().json(json!({
            "error": "conflict",
            "message": format!("User {} already exists", email),
        })),
        IamError::UserNotFound(email) => {
            TagError::not_found(format!("User {} not found", email)).to_response()
        }
        other => TagError::internal(other.to_string()).to_response(),
    }
}

/// User list, narrowed to the members of `user_tag` when one is selected.
pub async fn list_users(
    query: web::Query<UserListQuery>,
    user_services: web::Data<UserServices>,
    user_tags: web::Data<UserTags>,
) -> HttpResponse {
    let constraint = match user_tags.user_list_constraint(query.user_tag.as_deref()) {
        Ok(constraint) => constraint,
        Err(err) => return err.to_response(),
    };
    if constraint == UserListConstraint::MatchNone {
        log::debug!("User tag filter matches no users");
    }

    let mut rows = Vec::new();
    for user in constraint.apply(user_services.list_users()) {
        match user_row(user, &user_tags) {
            Ok(row) => rows.push(row),
            Err(err) => return err.to_response(),
        }
    }

    HttpResponse::Ok().json(json!({
        "users": rows,
        "user_tag": parse_tag_param(query.user_tag.as_deref()),
    }))
}

pub async fn register_user(
    payload: web::Json<RegisterUserRequest>,
    user_services: web::Data<UserServices>,
    user_tags: web::Data<UserTags>,
) -> HttpResponse {
    let payload = payload.into_inner();
    let values = payload.tags.as_deref().map(posted_tag_values);
    // Bad tag values reject the registration before the account is written
    if let Some(values) = values.as_deref()
        && let Err(err) = user_tags.service().prepare_tag_values(values)
    {
        return err.to_response();
    }

    let user = match user_services.create_user(NewUser {
        email: payload.email,
        name: payload.name,
        roles: payload.roles,
    }) {
        Ok(user) => user,
        Err(err) => return iam_error_response(err),
    };

    let warning = match user_tags.on_user_registered(user.id, values.as_deref()) {
        Ok(_) => None,
        Err(err) => {
            log::error!("User {} registered but tags were not saved: {}", user.id, err);
            Some("User was created but its tags could not be saved".to_string())
        }
    };

    match user_row(user, &user_tags) {
        Ok(row) => match warning {
            Some(warning) => HttpResponse::Created().json(json!({
                "user": row,
                "warning": warning,
            })),
            None => HttpResponse::Created().json(json!({ "user": row })),
        },
        Err(err) => err.to_response(),
    }
}

pub async fn tag_filter_options(
    query: web::Query<UserListQuery>,
    user_tags: web::Data<UserTags>,
) -> HttpResponse {
    match user_tags.service().all_tags() {
        Ok(tags) => {
            let options: Vec<TagOption> = tags.into_iter().map(TagOption::from).collect();
            HttpResponse::Ok().json(json!({
                "param": "user_tag",
                "selected": parse_tag_param(query.user_tag.as_deref()).unwrap_or(0),
                "options": options,
            }))
        }
        Err(err) => err.to_response(),
    }
}
