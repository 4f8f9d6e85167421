// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Capabilities the host user management composes in: the profile editor
//! field, save listeners, and the user-list filter.

use super::error::TagError;
use super::filter::{UserListConstraint, parse_tag_param};
use super::service::TagService;
use super::types::{Tag, TagId};
use crate::iam::{User, UserId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagOption {
    pub id: TagId,
    pub text: String,
}

impl From<Tag> for TagOption {
    fn from(tag: Tag) -> Self {
        TagOption {
            id: tag.id,
            text: tag.name,
        }
    }
}

/// Data the tag editor on a profile form is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileTagField {
    pub user_id: UserId,
    pub selected: Vec<TagOption>,
}

pub trait ProfileFieldProvider {
    /// User id 0 stands for the new-user form and yields an empty selection.
    fn profile_field(&self, user_id: UserId) -> Result<ProfileTagField, TagError>;
}

pub trait UserSaveListener {
    /// `values` is `None` when the form carried no tag field, which clears the
    /// user's tags.
    fn on_profile_update(
        &self,
        actor: &User,
        user_id: UserId,
        values: Option<&[String]>,
    ) -> Result<Vec<Tag>, TagError>;

    /// Tags are only written when the registration form carried a tag field.
    fn on_user_registered(
        &self,
        user_id: UserId,
        values: Option<&[String]>,
    ) -> Result<Vec<Tag>, TagError>;
}

pub trait QueryFilter {
    fn user_list_constraint(&self, tag_param: Option<&str>)
    -> Result<UserListConstraint, TagError>;
}

/// The user tags feature as seen by the host.
pub struct UserTags {
    service: TagService,
}

impl UserTags {
    pub fn new(service: TagService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TagService {
        &self.service
    }

    fn save(&self, user_id: UserId, values: &[String]) -> Result<Vec<Tag>, TagError> {
        let tag_ids = self.service.resolve_tag_values(values)?;
        self.service.set_user_tags(user_id, &tag_ids)?;
        self.service.list_user_tags(user_id)
    }
}

impl ProfileFieldProvider for UserTags {
    fn profile_field(&self, user_id: UserId) -> Result<ProfileTagField, TagError> {
        let selected = if user_id == 0 {
            Vec::new()
        } else {
            self.service
                .list_user_tags(user_id)?
                .into_iter()
                .map(TagOption::from)
                .collect()
        };
        Ok(ProfileTagField { user_id, selected })
    }
}

impl UserSaveListener for UserTags {
    fn on_profile_update(
        &self,
        actor: &User,
        user_id: UserId,
        values: Option<&[String]>,
    ) -> Result<Vec<Tag>, TagError> {
        if !actor.can_edit_user(user_id) {
            log::warn!(
                "User {} attempted to change tags of user {}",
                actor.id,
                user_id
            );
            return Err(TagError::forbidden("Not allowed to edit this user"));
        }
        self.save(user_id, values.unwrap_or_default())
    }

    fn on_user_registered(
        &self,
        user_id: UserId,
        values: Option<&[String]>,
    ) -> Result<Vec<Tag>, TagError> {
        match values {
            Some(values) => self.save(user_id, values),
            None => Ok(Vec::new()),
        }
    }
}

impl QueryFilter for UserTags {
    fn user_list_constraint(
        &self,
        tag_param: Option<&str>,
    ) -> Result<UserListConstraint, TagError> {
        match parse_tag_param(tag_param) {
            None => Ok(UserListConstraint::Unrestricted),
            Some(tag_id) => Ok(UserListConstraint::from_members(
                self.service.users_for_tag(tag_id)?,
            )),
        }
    }
}
