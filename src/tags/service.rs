// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::error::TagError;
use super::store::{MembershipStore, TagStore, TermStore};
use super::types::{Tag, TagId, TagSearchPage, TagSelection};
use crate::config::UserTagsConfig;
use crate::iam::UserId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Posted tag values that passed validation: existing ids plus names that
/// may still need creating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedTagValues {
    ids: BTreeSet<TagId>,
    names: Vec<String>,
}

impl PreparedTagValues {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.names.is_empty()
    }
}

/// Reads and writes tag memberships and answers the search and filter queries.
pub struct TagService {
    terms: Arc<dyn TermStore>,
    memberships: Arc<dyn MembershipStore>,
    page_size: usize,
    max_name_chars: usize,
}

impl TagService {
    pub fn new(store: Arc<TagStore>, config: &UserTagsConfig) -> Self {
        Self::with_stores(store.clone(), store, config)
    }

    pub fn with_stores(
        terms: Arc<dyn TermStore>,
        memberships: Arc<dyn MembershipStore>,
        config: &UserTagsConfig,
    ) -> Self {
        Self {
            terms,
            memberships,
            page_size: config.page_size,
            max_name_chars: config.max_name_chars,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Tags of the user, ascending by id.
    pub fn list_user_tags(&self, user_id: UserId) -> Result<Vec<Tag>, TagError> {
        let mut tags = Vec::new();
        for tag_id in self.memberships.tags_for_user(user_id)? {
            if let Some(tag) = self.terms.get_term(tag_id)? {
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    /// Replaces the user's whole tag set. The caller vouches for the user.
    pub fn set_user_tags(&self, user_id: UserId, tag_ids: &BTreeSet<TagId>) -> Result<(), TagError> {
        self.memberships.replace_user_tags(user_id, tag_ids)
    }

    pub fn users_for_tag(&self, tag_id: TagId) -> Result<BTreeSet<UserId>, TagError> {
        self.memberships.users_for_tag(tag_id)
    }

    pub fn search_tags(&self, query: &str, page: usize) -> Result<TagSearchPage, TagError> {
        self.search_tags_with_size(query, page, self.page_size)
    }

    /// Pages start at 1; page 0 is read as page 1.
    pub fn search_tags_with_size(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<TagSearchPage, TagError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1).saturating_mul(page_size);
        let (results, total) = self.terms.search_terms(query.trim(), offset, page_size)?;
        Ok(TagSearchPage {
            results,
            has_more: page.saturating_mul(page_size) < total,
        })
    }

    pub fn find_or_create_tag(&self, name: &str) -> Result<Tag, TagError> {
        let name = self.validate_name(name)?;
        self.terms.find_or_create_term(&name)
    }

    fn validate_name(&self, name: &str) -> Result<String, TagError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagError::validation("Tag name cannot be empty"));
        }
        if name.chars().count() > self.max_name_chars {
            return Err(TagError::validation(format!(
                "Tag name exceeds {} characters",
                self.max_name_chars
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(TagError::validation("Tag name contains control characters"));
        }
        Ok(name.to_string())
    }

    /// Parses and validates values posted by the tag editor without writing
    /// anything.
    pub fn prepare_tag_values<S: AsRef<str>>(
        &self,
        values: &[S],
    ) -> Result<PreparedTagValues, TagError> {
        let mut prepared = PreparedTagValues::default();
        for value in values {
            match TagSelection::parse(value.as_ref()) {
                Some(TagSelection::Existing(id)) => {
                    prepared.ids.insert(id);
                }
                Some(TagSelection::NewName(name)) => {
                    prepared.names.push(self.validate_name(&name)?);
                }
                None => {}
            }
        }
        Ok(prepared)
    }

    /// Creates the typed-in names that do not exist yet, in one store write,
    /// and returns the full id set. Ids are passed through unchecked.
    pub fn commit_tag_values(
        &self,
        prepared: &PreparedTagValues,
    ) -> Result<BTreeSet<TagId>, TagError> {
        let mut ids = prepared.ids.clone();
        if !prepared.names.is_empty() {
            ids.extend(
                self.terms
                    .find_or_create_terms(&prepared.names)?
                    .into_iter()
                    .map(|tag| tag.id),
            );
        }
        Ok(ids)
    }

    /// Turns posted values into tag ids. No tag is created unless every value
    /// is valid.
    pub fn resolve_tag_values<S: AsRef<str>>(
        &self,
        values: &[S],
    ) -> Result<BTreeSet<TagId>, TagError> {
        let prepared = self.prepare_tag_values(values)?;
        self.commit_tag_values(&prepared)
    }

    pub fn all_tags(&self) -> Result<Vec<Tag>, TagError> {
        self.terms.all_terms()
    }

    pub fn get_tag(&self, id: TagId) -> Result<Option<Tag>, TagError> {
        self.terms.get_term(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagErrorKind;

    fn service() -> TagService {
        TagService::new(Arc::new(TagStore::in_memory()), &UserTagsConfig::default())
    }

    fn set(ids: &[TagId]) -> BTreeSet<TagId> {
        ids.iter().copied().collect()
    }

    fn tag_ids(tags: &[Tag]) -> Vec<TagId> {
        tags.iter().map(|tag| tag.id).collect()
    }

    #[test]
    fn set_user_tags_round_trips() {
        let service = service();
        let a = service.find_or_create_tag("Alpha").unwrap();
        let b = service.find_or_create_tag("Beta").unwrap();

        service.set_user_tags(7, &set(&[b.id, a.id])).unwrap();
        assert_eq!(tag_ids(&service.list_user_tags(7).unwrap()), vec![a.id, b.id]);
    }

    #[test]
    fn set_user_tags_is_idempotent() {
        let service = service();
        let a = service.find_or_create_tag("Alpha").unwrap();

        service.set_user_tags(7, &set(&[a.id])).unwrap();
        let once = service.list_user_tags(7).unwrap();
        service.set_user_tags(7, &set(&[a.id])).unwrap();
        assert_eq!(service.list_user_tags(7).unwrap(), once);
        assert_eq!(service.users_for_tag(a.id).unwrap().len(), 1);
    }

    #[test]
    fn set_user_tags_replaces_rather_than_merges() {
        let service = service();
        let a = service.find_or_create_tag("Alpha").unwrap();
        let b = service.find_or_create_tag("Beta").unwrap();

        service.set_user_tags(7, &set(&[a.id])).unwrap();
        service.set_user_tags(7, &set(&[b.id])).unwrap();
        assert_eq!(tag_ids(&service.list_user_tags(7).unwrap()), vec![b.id]);
        assert!(service.users_for_tag(a.id).unwrap().is_empty());
    }

    #[test]
    fn saving_one_user_leaves_others_alone() {
        let service = service();
        let a = service.find_or_create_tag("Alpha").unwrap();
        let b = service.find_or_create_tag("Beta").unwrap();
        service.set_user_tags(2, &set(&[a.id, b.id])).unwrap();

        service.set_user_tags(1, &set(&[a.id])).unwrap();
        service.set_user_tags(1, &set(&[])).unwrap();

        assert_eq!(tag_ids(&service.list_user_tags(2).unwrap()), vec![a.id, b.id]);
    }

    #[test]
    fn empty_set_clears_all_memberships() {
        let service = service();
        let a = service.find_or_create_tag("Alpha").unwrap();
        service.set_user_tags(7, &set(&[a.id])).unwrap();

        service.set_user_tags(7, &set(&[])).unwrap();
        assert!(service.list_user_tags(7).unwrap().is_empty());
        assert!(service.users_for_tag(a.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_tag_ids_are_ignored() {
        let service = service();
        let a = service.find_or_create_tag("Alpha").unwrap();

        service.set_user_tags(7, &set(&[a.id, 9999])).unwrap();
        assert_eq!(tag_ids(&service.list_user_tags(7).unwrap()), vec![a.id]);
        assert!(service.users_for_tag(9999).unwrap().is_empty());
    }

    #[test]
    fn search_paginates_twenty_five_tags() {
        let service = service();
        for n in 1..=25 {
            service.find_or_create_tag(&format!("tag{}", n)).unwrap();
        }

        let first = service.search_tags("tag", 1).unwrap();
        assert_eq!(first.results.len(), 10);
        assert!(first.has_more);

        let second = service.search_tags("tag", 2).unwrap();
        assert_eq!(second.results.len(), 10);
        assert!(second.has_more);

        let third = service.search_tags("tag", 3).unwrap();
        assert_eq!(third.results.len(), 5);
        assert!(!third.has_more);

        let fourth = service.search_tags("tag", 4).unwrap();
        assert!(fourth.results.is_empty());
        assert!(!fourth.has_more);

        let mut seen: Vec<TagId> = [first, second, third]
            .iter()
            .flat_map(|page| tag_ids(&page.results))
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn search_is_case_insensitive_and_empty_query_matches_all() {
        let service = service();
        service.find_or_create_tag("Support").unwrap();
        service.find_or_create_tag("Sales").unwrap();
        service.find_or_create_tag("Engineering").unwrap();

        let page = service.search_tags("SUP", 1).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].name, "Support");

        let all = service.search_tags("", 1).unwrap();
        let names: Vec<&str> = all.results.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, vec!["Engineering", "Sales", "Support"]);
        assert!(service.search_tags("zzz", 1).unwrap().results.is_empty());
    }

    #[test]
    fn page_zero_reads_as_first_page() {
        let service = service();
        service.find_or_create_tag("Only").unwrap();
        assert_eq!(service.search_tags("", 0).unwrap(), service.search_tags("", 1).unwrap());
    }

    #[test]
    fn find_or_create_validates_names() {
        let service = TagService::new(
            Arc::new(TagStore::in_memory()),
            &UserTagsConfig {
                page_size: 10,
                max_name_chars: 5,
            },
        );

        let blank = service.find_or_create_tag("   ").unwrap_err();
        assert_eq!(blank.kind(), TagErrorKind::Validation);
        let long = service.find_or_create_tag("toolong").unwrap_err();
        assert_eq!(long.kind(), TagErrorKind::Validation);
        let control = service.find_or_create_tag("a\u{7}b").unwrap_err();
        assert_eq!(control.kind(), TagErrorKind::Validation);

        let trimmed = service.find_or_create_tag("  fits ").unwrap();
        assert_eq!(trimmed.name, "fits");
    }

    #[test]
    fn resolve_creates_literal_names_once() {
        let service = service();
        let existing = service.find_or_create_tag("Staff").unwrap();

        let first = service
            .resolve_tag_values(&["1", "Beta testers", "", "0", "staff"])
            .unwrap();
        let beta = service.search_tags("beta", 1).unwrap().results[0].clone();
        assert_eq!(first, set(&[existing.id, beta.id]));

        let second = service.resolve_tag_values(&["beta TESTERS"]).unwrap();
        assert_eq!(second, set(&[beta.id]));
        assert_eq!(service.all_tags().unwrap().len(), 2);
    }

    #[test]
    fn invalid_value_aborts_resolution_before_any_tag_is_created() {
        let service = service();
        let long = "x".repeat(201);

        let err = service
            .resolve_tag_values(&["Early", long.as_str(), "Late"])
            .unwrap_err();
        assert_eq!(err.kind(), TagErrorKind::Validation);
        assert!(service.all_tags().unwrap().is_empty());
    }

    #[test]
    fn prepare_writes_nothing_until_commit() {
        let service = service();
        let prepared = service.prepare_tag_values(&["Pending", "4"]).unwrap();
        assert!(!prepared.is_empty());
        assert!(service.all_tags().unwrap().is_empty());

        let ids = service.commit_tag_values(&prepared).unwrap();
        let pending = service.all_tags().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(ids, set(&[4, pending[0].id]));
    }

    #[test]
    fn get_tag_returns_none_for_unknown_id() {
        let service = service();
        let tag = service.find_or_create_tag("Known").unwrap();
        assert_eq!(service.get_tag(tag.id).unwrap(), Some(tag));
        assert_eq!(service.get_tag(42).unwrap(), None);
    }
}
