// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::error::TagError;
use super::types::{Tag, TagId};
use crate::iam::UserId;
use crate::util::YamlFile;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Name/id storage for tag terms.
pub trait TermStore: Send + Sync {
    fn get_term(&self, id: TagId) -> Result<Option<Tag>, TagError>;

    /// Every term, ordered by lowercase name then id.
    fn all_terms(&self) -> Result<Vec<Tag>, TagError>;

    /// Case-insensitive substring search. Returns one page of matches in
    /// `all_terms` order plus the total match count.
    fn search_terms(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Tag>, usize), TagError>;

    /// Resolves every name to a term, matching case-insensitively and creating
    /// the missing ones in a single write. Names must already be trimmed and
    /// validated. The result follows the order of `names`.
    fn find_or_create_terms(&self, names: &[String]) -> Result<Vec<Tag>, TagError>;

    fn find_or_create_term(&self, name: &str) -> Result<Tag, TagError> {
        self.find_or_create_terms(&[name.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| TagError::internal(format!("Tag '{}' was not resolved", name)))
    }
}

/// The `(tag_id, user_id)` join relation.
pub trait MembershipStore: Send + Sync {
    /// Tag ids of the user, ascending.
    fn tags_for_user(&self, user_id: UserId) -> Result<Vec<TagId>, TagError>;

    fn users_for_tag(&self, tag_id: TagId) -> Result<BTreeSet<UserId>, TagError>;

    /// Makes the user's memberships exactly `tag_ids`, ignoring ids that name
    /// no term. Rows of other users are left alone.
    fn replace_user_tags(&self, user_id: UserId, tag_ids: &BTreeSet<TagId>)
    -> Result<(), TagError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TagState {
    next_id: TagId,
    tags: BTreeMap<TagId, String>,
    memberships: BTreeSet<(TagId, UserId)>,
}

impl TagState {
    fn find_by_name(&self, name: &str) -> Option<Tag> {
        let wanted = name.to_lowercase();
        self.tags
            .iter()
            .find(|(_, existing)| existing.to_lowercase() == wanted)
            .map(|(id, existing)| Tag {
                id: *id,
                name: existing.clone(),
            })
    }

    fn sorted_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<(String, Tag)> = self
            .tags
            .iter()
            .map(|(id, name)| {
                (
                    name.to_lowercase(),
                    Tag {
                        id: *id,
                        name: name.clone(),
                    },
                )
            })
            .collect();
        tags.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        tags.into_iter().map(|(_, tag)| tag).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TagRecord {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MembershipRow {
    tag_id: TagId,
    user_id: UserId,
}

// On-disk layout of user_tags.yaml
#[derive(Debug, Default, Serialize, Deserialize)]
struct TagStateFile {
    #[serde(default)]
    next_id: TagId,
    #[serde(default)]
    tags: BTreeMap<TagId, TagRecord>,
    #[serde(default)]
    memberships: Vec<MembershipRow>,
}

impl From<&TagState> for TagStateFile {
    fn from(state: &TagState) -> Self {
        TagStateFile {
            next_id: state.next_id,
            tags: state
                .tags
                .iter()
                .map(|(id, name)| (*id, TagRecord { name: name.clone() }))
                .collect(),
            memberships: state
                .memberships
                .iter()
                .map(|(tag_id, user_id)| MembershipRow {
                    tag_id: *tag_id,
                    user_id: *user_id,
                })
                .collect(),
        }
    }
}

/// Tag terms and memberships held in memory and, unless built with
/// [`TagStore::in_memory`], written through to `user_tags.yaml` on every change.
pub struct TagStore {
    file: Option<YamlFile>,
    state: RwLock<TagState>,
}

impl TagStore {
    pub fn new(user_tags_file: PathBuf) -> Result<Self, TagError> {
        let file = YamlFile::new(user_tags_file, "user tags");
        let raw: Option<TagStateFile> = file
            .read()
            .map_err(|err| TagError::internal(err.to_string()))?;
        let state = normalize_state(raw.unwrap_or_default())?;
        log::info!(
            "Loaded {} user tag(s) and {} membership(s) from {}",
            state.tags.len(),
            state.memberships.len(),
            file.path().display()
        );
        Ok(Self {
            file: Some(file),
            state: RwLock::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            file: None,
            state: RwLock::new(TagState {
                next_id: 1,
                ..TagState::default()
            }),
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, TagState>, TagError> {
        self.state
            .read()
            .map_err(|_| TagError::internal("User tag store lock poisoned"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, TagState>, TagError> {
        self.state
            .write()
            .map_err(|_| TagError::internal("User tag store lock poisoned"))
    }

    // Writes `next` to disk, then installs it. The caller holds the write lock.
    fn persist(&self, guard: &mut TagState, next: TagState) -> Result<(), TagError> {
        if let Some(file) = &self.file {
            file.write(&TagStateFile::from(&next)).map_err(|err| {
                log::error!("Failed to persist user tags: {}", err);
                TagError::internal(err.to_string())
            })?;
        }
        *guard = next;
        Ok(())
    }
}

fn normalize_state(raw: TagStateFile) -> Result<TagState, TagError> {
    let mut tags = BTreeMap::new();
    let mut seen_names = BTreeSet::new();
    for (id, record) in raw.tags {
        if id == 0 {
            return Err(TagError::internal("Tag id 0 is reserved"));
        }
        let name = record.name.trim().to_string();
        if name.is_empty() {
            return Err(TagError::internal(format!("Tag {} has an empty name", id)));
        }
        if !seen_names.insert(name.to_lowercase()) {
            return Err(TagError::internal(format!(
                "Duplicate tag name '{}' in user tags file",
                name
            )));
        }
        tags.insert(id, name);
    }

    let mut memberships = BTreeSet::new();
    for row in raw.memberships {
        if tags.contains_key(&row.tag_id) {
            memberships.insert((row.tag_id, row.user_id));
        } else {
            log::warn!(
                "Dropping membership of user {} in unknown tag {}",
                row.user_id,
                row.tag_id
            );
        }
    }

    let floor = tags.keys().next_back().map(|id| id + 1).unwrap_or(1);
    Ok(TagState {
        next_id: raw.next_id.max(floor),
        tags,
        memberships,
    })
}

impl TermStore for TagStore {
    fn get_term(&self, id: TagId) -> Result<Option<Tag>, TagError> {
        let state = self.read_state()?;
        Ok(state.tags.get(&id).map(|name| Tag {
            id,
            name: name.clone(),
        }))
    }

    fn all_terms(&self) -> Result<Vec<Tag>, TagError> {
        Ok(self.read_state()?.sorted_tags())
    }

    fn search_terms(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Tag>, usize), TagError> {
        let needle = query.to_lowercase();
        let matches: Vec<Tag> = self
            .read_state()?
            .sorted_tags()
            .into_iter()
            .filter(|tag| needle.is_empty() || tag.name.to_lowercase().contains(&needle))
            .collect();
        let total = matches.len();
        let page = matches.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    fn find_or_create_terms(&self, names: &[String]) -> Result<Vec<Tag>, TagError> {
        let mut guard = self.write_state()?;
        let mut next = guard.clone();
        let mut resolved = Vec::with_capacity(names.len());
        let mut created = Vec::new();
        for name in names {
            if let Some(existing) = next.find_by_name(name) {
                resolved.push(existing);
                continue;
            }
            let tag = Tag {
                id: next.next_id,
                name: name.clone(),
            };
            next.tags.insert(tag.id, tag.name.clone());
            next.next_id += 1;
            created.push(tag.clone());
            resolved.push(tag);
        }

        if !created.is_empty() {
            self.persist(&mut guard, next)?;
            for tag in &created {
                log::info!("Created user tag {} '{}'", tag.id, tag.name);
            }
        }
        Ok(resolved)
    }
}

impl MembershipStore for TagStore {
    fn tags_for_user(&self, user_id: UserId) -> Result<Vec<TagId>, TagError> {
        let state = self.read_state()?;
        Ok(state
            .memberships
            .iter()
            .filter(|(_, member)| *member == user_id)
            .map(|(tag_id, _)| *tag_id)
            .collect())
    }

    fn users_for_tag(&self, tag_id: TagId) -> Result<BTreeSet<UserId>, TagError> {
        let state = self.read_state()?;
        Ok(state
            .memberships
            .range((tag_id, UserId::MIN)..=(tag_id, UserId::MAX))
            .map(|(_, user_id)| *user_id)
            .collect())
    }

    fn replace_user_tags(
        &self,
        user_id: UserId,
        tag_ids: &BTreeSet<TagId>,
    ) -> Result<(), TagError> {
        let mut guard = self.write_state()?;

        let current: BTreeSet<TagId> = guard
            .memberships
            .iter()
            .filter(|(_, member)| *member == user_id)
            .map(|(tag_id, _)| *tag_id)
            .collect();
        let wanted: BTreeSet<TagId> = tag_ids
            .iter()
            .copied()
            .filter(|id| guard.tags.contains_key(id))
            .collect();

        let to_remove: Vec<TagId> = current.difference(&wanted).copied().collect();
        let to_add: Vec<TagId> = wanted.difference(&current).copied().collect();
        if to_remove.is_empty() && to_add.is_empty() {
            return Ok(());
        }

        let mut next = guard.clone();
        for tag_id in &to_remove {
            next.memberships.remove(&(*tag_id, user_id));
        }
        for tag_id in &to_add {
            next.memberships.insert((*tag_id, user_id));
        }
        self.persist(&mut guard, next)?;

        log::debug!(
            "User {} tags updated: +{:?} -{:?}",
            user_id,
            to_add,
            to_remove
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;

    fn ids(set: &[TagId]) -> BTreeSet<TagId> {
        set.iter().copied().collect()
    }

    #[test]
    fn find_or_create_is_case_insensitive() {
        let store = TagStore::in_memory();
        let staff = store.find_or_create_term("Staff").unwrap();
        let again = store.find_or_create_term("sTAFF").unwrap();

        assert_eq!(staff.id, 1);
        assert_eq!(again, staff);
        assert_eq!(store.all_terms().unwrap().len(), 1);
    }

    #[test]
    fn find_or_create_terms_resolves_batch_in_order() {
        let store = TagStore::in_memory();
        let staff = store.find_or_create_term("Staff").unwrap();

        let names: Vec<String> = ["Remote", "staff", "REMOTE", "Ops"]
            .iter()
            .map(|name| name.to_string())
            .collect();
        let resolved = store.find_or_create_terms(&names).unwrap();
        let ids: Vec<TagId> = resolved.iter().map(|tag| tag.id).collect();

        assert_eq!(ids, vec![2, staff.id, 2, 3]);
        assert_eq!(resolved[2].name, "Remote");
        assert_eq!(store.all_terms().unwrap().len(), 3);
    }

    #[test]
    fn replace_user_tags_ignores_unknown_ids() {
        let store = TagStore::in_memory();
        let tag = store.find_or_create_term("Known").unwrap();

        store.replace_user_tags(7, &ids(&[tag.id, 9999])).unwrap();
        assert_eq!(store.tags_for_user(7).unwrap(), vec![tag.id]);
        assert!(store.users_for_tag(9999).unwrap().is_empty());
    }

    #[test]
    fn users_for_tag_only_returns_that_tag() {
        let store = TagStore::in_memory();
        let a = store.find_or_create_term("A").unwrap();
        let b = store.find_or_create_term("B").unwrap();
        store.replace_user_tags(1, &ids(&[a.id])).unwrap();
        store.replace_user_tags(2, &ids(&[a.id, b.id])).unwrap();

        assert_eq!(store.users_for_tag(a.id).unwrap(), [1, 2].into_iter().collect());
        assert_eq!(store.users_for_tag(b.id).unwrap(), [2].into_iter().collect());
    }

    #[test]
    fn search_orders_by_name_then_id() {
        let store = TagStore::in_memory();
        store.find_or_create_term("beta").unwrap();
        store.find_or_create_term("Alpha").unwrap();
        store.find_or_create_term("alphabet").unwrap();

        let (page, total) = store.search_terms("ALPH", 0, 10).unwrap();
        let names: Vec<&str> = page.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "alphabet"]);
        assert_eq!(total, 2);
    }

    #[test]
    fn state_persists_and_reloads_from_disk() {
        let fixture = TestFixtureRoot::new_unique("tag-store-reload").unwrap();
        fixture.init_runtime_layout().unwrap();
        let path = fixture.runtime_paths().unwrap().user_tags_file;

        let store = TagStore::new(path.clone()).expect("store");
        let staff = store.find_or_create_term("Staff").unwrap();
        let beta = store.find_or_create_term("Beta testers").unwrap();
        store.replace_user_tags(7, &ids(&[staff.id, beta.id])).unwrap();
        store.replace_user_tags(8, &ids(&[beta.id])).unwrap();

        let reloaded = TagStore::new(path.clone()).expect("reload");
        assert_eq!(*reloaded.read_state().unwrap(), *store.read_state().unwrap());

        let next = reloaded.find_or_create_term("Gamma").unwrap();
        assert_eq!(next.id, 3);

        let content = std::fs::read_to_string(&path).expect("read file");
        assert!(content.contains("Beta testers"));
        assert!(content.contains("memberships"));
    }

    #[test]
    fn load_drops_memberships_of_unknown_tags() {
        let fixture = TestFixtureRoot::new_unique("tag-store-orphans").unwrap();
        fixture.init_runtime_layout().unwrap();
        let path = fixture.runtime_paths().unwrap().user_tags_file;
        std::fs::write(
            &path,
            "next_id: 1\ntags:\n  4:\n    name: \"Ops\"\nmemberships:\n  - tag_id: 4\n    user_id: 2\n  - tag_id: 5\n    user_id: 2\n",
        )
        .expect("write file");

        let store = TagStore::new(path).expect("store");
        assert_eq!(store.tags_for_user(2).unwrap(), vec![4]);
        assert_eq!(store.find_or_create_term("New").unwrap().id, 5);
    }

    #[test]
    fn load_rejects_duplicate_names() {
        let fixture = TestFixtureRoot::new_unique("tag-store-dupes").unwrap();
        fixture.init_runtime_layout().unwrap();
        let path = fixture.runtime_paths().unwrap().user_tags_file;
        std::fs::write(
            &path,
            "tags:\n  1:\n    name: \"Ops\"\n  2:\n    name: \"OPS\"\n",
        )
        .expect("write file");

        assert!(TagStore::new(path).is_err());
    }
}
