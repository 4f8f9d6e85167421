// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::iam::middleware::AuthRequest;
use actix_web::HttpRequest;
use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

const NONCE_EXPIRY_SECONDS: u64 = 3600;

pub const NONCE_HEADER_NAME: &str = "X-Nonce";

#[derive(Clone, Debug)]
struct NonceData {
    created_at: Instant,
    jwt_id: String,
}

/// Request nonces bound to a session JWT id, owned by a single worker thread.
#[derive(Clone)]
pub struct NonceStore {
    sender: mpsc::Sender<NonceCommand>,
}

enum NonceCommand {
    #[cfg(test)]
    GetNew {
        jwt_id: String,
        reply: mpsc::Sender<String>,
    },
    GetOrRefresh {
        jwt_id: String,
        reply: mpsc::Sender<String>,
    },
    ValidateAndRenew {
        nonce: String,
        jwt_id: String,
        reply: mpsc::Sender<bool>,
    },
    #[cfg(test)]
    SnapshotJwtIds {
        reply: mpsc::Sender<HashMap<String, String>>,
    },
}

pub enum NonceOutcome {
    Issued { jwt_id: String, nonce: String },
    Unauthorized,
}

pub fn issue_nonce(req: &HttpRequest, store: &NonceStore) -> NonceOutcome {
    match req.jwt_id() {
        Some(jwt_id) => {
            let nonce = store.get_or_refresh(&jwt_id);
            NonceOutcome::Issued { jwt_id, nonce }
        }
        None => NonceOutcome::Unauthorized,
    }
}

impl Default for NonceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceStore {
    pub fn new() -> Self {
        NonceStore {
            sender: start_nonce_worker(),
        }
    }

    pub fn expiry_seconds(&self) -> u64 {
        NONCE_EXPIRY_SECONDS
    }

    fn generate_nonce() -> String {
        Uuid::new_v4().to_string()
    }

    fn request<T>(&self, build: impl FnOnce(mpsc::Sender<T>) -> NonceCommand, fallback: T) -> T {
        let (reply, receive) = mpsc::channel();
        if self.sender.send(build(reply)).is_err() {
            log::error!("NonceStore channel closed");
            return fallback;
        }
        receive.recv().unwrap_or(fallback)
    }

    /// Test-only helper: always mints a fresh nonce for the JWT id.
    #[cfg(test)]
    pub fn get_new(&self, jwt_id: &str) -> String {
        self.request(
            |reply| NonceCommand::GetNew {
                jwt_id: jwt_id.to_string(),
                reply,
            },
            String::new(),
        )
    }

    /// Returns the live nonce for the JWT id, minting one if none exists.
    pub fn get_or_refresh(&self, jwt_id: &str) -> String {
        self.request(
            |reply| NonceCommand::GetOrRefresh {
                jwt_id: jwt_id.to_string(),
                reply,
            },
            String::new(),
        )
    }

    /// True when the nonce exists and belongs to the JWT id. A valid nonce is
    /// renewed; a nonce presented with the wrong JWT id is revoked.
    pub fn validate_and_renew(&self, nonce: &str, jwt_id: &str) -> bool {
        if nonce.is_empty() {
            return false;
        }
        self.request(
            |reply| NonceCommand::ValidateAndRenew {
                nonce: nonce.to_string(),
                jwt_id: jwt_id.to_string(),
                reply,
            },
            false,
        )
    }

    #[cfg(test)]
    fn snapshot_jwt_ids(&self) -> HashMap<String, String> {
        self.request(
            |reply| NonceCommand::SnapshotJwtIds { reply },
            HashMap::new(),
        )
    }
}

fn start_nonce_worker() -> mpsc::Sender<NonceCommand> {
    let (sender, receiver) = mpsc::channel();
    let thread = thread::Builder::new().name("nonce-store".to_string());
    if let Err(err) = thread.spawn(move || run_nonce_worker(receiver)) {
        log::error!("NonceStore worker failed to start: {}", err);
    }
    sender
}

fn run_nonce_worker(receiver: mpsc::Receiver<NonceCommand>) {
    let mut nonces: HashMap<String, NonceData> = HashMap::new();
    while let Ok(command) = receiver.recv() {
        let now = Instant::now();
        cleanup_expired(&mut nonces, now);
        match command {
            #[cfg(test)]
            NonceCommand::GetNew { jwt_id, reply } => {
                let nonce = NonceStore::generate_nonce();
                nonces.insert(
                    nonce.clone(),
                    NonceData {
                        created_at: now,
                        jwt_id,
                    },
                );
                let _ = reply.send(nonce);
            }
            NonceCommand::GetOrRefresh { jwt_id, reply } => {
                let existing = nonces
                    .iter_mut()
                    .find(|(_, data)| data.jwt_id == jwt_id)
                    .map(|(nonce, data)| {
                        data.created_at = now;
                        nonce.clone()
                    });

                let nonce = existing.unwrap_or_else(|| {
                    let nonce = NonceStore::generate_nonce();
                    nonces.insert(
                        nonce.clone(),
                        NonceData {
                            created_at: now,
                            jwt_id: jwt_id.clone(),
                        },
                    );
                    log::debug!("Created nonce for JWT ID: {}", jwt_id);
                    nonce
                });

                let _ = reply.send(nonce);
            }
            NonceCommand::ValidateAndRenew {
                nonce,
                jwt_id,
                reply,
            } => {
                let is_valid = match nonces.get_mut(&nonce) {
                    Some(data) if data.jwt_id == jwt_id => {
                        data.created_at = now;
                        true
                    }
                    Some(data) => {
                        log::warn!(
                            "Nonce JWT ID mismatch. Expected: {}, Got: {}",
                            data.jwt_id,
                            jwt_id
                        );
                        nonces.remove(&nonce);
                        false
                    }
                    None => false,
                };
                let _ = reply.send(is_valid);
            }
            #[cfg(test)]
            NonceCommand::SnapshotJwtIds { reply } => {
                let snapshot = nonces
                    .iter()
                    .map(|(nonce, data)| (nonce.clone(), data.jwt_id.clone()))
                    .collect();
                let _ = reply.send(snapshot);
            }
        }
    }
}

fn cleanup_expired(nonces: &mut HashMap<String, NonceData>, now: Instant) {
    nonces.retain(|_, data| {
        now.duration_since(data.created_at) < Duration::from_secs(NONCE_EXPIRY_SECONDS)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_refresh_reuses_live_nonce() {
        let store = NonceStore::new();
        let first = store.get_or_refresh("jwt-1");
        let second = store.get_or_refresh("jwt-1");
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert_ne!(first, store.get_or_refresh("jwt-2"));
    }

    #[test]
    fn validate_and_renew_accepts_matching_jwt() {
        let store = NonceStore::new();
        let nonce = store.get_new("jwt-1");
        assert!(store.validate_and_renew(&nonce, "jwt-1"));
        // renewed, not consumed
        assert!(store.validate_and_renew(&nonce, "jwt-1"));
    }

    #[test]
    fn validate_with_wrong_jwt_revokes_nonce() {
        let store = NonceStore::new();
        let nonce = store.get_new("jwt-1");
        assert!(!store.validate_and_renew(&nonce, "jwt-2"));
        assert!(!store.snapshot_jwt_ids().contains_key(&nonce));
        assert!(!store.validate_and_renew(&nonce, "jwt-1"));
    }

    #[test]
    fn unknown_and_empty_nonces_are_rejected() {
        let store = NonceStore::new();
        let _ = store.get_new("jwt-1");
        assert!(!store.validate_and_renew("not-a-nonce", "jwt-1"));
        assert!(!store.validate_and_renew("", "jwt-1"));
    }
}
