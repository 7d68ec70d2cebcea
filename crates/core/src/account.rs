// Copyright (C) 2013-2017 The Spa Project.
//
// account.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The narrow account-state interface the appendix subsystem consumes.

use crate::crypto;
use crate::error::{SpaError, SpaResult};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Read-mostly view of announced public keys, plus the single atomic
/// set-or-verify operation the announcement appendix needs.
pub trait AccountStore: Send + Sync {
    /// The key announced for an account, if any.
    fn get_public_key(&self, account_id: i64) -> Option<[u8; 32]>;

    /// Binds `public_key` to the account. Returns `true` when freshly set,
    /// `false` when the identical key was already bound; a different
    /// existing key is an error.
    fn set_or_verify(&self, account_id: i64, public_key: &[u8; 32]) -> SpaResult<bool>;
}

/// The writable projection of a single account handed into `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: i64,
    public_key: Option<[u8; 32]>,
}

impl Account {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            public_key: None,
        }
    }

    /// An account addressed by its public key; the id is derived.
    pub fn from_public_key(public_key: [u8; 32]) -> Self {
        Self {
            id: crypto::account_id_from_public_key(&public_key),
            public_key: Some(public_key),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn public_key(&self) -> Option<&[u8; 32]> {
        self.public_key.as_ref()
    }

    /// Commits an announced key into this projection.
    pub fn apply_public_key(&mut self, public_key: [u8; 32]) {
        self.public_key = Some(public_key);
    }
}

/// In-memory [`AccountStore`] used by tests and light tooling.
#[derive(Default)]
pub struct MemoryAccountStore {
    keys: RwLock<HashMap<i64, [u8; 32]>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryAccountStore {
    fn get_public_key(&self, account_id: i64) -> Option<[u8; 32]> {
        self.keys.read().get(&account_id).copied()
    }

    fn set_or_verify(&self, account_id: i64, public_key: &[u8; 32]) -> SpaResult<bool> {
        match self.keys.write().entry(account_id) {
            Entry::Vacant(entry) => {
                entry.insert(*public_key);
                Ok(true)
            }
            Entry::Occupied(entry) => {
                if entry.get() == public_key {
                    Ok(false)
                } else {
                    Err(SpaError::not_valid(format!(
                        "Public key mismatch for account {account_id}"
                    )))
                }
            }
        }
    }
}
