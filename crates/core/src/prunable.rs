// Copyright (C) 2013-2017 The Spa Project.
//
// prunable.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The hash-indexed store for payloads that may be pruned from blocks.

use crate::crypto::EncryptedData;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A prunable payload as retained outside the block, keyed by the
/// transaction that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunableMessage {
    pub transaction_id: i64,
    pub encrypted_data: EncryptedData,
    pub is_text: bool,
    pub is_compressed: bool,
    /// Timestamp of the block that included the transaction.
    pub block_timestamp: i32,
    pub height: i32,
}

/// Retention store for prunable payloads. Externally owned; the appendix
/// subsystem only inserts and looks up.
pub trait PrunableMessageStore: Send + Sync {
    /// Inserts a payload. Idempotent per transaction id: the first insert
    /// wins and re-insertion of the same payload is a no-op.
    fn add(&self, message: PrunableMessage);

    /// Looks up the retained payload for a transaction, if not yet pruned.
    fn get(&self, transaction_id: i64) -> Option<Arc<PrunableMessage>>;
}

/// In-memory [`PrunableMessageStore`] used by tests and light tooling.
#[derive(Default)]
pub struct MemoryPrunableMessageStore {
    messages: RwLock<HashMap<i64, Arc<PrunableMessage>>>,
}

impl MemoryPrunableMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops a retained payload, simulating pruning.
    pub fn prune(&self, transaction_id: i64) {
        self.messages.write().remove(&transaction_id);
    }
}

impl PrunableMessageStore for MemoryPrunableMessageStore {
    fn add(&self, message: PrunableMessage) {
        match self.messages.write().entry(message.transaction_id) {
            Entry::Vacant(entry) => {
                debug!(
                    transaction_id = message.transaction_id,
                    height = message.height,
                    "retaining prunable message"
                );
                entry.insert(Arc::new(message));
            }
            Entry::Occupied(_) => {}
        }
    }

    fn get(&self, transaction_id: i64) -> Option<Arc<PrunableMessage>> {
        self.messages.read().get(&transaction_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key;

    fn sample(transaction_id: i64, height: i32) -> PrunableMessage {
        PrunableMessage {
            transaction_id,
            encrypted_data: EncryptedData::encrypt(b"payload", "alice", &public_key("bob"))
                .unwrap(),
            is_text: true,
            is_compressed: false,
            block_timestamp: 100,
            height,
        }
    }

    #[test]
    fn test_add_then_get() {
        let store = MemoryPrunableMessageStore::new();
        store.add(sample(7, 10));
        let found = store.get(7).unwrap();
        assert_eq!(found.height, 10);
        assert!(store.get(8).is_none());
    }

    #[test]
    fn test_add_is_idempotent() {
        let store = MemoryPrunableMessageStore::new();
        store.add(sample(7, 10));
        store.add(sample(7, 99));
        assert_eq!(store.get(7).unwrap().height, 10);
    }

    #[test]
    fn test_prune_removes() {
        let store = MemoryPrunableMessageStore::new();
        store.add(sample(7, 10));
        store.prune(7);
        assert!(store.get(7).is_none());
    }
}
