// Copyright (C) 2013-2017 The Spa Project.
//
// chain.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

use crate::account::AccountStore;
use crate::prunable::PrunableMessageStore;
use serde::Deserialize;

/// Consensus parameters of a Spa chain.
///
/// Activation heights and limits differ between networks; the defaults below
/// are the main-chain values. Never hard-code these past this struct.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainParams {
    /// Base units per display unit.
    pub one_spa: i64,

    /// Height at which the height-gated validation rules activate.
    pub shuffling_block: i32,

    /// Seconds a prunable payload is guaranteed to be retrievable.
    pub min_prunable_lifetime: i32,

    /// Seconds after which the store may drop a prunable payload.
    pub max_prunable_lifetime: i32,

    /// Maximum ciphertext length of a non-prunable encrypted message.
    pub max_encrypted_message_length: usize,

    /// Maximum ciphertext length of a prunable encrypted message.
    pub max_prunable_encrypted_message_length: usize,

    /// Whether expired prunable payloads may still be served to peers.
    pub include_expired_prunable: bool,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            one_spa: 100_000_000,
            shuffling_block: 0,
            min_prunable_lifetime: 14 * 1440 * 60,
            max_prunable_lifetime: 90 * 1440 * 60,
            max_encrypted_message_length: 1000 + 16,
            max_prunable_encrypted_message_length: 42 * 1024,
            include_expired_prunable: true,
        }
    }
}

/// Ambient chain state an appendix operation runs against.
///
/// Height and epoch time are snapshots: one `validate` or `apply` call sees a
/// single consistent pair. The stores are externally owned; nothing here is
/// cached.
pub struct ChainContext<'a> {
    pub params: &'a ChainParams,
    /// Current blockchain height.
    pub height: i32,
    /// Seconds since the chain's genesis epoch.
    pub epoch_time: i32,
    pub accounts: &'a dyn AccountStore,
    pub prunable_messages: &'a dyn PrunableMessageStore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ChainParams::default();
        assert_eq!(params.one_spa, 100_000_000);
        assert_eq!(params.min_prunable_lifetime, 1_209_600);
        assert_eq!(params.max_prunable_lifetime, 7_776_000);
        assert!(params.min_prunable_lifetime < params.max_prunable_lifetime);
    }

    #[test]
    fn test_params_deserialize_partial() {
        let params: ChainParams =
            serde_json::from_str(r#"{"shufflingBlock": 1000, "includeExpiredPrunable": false}"#)
                .unwrap();
        assert_eq!(params.shuffling_block, 1000);
        assert!(!params.include_expired_prunable);
        assert_eq!(params.one_spa, 100_000_000);
    }
}
