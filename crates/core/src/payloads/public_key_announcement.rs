// Copyright (C) 2013-2017 The Spa Project.
//
// public_key_announcement.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

use super::{
    has_appendix, header_size, read_version, require_str, version_from_json, write_version,
};
use crate::account::Account;
use crate::chain::ChainContext;
use crate::convert;
use crate::crypto;
use crate::error::{SpaError, SpaResult};
use crate::fee::Fee;
use crate::transaction::Transaction;
use serde_json::{json, Value};
use spa_io::{BinaryWriter, MemoryReader};

/// Announces the public key of the transaction's recipient, binding the key
/// to the 64-bit account id before the account has ever signed anything.
///
/// This is the only appendix in the subsystem that mutates account state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyAnnouncement {
    version: u8,
    public_key: [u8; 32],
}

impl PublicKeyAnnouncement {
    pub const NAME: &'static str = "PublicKeyAnnouncement";

    pub fn new(public_key: [u8; 32]) -> Self {
        Self {
            version: 1,
            public_key,
        }
    }

    pub fn from_reader(
        reader: &mut MemoryReader<'_>,
        transaction_version: u8,
    ) -> SpaResult<Self> {
        let version = read_version(reader, transaction_version)?;
        let public_key = reader.read_array::<32>()?;
        Ok(Self {
            version,
            public_key,
        })
    }

    pub fn from_json(attachment: &Value) -> SpaResult<Self> {
        let version = version_from_json(attachment, Self::NAME)?;
        let public_key = convert::parse_hex32(require_str(attachment, "recipientPublicKey")?)?;
        Ok(Self {
            version,
            public_key,
        })
    }

    pub fn parse(attachment: &Value) -> SpaResult<Option<Self>> {
        if !has_appendix(Self::NAME, attachment) {
            return Ok(None);
        }
        Self::from_json(attachment).map(Some)
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn size(&self) -> usize {
        header_size(self.version) + 32
    }

    pub fn full_size(&self) -> usize {
        self.size()
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) -> SpaResult<()> {
        write_version(writer, self.version)?;
        writer.write_bytes(&self.public_key)?;
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        json!({
            format!("version.{}", Self::NAME): self.version,
            "recipientPublicKey": convert::to_hex(&self.public_key),
        })
    }

    pub fn verify_version(&self, transaction_version: u8) -> bool {
        if transaction_version == 0 {
            self.version == 0
        } else {
            self.version == 1
        }
    }

    pub fn baseline_fee(&self, _ctx: &ChainContext<'_>) -> Fee {
        Fee::None
    }

    pub(super) fn fee_size(&self) -> i64 {
        0
    }

    pub fn validate(&self, ctx: &ChainContext<'_>, transaction: &Transaction) -> SpaResult<()> {
        let recipient_id = transaction.recipient_id();
        if recipient_id == 0 {
            return Err(SpaError::not_valid(
                "PublicKeyAnnouncement cannot be attached to transactions with no recipient",
            ));
        }
        if !crypto::is_canonical_public_key(&self.public_key) {
            return Err(SpaError::not_valid(format!(
                "Invalid recipient public key: {}",
                convert::to_hex(&self.public_key)
            )));
        }
        if crypto::account_id_from_public_key(&self.public_key) != recipient_id {
            return Err(SpaError::not_valid(
                "Announced public key does not match recipient accountId",
            ));
        }
        if let Some(existing) = ctx.accounts.get_public_key(recipient_id) {
            if existing != self.public_key {
                return Err(SpaError::not_currently_valid(
                    "A different public key for this account has already been announced",
                ));
            }
        }
        Ok(())
    }

    pub fn apply(
        &self,
        ctx: &ChainContext<'_>,
        _transaction: &Transaction,
        _sender: &mut Account,
        recipient: &mut Account,
    ) -> SpaResult<()> {
        if ctx.accounts.set_or_verify(recipient.id(), &self.public_key)? {
            recipient.apply_public_key(self.public_key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStore, MemoryAccountStore};
    use crate::chain::ChainParams;
    use crate::crypto::public_key;
    use crate::prunable::MemoryPrunableMessageStore;

    struct Fixture {
        params: ChainParams,
        accounts: MemoryAccountStore,
        prunable_messages: MemoryPrunableMessageStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                params: ChainParams::default(),
                accounts: MemoryAccountStore::new(),
                prunable_messages: MemoryPrunableMessageStore::new(),
            }
        }

        fn ctx(&self) -> ChainContext<'_> {
            ChainContext {
                params: &self.params,
                height: 100,
                epoch_time: 1000,
                accounts: &self.accounts,
                prunable_messages: &self.prunable_messages,
            }
        }
    }

    fn recipient_key() -> [u8; 32] {
        public_key("recipient phrase")
    }

    fn recipient_tx() -> Transaction {
        let id = crypto::account_id_from_public_key(&recipient_key());
        Transaction::new(1, 1).with_recipient(id)
    }

    #[test]
    fn test_binary_round_trip() {
        let appendix = PublicKeyAnnouncement::new(recipient_key());
        let mut writer = BinaryWriter::new();
        appendix.write_to(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), appendix.size());
        assert_eq!(appendix.size(), 33);

        let mut reader = MemoryReader::new(&bytes);
        let parsed = PublicKeyAnnouncement::from_reader(&mut reader, 1).unwrap();
        assert_eq!(parsed, appendix);
    }

    #[test]
    fn test_json_round_trip() {
        let appendix = PublicKeyAnnouncement::new(recipient_key());
        let parsed = PublicKeyAnnouncement::parse(&appendix.to_json())
            .unwrap()
            .unwrap();
        assert_eq!(parsed, appendix);
    }

    #[test]
    fn test_validate_requires_recipient() {
        let fixture = Fixture::new();
        let appendix = PublicKeyAnnouncement::new(recipient_key());
        let err = appendix
            .validate(&fixture.ctx(), &Transaction::new(1, 1))
            .unwrap_err();
        assert!(matches!(err, SpaError::NotValid(_)));
    }

    #[test]
    fn test_validate_rejects_non_canonical_key() {
        let fixture = Fixture::new();
        let mut key = [0xFFu8; 32];
        key[31] = 0xFF;
        let appendix = PublicKeyAnnouncement::new(key);
        let tx = Transaction::new(1, 1).with_recipient(7);
        let err = appendix.validate(&fixture.ctx(), &tx).unwrap_err();
        match err {
            SpaError::NotValid(message) => {
                assert!(message.starts_with("Invalid recipient public key"))
            }
            other => panic!("expected NotValid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_account_id_mismatch() {
        let fixture = Fixture::new();
        let appendix = PublicKeyAnnouncement::new(recipient_key());
        let tx = Transaction::new(1, 1).with_recipient(12345);
        let err = appendix.validate(&fixture.ctx(), &tx).unwrap_err();
        assert_eq!(
            err,
            SpaError::not_valid("Announced public key does not match recipient accountId")
        );
    }

    #[test]
    fn test_validate_conflicting_announcement_is_transient() {
        let fixture = Fixture::new();
        let tx = recipient_tx();
        // Someone already announced a different key for this account id.
        fixture
            .accounts
            .set_or_verify(tx.recipient_id(), &public_key("other"))
            .unwrap();

        let appendix = PublicKeyAnnouncement::new(recipient_key());
        let err = appendix.validate(&fixture.ctx(), &tx).unwrap_err();
        assert!(matches!(err, SpaError::NotCurrentlyValid(_)));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let fixture = Fixture::new();
        let tx = recipient_tx();
        let appendix = PublicKeyAnnouncement::new(recipient_key());
        let mut sender = Account::new(1);
        let mut recipient = Account::new(tx.recipient_id());

        appendix
            .apply(&fixture.ctx(), &tx, &mut sender, &mut recipient)
            .unwrap();
        assert_eq!(recipient.public_key(), Some(&recipient_key()));
        let after_first = recipient.clone();

        appendix
            .apply(&fixture.ctx(), &tx, &mut sender, &mut recipient)
            .unwrap();
        assert_eq!(recipient, after_first);
        assert_eq!(
            fixture.accounts.get_public_key(tx.recipient_id()),
            Some(recipient_key())
        );
    }
}
