// Copyright (C) 2013-2017 The Spa Project.
//
// prunable_encrypted_message.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

use super::encrypted_body::UnsealedMessageBody;
use super::{
    get_bool, has_appendix, header_size, read_version, require_str, version_from_json,
    write_version, Appendix, Prunable, Sealable,
};
use crate::account::Account;
use crate::chain::ChainContext;
use crate::convert;
use crate::crypto::EncryptedData;
use crate::error::{SpaError, SpaResult};
use crate::fee::Fee;
use crate::prunable::PrunableMessage;
use crate::transaction::Transaction;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use spa_io::{BinaryWriter, MemoryReader};
use std::sync::Arc;
use tracing::debug;

/// What the appendix itself carries: either just the on-chain content hash
/// (payload pruned or never attached locally) or the payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PrunablePayload {
    Hash([u8; 32]),
    Present {
        encrypted_data: EncryptedData,
        is_text: bool,
        is_compressed: bool,
    },
}

/// An encrypted message whose body lives in the prunable store; only its
/// 32-byte content hash is part of the transaction bytes.
///
/// The payload slot is filled lazily from the store; a single guarded write
/// publishes the `Arc` and readers only clone the pointer.
#[derive(Debug)]
pub struct PrunableEncryptedMessage {
    version: u8,
    payload: PrunablePayload,
    prunable_message: RwLock<Option<Arc<PrunableMessage>>>,
}

impl PrunableEncryptedMessage {
    pub const NAME: &'static str = "PrunableEncryptedMessage";

    pub fn new(encrypted_data: EncryptedData, is_text: bool, is_compressed: bool) -> Self {
        Self {
            version: 1,
            payload: PrunablePayload::Present {
                encrypted_data,
                is_text,
                is_compressed,
            },
            prunable_message: RwLock::new(None),
        }
    }

    /// The wire form is always the bare hash.
    pub fn from_reader(
        reader: &mut MemoryReader<'_>,
        transaction_version: u8,
    ) -> SpaResult<Self> {
        let version = read_version(reader, transaction_version)?;
        let hash = reader.read_array::<32>()?;
        Ok(Self {
            version,
            payload: PrunablePayload::Hash(hash),
            prunable_message: RwLock::new(None),
        })
    }

    pub fn from_json(attachment: &Value) -> SpaResult<Self> {
        let version = version_from_json(attachment, Self::NAME)?;
        let message_json = attachment.get("encryptedMessage");
        let hash_hex = attachment
            .get("encryptedMessageHash")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());

        let payload = match (hash_hex, message_json) {
            (Some(hash_hex), None) => PrunablePayload::Hash(convert::parse_hex32(hash_hex)?),
            (_, Some(message_json)) => PrunablePayload::Present {
                encrypted_data: EncryptedData::new(
                    convert::parse_hex(require_str(message_json, "data")?)?,
                    convert::parse_hex(require_str(message_json, "nonce")?)?,
                ),
                is_text: get_bool(message_json, "isText"),
                is_compressed: get_bool(message_json, "isCompressed"),
            },
            (None, None) => {
                return Err(SpaError::not_valid(
                    "Missing \"encryptedMessage\" and \"encryptedMessageHash\"",
                ))
            }
        };
        Ok(Self {
            version,
            payload,
            prunable_message: RwLock::new(None),
        })
    }

    pub fn parse(attachment: &Value) -> SpaResult<Option<Appendix>> {
        if !has_appendix(Self::NAME, attachment) {
            return Ok(None);
        }
        if let Some(message_json) = attachment.get("encryptedMessage") {
            if message_json.get("data").is_none() {
                return Ok(Some(Appendix::UnsealedPrunableEncryptedMessage(
                    UnsealedPrunableEncryptedMessage::from_json(attachment)?,
                )));
            }
        }
        Ok(Some(Appendix::PrunableEncryptedMessage(Self::from_json(
            attachment,
        )?)))
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// The content hash: `sha256(isText ‖ isCompressed ‖ data ‖ nonce)`,
    /// or the hash carried verbatim when the payload is not on hand.
    pub fn hash(&self) -> [u8; 32] {
        match &self.payload {
            PrunablePayload::Hash(hash) => *hash,
            PrunablePayload::Present {
                encrypted_data,
                is_text,
                is_compressed,
            } => {
                let mut digest = Sha256::new();
                digest.update([u8::from(*is_text)]);
                digest.update([u8::from(*is_compressed)]);
                digest.update(encrypted_data.data());
                digest.update(encrypted_data.nonce());
                digest.finalize().into()
            }
        }
    }

    /// The payload bytes, preferring a store-loaded copy over the field.
    pub fn encrypted_data(&self) -> Option<EncryptedData> {
        if let Some(message) = self.prunable_message.read().as_ref() {
            return Some(message.encrypted_data.clone());
        }
        match &self.payload {
            PrunablePayload::Present { encrypted_data, .. } => Some(encrypted_data.clone()),
            PrunablePayload::Hash(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        if let Some(message) = self.prunable_message.read().as_ref() {
            return message.is_text;
        }
        matches!(&self.payload, PrunablePayload::Present { is_text: true, .. })
    }

    pub fn is_compressed(&self) -> bool {
        if let Some(message) = self.prunable_message.read().as_ref() {
            return message.is_compressed;
        }
        matches!(
            &self.payload,
            PrunablePayload::Present {
                is_compressed: true,
                ..
            }
        )
    }

    fn encrypted_data_length(&self) -> usize {
        self.encrypted_data().map_or(0, |data| data.data().len())
    }

    pub fn size(&self) -> usize {
        header_size(self.version) + 32
    }

    pub fn full_size(&self) -> usize {
        header_size(self.version) + self.encrypted_data_length()
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) -> SpaResult<()> {
        write_version(writer, self.version)?;
        writer.write_bytes(&self.hash())?;
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert(
            format!("version.{}", Self::NAME),
            Value::from(self.version),
        );
        if let Some(encrypted_data) = self.encrypted_data() {
            json.insert(
                "encryptedMessage".to_string(),
                json!({
                    "data": convert::to_hex(encrypted_data.data()),
                    "nonce": convert::to_hex(encrypted_data.nonce()),
                    "isText": self.is_text(),
                    "isCompressed": self.is_compressed(),
                }),
            );
        }
        json.insert(
            "encryptedMessageHash".to_string(),
            Value::from(convert::to_hex(&self.hash())),
        );
        Value::Object(json)
    }

    pub fn verify_version(&self, transaction_version: u8) -> bool {
        if transaction_version == 0 {
            self.version == 0
        } else {
            self.version == 1
        }
    }

    pub fn baseline_fee(&self, ctx: &ChainContext<'_>) -> Fee {
        Fee::size_based(0, ctx.params.one_spa / 10, 32)
    }

    pub(super) fn fee_size(&self) -> i64 {
        self.full_size() as i64
    }

    pub fn validate(&self, ctx: &ChainContext<'_>, transaction: &Transaction) -> SpaResult<()> {
        if transaction.has_encrypted_message() {
            return Err(SpaError::not_valid(
                "Cannot have both encrypted and prunable encrypted message attachments",
            ));
        }
        match self.encrypted_data() {
            None => {
                if ctx.epoch_time - transaction.timestamp() < ctx.params.min_prunable_lifetime {
                    return Err(SpaError::not_currently_valid(
                        "Encrypted message has been pruned prematurely",
                    ));
                }
            }
            Some(encrypted_data) => {
                let data_length = encrypted_data.data().len();
                let nonce_length = encrypted_data.nonce().len();
                if data_length > ctx.params.max_prunable_encrypted_message_length {
                    return Err(SpaError::not_valid(format!(
                        "Message length {} exceeds max prunable encrypted message length {}",
                        data_length, ctx.params.max_prunable_encrypted_message_length
                    )));
                }
                if (nonce_length != 32 && data_length > 0)
                    || (nonce_length != 0 && data_length == 0)
                {
                    return Err(SpaError::not_valid(format!(
                        "Invalid nonce length {nonce_length}"
                    )));
                }
            }
        }
        if transaction.recipient_id() == 0 {
            return Err(SpaError::not_valid(
                "Encrypted messages cannot be attached to transactions with no recipient",
            ));
        }
        Ok(())
    }

    pub fn apply(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        _sender: &mut Account,
        _recipient: &mut Account,
    ) -> SpaResult<()> {
        if ctx.epoch_time - transaction.timestamp() < ctx.params.max_prunable_lifetime {
            if let Some(encrypted_data) = self.encrypted_data() {
                ctx.prunable_messages.add(PrunableMessage {
                    transaction_id: transaction.id(),
                    encrypted_data,
                    is_text: self.is_text(),
                    is_compressed: self.is_compressed(),
                    block_timestamp: ctx.epoch_time,
                    height: ctx.height,
                });
            }
        }
        Ok(())
    }

    /// Rehydrates the payload from the store when it is absent and the
    /// transaction is still inside the retention window.
    pub fn load_prunable(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        include_expired: bool,
    ) {
        if self.has_prunable_data()
            || !self.should_load_prunable(ctx, transaction, include_expired)
        {
            return;
        }
        if let Some(message) = ctx.prunable_messages.get(transaction.id()) {
            if !message.encrypted_data.is_empty() {
                debug!(
                    transaction_id = transaction.id(),
                    "loaded prunable message payload"
                );
                *self.prunable_message.write() = Some(message);
            }
        }
    }
}

impl Prunable for PrunableEncryptedMessage {
    fn prunable_hash(&self) -> [u8; 32] {
        self.hash()
    }

    fn has_prunable_data(&self) -> bool {
        if self.prunable_message.read().is_some() {
            return true;
        }
        matches!(&self.payload, PrunablePayload::Present { .. })
    }

    fn restore_prunable_data(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        block_timestamp: i32,
        height: i32,
    ) {
        if let Some(encrypted_data) = self.encrypted_data() {
            ctx.prunable_messages.add(PrunableMessage {
                transaction_id: transaction.id(),
                encrypted_data,
                is_text: self.is_text(),
                is_compressed: self.is_compressed(),
                block_timestamp,
                height,
            });
        }
    }
}

impl Clone for PrunableEncryptedMessage {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            payload: self.payload.clone(),
            prunable_message: RwLock::new(self.prunable_message.read().clone()),
        }
    }
}

// The hash binds the payload content, so two appendices are interchangeable
// exactly when version and hash agree.
impl PartialEq for PrunableEncryptedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && self.hash() == other.hash()
    }
}

/// Draft of a [`PrunableEncryptedMessage`]: plaintext plus the recipient's
/// public key, held until sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealedPrunableEncryptedMessage {
    version: u8,
    body: UnsealedMessageBody,
    recipient_public_key: [u8; 32],
}

impl UnsealedPrunableEncryptedMessage {
    pub fn new(
        plaintext: Vec<u8>,
        is_text: bool,
        is_compressed: bool,
        recipient_public_key: [u8; 32],
    ) -> SpaResult<Self> {
        Ok(Self {
            version: 1,
            body: UnsealedMessageBody::new(plaintext, is_text, is_compressed)?,
            recipient_public_key,
        })
    }

    pub fn from_json(attachment: &Value) -> SpaResult<Self> {
        let version = version_from_json(attachment, PrunableEncryptedMessage::NAME)?;
        let message_json = attachment
            .get("encryptedMessage")
            .ok_or_else(|| SpaError::not_valid("Missing \"encryptedMessage\""))?;
        Ok(Self {
            version,
            body: UnsealedMessageBody::from_json(message_json)?,
            recipient_public_key: convert::parse_hex32(require_str(
                attachment,
                "recipientPublicKey",
            )?)?,
        })
    }

    pub fn recipient_public_key(&self) -> &[u8; 32] {
        &self.recipient_public_key
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn size(&self) -> usize {
        header_size(self.version) + 32
    }

    pub fn full_size(&self) -> usize {
        header_size(self.version) + self.body.encrypted_data_length()
    }

    pub fn write_to(&self, _writer: &mut BinaryWriter) -> SpaResult<()> {
        Err(SpaError::NotYetEncrypted(
            "Prunable encrypted message not yet encrypted",
        ))
    }

    pub fn to_json(&self) -> Value {
        json!({
            format!("version.{}", PrunableEncryptedMessage::NAME): self.version,
            "encryptedMessage": self.body.to_json(),
            "recipientPublicKey": convert::to_hex(&self.recipient_public_key),
        })
    }

    pub fn verify_version(&self, transaction_version: u8) -> bool {
        if transaction_version == 0 {
            self.version == 0
        } else {
            self.version == 1
        }
    }

    pub fn baseline_fee(&self, ctx: &ChainContext<'_>) -> Fee {
        Fee::size_based(0, ctx.params.one_spa / 10, 32)
    }

    pub(super) fn fee_size(&self) -> i64 {
        self.full_size() as i64
    }

    pub fn validate(&self, ctx: &ChainContext<'_>, _transaction: &Transaction) -> SpaResult<()> {
        let data_length = self.body.encrypted_data_length();
        if data_length > ctx.params.max_prunable_encrypted_message_length {
            return Err(SpaError::not_valid(format!(
                "Message length {} exceeds max prunable encrypted message length {}",
                data_length, ctx.params.max_prunable_encrypted_message_length
            )));
        }
        Ok(())
    }

    pub fn apply(
        &self,
        _ctx: &ChainContext<'_>,
        _transaction: &Transaction,
        _sender: &mut Account,
        _recipient: &mut Account,
    ) -> SpaResult<()> {
        Err(SpaError::NotYetEncrypted(
            "Prunable encrypted message not yet encrypted",
        ))
    }
}

impl Sealable for UnsealedPrunableEncryptedMessage {
    type Sealed = PrunableEncryptedMessage;

    fn seal(self, secret_phrase: &str) -> SpaResult<PrunableEncryptedMessage> {
        let encrypted_data = self.body.seal(secret_phrase, &self.recipient_public_key)?;
        Ok(PrunableEncryptedMessage {
            version: self.version,
            payload: PrunablePayload::Present {
                encrypted_data,
                is_text: self.body.is_text,
                is_compressed: self.body.is_compressed,
            },
            prunable_message: RwLock::new(None),
        })
    }
}
