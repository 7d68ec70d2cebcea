// Copyright (C) 2013-2017 The Spa Project.
//
// encrypt_to_self_message.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

use super::encrypted_body::{EncryptedMessageBody, UnsealedMessageBody};
use super::{
    has_appendix, header_size, read_version, version_from_json, write_version, Appendix,
    Sealable,
};
use crate::account::Account;
use crate::chain::ChainContext;
use crate::crypto::{self, EncryptedData};
use crate::error::{SpaError, SpaResult};
use crate::fee::Fee;
use crate::transaction::Transaction;
use serde_json::{json, Value};
use spa_io::{BinaryWriter, MemoryReader};

/// A note the sender encrypts to their own public key, typically a record of
/// an outgoing payment. No recipient is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptToSelfMessage {
    version: u8,
    body: EncryptedMessageBody,
}

impl EncryptToSelfMessage {
    pub const NAME: &'static str = "EncryptToSelfMessage";

    pub fn new(encrypted_data: EncryptedData, is_text: bool, is_compressed: bool) -> Self {
        Self {
            version: if is_compressed { 1 } else { 2 },
            body: EncryptedMessageBody {
                encrypted_data,
                is_text,
                is_compressed,
            },
        }
    }

    pub fn from_reader(
        reader: &mut MemoryReader<'_>,
        transaction_version: u8,
    ) -> SpaResult<Self> {
        let version = read_version(reader, transaction_version)?;
        let body = EncryptedMessageBody::read(reader, version)?;
        Ok(Self { version, body })
    }

    pub fn from_json(attachment: &Value) -> SpaResult<Self> {
        let version = version_from_json(attachment, Self::NAME)?;
        let message_json = attachment
            .get("encryptToSelfMessage")
            .ok_or_else(|| SpaError::not_valid("Missing \"encryptToSelfMessage\""))?;
        Ok(Self {
            version,
            body: EncryptedMessageBody::from_json(message_json)?,
        })
    }

    pub fn parse(attachment: &Value) -> SpaResult<Option<Appendix>> {
        if !has_appendix(Self::NAME, attachment) {
            return Ok(None);
        }
        let message_json = attachment
            .get("encryptToSelfMessage")
            .ok_or_else(|| SpaError::not_valid("Missing \"encryptToSelfMessage\""))?;
        if message_json.get("data").is_none() {
            return Ok(Some(Appendix::UnsealedEncryptToSelfMessage(
                UnsealedEncryptToSelfMessage::from_json(attachment)?,
            )));
        }
        Ok(Some(Appendix::EncryptToSelfMessage(Self::from_json(
            attachment,
        )?)))
    }

    pub fn encrypted_data(&self) -> &EncryptedData {
        &self.body.encrypted_data
    }

    pub fn is_text(&self) -> bool {
        self.body.is_text
    }

    pub fn is_compressed(&self) -> bool {
        self.body.is_compressed
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn size(&self) -> usize {
        header_size(self.version) + self.body.size()
    }

    pub fn full_size(&self) -> usize {
        self.size()
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) -> SpaResult<()> {
        write_version(writer, self.version)?;
        self.body.write_to(writer)
    }

    pub fn to_json(&self) -> Value {
        json!({
            format!("version.{}", Self::NAME): self.version,
            "encryptToSelfMessage": self.body.to_json(),
        })
    }

    pub fn verify_version(&self, transaction_version: u8) -> bool {
        if transaction_version == 0 {
            self.version == 0
        } else {
            self.version == 1 || self.version == 2
        }
    }

    pub fn baseline_fee(&self, ctx: &ChainContext<'_>) -> Fee {
        Fee::size_based(ctx.params.one_spa, ctx.params.one_spa, 32)
    }

    pub(super) fn fee_size(&self) -> i64 {
        self.body.encrypted_data.data().len() as i64 - 16
    }

    pub fn validate(&self, ctx: &ChainContext<'_>, _transaction: &Transaction) -> SpaResult<()> {
        if ctx.height <= ctx.params.shuffling_block {
            return Ok(());
        }
        self.body.validate(ctx, self.version)
    }

    pub fn apply(
        &self,
        _ctx: &ChainContext<'_>,
        _transaction: &Transaction,
        _sender: &mut Account,
        _recipient: &mut Account,
    ) -> SpaResult<()> {
        Ok(())
    }
}

/// Draft of an [`EncryptToSelfMessage`]; sealing derives the key pair from
/// the sender's own secret phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealedEncryptToSelfMessage {
    version: u8,
    body: UnsealedMessageBody,
}

impl UnsealedEncryptToSelfMessage {
    pub fn new(plaintext: Vec<u8>, is_text: bool, is_compressed: bool) -> SpaResult<Self> {
        Ok(Self {
            version: if is_compressed { 1 } else { 2 },
            body: UnsealedMessageBody::new(plaintext, is_text, is_compressed)?,
        })
    }

    pub fn from_json(attachment: &Value) -> SpaResult<Self> {
        let version = version_from_json(attachment, EncryptToSelfMessage::NAME)?;
        let message_json = attachment
            .get("encryptToSelfMessage")
            .ok_or_else(|| SpaError::not_valid("Missing \"encryptToSelfMessage\""))?;
        Ok(Self {
            version,
            body: UnsealedMessageBody::from_json(message_json)?,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn size(&self) -> usize {
        header_size(self.version) + 4 + self.body.encrypted_size()
    }

    pub fn full_size(&self) -> usize {
        self.size()
    }

    pub fn write_to(&self, _writer: &mut BinaryWriter) -> SpaResult<()> {
        Err(SpaError::NotYetEncrypted("Message not yet encrypted"))
    }

    pub fn to_json(&self) -> Value {
        json!({
            format!("version.{}", EncryptToSelfMessage::NAME): self.version,
            "encryptToSelfMessage": self.body.to_json(),
        })
    }

    pub fn verify_version(&self, transaction_version: u8) -> bool {
        if transaction_version == 0 {
            self.version == 0
        } else {
            self.version == 1 || self.version == 2
        }
    }

    pub fn baseline_fee(&self, ctx: &ChainContext<'_>) -> Fee {
        Fee::size_based(ctx.params.one_spa, ctx.params.one_spa, 32)
    }

    pub(super) fn fee_size(&self) -> i64 {
        self.body.encrypted_data_length() as i64 - 16
    }

    pub fn validate(&self, ctx: &ChainContext<'_>, _transaction: &Transaction) -> SpaResult<()> {
        if ctx.height <= ctx.params.shuffling_block {
            return Ok(());
        }
        self.body.validate(ctx, self.version)
    }

    pub fn apply(
        &self,
        _ctx: &ChainContext<'_>,
        _transaction: &Transaction,
        _sender: &mut Account,
        _recipient: &mut Account,
    ) -> SpaResult<()> {
        Err(SpaError::NotYetEncrypted("Message not yet encrypted"))
    }
}

impl Sealable for UnsealedEncryptToSelfMessage {
    type Sealed = EncryptToSelfMessage;

    fn seal(self, secret_phrase: &str) -> SpaResult<EncryptToSelfMessage> {
        let own_public_key = crypto::public_key(secret_phrase);
        let encrypted_data = self.body.seal(secret_phrase, &own_public_key)?;
        Ok(EncryptToSelfMessage {
            version: self.version,
            body: EncryptedMessageBody {
                encrypted_data,
                is_text: self.body.is_text,
                is_compressed: self.body.is_compressed,
            },
        })
    }
}
