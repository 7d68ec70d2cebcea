// Copyright (C) 2013-2017 The Spa Project.
//
// plain_message.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

use super::{
    get_bool, has_appendix, header_size, read_length_header, read_version, require_str,
    version_from_json, write_length_header, write_version,
};
use crate::account::Account;
use crate::chain::ChainContext;
use crate::convert;
use crate::error::{SpaError, SpaResult};
use crate::fee::Fee;
use crate::transaction::Transaction;
use serde_json::{json, Value};
use spa_io::{BinaryWriter, MemoryReader};

/// Hard cap on the message body, text or binary.
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// An arbitrary plaintext message attached to a transaction.
///
/// The wire body is an int32 length whose high bit flags UTF-8 text,
/// followed by the message bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainMessage {
    version: u8,
    message: Vec<u8>,
    is_text: bool,
}

impl PlainMessage {
    pub const NAME: &'static str = "Message";

    /// A binary message.
    pub fn new(message: Vec<u8>) -> Self {
        Self::with_flag(message, false)
    }

    /// A UTF-8 text message.
    pub fn from_text(text: &str) -> Self {
        Self::with_flag(text.as_bytes().to_vec(), true)
    }

    pub fn with_flag(message: Vec<u8>, is_text: bool) -> Self {
        Self {
            version: 1,
            message,
            is_text,
        }
    }

    pub fn from_reader(
        reader: &mut MemoryReader<'_>,
        transaction_version: u8,
    ) -> SpaResult<Self> {
        let version = read_version(reader, transaction_version)?;
        let (length, is_text) = read_length_header(reader)?;
        if length > MAX_MESSAGE_LENGTH {
            return Err(SpaError::not_valid(format!(
                "Invalid arbitrary message length: {length}"
            )));
        }
        let message = reader.read_bytes(length)?;
        if is_text && !convert::is_canonical_utf8(&message) {
            return Err(SpaError::not_valid("Message is not UTF-8 text"));
        }
        Ok(Self {
            version,
            message,
            is_text,
        })
    }

    pub fn from_json(attachment: &Value) -> SpaResult<Self> {
        let version = version_from_json(attachment, Self::NAME)?;
        let is_text = get_bool(attachment, "messageIsText");
        let raw = require_str(attachment, "message")?;
        let message = if is_text {
            raw.as_bytes().to_vec()
        } else {
            convert::parse_hex(raw)?
        };
        if message.len() > MAX_MESSAGE_LENGTH {
            return Err(SpaError::not_valid(format!(
                "Invalid arbitrary message length: {}",
                message.len()
            )));
        }
        Ok(Self {
            version,
            message,
            is_text,
        })
    }

    pub fn parse(attachment: &Value) -> SpaResult<Option<Self>> {
        if !has_appendix(Self::NAME, attachment) {
            return Ok(None);
        }
        Self::from_json(attachment).map(Some)
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn is_text(&self) -> bool {
        self.is_text
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    fn body_size(&self) -> usize {
        4 + self.message.len()
    }

    pub fn size(&self) -> usize {
        header_size(self.version) + self.body_size()
    }

    pub fn full_size(&self) -> usize {
        self.size()
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) -> SpaResult<()> {
        write_version(writer, self.version)?;
        write_length_header(writer, self.message.len(), self.is_text)?;
        writer.write_bytes(&self.message)?;
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        json!({
            format!("version.{}", Self::NAME): self.version,
            "message": convert::message_string(&self.message, self.is_text),
            "messageIsText": self.is_text,
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
        Fee::size_based(0, ctx.params.one_spa, 32)
    }

    pub(super) fn fee_size(&self) -> i64 {
        self.message.len() as i64
    }

    pub fn validate(&self, _ctx: &ChainContext<'_>, _transaction: &Transaction) -> SpaResult<()> {
        if self.message.len() > MAX_MESSAGE_LENGTH {
            return Err(SpaError::not_valid(format!(
                "Invalid arbitrary message length: {}",
                self.message.len()
            )));
        }
        if self.is_text && !convert::is_canonical_utf8(&self.message) {
            return Err(SpaError::not_valid("Message is not UTF-8 text"));
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
        Ok(())
    }
}
