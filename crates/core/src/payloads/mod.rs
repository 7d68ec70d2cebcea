// Copyright (C) 2013-2017 The Spa Project.
//
// payloads/mod.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Transaction appendices: optional typed attachments carried by a
//! transaction.
//!
//! Every appendix serializes to a deterministic binary body, prefixed by a
//! one-byte version when the enclosing transaction is version 1 or later,
//! and to a JSON object keyed by `"version.<Name>"` on the RPC surface.
//! The set of kinds is closed; dispatch is a match on the enum tag.

mod encrypt_to_self_message;
mod encrypted_body;
mod encrypted_message;
mod plain_message;
mod prunable_encrypted_message;
mod public_key_announcement;

pub use encrypt_to_self_message::{EncryptToSelfMessage, UnsealedEncryptToSelfMessage};
pub use encrypted_message::{EncryptedMessage, UnsealedEncryptedMessage};
pub use plain_message::{PlainMessage, MAX_MESSAGE_LENGTH};
pub use prunable_encrypted_message::{
    PrunableEncryptedMessage, UnsealedPrunableEncryptedMessage,
};
pub use public_key_announcement::PublicKeyAnnouncement;

use crate::account::Account;
use crate::chain::ChainContext;
use crate::error::{SpaError, SpaResult};
use crate::fee::Fee;
use crate::transaction::Transaction;
use serde_json::Value;
use spa_io::{BinaryWriter, IoResult, MemoryReader};

/// Appendix flag bits in the transaction header, in stream order.
pub const FLAG_MESSAGE: u32 = 1 << 0;
pub const FLAG_ENCRYPTED_MESSAGE: u32 = 1 << 1;
pub const FLAG_PUBLIC_KEY_ANNOUNCEMENT: u32 = 1 << 2;
pub const FLAG_ENCRYPT_TO_SELF_MESSAGE: u32 = 1 << 3;
pub const FLAG_PRUNABLE_ENCRYPTED_MESSAGE: u32 = 1 << 6;

const KNOWN_FLAGS: u32 = FLAG_MESSAGE
    | FLAG_ENCRYPTED_MESSAGE
    | FLAG_PUBLIC_KEY_ANNOUNCEMENT
    | FLAG_ENCRYPT_TO_SELF_MESSAGE
    | FLAG_PRUNABLE_ENCRYPTED_MESSAGE;

/// A payload whose body may be dropped from the chain after its retention
/// window, leaving only a content hash.
pub trait Prunable {
    /// The 32-byte content hash that stays on-chain.
    fn prunable_hash(&self) -> [u8; 32];

    /// Whether the payload bytes are currently on hand.
    fn has_prunable_data(&self) -> bool;

    /// Re-inserts a previously observed payload into the store, carrying its
    /// original block timestamp and height.
    fn restore_prunable_data(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        block_timestamp: i32,
        height: i32,
    );

    /// Whether the store should still be consulted for this transaction's
    /// payload, given its age.
    fn should_load_prunable(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        include_expired: bool,
    ) -> bool {
        let window = if include_expired && ctx.params.include_expired_prunable {
            ctx.params.max_prunable_lifetime
        } else {
            ctx.params.min_prunable_lifetime
        };
        ctx.epoch_time - transaction.timestamp() < window
    }
}

/// A draft appendix that carries plaintext until sealed exactly once.
pub trait Sealable {
    type Sealed;

    /// Seals the draft, producing the immutable appendix. After sealing the
    /// result is indistinguishable from a natively parsed one.
    fn seal(self, secret_phrase: &str) -> SpaResult<Self::Sealed>;
}

/// An optional typed attachment to a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Appendix {
    PlainMessage(PlainMessage),
    EncryptedMessage(EncryptedMessage),
    UnsealedEncryptedMessage(UnsealedEncryptedMessage),
    EncryptToSelfMessage(EncryptToSelfMessage),
    UnsealedEncryptToSelfMessage(UnsealedEncryptToSelfMessage),
    PrunableEncryptedMessage(PrunableEncryptedMessage),
    UnsealedPrunableEncryptedMessage(UnsealedPrunableEncryptedMessage),
    PublicKeyAnnouncement(PublicKeyAnnouncement),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Appendix::PlainMessage($inner) => $body,
            Appendix::EncryptedMessage($inner) => $body,
            Appendix::UnsealedEncryptedMessage($inner) => $body,
            Appendix::EncryptToSelfMessage($inner) => $body,
            Appendix::UnsealedEncryptToSelfMessage($inner) => $body,
            Appendix::PrunableEncryptedMessage($inner) => $body,
            Appendix::UnsealedPrunableEncryptedMessage($inner) => $body,
            Appendix::PublicKeyAnnouncement($inner) => $body,
        }
    };
}

impl Appendix {
    /// The appendix name used by the `"version.<Name>"` JSON key.
    pub fn name(&self) -> &'static str {
        match self {
            Appendix::PlainMessage(_) => PlainMessage::NAME,
            Appendix::EncryptedMessage(_) | Appendix::UnsealedEncryptedMessage(_) => {
                EncryptedMessage::NAME
            }
            Appendix::EncryptToSelfMessage(_) | Appendix::UnsealedEncryptToSelfMessage(_) => {
                EncryptToSelfMessage::NAME
            }
            Appendix::PrunableEncryptedMessage(_)
            | Appendix::UnsealedPrunableEncryptedMessage(_) => PrunableEncryptedMessage::NAME,
            Appendix::PublicKeyAnnouncement(_) => PublicKeyAnnouncement::NAME,
        }
    }

    pub fn version(&self) -> u8 {
        dispatch!(self, inner => inner.version())
    }

    /// On-wire size in bytes, excluding any pruned payload.
    pub fn size(&self) -> usize {
        dispatch!(self, inner => inner.size())
    }

    /// Size in bytes including a prunable payload whether or not it is
    /// currently on hand.
    pub fn full_size(&self) -> usize {
        dispatch!(self, inner => inner.full_size())
    }

    /// Writes the version byte (when `version > 0`) followed by the body.
    pub fn write_to(&self, writer: &mut BinaryWriter) -> SpaResult<()> {
        dispatch!(self, inner => inner.write_to(writer))
    }

    /// The JSON attachment fields for this appendix, including its
    /// `"version.<Name>"` entry.
    pub fn to_json(&self) -> Value {
        dispatch!(self, inner => inner.to_json())
    }

    /// Whether this appendix version byte is acceptable inside a transaction
    /// of the given version.
    pub fn verify_version(&self, transaction_version: u8) -> bool {
        dispatch!(self, inner => inner.verify_version(transaction_version))
    }

    /// Height at which the baseline fee schedule takes effect.
    pub fn baseline_fee_height(&self, ctx: &ChainContext<'_>) -> i32 {
        ctx.params.shuffling_block
    }

    /// The fee schedule for this appendix kind.
    pub fn baseline_fee(&self, ctx: &ChainContext<'_>) -> Fee {
        dispatch!(self, inner => inner.baseline_fee(ctx))
    }

    /// Height of the next scheduled fee change; no change is scheduled.
    pub fn next_fee_height(&self) -> i32 {
        i32::MAX
    }

    /// The upcoming fee schedule; defaults to the baseline.
    pub fn next_fee(&self, ctx: &ChainContext<'_>) -> Fee {
        self.baseline_fee(ctx)
    }

    /// Evaluates the baseline fee against this appendix's effective size.
    /// `None` reports 63-bit overflow, which fails the enclosing
    /// transaction.
    pub fn fee(&self, ctx: &ChainContext<'_>) -> Option<i64> {
        self.baseline_fee(ctx).compute(dispatch!(self, inner => inner.fee_size()))
    }

    /// Phased execution is a feature of the wider system; appendices in this
    /// subsystem never defer.
    pub fn is_phased(&self, _transaction: &Transaction) -> bool {
        false
    }

    /// Kind-specific consensus validation. Side-effect free; reads only the
    /// appendix, the envelope, and read-only chain state.
    pub fn validate(&self, ctx: &ChainContext<'_>, transaction: &Transaction) -> SpaResult<()> {
        dispatch!(self, inner => inner.validate(ctx, transaction))
    }

    /// Re-validation at finish; meaningful only under phased execution.
    pub fn validate_at_finish(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
    ) -> SpaResult<()> {
        if !self.is_phased(transaction) {
            return Ok(());
        }
        self.validate(ctx, transaction)
    }

    /// Kind-specific state mutation on block application.
    pub fn apply(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        sender: &mut Account,
        recipient: &mut Account,
    ) -> SpaResult<()> {
        dispatch!(self, inner => inner.apply(ctx, transaction, sender, recipient))
    }

    /// Lazily rehydrates a prunable payload from the store.
    pub fn load_prunable(
        &self,
        ctx: &ChainContext<'_>,
        transaction: &Transaction,
        include_expired: bool,
    ) {
        if let Appendix::PrunableEncryptedMessage(inner) = self {
            inner.load_prunable(ctx, transaction, include_expired);
        }
    }

    /// Parses the appendices of a transaction in stream order, driven by the
    /// header flags. Unknown flag bits and version mismatches are rejected.
    pub fn parse_all(
        reader: &mut MemoryReader<'_>,
        flags: u32,
        transaction_version: u8,
    ) -> SpaResult<Vec<Appendix>> {
        if flags & !KNOWN_FLAGS != 0 {
            return Err(SpaError::not_valid(format!(
                "Unsupported appendix flags: {flags:#x}"
            )));
        }
        let mut appendices = Vec::new();
        if flags & FLAG_MESSAGE != 0 {
            appendices.push(Appendix::PlainMessage(PlainMessage::from_reader(
                reader,
                transaction_version,
            )?));
        }
        if flags & FLAG_ENCRYPTED_MESSAGE != 0 {
            appendices.push(Appendix::EncryptedMessage(EncryptedMessage::from_reader(
                reader,
                transaction_version,
            )?));
        }
        if flags & FLAG_PUBLIC_KEY_ANNOUNCEMENT != 0 {
            appendices.push(Appendix::PublicKeyAnnouncement(
                PublicKeyAnnouncement::from_reader(reader, transaction_version)?,
            ));
        }
        if flags & FLAG_ENCRYPT_TO_SELF_MESSAGE != 0 {
            appendices.push(Appendix::EncryptToSelfMessage(
                EncryptToSelfMessage::from_reader(reader, transaction_version)?,
            ));
        }
        if flags & FLAG_PRUNABLE_ENCRYPTED_MESSAGE != 0 {
            appendices.push(Appendix::PrunableEncryptedMessage(
                PrunableEncryptedMessage::from_reader(reader, transaction_version)?,
            ));
        }
        for appendix in &appendices {
            if !appendix.verify_version(transaction_version) {
                return Err(SpaError::not_valid(format!(
                    "Invalid attachment version {}",
                    appendix.version()
                )));
            }
        }
        Ok(appendices)
    }

    /// Parses every appendix present in an attachment JSON object. Presence
    /// is keyed on `"version.<Name>"`; unknown keys are ignored.
    pub fn parse_attachment(attachment: &Value) -> SpaResult<Vec<Appendix>> {
        let mut appendices = Vec::new();
        if let Some(appendix) = PlainMessage::parse(attachment)? {
            appendices.push(Appendix::PlainMessage(appendix));
        }
        if let Some(appendix) = EncryptedMessage::parse(attachment)? {
            appendices.push(appendix);
        }
        if let Some(appendix) = PublicKeyAnnouncement::parse(attachment)? {
            appendices.push(Appendix::PublicKeyAnnouncement(appendix));
        }
        if let Some(appendix) = EncryptToSelfMessage::parse(attachment)? {
            appendices.push(appendix);
        }
        if let Some(appendix) = PrunableEncryptedMessage::parse(attachment)? {
            appendices.push(appendix);
        }
        Ok(appendices)
    }
}

impl From<PlainMessage> for Appendix {
    fn from(appendix: PlainMessage) -> Self {
        Appendix::PlainMessage(appendix)
    }
}

impl From<EncryptedMessage> for Appendix {
    fn from(appendix: EncryptedMessage) -> Self {
        Appendix::EncryptedMessage(appendix)
    }
}

impl From<EncryptToSelfMessage> for Appendix {
    fn from(appendix: EncryptToSelfMessage) -> Self {
        Appendix::EncryptToSelfMessage(appendix)
    }
}

impl From<PrunableEncryptedMessage> for Appendix {
    fn from(appendix: PrunableEncryptedMessage) -> Self {
        Appendix::PrunableEncryptedMessage(appendix)
    }
}

impl From<PublicKeyAnnouncement> for Appendix {
    fn from(appendix: PublicKeyAnnouncement) -> Self {
        Appendix::PublicKeyAnnouncement(appendix)
    }
}

/// True when the attachment JSON carries an appendix of the given name.
pub fn has_appendix(name: &str, attachment: &Value) -> bool {
    attachment
        .get(format!("version.{name}"))
        .map_or(false, |value| !value.is_null())
}

/// Reads the per-appendix version byte; version-0 transactions have none.
pub(crate) fn read_version(
    reader: &mut MemoryReader<'_>,
    transaction_version: u8,
) -> IoResult<u8> {
    if transaction_version == 0 {
        Ok(0)
    } else {
        reader.read_u8()
    }
}

/// Writes the version byte when `version > 0`.
pub(crate) fn write_version(writer: &mut BinaryWriter, version: u8) -> IoResult<()> {
    if version > 0 {
        writer.write_u8(version)?;
    }
    Ok(())
}

/// Bytes the version byte contributes to the appendix size.
pub(crate) fn header_size(version: u8) -> usize {
    usize::from(version > 0)
}

/// Extracts the `"version.<Name>"` value; a missing key means version 0.
pub(crate) fn version_from_json(attachment: &Value, name: &str) -> SpaResult<u8> {
    match attachment.get(format!("version.{name}")) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .filter(|v| *v <= u64::from(u8::MAX))
            .map(|v| v as u8)
            .ok_or_else(|| SpaError::not_valid(format!("Invalid version.{name} value"))),
    }
}

/// Reads the int32 length header whose high bit carries the text flag.
pub(crate) fn read_length_header(reader: &mut MemoryReader<'_>) -> IoResult<(usize, bool)> {
    let raw = reader.read_i32()?;
    let is_text = raw < 0;
    Ok(((raw & i32::MAX) as usize, is_text))
}

/// Writes the int32 length header, folding the text flag into the high bit.
pub(crate) fn write_length_header(
    writer: &mut BinaryWriter,
    length: usize,
    is_text: bool,
) -> SpaResult<()> {
    if length > i32::MAX as usize {
        return Err(SpaError::not_valid(format!(
            "Payload length {length} does not fit the length header"
        )));
    }
    let mut raw = length as u32;
    if is_text {
        raw |= 0x8000_0000;
    }
    writer.write_i32(raw as i32)?;
    Ok(())
}

/// Extracts a required string field from a JSON object.
pub(crate) fn require_str<'a>(value: &'a Value, key: &str) -> SpaResult<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| SpaError::not_valid(format!("Missing or invalid \"{key}\"")))
}

/// Reads an optional boolean field; anything but `true` is `false`.
pub(crate) fn get_bool(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Reads an optional boolean field, defaulting to `true` when absent; a
/// present non-`true` value is `false`.
pub(crate) fn get_bool_default_true(value: &Value, key: &str) -> bool {
    match value.get(key) {
        None | Some(Value::Null) => true,
        Some(v) => v.as_bool() == Some(true),
    }
}
