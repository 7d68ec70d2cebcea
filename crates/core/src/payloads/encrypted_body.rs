// Copyright (C) 2013-2017 The Spa Project.
//
// encrypted_body.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The shared body of the two sealed encrypted appendix kinds, and its
//! unsealed draft counterpart.

use super::{
    get_bool, get_bool_default_true, read_length_header, require_str, write_length_header,
};
use crate::chain::ChainContext;
use crate::convert;
use crate::crypto::EncryptedData;
use crate::error::{SpaError, SpaResult};
use serde_json::{json, Value};
use spa_io::{BinaryWriter, MemoryReader};

/// Ciphertext cap applied while reading the binary form.
const MAX_WIRE_DATA_LENGTH: usize = 1000;

/// Sealed `(ciphertext, nonce)` body plus its text and compression flags.
///
/// The appendix version encodes compression on the wire: version 1 means
/// compressed, version 2 means uncompressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct EncryptedMessageBody {
    pub encrypted_data: EncryptedData,
    pub is_text: bool,
    pub is_compressed: bool,
}

impl EncryptedMessageBody {
    pub fn read(reader: &mut MemoryReader<'_>, version: u8) -> SpaResult<Self> {
        let (length, is_text) = read_length_header(reader)?;
        let encrypted_data = EncryptedData::read(reader, length, MAX_WIRE_DATA_LENGTH)?;
        Ok(Self {
            encrypted_data,
            is_text,
            is_compressed: version != 2,
        })
    }

    pub fn from_json(message_json: &Value) -> SpaResult<Self> {
        let data = convert::parse_hex(require_str(message_json, "data")?)?;
        let nonce = convert::parse_hex(require_str(message_json, "nonce")?)?;
        Ok(Self {
            encrypted_data: EncryptedData::new(data, nonce),
            is_text: get_bool(message_json, "isText"),
            is_compressed: get_bool_default_true(message_json, "isCompressed"),
        })
    }

    pub fn size(&self) -> usize {
        4 + self.encrypted_data.size()
    }

    pub fn write_to(&self, writer: &mut BinaryWriter) -> SpaResult<()> {
        write_length_header(writer, self.encrypted_data.data().len(), self.is_text)?;
        self.encrypted_data.write_to(writer)?;
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        json!({
            "data": convert::to_hex(self.encrypted_data.data()),
            "nonce": convert::to_hex(self.encrypted_data.nonce()),
            "isText": self.is_text,
            "isCompressed": self.is_compressed,
        })
    }

    /// Structural validation shared by both sealed kinds. The caller applies
    /// the height gate.
    pub fn validate(&self, ctx: &ChainContext<'_>, version: u8) -> SpaResult<()> {
        let data_length = self.encrypted_data.data().len();
        let nonce_length = self.encrypted_data.nonce().len();
        if data_length > ctx.params.max_encrypted_message_length {
            return Err(SpaError::not_valid("Max encrypted message length exceeded"));
        }
        if (nonce_length != 32 && data_length > 0) || (nonce_length != 0 && data_length == 0) {
            return Err(SpaError::not_valid(format!(
                "Invalid nonce length {nonce_length}"
            )));
        }
        check_version_compression(version, self.is_compressed)
    }
}

/// Draft body: the plaintext and flags held until `seal` is invoked.
///
/// Compression happens once, at construction, so that sizes and fees are
/// stable across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct UnsealedMessageBody {
    pub plaintext: Vec<u8>,
    pub is_text: bool,
    pub is_compressed: bool,
    to_encrypt: Vec<u8>,
}

impl UnsealedMessageBody {
    pub fn new(plaintext: Vec<u8>, is_text: bool, is_compressed: bool) -> SpaResult<Self> {
        let to_encrypt = if is_compressed && !plaintext.is_empty() {
            convert::compress(&plaintext)?
        } else {
            plaintext.clone()
        };
        Ok(Self {
            plaintext,
            is_text,
            is_compressed,
            to_encrypt,
        })
    }

    pub fn from_json(message_json: &Value) -> SpaResult<Self> {
        let is_text = get_bool(message_json, "isText");
        let is_compressed = get_bool_default_true(message_json, "isCompressed");
        let raw = require_str(message_json, "messageToEncrypt")?;
        let plaintext = if is_text {
            raw.as_bytes().to_vec()
        } else {
            convert::parse_hex(raw)?
        };
        Self::new(plaintext, is_text, is_compressed)
    }

    /// Predicted ciphertext length after sealing.
    pub fn encrypted_data_length(&self) -> usize {
        EncryptedData::encrypted_data_length(&self.to_encrypt)
    }

    /// Predicted `(data, nonce)` size after sealing.
    pub fn encrypted_size(&self) -> usize {
        EncryptedData::encrypted_size(&self.to_encrypt)
    }

    pub fn seal(&self, secret_phrase: &str, their_public_key: &[u8; 32]) -> SpaResult<EncryptedData> {
        EncryptedData::encrypt(&self.to_encrypt, secret_phrase, their_public_key)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "messageToEncrypt": convert::message_string(&self.plaintext, self.is_text),
            "isText": self.is_text,
            "isCompressed": self.is_compressed,
        })
    }

    /// Draft-side validation: the predicted ciphertext must fit the cap and
    /// the version byte must agree with the compression flag.
    pub fn validate(&self, ctx: &ChainContext<'_>, version: u8) -> SpaResult<()> {
        if self.encrypted_data_length() > ctx.params.max_encrypted_message_length {
            return Err(SpaError::not_valid("Max encrypted message length exceeded"));
        }
        check_version_compression(version, self.is_compressed)
    }
}

/// Version 2 marks an uncompressed payload; any other pairing is malformed.
pub(super) fn check_version_compression(version: u8, is_compressed: bool) -> SpaResult<()> {
    if (version != 2 && !is_compressed) || (version == 2 && is_compressed) {
        return Err(SpaError::not_valid(format!(
            "Version mismatch - version {version}, isCompressed {is_compressed}"
        )));
    }
    Ok(())
}
