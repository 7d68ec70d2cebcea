// Copyright (C) 2013-2017 The Spa Project.
//
// encrypted_data.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The opaque sealed payload: an authenticated ciphertext together with the
//! 32-byte wire nonce that randomizes its key derivation.

use crate::crypto;
use crate::error::{SpaError, SpaResult};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use spa_io::{BinaryWriter, IoResult, MemoryReader};

/// Length of the wire nonce accompanying a non-empty ciphertext.
pub const NONCE_LENGTH: usize = 32;

/// Bytes the AEAD seal adds on top of the plaintext.
const SEAL_OVERHEAD: usize = 16;

/// An encrypted payload as it travels on the wire: `(data, nonce)`.
///
/// Either both parts are present (`nonce.len() == 32`, `data` non-empty) or
/// both are empty; no other combination is well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    data: Vec<u8>,
    nonce: Vec<u8>,
}

impl EncryptedData {
    /// Wraps raw ciphertext and nonce without inspecting them; validation of
    /// the length rule happens in appendix `validate`.
    pub fn new(data: Vec<u8>, nonce: Vec<u8>) -> Self {
        Self { data, nonce }
    }

    /// The empty payload, used when the plaintext is empty.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            nonce: Vec::new(),
        }
    }

    /// Reads `length` ciphertext bytes followed by the 32-byte nonce.
    /// A zero length yields the empty payload and consumes no nonce.
    pub fn read(reader: &mut MemoryReader<'_>, length: usize, max_length: usize) -> SpaResult<Self> {
        if length == 0 {
            return Ok(Self::empty());
        }
        if length > max_length {
            return Err(SpaError::not_valid(format!(
                "Max encrypted data length exceeded: {length}"
            )));
        }
        let data = reader.read_bytes(length)?;
        let nonce = reader.read_bytes(NONCE_LENGTH)?;
        Ok(Self { data, nonce })
    }

    /// Writes ciphertext then nonce.
    pub fn write_to(&self, writer: &mut BinaryWriter) -> IoResult<()> {
        writer.write_bytes(&self.data)?;
        writer.write_bytes(&self.nonce)
    }

    /// On-wire size of this payload, excluding any length header.
    pub fn size(&self) -> usize {
        self.data.len() + self.nonce.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Predicts the ciphertext length [`encrypt`](Self::encrypt) produces
    /// for a plaintext, without encrypting. Drafts use this for fee sizing.
    pub fn encrypted_data_length(plaintext: &[u8]) -> usize {
        if plaintext.is_empty() {
            0
        } else {
            plaintext.len() + SEAL_OVERHEAD
        }
    }

    /// Predicted full `(data, nonce)` size for a plaintext.
    pub fn encrypted_size(plaintext: &[u8]) -> usize {
        let data_length = Self::encrypted_data_length(plaintext);
        if data_length == 0 {
            0
        } else {
            data_length + NONCE_LENGTH
        }
    }

    /// Seals a plaintext for a recipient.
    ///
    /// The symmetric key is derived from the X25519 shared secret between
    /// the sender's phrase-derived key and `their_public_key`, mixed with a
    /// fresh 32-byte nonce; the cipher is XChaCha20-Poly1305.
    pub fn encrypt(
        plaintext: &[u8],
        secret_phrase: &str,
        their_public_key: &[u8; 32],
    ) -> SpaResult<Self> {
        if plaintext.is_empty() {
            return Ok(Self::empty());
        }
        let mut nonce = vec![0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let cipher = Self::cipher(secret_phrase, their_public_key, &nonce)?;
        let data = cipher
            .encrypt(XNonce::from_slice(&nonce[..24]), plaintext)
            .map_err(|_| SpaError::not_valid("Encryption failed"))?;
        Ok(Self { data, nonce })
    }

    /// Opens a payload sealed with [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, secret_phrase: &str, their_public_key: &[u8; 32]) -> SpaResult<Vec<u8>> {
        if self.data.is_empty() {
            return Ok(Vec::new());
        }
        if self.nonce.len() != NONCE_LENGTH {
            return Err(SpaError::not_valid(format!(
                "Invalid nonce length {}",
                self.nonce.len()
            )));
        }
        let cipher = Self::cipher(secret_phrase, their_public_key, &self.nonce)?;
        cipher
            .decrypt(XNonce::from_slice(&self.nonce[..24]), self.data.as_slice())
            .map_err(|_| SpaError::not_valid("Decryption failed"))
    }

    fn cipher(
        secret_phrase: &str,
        their_public_key: &[u8; 32],
        nonce: &[u8],
    ) -> SpaResult<XChaCha20Poly1305> {
        let mut seed = crypto::shared_secret(secret_phrase, their_public_key);
        for (seed_byte, nonce_byte) in seed.iter_mut().zip(nonce) {
            *seed_byte ^= nonce_byte;
        }
        let key = crypto::sha256(&seed);
        XChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| SpaError::not_valid("Invalid symmetric key"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let bob_public = public_key("bob");
        let sealed = EncryptedData::encrypt(b"meet at dawn", "alice", &bob_public).unwrap();
        assert_eq!(sealed.nonce().len(), NONCE_LENGTH);
        assert_eq!(sealed.data().len(), 12 + 16);

        let alice_public = public_key("alice");
        let opened = sealed.decrypt("bob", &alice_public).unwrap();
        assert_eq!(opened, b"meet at dawn");
    }

    #[test]
    fn test_empty_plaintext_seals_empty() {
        let sealed = EncryptedData::encrypt(b"", "alice", &public_key("bob")).unwrap();
        assert!(sealed.is_empty());
        assert_eq!(sealed.nonce().len(), 0);
        assert_eq!(sealed.size(), 0);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = EncryptedData::encrypt(b"secret", "alice", &public_key("bob")).unwrap();
        assert!(sealed.decrypt("mallory", &public_key("alice")).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut sealed = EncryptedData::encrypt(b"secret", "alice", &public_key("bob")).unwrap();
        sealed.data[0] ^= 0xFF;
        assert!(sealed.decrypt("bob", &public_key("alice")).is_err());
    }

    #[test]
    fn test_length_predictor_matches() {
        for plaintext in [&b""[..], b"x", b"twelve bytes"] {
            let sealed = EncryptedData::encrypt(plaintext, "alice", &public_key("bob")).unwrap();
            assert_eq!(
                sealed.data().len(),
                EncryptedData::encrypted_data_length(plaintext)
            );
            assert_eq!(sealed.size(), EncryptedData::encrypted_size(plaintext));
        }
    }

    #[test]
    fn test_read_zero_length_is_empty() {
        let bytes: Vec<u8> = Vec::new();
        let mut reader = MemoryReader::new(&bytes);
        let payload = EncryptedData::read(&mut reader, 0, 1000).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_read_enforces_max_length() {
        let bytes = vec![0u8; 2048];
        let mut reader = MemoryReader::new(&bytes);
        assert!(EncryptedData::read(&mut reader, 1001, 1000).is_err());
    }

    #[test]
    fn test_wire_round_trip() {
        let sealed = EncryptedData::encrypt(b"payload", "alice", &public_key("bob")).unwrap();
        let mut writer = BinaryWriter::new();
        sealed.write_to(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), sealed.size());

        let mut reader = MemoryReader::new(&bytes);
        let parsed = EncryptedData::read(&mut reader, sealed.data().len(), 1000).unwrap();
        assert_eq!(parsed, sealed);
    }
}
