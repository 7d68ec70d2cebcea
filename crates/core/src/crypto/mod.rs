// Copyright (C) 2013-2017 The Spa Project.
//
// crypto/mod.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! Cryptographic primitives consumed by the appendix subsystem: digests,
//! Curve25519 key handling, and the sealed payload value.

pub mod encrypted_data;

pub use encrypted_data::EncryptedData;

use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

/// The Curve25519 field prime 2^255 - 19, little-endian.
const FIELD_PRIME: [u8; 32] = [
    0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x7f,
];

/// SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut digest = Sha256::new();
    digest.update(data);
    digest.finalize().into()
}

/// Derives an account's private key from its secret phrase.
pub fn private_key(secret_phrase: &str) -> StaticSecret {
    // StaticSecret clamps the scalar itself.
    StaticSecret::from(sha256(secret_phrase.as_bytes()))
}

/// Derives an account's public key from its secret phrase.
pub fn public_key(secret_phrase: &str) -> [u8; 32] {
    PublicKey::from(&private_key(secret_phrase)).to_bytes()
}

/// ECDH shared secret between a secret phrase and a peer public key.
pub fn shared_secret(secret_phrase: &str, peer_public_key: &[u8; 32]) -> [u8; 32] {
    let secret = private_key(secret_phrase);
    secret
        .diffie_hellman(&PublicKey::from(*peer_public_key))
        .to_bytes()
}

/// Whether the 32 bytes are a canonical Curve25519 public key: the
/// little-endian value must lie strictly below the field prime.
pub fn is_canonical_public_key(public_key: &[u8; 32]) -> bool {
    for i in (0..32).rev() {
        if public_key[i] < FIELD_PRIME[i] {
            return true;
        }
        if public_key[i] > FIELD_PRIME[i] {
            return false;
        }
    }
    // Equal to the prime: reduces to zero, not canonical.
    false
}

/// The 64-bit account id bound to a public key: the first 8 bytes of the
/// key's SHA-256 digest, little-endian.
pub fn account_id_from_public_key(public_key: &[u8; 32]) -> i64 {
    let hash = sha256(public_key);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    i64::from_le_bytes(bytes)
}
