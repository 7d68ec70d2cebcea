//! Conversion helpers shared across the appendix kinds: hex, canonical UTF-8
//! text, and gzip for sealable plaintexts.

use crate::error::{SpaError, SpaResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Encodes bytes as a lowercase hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parses a hex string into bytes.
pub fn parse_hex(value: &str) -> SpaResult<Vec<u8>> {
    hex::decode(value).map_err(|e| SpaError::not_valid(format!("Invalid hex string: {e}")))
}

/// Parses a hex string into a fixed 32-byte array.
pub fn parse_hex32(value: &str) -> SpaResult<[u8; 32]> {
    let bytes = parse_hex(value)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| SpaError::not_valid(format!("Invalid hex length: {len}, expected 32 bytes")))
}

/// Returns true when the bytes are valid UTF-8.
///
/// Rust's UTF-8 validation only accepts the shortest encoding of every scalar
/// value, so a successful decode re-encodes to the identical bytes.
pub fn is_canonical_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}

/// Decodes canonical UTF-8 text.
pub fn to_utf8(bytes: &[u8]) -> SpaResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| SpaError::not_valid("Message is not UTF-8 text"))
}

/// Renders message bytes for the JSON surface: UTF-8 text when `is_text`,
/// hex otherwise. Unvalidated text falls back to lossy decoding.
pub fn message_string(bytes: &[u8], is_text: bool) -> String {
    if is_text {
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        to_hex(bytes)
    }
}

/// Gzip-compresses a plaintext before sealing.
pub fn compress(data: &[u8]) -> SpaResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SpaError::not_valid(format!("Compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SpaError::not_valid(format!("Compression failed: {e}")))
}

/// Reverses [`compress`], bounding the output at `max_length` bytes.
pub fn uncompress(data: &[u8], max_length: usize) -> SpaResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data).take(max_length as u64 + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| SpaError::not_valid(format!("Decompression failed: {e}")))?;
    if out.len() > max_length {
        return Err(SpaError::not_valid(format!(
            "Decompressed data exceeds max length {max_length}"
        )));
    }
    Ok(out)
}
