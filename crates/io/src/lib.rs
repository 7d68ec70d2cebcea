//! I/O primitives for the Spa blockchain.
//!
//! This crate provides the positional little-endian binary codec used for
//! consensus serialization: a bounds-checked [`MemoryReader`], an append-only
//! [`BinaryWriter`], and the [`IoError`] type their operations surface.

pub mod binary_writer;
pub mod error;
pub mod memory_reader;

pub use binary_writer::BinaryWriter;
pub use error::{IoError, IoResult};
pub use memory_reader::MemoryReader;
