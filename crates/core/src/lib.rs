// Copyright (C) 2013-2017 The Spa Project.
//
// lib.rs file belongs to the spa project and is free
// software distributed under the MIT software license, see the
// accompanying file LICENSE in the main directory of the
// repository or http://www.opensource.org/licenses/mit-license.php
// for more details.
//
// Redistribution and use in source and binary forms with or without
// modifications are permitted.

//! The transaction appendix subsystem of the Spa blockchain.
//!
//! An appendix is an optional, typed attachment to a transaction: a plain
//! message, an encrypted message (to the recipient or to the sender), a
//! prunable encrypted message, or a recipient public-key announcement. This
//! crate owns their bit-exact binary codec, the JSON form used by the RPC
//! surface, consensus validation, size-based fees, and block application.
//!
//! Chain state is injected: every operation takes a [`chain::ChainContext`]
//! carrying the parameters, a height/time snapshot, and the account and
//! prunable-message stores.

pub mod account;
pub mod chain;
pub mod convert;
pub mod crypto;
pub mod error;
pub mod fee;
pub mod payloads;
pub mod prunable;
pub mod transaction;

pub use account::{Account, AccountStore, MemoryAccountStore};
pub use chain::{ChainContext, ChainParams};
pub use crypto::EncryptedData;
pub use error::{SpaError, SpaResult};
pub use fee::Fee;
pub use payloads::{Appendix, Prunable, Sealable};
pub use prunable::{MemoryPrunableMessageStore, PrunableMessage, PrunableMessageStore};
pub use transaction::Transaction;
