//! The minimal transaction view the appendix subsystem consumes.
//!
//! The full envelope (amounts, signatures, deadline, attachment bundle) is
//! owned by the transaction layer; validation and application here only need
//! the handful of fields below.

/// Envelope fields visible to appendix validation and application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: i64,
    version: u8,
    timestamp: i32,
    recipient_id: i64,
    has_encrypted_message: bool,
}

impl Transaction {
    pub fn new(id: i64, version: u8) -> Self {
        Self {
            id,
            version,
            timestamp: 0,
            recipient_id: 0,
            has_encrypted_message: false,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i32) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_recipient(mut self, recipient_id: i64) -> Self {
        self.recipient_id = recipient_id;
        self
    }

    /// Marks that the envelope also carries a non-prunable encrypted
    /// message appendix; the prunable kind must not coexist with one.
    pub fn with_encrypted_message(mut self) -> Self {
        self.has_encrypted_message = true;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn timestamp(&self) -> i32 {
        self.timestamp
    }

    /// Zero means the transaction has no recipient.
    pub fn recipient_id(&self) -> i64 {
        self.recipient_id
    }

    pub fn has_encrypted_message(&self) -> bool {
        self.has_encrypted_message
    }
}
