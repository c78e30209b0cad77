//! Client error types.

use crossbar_crypto::{FulfilmentError, SignatureError};
use crossbar_proto::CodecError;
use thiserror::Error;

use crate::event::TransactionId;

/// Errors from client operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// No pending state exists for the transaction.
    #[error("unknown transaction: {transaction_id:x}")]
    UnknownTransaction {
        /// The transaction id that was not found.
        transaction_id: TransactionId,
    },

    /// Pending state already exists for the transaction.
    #[error("duplicate transaction: {transaction_id:x}")]
    DuplicateTransaction {
        /// The transaction id that already exists.
        transaction_id: TransactionId,
    },

    /// The transfer's expiration has passed.
    #[error("transfer expired: {transaction_id:x} at {expires_at}, now {now_ms}")]
    TransferExpired {
        /// The expired transaction.
        transaction_id: TransactionId,
        /// Expiration from the prepare, unix milliseconds.
        expires_at: u64,
        /// Clock reading supplied with the event.
        now_ms: u64,
    },

    /// A presented fulfilment does not hash to the held condition.
    ///
    /// Business rejection: settlement is not released. The transaction may
    /// be retried upstream with a fresh fulfilment/condition pair.
    #[error("fulfilment does not match condition for transaction {transaction_id:x}")]
    FulfilmentMismatch {
        /// The affected transaction.
        transaction_id: TransactionId,
    },

    /// A prepare packet's condition does not match the quoted condition.
    #[error("execution condition does not match quote for transaction {transaction_id:x}")]
    ConditionMismatch {
        /// The affected transaction.
        transaction_id: TransactionId,
    },

    /// A signed body failed to parse into the expected payload.
    #[error("malformed message body: {reason}")]
    MalformedBody {
        /// Description of the parse failure.
        reason: String,
    },

    /// An embedded packet was of an unexpected kind.
    #[error("unexpected packet type in message body")]
    UnexpectedPacket,

    /// Packet encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Fulfilment generation or parsing failed.
    #[error("fulfilment error: {0}")]
    Fulfilment(#[from] FulfilmentError),

    /// Request signature creation or verification failed.
    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
}

impl ClientError {
    /// Returns true if this error must be surfaced as a security event.
    ///
    /// Authentication and proof failures are logged distinctly from
    /// plumbing failures and must never be downgraded to a success.
    pub fn is_security_event(&self) -> bool {
        match self {
            Self::Signature(_) | Self::FulfilmentMismatch { .. } | Self::ConditionMismatch { .. } => {
                true
            }

            Self::UnknownTransaction { .. }
            | Self::DuplicateTransaction { .. }
            | Self::TransferExpired { .. }
            | Self::MalformedBody { .. }
            | Self::UnexpectedPacket
            | Self::Codec(_)
            | Self::Fulfilment(_) => false,
        }
    }
}
