//! Client events and actions.
//!
//! The client is fed [`ClientEvent`]s by the surrounding transport layer
//! and answers with [`ClientAction`]s for that layer to execute. Clock
//! readings travel inside the events (`now_ms`), keeping the state machine
//! deterministic and free of ambient time.

use crossbar_crypto::{Condition, Fulfilment, KeySet, SignedMessage};
use crossbar_proto::{Address, Currency};

use crate::error::ClientError;

/// Identifies one transfer end-to-end across quote and settlement.
pub type TransactionId = u128;

/// Terms of a quote the local participant is answering as payee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteTerms {
    /// Transfer amount in minor currency units.
    pub amount: u64,
    /// Transfer currency.
    pub currency: Currency,
    /// Ledger address of the payee party.
    pub payee: Address,
    /// Opaque end-to-end data carried in the packet.
    pub data: Vec<u8>,
}

/// Events fed into the client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A counterparty requested a quote; answer as payee with a packet,
    /// condition, and signed response.
    QuoteRequested {
        /// Transaction this quote belongs to.
        transaction_id: TransactionId,
        /// Quote terms from the (already schema-validated) request.
        terms: QuoteTerms,
        /// Current time, unix milliseconds.
        now_ms: u64,
    },

    /// An outbound transfer was initiated as payer; hold the transfer
    /// against the condition from the accepted quote.
    TransferInitiated {
        /// Transaction being transferred.
        transaction_id: TransactionId,
        /// Condition the settlement proof must hash to.
        condition: Condition,
        /// Hold deadline, unix milliseconds.
        expires_at: u64,
    },

    /// An inbound signed transfer prepare arrived for a quoted
    /// transaction; validate it and release the fulfilment.
    TransferPrepared {
        /// Transaction being prepared.
        transaction_id: TransactionId,
        /// The signed envelope as received.
        message: SignedMessage,
        /// Current time, unix milliseconds.
        now_ms: u64,
    },

    /// An inbound signed settlement proof arrived for a held transfer.
    FulfilmentReceived {
        /// Transaction being settled.
        transaction_id: TransactionId,
        /// The signed envelope as received.
        message: SignedMessage,
        /// Current time, unix milliseconds.
        now_ms: u64,
    },

    /// The verification key set was rotated.
    ///
    /// Replaces the whole set atomically; in-flight verifications keep
    /// the snapshot they started with.
    KeysRotated {
        /// The complete replacement key set.
        keys: KeySet,
    },
}

/// Actions produced by the client for the caller to execute.
#[derive(Debug, Clone)]
pub enum ClientAction {
    /// Deliver a signed message to the switch.
    Send(SignedMessage),

    /// Release held funds: the settlement proof verified.
    ReleaseFunds {
        /// Settled transaction.
        transaction_id: TransactionId,
        /// The verified proof, for the caller's settlement record.
        fulfilment: Fulfilment,
    },

    /// Answer an authenticated but invalid transfer with a rejection.
    ///
    /// Produced when a message passes signature verification and then
    /// fails a business check (condition or fulfilment mismatch, expired
    /// hold). Unauthenticated messages are errors instead - they never
    /// reach business logic.
    Reject {
        /// Rejected transaction.
        transaction_id: TransactionId,
        /// The typed rejection, also surfaced in the security log.
        error: ClientError,
    },
}
