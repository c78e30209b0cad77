//! Crossbar Client
//!
//! Action-based participant client core for a payment switch. Ties the
//! packet codec, condition/fulfilment crypto, and request signatures
//! together per transaction.
//!
//! # Architecture
//!
//! The client is a pure state machine that:
//! - Receives events from the caller (quote requests, inbound signed
//!   messages, key rotations)
//! - Produces actions for the caller to execute (send a signed message,
//!   release funds, reject a transfer)
//! - Performs no I/O: transport, persistence, and key loading are caller
//!   concerns
//!
//! Inbound messages are authenticated before any business logic runs; a
//! settlement proof is only released or accepted once its fulfilment
//! checks out against the transaction's condition. Security-relevant
//! rejections are logged here via `tracing` - the crypto core itself
//! never logs.
//!
//! # Components
//!
//! - [`Client`]: Top-level state machine keyed by transaction id
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//! - [`QuoteResponseBody`] / [`TransferPrepareBody`] / [`TransferFulfilBody`]:
//!   signed body payloads exchanged with counterparties

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod body;
mod client;
mod error;
mod event;

pub use body::{QuoteResponseBody, TransferFulfilBody, TransferPrepareBody};
pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, QuoteTerms, TransactionId};
