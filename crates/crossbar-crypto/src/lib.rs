//! Crossbar Cryptographic Core
//!
//! This crate provides the condition/fulfilment primitives and the
//! request-signature (JWS) layer for a payment-switch participant client.
//!
//! # Design
//!
//! All functions in this crate are pure - they have no side effects and
//! produce deterministic outputs given the same inputs. Nothing here logs,
//! blocks on I/O, or touches shared mutable state, enabling:
//!
//! - Concurrent use across independent transactions without locking
//! - Deterministic testing (same inputs, same bytes, every time)
//! - No coupling to transport or storage collaborators
//!
//! Key material is the one read-mostly shared resource: [`RotatingKeys`]
//! gives verifiers copy-on-rotate snapshots, so a rotation never disturbs
//! in-flight verifications.
//!
//! # Security Properties
//!
//! - Fulfilment Unforgeability: fulfilments are HMAC-SHA-256 outputs keyed
//!   by the local participant secret; without the secret they cannot be
//!   forged for a chosen packet
//! - Condition Binding: a condition is the SHA-256 of exactly one
//!   fulfilment; validation recomputes and compares in constant time
//! - Message Authenticity: request bodies and selected headers are signed
//!   with Ed25519 over an RFC 8785 canonical form, so semantically equal
//!   bodies verify identically and any byte-level tamper is detected

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod fulfilment;
mod jws;
mod keys;

pub use error::{FulfilmentError, SignatureError, VerifyStage};
pub use fulfilment::{
    CONDITION_LEN, Condition, FULFILMENT_LEN, Fulfilment, generate_fulfilment,
    validate_fulfilment,
};
pub use jws::{SignedHeaders, SignedMessage, Signer, VerifiedBody, verify_message};
pub use keys::{KeyId, KeyResolver, KeySet, RotatingKeys, Secret};
