//! Crypto error types.

use thiserror::Error;

use crate::keys::KeyId;

/// Errors from fulfilment generation and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FulfilmentError {
    /// Fulfilment generation was given an empty packet.
    #[error("cannot derive a fulfilment from an empty packet")]
    EmptyPacket,

    /// A secret was constructed from empty bytes.
    #[error("participant secret must not be empty")]
    EmptySecret,

    /// A fulfilment or condition had the wrong length.
    #[error("expected {expected} bytes, got {actual}")]
    BadLength {
        /// Required length.
        expected: usize,
        /// Length presented.
        actual: usize,
    },

    /// A base64url text form failed to decode.
    #[error("invalid base64url encoding")]
    BadEncoding,
}

/// Stage of the verification pipeline at which a message was rejected.
///
/// Each inbound message walks `RECEIVED -> KEY_RESOLVED -> CANONICALIZED ->
/// VERIFIED`; a failure at any step is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStage {
    /// Resolving the key id to a public key.
    KeyResolution,
    /// Recomputing the canonical byte form of headers and body.
    Canonicalization,
    /// Checking the signature itself.
    SignatureCheck,
}

/// Errors from request signing and verification.
///
/// Verification is all-or-nothing: any variant means the message must be
/// treated as unauthenticated, and the caller is expected to surface it as
/// a security event rather than a transport fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No public key is known for the message's key id.
    #[error("unknown key id: {key_id}")]
    UnknownKey {
        /// The unresolvable key id.
        key_id: KeyId,
    },

    /// Headers or body could not be canonicalized.
    #[error("canonicalization failed: {reason}")]
    Canonicalize {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The signature field is not a well-formed Ed25519 signature.
    #[error("malformed signature encoding")]
    MalformedSignature,

    /// The signature does not verify under the resolved key.
    #[error("signature mismatch")]
    Mismatch,
}

impl SignatureError {
    /// Returns the pipeline stage this error rejected at.
    pub fn stage(&self) -> VerifyStage {
        match self {
            Self::UnknownKey { .. } => VerifyStage::KeyResolution,
            Self::Canonicalize { .. } => VerifyStage::Canonicalization,
            Self::MalformedSignature | Self::Mismatch => VerifyStage::SignatureCheck,
        }
    }
}
