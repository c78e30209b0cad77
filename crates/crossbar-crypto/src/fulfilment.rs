//! Fulfilment generation, condition derivation, and validation.
//!
//! A fulfilment is the secret preimage proving a payment obligation was
//! accepted; its condition is the public SHA-256 commitment shared before
//! settlement. Both are exactly 32 bytes. The pair is transaction-scoped:
//! generated at quote time, consumed at fulfilment-validation time, never
//! reused.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::FulfilmentError;
use crate::keys::Secret;

/// Length of a fulfilment preimage in bytes.
pub const FULFILMENT_LEN: usize = 32;

/// Length of a condition commitment in bytes.
pub const CONDITION_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Secret proof-of-payment preimage.
///
/// Owned exclusively by the generating party until released as settlement
/// proof. `Debug` output is redacted and the bytes are zeroized on drop;
/// equality is constant-time.
#[derive(Clone)]
pub struct Fulfilment([u8; FULFILMENT_LEN]);

impl Fulfilment {
    /// Wraps raw fulfilment bytes.
    pub fn from_bytes(bytes: [u8; FULFILMENT_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a fulfilment from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`FulfilmentError::BadLength`] unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FulfilmentError> {
        let array: [u8; FULFILMENT_LEN] = bytes
            .try_into()
            .map_err(|_| FulfilmentError::BadLength { expected: FULFILMENT_LEN, actual: bytes.len() })?;
        Ok(Self(array))
    }

    /// Parses a fulfilment from its base64url text form.
    pub fn from_base64(text: &str) -> Result<Self, FulfilmentError> {
        let bytes = Base64Url.decode(text).map_err(|_| FulfilmentError::BadEncoding)?;
        Self::from_slice(&bytes)
    }

    /// Returns the raw fulfilment bytes.
    pub fn as_bytes(&self) -> &[u8; FULFILMENT_LEN] {
        &self.0
    }

    /// Returns the base64url text form.
    pub fn to_base64(&self) -> String {
        Base64Url.encode(self.0)
    }

    /// Derives the public condition committing to this fulfilment.
    ///
    /// Pure SHA-256; sender and receiver compute the identical condition
    /// from the identical fulfilment.
    pub fn condition(&self) -> Condition {
        let digest = Sha256::digest(self.0);
        Condition(digest.into())
    }
}

impl PartialEq for Fulfilment {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Fulfilment {}

impl std::fmt::Debug for Fulfilment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Fulfilment(<redacted>)")
    }
}

impl Drop for Fulfilment {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Public hash commitment derived from a fulfilment.
///
/// Shared with counterparties before settlement. For any valid pair,
/// `condition == SHA-256(fulfilment)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition([u8; CONDITION_LEN]);

impl Condition {
    /// Wraps raw condition bytes.
    pub fn from_bytes(bytes: [u8; CONDITION_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a condition from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`FulfilmentError::BadLength`] unless exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FulfilmentError> {
        let array: [u8; CONDITION_LEN] = bytes
            .try_into()
            .map_err(|_| FulfilmentError::BadLength { expected: CONDITION_LEN, actual: bytes.len() })?;
        Ok(Self(array))
    }

    /// Parses a condition from its base64url text form.
    pub fn from_base64(text: &str) -> Result<Self, FulfilmentError> {
        let bytes = Base64Url.decode(text).map_err(|_| FulfilmentError::BadEncoding)?;
        Self::from_slice(&bytes)
    }

    /// Returns the raw condition bytes.
    pub fn as_bytes(&self) -> &[u8; CONDITION_LEN] {
        &self.0
    }

    /// Returns the base64url text form.
    pub fn to_base64(&self) -> String {
        Base64Url.encode(self.0)
    }
}

/// Derives the fulfilment for a packet.
///
/// HMAC-SHA-256 over the encoded packet bytes, keyed by the local
/// participant secret. Deterministic: the same packet and secret always
/// yield the same fulfilment, so the generating party can re-derive it for
/// verification instead of storing it.
///
/// # Errors
///
/// Returns [`FulfilmentError::EmptyPacket`] if `packet_bytes` is empty.
pub fn generate_fulfilment(
    packet_bytes: &[u8],
    secret: &Secret,
) -> Result<Fulfilment, FulfilmentError> {
    if packet_bytes.is_empty() {
        return Err(FulfilmentError::EmptyPacket);
    }
    // HMAC accepts keys of any non-zero length; Secret is non-empty by
    // construction.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| FulfilmentError::EmptySecret)?;
    mac.update(packet_bytes);
    let digest: [u8; FULFILMENT_LEN] = mac.finalize().into_bytes().into();
    Ok(Fulfilment(digest))
}

/// Checks that a presented fulfilment hashes to a committed condition.
///
/// Constant-time comparison. A `false` return is a business rejection
/// (settlement must not be released), not a fault.
pub fn validate_fulfilment(fulfilment: &Fulfilment, condition: &Condition) -> bool {
    fulfilment.condition().0.ct_eq(&condition.0).into()
}
