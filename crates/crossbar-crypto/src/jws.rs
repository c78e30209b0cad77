//! Detached request signatures (JWS, `EdDSA`).
//!
//! Outbound request bodies plus selected routing headers are signed as a
//! unit. Both are canonicalized with the JSON Canonicalization Scheme
//! (RFC 8785) before signing, so two semantically equal bodies produce the
//! same signature input, and signer and verifier agree on the exact bytes
//! without shipping them.
//!
//! The signing input follows the JWS compact form:
//!
//! ```text
//! base64url(JCS(headers)) "." base64url(JCS(body))
//! ```
//!
//! with both segments unpadded. The key id travels on the envelope
//! unsigned - it is routing metadata selecting the verification key, and
//! tampering with it only steers verification to a key that will reject.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as Base64Url;
use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::error::SignatureError;
use crate::keys::{KeyId, KeyResolver};

/// Routing headers bound into the signature.
///
/// Mirrors the transport metadata a switch uses to route the message;
/// signing them prevents a captured body from being replayed against a
/// different endpoint or participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedHeaders {
    /// Originating participant identifier.
    pub source: String,
    /// Destination participant identifier, when addressed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub destination: Option<String>,
    /// Request path the body was sent to, e.g. `/transfers`.
    pub uri: String,
    /// HTTP method the body was sent with, e.g. `POST`.
    pub method: String,
}

/// A signed message envelope.
///
/// Wraps the JSON body, the signed headers, the detached signature, and
/// the unsigned key id the verifier resolves the public key with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedMessage {
    /// Key id selecting the verification key (unsigned routing metadata).
    pub key_id: KeyId,
    /// Headers covered by the signature.
    pub headers: SignedHeaders,
    /// Body covered by the signature.
    pub body: serde_json::Value,
    /// Detached Ed25519 signature, base64url without padding.
    pub signature: String,
}

/// Headers and body that passed verification.
///
/// Only constructed by [`verify_message`]; holding one means the whole
/// envelope verified - there is no partial success.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedBody {
    /// The authenticated headers.
    pub headers: SignedHeaders,
    /// The authenticated body.
    pub body: serde_json::Value,
}

/// Signs outbound request bodies under a fixed key.
///
/// One signer per local participant identity. Signing takes `&self`, so a
/// single instance serves concurrent requests.
#[derive(Clone)]
pub struct Signer {
    signing_key: SigningKey,
    key_id: KeyId,
}

impl Signer {
    /// Creates a signer from an existing private key.
    pub fn new(signing_key: SigningKey, key_id: KeyId) -> Self {
        Self { signing_key, key_id }
    }

    /// Generates a fresh keypair and wraps the private half.
    ///
    /// The returned verification key is what counterparties register under
    /// `key_id`.
    pub fn generate(key_id: KeyId, csprng: &mut (impl rand::CryptoRng + rand::RngCore)) -> (Self, VerifyingKey) {
        let signing_key = SigningKey::generate(csprng);
        let verifying_key = signing_key.verifying_key();
        (Self { signing_key, key_id }, verifying_key)
    }

    /// Returns the key id this signer stamps on envelopes.
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    /// Returns the verification key matching this signer.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Signs headers and body into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Canonicalize`] when the body cannot be
    /// serialized canonically (e.g. non-finite numbers).
    pub fn sign(
        &self,
        headers: SignedHeaders,
        body: serde_json::Value,
    ) -> Result<SignedMessage, SignatureError> {
        let input = signing_input(&headers, &body)?;
        let signature = self.signing_key.sign(&input);
        Ok(SignedMessage {
            key_id: self.key_id.clone(),
            headers,
            body,
            signature: Base64Url.encode(signature.to_bytes()),
        })
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("key_id", &self.key_id)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

/// Verifies a signed message against a key resolver.
///
/// All-or-nothing; the pipeline per inbound message is
/// `RECEIVED -> KEY_RESOLVED -> CANONICALIZED -> VERIFIED`, and any step
/// failing rejects the message with an error naming the stage
/// ([`SignatureError::stage`]).
///
/// # Errors
///
/// - [`SignatureError::UnknownKey`]: the resolver knows no key for the
///   envelope's key id
/// - [`SignatureError::Canonicalize`]: headers or body failed to
///   re-canonicalize
/// - [`SignatureError::MalformedSignature`]: the signature field is not a
///   well-formed Ed25519 signature
/// - [`SignatureError::Mismatch`]: the signature does not verify
pub fn verify_message(
    message: &SignedMessage,
    resolver: &impl KeyResolver,
) -> Result<VerifiedBody, SignatureError> {
    // RECEIVED -> KEY_RESOLVED
    let key = resolver
        .resolve(&message.key_id)
        .ok_or_else(|| SignatureError::UnknownKey { key_id: message.key_id.clone() })?;

    // KEY_RESOLVED -> CANONICALIZED
    let input = signing_input(&message.headers, &message.body)?;

    // CANONICALIZED -> VERIFIED
    let raw = Base64Url
        .decode(&message.signature)
        .map_err(|_| SignatureError::MalformedSignature)?;
    let raw: [u8; Signature::BYTE_SIZE] =
        raw.try_into().map_err(|_| SignatureError::MalformedSignature)?;
    let signature = Signature::from_bytes(&raw);
    key.verify_strict(&input, &signature).map_err(|_| SignatureError::Mismatch)?;

    Ok(VerifiedBody { headers: message.headers.clone(), body: message.body.clone() })
}

/// Computes the canonical signing input for headers and body.
fn signing_input(
    headers: &SignedHeaders,
    body: &serde_json::Value,
) -> Result<Vec<u8>, SignatureError> {
    let headers = serde_jcs::to_vec(headers)
        .map_err(|e| SignatureError::Canonicalize { reason: e.to_string() })?;
    let body = serde_jcs::to_vec(body)
        .map_err(|e| SignatureError::Canonicalize { reason: e.to_string() })?;

    let mut input =
        Vec::with_capacity(base64_len(headers.len()) + 1 + base64_len(body.len()));
    input.extend_from_slice(Base64Url.encode(&headers).as_bytes());
    input.push(b'.');
    input.extend_from_slice(Base64Url.encode(&body).as_bytes());
    Ok(input)
}

/// Unpadded base64 length for `n` input bytes.
fn base64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}
