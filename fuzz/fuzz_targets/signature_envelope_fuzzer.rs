//! Fuzz target for signature envelope verification
//!
//! Prevent authentication bypass via malformed envelopes.
//!
//! # Strategy
//!
//! - Arbitrary key ids, headers, bodies, and signature strings
//! - Envelopes addressed at a resolver that does know the key id
//! - Signature strings of every length and alphabet
//!
//! # Invariants
//!
//! - `verify_message` NEVER panics, for any envelope
//! - An envelope only verifies if it was produced by the registered key;
//!   fuzzed signatures over fuzzed bodies must always be rejected
//! - Rejections carry a stage; `VERIFIED` is unreachable from garbage

#![no_main]

use arbitrary::Arbitrary;
use crossbar_crypto::{KeyId, KeySet, SignedHeaders, SignedMessage, verify_message};
use ed25519_dalek::SigningKey;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzEnvelope {
    key_id: String,
    source: String,
    destination: Option<String>,
    uri: String,
    method: String,
    body_text: String,
    signature: String,
    key_seed: [u8; 32],
}

fuzz_target!(|input: FuzzEnvelope| {
    let body = serde_json::from_str(&input.body_text)
        .unwrap_or_else(|_| serde_json::Value::String(input.body_text.clone()));

    let message = SignedMessage {
        key_id: KeyId::from(input.key_id.clone()),
        headers: SignedHeaders {
            source: input.source,
            destination: input.destination,
            uri: input.uri,
            method: input.method,
        },
        body,
        signature: input.signature,
    };

    // Resolver that knows nothing: must reject at key resolution.
    let empty = KeySet::new();
    assert!(verify_message(&message, &empty).is_err());

    // Resolver that does know the key id: still must reject, since the
    // signature is fuzz garbage relative to this key.
    let key = SigningKey::from_bytes(&input.key_seed).verifying_key();
    let keys = KeySet::new().with_key(KeyId::from(input.key_id), key);
    assert!(verify_message(&message, &keys).is_err());
});
