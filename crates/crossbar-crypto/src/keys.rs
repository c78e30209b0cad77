//! Key material: participant secrets, key ids, and verification key sets.
//!
//! Verification keys are read-mostly shared state. [`RotatingKeys`] gives
//! copy-on-rotate semantics: a rotation atomically replaces the whole set,
//! while in-flight verifications keep reading the snapshot they started
//! with. Nothing in this module performs I/O; loading keys from disk or a
//! key store is the caller's concern.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::FulfilmentError;

/// Identifier routing a verifier to the correct public key.
///
/// Carried unsigned on signed messages as routing metadata; an attacker
/// who tampers with it can only steer verification to a different key,
/// under which the signature will not verify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Returns the key id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for KeyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local participant secret used to key fulfilment derivation.
///
/// Non-empty by construction. `Debug` output is redacted and the bytes are
/// zeroized on drop.
#[derive(Clone)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wraps secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FulfilmentError::EmptySecret`] if `bytes` is empty.
    pub fn new(bytes: Vec<u8>) -> Result<Self, FulfilmentError> {
        if bytes.is_empty() {
            return Err(FulfilmentError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    /// Returns the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(<redacted {} bytes>)", self.0.len())
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Maps a key id to a verification key.
///
/// The external key-store seam: the crypto core never fetches keys itself.
/// Implementations must be side-effect free from the verifier's point of
/// view - `resolve` may consult a cache but must not block on I/O.
pub trait KeyResolver {
    /// Looks up the public key for `key_id`, if known.
    fn resolve(&self, key_id: &KeyId) -> Option<VerifyingKey>;
}

/// Immutable snapshot of verification keys.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<KeyId, VerifyingKey>,
}

impl KeySet {
    /// Creates an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, replacing any previous key under the same id.
    pub fn insert(&mut self, key_id: KeyId, key: VerifyingKey) {
        self.keys.insert(key_id, key);
    }

    /// Builder-style [`KeySet::insert`].
    #[must_use]
    pub fn with_key(mut self, key_id: KeyId, key: VerifyingKey) -> Self {
        self.insert(key_id, key);
        self
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for KeySet {
    fn resolve(&self, key_id: &KeyId) -> Option<VerifyingKey> {
        self.keys.get(key_id).copied()
    }
}

impl FromIterator<(KeyId, VerifyingKey)> for KeySet {
    fn from_iter<I: IntoIterator<Item = (KeyId, VerifyingKey)>>(iter: I) -> Self {
        Self { keys: iter.into_iter().collect() }
    }
}

/// Shared verification key set with copy-on-rotate semantics.
///
/// Readers take an `Arc` snapshot of the current set and verify against it
/// without holding any lock; [`RotatingKeys::rotate`] swaps in a complete
/// replacement set atomically. A verification that began before a rotation
/// finishes against the set it started with.
#[derive(Debug, Clone)]
pub struct RotatingKeys {
    current: Arc<RwLock<Arc<KeySet>>>,
}

impl RotatingKeys {
    /// Creates a rotating handle over an initial key set.
    pub fn new(initial: KeySet) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(initial))) }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<KeySet> {
        // A poisoned lock only means a writer panicked mid-rotate; the
        // stored snapshot is still a complete set.
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replaces the whole key set.
    pub fn rotate(&self, next: KeySet) {
        let next = Arc::new(next);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl KeyResolver for RotatingKeys {
    fn resolve(&self, key_id: &KeyId) -> Option<VerifyingKey> {
        self.snapshot().resolve(key_id)
    }
}
