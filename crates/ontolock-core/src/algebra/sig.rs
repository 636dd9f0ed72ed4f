//! Pluggable signature primitive boundary.
//!
//! The gate only ever asks one question: does this signature verify against
//! the identity commitment for this message? Post-quantum schemes (Dilithium,
//! SPHINCS+, ...) slot in behind [`SignatureScheme`] without touching the
//! gate. [`KeyedHashScheme`] is the in-crate reference implementation used by
//! tests and demos; it binds signatures to the stable secret via a keyed
//! hash and a commitment-indexed verification registry.

use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::extractor::{Commitment, StableSecret};
use crate::ohash::Hash256;

const SIG_TAG: &[u8] = b"ONTOLOCK_SIG_V1";

/// Signature verification against an identity commitment.
pub trait SignatureScheme: Send + Sync {
    /// Whether `signature` is a valid signature of `message` by the identity
    /// committed to by `commitment`.
    fn verify(&self, commitment: &Commitment, message: &Hash256, signature: &[u8]) -> bool;
}

// Lets callers hand the gate a shared handle while keeping the signing side.
impl<S: SignatureScheme + ?Sized> SignatureScheme for std::sync::Arc<S> {
    fn verify(&self, commitment: &Commitment, message: &Hash256, signature: &[u8]) -> bool {
        (**self).verify(commitment, message, signature)
    }
}

/// Keyed-hash stand-in scheme.
///
/// Signing requires the stable secret; verification resolves the secret from
/// the commitment through an in-memory registry populated at enrollment.
/// This models the commitment-bound key relationship a real scheme provides
/// through public keys. Not post-quantum, not for production identity.
#[derive(Default)]
pub struct KeyedHashScheme {
    registry: Mutex<HashMap<Commitment, StableSecret>>,
}

impl KeyedHashScheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reconstructed secret so its commitment can verify
    /// signatures.
    pub fn register(&self, secret: StableSecret) {
        let commitment = secret.commitment();
        self.registry.lock().unwrap().insert(commitment, secret);
    }

    /// Produce a signature over `message` with the holder's secret.
    pub fn sign(&self, secret: &StableSecret, message: &Hash256) -> Vec<u8> {
        keyed_digest(secret, message).to_vec()
    }
}

impl SignatureScheme for KeyedHashScheme {
    fn verify(&self, commitment: &Commitment, message: &Hash256, signature: &[u8]) -> bool {
        let registry = self.registry.lock().unwrap();
        let Some(secret) = registry.get(commitment) else {
            return false;
        };
        keyed_digest(secret, message) == signature
    }
}

fn keyed_digest(secret: &StableSecret, message: &Hash256) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(SIG_TAG);
    h.update(secret.as_bytes());
    h.update(message.0);
    h.finalize().into()
}
