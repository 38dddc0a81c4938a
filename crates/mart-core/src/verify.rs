//! Signature verification contract.
//!
//! The ledger never holds secret keys. It asks a [`SignatureVerifier`]
//! whether `signature` is a valid signature by `signer` over `message`.

use tracing::debug;

use crate::{AccountKey, PublicKey, Signature};

/// Authenticity check for signed requests.
pub trait SignatureVerifier: Send + Sync {
    /// Returns true when `signature` was produced by `signer` over `message`.
    fn verify(&self, signer: &AccountKey, message: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 verification against the signer's account key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signer: &AccountKey, message: &[u8], signature: &[u8]) -> bool {
        let Ok(public_key) = PublicKey::from_account(signer) else {
            debug!(signer = %signer, "signer key is not a curve point");
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            debug!(signer = %signer, len = signature.len(), "malformed signature");
            return false;
        };
        public_key.verify(message, &signature).is_ok()
    }
}
