//! Wallet abstraction for key management and signing.
//!
//! Provides Ed25519-based signing for marketplace requests. Clients sign;
//! the ledger only ever verifies (see [`crate::verify`]).

use std::fmt;

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::{AccountKey, CoreError};

/// An Ed25519 keypair owned by a marketplace participant.
pub struct Wallet {
    signing_key: SigningKey,
}

/// A public key derived from a wallet, used for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

/// An Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(DalekSignature);

impl Wallet {
    /// Creates a new wallet with a randomly generated keypair.
    #[must_use]
    pub fn new() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Creates a wallet from raw signing key bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Creates a wallet from a base58-encoded secret key.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not base58 or not 32 bytes.
    pub fn from_base58_secret(secret: &str) -> Result<Self, CoreError> {
        let bytes = bs58::decode(secret)
            .into_vec()
            .map_err(|e| CoreError::Crypto(format!("invalid base58: {e}")))?;
        let secret: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::Crypto(format!("secret key must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self::from_bytes(&secret))
    }

    /// Returns the public key for this wallet.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key())
    }

    /// The account key this wallet signs for.
    #[must_use]
    pub fn account(&self) -> AccountKey {
        AccountKey::from_bytes(self.signing_key.verifying_key().as_bytes())
    }

    /// Signs a message with this wallet's private key.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message))
    }

    /// Returns the raw bytes of the signing key.
    ///
    /// # Security
    ///
    /// This exposes the private key material. Handle with care.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The secret key as base58.
    #[must_use]
    pub fn secret_base58(&self) -> String {
        bs58::encode(self.signing_key.as_bytes()).into_string()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::missing_fields_in_debug)]
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("account", &self.account())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

impl PublicKey {
    /// Returns the raw bytes of the public key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Creates a public key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Crypto` if the bytes don't represent a valid public key.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CoreError> {
        VerifyingKey::from_bytes(bytes)
            .map(PublicKey)
            .map_err(|e| CoreError::Crypto(e.to_string()))
    }

    /// Resolve an account key to its public key.
    ///
    /// # Errors
    ///
    /// Returns error if the account key is not a valid curve point.
    pub fn from_account(account: &AccountKey) -> Result<Self, CoreError> {
        Self::from_bytes(&account.to_bytes()?)
    }

    /// Verifies a signature against a message using this public key.
    ///
    /// Uses strict verification to reject malleable signatures.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidSignature` if the signature is invalid.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl Signature {
    /// Returns the raw bytes of the signature.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 64] {
        self.0.to_bytes()
    }

    /// Creates a signature from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Crypto` if the input is not 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        DalekSignature::from_slice(bytes)
            .map(Self)
            .map_err(|e| CoreError::Crypto(e.to_string()))
    }

    /// Base58 form, as carried in requests.
    #[must_use]
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0.to_bytes()).into_string()
    }

    /// Parse the base58 form.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Crypto` on bad encoding or length.
    pub fn from_base58(s: &str) -> Result<Self, CoreError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| CoreError::Crypto(format!("invalid base58: {e}")))?;
        Self::from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_verify_accepts_valid_signature() {
        let wallet = Wallet::new();
        let signature = wallet.sign(b"test message");
        assert!(wallet.public_key().verify(b"test message", &signature).is_ok());
    }

    #[test]
    fn wallet_verify_rejects_tampered_message() {
        let wallet = Wallet::new();
        let signature = wallet.sign(b"original");
        assert!(wallet.public_key().verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn wallet_verify_rejects_wrong_key() {
        let wallet1 = Wallet::new();
        let wallet2 = Wallet::new();
        let signature = wallet1.sign(b"test");
        assert!(wallet2.public_key().verify(b"test", &signature).is_err());
    }

    #[test]
    fn secret_base58_roundtrips() {
        let wallet = Wallet::new();
        let restored = Wallet::from_base58_secret(&wallet.secret_base58()).unwrap();
        assert_eq!(wallet.account(), restored.account());
    }

    #[test]
    fn from_base58_secret_rejects_short_key() {
        let short = bs58::encode([1u8; 16]).into_string();
        assert!(Wallet::from_base58_secret(&short).is_err());
    }

    #[test]
    fn public_key_from_account_matches() {
        let wallet = Wallet::new();
        let pk = PublicKey::from_account(&wallet.account()).unwrap();
        assert_eq!(pk, wallet.public_key());
    }

    #[test]
    fn signature_base58_roundtrips() {
        let wallet = Wallet::new();
        let sig = wallet.sign(b"payload");
        let restored = Signature::from_base58(&sig.to_base58()).unwrap();
        assert_eq!(sig, restored);
    }

    #[test]
    fn signature_from_slice_rejects_wrong_length() {
        assert!(Signature::from_slice(&[0u8; 12]).is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let wallet = Wallet::new();
        let debug = format!("{wallet:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&wallet.secret_base58()));
    }
}
