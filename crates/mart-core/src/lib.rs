//! # mart-core
//!
//! Primitives shared by every marketplace settlement crate.
//!
//! This crate provides:
//!
//! - [`Amount`] - non-negative token counts with checked arithmetic
//! - [`AccountKey`] - base58 Ed25519 public keys naming accounts
//! - [`Wallet`] - client-side key management and signing
//! - [`SignatureVerifier`] - the authenticity contract the ledger consumes
//! - [`Registry`] - the identity/existence contract the ledger consumes
//! - [`ErrorKind`] - the failure taxonomy every crate maps its errors onto

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod amount;
pub mod error;
pub mod registry;
pub mod verify;
pub mod wallet;

pub use account::AccountKey;
pub use amount::Amount;
pub use error::{CoreError, ErrorKind};
pub use registry::{Identity, Registry, Role};
pub use verify::{Ed25519Verifier, SignatureVerifier};
pub use wallet::{PublicKey, Signature, Wallet};
