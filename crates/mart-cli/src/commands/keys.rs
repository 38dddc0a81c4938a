//! Key generation and detached signing.
//!
//! Neither command touches ledger state.

use std::io::Write;

use mart_core::Wallet;

use crate::error::CliError;
use crate::output::{KeyPair, OutputFormat, SignatureOutput};

/// Key command executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCommand;

impl KeyCommand {
    /// Generate and print a new key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the output fails.
    pub fn keygen<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        let wallet = Wallet::new();
        let pair = KeyPair {
            account: wallet.account(),
            secret: wallet.secret_base58(),
        };
        format.write(writer, &pair)
    }

    /// Sign `message` with `secret` and print the base58 signature.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed secret.
    pub fn sign<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        secret: &str,
        message: &str,
    ) -> Result<(), CliError> {
        let wallet = Wallet::from_base58_secret(secret)?;
        let output = SignatureOutput {
            account: wallet.account(),
            signature: wallet.sign(message.as_bytes()).to_base58(),
        };
        format.write(writer, &output)
    }
}
