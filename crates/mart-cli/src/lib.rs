//! # mart-cli
//!
//! Command-line front end for the marketplace settlement ledger.
//!
//! Provides commands for:
//! - Key generation and signing
//! - User registration and listing publication
//! - Listing matching
//! - Token balances and escrow
//! - The trade lifecycle
//!
//! # Architecture
//!
//! Every invocation loads the ledger from a JSON state file, runs one
//! marketplace operation and writes the state back if it committed.
//!
//! ```text
//! ┌──────────┐   one transaction   ┌─────────────┐   snapshot   ┌────────────┐
//! │ mart CLI │────────────────────►│ Marketplace │─────────────►│ state.json │
//! └──────────┘                     └─────────────┘              └────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
pub mod session;

pub use cli::{Cli, Commands, Format, Side};
pub use error::CliError;
pub use output::OutputFormat;
pub use session::Session;
