//! CLI command implementations.
//!
//! Each submodule implements a group of subcommands:
//! - [`keys`] - Key generation and detached signing
//! - [`users`] - User registration
//! - [`listings`] - Listing publication, lookup and matching
//! - [`accounts`] - Token balances
//! - [`trades`] - Trade lifecycle

pub mod accounts;
pub mod keys;
pub mod listings;
pub mod trades;
pub mod users;

pub use accounts::AccountCommand;
pub use keys::KeyCommand;
pub use listings::ListingCommand;
pub use trades::{TradeAction, TradeCommand};
pub use users::UserCommand;
