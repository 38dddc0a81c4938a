//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mart_core::{AccountKey, Amount};
use mart_market::{ListingId, TradeId};

/// Marketplace settlement ledger.
#[derive(Parser, Debug, Clone)]
#[command(name = "mart")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Ledger state file.
    #[arg(short, long, env = "MART_STATE", default_value = "mart-state.json")]
    pub state: PathBuf,

    /// Market configuration file (TOML).
    #[arg(short, long, env = "MART_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate a new key pair.
    Keygen,

    /// Sign a message with a secret key.
    Sign {
        /// Base58 secret key.
        #[arg(long, env = "MART_SECRET", hide_env_values = true)]
        secret: String,

        /// Message to sign.
        message: String,
    },

    /// Register or update the signer's profile.
    Register(RegisterArgs),

    /// Publish a listing as a business.
    Publish(PublishArgs),

    /// Show one listing.
    Listing {
        /// Listing id (`owner:tx`).
        id: ListingId,
    },

    /// List listings, optionally for one owner.
    Listings {
        /// Only listings published by this account.
        #[arg(long)]
        owner: Option<AccountKey>,
    },

    /// Match listings by city and price range.
    Match(MatchArgs),

    /// Credit tokens to an account.
    Mint {
        /// Account to credit.
        account: AccountKey,
        /// Whole tokens.
        amount: Amount,
    },

    /// Show an account's available and frozen balance.
    Balance {
        /// Account to inspect.
        account: AccountKey,
    },

    /// Move available tokens into escrow.
    Freeze {
        /// Account to debit.
        account: AccountKey,
        /// Whole tokens.
        amount: Amount,
    },

    /// Pay escrowed tokens to another account.
    Settle {
        /// Payer whose frozen balance is debited.
        from: AccountKey,
        /// Payee.
        to: AccountKey,
        /// Whole tokens.
        amount: Amount,
    },

    /// Open a trade against a listing.
    Submit {
        /// Consumer's base58 secret key.
        #[arg(long, env = "MART_SECRET", hide_env_values = true)]
        secret: String,
        /// Listing id (`owner:tx`).
        listing: ListingId,
    },

    /// Confirm a trade.
    Confirm(TradeActionArgs),

    /// Finish a trade and pay the counterparty.
    Finish(TradeActionArgs),

    /// Cancel a trade and refund the consumer.
    Cancel(TradeActionArgs),

    /// List an account's trades.
    Trades {
        /// Account to inspect.
        account: AccountKey,
        /// Which side of the trade the account is on.
        #[arg(long, value_enum, default_value_t = Side::Consumer)]
        side: Side,
    },
}

/// Arguments for `register`.
#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Base58 secret key of the registering account.
    #[arg(long, env = "MART_SECRET", hide_env_values = true)]
    pub secret: String,
    /// Display name.
    #[arg(long)]
    pub nickname: String,
    /// Legal name.
    #[arg(long)]
    pub name: String,
    /// Age.
    #[arg(long)]
    pub age: String,
    /// Phone number.
    #[arg(long)]
    pub phone: String,
    /// Identity document number.
    #[arg(long)]
    pub id_number: String,
    /// Company registration id; makes the account a business.
    #[arg(long, requires = "company_name")]
    pub company_id: Option<String>,
    /// Company name.
    #[arg(long, requires = "company_id")]
    pub company_name: Option<String>,
}

/// Arguments for `publish`.
#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    /// Business's base58 secret key.
    #[arg(long, env = "MART_SECRET", hide_env_values = true)]
    pub secret: String,
    /// Listing title.
    #[arg(long)]
    pub title: String,
    /// Description.
    #[arg(long)]
    pub content: String,
    /// City.
    #[arg(long)]
    pub city: String,
    /// Price in whole tokens.
    #[arg(long)]
    pub price: Amount,
}

/// Arguments for `match`.
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// City, compared case-insensitively.
    #[arg(long)]
    pub city: String,
    /// Lowest acceptable price.
    #[arg(long, default_value = "0")]
    pub lower: Amount,
    /// Highest acceptable price.
    #[arg(long)]
    pub upper: Amount,
    /// Matching engine id; defaults to the configured one.
    #[arg(long)]
    pub matcher: Option<String>,
}

/// Arguments shared by `confirm`, `finish` and `cancel`.
#[derive(Args, Debug, Clone)]
pub struct TradeActionArgs {
    /// Acting party's base58 secret key.
    #[arg(long, env = "MART_SECRET", hide_env_values = true)]
    pub secret: String,
    /// Trade id (`consumer:tx`).
    pub trade: TradeId,
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Side {
    /// The paying party.
    #[default]
    Consumer,
    /// The listing owner.
    Counterparty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mart_core::Wallet;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_mint_with_typed_args() {
        let account = Wallet::new().account();
        let cli = Cli::parse_from(["mart", "mint", account.as_str(), "100"]);
        match cli.command {
            Commands::Mint { account: a, amount } => {
                assert_eq!(a, account);
                assert_eq!(amount, Amount::new(100));
            }
            other => panic!("expected mint, got {other:?}"),
        }
    }

    #[test]
    fn negative_amount_is_rejected_at_parse() {
        let account = Wallet::new().account();
        let result = Cli::try_parse_from(["mart", "mint", account.as_str(), "-5"]);
        assert!(result.is_err());
    }

    #[test]
    fn malformed_account_is_rejected_at_parse() {
        let result = Cli::try_parse_from(["mart", "balance", "not-base58-0OIl"]);
        assert!(result.is_err());
    }

    #[test]
    fn trade_id_parses() {
        let consumer = Wallet::new().account();
        let id = format!("{consumer}:tx1");
        let cli = Cli::parse_from(["mart", "finish", "--secret", "s", &id]);
        match cli.command {
            Commands::Finish(args) => assert_eq!(args.trade, TradeId::new(consumer, "tx1")),
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[test]
    fn format_and_state_flags() {
        let cli = Cli::parse_from(["mart", "--format", "json", "--state", "/tmp/s.json", "keygen"]);
        assert_eq!(cli.format, Format::Json);
        assert_eq!(cli.state, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn company_flags_come_in_pairs() {
        let result = Cli::try_parse_from([
            "mart", "register", "--secret", "s", "--nickname", "n", "--name", "N", "--age", "1", "--phone", "2",
            "--id-number", "3", "--company-id", "c",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn publish_requires_content() {
        let base = ["mart", "publish", "--secret", "s", "--title", "t", "--city", "Beijing", "--price", "10"];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::parse_from(base.into_iter().chain(["--content", "moving"]));
        match cli.command {
            Commands::Publish(args) => assert_eq!(args.content, "moving"),
            other => panic!("expected publish, got {other:?}"),
        }
    }

    #[test]
    fn trades_side_defaults_to_consumer() {
        let account = Wallet::new().account();
        let cli = Cli::parse_from(["mart", "trades", account.as_str()]);
        assert!(matches!(cli.command, Commands::Trades { side: Side::Consumer, .. }));
    }
}
