//! Marketplace CLI binary entrypoint.
//!
//! This is the main entry point for the `mart` command-line tool.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mart_cli::cli::{Cli, Commands};
use mart_cli::commands::{AccountCommand, KeyCommand, ListingCommand, TradeAction, TradeCommand, UserCommand};
use mart_cli::output::OutputFormat;
use mart_cli::{CliError, Session};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli, &mut io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run<W: Write>(cli: Cli, out: &mut W) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);

    // Key commands never touch the state file.
    match &cli.command {
        Commands::Keygen => return KeyCommand.keygen(out, &format),
        Commands::Sign { secret, message } => return KeyCommand.sign(out, &format, secret, message),
        _ => {}
    }

    let session = Session::open(&cli.state, cli.config.as_deref())?;
    match cli.command {
        Commands::Keygen | Commands::Sign { .. } => Ok(()),
        Commands::Register(args) => UserCommand::new(&session).register(out, &format, &args),
        Commands::Publish(args) => ListingCommand::new(&session).publish(out, &format, &args),
        Commands::Listing { id } => ListingCommand::new(&session).show(out, &format, &id),
        Commands::Listings { owner } => ListingCommand::new(&session).list(out, &format, owner.as_ref()),
        Commands::Match(args) => ListingCommand::new(&session).matching(out, &format, &args),
        Commands::Mint { account, amount } => AccountCommand::new(&session).mint(out, &format, &account, amount),
        Commands::Balance { account } => AccountCommand::new(&session).balance(out, &format, &account),
        Commands::Freeze { account, amount } => AccountCommand::new(&session).freeze(out, &format, &account, amount),
        Commands::Settle { from, to, amount } => {
            AccountCommand::new(&session).settle(out, &format, &from, &to, amount)
        }
        Commands::Submit { secret, listing } => TradeCommand::new(&session).submit(out, &format, &secret, &listing),
        Commands::Confirm(args) => {
            TradeCommand::new(&session).act(out, &format, TradeAction::Confirm, &args.secret, &args.trade)
        }
        Commands::Finish(args) => {
            TradeCommand::new(&session).act(out, &format, TradeAction::Finish, &args.secret, &args.trade)
        }
        Commands::Cancel(args) => {
            TradeCommand::new(&session).act(out, &format, TradeAction::Cancel, &args.secret, &args.trade)
        }
        Commands::Trades { account, side } => TradeCommand::new(&session).list(out, &format, &account, side),
    }
}
