//! Token balances: mint, freeze, settle and inspect.

use std::io::Write;

use mart_core::{AccountKey, Amount};

use crate::error::CliError;
use crate::output::{BalanceView, Message, OutputFormat};
use crate::session::Session;

/// Account command executor.
#[derive(Debug)]
pub struct AccountCommand<'a> {
    session: &'a Session,
}

impl<'a> AccountCommand<'a> {
    /// Create an account command over `session`.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Credit `amount` to `account`.
    ///
    /// # Errors
    ///
    /// Returns an error on overflow or if state cannot be saved.
    pub fn mint<W: Write>(&self, writer: &mut W, format: &OutputFormat, account: &AccountKey, amount: Amount) -> Result<(), CliError> {
        let balance = self.session.market().mint(account, amount)?;
        self.session.save()?;
        format.write(writer, &BalanceView::new(account.clone(), balance))
    }

    /// Show `account`'s balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the account has never been minted into.
    pub fn balance<W: Write>(&self, writer: &mut W, format: &OutputFormat, account: &AccountKey) -> Result<(), CliError> {
        let balance = self.session.market().balance(account)?;
        format.write(writer, &BalanceView::new(account.clone(), balance))
    }

    /// Move `amount` of `account`'s available tokens into escrow.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown accounts or insufficient funds.
    pub fn freeze<W: Write>(&self, writer: &mut W, format: &OutputFormat, account: &AccountKey, amount: Amount) -> Result<(), CliError> {
        let balance = self.session.market().freeze(account, amount)?;
        self.session.save()?;
        format.write(writer, &BalanceView::new(account.clone(), balance))
    }

    /// Pay `amount` of `from`'s frozen tokens to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown accounts or insufficient frozen funds.
    pub fn settle<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        from: &AccountKey,
        to: &AccountKey,
        amount: Amount,
    ) -> Result<(), CliError> {
        self.session.market().settle(from, to, amount)?;
        self.session.save()?;
        format.write(writer, &Message::success(format!("Settled {amount} from {from} to {to}")))
    }
}
