//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use mart_core::{AccountKey, Amount, Role};
use mart_ledger::AccountBalance;
use mart_market::{Listing, MatchResult, Onboarding, Trade};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// A freshly generated key pair.
#[derive(Debug, Clone, Serialize)]
pub struct KeyPair {
    /// Account key (base58 public key).
    pub account: AccountKey,
    /// Base58 secret key.
    pub secret: String,
}

impl TableDisplay for KeyPair {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Account:  {}", self.account)?;
        writeln!(writer, "Secret:   {}", self.secret)?;
        writeln!(writer)?;
        writeln!(writer, "Keep the secret safe; it is not stored anywhere.")?;
        Ok(())
    }
}

/// A detached signature.
#[derive(Debug, Clone, Serialize)]
pub struct SignatureOutput {
    /// Signing account.
    pub account: AccountKey,
    /// Base58 signature.
    pub signature: String,
}

impl TableDisplay for SignatureOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.signature)?;
        Ok(())
    }
}

/// Outcome of `register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    /// Registered account.
    pub account: AccountKey,
    /// Derived role.
    pub role: Role,
    /// Display name.
    pub nickname: String,
    /// Onboarding grant minted by this registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted: Option<Amount>,
}

impl From<Onboarding> for Registered {
    fn from(onboarding: Onboarding) -> Self {
        Self {
            account: onboarding.record.account,
            role: onboarding.record.role,
            nickname: onboarding.record.profile.nickname,
            granted: onboarding.granted,
        }
    }
}

impl TableDisplay for Registered {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Account:   {}", self.account)?;
        writeln!(writer, "Nickname:  {}", self.nickname)?;
        match &self.role {
            Role::Consumer => writeln!(writer, "Role:      consumer")?,
            Role::Business { company_name } => writeln!(writer, "Role:      business ({company_name})")?,
        }
        if let Some(granted) = self.granted {
            writeln!(writer, "Granted:   {granted} tokens")?;
        }
        Ok(())
    }
}

/// Balance of one account.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    /// Account.
    pub account: AccountKey,
    /// Spendable tokens.
    pub available: Amount,
    /// Escrowed tokens.
    pub frozen: Amount,
}

impl BalanceView {
    /// Pair an account with its balance.
    #[must_use]
    pub fn new(account: AccountKey, balance: AccountBalance) -> Self {
        Self {
            account,
            available: balance.available,
            frozen: balance.frozen,
        }
    }
}

impl TableDisplay for BalanceView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Account:    {}", self.account)?;
        writeln!(writer, "Available:  {}", self.available)?;
        writeln!(writer, "Frozen:     {}", self.frozen)?;
        Ok(())
    }
}

impl TableDisplay for Listing {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Listing: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Title:      {}", self.title)?;
        writeln!(writer, "Company:    {}", self.company_name)?;
        writeln!(writer, "City:       {}", self.city)?;
        writeln!(writer, "Price:      {}", self.price)?;
        writeln!(writer, "Published:  {}", self.published_at.to_rfc3339())?;
        if !self.content.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", self.content)?;
        }
        Ok(())
    }
}

/// Listings for display.
#[derive(Debug, Clone, Serialize)]
pub struct ListingList {
    /// Listings in key order.
    pub listings: Vec<Listing>,
}

impl TableDisplay for ListingList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.listings.is_empty() {
            writeln!(writer, "No listings")?;
            return Ok(());
        }
        write_listing_rows(writer, self.listings.iter().map(|l| (None, l)))?;
        writeln!(writer)?;
        writeln!(writer, "Total: {} listing(s)", self.listings.len())?;
        Ok(())
    }
}

impl TableDisplay for MatchResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.is_empty() {
            writeln!(writer, "No matching listings")?;
            return Ok(());
        }
        write_listing_rows(writer, self.keyed().map(|(rank, l)| (Some(rank), l)))?;
        writeln!(writer)?;
        writeln!(writer, "Matched: {} listing(s)", self.len())?;
        Ok(())
    }
}

fn write_listing_rows<'a, W: Write>(
    writer: &mut W,
    rows: impl Iterator<Item = (Option<String>, &'a Listing)>,
) -> Result<(), CliError> {
    writeln!(
        writer,
        "{:<4}  {:<24}  {:<12}  {:>8}  {:<20}",
        "#", "TITLE", "CITY", "PRICE", "PUBLISHED"
    )?;
    writeln!(writer, "{}", "─".repeat(76))?;
    for (i, (rank, listing)) in rows.enumerate() {
        writeln!(
            writer,
            "{:<4}  {:<24}  {:<12}  {:>8}  {:<20}",
            rank.unwrap_or_else(|| i.to_string()),
            truncate(&listing.title, 24),
            truncate(&listing.city, 12),
            listing.price,
            listing.published_at.format("%Y-%m-%d %H:%M:%S"),
        )?;
        writeln!(writer, "      {}", listing.id)?;
    }
    Ok(())
}

impl TableDisplay for Trade {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Trade: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "State:         {}", self.state)?;
        writeln!(writer, "Title:         {}", self.title)?;
        writeln!(writer, "Price:         {}", self.price)?;
        writeln!(writer, "Consumer:      {}", self.consumer)?;
        writeln!(writer, "Counterparty:  {}", self.counterparty)?;
        writeln!(writer, "Listing:       {}", self.subject)?;
        writeln!(writer, "Submitted:     {}", self.submitted_at.to_rfc3339())?;
        let stamps = [
            ("Confirmed:", self.confirmed_at),
            ("Finished:", self.finished_at),
            ("Cancelled:", self.cancelled_at),
        ];
        for (label, at) in stamps {
            if let Some(at) = at {
                writeln!(writer, "{label:<15}{}", at.to_rfc3339())?;
            }
        }
        Ok(())
    }
}

/// Trades for display.
#[derive(Debug, Clone, Serialize)]
pub struct TradeList {
    /// Trades in key order.
    pub trades: Vec<Trade>,
}

impl TableDisplay for TradeList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.trades.is_empty() {
            writeln!(writer, "No trades")?;
            return Ok(());
        }

        writeln!(writer, "{:<24}  {:<10}  {:>8}  {:<20}", "TITLE", "STATE", "PRICE", "SUBMITTED")?;
        writeln!(writer, "{}", "─".repeat(68))?;
        for trade in &self.trades {
            writeln!(
                writer,
                "{:<24}  {:<10}  {:>8}  {:<20}",
                truncate(&trade.title, 24),
                trade.state.to_string(),
                trade.price,
                trade.submitted_at.format("%Y-%m-%d %H:%M:%S"),
            )?;
            writeln!(writer, "  {}", trade.id)?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} trade(s)", self.trades.len())?;
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// Truncate to `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mart_core::Wallet;
    use mart_market::ListingId;

    fn listing(title: &str, city: &str, price: u64) -> Listing {
        let owner = Wallet::new().account();
        Listing {
            id: ListingId::new(owner.clone(), format!("tx-{title}")),
            owner,
            company_name: "58Company".into(),
            title: title.into(),
            content: String::new(),
            city: city.into(),
            price: Amount::new(price),
            published_at: "2019-06-27T12:31:47Z".parse().unwrap(),
        }
    }

    #[test]
    fn output_format_default_is_table() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt.format(), Format::Table);
        assert!(!fmt.is_json());
    }

    #[test]
    fn balance_json_output() {
        let account = Wallet::new().account();
        let view = BalanceView::new(
            account,
            AccountBalance {
                available: Amount::new(90),
                frozen: Amount::new(10),
            },
        );
        let output = OutputFormat::new(Format::Json).to_string(&view).expect("should format");
        assert!(output.contains("\"available\": 90"));
        assert!(output.contains("\"frozen\": 10"));
    }

    #[test]
    fn match_result_json_is_rank_keyed() {
        let result = MatchResult::new(vec![listing("banjia", "Beijing", 300)]);
        let output = OutputFormat::new(Format::Json).to_string(&result).expect("should format");
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["0"]["title"], "banjia");
        assert_eq!(value["0"]["price"], 300);
    }

    #[test]
    fn match_result_table_shows_ranks() {
        let result = MatchResult::new(vec![listing("a", "Beijing", 1), listing("b", "Beijing", 2)]);
        let output = OutputFormat::default().to_string(&result).expect("should format");
        assert!(output.contains("TITLE"));
        assert!(output.contains("Matched: 2 listing(s)"));
    }

    #[test]
    fn empty_lists_say_so() {
        let fmt = OutputFormat::default();
        assert!(fmt.to_string(&ListingList { listings: vec![] }).unwrap().contains("No listings"));
        assert!(fmt.to_string(&TradeList { trades: vec![] }).unwrap().contains("No trades"));
        assert!(fmt.to_string(&MatchResult::default()).unwrap().contains("No matching listings"));
    }

    #[test]
    fn listing_table_output() {
        let output = OutputFormat::default()
            .to_string(&listing("搬家服务", "Beijing", 300))
            .expect("should format");
        assert!(output.contains("搬家服务"));
        assert!(output.contains("Price:      300"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("搬家搬家搬家搬家", 5), "搬家...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }

    #[test]
    fn message_table_output() {
        let output = OutputFormat::default().to_string(&Message::success("done")).unwrap();
        assert_eq!(output, "✓ done\n");
        let output = OutputFormat::new(Format::Json).to_string(&Message::info("hi")).unwrap();
        assert!(!output.contains("success"));
    }
}
