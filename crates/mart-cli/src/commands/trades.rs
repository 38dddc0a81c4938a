//! Trade lifecycle commands.
//!
//! Each action signs the message the trade ledger expects: the listing id
//! for `submit`, the trade id for `confirm`, `finish` and `cancel`.

use std::io::Write;

use mart_core::{AccountKey, Wallet};
use mart_market::{ListingId, Trade, TradeId};

use crate::cli::Side;
use crate::error::CliError;
use crate::output::{OutputFormat, TradeList};
use crate::session::Session;

/// A trade transition requested from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    /// Acknowledge the trade.
    Confirm,
    /// Pay the counterparty.
    Finish,
    /// Refund the consumer.
    Cancel,
}

/// Trade command executor.
#[derive(Debug)]
pub struct TradeCommand<'a> {
    session: &'a Session,
}

impl<'a> TradeCommand<'a> {
    /// Create a trade command over `session`.
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Open a trade against `listing`, escrowing its price.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is malformed or the trade is rejected.
    pub fn submit<W: Write>(&self, writer: &mut W, format: &OutputFormat, secret: &str, listing: &ListingId) -> Result<(), CliError> {
        let wallet = Wallet::from_base58_secret(secret)?;
        let signature = wallet.sign(listing.to_string().as_bytes()).to_bytes();
        let trade = self.session.market().submit(&wallet.account(), listing, &signature)?;
        self.session.save()?;
        format.write(writer, &trade)
    }

    /// Apply `action` to trade `id` as the holder of `secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is malformed or the transition is
    /// rejected.
    pub fn act<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        action: TradeAction,
        secret: &str,
        id: &TradeId,
    ) -> Result<(), CliError> {
        let wallet = Wallet::from_base58_secret(secret)?;
        let actor = wallet.account();
        let signature = wallet.sign(id.to_string().as_bytes()).to_bytes();

        let market = self.session.market();
        let trade: Trade = match action {
            TradeAction::Confirm => market.confirm(&actor, id, &signature)?,
            TradeAction::Finish => market.finish(&actor, id, &signature)?,
            TradeAction::Cancel => market.cancel(&actor, id, &signature)?,
        };
        self.session.save()?;
        format.write(writer, &trade)
    }

    /// List `account`'s trades on the given side.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list<W: Write>(&self, writer: &mut W, format: &OutputFormat, account: &AccountKey, side: Side) -> Result<(), CliError> {
        let market = self.session.market();
        let trades = match side {
            Side::Consumer => market.trades_by_consumer(account)?,
            Side::Counterparty => market.trades_by_counterparty(account)?,
        };
        format.write(writer, &TradeList { trades })
    }
}

#[cfg(test)]
mod tests {
    use mart_core::{Amount, ErrorKind};
    use mart_market::{ListingDraft, TradeState, UserProfile};

    use super::*;
    use crate::cli::Format;

    struct Fixture {
        _dir: tempfile::TempDir,
        session: Session,
        shop: Wallet,
        buyer: Wallet,
        listing: ListingId,
    }

    fn register(session: &Session, company: Option<&str>) -> Wallet {
        let wallet = Wallet::new();
        let profile = UserProfile {
            nickname: "n".into(),
            name: "N".into(),
            age: "20".into(),
            phone: "1".into(),
            id_number: "2".into(),
            company_id: company.map(|_| "cid".to_string()),
            company_name: company.map(String::from),
        };
        let sig = wallet.sign(&profile.signing_bytes().unwrap()).to_bytes();
        session.market().register(&wallet.account(), profile, &sig).unwrap();
        wallet
    }

    fn fixture(config: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("mart.toml");
        if let Some(toml) = config {
            std::fs::write(&config_path, toml).unwrap();
        }
        let session = Session::open(&dir.path().join("state.json"), config.map(|_| config_path.as_path())).unwrap();

        let shop = register(&session, Some("58Company"));
        let buyer = register(&session, None);
        let draft = ListingDraft {
            title: "banjia".into(),
            content: "moving".into(),
            city: "Beijing".into(),
            price: Amount::new(10),
        };
        let sig = shop.sign(&draft.signing_bytes().unwrap()).to_bytes();
        let listing = session.market().publish(&shop.account(), draft, &sig).unwrap().id;
        Fixture {
            _dir: dir,
            session,
            shop,
            buyer,
            listing,
        }
    }

    fn submit(f: &Fixture) -> TradeId {
        let mut out = Vec::new();
        TradeCommand::new(&f.session)
            .submit(&mut out, &OutputFormat::new(Format::Json), &f.buyer.secret_base58(), &f.listing)
            .unwrap();
        let trade: Trade = serde_json::from_slice(&out).unwrap();
        trade.id
    }

    #[test]
    fn submit_then_finish_pays_counterparty() {
        let f = fixture(None);
        let id = submit(&f);
        let cmd = TradeCommand::new(&f.session);

        let mut out = Vec::new();
        cmd.act(&mut out, &OutputFormat::new(Format::Json), TradeAction::Finish, &f.shop.secret_base58(), &id)
            .unwrap();
        let trade: Trade = serde_json::from_slice(&out).unwrap();
        assert_eq!(trade.state, TradeState::Finished);

        let market = f.session.market();
        assert_eq!(market.balance(&f.buyer.account()).unwrap().available, Amount::new(90));
        assert_eq!(market.balance(&f.shop.account()).unwrap().available, Amount::new(110));
    }

    #[test]
    fn outsider_cannot_confirm_when_parties_required() {
        let f = fixture(Some("require_party_signer = true\n"));
        let id = submit(&f);
        let outsider = Wallet::new();

        let err = TradeCommand::new(&f.session)
            .act(&mut Vec::new(), &OutputFormat::default(), TradeAction::Confirm, &outsider.secret_base58(), &id)
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Authentication));
        assert_eq!(f.session.market().trade(&id).unwrap().state, TradeState::Submitted);

        TradeCommand::new(&f.session)
            .act(&mut Vec::new(), &OutputFormat::default(), TradeAction::Confirm, &f.shop.secret_base58(), &id)
            .unwrap();
        assert_eq!(f.session.market().trade(&id).unwrap().state, TradeState::Confirmed);
    }

    #[test]
    fn cancel_needs_opt_in() {
        let f = fixture(None);
        let id = submit(&f);
        let err = TradeCommand::new(&f.session)
            .act(&mut Vec::new(), &OutputFormat::default(), TradeAction::Cancel, &f.buyer.secret_base58(), &id)
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));

        let f = fixture(Some("allow_cancel = true\n"));
        let id = submit(&f);
        TradeCommand::new(&f.session)
            .act(&mut Vec::new(), &OutputFormat::default(), TradeAction::Cancel, &f.buyer.secret_base58(), &id)
            .unwrap();
        let balance = f.session.market().balance(&f.buyer.account()).unwrap();
        assert_eq!(balance.available, Amount::new(100));
        assert_eq!(balance.frozen, Amount::ZERO);
    }

    #[test]
    fn list_by_side() {
        let f = fixture(None);
        submit(&f);
        let cmd = TradeCommand::new(&f.session);
        let json = OutputFormat::new(Format::Json);

        let mut out = Vec::new();
        cmd.list(&mut out, &json, &f.shop.account(), Side::Counterparty).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["trades"].as_array().unwrap().len(), 1);

        let mut out = Vec::new();
        cmd.list(&mut out, &json, &f.shop.account(), Side::Consumer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(value["trades"].as_array().unwrap().is_empty());
    }
}
