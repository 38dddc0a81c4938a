//! Trade records and their state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mart_core::{AccountKey, Amount};
use serde::{Deserialize, Serialize};

use crate::config::FinishPolicy;
use crate::error::MarketError;
use crate::listing::ListingId;

/// The state of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    /// Consumer funds frozen, awaiting the counterparty.
    Submitted,
    /// Counterparty accepted the trade.
    Confirmed,
    /// Frozen funds paid to the counterparty.
    Finished,
    /// Frozen funds returned to the consumer.
    Cancelled,
}

impl TradeState {
    /// Checks if a transition to the target state is valid under `policy`.
    #[must_use]
    pub const fn can_transition_to(&self, target: &Self, policy: FinishPolicy) -> bool {
        use TradeState::{Cancelled, Confirmed, Finished, Submitted};

        match (self, target) {
            (Submitted, Confirmed | Cancelled) => true,
            (Submitted, Finished) => matches!(policy, FinishPolicy::Branching),
            (Confirmed, Finished | Cancelled) => matches!(policy, FinishPolicy::Sequential),
            _ => false,
        }
    }

    /// Returns true if no transition leaves this state under `policy`.
    #[must_use]
    pub const fn is_terminal(&self, policy: FinishPolicy) -> bool {
        match self {
            Self::Submitted => false,
            Self::Confirmed => matches!(policy, FinishPolicy::Branching),
            Self::Finished | Self::Cancelled => true,
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "Submitted"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Finished => write!(f, "Finished"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Identifies a trade: the consumer plus the submitting transaction.
///
/// Rendered as `<consumer>:<tx id>`; this string is also the message signed
/// for `confirm`, `finish` and `cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradeId {
    consumer: AccountKey,
    tx: String,
}

impl TradeId {
    /// Build a trade id.
    #[must_use]
    pub fn new(consumer: AccountKey, tx: impl Into<String>) -> Self {
        Self {
            consumer,
            tx: tx.into(),
        }
    }

    /// The submitting consumer.
    #[must_use]
    pub const fn consumer(&self) -> &AccountKey {
        &self.consumer
    }

    /// The submitting transaction id.
    #[must_use]
    pub fn tx(&self) -> &str {
        &self.tx
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.consumer, self.tx)
    }
}

impl FromStr for TradeId {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (consumer, tx) = s
            .split_once(':')
            .ok_or_else(|| MarketError::validation(format!("malformed trade id: {s}")))?;
        if tx.is_empty() {
            return Err(MarketError::validation(format!("malformed trade id: {s}")));
        }
        let consumer = AccountKey::from_base58(consumer)
            .map_err(|e| MarketError::validation(format!("malformed trade id: {e}")))?;
        Ok(Self::new(consumer, tx))
    }
}

impl TryFrom<String> for TradeId {
    type Error = MarketError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TradeId> for String {
    fn from(id: TradeId) -> Self {
        id.to_string()
    }
}

/// One escrowed exchange between a consumer and a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade identifier.
    pub id: TradeId,
    /// Paying account.
    pub consumer: AccountKey,
    /// Receiving account (the listing owner).
    pub counterparty: AccountKey,
    /// The listing traded for.
    pub subject: ListingId,
    /// Listing title at submission.
    pub title: String,
    /// Escrowed price.
    pub price: Amount,
    /// Current state.
    pub state: TradeState,
    /// When the trade was submitted.
    pub submitted_at: DateTime<Utc>,
    /// When the trade was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the trade was finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// When the trade was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Creates a new trade in the `Submitted` state.
    #[must_use]
    pub fn submitted(
        id: TradeId,
        counterparty: AccountKey,
        subject: ListingId,
        title: String,
        price: Amount,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            consumer: id.consumer().clone(),
            id,
            counterparty,
            subject,
            title,
            price,
            state: TradeState::Submitted,
            submitted_at: at,
            confirmed_at: None,
            finished_at: None,
            cancelled_at: None,
        }
    }

    /// Returns true if `account` is the consumer or the counterparty.
    #[must_use]
    pub fn is_party(&self, account: &AccountKey) -> bool {
        &self.consumer == account || &self.counterparty == account
    }

    /// Checks that the trade may move to `target` under `policy`.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidStateTransition` otherwise.
    pub fn check_transition(&self, target: TradeState, policy: FinishPolicy) -> Result<(), MarketError> {
        if self.state.can_transition_to(&target, policy) {
            Ok(())
        } else {
            Err(MarketError::InvalidStateTransition {
                from: self.state.to_string(),
                to: target.to_string(),
            })
        }
    }

    fn transition_to(&mut self, target: TradeState, policy: FinishPolicy, at: DateTime<Utc>) -> Result<(), MarketError> {
        self.check_transition(target, policy)?;
        self.state = target;
        match target {
            TradeState::Confirmed => self.confirmed_at = Some(at),
            TradeState::Finished => self.finished_at = Some(at),
            TradeState::Cancelled => self.cancelled_at = Some(at),
            TradeState::Submitted => {}
        }
        Ok(())
    }

    /// Counterparty accepts the trade.
    pub fn confirm(&mut self, policy: FinishPolicy, at: DateTime<Utc>) -> Result<(), MarketError> {
        self.transition_to(TradeState::Confirmed, policy, at)
    }

    /// Funds are released to the counterparty.
    pub fn finish(&mut self, policy: FinishPolicy, at: DateTime<Utc>) -> Result<(), MarketError> {
        self.transition_to(TradeState::Finished, policy, at)
    }

    /// Funds are returned to the consumer.
    pub fn cancel(&mut self, policy: FinishPolicy, at: DateTime<Utc>) -> Result<(), MarketError> {
        self.transition_to(TradeState::Cancelled, policy, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mart_core::Wallet;
    use test_case::test_case;

    use FinishPolicy::{Branching, Sequential};
    use TradeState::{Cancelled, Confirmed, Finished, Submitted};

    fn trade() -> Trade {
        let consumer = Wallet::new().account();
        let owner = Wallet::new().account();
        Trade::submitted(
            TradeId::new(consumer, "tx1"),
            owner.clone(),
            ListingId::new(owner, "tx0"),
            "banjia".into(),
            Amount::new(10),
            Utc::now(),
        )
    }

    #[test_case(Submitted, Confirmed, Branching, true)]
    #[test_case(Submitted, Finished, Branching, true)]
    #[test_case(Confirmed, Finished, Branching, false)]
    #[test_case(Submitted, Finished, Sequential, false)]
    #[test_case(Confirmed, Finished, Sequential, true)]
    #[test_case(Submitted, Cancelled, Branching, true)]
    #[test_case(Confirmed, Cancelled, Branching, false)]
    #[test_case(Confirmed, Cancelled, Sequential, true)]
    #[test_case(Finished, Confirmed, Branching, false)]
    #[test_case(Finished, Cancelled, Sequential, false)]
    #[test_case(Cancelled, Finished, Branching, false)]
    #[test_case(Submitted, Submitted, Branching, false)]
    fn transitions(from: TradeState, to: TradeState, policy: FinishPolicy, ok: bool) {
        assert_eq!(from.can_transition_to(&to, policy), ok);
    }

    #[test]
    fn terminal_states_depend_on_policy() {
        assert!(Confirmed.is_terminal(Branching));
        assert!(!Confirmed.is_terminal(Sequential));
        assert!(Finished.is_terminal(Sequential));
        assert!(!Submitted.is_terminal(Branching));
    }

    #[test]
    fn branching_confirm_then_finish_is_rejected() {
        let mut t = trade();
        t.confirm(Branching, Utc::now()).unwrap();
        let err = t.finish(Branching, Utc::now()).unwrap_err();
        assert!(matches!(err, MarketError::InvalidStateTransition { .. }));
        assert_eq!(t.state, Confirmed);
        assert!(t.finished_at.is_none());
    }

    #[test]
    fn sequential_pipeline_stamps_times() {
        let mut t = trade();
        t.confirm(Sequential, Utc::now()).unwrap();
        t.finish(Sequential, Utc::now()).unwrap();
        assert_eq!(t.state, Finished);
        assert!(t.confirmed_at.is_some());
        assert!(t.finished_at.is_some());
    }

    #[test]
    fn trade_id_roundtrips_through_string() {
        let t = trade();
        let rendered = t.id.to_string();
        assert_eq!(rendered.parse::<TradeId>().unwrap(), t.id);
        let json = serde_json::to_string(&t).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test_case("no-colon" ; "missing separator")]
    #[test_case("notbase58!:tx" ; "bad consumer")]
    fn malformed_trade_ids_are_validation_errors(s: &str) {
        let err = s.parse::<TradeId>().unwrap_err();
        assert_eq!(err.kind(), mart_core::ErrorKind::Validation);
    }

    #[test]
    fn parties() {
        let t = trade();
        assert!(t.is_party(&t.consumer.clone()));
        assert!(t.is_party(&t.counterparty.clone()));
        assert!(!t.is_party(&Wallet::new().account()));
    }
}
