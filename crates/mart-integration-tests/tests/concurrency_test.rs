//! Optimistic concurrency across transactions and threads.
//!
//! Conflicting commits abort with a retryable `WriteFailure`; the loser
//! leaves no trace and the caller decides whether to retry.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use mart_core::{AccountKey, Amount, CoreError, ErrorKind, Identity, Registry, Role, Wallet};
use mart_ledger::{AccountLedger, LedgerError};
use mart_market::{
    ListingDraft, MarketConfig, MarketError, Marketplace, TRADES_BY_CONSUMER, Trade, UserProfile,
};
use mart_store::{MemoryStore, SecondaryIndex, StoreError, Transaction, execute};
use parking_lot::RwLock;

// ============================================================================
// Helpers
// ============================================================================

#[derive(Default)]
struct KnownAccounts(RwLock<HashSet<AccountKey>>);

impl KnownAccounts {
    fn with(accounts: &[&AccountKey]) -> Arc<Self> {
        let known = Self::default();
        known.0.write().extend(accounts.iter().map(|a| (*a).clone()));
        Arc::new(known)
    }
}

impl Registry for KnownAccounts {
    fn lookup(&self, account: &AccountKey) -> Result<Option<Identity>, CoreError> {
        Ok(self.0.read().contains(account).then(|| Identity {
            account: account.clone(),
            role: Role::Consumer,
        }))
    }
}

fn seeded(amount: u64) -> (MemoryStore, AccountLedger, AccountKey, AccountKey) {
    let store = MemoryStore::new();
    let a = Wallet::new().account();
    let b = Wallet::new().account();
    let ledger = AccountLedger::new(KnownAccounts::with(&[&a, &b]));
    execute(&store, |tx| -> Result<(), LedgerError> {
        ledger.mint(tx, &a, Amount::new(amount))?;
        ledger.mint(tx, &b, Amount::ZERO)?;
        Ok(())
    })
    .unwrap();
    (store, ledger, a, b)
}

fn balance(store: &MemoryStore, ledger: &AccountLedger, account: &AccountKey) -> (u64, u64) {
    let b = execute(store, |tx| ledger.balance(tx, account)).unwrap();
    (b.available.tokens(), b.frozen.tokens())
}

fn assert_conflict(err: &StoreError) {
    assert!(err.is_retryable(), "expected conflict, got {err}");
    assert_eq!(err.kind(), ErrorKind::WriteFailure);
}

// ============================================================================
// Interleaved transactions
// ============================================================================

#[test]
fn second_of_two_overlapping_freezes_aborts() {
    let (store, ledger, a, _) = seeded(100);

    let mut t1 = Transaction::begin(&store);
    let mut t2 = Transaction::begin(&store);
    ledger.freeze(&mut t1, &a, Amount::new(60)).unwrap();
    ledger.freeze(&mut t2, &a, Amount::new(60)).unwrap();

    t1.commit().unwrap();
    assert_conflict(&t2.commit().unwrap_err());

    // Only the first freeze happened; no tokens were conjured.
    assert_eq!(balance(&store, &ledger, &a), (40, 60));
}

#[test]
fn retry_after_conflict_sees_new_state() {
    let (store, ledger, a, _) = seeded(100);

    let mut t1 = Transaction::begin(&store);
    let mut t2 = Transaction::begin(&store);
    ledger.freeze(&mut t1, &a, Amount::new(60)).unwrap();
    ledger.freeze(&mut t2, &a, Amount::new(60)).unwrap();
    t1.commit().unwrap();
    assert_conflict(&t2.commit().unwrap_err());

    // The caller's retry re-reads and now fails the balance check.
    let retry = execute(&store, |tx| ledger.freeze(tx, &a, Amount::new(60)));
    assert!(matches!(retry, Err(LedgerError::InsufficientBalance { .. })));
    assert_eq!(balance(&store, &ledger, &a), (40, 60));
}

#[test]
fn settle_and_freeze_race_on_payer() {
    let (store, ledger, a, b) = seeded(100);
    execute(&store, |tx| ledger.freeze(tx, &a, Amount::new(50))).unwrap();

    let mut settle = Transaction::begin(&store);
    let mut freeze = Transaction::begin(&store);
    ledger.settle(&mut settle, &a, &b, Amount::new(50)).unwrap();
    ledger.freeze(&mut freeze, &a, Amount::new(50)).unwrap();

    freeze.commit().unwrap();
    assert_conflict(&settle.commit().unwrap_err());

    assert_eq!(balance(&store, &ledger, &a), (0, 100));
    assert_eq!(balance(&store, &ledger, &b), (0, 0));
}

#[test]
fn disjoint_accounts_commit_independently() {
    let store = MemoryStore::new();
    let a = Wallet::new().account();
    let b = Wallet::new().account();
    let ledger = AccountLedger::new(KnownAccounts::with(&[&a, &b]));

    let mut t1 = Transaction::begin(&store);
    let mut t2 = Transaction::begin(&store);
    ledger.mint(&mut t1, &a, Amount::new(1)).unwrap();
    ledger.mint(&mut t2, &b, Amount::new(2)).unwrap();
    t1.commit().unwrap();
    t2.commit().unwrap();

    assert_eq!(balance(&store, &ledger, &a), (1, 0));
    assert_eq!(balance(&store, &ledger, &b), (2, 0));
}

#[test]
fn index_scan_detects_phantom_insert() {
    const ORDERS: SecondaryIndex = SecondaryIndex::new("order");
    let store = MemoryStore::new();

    let mut reader = Transaction::begin(&store);
    assert_eq!(ORDERS.scan(&mut reader, "alice").unwrap().count(), 0);
    reader.put("summary", b"0 orders".to_vec()).unwrap();

    let mut writer = Transaction::begin(&store);
    ORDERS.put(&mut writer, "alice", "o1", b"{}".to_vec()).unwrap();
    writer.commit().unwrap();

    assert_conflict(&reader.commit().unwrap_err());
}

#[test]
fn write_to_other_owner_is_not_a_phantom() {
    const ORDERS: SecondaryIndex = SecondaryIndex::new("order");
    let store = MemoryStore::new();

    let mut reader = Transaction::begin(&store);
    assert_eq!(ORDERS.scan(&mut reader, "alice").unwrap().count(), 0);
    reader.put("summary", b"0 orders".to_vec()).unwrap();

    let mut writer = Transaction::begin(&store);
    ORDERS.put(&mut writer, "bob", "o1", b"{}".to_vec()).unwrap();
    writer.commit().unwrap();

    reader.commit().unwrap();
}

// ============================================================================
// Threads against the marketplace
// ============================================================================

fn registered(market: &Marketplace, company: Option<&str>) -> Wallet {
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
    market.register(&wallet.account(), profile, &sig).unwrap();
    wallet
}

fn retrying<T>(mut op: impl FnMut() -> Result<T, MarketError>) -> Result<T, MarketError> {
    loop {
        match op() {
            Err(err) if err.is_retryable() => continue,
            other => return other,
        }
    }
}

#[test]
fn concurrent_freezes_with_retry_conserve_tokens() {
    let store = Arc::new(MemoryStore::new());
    let market = Marketplace::new(store, MarketConfig::default()).unwrap();
    let account = registered(&market, None).account();

    let outcomes: Vec<Result<_, MarketError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| retrying(|| market.freeze(&account, Amount::new(15)))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count() as u64;
    for failure in outcomes.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(failure.kind(), ErrorKind::InsufficientBalance);
    }
    // 100 tokens cover six freezes of 15.
    assert_eq!(succeeded, 6);
    let balance = market.balance(&account).unwrap();
    assert_eq!(balance.frozen, Amount::new(succeeded * 15));
    assert_eq!(balance.total(), Some(Amount::new(100)));
}

#[test]
fn concurrent_submits_never_overdraw() {
    let store = Arc::new(MemoryStore::new());
    let market = Marketplace::new(store, MarketConfig::default()).unwrap();
    let shop = registered(&market, Some("58Company"));
    let consumer = registered(&market, None);

    let draft = ListingDraft {
        title: "banjia".into(),
        content: "moving".into(),
        city: "Beijing".into(),
        price: Amount::new(30),
    };
    let sig = shop.sign(&draft.signing_bytes().unwrap()).to_bytes();
    let listing = market.publish(&shop.account(), draft, &sig).unwrap().id;
    let sig = consumer.sign(listing.to_string().as_bytes()).to_bytes();

    let outcomes: Vec<Result<Trade, MarketError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|_| s.spawn(|| retrying(|| market.submit(&consumer.account(), &listing, &sig))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let trades: Vec<_> = outcomes.into_iter().filter_map(Result::ok).collect();
    assert_eq!(trades.len(), 3);

    let balance = market.balance(&consumer.account()).unwrap();
    assert_eq!(balance.available, Amount::new(10));
    assert_eq!(balance.frozen, Amount::new(90));

    let by_consumer = market.trades_by_consumer(&consumer.account()).unwrap();
    let by_shop = market.trades_by_counterparty(&shop.account()).unwrap();
    assert_eq!(by_consumer.len(), 3);
    assert_eq!(by_consumer, by_shop);

    // Each committed trade has exactly one consumer-view entry.
    let entries = execute(market.store().as_ref(), |tx| {
        TRADES_BY_CONSUMER
            .scan(tx, consumer.account().as_str())?
            .collect::<Result<Vec<_>, StoreError>>()
    })
    .unwrap();
    assert_eq!(entries.len(), 3);
}
