//! Token conservation under arbitrary request sequences.
//!
//! Whatever mix of freezes, settlements, trades and failures runs, the sum of
//! every account's available and frozen balance equals what was minted.

use std::sync::Arc;

use mart_core::{Amount, Wallet};
use mart_market::{ListingDraft, ListingId, MarketConfig, Marketplace, Trade, UserProfile};
use mart_store::MemoryStore;
use proptest::prelude::*;

const USERS: usize = 3;
const GRANT: u64 = 100;

#[derive(Debug, Clone)]
enum Op {
    Freeze(usize, u64),
    Settle(usize, usize, u64),
    Submit(usize, usize),
    Finish(usize),
    Cancel(usize),
    Mint(usize, u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..USERS, 0..60u64).prop_map(|(a, x)| Op::Freeze(a, x)),
        (0..USERS, 0..USERS, 0..60u64).prop_map(|(a, b, x)| Op::Settle(a, b, x)),
        (0..USERS, 0..USERS).prop_map(|(a, l)| Op::Submit(a, l)),
        (0..8usize).prop_map(Op::Finish),
        (0..8usize).prop_map(Op::Cancel),
        (0..USERS, 0..20u64).prop_map(|(a, x)| Op::Mint(a, x)),
    ]
}

struct World {
    market: Marketplace,
    users: Vec<Wallet>,
    listings: Vec<ListingId>,
    trades: Vec<Trade>,
    minted: u64,
}

impl World {
    fn new() -> Self {
        let config = MarketConfig {
            allow_cancel: true,
            ..MarketConfig::default()
        };
        let market = Marketplace::new(Arc::new(MemoryStore::new()), config).unwrap();
        let mut world = Self {
            market,
            users: Vec::new(),
            listings: Vec::new(),
            trades: Vec::new(),
            minted: 0,
        };
        for i in 0..USERS {
            let wallet = Wallet::new();
            let profile = UserProfile {
                nickname: format!("u{i}"),
                name: "N".into(),
                age: "20".into(),
                phone: "1".into(),
                id_number: "2".into(),
                company_id: Some(format!("c{i}")),
                company_name: Some(format!("Company {i}")),
            };
            let sig = wallet.sign(&profile.signing_bytes().unwrap()).to_bytes();
            world.market.register(&wallet.account(), profile, &sig).unwrap();
            world.minted += GRANT;

            let draft = ListingDraft {
                title: format!("service {i}"),
                content: "cleaning".into(),
                city: "Beijing".into(),
                price: Amount::new(15 * (i as u64 + 1)),
            };
            let sig = wallet.sign(&draft.signing_bytes().unwrap()).to_bytes();
            let listing = world.market.publish(&wallet.account(), draft, &sig).unwrap();
            world.listings.push(listing.id);
            world.users.push(wallet);
        }
        world
    }

    fn apply(&mut self, op: &Op) {
        let m = &self.market;
        match *op {
            Op::Freeze(a, x) => {
                let _ = m.freeze(&self.users[a].account(), Amount::new(x));
            }
            Op::Settle(a, b, x) => {
                let _ = m.settle(&self.users[a].account(), &self.users[b].account(), Amount::new(x));
            }
            Op::Submit(a, l) => {
                let consumer = &self.users[a];
                let sig = consumer.sign(self.listings[l].to_string().as_bytes()).to_bytes();
                if let Ok(trade) = m.submit(&consumer.account(), &self.listings[l], &sig) {
                    self.trades.push(trade);
                }
            }
            Op::Finish(t) | Op::Cancel(t) => {
                let Some(trade) = self.trades.get(t) else { return };
                let actor = self.users.iter().find(|w| w.account() == trade.counterparty).unwrap();
                let sig = actor.sign(trade.id.to_string().as_bytes()).to_bytes();
                let _ = if matches!(op, Op::Finish(_)) {
                    m.finish(&actor.account(), &trade.id, &sig)
                } else {
                    m.cancel(&actor.account(), &trade.id, &sig)
                };
            }
            Op::Mint(a, x) => {
                if m.mint(&self.users[a].account(), Amount::new(x)).is_ok() {
                    self.minted += x;
                }
            }
        }
    }

    fn supply(&self) -> u64 {
        self.users
            .iter()
            .map(|w| self.market.balance(&w.account()).unwrap().total().unwrap().tokens())
            .sum()
    }

    fn frozen_by_open_trades(&self, consumer: &Wallet) -> u64 {
        self.market
            .trades_by_consumer(&consumer.account())
            .unwrap()
            .iter()
            .filter(|t| t.state == mart_market::TradeState::Submitted)
            .map(|t| t.price.tokens())
            .sum()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn supply_equals_minted(ops in prop::collection::vec(op(), 0..40)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op);
            prop_assert_eq!(world.supply(), world.minted);
        }
    }

    #[test]
    fn trade_escrow_matches_open_trades(ops in prop::collection::vec((0..USERS, 0..USERS), 0..12)) {
        // Only trade operations, so every frozen token belongs to an open trade.
        let mut world = World::new();
        for (i, (a, l)) in ops.iter().enumerate() {
            world.apply(&Op::Submit(*a, *l));
            if i % 3 == 2 {
                world.apply(&Op::Finish(i / 3));
            }
        }
        for user in &world.users {
            let frozen = world.market.balance(&user.account()).unwrap().frozen.tokens();
            prop_assert_eq!(frozen, world.frozen_by_open_trades(user));
        }
    }
}
