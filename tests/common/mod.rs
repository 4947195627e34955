#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use papermarket::{
    config::{Settings, StoreBackend},
    error::StoreError,
    models::{Account, Order, Side},
    services::{
        quotes::{QuoteError, QuoteSource},
        store::{Commit, MemoryStore, OrderWrite, Store},
    },
    AppState,
};
use rust_decimal::Decimal;

pub fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

/// Zero-latency quote source with settable prices.
#[derive(Default)]
pub struct FakeQuotes {
    prices: Mutex<HashMap<String, Decimal>>,
    calls: AtomicUsize,
}

impl FakeQuotes {
    pub fn set(&self, symbol: &str, price: i64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), d(price));
    }

    pub fn clear(&self, symbol: &str) {
        self.prices.lock().unwrap().remove(symbol);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for FakeQuotes {
    async fn price(&self, symbol: &str) -> Result<Decimal, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteError::Unavailable(symbol.to_string()))
    }
}

/// Memory store that refuses to commit writes for chosen orders.
pub struct FlakyStore {
    inner: MemoryStore,
    poisoned: Mutex<HashSet<ObjectId>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            poisoned: Mutex::new(HashSet::new()),
        }
    }

    pub fn poison(&self, order_id: ObjectId) {
        self.poisoned.lock().unwrap().insert(order_id);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn find_account(&self, id: ObjectId) -> Result<Option<Account>, StoreError> {
        self.inner.find_account(id).await
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.inner.insert_account(account).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts().await
    }

    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError> {
        self.inner.find_order(id).await
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.inner.list_pending_orders().await
    }

    async fn list_pending_orders_for(&self, owner_id: ObjectId) -> Result<Vec<Order>, StoreError> {
        self.inner.list_pending_orders_for(owner_id).await
    }

    async fn commit(&self, commit: Commit) -> Result<Option<Account>, StoreError> {
        if let Some(OrderWrite::Transition { order, .. }) = &commit.order {
            if self.poisoned.lock().unwrap().contains(&order.id) {
                return Err(StoreError::Backend("disk on fire".to_string()));
            }
        }
        self.inner.commit(commit).await
    }
}

pub struct Harness {
    pub state: AppState,
    pub quotes: Arc<FakeQuotes>,
}

pub fn settings(starting_balance: i64) -> Settings {
    Settings {
        store_backend: StoreBackend::Memory,
        starting_balance: d(starting_balance),
        ..Settings::default()
    }
}

pub fn harness(starting_balance: i64) -> Harness {
    harness_with_store(starting_balance, Arc::new(MemoryStore::new()))
}

pub fn harness_with_store(starting_balance: i64, store: Arc<dyn Store>) -> Harness {
    let quotes = Arc::new(FakeQuotes::default());
    let state = AppState::new(settings(starting_balance), store, quotes.clone());
    Harness { state, quotes }
}

impl Harness {
    pub async fn account(&self, owner: ObjectId) -> Account {
        self.state
            .store
            .find_account(owner)
            .await
            .unwrap()
            .expect("account exists")
    }

    pub async fn order(&self, id: ObjectId) -> Order {
        self.state.store.find_order(id).await.unwrap().expect("order exists")
    }

    /// reserved balance must equal the sum of the owner's pending buy reservations
    pub async fn assert_reservations_consistent(&self, owner: ObjectId) {
        let acc = self.account(owner).await;
        let pending = self.state.store.list_pending_orders_for(owner).await.unwrap();
        let expected: Decimal = pending
            .iter()
            .filter(|o| o.side == Side::Buy)
            .map(|o| o.reservation().expect("reservation fits"))
            .sum();
        assert_eq!(acc.reserved_balance, expected, "reservation invariant broken for {owner}");
        assert!(acc.cash_balance >= Decimal::ZERO);
        assert!(acc.reserved_balance >= Decimal::ZERO);
    }
}
