//! Durable account and order state.
//!
//! Both backends implement the same contract: reads return snapshots, and every
//! write goes through [`Store::commit`], which applies an account replacement and
//! an order write as one unit. The account write is guarded by `version`, the
//! order transition by its expected prior status. If either guard fails nothing
//! is written and `StoreError::Conflict` is returned.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::{
    error::StoreError,
    models::{Account, Order, OrderStatus},
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Clone)]
pub enum OrderWrite {
    Insert(Order),
    /// Replace the order only if its stored status still equals `from`.
    Transition { order: Order, from: OrderStatus },
}

#[derive(Debug, Clone, Default)]
pub struct Commit {
    /// Account as read (carrying the version it was read at) plus local changes.
    pub account: Option<Account>,
    pub order: Option<OrderWrite>,
}

impl Commit {
    pub fn account(account: Account) -> Self {
        Self { account: Some(account), order: None }
    }

    pub fn with_order(mut self, write: OrderWrite) -> Self {
        self.order = Some(write);
        self
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_account(&self, id: ObjectId) -> Result<Option<Account>, StoreError>;

    /// Inserts a fresh account. Fails with `Conflict` if the id already exists.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError>;

    /// All pending orders, oldest first.
    async fn list_pending_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Pending orders of one owner, newest first.
    async fn list_pending_orders_for(&self, owner_id: ObjectId) -> Result<Vec<Order>, StoreError>;

    /// Applies the commit atomically. Returns the account as stored (version bumped).
    async fn commit(&self, commit: Commit) -> Result<Option<Account>, StoreError>;
}
