use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use super::{Commit, OrderWrite, Store};
use crate::{
    error::StoreError,
    models::{Account, Order, OrderStatus},
};

#[derive(Default)]
struct Inner {
    accounts: HashMap<ObjectId, Account>,
    orders: HashMap<ObjectId, Order>,
}

/// In-process store. A commit validates every guard before touching either map,
/// all under one mutex, so a rejected commit leaves no trace.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_account(&self, id: ObjectId) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict(format!("account {} already exists", account.id)));
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let mut out: Vec<Account> = self.lock()?.accounts.values().cloned().collect();
        out.sort_by_key(|a| a.id);
        Ok(out)
    }

    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock()?.orders.get(&id).cloned())
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut out: Vec<Order> = self
            .lock()?
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        out.sort_by_key(|o| (o.created_at, o.id));
        Ok(out)
    }

    async fn list_pending_orders_for(&self, owner_id: ObjectId) -> Result<Vec<Order>, StoreError> {
        let mut out: Vec<Order> = self
            .lock()?
            .orders
            .values()
            .filter(|o| o.owner_id == owner_id && o.status == OrderStatus::Pending)
            .cloned()
            .collect();
        out.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id)));
        Ok(out)
    }

    async fn commit(&self, commit: Commit) -> Result<Option<Account>, StoreError> {
        let mut inner = self.lock()?;

        if let Some(acc) = &commit.account {
            match inner.accounts.get(&acc.id) {
                Some(stored) if stored.version == acc.version => {}
                Some(stored) => {
                    return Err(StoreError::Conflict(format!(
                        "account {} is at version {}, expected {}",
                        acc.id, stored.version, acc.version
                    )));
                }
                None => return Err(StoreError::Conflict(format!("account {} does not exist", acc.id))),
            }
        }

        match &commit.order {
            Some(OrderWrite::Insert(order)) if inner.orders.contains_key(&order.id) => {
                return Err(StoreError::Conflict(format!("order {} already exists", order.id)));
            }
            Some(OrderWrite::Transition { order, from }) => match inner.orders.get(&order.id) {
                Some(stored) if stored.status == *from => {}
                Some(stored) => {
                    return Err(StoreError::Conflict(format!(
                        "order {} is {}, expected {}",
                        order.id, stored.status, from
                    )));
                }
                None => return Err(StoreError::Conflict(format!("order {} does not exist", order.id))),
            },
            _ => {}
        }

        match commit.order {
            Some(OrderWrite::Insert(order)) | Some(OrderWrite::Transition { order, .. }) => {
                inner.orders.insert(order.id, order);
            }
            None => {}
        }

        let Some(mut acc) = commit.account else {
            return Ok(None);
        };
        acc.version += 1;
        inner.accounts.insert(acc.id, acc.clone());
        Ok(Some(acc))
    }
}
