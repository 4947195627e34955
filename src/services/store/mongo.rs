use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::{FindOptions, IndexOptions},
    ClientSession, Client, Collection, Cursor, Database, IndexModel,
};

use super::{Commit, OrderWrite, Store};
use crate::{
    error::StoreError,
    models::{Account, Order, OrderStatus},
};

/// MongoDB backed store. `commit` runs inside a multi-document transaction,
/// so the deployment must be a replica set (a single-node one is enough).
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        Ok(Self { client, db })
    }

    fn accounts(&self) -> Collection<Account> {
        self.db.collection::<Account>("accounts")
    }

    fn orders(&self) -> Collection<Order> {
        self.db.collection::<Order>("orders")
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let orders = self.db.collection::<Document>("orders");

        // matching cycle scan: pending, oldest first
        let by_status = IndexModel::builder()
            .keys(doc! { "status": 1, "created_at": 1 })
            .build();
        orders.create_index(by_status, None).await?;

        // per-owner pending list, newest first
        let by_owner = IndexModel::builder()
            .keys(doc! { "owner_id": 1, "status": 1, "created_at": -1 })
            .options(IndexOptions::builder().name("owner_pending".to_string()).build())
            .build();
        orders.create_index(by_owner, None).await?;

        Ok(())
    }

    async fn apply(&self, session: &mut ClientSession, commit: Commit) -> Result<Option<Account>, StoreError> {
        match commit.order {
            Some(OrderWrite::Insert(order)) => {
                self.orders()
                    .insert_one_with_session(&order, None, session)
                    .await
                    .map_err(duplicate_as_conflict)?;
            }
            Some(OrderWrite::Transition { order, from }) => {
                let res = self
                    .orders()
                    .replace_one_with_session(
                        doc! { "_id": order.id, "status": from.as_str() },
                        &order,
                        None,
                        session,
                    )
                    .await?;
                if res.matched_count == 0 {
                    return Err(StoreError::Conflict(format!("order {} is no longer {}", order.id, from)));
                }
            }
            None => {}
        }

        let Some(acc) = commit.account else {
            return Ok(None);
        };

        let mut next = acc.clone();
        next.version += 1;

        let res = self
            .accounts()
            .replace_one_with_session(doc! { "_id": acc.id, "version": acc.version }, &next, None, session)
            .await?;
        if res.matched_count == 0 {
            return Err(StoreError::Conflict(format!(
                "account {} changed since version {}",
                acc.id, acc.version
            )));
        }

        Ok(Some(next))
    }
}

fn duplicate_as_conflict(e: mongodb::error::Error) -> StoreError {
    let msg = e.to_string();
    if msg.contains("E11000") {
        StoreError::Conflict(msg)
    } else {
        StoreError::Backend(msg)
    }
}

async fn collect<T>(mut cursor: Cursor<T>) -> Result<Vec<T>, StoreError>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    let mut out: Vec<T> = vec![];
    while let Some(res) = cursor.next().await {
        out.push(res?);
    }
    Ok(out)
}

#[async_trait]
impl Store for MongoStore {
    async fn find_account(&self, id: ObjectId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.accounts()
            .insert_one(account, None)
            .await
            .map_err(duplicate_as_conflict)?;
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let cursor = self.accounts().find(None, None).await?;
        collect(cursor).await
    }

    async fn find_order(&self, id: ObjectId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_pending_orders(&self) -> Result<Vec<Order>, StoreError> {
        let find_opts = FindOptions::builder().sort(doc! { "created_at": 1, "_id": 1 }).build();
        let cursor = self
            .orders()
            .find(doc! { "status": OrderStatus::Pending.as_str() }, find_opts)
            .await?;
        collect(cursor).await
    }

    async fn list_pending_orders_for(&self, owner_id: ObjectId) -> Result<Vec<Order>, StoreError> {
        let find_opts = FindOptions::builder().sort(doc! { "created_at": -1, "_id": -1 }).build();
        let cursor = self
            .orders()
            .find(
                doc! { "owner_id": owner_id, "status": OrderStatus::Pending.as_str() },
                find_opts,
            )
            .await?;
        collect(cursor).await
    }

    async fn commit(&self, commit: Commit) -> Result<Option<Account>, StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.apply(&mut session, commit).await {
            Ok(acc) => {
                session.commit_transaction().await?;
                Ok(acc)
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!("transaction abort failed: {}", abort);
                }
                Err(e)
            }
        }
    }
}
