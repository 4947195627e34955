use std::sync::Arc;

use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<ObjectId, Arc<Mutex<()>>>;

/// One async mutex per account. Every read-modify-write of an account holds its
/// guard for the whole operation; engine code never holds two at once.
///
/// Entries only live while some task holds or waits for them.
#[derive(Clone, Default)]
pub struct AccountLocks {
    inner: Arc<LockMap>,
}

/// Held lock on one account. Dropping it releases the account and forgets the
/// entry when nobody else is queued on it.
pub struct AccountGuard {
    guard: Option<OwnedMutexGuard<()>>,
    account_id: ObjectId,
    map: Arc<LockMap>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, account_id: ObjectId) -> AccountGuard {
        // clone the Arc out so the shard guard is released before awaiting
        let m = self.inner.entry(account_id).or_default().value().clone();
        let guard = m.lock_owned().await;
        AccountGuard {
            guard: Some(guard),
            account_id,
            map: self.inner.clone(),
        }
    }

    /// Number of accounts currently locked or waited on.
    pub fn tracked(&self) -> usize {
        self.inner.len()
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        // the guard owns a clone of the mutex Arc; release it before counting
        self.guard.take();
        // clones are only taken under the shard lock, so a count of one means no waiters
        self.map
            .remove_if(&self.account_id, |_, m| Arc::strong_count(m) == 1);
    }
}
