use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;

use crate::{error::{EngineError, StoreError}, models::Account, AppState};

use super::{ledger, store::Commit};

/// Gets the user's account. If missing, creates it with the configured starting balance.
///
/// Callers that go on to modify the account must already hold its lock.
pub async fn get_or_create_account(state: &AppState, user_id: ObjectId) -> Result<Account, EngineError> {
    if let Some(acc) = state.store.find_account(user_id).await? {
        return Ok(acc);
    }

    let acc = Account::new(
        user_id,
        user_id.to_hex(),
        state.settings.starting_balance,
        Utc::now().timestamp(),
    );

    match state.store.insert_account(&acc).await {
        Ok(()) => {
            tracing::info!("opened account {} with {}", user_id, acc.cash_balance);
            Ok(acc)
        }
        // created concurrently by another process
        Err(StoreError::Conflict(_)) => state
            .store
            .find_account(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account {user_id}"))),
        Err(e) => Err(e.into()),
    }
}

/// Runs `f` against the account under its lock and commits the result.
pub(crate) async fn mutate_account<F>(state: &AppState, user_id: ObjectId, f: F) -> Result<Account, EngineError>
where
    F: FnOnce(&mut Account, i64) -> Result<(), EngineError>,
{
    let _guard = state.locks.lock(user_id).await;

    let mut acc = get_or_create_account(state, user_id).await?;
    f(&mut acc, Utc::now().timestamp())?;

    let stored = state
        .store
        .commit(Commit::account(acc))
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("account {user_id}")))?;

    state.publish(&["portfolioUpdated", "leaderboardUpdated"]);
    Ok(stored)
}

/// Sets the leaderboard display name if it changed.
pub async fn sync_name(state: &AppState, user_id: ObjectId, name: &str) -> Result<Account, EngineError> {
    let name = name.trim();
    let acc = get_or_create_account(state, user_id).await?;
    if name.is_empty() || acc.name == name {
        return Ok(acc);
    }
    mutate_account(state, user_id, |acc, _| {
        acc.name = name.to_string();
        Ok(())
    })
    .await
}

pub async fn add_funds(state: &AppState, user_id: ObjectId, amount: Decimal) -> Result<Account, EngineError> {
    ledger::check_amount("amount", amount)?;
    let acc = mutate_account(state, user_id, |acc, now| ledger::add_funds(acc, amount, now)).await?;
    tracing::info!("account {} moved {} of realized profit to cash", user_id, amount);
    Ok(acc)
}

pub async fn withdraw_funds(state: &AppState, user_id: ObjectId, amount: Decimal) -> Result<Account, EngineError> {
    ledger::check_amount("amount", amount)?;
    let acc = mutate_account(state, user_id, |acc, now| ledger::withdraw_funds(acc, amount, now)).await?;
    tracing::info!("account {} withdrew {}", user_id, amount);
    Ok(acc)
}
