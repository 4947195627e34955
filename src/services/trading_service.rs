use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;

use crate::{error::EngineError, models::Account, AppState};

use super::{account_service, ledger};

/// Current price for an immediate trade. Fetched before the account lock is
/// taken so a slow quote never holds up other operations on the account.
async fn market_price(state: &AppState, symbol: &str) -> Result<Decimal, EngineError> {
    state.quotes.price(symbol).await.map_err(|e| {
        tracing::warn!("quote for {} failed: {}", symbol, e);
        EngineError::QuoteUnavailable(symbol.to_string())
    })
}

pub async fn buy_now(state: &AppState, user_id: ObjectId, symbol: &str, qty: i64) -> Result<Account, EngineError> {
    let sym = ledger::normalize_symbol(symbol)?;
    ledger::check_quantity(qty)?;

    let price = market_price(state, &sym).await?;

    let acc = account_service::mutate_account(state, user_id, |acc, now| {
        // keep the name of an existing holding
        let name = acc.holding(&sym).map(|h| h.name.clone()).unwrap_or_else(|| sym.clone());
        ledger::buy_at_market(acc, &sym, &name, qty, price, now)
    })
    .await?;

    tracing::info!("{} bought {} {} @ {}", user_id, qty, sym, price);
    Ok(acc)
}

pub async fn sell_now(state: &AppState, user_id: ObjectId, symbol: &str, qty: i64) -> Result<Account, EngineError> {
    let sym = ledger::normalize_symbol(symbol)?;
    ledger::check_quantity(qty)?;

    // fail fast on missing shares before spending a quote call
    let held = account_service::get_or_create_account(state, user_id).await?.held_quantity(&sym);
    if held < qty {
        return Err(EngineError::InsufficientShares { symbol: sym, needed: qty, held });
    }

    let price = market_price(state, &sym).await?;

    let mut pnl = Decimal::ZERO;
    let acc = account_service::mutate_account(state, user_id, |acc, now| {
        let name = acc.holding(&sym).map(|h| h.name.clone()).unwrap_or_else(|| sym.clone());
        pnl = ledger::sell(acc, &sym, &name, qty, price, now)?;
        Ok(())
    })
    .await?;

    tracing::info!("{} sold {} {} @ {} (realized {})", user_id, qty, sym, price, pnl);
    Ok(acc)
}
