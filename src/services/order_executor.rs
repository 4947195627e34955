//! Scheduled execution of pending limit orders.
//!
//! Each cycle loads every pending order, fetches one quote per distinct symbol
//! and executes the orders whose limit is met. Orders of one account are
//! processed in creation order on a single task; different accounts run
//! concurrently. Every execution re-reads its order and account under the
//! account lock and commits both in one `Store::commit`, so a crash or a lost
//! race leaves the order pending (or cancelled) with the account untouched.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use chrono::Utc;
use futures_util::{stream, StreamExt};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    error::{EngineError, StoreError},
    models::{Order, OrderStatus, Side},
    AppState,
};

use super::{
    ledger,
    store::{Commit, OrderWrite},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub pending: usize,
    pub symbols: usize,
    pub unavailable_symbols: usize,
    pub executed: usize,
    pub no_match: usize,
    /// left pending because the symbol had no quote this cycle
    pub deferred_unavailable: usize,
    /// sells left pending because the account no longer holds enough shares
    pub deferred_shares: usize,
    /// cancelled or executed elsewhere between the scan and the execution
    pub stale: usize,
    pub failed: usize,
}

impl CycleReport {
    fn absorb(&mut self, other: CycleReport) {
        self.executed += other.executed;
        self.no_match += other.no_match;
        self.deferred_unavailable += other.deferred_unavailable;
        self.deferred_shares += other.deferred_shares;
        self.stale += other.stale;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Executed,
    NoMatch,
    InsufficientShares,
    Stale,
}

/// Whether `price` satisfies the order's limit. Share availability for sells is checked separately.
pub fn limit_reached(order: &Order, price: Decimal) -> bool {
    match order.side {
        Side::Buy => price <= order.limit_price,
        Side::Sell => price >= order.limit_price,
    }
}

pub fn spawn_order_executor(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.settings.order_executor_interval_secs);

    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match run_cycle(&state).await {
                Ok(report) if report.pending == 0 => tracing::debug!("[order-executor] no pending orders"),
                Ok(report) => tracing::info!("[order-executor] cycle finished: {:?}", report),
                Err(e) => tracing::error!("[order-executor] cycle error: {}", e),
            }
        }
    })
}

pub async fn run_cycle(state: &AppState) -> Result<CycleReport, EngineError> {
    let pending = state.store.list_pending_orders().await?;

    let mut report = CycleReport {
        pending: pending.len(),
        ..CycleReport::default()
    };
    if pending.is_empty() {
        return Ok(report);
    }

    let symbols: BTreeSet<String> = pending.iter().map(|o| o.symbol.clone()).collect();
    report.symbols = symbols.len();

    let prices = fetch_prices(state, symbols).await;
    report.unavailable_symbols = report.symbols - prices.len();

    // group by owner, keeping creation order inside each group
    let mut by_owner: HashMap<ObjectId, Vec<(Order, Decimal)>> = HashMap::new();
    for order in pending {
        match prices.get(&order.symbol) {
            Some(price) => by_owner.entry(order.owner_id).or_default().push((order, *price)),
            None => report.deferred_unavailable += 1,
        }
    }

    let partials: Vec<CycleReport> = stream::iter(by_owner.into_values())
        .map(|orders| run_account(state, orders))
        .buffer_unordered(state.settings.executor_concurrency.max(1))
        .collect()
        .await;

    for part in partials {
        report.absorb(part);
    }

    if report.executed > 0 {
        state.publish(&["ordersUpdated", "portfolioUpdated", "leaderboardUpdated"]);
    }

    Ok(report)
}

async fn fetch_prices(state: &AppState, symbols: BTreeSet<String>) -> HashMap<String, Decimal> {
    let quotes: Vec<(String, Option<Decimal>)> = stream::iter(symbols)
        .map(|sym| async move {
            match state.quotes.price(&sym).await {
                Ok(p) => (sym, Some(p)),
                Err(e) => {
                    tracing::warn!("[order-executor] {} unavailable this cycle: {}", sym, e);
                    (sym, None)
                }
            }
        })
        .buffer_unordered(state.settings.executor_concurrency.max(1))
        .collect()
        .await;

    quotes
        .into_iter()
        .filter_map(|(sym, p)| p.map(|p| (sym, p)))
        .collect()
}

async fn run_account(state: &AppState, orders: Vec<(Order, Decimal)>) -> CycleReport {
    let mut report = CycleReport::default();

    for (order, price) in orders {
        match execute_if_matched(state, order.id, order.owner_id, price).await {
            Ok(Outcome::Executed) => report.executed += 1,
            Ok(Outcome::NoMatch) => report.no_match += 1,
            Ok(Outcome::InsufficientShares) => {
                tracing::debug!(
                    "[order-executor] sell {} deferred: {} lacks {} {}",
                    order.id, order.owner_id, order.quantity, order.symbol
                );
                report.deferred_shares += 1;
            }
            Ok(Outcome::Stale) => report.stale += 1,
            Err(e) => {
                tracing::error!("[order-executor] order {} failed: {}", order.id, e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Evaluates one order against `price` and executes it if it matches.
pub async fn execute_if_matched(
    state: &AppState,
    order_id: ObjectId,
    owner_id: ObjectId,
    price: Decimal,
) -> Result<Outcome, EngineError> {
    let _guard = state.locks.lock(owner_id).await;

    let mut order = match state.store.find_order(order_id).await? {
        Some(o) if o.is_pending() => o,
        _ => return Ok(Outcome::Stale),
    };

    if !limit_reached(&order, price) {
        return Ok(Outcome::NoMatch);
    }

    let mut acc = state
        .store
        .find_account(order.owner_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("account {} of order {}", order.owner_id, order.id)))?;

    if order.side == Side::Sell && acc.held_quantity(&order.symbol) < order.quantity {
        return Ok(Outcome::InsufficientShares);
    }

    let now = Utc::now().timestamp();
    let from = order.transition(OrderStatus::Executed, now)?;

    match order.side {
        Side::Buy => ledger::fill_buy_order(&mut acc, &order, price, now)?,
        Side::Sell => {
            ledger::sell(&mut acc, &order.symbol, &order.display_name, order.quantity, price, now)?;
        }
    }

    let commit = Commit::account(acc).with_order(OrderWrite::Transition { order: order.clone(), from });
    match state.store.commit(commit).await {
        Ok(_) => {}
        Err(StoreError::Conflict(msg)) => {
            tracing::debug!("[order-executor] order {} lost a race: {}", order.id, msg);
            return Ok(Outcome::Stale);
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        "[order-executor] executed {} {} {} {} @ {} (limit {})",
        order.id, order.side, order.quantity, order.symbol, price, order.limit_price
    );
    Ok(Outcome::Executed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(side: Side, limit: i64) -> Order {
        Order {
            id: ObjectId::new(),
            owner_id: ObjectId::new(),
            symbol: "AAPL".into(),
            display_name: "Apple".into(),
            side,
            quantity: 1,
            limit_price: Decimal::from(limit),
            status: OrderStatus::Pending,
            created_at: 0,
            executed_at: None,
        }
    }

    #[test]
    fn buys_match_at_or_below_limit_sells_at_or_above() {
        let buy = order(Side::Buy, 50);
        assert!(limit_reached(&buy, Decimal::from(50)));
        assert!(limit_reached(&buy, Decimal::from(48)));
        assert!(!limit_reached(&buy, Decimal::from(51)));

        let sell = order(Side::Sell, 20);
        assert!(limit_reached(&sell, Decimal::from(20)));
        assert!(limit_reached(&sell, Decimal::from(22)));
        assert!(!limit_reached(&sell, Decimal::from(18)));
    }
}
