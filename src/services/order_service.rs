use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    error::EngineError,
    models::{Account, Order, OrderStatus, Side},
    AppState,
};

use super::{
    account_service, ledger,
    store::{Commit, OrderWrite},
};

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub portfolio: Account,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub symbol: String,
    pub display_name: String,
    pub side: Side,
    pub quantity: i64,
    pub limit_price: Decimal,
}

pub async fn place_order(state: &AppState, user_id: ObjectId, req: NewOrder) -> Result<PlacedOrder, EngineError> {
    let symbol = ledger::normalize_symbol(&req.symbol)?;
    ledger::check_quantity(req.quantity)?;
    ledger::check_amount("limit price", req.limit_price)?;
    if req.side == Side::Buy {
        ledger::notional(req.limit_price, req.quantity)?;
    }

    let display_name = match req.display_name.trim() {
        "" => symbol.clone(),
        name => name.to_string(),
    };

    let _guard = state.locks.lock(user_id).await;

    let mut acc = account_service::get_or_create_account(state, user_id).await?;
    let now = Utc::now().timestamp();

    let order = Order {
        id: ObjectId::new(),
        owner_id: user_id,
        symbol,
        display_name,
        side: req.side,
        quantity: req.quantity,
        limit_price: req.limit_price,
        status: OrderStatus::Pending,
        created_at: now,
        executed_at: None,
    };

    ledger::reserve(&mut acc, &order, now)?;

    let commit = match order.side {
        Side::Buy => Commit::account(acc.clone()),
        Side::Sell => Commit::default(),
    }
    .with_order(OrderWrite::Insert(order.clone()));

    let portfolio = state.store.commit(commit).await?.unwrap_or(acc);

    tracing::info!(
        "order {} placed: {} {} {} @ {} by {}",
        order.id, order.side, order.quantity, order.symbol, order.limit_price, user_id
    );
    state.publish(&["ordersUpdated", "portfolioUpdated"]);

    Ok(PlacedOrder { order, portfolio })
}

pub async fn cancel_order(state: &AppState, user_id: ObjectId, order_id: ObjectId) -> Result<Account, EngineError> {
    let _guard = state.locks.lock(user_id).await;

    let mut order = match state.store.find_order(order_id).await? {
        Some(o) if o.owner_id == user_id => o,
        _ => return Err(EngineError::NotFound(format!("order {order_id}"))),
    };
    if !order.is_pending() {
        return Err(EngineError::not_pending(order.status));
    }

    let mut acc = account_service::get_or_create_account(state, user_id).await?;
    let now = Utc::now().timestamp();

    let from = order.transition(OrderStatus::Cancelled, now)?;
    if order.side == Side::Buy {
        ledger::release(&mut acc, &order, now)?;
    }

    // sells hold nothing, so only the order changes
    let commit = match order.side {
        Side::Buy => Commit::account(acc.clone()),
        Side::Sell => Commit::default(),
    }
    .with_order(OrderWrite::Transition { order: order.clone(), from });

    let acc = state.store.commit(commit).await?.unwrap_or(acc);

    tracing::info!("order {} cancelled by {}", order.id, user_id);
    state.publish(&["ordersUpdated", "portfolioUpdated"]);

    Ok(acc)
}

pub async fn list_pending_orders(state: &AppState, user_id: ObjectId) -> Result<Vec<Order>, EngineError> {
    Ok(state.store.list_pending_orders_for(user_id).await?)
}
