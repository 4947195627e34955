//! Account arithmetic. Every function here either fully applies its change to
//! the in-memory `Account` or returns an error and leaves it untouched; callers
//! persist the result through a single `Store::commit`.

use rust_decimal::Decimal;

use crate::{
    error::EngineError,
    models::{Account, Holding, Order, Side, Transaction},
};

pub fn normalize_symbol(symbol: &str) -> Result<String, EngineError> {
    let sym = symbol.trim().to_uppercase();
    if sym.is_empty() {
        return Err(EngineError::InvalidAmount("missing symbol".to_string()));
    }
    Ok(sym)
}

pub fn check_quantity(qty: i64) -> Result<(), EngineError> {
    if qty <= 0 {
        return Err(EngineError::InvalidAmount(format!("quantity must be positive, got {qty}")));
    }
    Ok(())
}

pub fn check_amount(what: &str, amount: Decimal) -> Result<(), EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!("{what} must be positive, got {amount}")));
    }
    Ok(())
}

fn overflow(what: &str) -> EngineError {
    EngineError::InvalidAmount(format!("{what} is too large"))
}

/// `price × qty`, rejected when the product does not fit in a `Decimal`.
pub fn notional(price: Decimal, qty: i64) -> Result<Decimal, EngineError> {
    price.checked_mul(Decimal::from(qty)).ok_or_else(|| overflow("order value"))
}

/// Funds a pending order holds: limit × quantity for buys, zero for sells.
pub fn order_reservation(order: &Order) -> Result<Decimal, EngineError> {
    order.reservation().ok_or_else(|| overflow("order value"))
}

fn credit(balance: Decimal, amount: Decimal, what: &str) -> Result<Decimal, EngineError> {
    balance.checked_add(amount).ok_or_else(|| overflow(what))
}

fn ensure_shares(acc: &Account, symbol: &str, qty: i64) -> Result<(), EngineError> {
    let held = acc.held_quantity(symbol);
    if held < qty {
        return Err(EngineError::InsufficientShares {
            symbol: symbol.to_string(),
            needed: qty,
            held,
        });
    }
    Ok(())
}

fn ensure_cash(acc: &Account, needed: Decimal) -> Result<(), EngineError> {
    if needed > acc.cash_balance {
        return Err(EngineError::InsufficientFunds {
            needed,
            available: acc.cash_balance,
        });
    }
    Ok(())
}

/// Adds a lot to the holding for `symbol`, averaging cost by quantity.
/// Leaves the account untouched when the merged position does not fit.
fn add_lot(acc: &mut Account, symbol: &str, name: &str, qty: i64, price: Decimal) -> Result<(), EngineError> {
    match acc.holdings.iter_mut().find(|h| h.symbol == symbol) {
        Some(h) => {
            let new_qty = h.quantity.checked_add(qty).ok_or_else(|| overflow("position"))?;
            let basis = h
                .average_cost
                .checked_mul(Decimal::from(h.quantity))
                .and_then(|b| b.checked_add(price.checked_mul(Decimal::from(qty))?))
                .ok_or_else(|| overflow("position"))?;
            h.average_cost = basis / Decimal::from(new_qty);
            h.quantity = new_qty;
        }
        None => acc.holdings.push(Holding {
            symbol: symbol.to_string(),
            name: name.to_string(),
            quantity: qty,
            average_cost: price,
        }),
    }
    Ok(())
}

/// Removes `qty` shares, dropping the holding once it is empty.
fn remove_shares(acc: &mut Account, symbol: &str, qty: i64) -> Result<(), EngineError> {
    ensure_shares(acc, symbol, qty)?;
    let idx = acc
        .holdings
        .iter()
        .position(|h| h.symbol == symbol)
        .ok_or_else(|| EngineError::NotFound(format!("holding {symbol}")))?;

    let h = &mut acc.holdings[idx];
    h.quantity -= qty;
    if h.quantity == 0 {
        acc.holdings.remove(idx);
    }
    Ok(())
}

fn record(acc: &mut Account, kind: Side, symbol: &str, name: &str, qty: i64, price: Decimal, now: i64) {
    acc.transactions.push(Transaction {
        kind,
        symbol: symbol.to_string(),
        name: name.to_string(),
        quantity: qty,
        price,
        at: now,
    });
    acc.updated_at = now;
}

/// Placement-time effect of a new pending order.
pub fn reserve(acc: &mut Account, order: &Order, now: i64) -> Result<(), EngineError> {
    match order.side {
        Side::Buy => {
            let cost = order_reservation(order)?;
            ensure_cash(acc, cost)?;
            let reserved = credit(acc.reserved_balance, cost, "reserved balance")?;
            acc.cash_balance -= cost;
            acc.reserved_balance = reserved;
        }
        // shares are checked, not reserved
        Side::Sell => ensure_shares(acc, &order.symbol, order.quantity)?,
    }
    acc.updated_at = now;
    Ok(())
}

/// Returns a cancelled buy order's reservation to cash, at the original limit price.
pub fn release(acc: &mut Account, order: &Order, now: i64) -> Result<(), EngineError> {
    let held = order_reservation(order)?;
    if held > acc.reserved_balance {
        return Err(EngineError::InvalidState(format!(
            "reserved balance {} does not cover order {} ({held})",
            acc.reserved_balance, order.id
        )));
    }
    let cash = credit(acc.cash_balance, held, "cash balance")?;
    acc.reserved_balance -= held;
    acc.cash_balance = cash;
    acc.updated_at = now;
    Ok(())
}

/// Fills a pending buy order at `price` (which is at or below its limit).
/// The full reservation is released; the part not spent goes back to cash.
pub fn fill_buy_order(acc: &mut Account, order: &Order, price: Decimal, now: i64) -> Result<(), EngineError> {
    let held = order_reservation(order)?;
    let cost = notional(price, order.quantity)?;
    if held > acc.reserved_balance {
        return Err(EngineError::InvalidState(format!(
            "reserved balance {} does not cover order {} ({held})",
            acc.reserved_balance, order.id
        )));
    }
    if cost > held {
        return Err(EngineError::InvalidState(format!(
            "fill at {price} exceeds limit {} of order {}",
            order.limit_price, order.id
        )));
    }

    let cash = credit(acc.cash_balance, held - cost, "cash balance")?;
    add_lot(acc, &order.symbol, &order.display_name, order.quantity, price)?;
    acc.reserved_balance -= held;
    acc.cash_balance = cash;
    record(acc, Side::Buy, &order.symbol, &order.display_name, order.quantity, price, now);
    Ok(())
}

/// Immediate buy at `price`, paid from cash.
pub fn buy_at_market(
    acc: &mut Account,
    symbol: &str,
    name: &str,
    qty: i64,
    price: Decimal,
    now: i64,
) -> Result<(), EngineError> {
    let cost = notional(price, qty)?;
    ensure_cash(acc, cost)?;
    add_lot(acc, symbol, name, qty, price)?;
    acc.cash_balance -= cost;
    record(acc, Side::Buy, symbol, name, qty, price, now);
    Ok(())
}

/// Sells `qty` shares at `price`, crediting cash and realized profit against
/// the holding's average cost. Used by both scheduled and immediate sells.
/// Returns the realized profit of this sale.
pub fn sell(
    acc: &mut Account,
    symbol: &str,
    name: &str,
    qty: i64,
    price: Decimal,
    now: i64,
) -> Result<Decimal, EngineError> {
    ensure_shares(acc, symbol, qty)?;
    let avg = acc.holding(symbol).map(|h| h.average_cost).unwrap_or_default();
    let proceeds = notional(price, qty)?;
    let pnl = price
        .checked_sub(avg)
        .and_then(|per_share| per_share.checked_mul(Decimal::from(qty)))
        .ok_or_else(|| overflow("realized profit"))?;
    let cash = credit(acc.cash_balance, proceeds, "cash balance")?;
    let realized = credit(acc.realized_profit, pnl, "realized profit")?;

    remove_shares(acc, symbol, qty)?;
    acc.cash_balance = cash;
    acc.realized_profit = realized;
    record(acc, Side::Sell, symbol, name, qty, price, now);
    Ok(pnl)
}

/// Moves realized profit into spendable cash.
pub fn add_funds(acc: &mut Account, amount: Decimal, now: i64) -> Result<(), EngineError> {
    check_amount("amount", amount)?;
    if amount > acc.realized_profit {
        return Err(EngineError::ExceedsRealizedProfit {
            requested: amount,
            available: acc.realized_profit,
        });
    }
    acc.cash_balance = credit(acc.cash_balance, amount, "cash balance")?;
    acc.realized_profit -= amount;
    acc.updated_at = now;
    Ok(())
}

pub fn withdraw_funds(acc: &mut Account, amount: Decimal, now: i64) -> Result<(), EngineError> {
    check_amount("amount", amount)?;
    if amount > acc.cash_balance {
        return Err(EngineError::ExceedsBalance {
            requested: amount,
            available: acc.cash_balance,
        });
    }
    let withdrawn = credit(acc.total_withdrawn, amount, "total withdrawn")?;
    acc.cash_balance -= amount;
    acc.total_withdrawn = withdrawn;
    acc.updated_at = now;
    Ok(())
}
