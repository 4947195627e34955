use std::fmt;

use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Executed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Executed => "executed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Executed) | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("order cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner_id: ObjectId,
    pub symbol: String,
    pub display_name: String,
    pub side: Side,
    pub quantity: i64,
    pub limit_price: Decimal,
    pub status: OrderStatus,
    pub created_at: i64,
    #[serde(default)]
    pub executed_at: Option<i64>,
}

impl Order {
    /// Funds held against this order while it is pending. Zero for sells,
    /// `None` when limit × quantity does not fit in a `Decimal`.
    pub fn reservation(&self) -> Option<Decimal> {
        match self.side {
            Side::Buy => self.limit_price.checked_mul(Decimal::from(self.quantity)),
            Side::Sell => Some(Decimal::ZERO),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Applies a status change if the transition table allows it and returns the previous status.
    pub fn transition(&mut self, next: OrderStatus, now: i64) -> Result<OrderStatus, InvalidTransition> {
        let from = self.status;
        if !from.can_transition_to(next) {
            return Err(InvalidTransition { from, to: next });
        }
        self.status = next;
        if next == OrderStatus::Executed {
            self.executed_at = Some(now);
        }
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(side: Side) -> Order {
        Order {
            id: ObjectId::new(),
            owner_id: ObjectId::new(),
            symbol: "AAPL".into(),
            display_name: "Apple".into(),
            side,
            quantity: 10,
            limit_price: Decimal::from(50),
            status: OrderStatus::Pending,
            created_at: 0,
            executed_at: None,
        }
    }

    #[test]
    fn pending_moves_to_either_terminal_state() {
        let mut o = pending(Side::Buy);
        assert_eq!(o.transition(OrderStatus::Executed, 42), Ok(OrderStatus::Pending));
        assert_eq!(o.executed_at, Some(42));

        let mut o = pending(Side::Sell);
        assert_eq!(o.transition(OrderStatus::Cancelled, 42), Ok(OrderStatus::Pending));
        assert_eq!(o.executed_at, None);
    }

    #[test]
    fn terminal_states_reject_every_transition() {
        use OrderStatus::*;
        for terminal in [Executed, Cancelled] {
            for next in [Pending, Executed, Cancelled] {
                let mut o = pending(Side::Buy);
                o.status = terminal;
                let err = o.transition(next, 1).unwrap_err();
                assert_eq!(err, InvalidTransition { from: terminal, to: next });
                assert_eq!(o.status, terminal);
            }
        }
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn only_buys_reserve_funds() {
        assert_eq!(pending(Side::Buy).reservation(), Some(Decimal::from(500)));
        assert_eq!(pending(Side::Sell).reservation(), Some(Decimal::ZERO));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
        assert_eq!(serde_json::from_str::<Side>("\"sell\"").unwrap(), Side::Sell);
    }
}
