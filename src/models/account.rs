use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub average_cost: Decimal,
}

impl Holding {
    /// Saturates instead of panicking; the ledger rejects lots whose basis does not fit.
    pub fn cost_basis(&self) -> Decimal {
        self.average_cost.saturating_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: Side,
    pub symbol: String,
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    // use user id as primary key
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub name: String,

    pub cash_balance: Decimal,
    pub reserved_balance: Decimal,

    #[serde(default)]
    pub holdings: Vec<Holding>,

    pub realized_profit: Decimal,
    pub total_withdrawn: Decimal,

    #[serde(default)]
    pub transactions: Vec<Transaction>,

    // bumped by the store on every committed write
    #[serde(default)]
    pub version: i64,
    pub updated_at: i64,
}

impl Account {
    pub fn new(id: ObjectId, name: impl Into<String>, starting_balance: Decimal, now: i64) -> Self {
        Self {
            id,
            name: name.into(),
            cash_balance: starting_balance,
            reserved_balance: Decimal::ZERO,
            holdings: vec![],
            realized_profit: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            transactions: vec![],
            version: 0,
            updated_at: now,
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }

    pub fn held_quantity(&self, symbol: &str) -> i64 {
        self.holding(symbol).map(|h| h.quantity).unwrap_or(0)
    }

    /// Cash plus holdings valued at cost basis. Reserved funds are not counted.
    pub fn net_worth(&self) -> Decimal {
        self.holdings
            .iter()
            .map(Holding::cost_basis)
            .fold(self.cash_balance, Decimal::saturating_add)
    }

    /// Everything the account owns at book value, reserved funds included.
    pub fn book_value(&self) -> Decimal {
        self.net_worth().saturating_add(self.reserved_balance)
    }
}
