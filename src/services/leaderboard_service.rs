use rust_decimal::Decimal;
use serde::Serialize;

use crate::{error::EngineError, models::Account, AppState};

pub const LEADERBOARD_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub net_worth: Decimal,
}

/// Ranks accounts by net worth at cost basis, highest first. Ties keep input order.
pub fn rank(accounts: &[Account], limit: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<LeaderboardEntry> = accounts
        .iter()
        .map(|a| LeaderboardEntry {
            name: a.name.clone(),
            net_worth: a.net_worth(),
        })
        .collect();

    ranked.sort_by(|a, b| b.net_worth.cmp(&a.net_worth));
    ranked.truncate(limit);
    ranked
}

pub async fn leaderboard(state: &AppState) -> Result<Vec<LeaderboardEntry>, EngineError> {
    let accounts = state.store.list_accounts().await?;
    Ok(rank(&accounts, LEADERBOARD_SIZE))
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;
    use crate::models::Holding;

    fn acc(name: &str, cash: i64) -> Account {
        Account::new(ObjectId::new(), name, Decimal::from(cash), 0)
    }

    #[test]
    fn values_holdings_at_cost_and_ignores_reservations() {
        let mut rich = acc("rich", 100);
        rich.holdings.push(Holding {
            symbol: "AAPL".into(),
            name: "Apple".into(),
            quantity: 10,
            average_cost: Decimal::from(50),
        });
        let mut reserved = acc("reserved", 300);
        reserved.reserved_balance = Decimal::from(1_000);

        let board = rank(&[reserved, rich], 20);
        assert_eq!(board[0], LeaderboardEntry { name: "rich".into(), net_worth: Decimal::from(600) });
        assert_eq!(board[1].net_worth, Decimal::from(300));
    }

    #[test]
    fn ties_are_stable_and_list_is_capped() {
        let accounts: Vec<Account> = (0..25).map(|i| acc(&format!("u{i}"), 1_000)).collect();
        let board = rank(&accounts, LEADERBOARD_SIZE);
        assert_eq!(board.len(), 20);
        assert_eq!(board[0].name, "u0");
        assert_eq!(board[19].name, "u19");
    }
}
