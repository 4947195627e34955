pub mod quotes;
pub mod finnhub;
pub mod store;
pub mod locks;

pub mod ledger;
pub mod account_service;
pub mod order_service;
pub mod trading_service;
pub mod order_executor;
pub mod leaderboard_service;
