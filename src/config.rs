use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub finnhub_api_key: String,

    pub starting_balance: Decimal,

    // matching cycle
    pub order_executor_interval_secs: u64,
    pub executor_concurrency: usize,

    // quote pacing
    pub quote_min_interval_ms: u64,
    pub quote_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "papermarket".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            finnhub_api_key: String::new(),
            starting_balance: Decimal::from(10_000),
            order_executor_interval_secs: 60,
            executor_concurrency: 8,
            quote_min_interval_ms: 1_000,
            quote_timeout_ms: 5_000,
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let d = Settings::default();

    let store_backend = match env::var("STORE_BACKEND").map(|s| s.to_lowercase()).as_deref() {
        Ok("memory") => StoreBackend::Memory,
        _ => StoreBackend::Mongo,
    };

    Settings {
        store_backend,
        mongodb_uri: env::var("MONGODB_URI").unwrap_or(d.mongodb_uri),
        mongodb_db: env::var("MONGODB_DB").unwrap_or(d.mongodb_db),
        host: env::var("HOST").unwrap_or(d.host),
        port: parsed("PORT").unwrap_or(d.port),
        finnhub_api_key: env::var("FINNHUB_API_KEY").unwrap_or_default(),
        starting_balance: parsed::<Decimal>("STARTING_BALANCE")
            .filter(|b| *b >= Decimal::ZERO)
            .unwrap_or(d.starting_balance),
        order_executor_interval_secs: parsed::<u64>("ORDER_EXECUTOR_INTERVAL_SECS")
            .filter(|s| *s > 0)
            .unwrap_or(d.order_executor_interval_secs),
        executor_concurrency: parsed::<usize>("EXECUTOR_CONCURRENCY")
            .filter(|n| *n > 0)
            .unwrap_or(d.executor_concurrency),
        quote_min_interval_ms: parsed("QUOTE_MIN_INTERVAL_MS").unwrap_or(d.quote_min_interval_ms),
        quote_timeout_ms: parsed::<u64>("QUOTE_TIMEOUT_MS")
            .filter(|ms| *ms > 0)
            .unwrap_or(d.quote_timeout_ms),
    }
}
