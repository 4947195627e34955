//! Quote source abstraction and the pacing gate placed in front of it.
//!
//! The matching cycle and the direct trading paths only ever see
//! `Arc<dyn QuoteSource>`. Production wires `PacedQuotes<FinnhubClient>`;
//! tests inject a zero-latency fake.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};

#[derive(Debug, Clone, thiserror::Error)]
pub enum QuoteError {
    #[error("no usable price for {0}")]
    Unavailable(String),

    #[error("quote request for {0} timed out")]
    Timeout(String),

    #[error("quote request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn price(&self, symbol: &str) -> Result<Decimal, QuoteError>;
}

/// Converts a raw upstream price into a ledger amount. Zero, negative and
/// non-finite prices mean the upstream has nothing for the symbol.
pub fn usable_price(raw: f64) -> Option<Decimal> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Decimal::from_f64(raw).map(|d| d.round_dp(4)).filter(|d| *d > Decimal::ZERO)
}

/// Fixed-interval gate plus per-call timeout.
///
/// Callers reserve the next free slot under a short lock and sleep outside it,
/// so concurrent callers are spaced `min_interval` apart without serializing
/// on the upstream request itself.
pub struct PacedQuotes<Q> {
    inner: Q,
    min_interval: Duration,
    timeout: Duration,
    next_slot: Mutex<Instant>,
}

impl<Q: QuoteSource> PacedQuotes<Q> {
    pub fn new(inner: Q, min_interval: Duration, timeout: Duration) -> Self {
        Self {
            inner,
            min_interval,
            timeout,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    async fn reserve_slot(&self) -> Instant {
        let mut next = self.next_slot.lock().await;
        let slot = (*next).max(Instant::now());
        *next = slot + self.min_interval;
        slot
    }
}

#[async_trait]
impl<Q: QuoteSource> QuoteSource for PacedQuotes<Q> {
    async fn price(&self, symbol: &str) -> Result<Decimal, QuoteError> {
        let slot = self.reserve_slot().await;
        time::sleep_until(slot).await;

        match time::timeout(self.timeout, self.inner.price(symbol)).await {
            Ok(res) => res,
            Err(_) => Err(QuoteError::Timeout(symbol.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    struct Fixed(Decimal);

    #[async_trait]
    impl QuoteSource for Fixed {
        async fn price(&self, _symbol: &str) -> Result<Decimal, QuoteError> {
            Ok(self.0)
        }
    }

    struct Stalls;

    #[async_trait]
    impl QuoteSource for Stalls {
        async fn price(&self, _symbol: &str) -> Result<Decimal, QuoteError> {
            time::sleep(Duration::from_secs(3600)).await;
            Ok(Decimal::ONE)
        }
    }

    #[test]
    fn usable_price_rejects_empty_quotes() {
        assert_eq!(usable_price(0.0), None);
        assert_eq!(usable_price(-3.5), None);
        assert_eq!(usable_price(f64::NAN), None);
        assert_eq!(usable_price(48.0), Some(Decimal::from(48)));
        assert_eq!(usable_price(187.12345678).map(|d| d.to_string()), Some("187.1235".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_spaced_by_min_interval() {
        let paced = Arc::new(PacedQuotes::new(
            Fixed(Decimal::TEN),
            Duration::from_millis(500),
            Duration::from_secs(5),
        ));
        let start = Instant::now();

        let mut handles = vec![];
        for _ in 0..3 {
            let p = paced.clone();
            handles.push(tokio::spawn(async move {
                p.price("AAPL").await.unwrap();
                Instant::now()
            }));
        }
        let mut done: Vec<Duration> = vec![];
        for h in handles {
            done.push(h.await.unwrap() - start);
        }
        done.sort();

        assert!(done[0] < Duration::from_millis(500));
        assert!(done[1] >= Duration::from_millis(500));
        assert!(done[2] >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_upstream_times_out() {
        let paced = PacedQuotes::new(Stalls, Duration::ZERO, Duration::from_millis(250));
        let err = paced.price("MSFT").await.unwrap_err();
        assert!(matches!(err, QuoteError::Timeout(s) if s == "MSFT"));
    }
}
