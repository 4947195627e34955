use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quotes::{usable_price, QuoteError, QuoteSource};

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://finnhub.io/api/v1")
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::Request("FINNHUB_API_KEY is missing in .env".to_string()));
        }

        let url = format!("{}/quote", self.base_url);
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("token", &self.api_key)])
            .send()
            .await
            .map_err(|e| QuoteError::Request(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Request(format!("Finnhub quote failed: {status} {body}")));
        }

        res.json::<QuoteResponse>()
            .await
            .map_err(|e| QuoteError::Request(e.to_string()))
    }
}

#[async_trait]
impl QuoteSource for FinnhubClient {
    async fn price(&self, symbol: &str) -> Result<Decimal, QuoteError> {
        let q = self.quote(symbol).await?;
        usable_price(q.c).ok_or_else(|| QuoteError::Unavailable(symbol.to_string()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // change
    #[serde(default)]
    pub d: Option<f64>,
    // percent change
    #[serde(default)]
    pub dp: Option<f64>,
    // previous close
    #[serde(default)]
    pub pc: f64,
    // timestamp
    #[serde(default)]
    pub t: i64,
}
