//! CoinGecko REST Client
//!
//! Thin plumbing over the three endpoints one scan needs:
//! - `/coins/markets` for the universe ranked by market cap
//! - `/simple/price` for USD spot prices
//! - `/exchanges/{id}/tickers` for observed exchange rates
//!
//! API: https://www.coingecko.com/api/documentation

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CoinId, ExchangePair, MarketDataProvider, MarketError};

/// Public CoinGecko API base URL.
pub const DEFAULT_API_URL: &str = "https://api.coingecko.com/api/v3";

/// Timeout for API calls
const API_TIMEOUT_SECS: u64 = 10;

/// CoinGecko rejects `per_page` above 250
const MAX_PER_PAGE: usize = 250;

const USER_AGENT: &str = concat!("cyclescan/", env!("CARGO_PKG_VERSION"));

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct MarketCoin {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    tickers: Vec<Ticker>,
}

/// One raw ticker. `base`/`target` are exchange symbols ("BTC"); the
/// `coin_id` fields carry the CoinGecko ids ("bitcoin") that line up with
/// the universe, so those win whenever present.
#[derive(Debug, Deserialize)]
struct Ticker {
    base: String,
    target: String,
    last: Option<Decimal>,
    coin_id: Option<String>,
    target_coin_id: Option<String>,
}

impl Ticker {
    fn into_pair(self) -> Option<ExchangePair> {
        let last = self.last?;
        let base = self.coin_id.unwrap_or(self.base).to_lowercase();
        let target = self.target_coin_id.unwrap_or(self.target).to_lowercase();
        Some(ExchangePair { base, target, last })
    }
}

fn flatten_usd_prices(
    raw: HashMap<String, HashMap<String, Decimal>>,
) -> HashMap<CoinId, Decimal> {
    let mut prices = HashMap::with_capacity(raw.len());
    for (coin, quotes) in raw {
        match quotes.get("usd") {
            Some(price) => {
                prices.insert(coin.to_lowercase(), *price);
            }
            None => warn!("No USD quote for coin: {}", coin),
        }
    }
    prices
}

// ============================================
// CLIENT
// ============================================

pub struct CoinGeckoClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Result<Self, MarketError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketError> {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), endpoint);

        let mut request = self.http.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MarketError::Status {
                endpoint: endpoint.to_string(),
                status: response.status(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn ranked_universe(&self, limit: usize) -> Result<Vec<CoinId>, MarketError> {
        let per_page = limit.min(MAX_PER_PAGE);
        let coins: Vec<MarketCoin> = self
            .get(
                "coins/markets",
                &[
                    ("vs_currency", "usd".to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", "1".to_string()),
                ],
            )
            .await?;

        debug!("Fetched {} ranked coins", coins.len());
        Ok(coins
            .into_iter()
            .take(limit)
            .map(|c| c.id.to_lowercase())
            .collect())
    }

    async fn usd_prices(&self, ids: &[CoinId]) -> Result<HashMap<CoinId, Decimal>, MarketError> {
        let raw: HashMap<String, HashMap<String, Decimal>> = self
            .get(
                "simple/price",
                &[
                    ("ids", ids.join(",")),
                    ("vs_currencies", "usd".to_string()),
                ],
            )
            .await?;

        let prices = flatten_usd_prices(raw);
        debug!("Fetched USD prices for {}/{} coins", prices.len(), ids.len());
        Ok(prices)
    }

    async fn exchange_tickers(&self, exchange: &str) -> Result<Vec<ExchangePair>, MarketError> {
        let response: TickerResponse = self
            .get(&format!("exchanges/{}/tickers", exchange), &[])
            .await?;

        let total = response.tickers.len();
        let pairs: Vec<ExchangePair> = response
            .tickers
            .into_iter()
            .filter_map(Ticker::into_pair)
            .collect();
        if pairs.len() < total {
            debug!("Dropped {} tickers without a last rate", total - pairs.len());
        }
        Ok(pairs)
    }
}
