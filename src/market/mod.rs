//! Phase 1: Market Data
//!
//! The external market-data collaborator. Supplies the ranked coin universe,
//! USD spot prices and per-exchange tickers that one scan consumes; nothing
//! here is cached or persisted across scans.

mod coingecko;

pub use coingecko::{CoinGeckoClient, DEFAULT_API_URL};

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Lower-cased CoinGecko coin identifier (e.g. "bitcoin").
pub type CoinId = String;

/// One observed ticker on an exchange.
#[derive(Debug, Clone)]
pub struct ExchangePair {
    pub base: CoinId,
    pub target: CoinId,
    /// Units of target last traded per one unit of base.
    pub last: Decimal,
}

/// Failures reaching or decoding the market-data provider. Retry and backoff
/// are the provider's business, not ours; one attempt per call.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market data request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("market data provider returned {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
}

/// Seam to the market-data provider, so the scanner can be exercised with a
/// scripted snapshot in tests.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Coin ids ordered by market capitalization, largest first.
    async fn ranked_universe(&self, limit: usize) -> Result<Vec<CoinId>, MarketError>;

    /// USD spot prices for the given coins. Coins the provider cannot price
    /// are simply absent from the map, never an error.
    async fn usd_prices(&self, ids: &[CoinId]) -> Result<HashMap<CoinId, Decimal>, MarketError>;

    /// All tickers currently listed on the named exchange.
    async fn exchange_tickers(&self, exchange: &str) -> Result<Vec<ExchangePair>, MarketError>;
}
