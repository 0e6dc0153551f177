//! Arbitrage Scanner
//!
//! Orchestrates one detection request: validate the arguments, fetch a
//! point-in-time market snapshot, build the rate graph, search it from the
//! base coin and rank the result. The engine underneath never touches the
//! network; every await lives here.

use futures::try_join;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::{rank, ArbitrageOpportunity, CycleFinder, RateGraph, MIN_PATH_LENGTH};
use crate::market::{CoinId, MarketDataProvider, MarketError};

#[derive(Debug, Error)]
pub enum ScanError {
    /// Rejected before any market data was requested.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The market-data provider could not supply the snapshot.
    #[error("market data unavailable: {0}")]
    DataUnavailable(#[from] MarketError),
}

/// One scanner per provider; each call builds its own graph and holds no
/// state across calls, so concurrent scans for different base coins are fine.
pub struct ArbitrageScanner<P> {
    provider: P,
    config: Config,
}

impl<P: MarketDataProvider> ArbitrageScanner<P> {
    pub fn new(provider: P, config: Config) -> Self {
        Self { provider, config }
    }

    /// Find the top profitable cycles that start and end at `base_coin_id`.
    ///
    /// `max_path_length` caps the distinct coins in a route (the closing hop
    /// back to the start comes on top); anything below [`MIN_PATH_LENGTH`] is
    /// rejected up front. An empty result is a valid outcome meaning no
    /// arbitrage exists in this snapshot.
    pub async fn find_opportunities(
        &self,
        base_coin_id: &str,
        max_path_length: usize,
    ) -> Result<Vec<ArbitrageOpportunity>, ScanError> {
        if max_path_length < MIN_PATH_LENGTH {
            return Err(ScanError::InvalidArgument(format!(
                "max_path_length must be at least {}, got {}",
                MIN_PATH_LENGTH, max_path_length
            )));
        }

        let base = base_coin_id.trim().to_lowercase();
        if base.is_empty() {
            return Err(ScanError::InvalidArgument(
                "base coin id must not be empty".to_string(),
            ));
        }

        let mut universe = self.provider.ranked_universe(self.config.universe_limit).await?;
        if !universe.contains(&base) {
            universe.push(base.clone());
        }

        let (usd_prices, tickers) = try_join!(
            self.provider.usd_prices(&universe),
            self.provider.exchange_tickers(&self.config.exchange),
        )?;

        info!(
            "Snapshot: {} coins, {} priced, {} tickers from {}",
            universe.len(),
            usd_prices.len(),
            tickers.len(),
            self.config.exchange
        );

        let stables: HashSet<CoinId> = self
            .config
            .stablecoins
            .iter()
            .map(|s| s.to_lowercase())
            .collect();

        let graph = RateGraph::build(&universe, &usd_prices, &tickers, &stables);
        let finder = CycleFinder::new(&graph, max_path_length);
        let cycles = finder.find_cycles(&base);
        debug!("{} profitable cycles from {} before ranking", cycles.len(), base);

        Ok(rank(cycles, self.config.top_n))
    }
}
