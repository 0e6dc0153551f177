//! Phase 2: The Engine
//!
//! Responsible for:
//! - Building the conversion-rate graph from prices and tickers
//! - Walking it for profitable cycles from a base coin
//! - Ranking what it finds
//!
//! Everything in here is synchronous, CPU-bound and free of I/O.

mod graph;
mod rank;
mod search;

pub use graph::{EdgeData, RateGraph, RateSource};
pub use rank::rank;
pub use search::{ArbitrageOpportunity, CycleFinder, MIN_PATH_LENGTH};
