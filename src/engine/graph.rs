//! Rate Graph Construction
//!
//! Turns a coin universe, a USD price map and the observed exchange tickers
//! into a directed conversion-rate graph. Observed market rates are inserted
//! first; synthetic USD cross-rates only fill directions no ticker covered.

use petgraph::graph::{DiGraph, NodeIndex};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::market::{CoinId, ExchangePair};

/// Where a conversion rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// Last traded rate of a real ticker on the configured exchange.
    Market,
    /// Derived from the USD prices of both coins.
    Synthetic,
}

/// Edge data in the rate graph.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Units of the target coin obtained per one unit of the source coin.
    /// Always strictly positive.
    pub rate: Decimal,
    pub source: RateSource,
}

/// Directed conversion-rate graph over a coin universe.
///
/// Built once per detection request and never mutated afterwards. Only coins
/// of the universe become nodes; a ticker whose other side is unknown to the
/// universe contributes nothing.
pub struct RateGraph {
    pub graph: DiGraph<CoinId, EdgeData>,
    coin_to_node: HashMap<CoinId, NodeIndex>,
}

impl RateGraph {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            coin_to_node: HashMap::new(),
        }
    }

    /// Build the graph for one detection request.
    ///
    /// `stables` is the configured reference-asset list: a ticker is admitted
    /// when one side is a reference asset and the other belongs to the
    /// universe, or when both sides belong to the universe. Missing prices or
    /// unusable tickers never fail the build, they just mean fewer edges.
    pub fn build(
        universe: &[CoinId],
        usd_prices: &HashMap<CoinId, Decimal>,
        pairs: &[ExchangePair],
        stables: &HashSet<CoinId>,
    ) -> Self {
        let mut graph = Self::new();

        for coin in universe {
            graph.get_or_create_node(coin);
        }

        let mut skipped_tickers = 0;
        for pair in pairs {
            if !graph.add_market_pair(pair, stables) {
                skipped_tickers += 1;
            }
        }
        let market_edges = graph.edge_count();

        graph.add_synthetic_rates(universe, usd_prices);

        info!(
            "Rate graph built: {} nodes, {} edges ({} market, {} synthetic)",
            graph.node_count(),
            graph.edge_count(),
            market_edges,
            graph.edge_count() - market_edges,
        );
        if skipped_tickers > 0 {
            debug!("Skipped {} tickers (irrelevant or non-positive rate)", skipped_tickers);
        }

        graph
    }

    /// Add both directions of an observed ticker. Returns false if the ticker
    /// was not usable.
    fn add_market_pair(&mut self, pair: &ExchangePair, stables: &HashSet<CoinId>) -> bool {
        if pair.last <= Decimal::ZERO {
            return false;
        }

        let base = pair.base.to_lowercase();
        let target = pair.target.to_lowercase();
        if base == target {
            return false;
        }

        let base_node = self.coin_to_node.get(&base).copied();
        let target_node = self.coin_to_node.get(&target).copied();

        let relevant = (stables.contains(&base) && target_node.is_some())
            || (base_node.is_some() && stables.contains(&target))
            || (base_node.is_some() && target_node.is_some());
        if !relevant {
            return false;
        }

        // Both endpoints must be graph nodes for the edge to exist at all.
        let (Some(from), Some(to)) = (base_node, target_node) else {
            return false;
        };

        self.insert_rate(from, to, pair.last, RateSource::Market)
    }

    /// Fill every still-unconnected pair of priced coins with the USD
    /// cross-rate approximation.
    fn add_synthetic_rates(&mut self, universe: &[CoinId], usd_prices: &HashMap<CoinId, Decimal>) {
        for (i, from_coin) in universe.iter().enumerate() {
            for to_coin in &universe[i + 1..] {
                let (Some(&from), Some(&to)) = (
                    self.coin_to_node.get(from_coin),
                    self.coin_to_node.get(to_coin),
                ) else {
                    continue;
                };

                // Market rates take precedence; connectivity is symmetric, so
                // checking one direction is enough.
                if self.graph.find_edge(from, to).is_some() {
                    continue;
                }

                let (Some(from_price), Some(to_price)) =
                    (usd_prices.get(from_coin), usd_prices.get(to_coin))
                else {
                    continue;
                };
                if *from_price <= Decimal::ZERO || *to_price <= Decimal::ZERO {
                    continue;
                }

                let Some(rate) = from_price.checked_div(*to_price) else {
                    continue;
                };
                self.insert_rate(from, to, rate, RateSource::Synthetic);
            }
        }
    }

    /// Insert `from→to` at `rate` and `to→from` at the exact reciprocal in
    /// one operation, skipping any direction that already has an edge.
    fn insert_rate(&mut self, from: NodeIndex, to: NodeIndex, rate: Decimal, source: RateSource) -> bool {
        if rate <= Decimal::ZERO {
            return false;
        }
        let Some(inverse) = Decimal::ONE.checked_div(rate) else {
            return false;
        };

        let mut inserted = false;
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, EdgeData { rate, source });
            inserted = true;
        }
        if self.graph.find_edge(to, from).is_none() {
            self.graph.add_edge(to, from, EdgeData { rate: inverse, source });
            inserted = true;
        }
        inserted
    }

    fn get_or_create_node(&mut self, coin: &CoinId) -> NodeIndex {
        if let Some(&node) = self.coin_to_node.get(coin) {
            return node;
        }
        let node = self.graph.add_node(coin.clone());
        self.coin_to_node.insert(coin.clone(), node);
        node
    }

    pub fn node_index(&self, coin: &str) -> Option<NodeIndex> {
        self.coin_to_node.get(coin).copied()
    }

    pub fn coin_id(&self, node: NodeIndex) -> Option<&str> {
        self.graph.node_weight(node).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the directed edge between two coins, if any.
    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeData> {
        let from = self.node_index(from)?;
        let to = self.node_index(to)?;
        let edge = self.graph.find_edge(from, to)?;
        self.graph.edge_weight(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ids(coins: &[&str]) -> Vec<CoinId> {
        coins.iter().map(|c| c.to_string()).collect()
    }

    fn stables(coins: &[&str]) -> HashSet<CoinId> {
        coins.iter().map(|c| c.to_string()).collect()
    }

    fn pair(base: &str, target: &str, last: Decimal) -> ExchangePair {
        ExchangePair {
            base: base.to_string(),
            target: target.to_string(),
            last,
        }
    }

    #[test]
    fn market_pair_adds_exact_reciprocal() {
        let universe = ids(&["tether", "bitcoin"]);
        let graph = RateGraph::build(
            &universe,
            &HashMap::new(),
            &[pair("tether", "bitcoin", dec!(0.00002))],
            &stables(&["tether"]),
        );

        let forward = graph.edge("tether", "bitcoin").unwrap();
        let back = graph.edge("bitcoin", "tether").unwrap();
        assert_eq!(forward.rate, dec!(0.00002));
        assert_eq!(forward.source, RateSource::Market);
        assert_eq!(back.rate, Decimal::ONE / forward.rate);
    }

    #[test]
    fn non_positive_ticker_rates_are_excluded() {
        let universe = ids(&["tether", "bitcoin"]);
        let graph = RateGraph::build(
            &universe,
            &HashMap::new(),
            &[
                pair("tether", "bitcoin", Decimal::ZERO),
                pair("bitcoin", "tether", dec!(-3)),
            ],
            &stables(&["tether"]),
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn ticker_with_unknown_side_contributes_nothing() {
        let universe = ids(&["bitcoin"]);
        let graph = RateGraph::build(
            &universe,
            &HashMap::new(),
            &[pair("obscurecoin", "bitcoin", dec!(2))],
            &stables(&["tether"]),
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn synthetic_rates_fill_unconnected_priced_pairs() {
        let universe = ids(&["bitcoin", "ethereum"]);
        let mut prices = HashMap::new();
        prices.insert("bitcoin".to_string(), dec!(60000));
        prices.insert("ethereum".to_string(), dec!(3000));

        let graph = RateGraph::build(&universe, &prices, &[], &stables(&["tether"]));

        let forward = graph.edge("bitcoin", "ethereum").unwrap();
        let back = graph.edge("ethereum", "bitcoin").unwrap();
        assert_eq!(forward.rate, dec!(20));
        assert_eq!(forward.source, RateSource::Synthetic);
        assert_eq!(back.rate, Decimal::ONE / forward.rate);
    }

    #[test]
    fn market_rate_takes_precedence_over_synthetic() {
        let universe = ids(&["bitcoin", "ethereum"]);
        let mut prices = HashMap::new();
        prices.insert("bitcoin".to_string(), dec!(60000));
        prices.insert("ethereum".to_string(), dec!(3000));

        // The observed ticker disagrees with the price ratio; it must win.
        let graph = RateGraph::build(
            &universe,
            &prices,
            &[pair("bitcoin", "ethereum", dec!(19.5))],
            &stables(&["tether"]),
        );

        let forward = graph.edge("bitcoin", "ethereum").unwrap();
        assert_eq!(forward.rate, dec!(19.5));
        assert_eq!(forward.source, RateSource::Market);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn unpriced_coins_stay_isolated() {
        let universe = ids(&["bitcoin", "ethereum", "mysterycoin"]);
        let mut prices = HashMap::new();
        prices.insert("bitcoin".to_string(), dec!(60000));
        prices.insert("ethereum".to_string(), dec!(3000));

        let graph = RateGraph::build(&universe, &prices, &[], &stables(&["tether"]));

        assert_eq!(graph.node_count(), 3);
        let isolated = graph.node_index("mysterycoin").unwrap();
        assert_eq!(graph.graph.edges(isolated).count(), 0);
    }

    #[test]
    fn ticker_sides_are_case_normalized() {
        let universe = ids(&["tether", "bitcoin"]);
        let graph = RateGraph::build(
            &universe,
            &HashMap::new(),
            &[pair("TETHER", "Bitcoin", dec!(0.00002))],
            &stables(&["tether"]),
        );
        assert!(graph.edge("tether", "bitcoin").is_some());
    }

    #[test]
    fn duplicate_tickers_keep_the_first_rate() {
        let universe = ids(&["tether", "bitcoin"]);
        let graph = RateGraph::build(
            &universe,
            &HashMap::new(),
            &[
                pair("tether", "bitcoin", dec!(0.00002)),
                pair("tether", "bitcoin", dec!(0.00003)),
            ],
            &stables(&["tether"]),
        );
        assert_eq!(graph.edge("tether", "bitcoin").unwrap().rate, dec!(0.00002));
        assert_eq!(graph.edge_count(), 2);
    }
}
