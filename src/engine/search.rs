//! Bounded Cycle Search
//!
//! Depth-bounded walk of the rate graph from a base coin, looking for closed
//! routes whose compounded conversion rate exceeds 1. Driven by an explicit
//! frame stack with copy-on-extend paths, so there is no recursion and no
//! shared mutable visited set to unwind.

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::trace;

use super::graph::RateGraph;
use crate::market::CoinId;

/// Fewest distinct coins a route must hold before it may close back to the
/// start. Three coins means two traversed edges, so the smallest reportable
/// cycle is three hops counting the closing edge. This also rules out the
/// trivial A→B→A bounce.
pub const MIN_PATH_LENGTH: usize = 3;

/// A profitable closed route, as returned to callers.
///
/// `path` includes the repeated start coin at the end, so the smallest
/// possible value holds four entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageOpportunity {
    pub path: Vec<CoinId>,
    pub profit_percentage: Decimal,
}

impl ArbitrageOpportunity {
    /// Number of conversions performed, counting the closing edge.
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn route(&self) -> String {
        self.path.join(" → ")
    }
}

/// One pending branch of the search.
struct Frame {
    node: NodeIndex,
    accumulated_rate: Decimal,
    /// Open path so far, ending at `node`. Owned per frame; extending a
    /// branch copies it instead of mutating a shared one.
    path: Vec<NodeIndex>,
}

/// Bounded depth-first cycle search over a [`RateGraph`].
pub struct CycleFinder<'a> {
    graph: &'a RateGraph,
    /// Maximum distinct coins in a route. The closing hop back to the start
    /// comes on top, so a reported path holds at most `max_path_length + 1`
    /// entries.
    max_path_length: usize,
}

impl<'a> CycleFinder<'a> {
    pub fn new(graph: &'a RateGraph, max_path_length: usize) -> Self {
        Self {
            graph,
            max_path_length,
        }
    }

    /// Find every profitable cycle that starts and ends at `start`.
    ///
    /// Output order follows the deterministic traversal of the graph, not
    /// profitability; an empty result just means no arbitrage exists in this
    /// snapshot. An unknown or isolated start coin yields an empty result.
    pub fn find_cycles(&self, start: &str) -> Vec<ArbitrageOpportunity> {
        let mut opportunities = Vec::new();

        let Some(start_node) = self.graph.node_index(start) else {
            return opportunities;
        };

        let mut stack = vec![Frame {
            node: start_node,
            accumulated_rate: Decimal::ONE,
            path: vec![start_node],
        }];

        while let Some(frame) = stack.pop() {
            for edge in self.graph.graph.edges(frame.node) {
                let next = edge.target();
                // A product the decimal type cannot represent abandons the
                // branch rather than reporting a bogus rate.
                let Some(rate) = frame.accumulated_rate.checked_mul(edge.weight().rate) else {
                    continue;
                };

                if next == start_node {
                    // Closing terminates the branch either way; only a
                    // compounded rate above 1 is worth reporting.
                    if frame.path.len() >= MIN_PATH_LENGTH && rate > Decimal::ONE {
                        opportunities.push(self.close_cycle(&frame.path, rate));
                    }
                } else if frame.path.len() < self.max_path_length && !frame.path.contains(&next) {
                    let mut path = frame.path.clone();
                    path.push(next);
                    stack.push(Frame {
                        node: next,
                        accumulated_rate: rate,
                        path,
                    });
                }
            }
        }

        trace!(
            "{} profitable cycles from {} (max {} coins per route)",
            opportunities.len(),
            start,
            self.max_path_length
        );
        opportunities
    }

    fn close_cycle(&self, open_path: &[NodeIndex], rate: Decimal) -> ArbitrageOpportunity {
        let mut path: Vec<CoinId> = open_path
            .iter()
            .filter_map(|&node| self.graph.coin_id(node))
            .map(str::to_string)
            .collect();
        if let Some(start) = path.first().cloned() {
            path.push(start);
        }

        ArbitrageOpportunity {
            path,
            profit_percentage: (rate - Decimal::ONE) * Decimal::ONE_HUNDRED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::ExchangePair;
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, HashSet};

    fn ids(coins: &[&str]) -> Vec<CoinId> {
        coins.iter().map(|c| c.to_string()).collect()
    }

    fn pair(base: &str, target: &str, last: Decimal) -> ExchangePair {
        ExchangePair {
            base: base.to_string(),
            target: target.to_string(),
            last,
        }
    }

    /// Graph with only the listed market edges (plus their reciprocals).
    fn market_graph(universe: &[&str], pairs: &[ExchangePair]) -> RateGraph {
        RateGraph::build(&ids(universe), &HashMap::new(), pairs, &HashSet::new())
    }

    #[test]
    fn losing_direction_of_a_triangle_is_not_reported() {
        // Forward: 2 × 3 × (1/7) = 6/7 < 1, so that direction stays quiet.
        // The reciprocal edges make the reverse direction compound to about
        // 7/6, which is a legitimate find.
        let graph = market_graph(
            &["alpha", "beta", "gamma"],
            &[
                pair("alpha", "beta", dec!(2)),
                pair("beta", "gamma", dec!(3)),
                pair("gamma", "alpha", Decimal::ONE / dec!(7)),
            ],
        );

        let finder = CycleFinder::new(&graph, 4);
        let found = finder.find_cycles("alpha");

        assert!(found
            .iter()
            .all(|o| o.path != ids(&["alpha", "beta", "gamma", "alpha"])));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, ids(&["alpha", "gamma", "beta", "alpha"]));
        assert!(found[0].profit_percentage > Decimal::ZERO);
    }

    #[test]
    fn profitable_triangle_reports_twenty_percent() {
        // 2 × 3 × 0.2 = 1.2
        let graph = market_graph(
            &["alpha", "beta", "gamma"],
            &[
                pair("alpha", "beta", dec!(2)),
                pair("beta", "gamma", dec!(3)),
                pair("gamma", "alpha", dec!(0.2)),
            ],
        );

        let finder = CycleFinder::new(&graph, 4);
        let found = finder.find_cycles("alpha");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, ids(&["alpha", "beta", "gamma", "alpha"]));
        assert_eq!(found[0].profit_percentage, dec!(20));
        assert_eq!(found[0].hop_count(), 3);
    }

    #[test]
    fn bound_of_three_excludes_four_hop_cycles() {
        // Ring of four coins, profitable only all the way around:
        // 2 × 3 × 4 × 0.05 = 1.2
        let ring = [
            pair("alpha", "beta", dec!(2)),
            pair("beta", "gamma", dec!(3)),
            pair("gamma", "delta", dec!(4)),
            pair("delta", "alpha", dec!(0.05)),
        ];
        let universe = ["alpha", "beta", "gamma", "delta"];

        let graph = market_graph(&universe, &ring);
        assert!(CycleFinder::new(&graph, 3).find_cycles("alpha").is_empty());

        let found = CycleFinder::new(&graph, 4).find_cycles("alpha");
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].path,
            ids(&["alpha", "beta", "gamma", "delta", "alpha"])
        );
        assert_eq!(found[0].profit_percentage, dec!(20));
    }

    #[test]
    fn no_interior_node_repeats_and_bound_is_respected() {
        // Dense synthetic mesh; decimal rounding of the cross-rates makes a
        // few marginal cycles close slightly above 1, which is exactly what
        // the structural invariants must hold up against.
        let universe = ids(&["a", "b", "c", "d", "e"]);
        let mut prices = HashMap::new();
        prices.insert("a".to_string(), dec!(1));
        prices.insert("b".to_string(), dec!(3));
        prices.insert("c".to_string(), dec!(7));
        prices.insert("d".to_string(), dec!(11));
        prices.insert("e".to_string(), dec!(13));
        let graph = RateGraph::build(&universe, &prices, &[], &HashSet::new());

        let max_path_length = 4;
        let finder = CycleFinder::new(&graph, max_path_length);
        for opp in finder.find_cycles("a") {
            assert!(opp.path.len() <= max_path_length + 1);
            assert!(opp.path.len() >= 4);
            assert_eq!(opp.path.first(), opp.path.last());
            assert!(opp.profit_percentage > Decimal::ZERO);

            let interior = &opp.path[1..opp.path.len() - 1];
            let unique: HashSet<_> = interior.iter().collect();
            assert_eq!(unique.len(), interior.len());
            assert!(!interior.contains(&"a".to_string()));
        }
    }

    #[test]
    fn two_node_bounce_is_never_a_cycle() {
        let graph = market_graph(&["alpha", "beta"], &[pair("alpha", "beta", dec!(2))]);
        let finder = CycleFinder::new(&graph, 4);
        assert!(finder.find_cycles("alpha").is_empty());
    }

    #[test]
    fn unknown_start_coin_yields_empty_result() {
        let graph = market_graph(&["alpha", "beta"], &[pair("alpha", "beta", dec!(2))]);
        let finder = CycleFinder::new(&graph, 4);
        assert!(finder.find_cycles("nothere").is_empty());
    }

    #[test]
    fn isolated_start_coin_yields_empty_result() {
        let graph = market_graph(
            &["alpha", "beta", "gamma"],
            &[pair("beta", "gamma", dec!(2))],
        );
        let finder = CycleFinder::new(&graph, 4);
        assert!(finder.find_cycles("alpha").is_empty());
    }
}
