//! Opportunity Ranking
//!
//! Orders discovered cycles by profit and keeps only the best few.

use super::search::ArbitrageOpportunity;

/// Sort descending by profit percentage and truncate to `top_n`.
///
/// The sort is stable, so equally profitable cycles keep their discovery
/// order.
pub fn rank(
    mut opportunities: Vec<ArbitrageOpportunity>,
    top_n: usize,
) -> Vec<ArbitrageOpportunity> {
    opportunities.sort_by(|a, b| b.profit_percentage.cmp(&a.profit_percentage));
    opportunities.truncate(top_n);
    opportunities
}
