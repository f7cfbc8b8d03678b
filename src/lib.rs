//! Net worth summary engine.
//!
//! Builds a graph of holdings from a validated tree, resolves every holding's
//! value (literal or formula over other holdings), and rolls the results up
//! into a report tree grouped by institution, account, category or owner.

pub mod aggregate;
pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod graph;
pub mod pipeline;
pub mod report;
pub mod store;

pub use aggregate::{AggregationEngine, AggregationKey, Dimension};
pub use compute::{Evaluator, Quantity, QuantityError, RateEntry, RateTable, ResolutionError, ResolutionErrorKind};
pub use config::SummaryConfig;
pub use graph::{build_registry, BuildError, BuildErrors};
pub use report::{ReportModel, ReportNode, StaleHolding, Unresolved};

use serde_json::Value;

/// Builds the holding graph, resolves every holding and aggregates by `dimensions`.
///
/// Structural problems abort with the whole batch of errors. Per-holding
/// failures do not: they are listed in the report and returned alongside it as
/// `(qualified holding name, error)` pairs.
pub fn build_and_aggregate(
    tree: &Value,
    dimensions: &[Dimension],
    rates: &RateTable,
) -> Result<(ReportModel, Vec<(String, ResolutionError)>), BuildErrors> {
    summarize_tree(tree, AggregationEngine::new(dimensions, None), rates)
}

/// As [`build_and_aggregate`], with grouping, rates, base unit and the
/// staleness check taken from `config`.
pub fn build_and_aggregate_with(
    tree: &Value,
    config: &SummaryConfig,
) -> Result<(ReportModel, Vec<(String, ResolutionError)>), BuildErrors> {
    let mut engine = AggregationEngine::new(&config.grouping, config.base_unit.clone());
    if let Some(staleness) = config.staleness() {
        engine = engine.with_staleness(staleness);
    }
    summarize_tree(tree, engine, &config.rate_table())
}

fn summarize_tree(
    tree: &Value,
    engine: AggregationEngine<'_>,
    rates: &RateTable,
) -> Result<(ReportModel, Vec<(String, ResolutionError)>), BuildErrors> {
    let registry = build_registry(tree)?;
    let mut evaluator = Evaluator::new(&registry, rates);
    let report = engine.aggregate(&mut evaluator);

    let failures = report
        .unresolved
        .iter()
        .map(|u| (u.holding.clone(), u.error.clone()))
        .collect();
    Ok((report, failures))
}
