//! The read-only report handed to the renderer.
use crate::aggregate::{AggregationKey, Dimension};
use crate::compute::ledger::ResolutionError;
use crate::compute::quantity::Quantity;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReportKey {
    Total,
    Group(AggregationKey),
}

/// A holding's contribution to its innermost bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldingLine {
    /// Qualified `institution:account:holding` name.
    pub name: String,
    /// The resolved value in its own unit.
    pub value: Quantity,
    /// The value in the unit of the bucket it was summed into.
    pub converted: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportNode {
    pub key: ReportKey,
    /// The dimension this node groups by; `None` for the total.
    pub dimension: Option<Dimension>,
    pub label: String,
    pub subtotal: Quantity,
    pub children: Vec<ReportNode>,
    /// Only filled on the innermost level.
    pub holdings: Vec<HoldingLine>,
}

impl ReportNode {
    pub fn child(&self, label: &str) -> Option<&ReportNode> {
        self.children.iter().find(|c| c.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub holding: String,
    pub error: ResolutionError,
}

/// A holding whose declared value has not been updated for too long.
/// It still counts towards the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleHolding {
    pub holding: String,
    pub updated: NaiveDate,
    pub age_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportModel {
    pub dimensions: Vec<Dimension>,
    pub root: ReportNode,
    /// Holdings excluded from every total, in declaration order.
    pub unresolved: Vec<Unresolved>,
    /// Empty unless an as-of date was given.
    pub stale: Vec<StaleHolding>,
}

impl ReportModel {
    pub fn total(&self) -> &Quantity { &self.root.subtotal }

    /// Follows bucket labels from the total downwards.
    pub fn find(&self, labels: &[&str]) -> Option<&ReportNode> {
        labels.iter().try_fold(&self.root, |node, label| node.child(label))
    }

    /// Every holding line in report order.
    pub fn holdings(&self) -> Vec<&HoldingLine> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.extend(node.holdings.iter());
            stack.extend(node.children.iter().rev());
        }
        out
    }
}
