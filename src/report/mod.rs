//! Assembly of the report tree from the final buckets.
pub mod model;

pub use model::{HoldingLine, ReportKey, ReportModel, ReportNode, StaleHolding, Unresolved};

use crate::aggregate::{AggregationKey, Bucket, Dimension};
use smallvec::SmallVec;

/// Converts the bucket tree into report nodes, keeping bucket order.
pub fn assemble(root: Bucket, dimensions: &[Dimension], unresolved: Vec<Unresolved>, stale: Vec<StaleHolding>) -> ReportModel {
    let Bucket { value, total, children, holdings, .. } = root;
    let root = ReportNode {
        key: ReportKey::Total,
        dimension: None,
        label: value,
        subtotal: total.unwrap_or_default(),
        children: children
            .into_iter()
            .map(|child| to_node(child, dimensions, &SmallVec::new()))
            .collect(),
        holdings,
    };
    ReportModel { dimensions: dimensions.to_vec(), root, unresolved, stale }
}

fn to_node(bucket: Bucket, dimensions: &[Dimension], parent: &SmallVec<[String; 4]>) -> ReportNode {
    let Bucket { value, total, children, holdings, .. } = bucket;
    let mut path = parent.clone();
    path.push(value.clone());

    ReportNode {
        dimension: dimensions.get(path.len() - 1).copied(),
        children: children.into_iter().map(|c| to_node(c, dimensions, &path)).collect(),
        key: ReportKey::Group(AggregationKey(path)),
        label: value,
        // Buckets only exist once a holding was added to them.
        subtotal: total.unwrap_or_default(),
        holdings,
    }
}
