//! Storage for the holding graph.
pub mod registry;
pub mod types;

pub use registry::{Registry, UNCATEGORIZED};
pub use types::{
    Account, AccountId, Expr, HoldingId, HoldingMeta, HoldingValue, Institution, InstitutionId,
    Operation, Reference, Unit,
};
