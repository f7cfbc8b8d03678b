//! Quantity arithmetic and holding resolution.
pub mod engine;
pub mod ledger;
pub mod quantity;
pub mod rates;

pub use engine::Evaluator;
pub use ledger::{HoldingState, Ledger, ResolutionError, ResolutionErrorKind};
pub use quantity::{Quantity, QuantityError};
pub use rates::{RateEntry, RateTable};
