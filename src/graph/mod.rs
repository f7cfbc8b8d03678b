//! Construction of the holding graph and reference lookup.
pub mod builder;
pub mod error;
pub mod expr;
pub mod scope;

pub use builder::{build_registry, GraphBuilder};
pub use error::{BuildError, BuildErrors};
pub use scope::{Scope, ScopeChain};
