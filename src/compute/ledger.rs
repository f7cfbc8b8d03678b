//! ledger.rs
//! Per-holding resolution state, written once per holding.

use crate::compute::quantity::{Quantity, QuantityError};
use crate::store::{HoldingId, Unit};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub use self::error::{ResolutionError, ResolutionErrorKind};
mod error {
    use super::*;

    #[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum ResolutionErrorKind {
        #[error("unit mismatch: cannot combine '{left}' with '{right}'")]
        UnitMismatch { left: Unit, right: Unit },
        #[error("cyclic reference: {}", .cycle.join(" -> "))]
        CyclicReference { cycle: Vec<String> },
        #[error("unknown reference '{name}' in '{referenced_by}'")]
        UnknownReference { name: String, referenced_by: String },
        #[error("division by zero")]
        DivisionByZero,
        #[error("arithmetic overflow")]
        Overflow,
        #[error("invalid unit '{unit}'")]
        InvalidUnit { unit: String },
        #[error("no holding with id {id}")]
        UnknownHolding { id: u32 },
    }

    /// Why a holding could not be resolved.
    ///
    /// `chain` lists qualified holding names from `holding` to the holding where
    /// the failure originated, so `A -> B -> C` means A needed B, B needed C, and
    /// C failed with `kind`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ResolutionError {
        pub holding: String,
        pub chain: Vec<String>,
        pub kind: ResolutionErrorKind,
    }

    impl std::error::Error for ResolutionError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.kind)
        }
    }
}

impl ResolutionError {
    /// A failure originating at `holding` itself.
    pub fn at(holding: String, kind: ResolutionErrorKind) -> Self {
        Self { chain: vec![holding.clone()], holding, kind }
    }

    /// Re-attributes a referent's failure to the holding that needed it.
    pub fn via(self, holding: String) -> Self {
        let mut chain = Vec::with_capacity(self.chain.len() + 1);
        chain.push(holding.clone());
        chain.extend(self.chain);
        Self { holding, chain, kind: self.kind }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.holding, self.kind)?;
        if self.chain.len() > 1 {
            write!(f, " (via {})", self.chain.join(" -> "))?;
        }
        Ok(())
    }
}

impl From<QuantityError> for ResolutionErrorKind {
    fn from(e: QuantityError) -> Self {
        match e {
            QuantityError::UnitMismatch { left, right } => ResolutionErrorKind::UnitMismatch { left, right },
            QuantityError::DivisionByZero => ResolutionErrorKind::DivisionByZero,
            QuantityError::Overflow => ResolutionErrorKind::Overflow,
            QuantityError::InvalidUnit(u) => ResolutionErrorKind::InvalidUnit { unit: u.0 },
        }
    }
}

/// `Unvisited -> InProgress -> {Resolved | Failed}`. Terminal states are never left.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HoldingState {
    #[default]
    Unvisited,
    InProgress,
    Resolved(Quantity),
    Failed(ResolutionError),
}

impl HoldingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HoldingState::Resolved(_) | HoldingState::Failed(_))
    }

    pub fn result(&self) -> Option<Result<&Quantity, &ResolutionError>> {
        match self {
            HoldingState::Resolved(q) => Some(Ok(q)),
            HoldingState::Failed(e) => Some(Err(e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    // Dense storage, indexed by HoldingId
    states: Vec<HoldingState>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(size: usize) -> Self {
        Self { states: vec![HoldingState::Unvisited; size] }
    }

    #[inline(always)]
    pub fn state(&self, id: HoldingId) -> &HoldingState {
        static UNVISITED: HoldingState = HoldingState::Unvisited;
        self.states.get(id.index()).unwrap_or(&UNVISITED)
    }

    pub fn get(&self, id: HoldingId) -> Option<Result<&Quantity, &ResolutionError>> {
        self.state(id).result()
    }

    /// Marks a holding as being resolved. Returns false if it already left `Unvisited`.
    pub fn begin(&mut self, id: HoldingId) -> bool {
        let slot = self.slot(id);
        if *slot != HoldingState::Unvisited {
            return false;
        }
        *slot = HoldingState::InProgress;
        true
    }

    /// Records the outcome of an in-progress holding. Terminal states are kept.
    pub fn finish(&mut self, id: HoldingId, result: Result<Quantity, ResolutionError>) {
        let slot = self.slot(id);
        if slot.is_terminal() {
            return;
        }
        *slot = match result {
            Ok(q) => HoldingState::Resolved(q),
            Err(e) => HoldingState::Failed(e),
        };
    }

    fn slot(&mut self, id: HoldingId) -> &mut HoldingState {
        let idx = id.index();
        if idx >= self.states.len() {
            self.states.resize(idx + 1, HoldingState::Unvisited);
        }
        &mut self.states[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_states_are_written_once() {
        let mut ledger = Ledger::with_capacity(2);
        let id = HoldingId(1);
        assert_eq!(ledger.state(id), &HoldingState::Unvisited);

        assert!(ledger.begin(id));
        assert!(!ledger.begin(id));
        ledger.finish(id, Ok(Quantity::new(dec!(1), "USD")));
        ledger.finish(id, Ok(Quantity::new(dec!(2), "USD")));
        assert_eq!(ledger.get(id), Some(Ok(&Quantity::new(dec!(1), "USD"))));
        assert!(!ledger.begin(id));

        // Out-of-range ids read as unvisited.
        assert_eq!(ledger.state(HoldingId(7)), &HoldingState::Unvisited);
    }

    #[test]
    fn test_error_chain_display() {
        let origin = ResolutionError::at(
            "Bank:A:C".into(),
            ResolutionErrorKind::UnknownReference { name: "Nope".into(), referenced_by: "Bank:A:C".into() },
        );
        let err = origin.via("Bank:A:B".into());
        assert_eq!(err.chain, vec!["Bank:A:B", "Bank:A:C"]);
        assert_eq!(
            err.to_string(),
            "Bank:A:B: unknown reference 'Nope' in 'Bank:A:C' (via Bank:A:B -> Bank:A:C)"
        );
    }
}
