//! A synchronous, single-threaded evaluator for holding values.
use crate::compute::ledger::{HoldingState, Ledger, ResolutionError, ResolutionErrorKind};
use crate::compute::quantity::Quantity;
use crate::compute::rates::RateTable;
use crate::graph::ScopeChain;
use crate::store::{Expr, HoldingId, HoldingValue, Operation, Registry};

/// Resolves holdings lazily, memoizing every outcome in a [`Ledger`].
pub struct Evaluator<'a> {
    registry: &'a Registry,
    rates: &'a RateTable,
    ledger: Ledger,
    // The current resolution call chain, used to name cycles.
    stack: Vec<HoldingId>,
    computations: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a Registry, rates: &'a RateTable) -> Self {
        Self {
            registry,
            rates,
            ledger: Ledger::with_capacity(registry.count()),
            stack: Vec::new(),
            computations: 0,
        }
    }

    pub fn registry(&self) -> &'a Registry { self.registry }
    pub fn rates(&self) -> &'a RateTable { self.rates }
    pub fn ledger(&self) -> &Ledger { &self.ledger }

    /// Number of holdings whose value has actually been computed.
    pub fn computations(&self) -> usize { self.computations }

    /// Resolves every holding in declaration order. One failure never stops the
    /// others; all failures are returned in declaration order.
    pub fn resolve_all(&mut self) -> Vec<(HoldingId, ResolutionError)> {
        let mut failures = Vec::new();
        for id in self.registry.holding_ids() {
            if let Err(e) = self.resolve(id) {
                log::warn!("Could not resolve {}", e);
                failures.push((id, e));
            }
        }
        failures
    }

    /// Resolves one holding, computing its referents first. Idempotent.
    pub fn resolve(&mut self, id: HoldingId) -> Result<Quantity, ResolutionError> {
        if id.index() >= self.registry.count() {
            return Err(ResolutionError::at(format!("#{}", id.0), ResolutionErrorKind::UnknownHolding { id: id.0 }));
        }
        match self.ledger.state(id) {
            HoldingState::Resolved(q) => return Ok(q.clone()),
            HoldingState::Failed(e) => return Err(e.clone()),
            // Reached again while still on the call chain.
            HoldingState::InProgress => return Err(self.cycle_error(id)),
            HoldingState::Unvisited => {}
        }

        self.ledger.begin(id);
        self.stack.push(id);
        self.computations += 1;

        let result = self.compute(id);

        self.stack.pop();
        match &result {
            Ok(q) => log::debug!("Resolved {} = {}", self.registry.qualified_name(id), q),
            Err(e) => log::debug!("Failed {}", e),
        }
        self.ledger.finish(id, result.clone());
        result
    }

    fn compute(&mut self, id: HoldingId) -> Result<Quantity, ResolutionError> {
        let registry = self.registry;
        match registry.value(id) {
            HoldingValue::Literal(q) => Ok(q.clone()),
            HoldingValue::Expression(expr) => {
                let scopes = ScopeChain::for_holding(registry, id);
                self.evaluate(id, &scopes, expr)
            }
        }
    }

    fn evaluate(&mut self, id: HoldingId, scopes: &ScopeChain, expr: &Expr) -> Result<Quantity, ResolutionError> {
        match expr {
            Expr::Literal(q) => Ok(q.clone()),
            Expr::Reference(reference) => match scopes.lookup(self.registry, reference) {
                Some(target) => self
                    .resolve(target)
                    .map_err(|e| e.via(self.registry.qualified_name(id))),
                None => Err(self.fail_at(
                    id,
                    ResolutionErrorKind::UnknownReference {
                        name: reference.to_string(),
                        referenced_by: self.registry.qualified_name(id),
                    },
                )),
            },
            Expr::Negate(inner) => Ok(self.evaluate(id, scopes, inner)?.neg()),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(id, scopes, lhs)?;
                let rhs = self.evaluate(id, scopes, rhs)?;
                let rates = self.rates;
                let result = match op {
                    Operation::Add => lhs.add(&rhs, rates),
                    Operation::Subtract => lhs.sub(&rhs, rates),
                    Operation::Multiply => lhs.mul(&rhs),
                    Operation::Divide => lhs.div(&rhs),
                };
                result.map_err(|e| self.fail_at(id, e.into()))
            }
            Expr::Convert { expr, unit } => {
                let value = self.evaluate(id, scopes, expr)?;
                value.convert(unit, self.rates).map_err(|e| self.fail_at(id, e.into()))
            }
        }
    }

    fn fail_at(&self, id: HoldingId, kind: ResolutionErrorKind) -> ResolutionError {
        ResolutionError::at(self.registry.qualified_name(id), kind)
    }

    /// `id` is on the call chain; the cycle runs from its first occurrence back to itself.
    fn cycle_error(&self, id: HoldingId) -> ResolutionError {
        let start = self.stack.iter().position(|&h| h == id).unwrap_or(0);
        let mut cycle: Vec<String> = self.stack[start..].iter().map(|&h| self.registry.qualified_name(h)).collect();
        cycle.push(self.registry.qualified_name(id));
        ResolutionError::at(self.registry.qualified_name(id), ResolutionErrorKind::CyclicReference { cycle })
    }
}
