//! Rolls resolved holdings up into first-seen-ordered buckets.

use super::key::{AggregationKey, Dimension};
use crate::compute::engine::Evaluator;
use crate::compute::ledger::{ResolutionError, ResolutionErrorKind};
use crate::compute::quantity::{Quantity, QuantityError};
use crate::compute::rates::RateTable;
use crate::report::{self, HoldingLine, ReportModel, StaleHolding, Unresolved};
use crate::store::{HoldingId, Registry, Unit};
use chrono::NaiveDate;
use std::collections::HashMap;

/// One aggregation group. Children keep the order their values were first seen in.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub value: String,
    /// `None` until the first holding lands in the bucket.
    pub total: Option<Quantity>,
    pub children: Vec<Bucket>,
    pub holdings: Vec<HoldingLine>,
    index: HashMap<String, usize>,
}

impl Bucket {
    fn named(value: &str) -> Self {
        Self { value: value.to_string(), ..Default::default() }
    }

    fn child(&self, value: &str) -> Option<&Bucket> {
        self.index.get(value).map(|&i| &self.children[i])
    }

    fn child_mut_or_insert(&mut self, value: &str) -> &mut Bucket {
        let idx = match self.index.get(value) {
            Some(&i) => i,
            None => {
                log::debug!("New bucket '{}' under '{}'", value, self.value);
                self.children.push(Bucket::named(value));
                self.index.insert(value.to_string(), self.children.len() - 1);
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    /// The running total after adding `q`, which is already in the report unit.
    fn plus(bucket: Option<&Bucket>, q: &Quantity, rates: &RateTable) -> Result<Quantity, QuantityError> {
        match bucket.and_then(|b| b.total.as_ref()) {
            Some(total) => total.add(q, rates),
            None => Ok(q.clone()),
        }
    }
}

/// New totals along one key path, root first.
struct Plan {
    totals: Vec<Quantity>,
    /// The holding expressed in the report unit.
    converted: Quantity,
}

/// Flags holdings whose `updated` date is more than `max_age_days` before `as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub as_of: NaiveDate,
    pub max_age_days: i64,
}

pub struct AggregationEngine<'d> {
    dimensions: &'d [Dimension],
    base_unit: Option<Unit>,
    staleness: Option<Staleness>,
}

impl<'d> AggregationEngine<'d> {
    pub fn new(dimensions: &'d [Dimension], base_unit: Option<Unit>) -> Self {
        Self { dimensions, base_unit, staleness: None }
    }

    pub fn with_staleness(mut self, staleness: Staleness) -> Self {
        self.staleness = Some(staleness);
        self
    }

    /// Resolves (or reuses the memoized value of) every holding and sums the
    /// resolvable ones. Anything that cannot be summed is listed as unresolved.
    pub fn aggregate(&self, evaluator: &mut Evaluator<'_>) -> ReportModel {
        let registry = evaluator.registry();
        let rates = evaluator.rates();
        let mut unresolved: Vec<(HoldingId, Unresolved)> = Vec::new();

        // 1. Resolve everything before choosing the report unit
        let mut resolved = Vec::with_capacity(registry.count());
        for id in registry.holding_ids() {
            match evaluator.resolve(id) {
                Ok(q) => resolved.push((id, q)),
                Err(error) => {
                    log::warn!("Could not resolve {}", error);
                    unresolved.push((id, Unresolved { holding: error.holding.clone(), error }));
                }
            }
        }
        let unit = self.report_unit(&resolved);
        log::debug!("Summing {} holdings in '{}'", resolved.len(), unit);

        // 2. Sum, all or nothing along each key path
        let mut root = Bucket::named("TOTAL");
        let mut summed = 0usize;
        for (id, value) in resolved {
            let key = AggregationKey::for_holding(registry, id, self.dimensions);
            let name = registry.qualified_name(id);
            match Self::plan(&root, &key, &value, &unit, rates) {
                Ok(plan) => {
                    Self::commit(&mut root, &key, plan, name, value);
                    summed += 1;
                }
                Err(e) => {
                    log::warn!("Excluding {} from totals: {}", name, e);
                    let error = ResolutionError::at(name.clone(), ResolutionErrorKind::from(e));
                    unresolved.push((id, Unresolved { holding: name, error }));
                }
            }
        }

        if root.total.is_none() {
            root.total = Some(Quantity::zero(unit));
        }
        unresolved.sort_by_key(|(id, _)| *id);
        let unresolved: Vec<Unresolved> = unresolved.into_iter().map(|(_, u)| u).collect();
        let stale = self.stale_holdings(registry);

        log::info!(
            "Aggregated {} of {} holdings, {} unresolved, {} stale",
            summed,
            registry.count(),
            unresolved.len(),
            stale.len()
        );
        report::assemble(root, self.dimensions, unresolved, stale)
    }

    /// The configured base unit, else the unit most resolved holdings share
    /// (the first one seen on a tie), else dimensionless.
    fn report_unit(&self, resolved: &[(HoldingId, Quantity)]) -> Unit {
        if let Some(unit) = &self.base_unit {
            return unit.clone();
        }
        let mut counts: Vec<(&Unit, usize)> = Vec::new();
        for (_, q) in resolved {
            match counts.iter_mut().find(|(u, _)| *u == &q.unit) {
                Some((_, n)) => *n += 1,
                None => counts.push((&q.unit, 1)),
            }
        }
        // `max_by_key` keeps the last maximum, so scan from the back.
        counts
            .iter()
            .rev()
            .max_by_key(|(_, n)| *n)
            .map(|(u, _)| (*u).clone())
            .unwrap_or_default()
    }

    /// Computes every new total without touching the tree, so a holding that
    /// cannot be summed lands in no bucket at all.
    fn plan(root: &Bucket, key: &AggregationKey, q: &Quantity, unit: &Unit, rates: &RateTable) -> Result<Plan, QuantityError> {
        let converted = q.convert(unit, rates)?;
        let mut totals = Vec::with_capacity(key.values().len() + 1);
        totals.push(Bucket::plus(Some(root), &converted, rates)?);

        let mut node = Some(root);
        for value in key.values() {
            node = node.and_then(|n| n.child(value));
            totals.push(Bucket::plus(node, &converted, rates)?);
        }
        Ok(Plan { totals, converted })
    }

    fn commit(root: &mut Bucket, key: &AggregationKey, plan: Plan, name: String, value: Quantity) {
        let mut totals = plan.totals.into_iter();
        root.total = totals.next();

        let mut node = root;
        for (v, total) in key.values().iter().zip(totals) {
            node = node.child_mut_or_insert(v);
            node.total = Some(total);
        }
        node.holdings.push(HoldingLine { name, value, converted: plan.converted });
    }

    /// Dated holdings older than the configured age, in declaration order.
    fn stale_holdings(&self, registry: &Registry) -> Vec<StaleHolding> {
        let Some(Staleness { as_of, max_age_days }) = self.staleness else {
            return Vec::new();
        };
        registry
            .holding_ids()
            .filter_map(|id| {
                let updated = registry.updated(id)?;
                let age_days = (as_of - updated).num_days();
                (age_days > max_age_days).then(|| StaleHolding { holding: registry.qualified_name(id), updated, age_days })
            })
            .collect()
    }
}
