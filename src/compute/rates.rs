//! Caller-supplied conversion rates between units.

use crate::analysis::units::canonicalize;
use crate::store::Unit;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// `1 from = rate to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
}

impl RateEntry {
    pub fn new(from: &str, to: &str, rate: Decimal) -> Self {
        Self { from: from.to_string(), to: to.to_string(), rate }
    }
}

/// Lookup table of direct rates and the inverses derived from them.
///
/// No transitive paths are built: converting EUR to GBP needs an EUR/GBP
/// (or GBP/EUR) entry even if both EUR/USD and GBP/USD are present.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    // (From, To) -> Rate
    rates: HashMap<(Unit, Unit), Decimal>,
    // Pairs that were supplied rather than derived.
    supplied: HashSet<(Unit, Unit)>,
}

impl RateTable {
    pub fn new(entries: impl IntoIterator<Item = RateEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    /// Adds a rate and its inverse. A supplied rate always wins over a derived inverse.
    pub fn insert(&mut self, entry: RateEntry) {
        let from = Unit(canonicalize(&entry.from).unwrap_or(entry.from));
        let to = Unit(canonicalize(&entry.to).unwrap_or(entry.to));

        // Ignore self-referential rates
        if from == to {
            return;
        }

        let pair = (from.clone(), to.clone());
        self.rates.insert(pair.clone(), entry.rate);
        self.supplied.insert(pair);

        if entry.rate.is_zero() {
            log::error!("Zero conversion rate for {}/{}. Cannot calculate inverse.", from, to);
            return;
        }
        let inverse = (to, from);
        if !self.supplied.contains(&inverse) {
            self.rates.insert(inverse, Decimal::ONE / entry.rate);
        }
    }

    pub fn rate(&self, from: &Unit, to: &Unit) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&(from.clone(), to.clone())).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direct_inverse_and_identity() {
        let table = RateTable::new(vec![RateEntry::new("BTC", "USD", dec!(50000))]);
        let (btc, usd) = (Unit::from("BTC"), Unit::from("USD"));

        assert_eq!(table.rate(&btc, &usd), Some(dec!(50000)));
        assert_eq!(table.rate(&usd, &btc), Some(dec!(0.00002)));
        assert_eq!(table.rate(&usd, &usd), Some(Decimal::ONE));
        assert_eq!(table.rate(&btc, &Unit::from("EUR")), None);
    }

    #[test]
    fn test_supplied_rate_is_not_overwritten_by_inverse() {
        let table = RateTable::new(vec![
            RateEntry::new("EUR", "USD", dec!(1.25)),
            RateEntry::new("USD", "EUR", dec!(0.79)),
        ]);
        assert_eq!(table.rate(&Unit::from("USD"), &Unit::from("EUR")), Some(dec!(0.79)));
        assert_eq!(table.rate(&Unit::from("EUR"), &Unit::from("USD")), Some(dec!(1.25)));
    }

    #[test]
    fn test_no_transitive_rates() {
        let table = RateTable::new(vec![
            RateEntry::new("EUR", "USD", dec!(1.1)),
            RateEntry::new("GBP", "USD", dec!(1.3)),
        ]);
        assert_eq!(table.rate(&Unit::from("EUR"), &Unit::from("GBP")), None);
    }

    #[test]
    fn test_zero_rate_has_no_inverse() {
        let table = RateTable::new(vec![RateEntry::new("JUNK", "USD", Decimal::ZERO)]);
        assert_eq!(table.rate(&Unit::from("JUNK"), &Unit::from("USD")), Some(Decimal::ZERO));
        assert_eq!(table.rate(&Unit::from("USD"), &Unit::from("JUNK")), None);
    }
}
