// src/analysis/units.rs
//! Dimensional algebra for holding units.
//!
//! A unit is a product of base terms with integer exponents, e.g. `USD/share`
//! is `{ USD: 1, share: -1 }`. The empty unit is a dimensionless number.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid unit '{0}'")]
pub struct InvalidUnit(pub String);

/// A parsed representation of a unit, mapping each base unit to its exponent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedUnit {
    terms: BTreeMap<String, i32>,
}

impl ParsedUnit {
    /// Parses `num[/den]` where each side is a `*`-separated product of
    /// `base[^exp]` factors. An empty string parses to the dimensionless unit.
    pub fn parse(s: &str) -> Result<Self, InvalidUnit> {
        let mut terms = BTreeMap::new();
        let mut parts = s.split('/');

        if let Some(num) = parts.next() {
            Self::parse_product(s, num, 1, &mut terms)?;
        }
        if let Some(den) = parts.next() {
            if den.trim().is_empty() {
                return Err(InvalidUnit(s.to_string()));
            }
            Self::parse_product(s, den, -1, &mut terms)?;
        }
        // Multiple slashes
        if parts.next().is_some() {
            return Err(InvalidUnit(s.to_string()));
        }

        let mut unit = Self { terms };
        unit.prune();
        Ok(unit)
    }

    fn parse_product(
        whole: &str,
        product: &str,
        sign: i32,
        terms: &mut BTreeMap<String, i32>,
    ) -> Result<(), InvalidUnit> {
        let product = product.trim();
        if product.is_empty() || product == "1" {
            return Ok(());
        }
        for factor in product.split('*') {
            let mut parts = factor.split('^');
            let base = parts.next().unwrap_or_default().trim();
            if base.is_empty() || !base.chars().all(is_unit_char) {
                return Err(InvalidUnit(whole.to_string()));
            }
            let exp = match parts.next() {
                Some(e) => e.trim().parse::<i32>().map_err(|_| InvalidUnit(whole.to_string()))?,
                None => 1,
            };
            if parts.next().is_some() {
                return Err(InvalidUnit(whole.to_string()));
            }
            *terms.entry(base.to_string()).or_insert(0) += exp * sign;
        }
        Ok(())
    }

    pub fn is_dimensionless(&self) -> bool { self.terms.is_empty() }

    pub fn multiply(&mut self, other: &Self) {
        for (k, v) in &other.terms {
            *self.terms.entry(k.clone()).or_insert(0) += v;
        }
        self.prune();
    }

    pub fn divide(&mut self, other: &Self) {
        for (k, v) in &other.terms {
            *self.terms.entry(k.clone()).or_insert(0) -= v;
        }
        self.prune();
    }

    fn prune(&mut self) {
        self.terms.retain(|_, exp| *exp != 0);
    }

    /// Canonical text form: terms sorted by base, numerator before denominator.
    /// Dimensionless units render as the empty string.
    pub fn canonical(&self) -> String {
        let (num, den): (Vec<_>, Vec<_>) = self.terms.iter().partition(|&(_, &v)| v > 0);

        let fmt = |terms: Vec<(&String, &i32)>| -> String {
            if terms.is_empty() {
                return "1".to_string();
            }
            terms
                .into_iter()
                .map(|(k, v)| if v.abs() == 1 { k.clone() } else { format!("{}^{}", k, v.abs()) })
                .collect::<Vec<_>>()
                .join("*")
        };

        let n_str = fmt(num);
        let d_str = fmt(den);

        if d_str == "1" {
            if n_str == "1" { String::new() } else { n_str }
        } else {
            format!("{}/{}", n_str, d_str)
        }
    }
}

/// Characters allowed in a base unit name.
pub fn is_unit_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parses and re-renders a unit string in canonical form.
pub fn canonicalize(s: &str) -> Result<String, InvalidUnit> {
    ParsedUnit::parse(s).map(|u| u.canonical())
}
