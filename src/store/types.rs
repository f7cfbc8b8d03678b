use crate::compute::quantity::Quantity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

macro_rules! registry_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            #[inline(always)]
            pub fn index(&self) -> usize { self.0 as usize }
            pub fn new(idx: usize) -> Self { Self(idx as u32) }
        }
    };
}

registry_id!(
    /// Position of an institution in the registry.
    InstitutionId
);
registry_id!(
    /// Position of an account in the registry.
    AccountId
);
registry_id!(
    /// Position of a holding in the registry. Holdings are numbered in declaration order.
    HoldingId
);

/// A canonical unit string. The empty unit is a dimensionless number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Unit(pub String);

impl Unit {
    pub fn dimensionless() -> Self { Self(String::new()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_dimensionless(&self) -> bool { self.0.is_empty() }
}

impl From<&str> for Unit {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
        }
    }
}

/// A `:`-separated path naming another holding: `holding`, `account:holding`
/// or `institution:account:holding`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub segments: SmallVec<[String; 3]>,
}

impl Reference {
    pub fn parse(path: &str) -> Option<Self> {
        let segments: SmallVec<[String; 3]> = path.split(':').map(|s| s.trim().to_string()).collect();
        if segments.len() > 3 || segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(Self { segments })
    }

    /// The last segment, i.e. the name of the referenced holding.
    pub fn holding(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(":"))
    }
}

/// The formula of an expression-valued holding.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Quantity),
    Reference(Reference),
    Negate(Box<Expr>),
    Binary { op: Operation, lhs: Box<Expr>, rhs: Box<Expr> },
    /// Explicit unit conversion, written `expr in UNIT`.
    Convert { expr: Box<Expr>, unit: Unit },
}

impl Expr {
    /// All references in left-to-right order, duplicates included.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Reference(r) => out.push(r),
            Expr::Negate(inner) | Expr::Convert { expr: inner, .. } => inner.collect_references(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(q) => write!(f, "{}", q),
            Expr::Reference(r) => write!(f, "\"{}\"", r),
            Expr::Negate(inner) => write!(f, "-{}", inner),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Convert { expr, unit } => write!(f, "({} in {})", expr, unit),
        }
    }
}

/// The declared value of a holding. Classified once at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum HoldingValue {
    Literal(Quantity),
    Expression(Expr),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldingMeta {
    pub name: String,
    pub account: AccountId,
    /// Declared on the holding itself; falls back to the account's category.
    pub category: Option<String>,
    /// When the declared value was last brought up to date.
    pub updated: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub institution: InstitutionId,
    pub owners: Vec<String>,
    pub category: Option<String>,
    pub updated: Option<NaiveDate>,
    pub holdings: Vec<HoldingId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Institution {
    pub name: String,
    pub owners: Vec<String>,
    pub accounts: Vec<AccountId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_paths() {
        let r = Reference::parse("Brokerage:Stock").unwrap();
        assert_eq!(r.segments.len(), 2);
        assert_eq!(r.holding(), "Stock");
        assert_eq!(r.to_string(), "Brokerage:Stock");

        assert!(Reference::parse("a:b:c:d").is_none());
        assert!(Reference::parse("Brokerage:").is_none());
    }
}
