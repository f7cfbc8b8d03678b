use crate::store::{HoldingId, Registry};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const UNOWNED: &str = "unowned";

/// A grouping dimension of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Dimension {
    Institution,
    /// Keyed by `institution:account` so equally named accounts stay apart.
    Account,
    Category,
    /// Joint owners form one key (`alice & bob`), so no holding is counted twice.
    Owner,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown grouping dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "institution" => Ok(Dimension::Institution),
            "account" => Ok(Dimension::Account),
            "category" => Ok(Dimension::Category),
            "owner" => Ok(Dimension::Owner),
            _ => Err(UnknownDimension(s.to_string())),
        }
    }
}

impl TryFrom<String> for Dimension {
    type Error = UnknownDimension;

    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl Dimension {
    pub fn value_of(&self, registry: &Registry, holding: HoldingId) -> String {
        match self {
            Dimension::Institution => registry.institution(registry.institution_of(holding)).name.clone(),
            Dimension::Account => registry.account_path(registry.account_of(holding)),
            Dimension::Category => registry.category(holding).to_string(),
            Dimension::Owner => match registry.owners(holding) {
                [] => UNOWNED.to_string(),
                owners => owners.join(" & "),
            },
        }
    }
}

/// One value per requested dimension, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct AggregationKey(pub SmallVec<[String; 4]>);

impl AggregationKey {
    pub fn for_holding(registry: &Registry, holding: HoldingId, dimensions: &[Dimension]) -> Self {
        Self(dimensions.iter().map(|d| d.value_of(registry, holding)).collect())
    }

    pub fn values(&self) -> &[String] { &self.0 }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" / "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_registry;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("institution", Dimension::Institution)]
    #[case("Account", Dimension::Account)]
    #[case(" category ", Dimension::Category)]
    #[case("OWNER", Dimension::Owner)]
    fn test_parse_dimension(#[case] input: &str, #[case] expected: Dimension) {
        assert_eq!(input.parse::<Dimension>().unwrap(), expected);
        let grouping: Vec<Dimension> = serde_json::from_value(json!([input])).unwrap();
        assert_eq!(grouping, [expected]);
    }

    #[test]
    fn test_keys() {
        let reg = build_registry(&json!({ "institutions": {
            "Bank": { "accounts": {
                "Joint": { "owners": ["alice", "bob"], "category": "cash", "holdings": { "Cash": "1 USD" } },
                "Solo": { "holdings": { "Cash": "1 USD" } }
            }}
        }}))
        .unwrap();
        let dims = [Dimension::Category, Dimension::Owner, Dimension::Account, Dimension::Institution];

        let joint = AggregationKey::for_holding(&reg, HoldingId(0), &dims);
        assert_eq!(joint.values(), ["cash", "alice & bob", "Bank:Joint", "Bank"]);
        assert_eq!(joint.to_string(), "cash / alice & bob / Bank:Joint / Bank");

        let solo = AggregationKey::for_holding(&reg, HoldingId(1), &dims);
        assert_eq!(solo.values(), ["uncategorized", UNOWNED, "Bank:Solo", "Bank"]);
        assert!("colour".parse::<Dimension>().is_err());
    }
}
