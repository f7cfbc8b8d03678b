//! Settings for one summary run, passed explicitly to the core.
use crate::aggregate::{Dimension, Staleness};
use crate::analysis::units::{canonicalize, InvalidUnit};
use crate::compute::rates::{RateEntry, RateTable};
use crate::store::Unit;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PASSPHRASE_SECRET: &str = "networth";
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 365;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid base unit: {0}")]
    BaseUnit(#[from] InvalidUnit),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryConfig {
    /// Outermost dimension first. Empty means a single grand total.
    pub grouping: Vec<Dimension>,
    pub rates: Vec<RateEntry>,
    /// Unit every bucket is kept in. Without it the unit most holdings share is used.
    pub base_unit: Option<Unit>,
    /// Date the report describes. Dated holdings are only checked for staleness when set.
    pub as_of: Option<NaiveDate>,
    pub stale_after_days: i64,
    /// Name of the secret holding the decryption passphrase.
    pub passphrase_secret: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            grouping: Vec::new(),
            rates: Vec::new(),
            base_unit: None,
            as_of: None,
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            passphrase_secret: DEFAULT_PASSPHRASE_SECRET.to_string(),
        }
    }
}

impl SummaryConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: SummaryConfig = serde_json::from_str(text)?;
        if let Some(unit) = &config.base_unit {
            config.base_unit = Some(Unit(canonicalize(unit.as_str())?));
        }
        Ok(config)
    }

    pub fn rate_table(&self) -> RateTable {
        RateTable::new(self.rates.iter().cloned())
    }

    pub fn staleness(&self) -> Option<Staleness> {
        self.as_of.map(|as_of| Staleness { as_of, max_age_days: self.stale_after_days })
    }
}
