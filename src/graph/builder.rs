//! Builds the holding registry from a validated tree.
//!
//! Expected shape (every container may also be a list of objects carrying a
//! `name` field instead of a name-keyed mapping):
//!
//! ```json
//! { "institutions": {
//!     "Bank": { "owners": ["alice"], "accounts": {
//!         "Checking": { "category": "cash", "holdings": {
//!             "Cash": "1000 USD",
//!             "Reserve": { "value": "0.1 * Cash", "category": "savings" } } } } } } }
//! ```

use super::error::{BuildError, BuildErrors};
use super::expr::parse_holding_value;
use crate::compute::quantity::Quantity;
use crate::store::{AccountId, HoldingValue, InstitutionId, Registry, Unit};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

const INSTITUTION_FIELDS: &[&str] = &["name", "owners", "accounts"];
const ACCOUNT_FIELDS: &[&str] = &["name", "owners", "category", "updated", "holdings"];
const HOLDING_FIELDS: &[&str] = &["name", "value", "category", "updated"];

/// Format of `updated` dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds the registry, or returns every structural error found.
pub fn build_registry(tree: &Value) -> Result<Registry, BuildErrors> {
    let mut builder = GraphBuilder::default();
    builder.build(tree);
    builder.finish()
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    registry: Registry,
    errors: Vec<BuildError>,
}

impl GraphBuilder {
    pub fn finish(self) -> Result<Registry, BuildErrors> {
        if self.errors.is_empty() {
            log::debug!(
                "Built holding graph: {} institutions, {} accounts, {} holdings",
                self.registry.institutions.len(),
                self.registry.accounts.len(),
                self.registry.count()
            );
            Ok(self.registry)
        } else {
            Err(BuildErrors(self.errors))
        }
    }

    pub fn build(&mut self, tree: &Value) {
        let Some(root) = tree.as_object() else {
            self.invalid("", "expected a mapping at the top level");
            return;
        };
        for key in root.keys().filter(|k| k.as_str() != "institutions") {
            self.invalid(key, "unknown top-level field");
        }
        match root.get("institutions") {
            Some(institutions) => {
                for (name, body) in self.entries("institutions", institutions) {
                    self.build_institution(&name, body);
                }
            }
            None => self.invalid("", "missing 'institutions'"),
        }
    }

    fn build_institution(&mut self, name: &str, body: &Value) {
        let Some(fields) = self.fields(name, body, INSTITUTION_FIELDS) else { return };
        let owners = self.owners(name, fields);

        let id = match self.registry.add_institution(name, owners) {
            Ok(id) => id,
            Err(e) => {
                self.errors.push(e);
                return;
            }
        };

        match fields.get("accounts") {
            Some(accounts) => {
                for (account, body) in self.entries(name, accounts) {
                    self.build_account(id, &format!("{}:{}", name, account), &account, body);
                }
            }
            None => self.invalid(name, "missing 'accounts'"),
        }
    }

    fn build_account(&mut self, institution: InstitutionId, path: &str, name: &str, body: &Value) {
        let Some(fields) = self.fields(path, body, ACCOUNT_FIELDS) else { return };
        let owners = self.owners(path, fields);
        let category = self.optional_string(path, fields, "category");
        let updated = self.optional_date(path, fields);

        let id = match self.registry.add_account(institution, name, owners, category) {
            Ok(id) => id,
            Err(e) => {
                self.errors.push(e);
                return;
            }
        };
        if let Some(date) = updated {
            self.registry.set_account_updated(id, date);
        }

        match fields.get("holdings") {
            Some(holdings) => {
                for (holding, body) in self.entries(path, holdings) {
                    self.build_holding(id, &format!("{}:{}", path, holding), &holding, body);
                }
            }
            None => self.invalid(path, "missing 'holdings'"),
        }
    }

    fn build_holding(&mut self, account: AccountId, path: &str, name: &str, body: &Value) {
        let (raw, category, updated) = match body {
            Value::Object(_) => {
                let Some(fields) = self.fields(path, body, HOLDING_FIELDS) else { return };
                let category = self.optional_string(path, fields, "category");
                let updated = self.optional_date(path, fields);
                match fields.get("value") {
                    Some(raw) => (raw, category, updated),
                    None => return self.invalid(path, "missing 'value'"),
                }
            }
            other => (other, None, None),
        };

        let value = match raw {
            Value::String(text) => match parse_holding_value(text) {
                Ok(value) => value,
                Err(e) => {
                    return self.errors.push(BuildError::MalformedExpression {
                        holding: path.to_string(),
                        message: e.to_string(),
                    })
                }
            },
            Value::Number(n) => match Decimal::from_str(&n.to_string()).or_else(|_| Decimal::from_scientific(&n.to_string())) {
                Ok(m) => HoldingValue::Literal(Quantity { magnitude: m, unit: Unit::dimensionless() }),
                Err(_) => return self.invalid(path, "number out of range"),
            },
            _ => return self.invalid(path, "value must be a string or a number"),
        };

        match self.registry.add_holding(account, name, value, category) {
            Ok(id) => {
                if let Some(date) = updated {
                    self.registry.set_holding_updated(id, date);
                }
            }
            Err(e) => self.errors.push(e),
        }
    }

    // --- Tree helpers ---

    /// Children of a container as `(name, body)` pairs in declaration order.
    fn entries<'v>(&mut self, path: &str, container: &'v Value) -> Vec<(String, &'v Value)> {
        let mut out = Vec::new();
        match container {
            Value::Object(map) => {
                for (name, body) in map {
                    if self.check_name(path, name) {
                        out.push((name.clone(), body));
                    }
                }
            }
            Value::Array(items) => {
                for (i, body) in items.iter().enumerate() {
                    match body.get("name").and_then(Value::as_str) {
                        Some(name) if self.check_name(path, name) => out.push((name.to_string(), body)),
                        Some(_) => {}
                        None => self.invalid(&format!("{}[{}]", path, i), "list entry without a 'name'"),
                    }
                }
            }
            _ => self.invalid(path, "expected a mapping or a list"),
        }
        out
    }

    fn check_name(&mut self, path: &str, name: &str) -> bool {
        if name.trim().is_empty() || name.contains(':') {
            self.invalid(path, &format!("invalid name '{}': names must be non-empty and free of ':'", name));
            return false;
        }
        true
    }

    fn fields<'v>(&mut self, path: &str, body: &'v Value, allowed: &[&str]) -> Option<&'v Map<String, Value>> {
        let Some(fields) = body.as_object() else {
            self.invalid(path, "expected a mapping");
            return None;
        };
        for key in fields.keys().filter(|k| !allowed.contains(&k.as_str())) {
            self.invalid(path, &format!("unknown field '{}'", key));
        }
        Some(fields)
    }

    fn owners(&mut self, path: &str, fields: &Map<String, Value>) -> Vec<String> {
        match fields.get("owners") {
            None => Vec::new(),
            Some(Value::String(owner)) => vec![owner.clone()],
            Some(Value::Array(items)) => {
                let mut owners: Vec<String> = Vec::new();
                for item in items {
                    match item.as_str() {
                        Some(o) if !owners.iter().any(|x| x == o) => owners.push(o.to_string()),
                        Some(_) => {}
                        None => self.invalid(path, "owners must be strings"),
                    }
                }
                owners
            }
            Some(_) => {
                self.invalid(path, "owners must be a string or a list of strings");
                Vec::new()
            }
        }
    }

    fn optional_string(&mut self, path: &str, fields: &Map<String, Value>, key: &str) -> Option<String> {
        match fields.get(key) {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.invalid(path, &format!("'{}' must be a string", key));
                None
            }
        }
    }

    fn optional_date(&mut self, path: &str, fields: &Map<String, Value>) -> Option<NaiveDate> {
        let text = self.optional_string(path, fields, "updated")?;
        match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
            Ok(date) => Some(date),
            Err(_) => {
                self.invalid(path, &format!("invalid date '{}', expected YYYY-MM-DD", text));
                None
            }
        }
    }

    fn invalid(&mut self, path: &str, message: &str) {
        self.errors.push(BuildError::InvalidStructure { path: path.to_string(), message: message.to_string() });
    }
}
