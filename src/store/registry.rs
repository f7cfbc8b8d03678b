use super::types::*;
use crate::graph::BuildError;
use chrono::NaiveDate;

/// Owns every institution, account and holding of one summary.
///
/// Holdings are stored column-wise (`kinds[i]`, `meta[i]` describe `HoldingId(i)`)
/// in declaration order. Accounts and institutions point back to their parents by id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub institutions: Vec<Institution>,
    pub accounts: Vec<Account>,

    // Holding columns
    pub kinds: Vec<HoldingValue>,
    pub meta: Vec<HoldingMeta>,
}

pub const UNCATEGORIZED: &str = "uncategorized";

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    pub fn holding_ids(&self) -> impl Iterator<Item = HoldingId> + '_ {
        (0..self.kinds.len()).map(HoldingId::new)
    }

    pub fn add_institution(&mut self, name: &str, owners: Vec<String>) -> Result<InstitutionId, BuildError> {
        if self.institution_named(name).is_some() {
            return Err(BuildError::DuplicateInstitution(name.to_string()));
        }
        let id = InstitutionId::new(self.institutions.len());
        self.institutions.push(Institution { name: name.to_string(), owners, accounts: Vec::new() });
        Ok(id)
    }

    pub fn add_account(
        &mut self,
        institution: InstitutionId,
        name: &str,
        owners: Vec<String>,
        category: Option<String>,
    ) -> Result<AccountId, BuildError> {
        let inst = &self.institutions[institution.index()];
        if inst.accounts.iter().any(|a| self.accounts[a.index()].name == name) {
            return Err(BuildError::DuplicateAccount {
                institution: inst.name.clone(),
                account: name.to_string(),
            });
        }

        let id = AccountId::new(self.accounts.len());
        self.accounts.push(Account {
            name: name.to_string(),
            institution,
            owners,
            category,
            updated: None,
            holdings: Vec::new(),
        });
        self.institutions[institution.index()].accounts.push(id);
        Ok(id)
    }

    pub fn add_holding(
        &mut self,
        account: AccountId,
        name: &str,
        value: HoldingValue,
        category: Option<String>,
    ) -> Result<HoldingId, BuildError> {
        if self.find_in_account(account, name).is_some() {
            return Err(BuildError::DuplicateHolding {
                account: self.account_path(account),
                holding: name.to_string(),
            });
        }

        let id = HoldingId::new(self.kinds.len());
        self.kinds.push(value);
        self.meta.push(HoldingMeta { name: name.to_string(), account, category, updated: None });
        self.accounts[account.index()].holdings.push(id);
        Ok(id)
    }

    pub fn set_account_updated(&mut self, id: AccountId, date: NaiveDate) {
        self.accounts[id.index()].updated = Some(date);
    }

    pub fn set_holding_updated(&mut self, id: HoldingId, date: NaiveDate) {
        self.meta[id.index()].updated = Some(date);
    }

    // --- Accessors ---

    #[inline(always)]
    pub fn value(&self, id: HoldingId) -> &HoldingValue { &self.kinds[id.index()] }
    pub fn name(&self, id: HoldingId) -> &str { &self.meta[id.index()].name }
    pub fn account_of(&self, id: HoldingId) -> AccountId { self.meta[id.index()].account }
    pub fn account(&self, id: AccountId) -> &Account { &self.accounts[id.index()] }
    pub fn institution(&self, id: InstitutionId) -> &Institution { &self.institutions[id.index()] }

    pub fn institution_of(&self, id: HoldingId) -> InstitutionId {
        self.account(self.account_of(id)).institution
    }

    /// `institution:account:holding`, unique across the registry.
    pub fn qualified_name(&self, id: HoldingId) -> String {
        format!("{}:{}", self.account_path(self.account_of(id)), self.name(id))
    }

    pub fn account_path(&self, id: AccountId) -> String {
        let account = self.account(id);
        format!("{}:{}", self.institution(account.institution).name, account.name)
    }

    /// Holding category, else account category, else `uncategorized`.
    pub fn category(&self, id: HoldingId) -> &str {
        let meta = &self.meta[id.index()];
        meta.category
            .as_deref()
            .or(self.account(meta.account).category.as_deref())
            .unwrap_or(UNCATEGORIZED)
    }

    /// Holding date, else account date.
    pub fn updated(&self, id: HoldingId) -> Option<NaiveDate> {
        let meta = &self.meta[id.index()];
        meta.updated.or(self.account(meta.account).updated)
    }

    /// Account owners, else institution owners.
    pub fn owners(&self, id: HoldingId) -> &[String] {
        let account = self.account(self.account_of(id));
        if account.owners.is_empty() {
            &self.institution(account.institution).owners
        } else {
            &account.owners
        }
    }

    // --- Name lookup ---

    pub fn institution_named(&self, name: &str) -> Option<InstitutionId> {
        self.institutions.iter().position(|i| i.name == name).map(InstitutionId::new)
    }

    /// Accounts of the given name in declaration order, across all institutions.
    pub fn accounts_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = AccountId> + 'a {
        self.accounts
            .iter()
            .enumerate()
            .filter(move |(_, a)| a.name == name)
            .map(|(i, _)| AccountId::new(i))
    }

    pub fn find_in_account(&self, account: AccountId, name: &str) -> Option<HoldingId> {
        self.account(account).holdings.iter().copied().find(|&h| self.name(h) == name)
    }

    pub fn find_in_institution(&self, institution: InstitutionId, name: &str) -> Option<HoldingId> {
        self.institution(institution)
            .accounts
            .iter()
            .find_map(|&a| self.find_in_account(a, name))
    }

    pub fn find_global(&self, name: &str) -> Option<HoldingId> {
        self.holding_ids().find(|&h| self.name(h) == name)
    }
}
