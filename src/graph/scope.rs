//! Ordered name lookup for references.
//!
//! A reference is tried against the referencing holding's account, then its
//! institution, then every institution. The first scope with a match wins.

use crate::store::{AccountId, HoldingId, InstitutionId, Reference, Registry};
use smallvec::{smallvec, SmallVec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Account(AccountId),
    Institution(InstitutionId),
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChain {
    scopes: SmallVec<[Scope; 3]>,
}

impl ScopeChain {
    pub fn for_holding(registry: &Registry, holding: HoldingId) -> Self {
        let account = registry.account_of(holding);
        let institution = registry.account(account).institution;
        Self { scopes: smallvec![Scope::Account(account), Scope::Institution(institution), Scope::Global] }
    }

    /// Resolves `holding`, `account:holding` or `institution:account:holding`.
    pub fn lookup(&self, registry: &Registry, reference: &Reference) -> Option<HoldingId> {
        match reference.segments.as_slice() {
            [holding] => self.scopes.iter().find_map(|scope| match *scope {
                Scope::Account(a) => registry.find_in_account(a, holding),
                Scope::Institution(i) => registry.find_in_institution(i, holding),
                Scope::Global => registry.find_global(holding),
            }),
            [container, holding] => self
                .lookup_in_account_named(registry, container, holding)
                .or_else(|| {
                    let institution = registry.institution_named(container)?;
                    registry.find_in_institution(institution, holding)
                }),
            [institution, account, holding] => {
                let institution = registry.institution_named(institution)?;
                registry
                    .institution(institution)
                    .accounts
                    .iter()
                    .find(|&&a| registry.account(a).name == *account)
                    .and_then(|&a| registry.find_in_account(a, holding))
            }
            _ => None,
        }
    }

    fn lookup_in_account_named(&self, registry: &Registry, account: &str, holding: &str) -> Option<HoldingId> {
        self.scopes.iter().find_map(|scope| match *scope {
            Scope::Account(a) if registry.account(a).name == account => registry.find_in_account(a, holding),
            Scope::Account(_) => None,
            Scope::Institution(i) => registry
                .institution(i)
                .accounts
                .iter()
                .filter(|&&a| registry.account(a).name == account)
                .find_map(|&a| registry.find_in_account(a, holding)),
            Scope::Global => registry.accounts_named(account).find_map(|a| registry.find_in_account(a, holding)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::quantity::Quantity;
    use crate::store::HoldingValue;
    use rust_decimal::Decimal;

    fn add(reg: &mut Registry, account: AccountId, name: &str) -> HoldingId {
        let value = HoldingValue::Literal(Quantity::new(Decimal::ONE, "USD"));
        reg.add_holding(account, name, value, None).unwrap()
    }

    fn r(path: &str) -> Reference { Reference::parse(path).unwrap() }

    #[test]
    fn test_account_shadows_institution_shadows_global() {
        let mut reg = Registry::new();
        let first = reg.add_institution("First", vec![]).unwrap();
        let second = reg.add_institution("Second", vec![]).unwrap();
        let global_acct = reg.add_account(first, "Checking", vec![], None).unwrap();
        let sibling_acct = reg.add_account(second, "Savings", vec![], None).unwrap();
        let own_acct = reg.add_account(second, "Brokerage", vec![], None).unwrap();

        let global_cash = add(&mut reg, global_acct, "Cash");
        let global_only = add(&mut reg, global_acct, "Bonds");
        let sibling_cash = add(&mut reg, sibling_acct, "Cash");
        let own_stock = add(&mut reg, own_acct, "Stock");
        let own_total = add(&mut reg, own_acct, "Total");

        let chain = ScopeChain::for_holding(&reg, own_total);
        assert_eq!(chain.lookup(&reg, &r("Stock")), Some(own_stock));
        assert_eq!(chain.lookup(&reg, &r("Cash")), Some(sibling_cash));
        assert_eq!(chain.lookup(&reg, &r("Bonds")), Some(global_only));
        assert_eq!(chain.lookup(&reg, &r("Missing")), None);

        // A holding in First sees its own Cash first.
        let chain = ScopeChain::for_holding(&reg, global_only);
        assert_eq!(chain.lookup(&reg, &r("Cash")), Some(global_cash));
    }

    #[test]
    fn test_qualified_paths() {
        let mut reg = Registry::new();
        let bank = reg.add_institution("Bank", vec![]).unwrap();
        let broker = reg.add_institution("Broker", vec![]).unwrap();
        let checking = reg.add_account(bank, "Checking", vec![], None).unwrap();
        let brokerage = reg.add_account(broker, "Brokerage", vec![], None).unwrap();

        let cash = add(&mut reg, checking, "Cash");
        let stock = add(&mut reg, brokerage, "Stock");

        let chain = ScopeChain::for_holding(&reg, cash);
        // account:holding across institutions
        assert_eq!(chain.lookup(&reg, &r("Brokerage:Stock")), Some(stock));
        // institution:holding when no account has that name
        assert_eq!(chain.lookup(&reg, &r("Broker:Stock")), Some(stock));
        assert_eq!(chain.lookup(&reg, &r("Broker:Brokerage:Stock")), Some(stock));
        assert_eq!(chain.lookup(&reg, &r("Bank:Brokerage:Stock")), None);
    }
}
