use crate::compute::ledger::{HoldingState, Ledger};
use crate::graph::ScopeChain;
use crate::store::{HoldingId, HoldingValue, Registry};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the dependency tree behind one holding's value, with the values
/// recorded in `ledger`. Holdings already printed are shown as back references.
pub fn format_trace(registry: &Registry, ledger: &Ledger, target: HoldingId) -> String {
    let mut tracer = Tracer { registry, ledger, visited_at_level: HashMap::new(), output: String::new() };

    if target.index() < registry.count() {
        let name = registry.qualified_name(target);
        let _ = writeln!(tracer.output, "AUDIT TRACE for holding '{}':", name);
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_holding(target, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid Holding ID {:?}", target);
    }
    tracer.output
}

struct Tracer<'a> {
    registry: &'a Registry,
    ledger: &'a Ledger,
    visited_at_level: HashMap<HoldingId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_holding(&mut self, id: HoldingId, level: usize, prefix: &str) {
        let name = self.registry.qualified_name(id);
        if let Some(&first_seen) = self.visited_at_level.get(&id) {
            let _ = writeln!(self.output, "{}{} -> (Ref to L{})", prefix, name, first_seen);
            return;
        }
        self.visited_at_level.insert(id, level);

        let line_header = format!("[L{}] {} {}", level, name, self.format_value(id));
        match self.registry.value(id) {
            HoldingValue::Literal(_) => {
                let _ = writeln!(self.output, "{}{}", prefix, line_header);
            }
            HoldingValue::Expression(expr) => {
                let _ = writeln!(self.output, "{}{} = {}", prefix, line_header, expr);

                let scopes = ScopeChain::for_holding(self.registry, id);
                let references = expr.references();
                let stem = build_child_stem(prefix);
                for (i, reference) in references.iter().enumerate() {
                    let connector = if i == references.len() - 1 { "`-- " } else { "|-- " };
                    let full_prefix = format!("{}{}", stem, connector);
                    match scopes.lookup(self.registry, reference) {
                        Some(target) => self.trace_holding(target, level + 1, &full_prefix),
                        None => {
                            let _ = writeln!(self.output, "{}\"{}\" [unknown]", full_prefix, reference);
                        }
                    }
                }
            }
        }
    }

    fn format_value(&self, id: HoldingId) -> String {
        match self.ledger.state(id) {
            HoldingState::Resolved(q) => format!("[{}]", q),
            HoldingState::Failed(e) => format!("[Err: {}]", e.kind),
            _ => "[?]".to_string(),
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`-- ", "    ").replace("|-- ", "|   ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{Evaluator, RateTable};
    use crate::graph::build_registry;
    use serde_json::json;

    #[test]
    fn test_trace_shows_references_and_back_references() {
        let reg = build_registry(&json!({ "institutions": { "Bank": { "accounts": { "Main": { "holdings": {
            "Cash": "1000 USD",
            "Total": "Cash + Cash / 2",
            "Ghosted": "Total + Ghost"
        }}}}}}))
        .unwrap();
        let rates = RateTable::default();
        let mut eval = Evaluator::new(&reg, &rates);
        eval.resolve_all();

        let target = reg.find_global("Ghosted").unwrap();
        let trace = format_trace(&reg, eval.ledger(), target);
        let expected = [
            "AUDIT TRACE for holding 'Bank:Main:Ghosted':",
            "--------------------------------------------------",
            "[L1] Bank:Main:Ghosted [Err: unknown reference 'Ghost' in 'Bank:Main:Ghosted'] = (\"Total\" + \"Ghost\")",
            "|-- [L2] Bank:Main:Total [1500 USD] = (\"Cash\" + (\"Cash\" / 2))",
            "|   |-- [L3] Bank:Main:Cash [1000 USD]",
            "|   `-- Bank:Main:Cash -> (Ref to L3)",
            "`-- \"Ghost\" [unknown]",
        ];
        assert_eq!(trace.lines().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_trace_of_unresolved_ledger_and_cycles() {
        let reg = build_registry(&json!({ "institutions": { "Bank": { "accounts": { "Main": { "holdings": {
            "A": "B", "B": "A"
        }}}}}}))
        .unwrap();
        let a = reg.find_global("A").unwrap();

        let trace = format_trace(&reg, &Ledger::with_capacity(reg.count()), a);
        assert!(trace.contains("[L1] Bank:Main:A [?] = \"B\""));
        assert!(trace.contains("`-- [L2] Bank:Main:B [?] = \"A\""));
        assert!(trace.contains("    `-- Bank:Main:A -> (Ref to L1)"));

        let trace = format_trace(&reg, &Ledger::new(), HoldingId::new(99));
        assert!(trace.starts_with("Error: Invalid Holding ID"));
    }
}
