//! Direct-interface state (spec.md §3): the tracked set of custom chains,
//! priority-ordered rules, and passthrough invocations issued through the
//! low-level `direct` escape hatch.
//!
//! The backend trait itself is stateless about direct rules beyond applying
//! them (see `NftBackend::list_direct_rules`'s doc comment) — `DirectConfig`
//! is the single source of truth the `direct` D-Bus interface reads back
//! from, kept in sync with the backend by `RuntimeCore`.

use warden_backend::{Chain, DirectRule, Family, Passthrough};

/// Tracked direct-interface state for one zone-independent ruleset.
#[derive(Debug, Clone, Default)]
pub struct DirectConfig {
    chains: Vec<Chain>,
    rules: Vec<DirectRule>,
    /// Tracked passthroughs, in the order they were added — `removeAllPassthroughs`
    /// walks this in reverse so a chain is never removed while rules still
    /// reference it (spec.md §8 "passthrough reverse removal").
    passthroughs: Vec<Passthrough>,
}

impl DirectConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chain(&mut self, chain: Chain) -> bool {
        if self.chains.iter().any(|c| *c == chain) {
            return false;
        }
        self.chains.push(chain);
        true
    }

    pub fn remove_chain(&mut self, family: Family, table: &str, name: &str) -> Option<Chain> {
        let pos = self
            .chains
            .iter()
            .position(|c| c.family == family && c.table == table && c.name == name)?;
        Some(self.chains.remove(pos))
    }

    #[must_use]
    pub fn query_chain(&self, family: Family, table: &str, name: &str) -> bool {
        self.chains
            .iter()
            .any(|c| c.family == family && c.table == table && c.name == name)
    }

    #[must_use]
    pub fn chains(&self, family: Family, table: &str) -> Vec<&Chain> {
        self.chains
            .iter()
            .filter(|c| c.family == family && c.table == table)
            .collect()
    }

    /// Adds a rule, keeping the set sorted by `priority` ascending — the
    /// order in which they must be applied to the backend so lower
    /// priorities run first (spec.md's direct-rule priority ordering).
    pub fn add_rule(&mut self, rule: DirectRule) -> bool {
        if self.rules.iter().any(|r| same_rule_identity(r, &rule)) {
            return false;
        }
        let pos = self
            .rules
            .iter()
            .position(|r| r.priority > rule.priority)
            .unwrap_or(self.rules.len());
        self.rules.insert(pos, rule);
        true
    }

    pub fn remove_rule(
        &mut self,
        family: Family,
        table: &str,
        chain: &str,
        priority: i32,
        args: &[String],
    ) -> Option<DirectRule> {
        let pos = self.rules.iter().position(|r| {
            r.family == family
                && r.table == table
                && r.chain == chain
                && r.priority == priority
                && r.args == args
        })?;
        Some(self.rules.remove(pos))
    }

    #[must_use]
    pub fn query_rule(
        &self,
        family: Family,
        table: &str,
        chain: &str,
        priority: i32,
        args: &[String],
    ) -> bool {
        self.rules.iter().any(|r| {
            r.family == family
                && r.table == table
                && r.chain == chain
                && r.priority == priority
                && r.args == args
        })
    }

    /// Rules for a given chain, in the priority order they were applied.
    #[must_use]
    pub fn rules(&self, family: Family, table: &str, chain: &str) -> Vec<&DirectRule> {
        self.rules
            .iter()
            .filter(|r| r.family == family && r.table == table && r.chain == chain)
            .collect()
    }

    pub fn remove_all_rules(&mut self) {
        self.rules.clear();
    }

    pub fn add_passthrough(&mut self, passthrough: Passthrough) -> bool {
        if self.passthroughs.contains(&passthrough) {
            return false;
        }
        self.passthroughs.push(passthrough);
        true
    }

    pub fn remove_passthrough(&mut self, family: Family, args: &[String]) -> Option<Passthrough> {
        let pos = self
            .passthroughs
            .iter()
            .position(|p| p.family == family && p.args == args)?;
        Some(self.passthroughs.remove(pos))
    }

    #[must_use]
    pub fn query_passthrough(&self, family: Family, args: &[String]) -> bool {
        self.passthroughs
            .iter()
            .any(|p| p.family == family && p.args == args)
    }

    #[must_use]
    pub fn passthroughs(&self, family: Family) -> Vec<&Passthrough> {
        self.passthroughs.iter().filter(|p| p.family == family).collect()
    }

    /// Drains every tracked passthrough in reverse insertion order, so the
    /// caller can remove them from the backend without referencing a chain
    /// that a later (in insertion order, earlier in removal order) rule
    /// still depends on.
    pub fn drain_passthroughs_reverse(&mut self) -> Vec<Passthrough> {
        let mut drained = std::mem::take(&mut self.passthroughs);
        drained.reverse();
        drained
    }
}

fn same_rule_identity(a: &DirectRule, b: &DirectRule) -> bool {
    a.family == b.family && a.table == b.table && a.chain == b.chain && a.priority == b.priority && a.args == b.args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(priority: i32) -> DirectRule {
        DirectRule {
            family: Family::Ipv4,
            table: "filter".to_owned(),
            chain: "INPUT".to_owned(),
            priority,
            args: vec!["-j".to_owned(), "ACCEPT".to_owned()],
        }
    }

    #[test]
    fn rules_stay_sorted_by_priority() {
        let mut cfg = DirectConfig::new();
        cfg.add_rule(rule(5));
        cfg.add_rule(rule(1));
        cfg.add_rule(rule(3));
        let priorities: Vec<i32> = cfg
            .rules(Family::Ipv4, "filter", "INPUT")
            .iter()
            .map(|r| r.priority)
            .collect();
        assert_eq!(priorities, vec![1, 3, 5]);
    }

    #[test]
    fn duplicate_rule_add_is_a_no_op() {
        let mut cfg = DirectConfig::new();
        assert!(cfg.add_rule(rule(1)));
        assert!(!cfg.add_rule(rule(1)));
        assert_eq!(cfg.rules(Family::Ipv4, "filter", "INPUT").len(), 1);
    }

    #[test]
    fn remove_chain_returns_none_when_absent() {
        let mut cfg = DirectConfig::new();
        assert!(cfg.remove_chain(Family::Ipv4, "filter", "CUSTOM").is_none());
    }

    fn passthrough(args: &[&str]) -> Passthrough {
        Passthrough {
            family: Family::Ipv4,
            args: args.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn passthroughs_drain_in_reverse_insertion_order() {
        let mut cfg = DirectConfig::new();
        cfg.add_passthrough(passthrough(&["-N", "A"]));
        cfg.add_passthrough(passthrough(&["-A", "A", "-j", "ACCEPT"]));

        let drained = cfg.drain_passthroughs_reverse();
        assert_eq!(drained[0], passthrough(&["-A", "A", "-j", "ACCEPT"]));
        assert_eq!(drained[1], passthrough(&["-N", "A"]));
        assert!(cfg.passthroughs(Family::Ipv4).is_empty());
    }

    #[test]
    fn duplicate_passthrough_add_is_a_no_op() {
        let mut cfg = DirectConfig::new();
        assert!(cfg.add_passthrough(passthrough(&["-N", "A"])));
        assert!(!cfg.add_passthrough(passthrough(&["-N", "A"])));
    }
}
