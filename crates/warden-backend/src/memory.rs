//! In-memory recording backend, for testing only.

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::error::BackendError;
use crate::types::{Capabilities, Chain, DirectRule, Family, RuleDescriptor};

#[derive(Debug, Default)]
struct State {
    applied_rules: HashSet<String>,
    chains: HashSet<(Family, String, String)>,
    direct_rules: Vec<DirectRule>,
    passthrough_log: Vec<(Family, Vec<String>)>,
    flushed: u32,
}

/// An in-memory [`crate::Backend`] that records every call instead of
/// touching the kernel. Used by every `warden-core` unit test in place of
/// a real `nft`/`iptables` process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    capabilities: Capabilities,
}

impl MemoryBackend {
    /// Create a backend reporting every address family as usable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            capabilities: Capabilities {
                ipv4: true,
                ipv6: true,
                bridge: true,
                ipv6_rpfilter: true,
            },
        }
    }

    /// Create a backend that reports the given capabilities, for exercising
    /// family-unavailable paths.
    #[must_use]
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            state: Mutex::new(State::default()),
            capabilities,
        }
    }

    /// Rule IDs currently applied, for test assertions.
    pub async fn applied_rule_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().await.applied_rules.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether a given rule id is currently applied.
    pub async fn has_rule(&self, id: &str) -> bool {
        self.state.lock().await.applied_rules.contains(id)
    }

    /// Number of times `flush_all` has been called, for test assertions.
    pub async fn flush_count(&self) -> u32 {
        self.state.lock().await.flushed
    }

    /// Recorded untracked passthrough invocations, for test assertions.
    pub async fn passthrough_log(&self) -> Vec<(Family, Vec<String>)> {
        self.state.lock().await.passthrough_log.clone()
    }
}

#[async_trait::async_trait]
impl crate::Backend for MemoryBackend {
    async fn probe(&self) -> Result<Capabilities, BackendError> {
        Ok(self.capabilities)
    }

    async fn apply_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError> {
        self.require_family(rule.family)?;
        self.state.lock().await.applied_rules.insert(rule.id.clone());
        Ok(())
    }

    async fn remove_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError> {
        self.state.lock().await.applied_rules.remove(&rule.id);
        Ok(())
    }

    async fn add_chain(&self, chain: &Chain) -> Result<(), BackendError> {
        self.require_family(chain.family)?;
        let key = (chain.family, chain.table.clone(), chain.name.clone());
        let mut guard = self.state.lock().await;
        if !guard.chains.insert(key) {
            return Err(BackendError::ChainAlreadyExists {
                table: chain.table.clone(),
                chain: chain.name.clone(),
            });
        }
        Ok(())
    }

    async fn remove_chain(&self, chain: &Chain) -> Result<(), BackendError> {
        let key = (chain.family, chain.table.clone(), chain.name.clone());
        let mut guard = self.state.lock().await;
        if !guard.chains.remove(&key) {
            return Err(BackendError::ChainNotFound {
                table: chain.table.clone(),
                chain: chain.name.clone(),
            });
        }
        Ok(())
    }

    async fn list_chains(&self, family: Family, table: &str) -> Result<Vec<String>, BackendError> {
        let guard = self.state.lock().await;
        let mut names: Vec<String> = guard
            .chains
            .iter()
            .filter(|(f, t, _)| *f == family && t == table)
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn add_direct_rule(&self, rule: &DirectRule) -> Result<(), BackendError> {
        self.require_family(rule.family)?;
        self.state.lock().await.direct_rules.push(rule.clone());
        Ok(())
    }

    async fn remove_direct_rule(&self, rule: &DirectRule) -> Result<(), BackendError> {
        let mut guard = self.state.lock().await;
        let before = guard.direct_rules.len();
        guard.direct_rules.retain(|r| r != rule);
        if guard.direct_rules.len() == before {
            return Err(BackendError::RuleNotFound {
                table: rule.table.clone(),
                chain: rule.chain.clone(),
                priority: rule.priority,
            });
        }
        Ok(())
    }

    async fn list_direct_rules(
        &self,
        family: Family,
        table: &str,
        chain: &str,
    ) -> Result<Vec<DirectRule>, BackendError> {
        let guard = self.state.lock().await;
        let mut rules: Vec<DirectRule> = guard
            .direct_rules
            .iter()
            .filter(|r| r.family == family && r.table == table && r.chain == chain)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.priority);
        Ok(rules)
    }

    async fn passthrough(&self, family: Family, args: &[String]) -> Result<String, BackendError> {
        self.require_family(family)?;
        self.state
            .lock()
            .await
            .passthrough_log
            .push((family, args.to_vec()));
        Ok(String::new())
    }

    async fn flush_all(&self) -> Result<(), BackendError> {
        let mut guard = self.state.lock().await;
        guard.applied_rules.clear();
        guard.chains.clear();
        guard.direct_rules.clear();
        guard.flushed += 1;
        Ok(())
    }
}

impl MemoryBackend {
    fn require_family(&self, family: Family) -> Result<(), BackendError> {
        let usable = match family {
            Family::Ipv4 => self.capabilities.ipv4,
            Family::Ipv6 => self.capabilities.ipv6,
            Family::Bridge => self.capabilities.bridge,
        };
        if usable {
            Ok(())
        } else {
            Err(BackendError::FamilyUnavailable {
                family: family.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;

    fn rule(id: &str) -> RuleDescriptor {
        RuleDescriptor {
            id: id.to_owned(),
            family: Family::Ipv4,
            table: "filter".to_owned(),
            chain: "warden_public".to_owned(),
            args: vec!["-j".to_owned(), "ACCEPT".to_owned()],
        }
    }

    #[tokio::test]
    async fn apply_then_has_rule() {
        let backend = MemoryBackend::new();
        backend.apply_rule(&rule("r1")).await.unwrap();
        assert!(backend.has_rule("r1").await);
    }

    #[tokio::test]
    async fn apply_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.apply_rule(&rule("r1")).await.unwrap();
        backend.apply_rule(&rule("r1")).await.unwrap();
        assert_eq!(backend.applied_rule_ids().await, vec!["r1".to_owned()]);
    }

    #[tokio::test]
    async fn remove_absent_rule_is_not_an_error() {
        let backend = MemoryBackend::new();
        backend.remove_rule(&rule("missing")).await.unwrap();
    }

    #[tokio::test]
    async fn flush_all_clears_everything() {
        let backend = MemoryBackend::new();
        backend.apply_rule(&rule("r1")).await.unwrap();
        backend
            .add_chain(&Chain {
                family: Family::Ipv4,
                table: "filter".to_owned(),
                name: "warden_public".to_owned(),
            })
            .await
            .unwrap();
        backend.flush_all().await.unwrap();
        assert!(backend.applied_rule_ids().await.is_empty());
        assert_eq!(backend.flush_count().await, 1);
    }

    #[tokio::test]
    async fn unavailable_family_rejects_rules() {
        let backend = MemoryBackend::with_capabilities(Capabilities {
            ipv4: true,
            ipv6: false,
            bridge: false,
            ipv6_rpfilter: false,
        });
        let mut r = rule("r1");
        r.family = Family::Ipv6;
        let err = backend.apply_rule(&r).await.unwrap_err();
        assert!(matches!(err, BackendError::FamilyUnavailable { .. }));
    }

    #[tokio::test]
    async fn duplicate_chain_add_is_an_error() {
        let backend = MemoryBackend::new();
        let chain = Chain {
            family: Family::Ipv4,
            table: "filter".to_owned(),
            name: "c".to_owned(),
        };
        backend.add_chain(&chain).await.unwrap();
        let err = backend.add_chain(&chain).await.unwrap_err();
        assert!(matches!(err, BackendError::ChainAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn direct_rules_list_in_priority_order() {
        let backend = MemoryBackend::new();
        let mk = |priority: i32| DirectRule {
            family: Family::Ipv4,
            table: "filter".to_owned(),
            chain: "c".to_owned(),
            priority,
            args: vec!["-j".to_owned(), "ACCEPT".to_owned()],
        };
        backend.add_direct_rule(&mk(5)).await.unwrap();
        backend.add_direct_rule(&mk(1)).await.unwrap();
        backend.add_direct_rule(&mk(3)).await.unwrap();

        let listed = backend
            .list_direct_rules(Family::Ipv4, "filter", "c")
            .await
            .unwrap();
        let priorities: Vec<i32> = listed.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![1, 3, 5]);
    }
}
