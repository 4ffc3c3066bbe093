//! The `IcmpType` entity (spec.md §3): a named ICMP message type zones can
//! reference from their `icmp_blocks` set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A named ICMP type, restricted to the address families it is defined for
/// (e.g. `echo-request` applies to both; `neighbour-solicitation` is IPv6
/// only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IcmpType {
    pub name: String,
    pub short: String,
    pub description: String,
    /// Families this type is destined for: subset of `{"ipv4", "ipv6"}`.
    /// Empty means "all families", matching firewalld's convention.
    pub destinations: BTreeSet<String>,
}

impl IcmpType {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn applies_to(&self, family: &str) -> bool {
        self.destinations.is_empty() || self.destinations.contains(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_destinations_applies_to_all_families() {
        let t = IcmpType::new("echo-request");
        assert!(t.applies_to("ipv4"));
        assert!(t.applies_to("ipv6"));
    }

    #[test]
    fn restricted_destinations_filter_families() {
        let mut t = IcmpType::new("neighbour-solicitation");
        t.destinations.insert("ipv6".to_owned());
        assert!(!t.applies_to("ipv4"));
        assert!(t.applies_to("ipv6"));
    }
}
