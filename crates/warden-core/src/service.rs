//! The `Service` entity (spec.md §3): a named bundle of ports/protocols/
//! modules a zone can reference by name instead of repeating port lists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::zone::PortRange;

/// A reusable named service definition.
///
/// `short`/`description` are descriptive metadata only (supplemental to
/// spec.md, grounded in firewalld's service XML `short`/`description`
/// elements) — they carry no behavior and are never consulted by the rule
/// compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub short: String,
    pub description: String,
    pub ports: BTreeSet<PortRange>,
    pub protocols: BTreeSet<String>,
    pub modules: BTreeSet<String>,
    pub destinations: BTreeSet<String>,
}

impl Service {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_service_has_no_ports() {
        let svc = Service::new("ssh");
        assert_eq!(svc.name, "ssh");
        assert!(svc.ports.is_empty());
    }
}
