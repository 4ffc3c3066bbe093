//! The `Zone` entity (spec.md §3) and its per-zone collections.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::richrule::RichRule;

/// A zone's default verdict for traffic that matches none of its rules.
///
/// Supplemental to spec.md's prose (grounded in `original_source`'s
/// `ZONE_TARGET`); `Default` defers to the backend's own built-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneTarget {
    Default,
    Accept,
    Drop,
    Reject,
    Continue,
}

impl fmt::Display for ZoneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Default => "default",
            Self::Accept => "ACCEPT",
            Self::Drop => "DROP",
            Self::Reject => "REJECT",
            Self::Continue => "CONTINUE",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ZoneTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" | "" => Ok(Self::Default),
            "ACCEPT" => Ok(Self::Accept),
            "DROP" => Ok(Self::Drop),
            "REJECT" => Ok(Self::Reject),
            "CONTINUE" => Ok(Self::Continue),
            other => Err(format!("unknown zone target '{other}'")),
        }
    }
}

impl Default for ZoneTarget {
    fn default() -> Self {
        Self::Default
    }
}

/// A `{port, protocol}` pair, as used by the ports set and `queryPort`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub port: String,
    pub protocol: String,
}

/// A forwarded port: `{port, protocol, to_port, to_addr}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForwardPort {
    pub port: String,
    pub protocol: String,
    pub to_port: String,
    pub to_addr: String,
}

/// A rich rule bound to a zone: the parsed AST plus the exact text it was
/// parsed from (spec.md requires both — enumeration returns text, the
/// compiler consumes the AST). Equality and set membership are structural
/// over the parsed rule, per spec.md §8 property 5.
#[derive(Debug, Clone)]
pub struct RichRuleEntry {
    pub rule: RichRule,
    pub text: String,
}

impl PartialEq for RichRuleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule
    }
}
impl Eq for RichRuleEntry {}

/// A named policy bucket grouping interfaces/sources with the rules that
/// apply to them (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct Zone {
    pub name: String,
    pub target: ZoneTarget,
    pub interfaces: BTreeSet<String>,
    pub sources: BTreeSet<String>,
    pub services: BTreeSet<String>,
    pub ports: BTreeSet<PortRange>,
    pub protocols: BTreeSet<String>,
    pub icmp_blocks: BTreeSet<String>,
    pub icmp_block_inversion: bool,
    pub forward_ports: BTreeSet<ForwardPort>,
    pub rich_rules: Vec<RichRuleEntry>,
    pub masquerade: bool,
}

impl Zone {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether this zone currently has no interfaces and no sources — used
    /// by `getActiveZones` to decide whether the zone is "active".
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.interfaces.is_empty() || !self.sources.is_empty()
    }

    pub fn add_rich_rule(&mut self, rule: RichRule, text: String) -> bool {
        let entry = RichRuleEntry { rule, text };
        if self.rich_rules.contains(&entry) {
            return false;
        }
        self.rich_rules.push(entry);
        true
    }

    pub fn remove_rich_rule(&mut self, rule: &RichRule) -> Option<RichRuleEntry> {
        let pos = self.rich_rules.iter().position(|e| &e.rule == rule)?;
        Some(self.rich_rules.remove(pos))
    }

    #[must_use]
    pub fn has_rich_rule(&self, rule: &RichRule) -> bool {
        self.rich_rules.iter().any(|e| &e.rule == rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_zone_is_not_active() {
        let zone = Zone::new("public");
        assert!(!zone.is_active());
    }

    #[test]
    fn zone_with_interface_is_active() {
        let mut zone = Zone::new("public");
        zone.interfaces.insert("eth0".to_owned());
        assert!(zone.is_active());
    }

    #[test]
    fn zone_target_round_trips() {
        for t in ["default", "ACCEPT", "DROP", "REJECT", "CONTINUE"] {
            let parsed: ZoneTarget = t.parse().unwrap();
            assert_eq!(parsed.to_string(), t);
        }
    }
}
