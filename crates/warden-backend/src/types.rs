//! Shared value types for the backend abstraction.

use std::fmt;

/// An address family a backend rule applies to.
///
/// `Bridge` corresponds to firewalld's `eb` (ebtables) family used by direct
/// bridge rules; it is independent of `Ipv4`/`Ipv6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Family {
    Ipv4,
    Ipv6,
    Bridge,
}

impl Family {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
            Self::Bridge => "eb",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipv4" => Ok(Self::Ipv4),
            "ipv6" => Ok(Self::Ipv6),
            "eb" => Ok(Self::Bridge),
            other => Err(format!("unknown family '{other}'")),
        }
    }
}

/// Address families (and related feature probes) usable on this host.
///
/// Populated once by [`crate::Backend::probe`] and exposed read-only over
/// the bus as the `IPv4`, `IPv6`, `IPv6_rpfilter`, and `BRIDGE` properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub ipv4: bool,
    pub ipv6: bool,
    pub bridge: bool,
    pub ipv6_rpfilter: bool,
}

/// A chain identity in a backend table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chain {
    pub family: Family,
    pub table: String,
    pub name: String,
}

/// An explicit, priority-ordered direct rule as accepted by the direct interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectRule {
    pub family: Family,
    pub table: String,
    pub chain: String,
    pub priority: i32,
    pub args: Vec<String>,
}

/// A raw command executed against the packet filter outside of the direct
/// rule table. Tracked passthroughs are recorded by the caller (see
/// `warden-core::model::direct`); this type only carries what the backend
/// needs to execute one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passthrough {
    pub family: Family,
    pub args: Vec<String>,
}

/// A rule compiled from a high-level `warden-core` model element (a service
/// port, a forward port, masquerade, an icmp block, a rich rule, ...).
///
/// `id` is a stable, deterministic identifier derived from the model element
/// it was compiled from (see `warden-core::rulemap`); backends use it to
/// make `apply_rule`/`remove_rule` idempotent without needing to diff full
/// rule text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDescriptor {
    pub id: String,
    pub family: Family,
    pub table: String,
    pub chain: String,
    pub args: Vec<String>,
}
