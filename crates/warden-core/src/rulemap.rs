//! The single point of truth mapping policy state to backend rules: every
//! zone element, direct rule, and rich rule passes through here on its way
//! to [`warden_backend::Backend`]. Nothing else in this crate is allowed to
//! construct a [`RuleDescriptor`] directly (spec.md §5).

use warden_backend::{Capabilities, Family, RuleDescriptor};

use crate::model::Model;
use crate::richrule::{Action, Element, RichRule};
use crate::zone::{ForwardPort, PortRange, Zone};

const TABLE: &str = "filter";

fn chain_for(zone: &str) -> String {
    format!("warden_zone_{zone}")
}

/// Compiles the single rule a zone's `masquerade` flag implies. Used both by
/// [`compile_zone`] and by `RuntimeCore` for incremental apply/remove of one
/// element without recompiling the whole zone.
#[must_use]
pub(crate) fn masquerade_descriptor(zone: &str, family: Family) -> RuleDescriptor {
    RuleDescriptor {
        id: format!("zone:{zone}:masquerade:{family}"),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args: vec!["masquerade".to_owned()],
    }
}

#[must_use]
pub(crate) fn forward_port_descriptor(zone: &str, family: Family, fp: &ForwardPort) -> RuleDescriptor {
    RuleDescriptor {
        id: format!(
            "zone:{zone}:forward-port:{}:{}:{}:{}",
            fp.port, fp.protocol, fp.to_port, fp.to_addr
        ),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args: forward_port_args(&fp.port, &fp.protocol, &fp.to_port, &fp.to_addr),
    }
}

#[must_use]
pub(crate) fn port_descriptor(zone: &str, family: Family, p: &PortRange) -> RuleDescriptor {
    RuleDescriptor {
        id: format!("zone:{zone}:port:{}:{}", p.port, p.protocol),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args: accept_port_args(&p.port, &p.protocol),
    }
}

#[must_use]
pub(crate) fn protocol_descriptor(zone: &str, family: Family, protocol: &str) -> RuleDescriptor {
    RuleDescriptor {
        id: format!("zone:{zone}:protocol:{protocol}"),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args: accept_protocol_args(protocol),
    }
}

/// The rule a single icmp-block entry compiles to, honoring the zone's
/// `icmp_block_inversion` flag (accept instead of drop when inverted).
#[must_use]
pub(crate) fn icmp_block_descriptor(
    zone: &str,
    family: Family,
    icmp_type: &str,
    inverted: bool,
) -> RuleDescriptor {
    let verdict = if inverted { "accept" } else { "drop" };
    RuleDescriptor {
        id: format!("zone:{zone}:icmp:{}:{icmp_type}", if inverted { "allow" } else { "block" }),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args: icmp_type_args(icmp_type, verdict),
    }
}

/// The inverted-default-drop rule installed once a zone's icmp-block
/// inversion is enabled (spec.md §2: everything not explicitly allow-listed
/// is dropped).
#[must_use]
pub(crate) fn icmp_inversion_default_drop_descriptor(zone: &str, family: Family) -> RuleDescriptor {
    RuleDescriptor {
        id: format!("zone:{zone}:icmp:inverted-default-drop"),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args: vec!["meta".to_owned(), "l4proto".to_owned(), "icmp".to_owned(), "drop".to_owned()],
    }
}

/// The rules a named service expands to in `zone`: one per port, one per
/// protocol. Empty if the service is unknown (the caller validates
/// existence before this is reached).
#[must_use]
pub(crate) fn service_descriptors(
    model: &Model,
    zone: &str,
    family: Family,
    service_name: &str,
) -> Vec<RuleDescriptor> {
    let Some(service) = model.service(service_name) else {
        return Vec::new();
    };
    let mut rules = Vec::new();
    for p in &service.ports {
        rules.push(RuleDescriptor {
            id: format!("zone:{zone}:service:{service_name}:port:{}:{}", p.port, p.protocol),
            family,
            table: TABLE.to_owned(),
            chain: chain_for(zone),
            args: accept_port_args(&p.port, &p.protocol),
        });
    }
    for proto in &service.protocols {
        rules.push(RuleDescriptor {
            id: format!("zone:{zone}:service:{service_name}:protocol:{proto}"),
            family,
            table: TABLE.to_owned(),
            chain: chain_for(zone),
            args: accept_protocol_args(proto),
        });
    }
    rules
}

/// The rule a rich rule compiles to, or `None` for a log/audit-only rule
/// with no packet-filter verdict.
///
/// The id is content-addressed (derived from the rule's own serialized
/// text, not its position in the zone's rich-rule list) so incremental
/// add/remove and a full `reload` recompile agree on the same id for the
/// same rule regardless of what else is present.
#[must_use]
pub(crate) fn rich_rule_descriptor(zone: &str, family: Family, rule: &RichRule) -> Option<RuleDescriptor> {
    compile_rich_rule(rule).map(|args| RuleDescriptor {
        id: format!("zone:{zone}:rich-rule:{}", rule_fingerprint(rule)),
        family,
        table: TABLE.to_owned(),
        chain: chain_for(zone),
        args,
    })
}

/// A short, deterministic fingerprint of a rich rule's serialized form,
/// stable across process restarts (used only to key backend rule ids).
fn rule_fingerprint(rule: &RichRule) -> String {
    use std::fmt::Write as _;
    use std::hash::{Hash, Hasher};

    let text = rule.to_string();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    let mut out = String::new();
    let _ = write!(out, "{:016x}", hasher.finish());
    out
}

const DISPATCH_CHAIN: &str = "warden_dispatch";

/// The dispatch rule that routes ingress traffic arriving on `interface`
/// into `zone`'s chain — what makes an interface binding (`Model::bind_interface`)
/// actually affect packet filtering rather than being bookkeeping only.
#[must_use]
pub(crate) fn interface_binding_descriptor(zone: &str, family: Family, interface: &str) -> RuleDescriptor {
    RuleDescriptor {
        id: format!("zone:{zone}:interface:{interface}"),
        family,
        table: TABLE.to_owned(),
        chain: DISPATCH_CHAIN.to_owned(),
        args: vec![
            "iifname".to_owned(),
            interface.to_owned(),
            "jump".to_owned(),
            chain_for(zone),
        ],
    }
}

/// As [`interface_binding_descriptor`], for a source address/CIDR binding.
#[must_use]
pub(crate) fn source_binding_descriptor(zone: &str, family: Family, source: &str) -> RuleDescriptor {
    RuleDescriptor {
        id: format!("zone:{zone}:source:{source}"),
        family,
        table: TABLE.to_owned(),
        chain: DISPATCH_CHAIN.to_owned(),
        args: vec![
            "ip".to_owned(),
            "saddr".to_owned(),
            source.to_owned(),
            "jump".to_owned(),
            chain_for(zone),
        ],
    }
}

/// Compiles every enabled element of `zone` into the rule set that should
/// be present on the backend for address family `family`, in application
/// order (masquerade and forward-port DNAT first, then services/ports, then
/// icmp, then rich rules last so explicit rich rules can override the
/// broader defaults — mirroring firewalld's own layering).
#[must_use]
pub fn compile_zone(model: &Model, zone: &Zone, family: Family, caps: Capabilities) -> Vec<RuleDescriptor> {
    if !family_available(family, caps) {
        return Vec::new();
    }

    let mut rules = Vec::new();

    if zone.masquerade {
        rules.push(masquerade_descriptor(&zone.name, family));
    }

    for fp in &zone.forward_ports {
        rules.push(forward_port_descriptor(&zone.name, family, fp));
    }

    for service_name in &zone.services {
        rules.extend(service_descriptors(model, &zone.name, family, service_name));
    }

    for p in &zone.ports {
        rules.push(port_descriptor(&zone.name, family, p));
    }

    for proto in &zone.protocols {
        rules.push(protocol_descriptor(&zone.name, family, proto));
    }

    // `icmp_block_inversion` swaps the verdict: normally `icmp_blocks`
    // names the types to drop and everything else is accepted implicitly
    // by the zone target; inverted, `icmp_blocks` names the types to
    // *accept* and every other icmp type is dropped (spec.md §2).
    if zone.icmp_block_inversion {
        rules.push(icmp_inversion_default_drop_descriptor(&zone.name, family));
    }
    for t in &zone.icmp_blocks {
        rules.push(icmp_block_descriptor(&zone.name, family, t, zone.icmp_block_inversion));
    }

    for entry in &zone.rich_rules {
        if let Some(descriptor) = rich_rule_descriptor(&zone.name, family, &entry.rule) {
            rules.push(descriptor);
        }
    }

    rules
}

fn family_available(family: Family, caps: Capabilities) -> bool {
    match family {
        Family::Ipv4 => caps.ipv4,
        Family::Ipv6 => caps.ipv6,
        Family::Bridge => caps.bridge,
    }
}

fn accept_port_args(port: &str, protocol: &str) -> Vec<String> {
    vec![
        protocol.to_owned(),
        "dport".to_owned(),
        port.to_owned(),
        "accept".to_owned(),
    ]
}

fn accept_protocol_args(protocol: &str) -> Vec<String> {
    vec!["meta".to_owned(), "l4proto".to_owned(), protocol.to_owned(), "accept".to_owned()]
}

fn icmp_type_args(icmp_type: &str, verdict: &str) -> Vec<String> {
    vec![
        "icmp".to_owned(),
        "type".to_owned(),
        icmp_type.to_owned(),
        verdict.to_owned(),
    ]
}

fn forward_port_args(port: &str, protocol: &str, to_port: &str, to_addr: &str) -> Vec<String> {
    let mut args = vec![
        protocol.to_owned(),
        "dport".to_owned(),
        port.to_owned(),
        "dnat".to_owned(),
        "to".to_owned(),
    ];
    if to_addr.is_empty() {
        args.push(format!(":{to_port}"));
    } else if to_port.is_empty() {
        args.push(to_addr.to_owned());
    } else {
        args.push(format!("{to_addr}:{to_port}"));
    }
    args
}

/// Compiles a parsed rich rule's element and action into backend args.
/// Returns `None` for rich rules that name no element and no action (a
/// log/audit-only rule contributes no packet-filter verdict and so has
/// nothing to compile to — the backend has no standalone logging chain).
fn compile_rich_rule(rule: &RichRule) -> Option<Vec<String>> {
    let mut args = Vec::new();

    if let Some(ref source) = rule.source {
        if let Some(ref addr) = source.address {
            args.push("ip".to_owned());
            args.push("saddr".to_owned());
            if source.not {
                args.push("!=".to_owned());
            }
            args.push(addr.clone());
        }
    }
    if let Some(ref dest) = rule.destination {
        if let Some(ref addr) = dest.address {
            args.push("ip".to_owned());
            args.push("daddr".to_owned());
            if dest.not {
                args.push("!=".to_owned());
            }
            args.push(addr.clone());
        }
    }

    match &rule.element {
        Element::Service { name } => {
            args.push("service".to_owned());
            args.push(name.clone());
        }
        Element::Port { port, protocol } => {
            args.push(protocol.clone());
            args.push("dport".to_owned());
            args.push(port.clone());
        }
        Element::Protocol { value } => {
            args.push("meta".to_owned());
            args.push("l4proto".to_owned());
            args.push(value.clone());
        }
        Element::IcmpBlock { name } => {
            args.push("icmp".to_owned());
            args.push("type".to_owned());
            args.push(name.clone());
        }
        Element::Masquerade => args.push("masquerade".to_owned()),
        Element::ForwardPort { port, protocol, to_port, to_addr } => {
            args.extend(forward_port_args(port, protocol, to_port, to_addr));
        }
        Element::None => {}
    }

    match &rule.action {
        Some(Action::Accept { .. }) => args.push("accept".to_owned()),
        Some(Action::Reject { .. }) => args.push("reject".to_owned()),
        Some(Action::Drop { .. }) => args.push("drop".to_owned()),
        Some(Action::Mark { set, .. }) => {
            args.push("meta".to_owned());
            args.push("mark".to_owned());
            args.push("set".to_owned());
            args.push(set.clone());
        }
        None if matches!(rule.element, Element::None) => return None,
        None => args.push("accept".to_owned()),
    }

    Some(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richrule::parse;

    fn all_caps() -> Capabilities {
        Capabilities { ipv4: true, ipv6: true, bridge: true, ipv6_rpfilter: true }
    }

    #[test]
    fn masquerade_compiles_to_a_single_rule() {
        let model = Model::new();
        let mut zone = Zone::new("public");
        zone.masquerade = true;
        let rules = compile_zone(&model, &zone, Family::Ipv4, all_caps());
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].args, vec!["masquerade".to_owned()]);
    }

    #[test]
    fn unavailable_family_compiles_to_nothing() {
        let model = Model::new();
        let mut zone = Zone::new("public");
        zone.masquerade = true;
        let caps = Capabilities { ipv4: false, ..all_caps() };
        assert!(compile_zone(&model, &zone, Family::Ipv4, caps).is_empty());
    }

    #[test]
    fn icmp_block_inversion_flips_default_verdict() {
        let model = Model::new();
        let mut zone = Zone::new("public");
        zone.icmp_block_inversion = true;
        zone.icmp_blocks.insert("echo-request".to_owned());
        let rules = compile_zone(&model, &zone, Family::Ipv4, all_caps());
        assert!(rules.iter().any(|r| r.id.contains("inverted-default-drop")));
        assert!(rules.iter().any(|r| r.args.last() == Some(&"accept".to_owned())));
    }

    #[test]
    fn rich_rule_compiles_with_source_and_action() {
        let rule = parse(r#"rule source address="10.0.0.0/8" service name="ssh" drop"#).unwrap();
        let args = compile_rich_rule(&rule).unwrap();
        assert_eq!(args.first().map(String::as_str), Some("ip"));
        assert_eq!(args.last().map(String::as_str), Some("drop"));
    }

    #[test]
    fn rich_rule_with_no_explicit_action_defaults_to_accept() {
        let rule = parse(r#"rule service name="ssh" log prefix="SSH ""#).unwrap();
        let args = compile_rich_rule(&rule).unwrap();
        assert_eq!(args.last().map(String::as_str), Some("accept"));
    }
}
