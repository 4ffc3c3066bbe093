//! D-Bus wire DTOs.
//!
//! `warden-core`'s domain types carry no opinion about wire format — `Zone`
//! in particular holds parsed [`warden_core::RichRule`] ASTs that have no
//! reason to be (de)serializable. `ZoneDto` is the flat, JSON-friendly
//! projection `getZoneSettings`/`listAllZoneSettings` actually return,
//! encoded as a JSON string in a single `s` D-Bus argument rather than a
//! hand-written `zvariant` struct signature for every nested collection.

use serde::Serialize;

use warden_core::{ForwardPort, PortRange, Zone};

#[derive(Debug, Serialize)]
pub struct ZoneDto {
    pub name: String,
    pub target: String,
    pub interfaces: Vec<String>,
    pub sources: Vec<String>,
    pub services: Vec<String>,
    pub ports: Vec<PortRange>,
    pub protocols: Vec<String>,
    pub icmp_blocks: Vec<String>,
    pub icmp_block_inversion: bool,
    pub forward_ports: Vec<ForwardPort>,
    pub rich_rules: Vec<String>,
    pub masquerade: bool,
}

impl From<&Zone> for ZoneDto {
    fn from(zone: &Zone) -> Self {
        Self {
            name: zone.name.clone(),
            target: zone.target.to_string(),
            interfaces: zone.interfaces.iter().cloned().collect(),
            sources: zone.sources.iter().cloned().collect(),
            services: zone.services.iter().cloned().collect(),
            ports: zone.ports.iter().cloned().collect(),
            protocols: zone.protocols.iter().cloned().collect(),
            icmp_blocks: zone.icmp_blocks.iter().cloned().collect(),
            icmp_block_inversion: zone.icmp_block_inversion,
            forward_ports: zone.forward_ports.iter().cloned().collect(),
            rich_rules: zone.rich_rules.iter().map(|entry| entry.text.clone()).collect(),
            masquerade: zone.masquerade,
        }
    }
}
