//! `org.warden.Warden1.zone`: per-zone interface/source/element mutators
//! and queries, plus the zone catalog itself.

use zbus::interface;
use zbus::object_server::SignalEmitter;

use warden_core::{CallerIdentity, ZoneElement, ZoneTarget};

use crate::actor::Handle;
use crate::caller;
use crate::dto::ZoneDto;
use crate::error::map;

pub struct ZoneIface {
    pub handle: Handle,
}

impl ZoneIface {
    async fn resolve_caller(&self, connection: &zbus::Connection, header: &zbus::message::Header<'_>) -> CallerIdentity {
        match header.sender() {
            Some(sender) => caller::resolve(connection, sender).await,
            None => CallerIdentity::default(),
        }
    }
}

#[interface(name = "org.warden.Warden1.zone")]
impl ZoneIface {
    #[zbus(name = "getZones")]
    async fn get_zones(&self) -> Vec<String> {
        self.handle.zone_names().await
    }

    #[zbus(name = "getActiveZones")]
    async fn get_active_zones(&self) -> String {
        let zones = self.handle.active_zones().await;
        let dtos: Vec<ZoneDto> = zones.iter().map(ZoneDto::from).collect();
        serde_json::to_string(&dtos).unwrap_or_else(|_| "[]".to_owned())
    }

    #[zbus(name = "listAllZoneSettings")]
    async fn list_all_zone_settings(&self) -> String {
        let all = self.handle.list_all_zone_settings().await;
        let dtos: Vec<(String, ZoneDto)> = all.iter().map(|(name, zone)| (name.clone(), ZoneDto::from(zone))).collect();
        serde_json::to_string(&dtos).unwrap_or_else(|_| "[]".to_owned())
    }

    #[zbus(name = "getZoneOfInterface")]
    async fn get_zone_of_interface(&self, interface: String) -> String {
        self.handle.get_zone_of_interface(interface).await
    }

    #[zbus(name = "getZoneOfSource")]
    async fn get_zone_of_source(&self, source: String) -> String {
        self.handle.get_zone_of_source(source).await
    }

    #[zbus(name = "isImmutable")]
    async fn is_immutable(&self, zone: String) -> bool {
        self.handle.is_immutable(zone).await
    }

    #[zbus(name = "getZoneTarget")]
    async fn get_zone_target(&self, zone: String) -> String {
        self.handle.get_zone_target(zone).await.to_string()
    }

    #[zbus(name = "setZoneTarget")]
    async fn set_zone_target(
        &self,
        zone: String,
        target: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let parsed: ZoneTarget = target.parse().map_err(zbus::fdo::Error::InvalidArgs)?;
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.set_zone_target(zone, parsed, caller).await)?;
        let _ = Self::zone_target_changed(&emitter, resolved.clone(), target).await;
        Ok(resolved)
    }

    #[zbus(name = "addInterface")]
    async fn add_interface(
        &self,
        zone: String,
        interface: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_interface(zone, interface.clone(), caller).await)?;
        let _ = Self::zone_of_interface_changed(&emitter, resolved.clone(), interface).await;
        Ok(resolved)
    }

    #[zbus(name = "removeInterface")]
    async fn remove_interface(
        &self,
        zone: String,
        interface: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_interface(zone, interface.clone(), caller).await)?;
        let _ = Self::zone_of_interface_changed(&emitter, String::new(), interface).await;
        Ok(resolved)
    }

    #[zbus(name = "queryInterface")]
    async fn query_interface(&self, zone: String, interface: String) -> bool {
        self.handle.query_interface(zone, interface).await
    }

    #[zbus(name = "addSource")]
    async fn add_source(
        &self,
        zone: String,
        source: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_source(zone, source.clone(), caller).await)?;
        let _ = Self::zone_of_source_changed(&emitter, resolved.clone(), source).await;
        Ok(resolved)
    }

    #[zbus(name = "removeSource")]
    async fn remove_source(
        &self,
        zone: String,
        source: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_source(zone, source.clone(), caller).await)?;
        let _ = Self::zone_of_source_changed(&emitter, String::new(), source).await;
        Ok(resolved)
    }

    #[zbus(name = "querySource")]
    async fn query_source(&self, zone: String, source: String) -> bool {
        self.handle.query_source(zone, source).await
    }

    #[zbus(name = "addService")]
    async fn add_service(
        &self,
        zone: String,
        service: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_service(zone, service.clone(), timeout, caller).await)?;
        let _ = Self::service_added(&emitter, resolved.clone(), service, timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removeService")]
    async fn remove_service(
        &self,
        zone: String,
        service: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_service(zone, service.clone(), caller).await)?;
        let _ = Self::service_removed(&emitter, resolved.clone(), service).await;
        Ok(resolved)
    }

    #[zbus(name = "queryService")]
    async fn query_service(&self, zone: String, service: String) -> bool {
        self.handle.query_service(zone, service).await
    }

    #[zbus(name = "addPort")]
    async fn add_port(
        &self,
        zone: String,
        port: String,
        protocol: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let element = ZoneElement::Port(warden_core::PortRange { port: port.clone(), protocol: protocol.clone() });
        let resolved = map(self.handle.add_element(zone, element, timeout, caller).await)?;
        let _ = Self::port_added(&emitter, resolved.clone(), port, protocol, timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removePort")]
    async fn remove_port(
        &self,
        zone: String,
        port: String,
        protocol: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let element = ZoneElement::Port(warden_core::PortRange { port: port.clone(), protocol: protocol.clone() });
        let resolved = map(self.handle.remove_element(zone, element, caller).await)?;
        let _ = Self::port_removed(&emitter, resolved.clone(), port, protocol).await;
        Ok(resolved)
    }

    #[zbus(name = "queryPort")]
    async fn query_port(&self, zone: String, port: String, protocol: String) -> bool {
        let element = ZoneElement::Port(warden_core::PortRange { port, protocol });
        self.handle.query_element(zone, element).await
    }

    #[zbus(name = "addProtocol")]
    async fn add_protocol(
        &self,
        zone: String,
        protocol: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_element(zone, ZoneElement::Protocol(protocol.clone()), timeout, caller).await)?;
        let _ = Self::protocol_added(&emitter, resolved.clone(), protocol, timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removeProtocol")]
    async fn remove_protocol(
        &self,
        zone: String,
        protocol: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_element(zone, ZoneElement::Protocol(protocol.clone()), caller).await)?;
        let _ = Self::protocol_removed(&emitter, resolved.clone(), protocol).await;
        Ok(resolved)
    }

    #[zbus(name = "queryProtocol")]
    async fn query_protocol(&self, zone: String, protocol: String) -> bool {
        self.handle.query_element(zone, ZoneElement::Protocol(protocol)).await
    }

    #[zbus(name = "addMasquerade")]
    async fn add_masquerade(
        &self,
        zone: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_element(zone, ZoneElement::Masquerade, timeout, caller).await)?;
        let _ = Self::masquerade_added(&emitter, resolved.clone(), timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removeMasquerade")]
    async fn remove_masquerade(
        &self,
        zone: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_element(zone, ZoneElement::Masquerade, caller).await)?;
        let _ = Self::masquerade_removed(&emitter, resolved.clone()).await;
        Ok(resolved)
    }

    #[zbus(name = "queryMasquerade")]
    async fn query_masquerade(&self, zone: String) -> bool {
        self.handle.query_element(zone, ZoneElement::Masquerade).await
    }

    #[zbus(name = "addForwardPort")]
    #[allow(clippy::too_many_arguments)]
    async fn add_forward_port(
        &self,
        zone: String,
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let element = ZoneElement::ForwardPort(warden_core::ForwardPort {
            port: port.clone(),
            protocol: protocol.clone(),
            to_port: to_port.clone(),
            to_addr: to_addr.clone(),
        });
        let resolved = map(self.handle.add_element(zone, element, timeout, caller).await)?;
        let _ = Self::forward_port_added(&emitter, resolved.clone(), port, protocol, to_port, to_addr, timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removeForwardPort")]
    async fn remove_forward_port(
        &self,
        zone: String,
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let element = ZoneElement::ForwardPort(warden_core::ForwardPort {
            port: port.clone(),
            protocol: protocol.clone(),
            to_port: to_port.clone(),
            to_addr: to_addr.clone(),
        });
        let resolved = map(self.handle.remove_element(zone, element, caller).await)?;
        let _ = Self::forward_port_removed(&emitter, resolved.clone(), port, protocol, to_port, to_addr).await;
        Ok(resolved)
    }

    #[zbus(name = "queryForwardPort")]
    async fn query_forward_port(&self, zone: String, port: String, protocol: String, to_port: String, to_addr: String) -> bool {
        let element = ZoneElement::ForwardPort(warden_core::ForwardPort { port, protocol, to_port, to_addr });
        self.handle.query_element(zone, element).await
    }

    #[zbus(name = "addRichRule")]
    async fn add_rich_rule(
        &self,
        zone: String,
        rule: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_rich_rule(zone, rule.clone(), timeout, caller).await)?;
        let _ = Self::rich_rule_added(&emitter, resolved.clone(), rule, timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removeRichRule")]
    async fn remove_rich_rule(
        &self,
        zone: String,
        rule: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_rich_rule(zone, rule.clone(), caller).await)?;
        let _ = Self::rich_rule_removed(&emitter, resolved.clone(), rule).await;
        Ok(resolved)
    }

    #[zbus(name = "queryRichRule")]
    async fn query_rich_rule(&self, zone: String, rule: String) -> bool {
        self.handle.query_rich_rule(zone, rule).await
    }

    #[zbus(name = "addIcmpBlock")]
    async fn add_icmp_block(
        &self,
        zone: String,
        icmp_type: String,
        timeout: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_icmp_block(zone, icmp_type.clone(), timeout, caller).await)?;
        let _ = Self::icmp_block_added(&emitter, resolved.clone(), icmp_type, timeout).await;
        Ok(resolved)
    }

    #[zbus(name = "removeIcmpBlock")]
    async fn remove_icmp_block(
        &self,
        zone: String,
        icmp_type: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_icmp_block(zone, icmp_type.clone(), caller).await)?;
        let _ = Self::icmp_block_removed(&emitter, resolved.clone(), icmp_type).await;
        Ok(resolved)
    }

    #[zbus(name = "queryIcmpBlock")]
    async fn query_icmp_block(&self, zone: String, icmp_type: String) -> bool {
        self.handle.query_icmp_block(zone, icmp_type).await
    }

    #[zbus(name = "addIcmpBlockInversion")]
    async fn add_icmp_block_inversion(
        &self,
        zone: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.add_icmp_block_inversion(zone, caller).await)?;
        let _ = Self::icmp_block_inversion_added(&emitter, resolved.clone()).await;
        Ok(resolved)
    }

    #[zbus(name = "removeIcmpBlockInversion")]
    async fn remove_icmp_block_inversion(
        &self,
        zone: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<String> {
        let caller = self.resolve_caller(connection, &header).await;
        let resolved = map(self.handle.remove_icmp_block_inversion(zone, caller).await)?;
        let _ = Self::icmp_block_inversion_removed(&emitter, resolved.clone()).await;
        Ok(resolved)
    }

    #[zbus(name = "queryIcmpBlockInversion")]
    async fn query_icmp_block_inversion(&self, zone: String) -> bool {
        self.handle.query_icmp_block_inversion(zone).await
    }

    #[zbus(signal)]
    pub async fn zone_of_interface_changed(emitter: &SignalEmitter<'_>, zone: String, interface: String) -> zbus::Result<()>;
    /// Deprecated alias of `zone_of_interface_changed`, kept for clients still
    /// watching the old name; emitted alongside it, never alone.
    #[zbus(signal)]
    pub async fn zone_changed(emitter: &SignalEmitter<'_>, zone: String, interface: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn zone_of_source_changed(emitter: &SignalEmitter<'_>, zone: String, source: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn zone_target_changed(emitter: &SignalEmitter<'_>, zone: String, target: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn service_added(emitter: &SignalEmitter<'_>, zone: String, service: String, timeout: u32) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn service_removed(emitter: &SignalEmitter<'_>, zone: String, service: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn port_added(emitter: &SignalEmitter<'_>, zone: String, port: String, protocol: String, timeout: u32) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn port_removed(emitter: &SignalEmitter<'_>, zone: String, port: String, protocol: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn protocol_added(emitter: &SignalEmitter<'_>, zone: String, protocol: String, timeout: u32) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn protocol_removed(emitter: &SignalEmitter<'_>, zone: String, protocol: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn masquerade_added(emitter: &SignalEmitter<'_>, zone: String, timeout: u32) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn masquerade_removed(emitter: &SignalEmitter<'_>, zone: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn forward_port_added(
        emitter: &SignalEmitter<'_>,
        zone: String,
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
        timeout: u32,
    ) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn forward_port_removed(
        emitter: &SignalEmitter<'_>,
        zone: String,
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
    ) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn rich_rule_added(emitter: &SignalEmitter<'_>, zone: String, rule: String, timeout: u32) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn rich_rule_removed(emitter: &SignalEmitter<'_>, zone: String, rule: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn icmp_block_added(emitter: &SignalEmitter<'_>, zone: String, icmp_type: String, timeout: u32) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn icmp_block_removed(emitter: &SignalEmitter<'_>, zone: String, icmp_type: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn icmp_block_inversion_added(emitter: &SignalEmitter<'_>, zone: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn icmp_block_inversion_removed(emitter: &SignalEmitter<'_>, zone: String) -> zbus::Result<()>;
}
