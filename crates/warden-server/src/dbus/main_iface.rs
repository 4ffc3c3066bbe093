//! `org.warden.Warden1`: the daemon's main interface — read-only
//! capability/version properties, panic mode, default zone, the service
//! and ICMP-type catalogs, reload, and `runtimeToPermanent`.

use zbus::interface;

use warden_core::CallerIdentity;

use crate::actor::Handle;
use crate::caller;
use crate::dto::ZoneDto;
use crate::error::map;

pub const INTERFACE_VERSION: &str = "1.0";

pub struct MainIface {
    pub handle: Handle,
}

#[interface(name = "org.warden.Warden1")]
impl MainIface {
    #[zbus(property)]
    async fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_owned()
    }

    #[zbus(property)]
    async fn interface_version(&self) -> String {
        INTERFACE_VERSION.to_owned()
    }

    #[zbus(property)]
    async fn state(&self) -> String {
        self.handle.state().await.to_string()
    }

    #[zbus(property(name = "IPv4"))]
    async fn ipv4(&self) -> bool {
        self.handle.capabilities().await.ipv4
    }

    #[zbus(property(name = "IPv6"))]
    async fn ipv6(&self) -> bool {
        self.handle.capabilities().await.ipv6
    }

    #[zbus(property(name = "IPv6_rpfilter"))]
    async fn ipv6_rpfilter(&self) -> bool {
        self.handle.capabilities().await.ipv6_rpfilter
    }

    #[zbus(property(name = "BRIDGE"))]
    async fn bridge(&self) -> bool {
        self.handle.capabilities().await.bridge
    }

    async fn reload(&self, #[zbus(connection)] connection: &zbus::Connection, #[zbus(header)] header: zbus::message::Header<'_>) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.reload(caller).await)
    }

    #[zbus(name = "completeReload")]
    async fn complete_reload(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.complete_reload(caller).await)
    }

    #[zbus(name = "runtimeToPermanent")]
    async fn runtime_to_permanent(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.runtime_to_permanent(caller).await)
    }

    #[zbus(name = "enablePanicMode")]
    async fn enable_panic_mode(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.enable_panic_mode(caller).await)
    }

    #[zbus(name = "disablePanicMode")]
    async fn disable_panic_mode(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.disable_panic_mode(caller).await)
    }

    #[zbus(name = "queryPanicMode")]
    async fn query_panic_mode(&self) -> bool {
        self.handle.query_panic_mode().await
    }

    #[zbus(name = "getDefaultZone")]
    async fn get_default_zone(&self) -> String {
        self.handle.get_default_zone().await
    }

    #[zbus(name = "setDefaultZone")]
    async fn set_default_zone(
        &self,
        zone: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.set_default_zone(zone, caller).await)
    }

    #[zbus(name = "listServices")]
    async fn list_services(&self) -> Vec<String> {
        self.handle.list_services().await
    }

    #[zbus(name = "getServiceSettings")]
    async fn get_service_settings(&self, name: String) -> zbus::fdo::Result<String> {
        let service = self.handle.get_service_settings(name.clone()).await;
        let service = service.ok_or_else(|| zbus::fdo::Error::Failed(format!("no such service: {name}")))?;
        serde_json::to_string(&service).map_err(|error| zbus::fdo::Error::Failed(error.to_string()))
    }

    #[zbus(name = "listIcmpTypes")]
    async fn list_icmp_types(&self) -> Vec<String> {
        self.handle.list_icmp_types().await
    }

    #[zbus(name = "getIcmpTypeSettings")]
    async fn get_icmp_type_settings(&self, name: String) -> zbus::fdo::Result<String> {
        let icmptype = self.handle.get_icmp_type_settings(name.clone()).await;
        let icmptype = icmptype.ok_or_else(|| zbus::fdo::Error::Failed(format!("no such icmptype: {name}")))?;
        serde_json::to_string(&icmptype).map_err(|error| zbus::fdo::Error::Failed(error.to_string()))
    }

    #[zbus(name = "getZoneSettings")]
    async fn get_zone_settings(&self, zone: String) -> zbus::fdo::Result<String> {
        let settings = self.handle.get_zone_settings(zone.clone()).await;
        let settings = settings.ok_or_else(|| zbus::fdo::Error::Failed(format!("no such zone: {zone}")))?;
        serde_json::to_string(&ZoneDto::from(&settings)).map_err(|error| zbus::fdo::Error::Failed(error.to_string()))
    }

    #[zbus(signal)]
    pub async fn reloaded(emitter: &zbus::object_server::SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn default_zone_changed(emitter: &zbus::object_server::SignalEmitter<'_>, zone: String) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn panic_mode_enabled(emitter: &zbus::object_server::SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn panic_mode_disabled(emitter: &zbus::object_server::SignalEmitter<'_>) -> zbus::Result<()>;
}

impl MainIface {
    async fn resolve_caller(&self, connection: &zbus::Connection, header: &zbus::message::Header<'_>) -> CallerIdentity {
        match header.sender() {
            Some(sender) => caller::resolve(connection, sender).await,
            None => CallerIdentity::default(),
        }
    }
}
