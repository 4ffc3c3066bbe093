//! D-Bus proxy definitions for the daemon's four interfaces.
//!
//! These mirror `warden-server`'s `dbus::{main_iface, zone_iface,
//! direct_iface, policies_iface}` method names exactly — `wardenctl` is a
//! transport-only client, it never re-derives policy from a response, it
//! just prints what the daemon returns.

use zbus::proxy;

pub const BUS_NAME: &str = "org.warden.Warden1";
pub const OBJECT_PATH: &str = "/org/warden/Warden1";

#[proxy(
    interface = "org.warden.Warden1",
    default_service = "org.warden.Warden1",
    default_path = "/org/warden/Warden1"
)]
pub trait Main {
    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;
    #[zbus(property)]
    fn interface_version(&self) -> zbus::Result<String>;
    #[zbus(property)]
    fn state(&self) -> zbus::Result<String>;
    #[zbus(property, name = "IPv4")]
    fn ipv4(&self) -> zbus::Result<bool>;
    #[zbus(property, name = "IPv6")]
    fn ipv6(&self) -> zbus::Result<bool>;
    #[zbus(property, name = "IPv6_rpfilter")]
    fn ipv6_rpfilter(&self) -> zbus::Result<bool>;
    #[zbus(property, name = "BRIDGE")]
    fn bridge(&self) -> zbus::Result<bool>;

    fn reload(&self) -> zbus::Result<()>;
    #[zbus(name = "completeReload")]
    fn complete_reload(&self) -> zbus::Result<()>;
    #[zbus(name = "runtimeToPermanent")]
    fn runtime_to_permanent(&self) -> zbus::Result<()>;
    #[zbus(name = "enablePanicMode")]
    fn enable_panic_mode(&self) -> zbus::Result<()>;
    #[zbus(name = "disablePanicMode")]
    fn disable_panic_mode(&self) -> zbus::Result<()>;
    #[zbus(name = "queryPanicMode")]
    fn query_panic_mode(&self) -> zbus::Result<bool>;
    #[zbus(name = "getDefaultZone")]
    fn get_default_zone(&self) -> zbus::Result<String>;
    #[zbus(name = "setDefaultZone")]
    fn set_default_zone(&self, zone: &str) -> zbus::Result<()>;
    #[zbus(name = "listServices")]
    fn list_services(&self) -> zbus::Result<Vec<String>>;
    #[zbus(name = "getServiceSettings")]
    fn get_service_settings(&self, name: &str) -> zbus::Result<String>;
    #[zbus(name = "listIcmpTypes")]
    fn list_icmp_types(&self) -> zbus::Result<Vec<String>>;
    #[zbus(name = "getIcmpTypeSettings")]
    fn get_icmp_type_settings(&self, name: &str) -> zbus::Result<String>;
    #[zbus(name = "getZoneSettings")]
    fn get_zone_settings(&self, zone: &str) -> zbus::Result<String>;
}

#[proxy(
    interface = "org.warden.Warden1.zone",
    default_service = "org.warden.Warden1",
    default_path = "/org/warden/Warden1"
)]
pub trait Zone {
    #[zbus(name = "getZones")]
    fn get_zones(&self) -> zbus::Result<Vec<String>>;
    #[zbus(name = "getActiveZones")]
    fn get_active_zones(&self) -> zbus::Result<String>;
    #[zbus(name = "listAllZoneSettings")]
    fn list_all_zone_settings(&self) -> zbus::Result<String>;
    #[zbus(name = "getZoneOfInterface")]
    fn get_zone_of_interface(&self, interface: &str) -> zbus::Result<String>;
    #[zbus(name = "getZoneOfSource")]
    fn get_zone_of_source(&self, source: &str) -> zbus::Result<String>;
    #[zbus(name = "isImmutable")]
    fn is_immutable(&self, zone: &str) -> zbus::Result<bool>;
    #[zbus(name = "getZoneTarget")]
    fn get_zone_target(&self, zone: &str) -> zbus::Result<String>;
    #[zbus(name = "setZoneTarget")]
    fn set_zone_target(&self, zone: &str, target: &str) -> zbus::Result<String>;

    #[zbus(name = "addInterface")]
    fn add_interface(&self, zone: &str, interface: &str) -> zbus::Result<String>;
    #[zbus(name = "removeInterface")]
    fn remove_interface(&self, zone: &str, interface: &str) -> zbus::Result<String>;
    #[zbus(name = "queryInterface")]
    fn query_interface(&self, zone: &str, interface: &str) -> zbus::Result<bool>;

    #[zbus(name = "addSource")]
    fn add_source(&self, zone: &str, source: &str) -> zbus::Result<String>;
    #[zbus(name = "removeSource")]
    fn remove_source(&self, zone: &str, source: &str) -> zbus::Result<String>;
    #[zbus(name = "querySource")]
    fn query_source(&self, zone: &str, source: &str) -> zbus::Result<bool>;

    #[zbus(name = "addService")]
    fn add_service(&self, zone: &str, service: &str, timeout: u32) -> zbus::Result<String>;
    #[zbus(name = "removeService")]
    fn remove_service(&self, zone: &str, service: &str) -> zbus::Result<String>;
    #[zbus(name = "queryService")]
    fn query_service(&self, zone: &str, service: &str) -> zbus::Result<bool>;

    #[zbus(name = "addPort")]
    fn add_port(&self, zone: &str, port: &str, protocol: &str, timeout: u32) -> zbus::Result<String>;
    #[zbus(name = "removePort")]
    fn remove_port(&self, zone: &str, port: &str, protocol: &str) -> zbus::Result<String>;
    #[zbus(name = "queryPort")]
    fn query_port(&self, zone: &str, port: &str, protocol: &str) -> zbus::Result<bool>;

    #[zbus(name = "addProtocol")]
    fn add_protocol(&self, zone: &str, protocol: &str, timeout: u32) -> zbus::Result<String>;
    #[zbus(name = "removeProtocol")]
    fn remove_protocol(&self, zone: &str, protocol: &str) -> zbus::Result<String>;
    #[zbus(name = "queryProtocol")]
    fn query_protocol(&self, zone: &str, protocol: &str) -> zbus::Result<bool>;

    #[zbus(name = "addMasquerade")]
    fn add_masquerade(&self, zone: &str, timeout: u32) -> zbus::Result<String>;
    #[zbus(name = "removeMasquerade")]
    fn remove_masquerade(&self, zone: &str) -> zbus::Result<String>;
    #[zbus(name = "queryMasquerade")]
    fn query_masquerade(&self, zone: &str) -> zbus::Result<bool>;

    #[zbus(name = "addForwardPort")]
    #[allow(clippy::too_many_arguments)]
    fn add_forward_port(
        &self,
        zone: &str,
        port: &str,
        protocol: &str,
        to_port: &str,
        to_addr: &str,
        timeout: u32,
    ) -> zbus::Result<String>;
    #[zbus(name = "removeForwardPort")]
    fn remove_forward_port(&self, zone: &str, port: &str, protocol: &str, to_port: &str, to_addr: &str) -> zbus::Result<String>;
    #[zbus(name = "queryForwardPort")]
    fn query_forward_port(&self, zone: &str, port: &str, protocol: &str, to_port: &str, to_addr: &str) -> zbus::Result<bool>;

    #[zbus(name = "addRichRule")]
    fn add_rich_rule(&self, zone: &str, rule: &str, timeout: u32) -> zbus::Result<String>;
    #[zbus(name = "removeRichRule")]
    fn remove_rich_rule(&self, zone: &str, rule: &str) -> zbus::Result<String>;
    #[zbus(name = "queryRichRule")]
    fn query_rich_rule(&self, zone: &str, rule: &str) -> zbus::Result<bool>;

    #[zbus(name = "addIcmpBlock")]
    fn add_icmp_block(&self, zone: &str, icmp_type: &str, timeout: u32) -> zbus::Result<String>;
    #[zbus(name = "removeIcmpBlock")]
    fn remove_icmp_block(&self, zone: &str, icmp_type: &str) -> zbus::Result<String>;
    #[zbus(name = "queryIcmpBlock")]
    fn query_icmp_block(&self, zone: &str, icmp_type: &str) -> zbus::Result<bool>;

    #[zbus(name = "addIcmpBlockInversion")]
    fn add_icmp_block_inversion(&self, zone: &str) -> zbus::Result<String>;
    #[zbus(name = "removeIcmpBlockInversion")]
    fn remove_icmp_block_inversion(&self, zone: &str) -> zbus::Result<String>;
    #[zbus(name = "queryIcmpBlockInversion")]
    fn query_icmp_block_inversion(&self, zone: &str) -> zbus::Result<bool>;
}

#[proxy(
    interface = "org.warden.Warden1.direct",
    default_service = "org.warden.Warden1",
    default_path = "/org/warden/Warden1"
)]
pub trait Direct {
    #[zbus(name = "addChain")]
    fn add_chain(&self, ipv: &str, table: &str, chain: &str) -> zbus::Result<()>;
    #[zbus(name = "removeChain")]
    fn remove_chain(&self, ipv: &str, table: &str, chain: &str) -> zbus::Result<()>;
    #[zbus(name = "queryChain")]
    fn query_chain(&self, ipv: &str, table: &str, chain: &str) -> zbus::Result<bool>;
    #[zbus(name = "getChains")]
    fn get_chains(&self, ipv: &str, table: &str) -> zbus::Result<Vec<String>>;

    #[zbus(name = "addRule")]
    fn add_rule(&self, ipv: &str, table: &str, chain: &str, priority: i32, args: Vec<&str>) -> zbus::Result<()>;
    #[zbus(name = "removeRule")]
    fn remove_rule(&self, ipv: &str, table: &str, chain: &str, priority: i32, args: Vec<&str>) -> zbus::Result<()>;
    #[zbus(name = "queryRule")]
    fn query_rule(&self, ipv: &str, table: &str, chain: &str, priority: i32, args: Vec<&str>) -> zbus::Result<bool>;
    #[zbus(name = "getRules")]
    fn get_rules(&self, ipv: &str, table: &str, chain: &str) -> zbus::Result<String>;

    #[zbus(name = "addPassthrough")]
    fn add_passthrough(&self, ipv: &str, args: Vec<&str>) -> zbus::Result<()>;
    #[zbus(name = "removePassthrough")]
    fn remove_passthrough(&self, ipv: &str, args: Vec<&str>) -> zbus::Result<()>;
    #[zbus(name = "queryPassthrough")]
    fn query_passthrough(&self, ipv: &str, args: Vec<&str>) -> zbus::Result<bool>;
    #[zbus(name = "getPassthroughs")]
    fn get_passthroughs(&self, ipv: &str) -> zbus::Result<Vec<Vec<String>>>;
    #[zbus(name = "removeAllPassthroughs")]
    fn remove_all_passthroughs(&self) -> zbus::Result<()>;

    fn passthrough(&self, ipv: &str, args: Vec<&str>) -> zbus::Result<String>;
}

#[proxy(
    interface = "org.warden.Warden1.policies",
    default_service = "org.warden.Warden1",
    default_path = "/org/warden/Warden1"
)]
pub trait Policies {
    #[zbus(name = "enableLockdown")]
    fn enable_lockdown(&self) -> zbus::Result<()>;
    #[zbus(name = "disableLockdown")]
    fn disable_lockdown(&self) -> zbus::Result<()>;
    #[zbus(name = "queryLockdown")]
    fn query_lockdown(&self) -> zbus::Result<bool>;

    #[zbus(name = "addLockdownWhitelistCommand")]
    fn add_lockdown_whitelist_command(&self, command: &str) -> zbus::Result<()>;
    #[zbus(name = "removeLockdownWhitelistCommand")]
    fn remove_lockdown_whitelist_command(&self, command: &str) -> zbus::Result<()>;
    #[zbus(name = "queryLockdownWhitelistCommand")]
    fn query_lockdown_whitelist_command(&self, command: &str) -> zbus::Result<bool>;
    #[zbus(name = "getLockdownWhitelistCommands")]
    fn get_lockdown_whitelist_commands(&self) -> zbus::Result<Vec<String>>;

    #[zbus(name = "addLockdownWhitelistUser")]
    fn add_lockdown_whitelist_user(&self, user: &str) -> zbus::Result<()>;
    #[zbus(name = "removeLockdownWhitelistUser")]
    fn remove_lockdown_whitelist_user(&self, user: &str) -> zbus::Result<()>;
    #[zbus(name = "queryLockdownWhitelistUser")]
    fn query_lockdown_whitelist_user(&self, user: &str) -> zbus::Result<bool>;
    #[zbus(name = "getLockdownWhitelistUsers")]
    fn get_lockdown_whitelist_users(&self) -> zbus::Result<Vec<String>>;

    #[zbus(name = "addLockdownWhitelistContext")]
    fn add_lockdown_whitelist_context(&self, context: &str) -> zbus::Result<()>;
    #[zbus(name = "removeLockdownWhitelistContext")]
    fn remove_lockdown_whitelist_context(&self, context: &str) -> zbus::Result<()>;
    #[zbus(name = "queryLockdownWhitelistContext")]
    fn query_lockdown_whitelist_context(&self, context: &str) -> zbus::Result<bool>;
    #[zbus(name = "getLockdownWhitelistContexts")]
    fn get_lockdown_whitelist_contexts(&self) -> zbus::Result<Vec<String>>;

    #[zbus(name = "addLockdownWhitelistUid")]
    fn add_lockdown_whitelist_uid(&self, uid: u32) -> zbus::Result<()>;
    #[zbus(name = "removeLockdownWhitelistUid")]
    fn remove_lockdown_whitelist_uid(&self, uid: u32) -> zbus::Result<()>;
    #[zbus(name = "queryLockdownWhitelistUid")]
    fn query_lockdown_whitelist_uid(&self, uid: u32) -> zbus::Result<bool>;
    #[zbus(name = "getLockdownWhitelistUids")]
    fn get_lockdown_whitelist_uids(&self) -> zbus::Result<Vec<u32>>;
}
