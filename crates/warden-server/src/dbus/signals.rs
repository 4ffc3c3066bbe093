//! Relays [`Signal`]s emitted by the actor-owned `RuntimeCore` onto the
//! D-Bus interface they logically belong to.
//!
//! Keeping this in one task rather than threading a `SignalEmitter` through
//! every mutating method means the interface impls only need to know
//! whether an operation *succeeded*, not how to address the bus — the one
//! place that does both is here.

use tokio::sync::mpsc;

use warden_core::Signal;

use super::{main_iface::MainIface, policies_iface::PoliciesIface, zone_iface::ZoneIface, OBJECT_PATH};

pub async fn run(connection: zbus::Connection, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        if let Err(error) = dispatch(&connection, signal).await {
            tracing::warn!(%error, "failed to emit D-Bus signal");
        }
    }
}

async fn dispatch(connection: &zbus::Connection, signal: Signal) -> zbus::Result<()> {
    let object_server = connection.object_server();

    match signal {
        Signal::Reloaded => {
            let iface = object_server.interface::<_, MainIface>(OBJECT_PATH).await?;
            MainIface::reloaded(iface.signal_emitter()).await?;
        }
        Signal::DefaultZoneChanged { zone } => {
            let iface = object_server.interface::<_, MainIface>(OBJECT_PATH).await?;
            MainIface::default_zone_changed(iface.signal_emitter(), zone).await?;
        }
        Signal::PanicModeEnabled => {
            let iface = object_server.interface::<_, MainIface>(OBJECT_PATH).await?;
            MainIface::panic_mode_enabled(iface.signal_emitter()).await?;
        }
        Signal::PanicModeDisabled => {
            let iface = object_server.interface::<_, MainIface>(OBJECT_PATH).await?;
            MainIface::panic_mode_disabled(iface.signal_emitter()).await?;
        }
        Signal::LockdownEnabled => {
            let iface = object_server.interface::<_, PoliciesIface>(OBJECT_PATH).await?;
            PoliciesIface::lockdown_enabled(iface.signal_emitter()).await?;
        }
        Signal::LockdownDisabled => {
            let iface = object_server.interface::<_, PoliciesIface>(OBJECT_PATH).await?;
            PoliciesIface::lockdown_disabled(iface.signal_emitter()).await?;
        }
        Signal::ZoneOfInterfaceChanged { zone, interface } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::zone_of_interface_changed(iface.signal_emitter(), zone, interface).await?;
        }
        Signal::ZoneChanged { zone, interface } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::zone_changed(iface.signal_emitter(), zone, interface).await?;
        }
        Signal::ZoneOfSourceChanged { zone, source } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::zone_of_source_changed(iface.signal_emitter(), zone, source).await?;
        }
        Signal::ZoneTargetChanged { zone, target } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::zone_target_changed(iface.signal_emitter(), zone, target.to_string()).await?;
        }
        Signal::ServiceAdded { zone, service, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::service_added(iface.signal_emitter(), zone, service, timeout).await?;
        }
        Signal::ServiceRemoved { zone, service } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::service_removed(iface.signal_emitter(), zone, service).await?;
        }
        Signal::PortAdded { zone, port, protocol, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::port_added(iface.signal_emitter(), zone, port, protocol, timeout).await?;
        }
        Signal::PortRemoved { zone, port, protocol } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::port_removed(iface.signal_emitter(), zone, port, protocol).await?;
        }
        Signal::ProtocolAdded { zone, protocol, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::protocol_added(iface.signal_emitter(), zone, protocol, timeout).await?;
        }
        Signal::ProtocolRemoved { zone, protocol } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::protocol_removed(iface.signal_emitter(), zone, protocol).await?;
        }
        Signal::IcmpBlockAdded { zone, icmp_type, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::icmp_block_added(iface.signal_emitter(), zone, icmp_type, timeout).await?;
        }
        Signal::IcmpBlockRemoved { zone, icmp_type } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::icmp_block_removed(iface.signal_emitter(), zone, icmp_type).await?;
        }
        Signal::IcmpBlockInversionAdded { zone } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::icmp_block_inversion_added(iface.signal_emitter(), zone).await?;
        }
        Signal::IcmpBlockInversionRemoved { zone } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::icmp_block_inversion_removed(iface.signal_emitter(), zone).await?;
        }
        Signal::MasqueradeAdded { zone, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::masquerade_added(iface.signal_emitter(), zone, timeout).await?;
        }
        Signal::MasqueradeRemoved { zone } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::masquerade_removed(iface.signal_emitter(), zone).await?;
        }
        Signal::ForwardPortAdded { zone, port, protocol, to_port, to_addr, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::forward_port_added(iface.signal_emitter(), zone, port, protocol, to_port, to_addr, timeout).await?;
        }
        Signal::ForwardPortRemoved { zone, port, protocol, to_port, to_addr } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::forward_port_removed(iface.signal_emitter(), zone, port, protocol, to_port, to_addr).await?;
        }
        Signal::RichRuleAdded { zone, rule, timeout } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::rich_rule_added(iface.signal_emitter(), zone, rule, timeout).await?;
        }
        Signal::RichRuleRemoved { zone, rule } => {
            let iface = object_server.interface::<_, ZoneIface>(OBJECT_PATH).await?;
            ZoneIface::rich_rule_removed(iface.signal_emitter(), zone, rule).await?;
        }
    }

    Ok(())
}
