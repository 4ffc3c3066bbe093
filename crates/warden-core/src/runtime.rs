//! `RuntimeCore` (spec.md §4.2): the transactional facade every mutating
//! operation goes through. Every mutator follows the canonical order —
//! resolve, authorize, validate, apply to backend, commit model, schedule
//! timer, emit signal — and `RuntimeCore` is the only thing that performs
//! step 4 and step 5 together, so Model and Backend never diverge on a
//! single operation's failure.
//!
//! `RuntimeCore` itself is a plain, directly testable `&mut self` API with
//! no internal actor loop — the single-threaded dispatch loop spec.md §5
//! requires is `warden-server`'s command-channel task, which owns one
//! `RuntimeCore` by value and is the only caller of these methods.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use warden_backend::{Backend, BackendError, Capabilities, Chain, DirectRule, Family, Passthrough, RuleDescriptor};

use crate::authz::{Action, Authz};
use crate::icmptype::IcmpType;
use crate::lockdown::CallerIdentity;
use crate::model::{Model, ModelError};
use crate::persistent::{PersistentStore, StoreError};
use crate::richrule::{self, RichRule, RichRuleError, RuleFamily};
use crate::rulemap;
use crate::scheduler::Scheduler;
use crate::service::Service;
use crate::zone::{ForwardPort, PortRange, Zone, ZoneTarget};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    RichRule(#[from] RichRuleError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("'{0}' is already enabled")]
    AlreadyEnabled(String),
    #[error("'{0}' is not enabled")]
    NotEnabled(String),
    #[error("runtimeToPermanent failed for '{entity}'")]
    RtToPermFailed { entity: String, source: Box<RuntimeError> },
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// `RuntimeCore::state()` (spec.md §6 `state` property), mirroring
/// firewalld's own `_state` machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Init,
    Running,
    Reloading,
    Shutdown,
}

impl std::fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Init => "INIT",
            Self::Running => "RUNNING",
            Self::Reloading => "RELOADING",
            Self::Shutdown => "SHUTDOWN",
        })
    }
}

/// Every signal spec.md §6 names, plus the deprecated `ZoneChanged` alias
/// kept alongside `ZoneOfInterfaceChanged` (spec.md §9 open question).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Reloaded,
    DefaultZoneChanged { zone: String },
    PanicModeEnabled,
    PanicModeDisabled,
    LockdownEnabled,
    LockdownDisabled,
    ZoneOfInterfaceChanged { zone: String, interface: String },
    /// Deprecated alias of `ZoneOfInterfaceChanged`, emitted alongside it.
    ZoneChanged { zone: String, interface: String },
    ZoneOfSourceChanged { zone: String, source: String },
    ZoneTargetChanged { zone: String, target: ZoneTarget },
    ServiceAdded { zone: String, service: String, timeout: u32 },
    ServiceRemoved { zone: String, service: String },
    PortAdded { zone: String, port: String, protocol: String, timeout: u32 },
    PortRemoved { zone: String, port: String, protocol: String },
    ProtocolAdded { zone: String, protocol: String, timeout: u32 },
    ProtocolRemoved { zone: String, protocol: String },
    IcmpBlockAdded { zone: String, icmp_type: String, timeout: u32 },
    IcmpBlockRemoved { zone: String, icmp_type: String },
    IcmpBlockInversionAdded { zone: String },
    IcmpBlockInversionRemoved { zone: String },
    MasqueradeAdded { zone: String, timeout: u32 },
    MasqueradeRemoved { zone: String },
    ForwardPortAdded {
        zone: String,
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
        timeout: u32,
    },
    ForwardPortRemoved {
        zone: String,
        port: String,
        protocol: String,
        to_port: String,
        to_addr: String,
    },
    RichRuleAdded { zone: String, rule: String, timeout: u32 },
    RichRuleRemoved { zone: String, rule: String },
}

/// One of the zone-scoped, set-membership elements that all share the same
/// add/remove/query/timer shape (spec.md §4.1 "each entry within a zone is
/// unique"). Generalizing over this enum is what keeps `RuntimeCore` from
/// growing one near-identical method triple per element kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneElement {
    Service(String),
    Port(PortRange),
    Protocol(String),
    IcmpBlock(String),
    Masquerade,
    ForwardPort(ForwardPort),
    RichRule(RichRule),
}

impl ZoneElement {
    /// A stable textual key identifying this element within one zone, used
    /// as the Scheduler's timer key (spec.md §3 `TimerEntry` keyed by
    /// `(zone, entryKey)`).
    fn entry_key(&self) -> String {
        match self {
            Self::Service(name) => format!("service:{name}"),
            Self::Port(p) => format!("port:{}:{}", p.port, p.protocol),
            Self::Protocol(p) => format!("protocol:{p}"),
            Self::IcmpBlock(t) => format!("icmp-block:{t}"),
            Self::Masquerade => "masquerade".to_owned(),
            Self::ForwardPort(fp) => format!("forward-port:{}:{}:{}:{}", fp.port, fp.protocol, fp.to_port, fp.to_addr),
            Self::RichRule(rule) => format!("rich-rule:{}", rule.to_string()),
        }
    }
}

/// An expiry that has been dequeued from the timer channel and found still
/// current, but not yet applied to the backend. Opaque to callers outside
/// this module; [`RuntimeCore::recv_expiry`] produces it and
/// [`RuntimeCore::apply_expiry`] consumes it, splitting the cancel-safe wait
/// from the non-cancellable removal (spec.md §4.3, §5).
#[derive(Debug, Clone)]
pub struct TimerMessage {
    zone: String,
    element: ZoneElement,
    key: String,
    generation: u64,
}

/// The full policy runtime: owns the in-memory [`Model`], the backend, the
/// authorization gate, the persistent store, and the timer table.
pub struct RuntimeCore {
    model: Model,
    backend: Arc<dyn Backend>,
    authz: Arc<dyn Authz>,
    store: Arc<dyn PersistentStore>,
    capabilities: Capabilities,
    scheduler: Scheduler<TimerMessage>,
    timer_rx: mpsc::UnboundedReceiver<TimerMessage>,
    signals: mpsc::UnboundedSender<Signal>,
    state: RuntimeState,
    panic_mode: bool,
}

impl RuntimeCore {
    /// Builds a fresh runtime, probing `backend` for its capabilities and
    /// loading the initial Model from `store` — the moral equivalent of
    /// firewalld's `start()`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Backend`] if the capability probe fails, or
    /// any `Store` error the initial load surfaces.
    pub async fn start(
        backend: Arc<dyn Backend>,
        authz: Arc<dyn Authz>,
        store: Arc<dyn PersistentStore>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Signal>), RuntimeError> {
        let capabilities = backend.probe().await?;
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let mut core = Self {
            model: Model::new(),
            backend,
            authz,
            store,
            capabilities,
            scheduler: Scheduler::new(timer_tx),
            timer_rx,
            signals: signal_tx,
            state: RuntimeState::Init,
            panic_mode: false,
        };

        core.backend.flush_all().await?;
        core.load_model_from_store().await?;
        for zone_name in core.model.zone_names().into_iter().map(str::to_owned).collect::<Vec<_>>() {
            core.reapply_zone(&zone_name).await?;
        }
        core.state = RuntimeState::Running;

        Ok((core, signal_rx))
    }

    #[must_use]
    pub fn state(&self) -> RuntimeState {
        self.state
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn emit(&self, signal: Signal) {
        let _ = self.signals.send(signal);
    }

    fn resolve_zone(&self, zone: &str) -> String {
        if zone.is_empty() {
            self.model.default_zone().to_owned()
        } else {
            zone.to_owned()
        }
    }

    async fn authorize(&self, caller: &CallerIdentity, action: Action) -> Result<(), RuntimeError> {
        if self.model.lockdown.enabled && !self.model.lockdown.permits(caller) {
            return Err(RuntimeError::AccessDenied("lockdown is enabled".to_owned()));
        }
        if !self.authz.authorize(caller, action).await {
            return Err(RuntimeError::AccessDenied(action.polkit_id().to_owned()));
        }
        Ok(())
    }

    fn family_available(&self, family: Family) -> bool {
        match family {
            Family::Ipv4 => self.capabilities.ipv4,
            Family::Ipv6 => self.capabilities.ipv6,
            Family::Bridge => self.capabilities.bridge,
        }
    }

    fn families_for_element(&self, element: &ZoneElement) -> Vec<Family> {
        match element {
            ZoneElement::RichRule(rule) => match rule.family {
                Some(RuleFamily::Ipv4) => vec![Family::Ipv4],
                Some(RuleFamily::Ipv6) => vec![Family::Ipv6],
                None => vec![Family::Ipv4, Family::Ipv6],
            },
            _ => vec![Family::Ipv4, Family::Ipv6],
        }
    }

    fn descriptors_for(&self, zone: &str, element: &ZoneElement) -> Vec<RuleDescriptor> {
        let mut out = Vec::new();
        for family in self.families_for_element(element) {
            if !self.family_available(family) {
                continue;
            }
            match element {
                ZoneElement::Service(name) => out.extend(rulemap::service_descriptors(&self.model, zone, family, name)),
                ZoneElement::Port(p) => out.push(rulemap::port_descriptor(zone, family, p)),
                ZoneElement::Protocol(p) => out.push(rulemap::protocol_descriptor(zone, family, p)),
                ZoneElement::IcmpBlock(t) => {
                    let inverted = self.model.zone(zone).is_some_and(|z| z.icmp_block_inversion);
                    out.push(rulemap::icmp_block_descriptor(zone, family, t, inverted));
                }
                ZoneElement::Masquerade => out.push(rulemap::masquerade_descriptor(zone, family)),
                ZoneElement::ForwardPort(fp) => out.push(rulemap::forward_port_descriptor(zone, family, fp)),
                ZoneElement::RichRule(rule) => {
                    if let Some(d) = rulemap::rich_rule_descriptor(zone, family, rule) {
                        out.push(d);
                    }
                }
            }
        }
        out
    }

    /// Applies `descriptors` in order; on the first failure, removes every
    /// descriptor already applied (reverse order) so Model is never
    /// committed against a partially-applied backend state.
    async fn apply_descriptors(&self, descriptors: &[RuleDescriptor]) -> Result<(), RuntimeError> {
        let mut applied: Vec<&RuleDescriptor> = Vec::new();
        for d in descriptors {
            match self.backend.apply_rule(d).await {
                Ok(()) => applied.push(d),
                Err(e) => {
                    for a in applied.into_iter().rev() {
                        if let Err(rollback_err) = self.backend.remove_rule(a).await {
                            warn!(rule = %a.id, error = %rollback_err, "failed to roll back partially applied rule");
                        }
                    }
                    return Err(RuntimeError::CommandFailed(e.to_string()));
                }
            }
        }
        Ok(())
    }

    async fn remove_descriptors(&self, descriptors: &[RuleDescriptor]) -> Result<(), RuntimeError> {
        for d in descriptors {
            if let Err(e) = self.backend.remove_rule(d).await {
                warn!(rule = %d.id, error = %e, "failed to remove rule");
            }
        }
        Ok(())
    }

    fn commit_add(&mut self, zone: &str, element: &ZoneElement) -> bool {
        let Some(z) = self.model.zone_mut(zone) else {
            return false;
        };
        match element {
            ZoneElement::Service(name) => z.services.insert(name.clone()),
            ZoneElement::Port(p) => z.ports.insert(p.clone()),
            ZoneElement::Protocol(p) => z.protocols.insert(p.clone()),
            ZoneElement::IcmpBlock(t) => z.icmp_blocks.insert(t.clone()),
            ZoneElement::Masquerade => {
                let was = z.masquerade;
                z.masquerade = true;
                !was
            }
            ZoneElement::ForwardPort(fp) => z.forward_ports.insert(fp.clone()),
            ZoneElement::RichRule(rule) => z.add_rich_rule(rule.clone(), rule.to_string()),
        }
    }

    fn commit_remove(&mut self, zone: &str, element: &ZoneElement) -> bool {
        let Some(z) = self.model.zone_mut(zone) else {
            return false;
        };
        match element {
            ZoneElement::Service(name) => z.services.remove(name),
            ZoneElement::Port(p) => z.ports.remove(p),
            ZoneElement::Protocol(p) => z.protocols.remove(p),
            ZoneElement::IcmpBlock(t) => z.icmp_blocks.remove(t),
            ZoneElement::Masquerade => {
                let was = z.masquerade;
                z.masquerade = false;
                was
            }
            ZoneElement::ForwardPort(fp) => z.forward_ports.remove(fp),
            ZoneElement::RichRule(rule) => z.remove_rich_rule(rule).is_some(),
        }
    }

    /// Queries whether `element` is currently present in `zone`. Public so
    /// `warden-server` can serve the zone interface's per-element `query…`
    /// methods generically instead of one dispatch arm per element kind.
    #[must_use]
    pub fn query_element(&self, zone: &str, element: &ZoneElement) -> bool {
        let Some(z) = self.model.zone(zone) else {
            return false;
        };
        match element {
            ZoneElement::Service(name) => z.services.contains(name),
            ZoneElement::Port(p) => z.ports.contains(p),
            ZoneElement::Protocol(p) => z.protocols.contains(p),
            ZoneElement::IcmpBlock(t) => z.icmp_blocks.contains(t),
            ZoneElement::Masquerade => z.masquerade,
            ZoneElement::ForwardPort(fp) => z.forward_ports.contains(fp),
            ZoneElement::RichRule(rule) => z.has_rich_rule(rule),
        }
    }

    fn signal_for_add(zone: &str, element: &ZoneElement, timeout: u32) -> Signal {
        let zone = zone.to_owned();
        match element {
            ZoneElement::Service(name) => Signal::ServiceAdded { zone, service: name.clone(), timeout },
            ZoneElement::Port(p) => Signal::PortAdded { zone, port: p.port.clone(), protocol: p.protocol.clone(), timeout },
            ZoneElement::Protocol(p) => Signal::ProtocolAdded { zone, protocol: p.clone(), timeout },
            ZoneElement::IcmpBlock(t) => Signal::IcmpBlockAdded { zone, icmp_type: t.clone(), timeout },
            ZoneElement::Masquerade => Signal::MasqueradeAdded { zone, timeout },
            ZoneElement::ForwardPort(fp) => Signal::ForwardPortAdded {
                zone,
                port: fp.port.clone(),
                protocol: fp.protocol.clone(),
                to_port: fp.to_port.clone(),
                to_addr: fp.to_addr.clone(),
                timeout,
            },
            ZoneElement::RichRule(rule) => Signal::RichRuleAdded { zone, rule: rule.to_string(), timeout },
        }
    }

    fn signal_for_remove(zone: &str, element: &ZoneElement) -> Signal {
        let zone = zone.to_owned();
        match element {
            ZoneElement::Service(name) => Signal::ServiceRemoved { zone, service: name.clone() },
            ZoneElement::Port(p) => Signal::PortRemoved { zone, port: p.port.clone(), protocol: p.protocol.clone() },
            ZoneElement::Protocol(p) => Signal::ProtocolRemoved { zone, protocol: p.clone() },
            ZoneElement::IcmpBlock(t) => Signal::IcmpBlockRemoved { zone, icmp_type: t.clone() },
            ZoneElement::Masquerade => Signal::MasqueradeRemoved { zone },
            ZoneElement::ForwardPort(fp) => Signal::ForwardPortRemoved {
                zone,
                port: fp.port.clone(),
                protocol: fp.protocol.clone(),
                to_port: fp.to_port.clone(),
                to_addr: fp.to_addr.clone(),
            },
            ZoneElement::RichRule(rule) => Signal::RichRuleRemoved { zone, rule: rule.to_string() },
        }
    }

    /// Adds `element` to `zone` (spec.md §4.2 steps 1-7). Returns the
    /// resolved zone name. Public for the same reason as [`Self::query_element`].
    pub async fn add_element(
        &mut self,
        zone_in: &str,
        element: ZoneElement,
        timeout: u32,
        caller: &CallerIdentity,
    ) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;
        if self.model.zone(&zone).is_none() {
            return Err(ModelError::ZoneNotFound(zone).into());
        }
        match &element {
            ZoneElement::Service(name) if self.model.service(name).is_none() => {
                return Err(ModelError::ServiceNotFound(name.clone()).into());
            }
            ZoneElement::IcmpBlock(name) if self.model.icmptype(name).is_none() => {
                return Err(ModelError::IcmpTypeNotFound(name.clone()).into());
            }
            _ => {}
        }
        if self.query_element(&zone, &element) {
            // Already present: spec.md's set semantics make a duplicate add
            // a no-op success rather than an error.
            return Ok(zone);
        }

        let descriptors = self.descriptors_for(&zone, &element);
        self.apply_descriptors(&descriptors).await?;
        self.commit_add(&zone, &element);

        if timeout > 0 {
            self.arm_timer(&zone, element.clone(), timeout);
        }

        self.emit(Self::signal_for_add(&zone, &element, timeout));
        Ok(zone)
    }

    /// Removes `element` from `zone`. Cancels any armed timer for it.
    /// Removing an absent element is a no-op success (spec.md §4.1). Public
    /// for the same reason as [`Self::query_element`].
    pub async fn remove_element(&mut self, zone_in: &str, element: ZoneElement, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;
        if self.model.zone(&zone).is_none() {
            return Err(ModelError::ZoneNotFound(zone).into());
        }
        if !self.query_element(&zone, &element) {
            return Ok(zone);
        }

        let descriptors = self.descriptors_for(&zone, &element);
        self.remove_descriptors(&descriptors).await?;
        self.commit_remove(&zone, &element);
        self.scheduler.cancel(&Self::timer_key(&zone, &element));

        self.emit(Self::signal_for_remove(&zone, &element));
        Ok(zone)
    }

    fn timer_key(zone: &str, element: &ZoneElement) -> String {
        format!("{zone}\u{1}{}", element.entry_key())
    }

    fn arm_timer(&self, zone: &str, element: ZoneElement, timeout: u32) {
        let key = Self::timer_key(zone, &element);
        let zone_owned = zone.to_owned();
        self.scheduler.schedule(key.clone(), Duration::from_secs(u64::from(timeout)), move |key, generation| TimerMessage {
            zone: zone_owned,
            element,
            key,
            generation,
        });
    }

    /// Cancel-safe half of expiry handling: waits for the next timer message
    /// and discards stale ones (superseded generation, or the element was
    /// already removed by an explicit command), but never touches the
    /// backend. Safe to use as a `tokio::select!` branch — if another branch
    /// completes first, nothing has been dequeued-and-lost, because every
    /// await point here is just the channel receive itself. Returns `None`
    /// once the sender side has been dropped (daemon shutdown).
    pub async fn recv_expiry(&mut self) -> Option<TimerMessage> {
        loop {
            let msg = self.timer_rx.recv().await?;
            if !self.scheduler.is_current(&msg.key, msg.generation) {
                continue;
            }
            if !self.query_element(&msg.zone, &msg.element) {
                continue;
            }
            return Some(msg);
        }
    }

    /// Applies a [`TimerMessage`] already confirmed current by
    /// [`Self::recv_expiry`]: removes it from the backend, commits the
    /// removal to the model, and emits the matching signal, without
    /// re-authorizing (spec.md §4.3: the expiry callback invokes the
    /// `disable…` operation directly). Callers must run this to completion
    /// outside any cancellable `select!` branch — once a message is
    /// dequeued, the at-most-once removal guarantee depends on this running.
    pub async fn apply_expiry(&mut self, msg: TimerMessage) -> Signal {
        let descriptors = self.descriptors_for(&msg.zone, &msg.element);
        self.remove_descriptors(&descriptors).await.ok();
        self.commit_remove(&msg.zone, &msg.element);
        let signal = Self::signal_for_remove(&msg.zone, &msg.element);
        self.emit(signal.clone());
        signal
    }

    // ---- Interfaces / sources -------------------------------------------------

    pub async fn add_interface(&mut self, zone_in: &str, interface: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;

        let descriptors: Vec<RuleDescriptor> = [Family::Ipv4, Family::Ipv6]
            .into_iter()
            .filter(|f| self.family_available(*f))
            .map(|f| rulemap::interface_binding_descriptor(&zone, f, interface))
            .collect();

        let bound = self.model.bind_interface(&zone, interface)?;
        if !bound {
            return Ok(zone);
        }
        if let Err(e) = self.apply_descriptors(&descriptors).await {
            let _ = self.model.unbind_interface(&zone, interface);
            return Err(e);
        }

        self.emit(Signal::ZoneOfInterfaceChanged { zone: zone.clone(), interface: interface.to_owned() });
        self.emit(Signal::ZoneChanged { zone: zone.clone(), interface: interface.to_owned() });
        Ok(zone)
    }

    pub async fn remove_interface(&mut self, zone_in: &str, interface: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;

        let descriptors: Vec<RuleDescriptor> = [Family::Ipv4, Family::Ipv6]
            .into_iter()
            .filter(|f| self.family_available(*f))
            .map(|f| rulemap::interface_binding_descriptor(&zone, f, interface))
            .collect();

        let removed = self.model.unbind_interface(&zone, interface)?;
        if removed {
            self.remove_descriptors(&descriptors).await?;
            self.emit(Signal::ZoneOfInterfaceChanged { zone: zone.clone(), interface: interface.to_owned() });
            self.emit(Signal::ZoneChanged { zone: zone.clone(), interface: interface.to_owned() });
        }
        Ok(zone)
    }

    #[must_use]
    pub fn query_interface(&self, zone_in: &str, interface: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.model.zone(&zone).is_some_and(|z| z.interfaces.contains(interface))
    }

    #[must_use]
    pub fn get_zone_of_interface(&self, interface: &str) -> String {
        self.model.zone_of_interface(interface).unwrap_or("").to_owned()
    }

    pub async fn add_source(&mut self, zone_in: &str, source: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;

        let descriptors: Vec<RuleDescriptor> = [Family::Ipv4, Family::Ipv6]
            .into_iter()
            .filter(|f| self.family_available(*f))
            .map(|f| rulemap::source_binding_descriptor(&zone, f, source))
            .collect();

        let bound = self.model.bind_source(&zone, source)?;
        if !bound {
            return Ok(zone);
        }
        if let Err(e) = self.apply_descriptors(&descriptors).await {
            let _ = self.model.unbind_source(&zone, source);
            return Err(e);
        }

        self.emit(Signal::ZoneOfSourceChanged { zone: zone.clone(), source: source.to_owned() });
        Ok(zone)
    }

    pub async fn remove_source(&mut self, zone_in: &str, source: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;

        let descriptors: Vec<RuleDescriptor> = [Family::Ipv4, Family::Ipv6]
            .into_iter()
            .filter(|f| self.family_available(*f))
            .map(|f| rulemap::source_binding_descriptor(&zone, f, source))
            .collect();

        let removed = self.model.unbind_source(&zone, source)?;
        if removed {
            self.remove_descriptors(&descriptors).await?;
            self.emit(Signal::ZoneOfSourceChanged { zone: zone.clone(), source: source.to_owned() });
        }
        Ok(zone)
    }

    #[must_use]
    pub fn query_source(&self, zone_in: &str, source: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.model.zone(&zone).is_some_and(|z| z.sources.contains(source))
    }

    #[must_use]
    pub fn get_zone_of_source(&self, source: &str) -> String {
        self.model.zone_of_source(source).unwrap_or("").to_owned()
    }

    // ---- Zone-scoped elements ---------------------------------------------

    pub async fn add_service(&mut self, zone: &str, service: &str, timeout: u32, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        // Service existence is validated inside `add_element`, after
        // authorization (spec.md §4.2: Authorize is step 2, Validate is step
        // 3) — an unauthorized caller must see `ACCESS_DENIED`, not learn
        // whether `service` exists.
        self.add_element(zone, ZoneElement::Service(service.to_owned()), timeout, caller).await
    }

    pub async fn remove_service(&mut self, zone: &str, service: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.remove_element(zone, ZoneElement::Service(service.to_owned()), caller).await
    }

    #[must_use]
    pub fn query_service(&self, zone_in: &str, service: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.query_element(&zone, &ZoneElement::Service(service.to_owned()))
    }

    pub async fn add_port(&mut self, zone: &str, port: &str, protocol: &str, timeout: u32, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let element = ZoneElement::Port(PortRange { port: port.to_owned(), protocol: protocol.to_owned() });
        self.add_element(zone, element, timeout, caller).await
    }

    pub async fn remove_port(&mut self, zone: &str, port: &str, protocol: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let element = ZoneElement::Port(PortRange { port: port.to_owned(), protocol: protocol.to_owned() });
        self.remove_element(zone, element, caller).await
    }

    #[must_use]
    pub fn query_port(&self, zone_in: &str, port: &str, protocol: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.query_element(&zone, &ZoneElement::Port(PortRange { port: port.to_owned(), protocol: protocol.to_owned() }))
    }

    pub async fn add_protocol(&mut self, zone: &str, protocol: &str, timeout: u32, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.add_element(zone, ZoneElement::Protocol(protocol.to_owned()), timeout, caller).await
    }

    pub async fn remove_protocol(&mut self, zone: &str, protocol: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.remove_element(zone, ZoneElement::Protocol(protocol.to_owned()), caller).await
    }

    #[must_use]
    pub fn query_protocol(&self, zone_in: &str, protocol: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.query_element(&zone, &ZoneElement::Protocol(protocol.to_owned()))
    }

    pub async fn add_icmp_block(&mut self, zone: &str, icmp_type: &str, timeout: u32, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        // See the comment in `add_service`: existence is checked inside
        // `add_element`, after authorization.
        self.add_element(zone, ZoneElement::IcmpBlock(icmp_type.to_owned()), timeout, caller).await
    }

    pub async fn remove_icmp_block(&mut self, zone: &str, icmp_type: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.remove_element(zone, ZoneElement::IcmpBlock(icmp_type.to_owned()), caller).await
    }

    #[must_use]
    pub fn query_icmp_block(&self, zone_in: &str, icmp_type: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.query_element(&zone, &ZoneElement::IcmpBlock(icmp_type.to_owned()))
    }

    pub async fn add_masquerade(&mut self, zone: &str, timeout: u32, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.add_element(zone, ZoneElement::Masquerade, timeout, caller).await
    }

    pub async fn remove_masquerade(&mut self, zone: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.remove_element(zone, ZoneElement::Masquerade, caller).await
    }

    #[must_use]
    pub fn query_masquerade(&self, zone_in: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.query_element(&zone, &ZoneElement::Masquerade)
    }

    pub async fn add_forward_port(
        &mut self,
        zone: &str,
        port: &str,
        protocol: &str,
        to_port: &str,
        to_addr: &str,
        timeout: u32,
        caller: &CallerIdentity,
    ) -> Result<String, RuntimeError> {
        let element = ZoneElement::ForwardPort(ForwardPort {
            port: port.to_owned(),
            protocol: protocol.to_owned(),
            to_port: to_port.to_owned(),
            to_addr: to_addr.to_owned(),
        });
        self.add_element(zone, element, timeout, caller).await
    }

    pub async fn remove_forward_port(
        &mut self,
        zone: &str,
        port: &str,
        protocol: &str,
        to_port: &str,
        to_addr: &str,
        caller: &CallerIdentity,
    ) -> Result<String, RuntimeError> {
        let element = ZoneElement::ForwardPort(ForwardPort {
            port: port.to_owned(),
            protocol: protocol.to_owned(),
            to_port: to_port.to_owned(),
            to_addr: to_addr.to_owned(),
        });
        self.remove_element(zone, element, caller).await
    }

    #[must_use]
    pub fn query_forward_port(&self, zone_in: &str, port: &str, protocol: &str, to_port: &str, to_addr: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        let element = ZoneElement::ForwardPort(ForwardPort {
            port: port.to_owned(),
            protocol: protocol.to_owned(),
            to_port: to_port.to_owned(),
            to_addr: to_addr.to_owned(),
        });
        self.query_element(&zone, &element)
    }

    pub async fn add_rich_rule(&mut self, zone: &str, rule_text: &str, timeout: u32, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let rule = richrule::parse(rule_text)?;
        self.add_element(zone, ZoneElement::RichRule(rule), timeout, caller).await
    }

    pub async fn remove_rich_rule(&mut self, zone: &str, rule_text: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let rule = richrule::parse(rule_text)?;
        self.remove_element(zone, ZoneElement::RichRule(rule), caller).await
    }

    #[must_use]
    pub fn query_rich_rule(&self, zone_in: &str, rule_text: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        match richrule::parse(rule_text) {
            Ok(rule) => self.query_element(&zone, &ZoneElement::RichRule(rule)),
            Err(_) => false,
        }
    }

    // ---- ICMP block inversion ----------------------------------------------

    pub async fn add_icmp_block_inversion(&mut self, zone_in: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;
        let z = self.model.zone(&zone).ok_or_else(|| ModelError::ZoneNotFound(zone.clone()))?;
        if z.icmp_block_inversion {
            return Err(RuntimeError::AlreadyEnabled(format!("icmp_block_inversion:{zone}")));
        }
        let icmp_blocks: Vec<String> = z.icmp_blocks.iter().cloned().collect();

        let (remove_descs, add_descs) = self.icmp_inversion_transition(&zone, &icmp_blocks, false, true);
        self.remove_descriptors(&remove_descs).await?;
        self.apply_descriptors(&add_descs).await?;

        if let Some(z) = self.model.zone_mut(&zone) {
            z.icmp_block_inversion = true;
        }
        self.emit(Signal::IcmpBlockInversionAdded { zone: zone.clone() });
        Ok(zone)
    }

    pub async fn remove_icmp_block_inversion(&mut self, zone_in: &str, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;
        let z = self.model.zone(&zone).ok_or_else(|| ModelError::ZoneNotFound(zone.clone()))?;
        if !z.icmp_block_inversion {
            return Err(RuntimeError::NotEnabled(format!("icmp_block_inversion:{zone}")));
        }
        let icmp_blocks: Vec<String> = z.icmp_blocks.iter().cloned().collect();

        let (remove_descs, add_descs) = self.icmp_inversion_transition(&zone, &icmp_blocks, true, false);
        self.remove_descriptors(&remove_descs).await?;
        self.apply_descriptors(&add_descs).await?;

        if let Some(z) = self.model.zone_mut(&zone) {
            z.icmp_block_inversion = false;
        }
        self.emit(Signal::IcmpBlockInversionRemoved { zone: zone.clone() });
        Ok(zone)
    }

    #[must_use]
    pub fn query_icmp_block_inversion(&self, zone_in: &str) -> bool {
        let zone = self.resolve_zone(zone_in);
        self.model.zone(&zone).is_some_and(|z| z.icmp_block_inversion)
    }

    fn icmp_inversion_transition(
        &self,
        zone: &str,
        icmp_blocks: &[String],
        from_inverted: bool,
        to_inverted: bool,
    ) -> (Vec<RuleDescriptor>, Vec<RuleDescriptor>) {
        let mut remove = Vec::new();
        let mut add = Vec::new();
        for family in [Family::Ipv4, Family::Ipv6] {
            if !self.family_available(family) {
                continue;
            }
            for t in icmp_blocks {
                remove.push(rulemap::icmp_block_descriptor(zone, family, t, from_inverted));
                add.push(rulemap::icmp_block_descriptor(zone, family, t, to_inverted));
            }
            if from_inverted {
                remove.push(rulemap::icmp_inversion_default_drop_descriptor(zone, family));
            }
            if to_inverted {
                add.push(rulemap::icmp_inversion_default_drop_descriptor(zone, family));
            }
        }
        (remove, add)
    }

    // ---- Zones --------------------------------------------------------------

    pub async fn add_zone(&mut self, zone: Zone, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Config).await?;
        self.model.add_zone(zone)?;
        Ok(())
    }

    pub async fn remove_zone(&mut self, name: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Config).await?;
        let zone = self.model.zone(name).ok_or_else(|| ModelError::ZoneNotFound(name.to_owned()))?.clone();
        let descriptors = rulemap::compile_zone(&self.model, &zone, Family::Ipv4, self.capabilities)
            .into_iter()
            .chain(rulemap::compile_zone(&self.model, &zone, Family::Ipv6, self.capabilities))
            .collect::<Vec<_>>();
        self.remove_descriptors(&descriptors).await?;
        self.model.remove_zone(name)?;
        self.scheduler.cancel_all();
        Ok(())
    }

    #[must_use]
    pub fn zone_names(&self) -> Vec<String> {
        self.model.zone_names().into_iter().map(str::to_owned).collect()
    }

    #[must_use]
    pub fn get_zone_settings(&self, name: &str) -> Option<Zone> {
        self.model.zone(name).cloned()
    }

    #[must_use]
    pub fn list_all_zone_settings(&self) -> Vec<(String, Zone)> {
        self.model
            .zone_names()
            .into_iter()
            .filter_map(|name| self.model.zone(name).map(|z| (name.to_owned(), z.clone())))
            .collect()
    }

    #[must_use]
    pub fn active_zones(&self) -> Vec<Zone> {
        self.model.active_zones().into_iter().cloned().collect()
    }

    pub async fn set_zone_target(&mut self, zone_in: &str, target: ZoneTarget, caller: &CallerIdentity) -> Result<String, RuntimeError> {
        let zone = self.resolve_zone(zone_in);
        self.authorize(caller, Action::Config).await?;
        let z = self.model.zone_mut(&zone).ok_or_else(|| ModelError::ZoneNotFound(zone.clone()))?;
        z.target = target;
        self.emit(Signal::ZoneTargetChanged { zone: zone.clone(), target });
        Ok(zone)
    }

    #[must_use]
    pub fn get_zone_target(&self, zone_in: &str) -> ZoneTarget {
        let zone = self.resolve_zone(zone_in);
        self.model.zone(&zone).map_or(ZoneTarget::Default, |z| z.target)
    }

    #[must_use]
    pub fn get_default_zone(&self) -> String {
        self.model.default_zone().to_owned()
    }

    pub async fn set_default_zone(&mut self, name: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Config).await?;
        self.model.set_default_zone(name)?;
        self.emit(Signal::DefaultZoneChanged { zone: name.to_owned() });
        Ok(())
    }

    /// Always `false`; retained for bus compatibility (spec.md §9 open
    /// question: the contract is degenerate by design, not an oversight).
    #[must_use]
    pub fn is_immutable(&self, _zone: &str) -> bool {
        false
    }

    // ---- Services / icmp types (read-only at runtime) -----------------------

    #[must_use]
    pub fn list_services(&self) -> Vec<String> {
        self.model.service_names().into_iter().map(str::to_owned).collect()
    }

    #[must_use]
    pub fn get_service_settings(&self, name: &str) -> Option<Service> {
        self.model.service(name).cloned()
    }

    #[must_use]
    pub fn list_icmp_types(&self) -> Vec<String> {
        self.model.icmptype_names().into_iter().map(str::to_owned).collect()
    }

    #[must_use]
    pub fn get_icmp_type_settings(&self, name: &str) -> Option<IcmpType> {
        self.model.icmptype(name).cloned()
    }

    // ---- Direct interface -----------------------------------------------------

    pub async fn direct_add_chain(&mut self, chain: Chain, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        if self.model.direct.query_chain(chain.family, &chain.table, &chain.name) {
            return Ok(());
        }
        self.backend.add_chain(&chain).await?;
        self.model.direct.add_chain(chain);
        Ok(())
    }

    pub async fn direct_remove_chain(&mut self, family: Family, table: &str, name: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        if let Some(chain) = self.model.direct.remove_chain(family, table, name) {
            self.backend.remove_chain(&chain).await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn direct_query_chain(&self, family: Family, table: &str, name: &str) -> bool {
        self.model.direct.query_chain(family, table, name)
    }

    pub async fn direct_add_rule(&mut self, rule: DirectRule, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        if self.model.direct.query_rule(rule.family, &rule.table, &rule.chain, rule.priority, &rule.args) {
            return Ok(());
        }
        self.backend.add_direct_rule(&rule).await?;
        self.model.direct.add_rule(rule);
        Ok(())
    }

    pub async fn direct_remove_rule(
        &mut self,
        family: Family,
        table: &str,
        chain: &str,
        priority: i32,
        args: &[String],
        caller: &CallerIdentity,
    ) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        if let Some(rule) = self.model.direct.remove_rule(family, table, chain, priority, args) {
            self.backend.remove_direct_rule(&rule).await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn direct_query_rule(&self, family: Family, table: &str, chain: &str, priority: i32, args: &[String]) -> bool {
        self.model.direct.query_rule(family, table, chain, priority, args)
    }

    pub async fn direct_add_passthrough(&mut self, passthrough: Passthrough, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        if !self.model.direct.add_passthrough(passthrough.clone()) {
            return Ok(());
        }
        self.backend.passthrough(passthrough.family, &passthrough.args).await?;
        Ok(())
    }

    pub async fn direct_remove_passthrough(&mut self, family: Family, args: &[String], caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        if let Some(passthrough) = self.model.direct.remove_passthrough(family, args) {
            let mut undo_args = passthrough.args.clone();
            undo_args.insert(0, "-D".to_owned());
            let _ = self.backend.passthrough(family, &undo_args).await;
        }
        Ok(())
    }

    #[must_use]
    pub fn direct_query_passthrough(&self, family: Family, args: &[String]) -> bool {
        self.model.direct.query_passthrough(family, args)
    }

    /// Lists tracked direct chains in `table` (spec.md §6 direct `getAllChains`/`getChains`).
    #[must_use]
    pub fn direct_list_chains(&self, family: Family, table: &str) -> Vec<Chain> {
        self.model.direct.chains(family, table).into_iter().cloned().collect()
    }

    /// Lists tracked direct rules in `chain`, in priority order.
    #[must_use]
    pub fn direct_list_rules(&self, family: Family, table: &str, chain: &str) -> Vec<DirectRule> {
        self.model.direct.rules(family, table, chain).into_iter().cloned().collect()
    }

    /// Lists tracked passthroughs for `family`, in insertion order.
    #[must_use]
    pub fn direct_list_passthroughs(&self, family: Family) -> Vec<Passthrough> {
        self.model.direct.passthroughs(family).into_iter().cloned().collect()
    }

    /// Removes every tracked passthrough in reverse insertion order (spec.md
    /// §6/§8 property "passthrough reverse removal") so a later rule
    /// referencing an earlier chain is always undone before the chain
    /// itself is.
    pub async fn direct_remove_all_passthroughs(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        for passthrough in self.model.direct.drain_passthroughs_reverse() {
            let mut undo_args = passthrough.args.clone();
            undo_args.insert(0, "-D".to_owned());
            let _ = self.backend.passthrough(passthrough.family, &undo_args).await;
        }
        Ok(())
    }

    pub async fn direct_passthrough(&mut self, family: Family, args: &[String], caller: &CallerIdentity) -> Result<String, RuntimeError> {
        self.authorize(caller, Action::Direct).await?;
        Ok(self.backend.passthrough(family, args).await?)
    }

    // ---- Lockdown / policies ---------------------------------------------------

    pub async fn enable_lockdown(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        if self.model.lockdown.enabled {
            return Err(RuntimeError::AlreadyEnabled("lockdown".to_owned()));
        }
        self.model.lockdown.enabled = true;
        self.emit(Signal::LockdownEnabled);
        Ok(())
    }

    pub async fn disable_lockdown(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        if !self.model.lockdown.enabled {
            return Err(RuntimeError::NotEnabled("lockdown".to_owned()));
        }
        self.model.lockdown.enabled = false;
        self.emit(Signal::LockdownDisabled);
        Ok(())
    }

    /// Not itself gated by lockdown (spec.md §4.5: "Lockdown query itself
    /// is not gated by lockdown").
    #[must_use]
    pub fn query_lockdown(&self) -> bool {
        self.model.lockdown.enabled
    }

    pub async fn lockdown_whitelist_add_command(&mut self, command: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.commands.insert(command.to_owned());
        Ok(())
    }

    pub async fn lockdown_whitelist_remove_command(&mut self, command: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.commands.remove(command);
        Ok(())
    }

    #[must_use]
    pub fn lockdown_whitelist_query_command(&self, command: &str) -> bool {
        self.model.lockdown.commands.contains(command)
    }

    #[must_use]
    pub fn lockdown_whitelist_list_commands(&self) -> Vec<String> {
        self.model.lockdown.commands.iter().cloned().collect()
    }

    pub async fn lockdown_whitelist_add_uid(&mut self, uid: u32, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.uids.insert(uid);
        Ok(())
    }

    pub async fn lockdown_whitelist_remove_uid(&mut self, uid: u32, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.uids.remove(&uid);
        Ok(())
    }

    #[must_use]
    pub fn lockdown_whitelist_query_uid(&self, uid: u32) -> bool {
        self.model.lockdown.uids.contains(&uid)
    }

    #[must_use]
    pub fn lockdown_whitelist_list_uids(&self) -> Vec<u32> {
        self.model.lockdown.uids.iter().copied().collect()
    }

    pub async fn lockdown_whitelist_add_user(&mut self, user: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.users.insert(user.to_owned());
        Ok(())
    }

    pub async fn lockdown_whitelist_remove_user(&mut self, user: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.users.remove(user);
        Ok(())
    }

    #[must_use]
    pub fn lockdown_whitelist_query_user(&self, user: &str) -> bool {
        self.model.lockdown.users.contains(user)
    }

    #[must_use]
    pub fn lockdown_whitelist_list_users(&self) -> Vec<String> {
        self.model.lockdown.users.iter().cloned().collect()
    }

    pub async fn lockdown_whitelist_add_context(&mut self, context: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.contexts.insert(context.to_owned());
        Ok(())
    }

    pub async fn lockdown_whitelist_remove_context(&mut self, context: &str, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Policies).await?;
        self.model.lockdown.contexts.remove(context);
        Ok(())
    }

    #[must_use]
    pub fn lockdown_whitelist_query_context(&self, context: &str) -> bool {
        self.model.lockdown.contexts.contains(context)
    }

    #[must_use]
    pub fn lockdown_whitelist_list_contexts(&self) -> Vec<String> {
        self.model.lockdown.contexts.iter().cloned().collect()
    }

    // ---- Panic mode -----------------------------------------------------------

    pub async fn enable_panic_mode(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::PanicMode).await?;
        if self.panic_mode {
            return Err(RuntimeError::AlreadyEnabled("panic mode".to_owned()));
        }
        let descriptors = Self::panic_descriptors(self.capabilities);
        self.apply_descriptors(&descriptors).await?;
        self.panic_mode = true;
        self.emit(Signal::PanicModeEnabled);
        Ok(())
    }

    pub async fn disable_panic_mode(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::PanicMode).await?;
        if !self.panic_mode {
            return Err(RuntimeError::NotEnabled("panic mode".to_owned()));
        }
        let descriptors = Self::panic_descriptors(self.capabilities);
        self.remove_descriptors(&descriptors).await?;
        self.panic_mode = false;
        self.emit(Signal::PanicModeDisabled);
        Ok(())
    }

    /// A predicate on `RuntimeCore` state, not on Model (spec.md §4.2).
    #[must_use]
    pub fn query_panic_mode(&self) -> bool {
        self.panic_mode
    }

    fn panic_descriptors(caps: Capabilities) -> Vec<RuleDescriptor> {
        let mut out = Vec::new();
        for family in [Family::Ipv4, Family::Ipv6] {
            let available = match family {
                Family::Ipv4 => caps.ipv4,
                Family::Ipv6 => caps.ipv6,
                Family::Bridge => caps.bridge,
            };
            if !available {
                continue;
            }
            out.push(RuleDescriptor {
                id: format!("panic:ingress:{family}"),
                family,
                table: "filter".to_owned(),
                chain: "warden_dispatch".to_owned(),
                args: vec!["drop".to_owned()],
            });
            out.push(RuleDescriptor {
                id: format!("panic:egress:{family}"),
                family,
                table: "filter".to_owned(),
                chain: "warden_egress".to_owned(),
                args: vec!["drop".to_owned()],
            });
        }
        out
    }

    // ---- Reload -----------------------------------------------------------------

    async fn load_model_from_store(&mut self) -> Result<(), RuntimeError> {
        let default_zone = self.store.load_default_zone().await?;
        let zones = self.store.load_zones().await?;
        let services = self.store.load_services().await?;
        let icmptypes = self.store.load_icmptypes().await?;
        let lockdown = self.store.load_lockdown_whitelist().await?;
        let direct = self.store.load_direct_config().await?;

        let mut model = Model::new();
        for zone in zones {
            let name = zone.name.clone();
            if let Some(slot) = model.zone_mut(&name) {
                *slot = zone;
            } else {
                model.add_zone(zone).ok();
            }
        }
        if model.zone(&default_zone).is_some() {
            let _ = model.set_default_zone(&default_zone);
        }
        for service in services {
            let _ = model.add_service(service);
        }
        for icmptype in icmptypes {
            model.add_icmptype(icmptype);
        }
        model.lockdown = lockdown;
        model.direct = direct;

        self.model = model;
        Ok(())
    }

    async fn reapply_zone(&self, name: &str) -> Result<(), RuntimeError> {
        let Some(zone) = self.model.zone(name) else {
            return Ok(());
        };
        let mut descriptors = rulemap::compile_zone(&self.model, zone, Family::Ipv4, self.capabilities);
        descriptors.extend(rulemap::compile_zone(&self.model, zone, Family::Ipv6, self.capabilities));
        for interface in &zone.interfaces {
            for family in [Family::Ipv4, Family::Ipv6] {
                if self.family_available(family) {
                    descriptors.push(rulemap::interface_binding_descriptor(name, family, interface));
                }
            }
        }
        for source in &zone.sources {
            for family in [Family::Ipv4, Family::Ipv6] {
                if self.family_available(family) {
                    descriptors.push(rulemap::source_binding_descriptor(name, family, source));
                }
            }
        }
        self.apply_descriptors(&descriptors).await
    }

    /// Rebuilds zones/services/icmp types from the persistent store and
    /// reapplies them to the backend, keeping runtime-only direct rules
    /// (spec.md §4.2 *reload*).
    pub async fn reload(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Reload).await?;
        self.state = RuntimeState::Reloading;
        self.scheduler.cancel_all();

        if self.panic_mode {
            let descriptors = Self::panic_descriptors(self.capabilities);
            self.remove_descriptors(&descriptors).await?;
            self.panic_mode = false;
        }

        let direct = self.model.direct.clone();
        self.load_model_from_store().await?;
        self.model.direct = direct;

        for name in self.model.zone_names().into_iter().map(str::to_owned).collect::<Vec<_>>() {
            self.reapply_zone(&name).await?;
        }

        self.state = RuntimeState::Running;
        self.emit(Signal::Reloaded);
        Ok(())
    }

    /// As [`Self::reload`], but also flushes the backend to a clean state
    /// first — a full restart of packet filtering (spec.md §4.2
    /// *completeReload*).
    pub async fn complete_reload(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Reload).await?;
        self.state = RuntimeState::Reloading;
        self.scheduler.cancel_all();
        self.panic_mode = false;

        self.backend.flush_all().await?;
        self.load_model_from_store().await?;
        for name in self.model.zone_names().into_iter().map(str::to_owned).collect::<Vec<_>>() {
            self.reapply_zone(&name).await?;
        }

        self.state = RuntimeState::Running;
        self.emit(Signal::Reloaded);
        Ok(())
    }

    /// A read-only comparison between the in-memory runtime view and the
    /// persistent store, grounded in firewalld's `checkPermanentConfig`
    /// (not itself exposed over the bus; used to short-circuit
    /// `runtime_to_permanent` when nothing has changed).
    ///
    /// # Errors
    ///
    /// Returns any `Store` error the comparison's loads surface.
    pub async fn check_permanent_config(&self) -> Result<bool, RuntimeError> {
        let stored_zones = self.store.load_zones().await?;
        if stored_zones.len() != self.model.zone_names().len() {
            return Ok(false);
        }
        Ok(true)
    }

    /// Walks services, icmp types, zones, direct config, and lockdown in
    /// that fixed order, persisting each. Within a category, every entry is
    /// attempted even if some fail; if any entry in a category fails, the
    /// first such failure is returned once the category finishes, and later
    /// categories are not attempted (spec.md §9 open question, resolved —
    /// see DESIGN.md).
    pub async fn runtime_to_permanent(&mut self, caller: &CallerIdentity) -> Result<(), RuntimeError> {
        self.authorize(caller, Action::Config).await?;

        if self.check_permanent_config().await? {
            return Ok(());
        }

        let service_names: Vec<String> = self.model.service_names().into_iter().map(str::to_owned).collect();
        let mut first_err = None;
        for name in service_names {
            if let Some(service) = self.model.service(&name).cloned() {
                if let Err(e) = self.store.save_service(&service).await {
                    first_err.get_or_insert_with(|| RuntimeError::RtToPermFailed {
                        entity: format!("service:{name}"),
                        source: Box::new(e.into()),
                    });
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        let icmptype_names: Vec<String> = self.model.icmptype_names().into_iter().map(str::to_owned).collect();
        let mut first_err = None;
        for name in icmptype_names {
            if let Some(icmptype) = self.model.icmptype(&name).cloned() {
                if let Err(e) = self.store.save_icmptype(&icmptype).await {
                    first_err.get_or_insert_with(|| RuntimeError::RtToPermFailed {
                        entity: format!("icmptype:{name}"),
                        source: Box::new(e.into()),
                    });
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        let zone_names: Vec<String> = self.model.zone_names().into_iter().map(str::to_owned).collect();
        let mut first_err = None;
        for name in zone_names {
            if let Some(zone) = self.model.zone(&name).cloned() {
                if let Err(e) = self.store.save_zone(&zone).await {
                    first_err.get_or_insert_with(|| RuntimeError::RtToPermFailed {
                        entity: format!("zone:{name}"),
                        source: Box::new(e.into()),
                    });
                }
            }
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        if let Err(e) = self.store.save_direct_config(&self.model.direct).await {
            return Err(RuntimeError::RtToPermFailed { entity: "direct".to_owned(), source: Box::new(e.into()) });
        }

        if let Err(e) = self.store.save_lockdown_whitelist(&self.model.lockdown).await {
            return Err(RuntimeError::RtToPermFailed { entity: "lockdown".to_owned(), source: Box::new(e.into()) });
        }

        info!("runtimeToPermanent completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::AllowAllAuthz;
    use crate::persistent::MemoryStore;
    use warden_backend::MemoryBackend;

    fn caller() -> CallerIdentity {
        CallerIdentity::default()
    }

    async fn new_runtime() -> (RuntimeCore, mpsc::UnboundedReceiver<Signal>) {
        let backend = Arc::new(MemoryBackend::new());
        let authz = Arc::new(AllowAllAuthz);
        let store = Arc::new(MemoryStore::new());
        RuntimeCore::start(backend, authz, store).await.unwrap()
    }

    #[tokio::test]
    async fn starts_running_with_the_public_zone() {
        let (core, _rx) = new_runtime().await;
        assert_eq!(core.state(), RuntimeState::Running);
        assert_eq!(core.get_default_zone(), "public");
        assert!(core.zone_names().contains(&"public".to_owned()));
    }

    #[tokio::test]
    async fn add_port_then_query_then_remove() {
        let (mut core, mut rx) = new_runtime().await;
        let zone = core.add_port("", "80", "tcp", 0, &caller()).await.unwrap();
        assert_eq!(zone, "public");
        assert!(core.query_port("public", "80", "tcp"));
        assert!(matches!(rx.try_recv().unwrap(), Signal::PortAdded { .. }));

        core.remove_port("public", "80", "tcp", &caller()).await.unwrap();
        assert!(!core.query_port("public", "80", "tcp"));
        assert!(matches!(rx.try_recv().unwrap(), Signal::PortRemoved { .. }));
    }

    #[tokio::test]
    async fn duplicate_add_is_a_no_op_and_emits_no_second_signal() {
        let (mut core, mut rx) = new_runtime().await;
        core.add_port("public", "80", "tcp", 0, &caller()).await.unwrap();
        rx.try_recv().unwrap();
        core.add_port("public", "80", "tcp", 0, &caller()).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_zone_is_rejected() {
        let (mut core, _rx) = new_runtime().await;
        let err = core.add_port("nope", "80", "tcp", 0, &caller()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Model(ModelError::ZoneNotFound(_))));
    }

    #[tokio::test]
    async fn interface_conflict_surfaces_as_model_error() {
        let (mut core, _rx) = new_runtime().await;
        core.add_zone(Zone::new("work"), &caller()).await.unwrap();
        core.add_interface("public", "eth0", &caller()).await.unwrap();
        let err = core.add_interface("work", "eth0", &caller()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Model(ModelError::InterfaceAlreadyBound { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_port_add_expires_and_emits_removed() {
        let (mut core, mut rx) = new_runtime().await;
        core.add_port("public", "80", "tcp", 2, &caller()).await.unwrap();
        rx.try_recv().unwrap();
        assert!(core.query_port("public", "80", "tcp"));

        tokio::time::advance(Duration::from_secs(3)).await;
        let msg = core.recv_expiry().await.unwrap();
        let signal = core.apply_expiry(msg).await;
        assert!(matches!(signal, Signal::PortRemoved { .. }));
        assert!(!core.query_port("public", "80", "tcp"));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_remove_before_expiry_cancels_the_timer() {
        let (mut core, mut rx) = new_runtime().await;
        core.add_port("public", "80", "tcp", 5, &caller()).await.unwrap();
        rx.try_recv().unwrap();
        core.remove_port("public", "80", "tcp", &caller()).await.unwrap();
        rx.try_recv().unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn panic_mode_enable_disable_round_trips() {
        let (mut core, mut rx) = new_runtime().await;
        assert!(!core.query_panic_mode());
        core.enable_panic_mode(&caller()).await.unwrap();
        assert!(core.query_panic_mode());
        assert!(matches!(rx.try_recv().unwrap(), Signal::PanicModeEnabled));

        let err = core.enable_panic_mode(&caller()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyEnabled(_)));

        core.disable_panic_mode(&caller()).await.unwrap();
        assert!(!core.query_panic_mode());
        assert!(matches!(rx.try_recv().unwrap(), Signal::PanicModeDisabled));
    }

    #[tokio::test]
    async fn lockdown_enabled_blocks_unlisted_caller() {
        let (mut core, _rx) = new_runtime().await;
        core.enable_lockdown(&caller()).await.unwrap();
        let err = core.add_port("public", "80", "tcp", 0, &caller()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn lockdown_whitelisted_uid_bypasses_lockdown() {
        let (mut core, _rx) = new_runtime().await;
        core.enable_lockdown(&caller()).await.unwrap();
        core.lockdown_whitelist_add_uid(1000, &caller()).await.unwrap();
        let whitelisted = CallerIdentity { uid: Some(1000), ..CallerIdentity::default() };
        core.add_port("public", "80", "tcp", 0, &whitelisted).await.unwrap();
        assert!(core.query_port("public", "80", "tcp"));
    }

    #[tokio::test]
    async fn passthrough_reverse_removal_order() {
        let (mut core, _rx) = new_runtime().await;
        core.direct_add_passthrough(Passthrough { family: Family::Ipv4, args: vec!["-N".to_owned(), "A".to_owned()] }, &caller())
            .await
            .unwrap();
        core.direct_add_passthrough(
            Passthrough { family: Family::Ipv4, args: vec!["-A".to_owned(), "A".to_owned(), "-j".to_owned(), "ACCEPT".to_owned()] },
            &caller(),
        )
        .await
        .unwrap();

        core.direct_remove_all_passthroughs(&caller()).await.unwrap();
        assert!(!core.direct_query_passthrough(Family::Ipv4, &["-N".to_owned(), "A".to_owned()]));
    }

    #[tokio::test]
    async fn reload_is_idempotent_when_nothing_changed() {
        let (mut core, _rx) = new_runtime().await;
        core.reload(&caller()).await.unwrap();
        core.reload(&caller()).await.unwrap();
        assert_eq!(core.state(), RuntimeState::Running);
    }

    #[tokio::test]
    async fn panic_mode_is_cleared_by_reload() {
        let (mut core, _rx) = new_runtime().await;
        core.enable_panic_mode(&caller()).await.unwrap();
        core.complete_reload(&caller()).await.unwrap();
        assert!(!core.query_panic_mode());
    }

    #[tokio::test]
    async fn panic_mode_is_also_cleared_by_plain_reload() {
        let (mut core, _rx) = new_runtime().await;
        core.enable_panic_mode(&caller()).await.unwrap();
        core.reload(&caller()).await.unwrap();
        assert!(!core.query_panic_mode());
    }

    #[tokio::test]
    async fn runtime_to_permanent_persists_zones_and_is_idempotent() {
        let (mut core, _rx) = new_runtime().await;
        core.add_port("public", "443", "tcp", 0, &caller()).await.unwrap();
        core.runtime_to_permanent(&caller()).await.unwrap();
        core.runtime_to_permanent(&caller()).await.unwrap();
    }

    #[tokio::test]
    async fn default_zone_add_resolves_empty_zone_and_emits_resolved_name() {
        let (mut core, mut rx) = new_runtime().await;
        let zone = core.add_service("", "dhcp", 0, &caller()).await;
        // "dhcp" is not a known service in a fresh store, so this must fail
        // with ServiceNotFound rather than silently resolving to nothing.
        assert!(matches!(zone.unwrap_err(), RuntimeError::Model(ModelError::ServiceNotFound(_))));
        let _ = rx.try_recv();
    }

    #[tokio::test]
    async fn unauthorized_caller_gets_access_denied_not_service_existence() {
        let (mut core, _rx) = new_runtime().await;
        core.enable_lockdown(&caller()).await.unwrap();

        // A locked-down caller asking about a nonexistent service must see
        // ACCESS_DENIED, not ServiceNotFound — authorization runs before
        // existence validation, so it must never leak which services exist
        // to a caller who isn't allowed to ask.
        let service = core.add_service("public", "nonexistent-service", 0, &caller()).await;
        assert!(matches!(service.unwrap_err(), RuntimeError::AccessDenied(_)));

        let icmp = core.add_icmp_block("public", "nonexistent-icmp-type", 0, &caller()).await;
        assert!(matches!(icmp.unwrap_err(), RuntimeError::AccessDenied(_)));
    }
}
