//! `org.warden.Warden1.direct`: the escape hatch for chains, rules, and
//! passthrough commands addressed directly by table/chain/priority rather
//! than through the zone abstraction (spec.md §4, `direct` module).

use zbus::interface;
use zbus::object_server::SignalEmitter;

use warden_backend::{Chain, DirectRule, Family, Passthrough};
use warden_core::CallerIdentity;

use crate::actor::Handle;
use crate::caller;
use crate::error::map;

fn parse_family(ipv: &str) -> zbus::fdo::Result<Family> {
    ipv.parse().map_err(|_| zbus::fdo::Error::InvalidArgs(format!("unknown family: {ipv}")))
}

pub struct DirectIface {
    pub handle: Handle,
}

impl DirectIface {
    async fn resolve_caller(&self, connection: &zbus::Connection, header: &zbus::message::Header<'_>) -> CallerIdentity {
        match header.sender() {
            Some(sender) => caller::resolve(connection, sender).await,
            None => CallerIdentity::default(),
        }
    }
}

#[interface(name = "org.warden.Warden1.direct")]
impl DirectIface {
    #[zbus(name = "addChain")]
    async fn add_chain(
        &self,
        ipv: String,
        table: String,
        chain: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_add_chain(Chain { family, table: table.clone(), name: chain.clone() }, caller).await)?;
        let _ = Self::chain_added(&emitter, ipv, table, chain).await;
        Ok(())
    }

    #[zbus(name = "removeChain")]
    async fn remove_chain(
        &self,
        ipv: String,
        table: String,
        chain: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_remove_chain(family, table.clone(), chain.clone(), caller).await)?;
        let _ = Self::chain_removed(&emitter, ipv, table, chain).await;
        Ok(())
    }

    #[zbus(name = "queryChain")]
    async fn query_chain(&self, ipv: String, table: String, chain: String) -> zbus::fdo::Result<bool> {
        let family = parse_family(&ipv)?;
        Ok(self.handle.direct_query_chain(family, table, chain).await)
    }

    #[zbus(name = "getChains")]
    async fn get_chains(&self, ipv: String, table: String) -> zbus::fdo::Result<Vec<String>> {
        let family = parse_family(&ipv)?;
        let chains = self.handle.direct_list_chains(family, table).await;
        Ok(chains.into_iter().map(|c| c.name).collect())
    }

    #[zbus(name = "addRule")]
    #[allow(clippy::too_many_arguments)]
    async fn add_rule(
        &self,
        ipv: String,
        table: String,
        chain: String,
        priority: i32,
        args: Vec<String>,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        let rule = DirectRule { family, table: table.clone(), chain: chain.clone(), priority, args: args.clone() };
        map(self.handle.direct_add_rule(rule, caller).await)?;
        let _ = Self::rule_added(&emitter, ipv, table, chain, priority, args).await;
        Ok(())
    }

    #[zbus(name = "removeRule")]
    #[allow(clippy::too_many_arguments)]
    async fn remove_rule(
        &self,
        ipv: String,
        table: String,
        chain: String,
        priority: i32,
        args: Vec<String>,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_remove_rule(family, table.clone(), chain.clone(), priority, args.clone(), caller).await)?;
        let _ = Self::rule_removed(&emitter, ipv, table, chain, priority, args).await;
        Ok(())
    }

    #[zbus(name = "queryRule")]
    async fn query_rule(&self, ipv: String, table: String, chain: String, priority: i32, args: Vec<String>) -> zbus::fdo::Result<bool> {
        let family = parse_family(&ipv)?;
        Ok(self.handle.direct_query_rule(family, table, chain, priority, args).await)
    }

    #[zbus(name = "getRules")]
    async fn get_rules(&self, ipv: String, table: String, chain: String) -> zbus::fdo::Result<String> {
        let family = parse_family(&ipv)?;
        let rules = self.handle.direct_list_rules(family, table, chain).await;
        serde_json::to_string(
            &rules.into_iter().map(|r| (r.priority, r.args)).collect::<Vec<_>>(),
        )
        .map_err(|error| zbus::fdo::Error::Failed(error.to_string()))
    }

    #[zbus(name = "addPassthrough")]
    async fn add_passthrough(
        &self,
        ipv: String,
        args: Vec<String>,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_add_passthrough(Passthrough { family, args: args.clone() }, caller).await)?;
        let _ = Self::passthrough_added(&emitter, ipv, args).await;
        Ok(())
    }

    #[zbus(name = "removePassthrough")]
    async fn remove_passthrough(
        &self,
        ipv: String,
        args: Vec<String>,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_remove_passthrough(family, args.clone(), caller).await)?;
        let _ = Self::passthrough_removed(&emitter, ipv, args).await;
        Ok(())
    }

    #[zbus(name = "queryPassthrough")]
    async fn query_passthrough(&self, ipv: String, args: Vec<String>) -> zbus::fdo::Result<bool> {
        let family = parse_family(&ipv)?;
        Ok(self.handle.direct_query_passthrough(family, args).await)
    }

    #[zbus(name = "getPassthroughs")]
    async fn get_passthroughs(&self, ipv: String) -> zbus::fdo::Result<Vec<Vec<String>>> {
        let family = parse_family(&ipv)?;
        Ok(self.handle.direct_list_passthroughs(family).await.into_iter().map(|p| p.args).collect())
    }

    #[zbus(name = "removeAllPassthroughs")]
    async fn remove_all_passthroughs(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_remove_all_passthroughs(caller).await)
    }

    async fn passthrough(
        &self,
        ipv: String,
        args: Vec<String>,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<String> {
        let family = parse_family(&ipv)?;
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.direct_passthrough(family, args, caller).await)
    }

    #[zbus(signal)]
    pub async fn chain_added(emitter: &SignalEmitter<'_>, ipv: String, table: String, chain: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn chain_removed(emitter: &SignalEmitter<'_>, ipv: String, table: String, chain: String) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn rule_added(emitter: &SignalEmitter<'_>, ipv: String, table: String, chain: String, priority: i32, args: Vec<String>) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn rule_removed(emitter: &SignalEmitter<'_>, ipv: String, table: String, chain: String, priority: i32, args: Vec<String>) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn passthrough_added(emitter: &SignalEmitter<'_>, ipv: String, args: Vec<String>) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn passthrough_removed(emitter: &SignalEmitter<'_>, ipv: String, args: Vec<String>) -> zbus::Result<()>;
}
