//! `wardenctl` — command-line client for `wardend`.
//!
//! A thin D-Bus client: every subcommand is a direct call into one of the
//! four interfaces under `org.warden.Warden1` (see `proxy`). No rich-rule
//! grammar, zone resolution, or authorization logic lives here — that is
//! the daemon's job, this binary just marshals arguments and prints what
//! comes back.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod proxy;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use proxy::{BUS_NAME, DirectProxy, MainProxy, OBJECT_PATH, PoliciesProxy, ZoneProxy};

/// wardenctl — talk to the Warden firewall daemon over D-Bus.
#[derive(Parser)]
#[command(name = "wardenctl", version, about = "Command-line client for the Warden firewall daemon")]
struct Cli {
    /// Connect to the session bus instead of the system bus.
    #[arg(long, global = true)]
    session: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the daemon's state, version, and packet-filter capabilities.
    State,
    /// Reload the permanent configuration, keeping runtime-only changes.
    Reload,
    /// Reload and drop any runtime-only changes.
    #[command(name = "complete-reload")]
    CompleteReload,
    /// Persist the current runtime configuration as the new permanent configuration.
    #[command(name = "runtime-to-permanent")]
    RuntimeToPermanent,
    /// Panic mode: drop all traffic regardless of zone configuration.
    Panic {
        #[command(subcommand)]
        action: PanicCommands,
    },
    /// Zone catalog, membership, and element operations.
    Zone {
        #[command(subcommand)]
        action: ZoneCommands,
    },
    /// Service and ICMP-type catalog lookups.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommands,
    },
    /// Raw chain/rule/passthrough operations, addressed by table and priority.
    Direct {
        #[command(subcommand)]
        action: DirectCommands,
    },
    /// Lockdown mode and its whitelists.
    Lockdown {
        #[command(subcommand)]
        action: LockdownCommands,
    },
}

#[derive(Subcommand)]
enum PanicCommands {
    Enable,
    Disable,
    Query,
}

#[derive(Subcommand)]
enum ZoneCommands {
    /// List every zone name.
    List,
    /// List every zone with at least one bound interface or source.
    ListActive,
    /// Dump every zone's settings as JSON.
    ListAllSettings,
    /// Print the default zone's name.
    GetDefault,
    /// Set the default zone.
    SetDefault { zone: String },
    /// Dump a single zone's settings as JSON.
    GetSettings { zone: String },
    /// Print the zone an interface currently resolves to.
    GetZoneOfInterface { interface: String },
    /// Print the zone a source currently resolves to.
    GetZoneOfSource { source: String },
    /// `is_immutable`'s contract is degenerate: this always prints `false`.
    IsImmutable { zone: String },
    GetTarget { zone: String },
    SetTarget { zone: String, target: String },
    AddInterface { zone: String, interface: String },
    RemoveInterface { zone: String, interface: String },
    QueryInterface { zone: String, interface: String },
    AddSource { zone: String, source: String },
    RemoveSource { zone: String, source: String },
    QuerySource { zone: String, source: String },
    AddService {
        zone: String,
        service: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemoveService { zone: String, service: String },
    QueryService { zone: String, service: String },
    AddPort {
        zone: String,
        port: String,
        protocol: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemovePort { zone: String, port: String, protocol: String },
    QueryPort { zone: String, port: String, protocol: String },
    AddProtocol {
        zone: String,
        protocol: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemoveProtocol { zone: String, protocol: String },
    QueryProtocol { zone: String, protocol: String },
    AddMasquerade {
        zone: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemoveMasquerade { zone: String },
    QueryMasquerade { zone: String },
    AddForwardPort {
        zone: String,
        port: String,
        protocol: String,
        #[arg(long)]
        to_port: String,
        #[arg(long)]
        to_addr: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemoveForwardPort {
        zone: String,
        port: String,
        protocol: String,
        #[arg(long)]
        to_port: String,
        #[arg(long)]
        to_addr: String,
    },
    QueryForwardPort {
        zone: String,
        port: String,
        protocol: String,
        #[arg(long)]
        to_port: String,
        #[arg(long)]
        to_addr: String,
    },
    AddRichRule {
        zone: String,
        rule: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemoveRichRule { zone: String, rule: String },
    QueryRichRule { zone: String, rule: String },
    AddIcmpBlock {
        zone: String,
        icmp_type: String,
        #[arg(long, default_value_t = 0)]
        timeout: u32,
    },
    RemoveIcmpBlock { zone: String, icmp_type: String },
    QueryIcmpBlock { zone: String, icmp_type: String },
    AddIcmpBlockInversion { zone: String },
    RemoveIcmpBlockInversion { zone: String },
    QueryIcmpBlockInversion { zone: String },
}

#[derive(Subcommand)]
enum CatalogCommands {
    ListServices,
    GetServiceSettings { name: String },
    ListIcmpTypes,
    GetIcmpTypeSettings { name: String },
}

#[derive(Subcommand)]
enum DirectCommands {
    AddChain { ipv: String, table: String, chain: String },
    RemoveChain { ipv: String, table: String, chain: String },
    QueryChain { ipv: String, table: String, chain: String },
    GetChains { ipv: String, table: String },
    AddRule {
        ipv: String,
        table: String,
        chain: String,
        priority: i32,
        args: Vec<String>,
    },
    RemoveRule {
        ipv: String,
        table: String,
        chain: String,
        priority: i32,
        args: Vec<String>,
    },
    QueryRule {
        ipv: String,
        table: String,
        chain: String,
        priority: i32,
        args: Vec<String>,
    },
    GetRules { ipv: String, table: String, chain: String },
    AddPassthrough { ipv: String, args: Vec<String> },
    RemovePassthrough { ipv: String, args: Vec<String> },
    QueryPassthrough { ipv: String, args: Vec<String> },
    GetPassthroughs { ipv: String },
    RemoveAllPassthroughs,
    /// Run an untracked raw command directly against the backend.
    Passthrough { ipv: String, args: Vec<String> },
}

#[derive(Subcommand)]
enum LockdownCommands {
    Enable,
    Disable,
    Query,
    WhitelistCommand {
        #[command(subcommand)]
        action: WhitelistAction,
    },
    WhitelistUser {
        #[command(subcommand)]
        action: WhitelistAction,
    },
    WhitelistContext {
        #[command(subcommand)]
        action: WhitelistAction,
    },
    WhitelistUid {
        #[command(subcommand)]
        action: WhitelistUidAction,
    },
}

#[derive(Subcommand)]
enum WhitelistAction {
    Add { value: String },
    Remove { value: String },
    Query { value: String },
    List,
}

#[derive(Subcommand)]
enum WhitelistUidAction {
    Add { uid: u32 },
    Remove { uid: u32 },
    Query { uid: u32 },
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn connect(session: bool) -> Result<zbus::Connection> {
    let builder = if session { zbus::connection::Builder::session()? } else { zbus::connection::Builder::system()? };
    builder.build().await.context("failed to connect to the D-Bus daemon bus")
}

async fn main_proxy(connection: &zbus::Connection) -> Result<MainProxy<'_>> {
    MainProxy::builder(connection)
        .destination(BUS_NAME)?
        .path(OBJECT_PATH)?
        .build()
        .await
        .context("failed to build the main interface proxy")
}

async fn zone_proxy(connection: &zbus::Connection) -> Result<ZoneProxy<'_>> {
    ZoneProxy::builder(connection)
        .destination(BUS_NAME)?
        .path(OBJECT_PATH)?
        .build()
        .await
        .context("failed to build the zone interface proxy")
}

async fn direct_proxy(connection: &zbus::Connection) -> Result<DirectProxy<'_>> {
    DirectProxy::builder(connection)
        .destination(BUS_NAME)?
        .path(OBJECT_PATH)?
        .build()
        .await
        .context("failed to build the direct interface proxy")
}

async fn policies_proxy(connection: &zbus::Connection) -> Result<PoliciesProxy<'_>> {
    PoliciesProxy::builder(connection)
        .destination(BUS_NAME)?
        .path(OBJECT_PATH)?
        .build()
        .await
        .context("failed to build the policies interface proxy")
}

fn print_bool(value: bool) {
    println!("{}", if value { "yes" } else { "no" });
}

async fn run(cli: Cli) -> Result<()> {
    let connection = connect(cli.session).await?;

    match cli.command {
        Commands::State => {
            let main = main_proxy(&connection).await?;
            println!("state:             {}", main.state().await?);
            println!("version:           {}", main.version().await?);
            println!("interface-version: {}", main.interface_version().await?);
            println!("ipv4:              {}", main.ipv4().await?);
            println!("ipv6:              {}", main.ipv6().await?);
            println!("ipv6-rpfilter:     {}", main.ipv6_rpfilter().await?);
            println!("bridge:            {}", main.bridge().await?);
        }
        Commands::Reload => main_proxy(&connection).await?.reload().await?,
        Commands::CompleteReload => main_proxy(&connection).await?.complete_reload().await?,
        Commands::RuntimeToPermanent => main_proxy(&connection).await?.runtime_to_permanent().await?,
        Commands::Panic { action } => {
            let main = main_proxy(&connection).await?;
            match action {
                PanicCommands::Enable => main.enable_panic_mode().await?,
                PanicCommands::Disable => main.disable_panic_mode().await?,
                PanicCommands::Query => print_bool(main.query_panic_mode().await?),
            }
        }
        Commands::Catalog { action } => {
            let main = main_proxy(&connection).await?;
            match action {
                CatalogCommands::ListServices => print_lines(main.list_services().await?),
                CatalogCommands::GetServiceSettings { name } => println!("{}", main.get_service_settings(&name).await?),
                CatalogCommands::ListIcmpTypes => print_lines(main.list_icmp_types().await?),
                CatalogCommands::GetIcmpTypeSettings { name } => println!("{}", main.get_icmp_type_settings(&name).await?),
            }
        }
        Commands::Zone { action } => run_zone(&connection, action).await?,
        Commands::Direct { action } => run_direct(&connection, action).await?,
        Commands::Lockdown { action } => run_lockdown(&connection, action).await?,
    }

    Ok(())
}

fn print_lines(values: Vec<String>) {
    for value in values {
        println!("{value}");
    }
}

#[allow(clippy::too_many_lines)]
async fn run_zone(connection: &zbus::Connection, action: ZoneCommands) -> Result<()> {
    let zone = zone_proxy(connection).await?;
    match action {
        ZoneCommands::List => print_lines(zone.get_zones().await?),
        ZoneCommands::ListActive => println!("{}", zone.get_active_zones().await?),
        ZoneCommands::ListAllSettings => println!("{}", zone.list_all_zone_settings().await?),
        ZoneCommands::GetDefault => {
            println!("{}", main_proxy(connection).await?.get_default_zone().await?);
        }
        ZoneCommands::SetDefault { zone: name } => {
            main_proxy(connection).await?.set_default_zone(&name).await?;
        }
        ZoneCommands::GetSettings { zone: name } => println!("{}", main_proxy(connection).await?.get_zone_settings(&name).await?),
        ZoneCommands::GetZoneOfInterface { interface } => println!("{}", zone.get_zone_of_interface(&interface).await?),
        ZoneCommands::GetZoneOfSource { source } => println!("{}", zone.get_zone_of_source(&source).await?),
        ZoneCommands::IsImmutable { zone: name } => print_bool(zone.is_immutable(&name).await?),
        ZoneCommands::GetTarget { zone: name } => println!("{}", zone.get_zone_target(&name).await?),
        ZoneCommands::SetTarget { zone: name, target } => println!("{}", zone.set_zone_target(&name, &target).await?),
        ZoneCommands::AddInterface { zone: name, interface } => println!("{}", zone.add_interface(&name, &interface).await?),
        ZoneCommands::RemoveInterface { zone: name, interface } => println!("{}", zone.remove_interface(&name, &interface).await?),
        ZoneCommands::QueryInterface { zone: name, interface } => print_bool(zone.query_interface(&name, &interface).await?),
        ZoneCommands::AddSource { zone: name, source } => println!("{}", zone.add_source(&name, &source).await?),
        ZoneCommands::RemoveSource { zone: name, source } => println!("{}", zone.remove_source(&name, &source).await?),
        ZoneCommands::QuerySource { zone: name, source } => print_bool(zone.query_source(&name, &source).await?),
        ZoneCommands::AddService { zone: name, service, timeout } => println!("{}", zone.add_service(&name, &service, timeout).await?),
        ZoneCommands::RemoveService { zone: name, service } => println!("{}", zone.remove_service(&name, &service).await?),
        ZoneCommands::QueryService { zone: name, service } => print_bool(zone.query_service(&name, &service).await?),
        ZoneCommands::AddPort { zone: name, port, protocol, timeout } => {
            println!("{}", zone.add_port(&name, &port, &protocol, timeout).await?);
        }
        ZoneCommands::RemovePort { zone: name, port, protocol } => println!("{}", zone.remove_port(&name, &port, &protocol).await?),
        ZoneCommands::QueryPort { zone: name, port, protocol } => print_bool(zone.query_port(&name, &port, &protocol).await?),
        ZoneCommands::AddProtocol { zone: name, protocol, timeout } => {
            println!("{}", zone.add_protocol(&name, &protocol, timeout).await?);
        }
        ZoneCommands::RemoveProtocol { zone: name, protocol } => println!("{}", zone.remove_protocol(&name, &protocol).await?),
        ZoneCommands::QueryProtocol { zone: name, protocol } => print_bool(zone.query_protocol(&name, &protocol).await?),
        ZoneCommands::AddMasquerade { zone: name, timeout } => println!("{}", zone.add_masquerade(&name, timeout).await?),
        ZoneCommands::RemoveMasquerade { zone: name } => println!("{}", zone.remove_masquerade(&name).await?),
        ZoneCommands::QueryMasquerade { zone: name } => print_bool(zone.query_masquerade(&name).await?),
        ZoneCommands::AddForwardPort { zone: name, port, protocol, to_port, to_addr, timeout } => {
            println!("{}", zone.add_forward_port(&name, &port, &protocol, &to_port, &to_addr, timeout).await?);
        }
        ZoneCommands::RemoveForwardPort { zone: name, port, protocol, to_port, to_addr } => {
            println!("{}", zone.remove_forward_port(&name, &port, &protocol, &to_port, &to_addr).await?);
        }
        ZoneCommands::QueryForwardPort { zone: name, port, protocol, to_port, to_addr } => {
            print_bool(zone.query_forward_port(&name, &port, &protocol, &to_port, &to_addr).await?);
        }
        ZoneCommands::AddRichRule { zone: name, rule, timeout } => println!("{}", zone.add_rich_rule(&name, &rule, timeout).await?),
        ZoneCommands::RemoveRichRule { zone: name, rule } => println!("{}", zone.remove_rich_rule(&name, &rule).await?),
        ZoneCommands::QueryRichRule { zone: name, rule } => print_bool(zone.query_rich_rule(&name, &rule).await?),
        ZoneCommands::AddIcmpBlock { zone: name, icmp_type, timeout } => {
            println!("{}", zone.add_icmp_block(&name, &icmp_type, timeout).await?);
        }
        ZoneCommands::RemoveIcmpBlock { zone: name, icmp_type } => println!("{}", zone.remove_icmp_block(&name, &icmp_type).await?),
        ZoneCommands::QueryIcmpBlock { zone: name, icmp_type } => print_bool(zone.query_icmp_block(&name, &icmp_type).await?),
        ZoneCommands::AddIcmpBlockInversion { zone: name } => println!("{}", zone.add_icmp_block_inversion(&name).await?),
        ZoneCommands::RemoveIcmpBlockInversion { zone: name } => println!("{}", zone.remove_icmp_block_inversion(&name).await?),
        ZoneCommands::QueryIcmpBlockInversion { zone: name } => print_bool(zone.query_icmp_block_inversion(&name).await?),
    }
    Ok(())
}

async fn run_direct(connection: &zbus::Connection, action: DirectCommands) -> Result<()> {
    let direct = direct_proxy(connection).await?;
    match action {
        DirectCommands::AddChain { ipv, table, chain } => direct.add_chain(&ipv, &table, &chain).await?,
        DirectCommands::RemoveChain { ipv, table, chain } => direct.remove_chain(&ipv, &table, &chain).await?,
        DirectCommands::QueryChain { ipv, table, chain } => print_bool(direct.query_chain(&ipv, &table, &chain).await?),
        DirectCommands::GetChains { ipv, table } => print_lines(direct.get_chains(&ipv, &table).await?),
        DirectCommands::AddRule { ipv, table, chain, priority, args } => {
            direct.add_rule(&ipv, &table, &chain, priority, args.iter().map(String::as_str).collect()).await?;
        }
        DirectCommands::RemoveRule { ipv, table, chain, priority, args } => {
            direct.remove_rule(&ipv, &table, &chain, priority, args.iter().map(String::as_str).collect()).await?;
        }
        DirectCommands::QueryRule { ipv, table, chain, priority, args } => {
            print_bool(direct.query_rule(&ipv, &table, &chain, priority, args.iter().map(String::as_str).collect()).await?);
        }
        DirectCommands::GetRules { ipv, table, chain } => println!("{}", direct.get_rules(&ipv, &table, &chain).await?),
        DirectCommands::AddPassthrough { ipv, args } => direct.add_passthrough(&ipv, args.iter().map(String::as_str).collect()).await?,
        DirectCommands::RemovePassthrough { ipv, args } => {
            direct.remove_passthrough(&ipv, args.iter().map(String::as_str).collect()).await?;
        }
        DirectCommands::QueryPassthrough { ipv, args } => {
            print_bool(direct.query_passthrough(&ipv, args.iter().map(String::as_str).collect()).await?);
        }
        DirectCommands::GetPassthroughs { ipv } => {
            for entry in direct.get_passthroughs(&ipv).await? {
                println!("{}", entry.join(" "));
            }
        }
        DirectCommands::RemoveAllPassthroughs => direct.remove_all_passthroughs().await?,
        DirectCommands::Passthrough { ipv, args } => println!("{}", direct.passthrough(&ipv, args.iter().map(String::as_str).collect()).await?),
    }
    Ok(())
}

async fn run_lockdown(connection: &zbus::Connection, action: LockdownCommands) -> Result<()> {
    let policies = policies_proxy(connection).await?;
    match action {
        LockdownCommands::Enable => policies.enable_lockdown().await?,
        LockdownCommands::Disable => policies.disable_lockdown().await?,
        LockdownCommands::Query => print_bool(policies.query_lockdown().await?),
        LockdownCommands::WhitelistCommand { action } => match action {
            WhitelistAction::Add { value } => policies.add_lockdown_whitelist_command(&value).await?,
            WhitelistAction::Remove { value } => policies.remove_lockdown_whitelist_command(&value).await?,
            WhitelistAction::Query { value } => print_bool(policies.query_lockdown_whitelist_command(&value).await?),
            WhitelistAction::List => print_lines(policies.get_lockdown_whitelist_commands().await?),
        },
        LockdownCommands::WhitelistUser { action } => match action {
            WhitelistAction::Add { value } => policies.add_lockdown_whitelist_user(&value).await?,
            WhitelistAction::Remove { value } => policies.remove_lockdown_whitelist_user(&value).await?,
            WhitelistAction::Query { value } => print_bool(policies.query_lockdown_whitelist_user(&value).await?),
            WhitelistAction::List => print_lines(policies.get_lockdown_whitelist_users().await?),
        },
        LockdownCommands::WhitelistContext { action } => match action {
            WhitelistAction::Add { value } => policies.add_lockdown_whitelist_context(&value).await?,
            WhitelistAction::Remove { value } => policies.remove_lockdown_whitelist_context(&value).await?,
            WhitelistAction::Query { value } => print_bool(policies.query_lockdown_whitelist_context(&value).await?),
            WhitelistAction::List => print_lines(policies.get_lockdown_whitelist_contexts().await?),
        },
        LockdownCommands::WhitelistUid { action } => match action {
            WhitelistUidAction::Add { uid } => policies.add_lockdown_whitelist_uid(uid).await?,
            WhitelistUidAction::Remove { uid } => policies.remove_lockdown_whitelist_uid(uid).await?,
            WhitelistUidAction::Query { uid } => print_bool(policies.query_lockdown_whitelist_uid(uid).await?),
            WhitelistUidAction::List => {
                for uid in policies.get_lockdown_whitelist_uids().await? {
                    println!("{uid}");
                }
            }
        },
    }
    Ok(())
}
