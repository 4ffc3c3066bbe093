//! `wardend` entry point.
//!
//! Bootstraps configuration, logging, the packet-filter backend, the
//! `warden-core` policy runtime, and the D-Bus object server, then waits for
//! `SIGINT`/`SIGTERM` before draining in-flight work and exiting.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use warden_backend::Backend;
use warden_core::{AllowAllAuthz, Authz, MemoryStore, PersistentStore, PolkitAuthz, RuntimeCore};

use warden_server::actor;
use warden_server::config::{AuthzChoice, BackendChoice, BusChoice, ServerConfig};
use warden_server::dbus::{DirectIface, MainIface, PoliciesIface, ZoneIface, BUS_NAME, OBJECT_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(backend = ?config.backend, bus = ?config.bus, "wardend starting");

    let backend = build_backend(&config);
    let authz = build_authz(&config);
    let store: Arc<dyn PersistentStore> = Arc::new(MemoryStore::new());

    let (core, signal_rx) = RuntimeCore::start(backend, authz, store)
        .await
        .context("failed to start the policy runtime")?;
    info!(capabilities = ?core.capabilities(), "policy runtime started");

    let handle = actor::spawn(core);

    let connection = connect(&config, handle).await.context("failed to establish the D-Bus connection")?;

    tokio::spawn(warden_server::dbus::signals::run(connection.clone(), signal_rx));

    info!(bus_name = BUS_NAME, path = OBJECT_PATH, "wardend ready");

    shutdown_signal().await;
    info!("shutdown signal received, stopping wardend");

    Ok(())
}

fn build_backend(config: &ServerConfig) -> Arc<dyn Backend> {
    match config.backend {
        #[cfg(feature = "nft-backend")]
        BackendChoice::Nft => Arc::new(warden_backend::NftBackend::new()),
        #[cfg(not(feature = "nft-backend"))]
        BackendChoice::Nft => {
            tracing::warn!("WARDEND_BACKEND=nft requested but the nft-backend feature is not compiled in; falling back to memory");
            Arc::new(warden_backend::MemoryBackend::new())
        }
        #[cfg(feature = "iptables-backend")]
        BackendChoice::Iptables => Arc::new(warden_backend::IptablesBackend::new()),
        #[cfg(not(feature = "iptables-backend"))]
        BackendChoice::Iptables => {
            tracing::warn!("WARDEND_BACKEND=iptables requested but the iptables-backend feature is not compiled in; falling back to memory");
            Arc::new(warden_backend::MemoryBackend::new())
        }
        BackendChoice::Memory => Arc::new(warden_backend::MemoryBackend::new()),
    }
}

fn build_authz(config: &ServerConfig) -> Arc<dyn Authz> {
    match config.authz {
        AuthzChoice::Polkit => Arc::new(PolkitAuthz),
        AuthzChoice::AllowAll => {
            tracing::warn!("WARDEND_AUTHZ=allow-all: every caller is authorized for every action, do not use in production");
            Arc::new(AllowAllAuthz)
        }
    }
}

/// Connects to the configured bus and registers all four interfaces at
/// [`OBJECT_PATH`] before requesting [`BUS_NAME`].
async fn connect(config: &ServerConfig, handle: actor::Handle) -> zbus::Result<zbus::Connection> {
    let builder = match config.bus {
        BusChoice::System => zbus::connection::Builder::system()?,
        BusChoice::Session => zbus::connection::Builder::session()?,
    };

    builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, MainIface { handle: handle.clone() })?
        .serve_at(OBJECT_PATH, ZoneIface { handle: handle.clone() })?
        .serve_at(OBJECT_PATH, DirectIface { handle: handle.clone() })?
        .serve_at(OBJECT_PATH, PoliciesIface { handle })?
        .build()
        .await
}

/// Waits for `SIGINT` or, on Unix, `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            signal.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
