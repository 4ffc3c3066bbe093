//! Daemon configuration for `wardend`.
//!
//! Loads configuration from environment variables with sensible defaults,
//! all overridable via `WARDEND_*` environment variables.

/// Which D-Bus bus to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusChoice {
    /// The system bus — where a real daemon runs, requiring root or a
    /// policykit-granted user to do anything mutating.
    System,
    /// The session bus — used for local development and integration tests,
    /// where no bus-activation policy file is installed.
    Session,
}

/// Which packet-filter backend to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Nft,
    Iptables,
    /// No real backend — tracks state in memory only. Used for development
    /// and for running the daemon somewhere `nft`/`iptables` aren't root.
    Memory,
}

/// Which authorization gate to use for mutating requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzChoice {
    /// Defers to polkit (not yet wired to a live installation — see
    /// [`warden_core::PolkitAuthz`]).
    Polkit,
    /// Permits every caller. Only appropriate for local development.
    AllowAll,
}

/// Daemon configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bus: BusChoice,
    pub backend: BackendChoice,
    pub authz: AuthzChoice,
    pub log_level: String,
    pub log_json: bool,
}

impl ServerConfig {
    /// Loads configuration from the environment.
    ///
    /// Environment variables:
    /// - `WARDEND_BUS` — `system` or `session` (default: `system`)
    /// - `WARDEND_BACKEND` — `nft`, `iptables`, or `memory` (default: `nft`
    ///   if compiled with the `nft-backend` feature, `memory` otherwise)
    /// - `WARDEND_AUTHZ` — `polkit` or `allow-all` (default: `polkit`)
    /// - `WARDEND_LOG_LEVEL` — log filter passed to `tracing_subscriber`'s
    ///   `EnvFilter` (default: `info`)
    /// - `WARDEND_LOG_FORMAT` — `json` or `pretty` (default: `json`)
    #[must_use]
    pub fn from_env() -> Self {
        let bus = match std::env::var("WARDEND_BUS").unwrap_or_default().to_lowercase().as_str() {
            "session" => BusChoice::Session,
            _ => BusChoice::System,
        };

        let default_backend = if cfg!(feature = "nft-backend") {
            "nft"
        } else if cfg!(feature = "iptables-backend") {
            "iptables"
        } else {
            "memory"
        };
        let backend = match std::env::var("WARDEND_BACKEND").unwrap_or_else(|_| default_backend.to_owned()).to_lowercase().as_str() {
            "iptables" => BackendChoice::Iptables,
            "memory" => BackendChoice::Memory,
            _ => BackendChoice::Nft,
        };

        let authz = match std::env::var("WARDEND_AUTHZ").unwrap_or_default().to_lowercase().as_str() {
            "allow-all" | "allow_all" => AuthzChoice::AllowAll,
            _ => AuthzChoice::Polkit,
        };

        let log_level = std::env::var("WARDEND_LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
        let log_json = std::env::var("WARDEND_LOG_FORMAT").map(|v| v != "pretty").unwrap_or(true);

        Self { bus, backend, authz, log_level, log_json }
    }
}
