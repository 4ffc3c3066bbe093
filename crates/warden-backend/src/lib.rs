//! Packet-filter backend abstraction for `warden`.
//!
//! This crate defines the [`Backend`] trait — a pure command-application
//! interface that knows nothing about zones, services, or policy. The
//! `RuntimeCore` in `warden-core` wraps a `Backend` and is the only thing
//! that decides *what* rules to apply; this crate only knows *how*.
//!
//! Three implementations are provided:
//!
//! - [`NftBackend`] — production default, drives `nft` (feature `nft-backend`)
//! - [`IptablesBackend`] — legacy alternative, drives `iptables`/`ip6tables` (feature `iptables-backend`)
//! - [`MemoryBackend`] — in-memory recording backend, for testing only

mod error;
#[cfg(feature = "iptables-backend")]
mod iptables_backend;
mod memory;
#[cfg(feature = "nft-backend")]
mod nft_backend;
mod types;

pub use error::BackendError;
#[cfg(feature = "iptables-backend")]
pub use iptables_backend::IptablesBackend;
pub use memory::MemoryBackend;
#[cfg(feature = "nft-backend")]
pub use nft_backend::NftBackend;
pub use types::{Capabilities, Chain, DirectRule, Family, Passthrough, RuleDescriptor};

/// A pluggable packet-filter backend.
///
/// Implementations must be idempotent with respect to the desired state:
/// applying an already-applied rule, or removing an already-absent one, must
/// succeed without error. Implementations must be safe to share across async
/// tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Determine which address families and related features are usable on
    /// this host.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the probe itself could not run.
    async fn probe(&self) -> Result<Capabilities, BackendError>;

    /// Apply a compiled rule. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CommandFailed`] or [`BackendError::Spawn`] if
    /// the underlying command fails.
    async fn apply_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError>;

    /// Remove a previously applied rule. Idempotent — removing a rule that
    /// was never applied is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CommandFailed`] or [`BackendError::Spawn`] if
    /// the underlying command fails.
    async fn remove_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError>;

    /// Create a direct-interface chain.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ChainAlreadyExists`] if the chain is already
    /// present, or a command error if the backend call fails.
    async fn add_chain(&self, chain: &Chain) -> Result<(), BackendError>;

    /// Remove a direct-interface chain.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ChainNotFound`] if the chain is not present,
    /// or a command error if the backend call fails.
    async fn remove_chain(&self, chain: &Chain) -> Result<(), BackendError>;

    /// List direct-interface chains in a table.
    ///
    /// # Errors
    ///
    /// Returns a command error if the backend call fails.
    async fn list_chains(
        &self,
        family: Family,
        table: &str,
    ) -> Result<Vec<String>, BackendError>;

    /// Add an explicit, priority-ordered direct rule.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ChainNotFound`] if the target chain does not
    /// exist, or a command error if the backend call fails.
    async fn add_direct_rule(&self, rule: &DirectRule) -> Result<(), BackendError>;

    /// Remove a previously added direct rule.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::RuleNotFound`] if the rule was never added, or
    /// a command error if the backend call fails.
    async fn remove_direct_rule(&self, rule: &DirectRule) -> Result<(), BackendError>;

    /// List direct rules in a chain, in priority order.
    ///
    /// # Errors
    ///
    /// Returns a command error if the backend call fails.
    async fn list_direct_rules(
        &self,
        family: Family,
        table: &str,
        chain: &str,
    ) -> Result<Vec<DirectRule>, BackendError>;

    /// Execute a raw, untracked command against the packet filter and return
    /// its textual output verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CommandFailed`] or [`BackendError::Spawn`] if
    /// the command fails.
    async fn passthrough(&self, family: Family, args: &[String]) -> Result<String, BackendError>;

    /// Flush all chains and tables, resetting the backend to a clean state.
    /// Used on daemon start, stop, and `completeReload`.
    ///
    /// # Errors
    ///
    /// Returns a command error if the flush fails.
    async fn flush_all(&self) -> Result<(), BackendError>;
}
