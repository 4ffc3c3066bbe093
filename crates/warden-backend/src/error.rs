//! Error types for `warden-backend`.

/// Errors returned by a [`crate::Backend`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend's external command exited with a non-zero status.
    #[error("command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// Spawning or communicating with the backend's external command failed.
    #[error("failed to run command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The requested address family is not available on this host (see [`crate::Capabilities`]).
    #[error("address family '{family}' is not usable on this host")]
    FamilyUnavailable { family: String },

    /// A chain operation was attempted against a chain that does not exist.
    #[error("chain not found: {table}/{chain}")]
    ChainNotFound { table: String, chain: String },

    /// A chain add was attempted against a chain that already exists.
    #[error("chain already exists: {table}/{chain}")]
    ChainAlreadyExists { table: String, chain: String },

    /// A direct rule remove was attempted against a rule that was never added.
    #[error("rule not found: {table}/{chain} priority {priority}")]
    RuleNotFound {
        table: String,
        chain: String,
        priority: i32,
    },
}
