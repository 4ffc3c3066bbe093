//! Maps [`RuntimeError`] onto the handful of standard D-Bus error names a
//! firewalld-style client actually branches on (`AccessDenied`,
//! `InvalidArgs`, a generic `Failed`). Everything else — chain/rule not
//! found, already-exists, store I/O — collapses into `org.freedesktop.
//! DBus.Error.Failed` with the original message preserved, same as
//! firewalld itself does for its long tail of `FirewallError` subclasses.

use warden_core::RuntimeError;

/// Converts a `RuntimeError` into the `zbus::fdo::Error` a D-Bus method
/// handler returns. Kept as a free function rather than a `From` impl
/// because `zbus::fdo::Error` lives outside both crates.
pub fn to_fdo_error(error: RuntimeError) -> zbus::fdo::Error {
    match error {
        RuntimeError::AccessDenied(reason) => zbus::fdo::Error::AccessDenied(reason),
        other => zbus::fdo::Error::Failed(other.to_string()),
    }
}

/// Converts a `RuntimeError`-producing `Result` into the `zbus::fdo::Result`
/// every generated interface method must return.
pub fn map<T>(result: Result<T, RuntimeError>) -> zbus::fdo::Result<T> {
    result.map_err(to_fdo_error)
}
