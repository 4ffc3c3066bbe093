//! `wardend`: the privileged daemon binary that bootstraps
//! [`warden_core::RuntimeCore`] and a [`warden_backend::Backend`], then
//! serves the policy runtime over D-Bus (spec.md §4.6/§6).
//!
//! Split out as a library so integration tests can drive the actor and the
//! D-Bus interfaces directly, in-process, without going through a real bus
//! connection.

pub mod actor;
pub mod caller;
pub mod config;
pub mod dbus;
pub mod dto;
pub mod error;
