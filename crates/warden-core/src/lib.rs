//! Core policy runtime for `warden`: the in-memory [`Model`](model::Model),
//! its [`RuntimeCore`](runtime::RuntimeCore) transactional facade, the
//! [`Scheduler`](scheduler::Scheduler) that times out non-permanent
//! additions, and the [`rulemap`] compiler that is the only thing allowed to
//! turn policy state into [`warden_backend::RuleDescriptor`]s.
//!
//! Nothing in this crate talks to D-Bus or the process environment — that is
//! `warden-server`'s job. `warden-core` is pure policy and state.

pub mod authz;
pub mod direct;
pub mod icmptype;
pub mod lockdown;
pub mod model;
pub mod persistent;
pub mod richrule;
mod rulemap;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod zone;

pub use authz::{Action, AllowAllAuthz, Authz, PolkitAuthz};
pub use direct::DirectConfig;
pub use icmptype::IcmpType;
pub use lockdown::{CallerIdentity, LockdownWhitelist};
pub use model::{Model, ModelError};
pub use persistent::{MemoryStore, PersistentStore, StoreError};
pub use richrule::{parse as parse_rich_rule, RichRule, RichRuleError, RuleFamily};
pub use runtime::{RuntimeCore, RuntimeError, RuntimeState, Signal, ZoneElement};
pub use scheduler::Scheduler;
pub use service::Service;
pub use zone::{ForwardPort, PortRange, RichRuleEntry, Zone, ZoneTarget};
