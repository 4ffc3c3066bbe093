//! The four D-Bus interfaces `wardend` serves at `/org/warden/Warden1`, and
//! the signal relay that turns [`warden_core::Signal`]s into emitted D-Bus
//! signals on the matching interface.

pub mod direct_iface;
pub mod main_iface;
pub mod policies_iface;
pub mod signals;
pub mod zone_iface;

pub use direct_iface::DirectIface;
pub use main_iface::MainIface;
pub use policies_iface::PoliciesIface;
pub use zone_iface::ZoneIface;

/// The single object path every interface is registered under.
pub const OBJECT_PATH: &str = "/org/warden/Warden1";

/// The well-known bus name the daemon requests.
pub const BUS_NAME: &str = "org.warden.Warden1";
