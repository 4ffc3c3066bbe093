//! D-Bus-level authorization (spec.md §6), orthogonal to [`crate::lockdown`]:
//! lockdown decides whether a caller may touch the mutating surface at all,
//! `Authz` decides whether a specific action is permitted for that caller.

use async_trait::async_trait;

use crate::lockdown::CallerIdentity;

/// A mutating action subject to authorization, named coarsely enough to map
/// onto a handful of polkit actions rather than one per D-Bus method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Config,
    Direct,
    Policies,
    Reload,
    PanicMode,
}

impl Action {
    /// The polkit action id this maps to, grounded in firewalld's
    /// `org.fedoraproject.FirewallD1.*` policy action names.
    #[must_use]
    pub fn polkit_id(self) -> &'static str {
        match self {
            Self::Config => "org.warden.Warden1.config",
            Self::Direct => "org.warden.Warden1.direct",
            Self::Policies => "org.warden.Warden1.policies",
            Self::Reload => "org.warden.Warden1.reload",
            Self::PanicMode => "org.warden.Warden1.panic",
        }
    }
}

/// Decides whether `caller` may perform `action`.
#[async_trait]
pub trait Authz: Send + Sync {
    async fn authorize(&self, caller: &CallerIdentity, action: Action) -> bool;
}

/// Permits every action. Used in tests and wherever `polkit` integration is
/// disabled by configuration.
#[derive(Debug, Default)]
pub struct AllowAllAuthz;

#[async_trait]
impl Authz for AllowAllAuthz {
    async fn authorize(&self, _caller: &CallerIdentity, _action: Action) -> bool {
        true
    }
}

/// Authorizes via `pkcheck(1)` against the caller's D-Bus unique name.
///
/// Not yet wired to a live polkit installation (spec.md's Non-goals exclude
/// a full policy-kit integration); kept as the shape future work fills in,
/// matching the interface [`AllowAllAuthz`] already satisfies.
#[derive(Debug, Default)]
pub struct PolkitAuthz;

#[async_trait]
impl Authz for PolkitAuthz {
    async fn authorize(&self, caller: &CallerIdentity, action: Action) -> bool {
        let _ = (caller, action);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allow_all_permits_every_action() {
        let authz = AllowAllAuthz;
        let caller = CallerIdentity::default();
        for action in [
            Action::Config,
            Action::Direct,
            Action::Policies,
            Action::Reload,
            Action::PanicMode,
        ] {
            assert!(authz.authorize(&caller, action).await);
        }
    }

    #[tokio::test]
    async fn polkit_stub_denies_until_wired_up() {
        let authz = PolkitAuthz;
        assert!(!authz.authorize(&CallerIdentity::default(), Action::Reload).await);
    }
}
