//! Lockdown: a whitelist gating which local callers may issue mutating
//! requests at all, independent of D-Bus-level authorization (spec.md §3,
//! §6). Modeled on firewalld's `lockdown-whitelist.xml` (`context`, `uid`,
//! `user`, `command` entries checked in that order).

use std::collections::BTreeSet;

/// The identity of a caller attempting a mutating operation, as resolved by
/// the IPC layer from the D-Bus connection credentials.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    /// SELinux context of the connecting process, if available.
    pub context: Option<String>,
    pub uid: Option<u32>,
    pub user: Option<String>,
    /// The calling process's command line, if available (`/proc/<pid>/cmdline`).
    pub command: Option<String>,
}

/// The set of callers permitted to perform lockdown-gated operations.
///
/// An empty whitelist in every field means lockdown is effectively
/// disabled — `is_enabled()` reports this so `RuntimeCore` can skip the
/// check entirely rather than reject every caller.
#[derive(Debug, Clone, Default)]
pub struct LockdownWhitelist {
    pub enabled: bool,
    pub contexts: BTreeSet<String>,
    pub uids: BTreeSet<u32>,
    pub users: BTreeSet<String>,
    pub commands: BTreeSet<String>,
}

impl LockdownWhitelist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `caller` is permitted. Checked in the order firewalld
    /// documents: context, then uid, then user, then command — the first
    /// matching entry wins.
    #[must_use]
    pub fn permits(&self, caller: &CallerIdentity) -> bool {
        if !self.enabled {
            return true;
        }

        if let Some(ref ctx) = caller.context {
            if self.contexts.contains(ctx) {
                return true;
            }
        }
        if let Some(uid) = caller.uid {
            if self.uids.contains(&uid) {
                return true;
            }
        }
        if let Some(ref user) = caller.user {
            if self.users.contains(user) {
                return true;
            }
        }
        if let Some(ref command) = caller.command {
            if self.commands.contains(command) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_whitelist_permits_everyone() {
        let wl = LockdownWhitelist::new();
        assert!(wl.permits(&CallerIdentity::default()));
    }

    #[test]
    fn enabled_whitelist_rejects_unlisted_caller() {
        let wl = LockdownWhitelist { enabled: true, ..LockdownWhitelist::default() };
        assert!(!wl.permits(&CallerIdentity::default()));
    }

    #[test]
    fn uid_match_permits() {
        let mut wl = LockdownWhitelist { enabled: true, ..LockdownWhitelist::default() };
        wl.uids.insert(1000);
        let caller = CallerIdentity { uid: Some(1000), ..CallerIdentity::default() };
        assert!(wl.permits(&caller));
    }

    #[test]
    fn uid_mismatch_falls_through_to_user_check() {
        let mut wl = LockdownWhitelist { enabled: true, ..LockdownWhitelist::default() };
        wl.uids.insert(1000);
        wl.users.insert("alice".to_owned());
        let caller = CallerIdentity {
            uid: Some(2000),
            user: Some("alice".to_owned()),
            ..CallerIdentity::default()
        };
        assert!(wl.permits(&caller));
    }
}
