//! The persistent on-disk configuration store (spec.md §6): explicitly out
//! of scope as an implementation ("treated as an opaque loader/saver keyed
//! by name"), so this module defines only the trait boundary `RuntimeCore`
//! consults, plus an in-memory double used by every `warden-core` test —
//! the same role `MemoryBackend` plays for `warden_backend::Backend`.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::direct::DirectConfig;
use crate::icmptype::IcmpType;
use crate::lockdown::LockdownWhitelist;
use crate::service::Service;
use crate::zone::Zone;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("persistent store I/O error: {0}")]
    Io(String),
    #[error("entity '{0}' not found in persistent store")]
    NotFound(String),
}

/// Loads and saves the permanent (on-disk) representation of everything
/// `runtimeToPermanent` and `reload` move between Model and disk. Keyed by
/// entity name, as spec.md §1 describes it.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn load_default_zone(&self) -> Result<String, StoreError>;
    async fn load_zones(&self) -> Result<Vec<Zone>, StoreError>;
    async fn load_services(&self) -> Result<Vec<Service>, StoreError>;
    async fn load_icmptypes(&self) -> Result<Vec<IcmpType>, StoreError>;
    async fn load_lockdown_whitelist(&self) -> Result<LockdownWhitelist, StoreError>;
    async fn load_direct_config(&self) -> Result<DirectConfig, StoreError>;

    /// Persists `zone`. Returns `true` if the stored representation changed.
    async fn save_zone(&self, zone: &Zone) -> Result<bool, StoreError>;
    async fn save_service(&self, service: &Service) -> Result<bool, StoreError>;
    async fn save_icmptype(&self, icmptype: &IcmpType) -> Result<bool, StoreError>;
    async fn save_lockdown_whitelist(&self, whitelist: &LockdownWhitelist) -> Result<bool, StoreError>;
    async fn save_direct_config(&self, config: &DirectConfig) -> Result<bool, StoreError>;
}

/// An in-memory `PersistentStore`, used by `warden-core`'s own test suite
/// and as the default store when no on-disk backend is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreState>,
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    default_zone: String,
    zones: BTreeMap<String, Zone>,
    services: BTreeMap<String, Service>,
    icmptypes: BTreeMap<String, IcmpType>,
    lockdown: LockdownWhitelist,
    direct: DirectConfig,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryStoreState {
                default_zone: "public".to_owned(),
                zones: BTreeMap::from([("public".to_owned(), Zone::new("public"))]),
                ..MemoryStoreState::default()
            }),
        }
    }

    /// Seeds the store with a service definition (test/bootstrap helper).
    pub async fn seed_service(&self, service: Service) {
        self.inner.lock().await.services.insert(service.name.clone(), service);
    }

    /// Seeds the store with an icmp type definition (test/bootstrap helper).
    pub async fn seed_icmptype(&self, icmptype: IcmpType) {
        self.inner.lock().await.icmptypes.insert(icmptype.name.clone(), icmptype);
    }
}

fn zones_equal(a: &Zone, b: &Zone) -> bool {
    a.name == b.name
        && a.target == b.target
        && a.interfaces == b.interfaces
        && a.sources == b.sources
        && a.services == b.services
        && a.ports == b.ports
        && a.protocols == b.protocols
        && a.icmp_blocks == b.icmp_blocks
        && a.icmp_block_inversion == b.icmp_block_inversion
        && a.forward_ports == b.forward_ports
        && a.masquerade == b.masquerade
        && a.rich_rules.len() == b.rich_rules.len()
        && a.rich_rules.iter().zip(b.rich_rules.iter()).all(|(x, y)| x == y)
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn load_default_zone(&self) -> Result<String, StoreError> {
        Ok(self.inner.lock().await.default_zone.clone())
    }

    async fn load_zones(&self) -> Result<Vec<Zone>, StoreError> {
        Ok(self.inner.lock().await.zones.values().cloned().collect())
    }

    async fn load_services(&self) -> Result<Vec<Service>, StoreError> {
        Ok(self.inner.lock().await.services.values().cloned().collect())
    }

    async fn load_icmptypes(&self) -> Result<Vec<IcmpType>, StoreError> {
        Ok(self.inner.lock().await.icmptypes.values().cloned().collect())
    }

    async fn load_lockdown_whitelist(&self) -> Result<LockdownWhitelist, StoreError> {
        Ok(self.inner.lock().await.lockdown.clone())
    }

    async fn load_direct_config(&self) -> Result<DirectConfig, StoreError> {
        Ok(self.inner.lock().await.direct.clone())
    }

    async fn save_zone(&self, zone: &Zone) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().await;
        let changed = match guard.zones.get(&zone.name) {
            Some(existing) => !zones_equal(existing, zone),
            None => true,
        };
        guard.zones.insert(zone.name.clone(), zone.clone());
        Ok(changed)
    }

    async fn save_service(&self, service: &Service) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().await;
        let changed = guard.services.get(&service.name).map(|s| s.ports != service.ports
            || s.protocols != service.protocols
            || s.modules != service.modules
            || s.destinations != service.destinations)
            .unwrap_or(true);
        guard.services.insert(service.name.clone(), service.clone());
        Ok(changed)
    }

    async fn save_icmptype(&self, icmptype: &IcmpType) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().await;
        let changed = guard
            .icmptypes
            .get(&icmptype.name)
            .map(|t| t.destinations != icmptype.destinations)
            .unwrap_or(true);
        guard.icmptypes.insert(icmptype.name.clone(), icmptype.clone());
        Ok(changed)
    }

    async fn save_lockdown_whitelist(&self, whitelist: &LockdownWhitelist) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().await;
        let changed = guard.lockdown.enabled != whitelist.enabled
            || guard.lockdown.contexts != whitelist.contexts
            || guard.lockdown.uids != whitelist.uids
            || guard.lockdown.users != whitelist.users
            || guard.lockdown.commands != whitelist.commands;
        guard.lockdown = whitelist.clone();
        Ok(changed)
    }

    async fn save_direct_config(&self, config: &DirectConfig) -> Result<bool, StoreError> {
        let mut guard = self.inner.lock().await;
        guard.direct = config.clone();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_store_has_the_public_zone() {
        let store = MemoryStore::new();
        let zones = store.load_zones().await.unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "public");
    }

    #[tokio::test]
    async fn saving_the_same_zone_twice_reports_unchanged_the_second_time() {
        let store = MemoryStore::new();
        let mut zone = Zone::new("work");
        zone.interfaces.insert("eth0".to_owned());
        assert!(store.save_zone(&zone).await.unwrap());
        assert!(!store.save_zone(&zone).await.unwrap());
    }
}
