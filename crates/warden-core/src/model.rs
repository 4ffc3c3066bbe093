//! The `Model`: the full in-memory policy state — zones, services, icmp
//! types, direct config, and lockdown — plus the cross-zone invariants
//! spec.md §8 requires (property 1: an interface or source binds to at
//! most one zone at a time).

use std::collections::BTreeMap;

use crate::direct::DirectConfig;
use crate::icmptype::IcmpType;
use crate::lockdown::LockdownWhitelist;
use crate::service::Service;
use crate::zone::Zone;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("zone '{0}' does not exist")]
    ZoneNotFound(String),
    #[error("zone '{0}' already exists")]
    ZoneAlreadyExists(String),
    #[error("service '{0}' does not exist")]
    ServiceNotFound(String),
    #[error("service '{0}' already exists")]
    ServiceAlreadyExists(String),
    #[error("icmp type '{0}' does not exist")]
    IcmpTypeNotFound(String),
    #[error("interface '{interface}' is already bound to zone '{zone}'")]
    InterfaceAlreadyBound { interface: String, zone: String },
    #[error("source '{source}' is already bound to zone '{zone}'")]
    SourceAlreadyBound { source: String, zone: String },
    #[error("cannot remove the default zone '{0}'")]
    CannotRemoveDefaultZone(String),
}

/// The complete policy state of one runtime instance.
#[derive(Debug, Clone)]
pub struct Model {
    zones: BTreeMap<String, Zone>,
    default_zone: String,
    services: BTreeMap<String, Service>,
    icmptypes: BTreeMap<String, IcmpType>,
    pub direct: DirectConfig,
    pub lockdown: LockdownWhitelist,
}

impl Default for Model {
    fn default() -> Self {
        let mut zones = BTreeMap::new();
        zones.insert("public".to_owned(), Zone::new("public"));
        Self {
            zones,
            default_zone: "public".to_owned(),
            services: BTreeMap::new(),
            icmptypes: BTreeMap::new(),
            direct: DirectConfig::new(),
            lockdown: LockdownWhitelist::new(),
        }
    }
}

impl Model {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn default_zone(&self) -> &str {
        &self.default_zone
    }

    pub fn set_default_zone(&mut self, name: &str) -> Result<(), ModelError> {
        if !self.zones.contains_key(name) {
            return Err(ModelError::ZoneNotFound(name.to_owned()));
        }
        self.default_zone = name.to_owned();
        Ok(())
    }

    #[must_use]
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn zone_mut(&mut self, name: &str) -> Option<&mut Zone> {
        self.zones.get_mut(name)
    }

    #[must_use]
    pub fn zone_names(&self) -> Vec<&str> {
        self.zones.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn active_zones(&self) -> Vec<&Zone> {
        self.zones.values().filter(|z| z.is_active()).collect()
    }

    pub fn add_zone(&mut self, zone: Zone) -> Result<(), ModelError> {
        if self.zones.contains_key(&zone.name) {
            return Err(ModelError::ZoneAlreadyExists(zone.name));
        }
        self.zones.insert(zone.name.clone(), zone);
        Ok(())
    }

    pub fn remove_zone(&mut self, name: &str) -> Result<Zone, ModelError> {
        if name == self.default_zone {
            return Err(ModelError::CannotRemoveDefaultZone(name.to_owned()));
        }
        self.zones
            .remove(name)
            .ok_or_else(|| ModelError::ZoneNotFound(name.to_owned()))
    }

    /// The zone an interface is currently bound to, across all zones.
    #[must_use]
    pub fn zone_of_interface(&self, interface: &str) -> Option<&str> {
        self.zones
            .values()
            .find(|z| z.interfaces.contains(interface))
            .map(|z| z.name.as_str())
    }

    #[must_use]
    pub fn zone_of_source(&self, source: &str) -> Option<&str> {
        self.zones
            .values()
            .find(|z| z.sources.contains(source))
            .map(|z| z.name.as_str())
    }

    /// Binds `interface` to `zone`, enforcing the at-most-one-zone
    /// invariant (spec.md §8 property 1). Rebinding the same interface to
    /// the same zone it is already bound to is a no-op success.
    pub fn bind_interface(&mut self, zone: &str, interface: &str) -> Result<bool, ModelError> {
        if let Some(existing) = self.zone_of_interface(interface) {
            if existing == zone {
                return Ok(false);
            }
            return Err(ModelError::InterfaceAlreadyBound {
                interface: interface.to_owned(),
                zone: existing.to_owned(),
            });
        }
        let z = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| ModelError::ZoneNotFound(zone.to_owned()))?;
        Ok(z.interfaces.insert(interface.to_owned()))
    }

    pub fn unbind_interface(&mut self, zone: &str, interface: &str) -> Result<bool, ModelError> {
        let z = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| ModelError::ZoneNotFound(zone.to_owned()))?;
        Ok(z.interfaces.remove(interface))
    }

    pub fn bind_source(&mut self, zone: &str, source: &str) -> Result<bool, ModelError> {
        if let Some(existing) = self.zone_of_source(source) {
            if existing == zone {
                return Ok(false);
            }
            return Err(ModelError::SourceAlreadyBound {
                source: source.to_owned(),
                zone: existing.to_owned(),
            });
        }
        let z = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| ModelError::ZoneNotFound(zone.to_owned()))?;
        Ok(z.sources.insert(source.to_owned()))
    }

    pub fn unbind_source(&mut self, zone: &str, source: &str) -> Result<bool, ModelError> {
        let z = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| ModelError::ZoneNotFound(zone.to_owned()))?;
        Ok(z.sources.remove(source))
    }

    /// The zone that should handle traffic from `interface`, falling back to
    /// the default zone when unbound — the resolution `getZoneOfInterface`
    /// and the rule compiler both rely on (spec.md §8 property 2).
    #[must_use]
    pub fn effective_zone_for_interface(&self, interface: &str) -> &str {
        self.zone_of_interface(interface).unwrap_or(&self.default_zone)
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    #[must_use]
    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    pub fn add_service(&mut self, service: Service) -> Result<(), ModelError> {
        if self.services.contains_key(&service.name) {
            return Err(ModelError::ServiceAlreadyExists(service.name));
        }
        self.services.insert(service.name.clone(), service);
        Ok(())
    }

    pub fn remove_service(&mut self, name: &str) -> Result<Service, ModelError> {
        self.services
            .remove(name)
            .ok_or_else(|| ModelError::ServiceNotFound(name.to_owned()))
    }

    #[must_use]
    pub fn icmptype(&self, name: &str) -> Option<&IcmpType> {
        self.icmptypes.get(name)
    }

    pub fn add_icmptype(&mut self, t: IcmpType) {
        self.icmptypes.insert(t.name.clone(), t);
    }

    #[must_use]
    pub fn icmptype_names(&self) -> Vec<&str> {
        self.icmptypes.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_has_public_zone() {
        let model = Model::new();
        assert_eq!(model.default_zone(), "public");
        assert!(model.zone("public").is_some());
    }

    #[test]
    fn interface_binds_to_at_most_one_zone() {
        let mut model = Model::new();
        model.add_zone(Zone::new("work")).unwrap();
        model.bind_interface("public", "eth0").unwrap();
        let err = model.bind_interface("work", "eth0").unwrap_err();
        assert_eq!(
            err,
            ModelError::InterfaceAlreadyBound {
                interface: "eth0".to_owned(),
                zone: "public".to_owned(),
            }
        );
    }

    #[test]
    fn rebinding_same_zone_is_a_no_op_success() {
        let mut model = Model::new();
        model.bind_interface("public", "eth0").unwrap();
        assert!(!model.bind_interface("public", "eth0").unwrap());
    }

    #[test]
    fn unbound_interface_resolves_to_default_zone() {
        let model = Model::new();
        assert_eq!(model.effective_zone_for_interface("eth1"), "public");
    }

    #[test]
    fn cannot_remove_the_default_zone() {
        let mut model = Model::new();
        let err = model.remove_zone("public").unwrap_err();
        assert_eq!(err, ModelError::CannotRemoveDefaultZone("public".to_owned()));
    }

    #[test]
    fn cannot_set_default_zone_to_unknown_zone() {
        let mut model = Model::new();
        let err = model.set_default_zone("nope").unwrap_err();
        assert_eq!(err, ModelError::ZoneNotFound("nope".to_owned()));
    }
}
