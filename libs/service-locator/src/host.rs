//! Host-object collaborator.
//!
//! Host-bound services live on an object owned by some outer environment (a scene
//! graph, an entity store, a widget tree). The registry only needs two things from
//! that environment: create a named host object, and attach a behavior to it.
//! [`InMemoryHosts`] is a self-contained implementation for headless use and tests.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::service_type::ServiceType;

/// Type-erased service instance as produced by a host environment.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostObjectId(pub u64);

impl fmt::Display for HostObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a host object. Cloning the handle does not clone the object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostObject {
    id: HostObjectId,
    name: Arc<str>,
}

impl HostObject {
    #[must_use]
    pub fn new(id: HostObjectId, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> HostObjectId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

type BehaviorFactory<'a> = &'a (dyn Fn(&HostObject) -> anyhow::Result<ServiceInstance> + 'a);

/// A behavior to attach: the service type plus the factory that builds it for a host.
pub struct Behavior<'a> {
    service: ServiceType,
    factory: BehaviorFactory<'a>,
}

impl<'a> Behavior<'a> {
    #[must_use]
    pub fn new(service: ServiceType, factory: BehaviorFactory<'a>) -> Self {
        Self { service, factory }
    }

    #[must_use]
    pub fn service(&self) -> ServiceType {
        self.service
    }

    /// Build the behavior instance bound to `host`.
    ///
    /// # Errors
    /// Returns whatever the service's host-bound constructor reports.
    pub fn instantiate(&self, host: &HostObject) -> anyhow::Result<ServiceInstance> {
        (self.factory)(host)
    }
}

impl fmt::Debug for Behavior<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// Environment that owns host objects.
///
/// Implementations are called while the registry lock is held. Behavior factories
/// may resolve other services from the same registry on the calling thread.
///
/// The registry never destroys host objects. When `attach_behavior` fails after
/// `create_host_object` succeeded, the new host stays in the environment without
/// the behavior; cleaning it up is the environment's or the caller's business.
pub trait HostObjects: Send + Sync {
    /// Create a new host object with the given name.
    ///
    /// # Errors
    /// Returns an error if the environment cannot create objects right now.
    fn create_host_object(&self, name: &str) -> anyhow::Result<HostObject>;

    /// Attach `behavior` to `host` and return the attached instance.
    ///
    /// # Errors
    /// Returns an error if the host is unknown, the behavior kind is not supported,
    /// or the behavior's constructor fails. The host itself is left in place.
    fn attach_behavior(
        &self,
        host: &HostObject,
        behavior: Behavior<'_>,
    ) -> anyhow::Result<ServiceInstance>;
}

#[derive(Debug)]
struct HostRecord {
    name: Arc<str>,
    behaviors: Vec<ServiceType>,
}

/// Arena of host objects kept in memory.
#[derive(Default)]
pub struct InMemoryHosts {
    next_id: AtomicU64,
    objects: RwLock<BTreeMap<HostObjectId, HostRecord>>,
    accepted: Option<HashSet<ServiceType>>,
}

impl InMemoryHosts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only behaviors of the listed service types may be attached.
    #[must_use]
    pub fn accepting(services: impl IntoIterator<Item = ServiceType>) -> Self {
        Self {
            accepted: Some(services.into_iter().collect()),
            ..Self::default()
        }
    }

    /// First host object with the given name, by creation order.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<HostObject> {
        self.objects
            .read()
            .iter()
            .find(|(_, record)| &*record.name == name)
            .map(|(id, record)| HostObject::new(*id, Arc::clone(&record.name)))
    }

    /// Behaviors attached to a host object, in attachment order.
    #[must_use]
    pub fn behaviors_of(&self, id: HostObjectId) -> Vec<ServiceType> {
        self.objects
            .read()
            .get(&id)
            .map(|record| record.behaviors.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn host_objects(&self) -> Vec<HostObject> {
        self.objects
            .read()
            .iter()
            .map(|(id, record)| HostObject::new(*id, Arc::clone(&record.name)))
            .collect()
    }

    /// Destroy a host object. Returns `false` if it did not exist.
    ///
    /// Also how callers drop a host left empty by a failed attachment.
    pub fn destroy(&self, id: HostObjectId) -> bool {
        self.objects.write().remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl fmt::Debug for InMemoryHosts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryHosts")
            .field("objects", &*self.objects.read())
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

impl HostObjects for InMemoryHosts {
    fn create_host_object(&self, name: &str) -> anyhow::Result<HostObject> {
        let id = HostObjectId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let name: Arc<str> = Arc::from(name);
        self.objects.write().insert(
            id,
            HostRecord {
                name: Arc::clone(&name),
                behaviors: Vec::new(),
            },
        );
        tracing::trace!(host = %id, name = %name, "host object created");
        Ok(HostObject::new(id, name))
    }

    fn attach_behavior(
        &self,
        host: &HostObject,
        behavior: Behavior<'_>,
    ) -> anyhow::Result<ServiceInstance> {
        let service = behavior.service();
        if let Some(accepted) = &self.accepted
            && !accepted.contains(&service)
        {
            anyhow::bail!("`{service}` is not a behavior kind accepted by this host environment");
        }
        if !self.objects.read().contains_key(&host.id()) {
            anyhow::bail!("host object {} (`{}`) does not exist", host.id(), host.name());
        }

        // Built outside the arena lock; the factory may be arbitrary user code.
        let instance = behavior.instantiate(host)?;

        let mut objects = self.objects.write();
        let Some(record) = objects.get_mut(&host.id()) else {
            anyhow::bail!(
                "host object {} (`{}`) was destroyed during attachment",
                host.id(),
                host.name()
            );
        };
        record.behaviors.push(service);
        tracing::trace!(host = %host.id(), behavior = %service, "behavior attached");
        Ok(instance)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct Hud {
        host: HostObjectId,
    }

    struct Radar;

    fn hud_factory(host: &HostObject) -> anyhow::Result<ServiceInstance> {
        Ok(Arc::new(Hud { host: host.id() }))
    }

    #[test]
    fn created_objects_get_unique_ids_and_can_be_found() {
        let hosts = InMemoryHosts::new();
        let a = hosts.create_host_object("Hud").unwrap();
        let b = hosts.create_host_object("Radar").unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts.find("Radar"), Some(b));
        assert!(hosts.find("Missing").is_none());
    }

    #[test]
    fn attach_records_behavior_and_returns_instance() {
        let hosts = InMemoryHosts::new();
        let host = hosts.create_host_object("Hud").unwrap();

        let instance = hosts
            .attach_behavior(&host, Behavior::new(ServiceType::of::<Hud>(), &hud_factory))
            .unwrap();

        let hud = instance.downcast::<Hud>().ok().unwrap();
        assert_eq!(hud.host, host.id());
        assert_eq!(hosts.behaviors_of(host.id()), vec![ServiceType::of::<Hud>()]);
    }

    #[test]
    fn attach_to_unknown_host_fails() {
        let hosts = InMemoryHosts::new();
        let ghost = HostObject::new(HostObjectId(99), "Ghost");

        let err = hosts
            .attach_behavior(&ghost, Behavior::new(ServiceType::of::<Hud>(), &hud_factory))
            .unwrap_err();

        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn attach_to_destroyed_host_fails() {
        let hosts = InMemoryHosts::new();
        let host = hosts.create_host_object("Hud").unwrap();
        assert!(hosts.destroy(host.id()));
        assert!(!hosts.destroy(host.id()));

        let result =
            hosts.attach_behavior(&host, Behavior::new(ServiceType::of::<Hud>(), &hud_factory));
        assert!(result.is_err());
        assert!(hosts.is_empty());
    }

    #[test]
    fn allow_list_rejects_unknown_behavior_kinds() {
        let hosts = InMemoryHosts::accepting([ServiceType::of::<Hud>()]);
        let host = hosts.create_host_object("Radar").unwrap();
        let radar = |_: &HostObject| -> anyhow::Result<ServiceInstance> { Ok(Arc::new(Radar)) };

        let err = hosts
            .attach_behavior(&host, Behavior::new(ServiceType::of::<Radar>(), &radar))
            .unwrap_err();

        assert!(err.to_string().contains("not a behavior kind accepted"));
        assert!(hosts.behaviors_of(host.id()).is_empty());
    }

    #[test]
    fn factory_failure_is_returned_and_nothing_is_recorded() {
        let hosts = InMemoryHosts::new();
        let host = hosts.create_host_object("Hud").unwrap();
        let broken = |_: &HostObject| -> anyhow::Result<ServiceInstance> {
            anyhow::bail!("no display attached")
        };

        let err = hosts
            .attach_behavior(&host, Behavior::new(ServiceType::of::<Hud>(), &broken))
            .unwrap_err();

        assert_eq!(err.to_string(), "no display attached");
        assert!(hosts.behaviors_of(host.id()).is_empty());
    }
}
