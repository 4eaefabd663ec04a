//! Type-keyed singleton registry.
//!
//! Design goals:
//! - One instance per service type; registering an occupied type is an error, never an overwrite.
//! - Consumers fetch by type (concrete or `dyn Trait`) and keep the returned `Arc`.
//! - Lazy services are built on first `get`, either directly (plain) or by attaching
//!   them to a new host object (host-bound).
//!
//! Implementation details:
//! - Key = [`ServiceType`] (a `TypeId`), value = `Arc<T>` stored as `Box<dyn Any + Send + Sync>`.
//! - A single reentrant mutex guards the whole map. Lazy construction runs under it, so
//!   concurrent `get`s of the same type from different threads never build two instances.
//! - The map itself is only borrowed between calls into user code, so a constructor may
//!   resolve or register other services on the same thread. Resolving the type that is
//!   currently being built yields `RegistryError::CyclicResolution`.
//! - Observers run after the lock is released.

use parking_lot::ReentrantMutex;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::events::{RegistryAction, RegistryEvent, RegistryObserver, TracingObserver};
use crate::host::{Behavior, HostObject, HostObjects, InMemoryHosts, ServiceInstance};
use crate::provision::{LazyService, Provision};
use crate::service_type::ServiceType;

type Boxed = Box<dyn Any + Send + Sync>;

/// Internal map type for the registry.
type ServiceMap = HashMap<ServiceType, Boxed>;

#[derive(Default)]
struct RegistryState {
    entries: ServiceMap,
    /// Types whose lazy construction is running on the lock-owning thread.
    building: Vec<ServiceType>,
}

/// Removes a type from `building` when its construction ends, including by unwinding.
struct BuildingGuard<'a> {
    state: &'a RefCell<RegistryState>,
    ty: ServiceType,
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        let ty = self.ty;
        self.state.borrow_mut().building.retain(|t| *t != ty);
    }
}

/// Registry of singleton services keyed by their declared type.
pub struct ServiceRegistry {
    state: ReentrantMutex<RefCell<RegistryState>>,
    hosts: Arc<dyn HostObjects>,
    observer: Arc<dyn RegistryObserver>,
    config: RegistryConfig,
}

impl ServiceRegistry {
    /// Registry with default config, an [`InMemoryHosts`] arena and a [`TracingObserver`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    /// Register an existing instance under the service type `T`.
    /// `T` can be a trait object like `dyn my_app::audio::Mixer`.
    ///
    /// # Errors
    /// Returns `RegistryError::AlreadyRegistered` if `T` already has an instance;
    /// the existing instance is kept.
    pub fn register<T>(&self, service: Arc<T>) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let ty = ServiceType::of::<T>();
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            match state.entries.entry(ty) {
                Entry::Occupied(_) => {
                    tracing::debug!(service = %ty, "rejected duplicate registration");
                    return Err(RegistryError::AlreadyRegistered { service: ty });
                }
                Entry::Vacant(slot) => {
                    slot.insert(Box::new(service));
                }
            }
        }
        self.notify(&RegistryEvent::new(
            ty,
            RegistryAction::Registered,
            "registered successfully",
        ));
        Ok(())
    }

    /// Register `T` by building it now according to its [`Provision`].
    ///
    /// # Errors
    /// - `RegistryError::AlreadyRegistered` if `T` already has an instance, including one
    ///   registered by its own constructor.
    /// - `RegistryError::CyclicResolution` if `T` is already being built on this thread.
    /// - `RegistryError::InstantiationFailed` if a plain constructor fails.
    /// - `RegistryError::HostAttachFailed` if the host environment cannot create or
    ///   attach a host-bound service.
    ///
    /// Nothing is inserted on error.
    pub fn register_lazy<T: LazyService>(&self) -> Result<(), RegistryError> {
        let ty = ServiceType::of::<T>();
        let guard = self.state.lock();
        if guard.borrow().entries.contains_key(&ty) {
            tracing::debug!(service = %ty, "rejected duplicate lazy registration");
            return Err(RegistryError::AlreadyRegistered { service: ty });
        }
        let (service, event) = self.build_locked::<T>(&guard, ty)?;
        match guard.borrow_mut().entries.entry(ty) {
            Entry::Occupied(_) => {
                tracing::debug!(service = %ty, "constructor registered its own service first");
                return Err(RegistryError::AlreadyRegistered { service: ty });
            }
            Entry::Vacant(slot) => {
                slot.insert(Box::new(service));
            }
        }
        drop(guard);
        self.notify(&event);
        Ok(())
    }

    /// Fetch `T`, creating and registering it first if it is absent.
    ///
    /// Repeated calls return the same instance until `T` is unregistered. If the
    /// constructor registers an instance of `T` itself, that instance is kept and
    /// returned.
    ///
    /// # Errors
    /// Returns `RegistryError::InstantiationFailed` or `RegistryError::HostAttachFailed`
    /// if `T` was absent and could not be created, and `RegistryError::CyclicResolution`
    /// if `T` is requested again while its own constructor runs. The registry is left
    /// unchanged on error.
    pub fn get<T: LazyService>(&self) -> Result<Arc<T>, RegistryError> {
        let ty = ServiceType::of::<T>();
        let guard = self.state.lock();
        if let Some(existing) = guard.borrow().entries.get(&ty) {
            return Ok(typed::<T>(existing));
        }
        let (service, event) = self.build_locked::<T>(&guard, ty)?;
        match guard.borrow_mut().entries.entry(ty) {
            Entry::Occupied(slot) => {
                tracing::debug!(service = %ty, "constructor registered its own service first");
                return Ok(typed::<T>(slot.get()));
            }
            Entry::Vacant(slot) => {
                slot.insert(Box::new(Arc::clone(&service)));
            }
        }
        drop(guard);
        self.notify(&event);
        Ok(service)
    }

    /// Fetch `T` only if it is registered; never creates anything.
    #[must_use]
    pub fn try_get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let guard = self.state.lock();
        let state = guard.borrow();
        state
            .entries
            .get(&ServiceType::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Remove `T` and return the instance the registry held.
    ///
    /// The instance itself is not torn down; a host-bound service stays attached
    /// to its host object.
    ///
    /// # Errors
    /// Returns `RegistryError::NotRegistered` if `T` has no instance.
    pub fn unregister<T>(&self) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let ty = ServiceType::of::<T>();
        let removed = self.state.lock().borrow_mut().entries.remove(&ty);
        let Some(boxed) = removed else {
            tracing::debug!(service = %ty, "nothing to unregister");
            return Err(RegistryError::NotRegistered { service: ty });
        };
        self.notify(&RegistryEvent::new(
            ty,
            RegistryAction::Unregistered,
            "unregistered successfully",
        ));
        Ok(typed_owned::<T>(boxed))
    }

    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.state
            .lock()
            .borrow()
            .entries
            .contains_key(&ServiceType::of::<T>())
    }

    /// Registered service types, sorted by type name.
    #[must_use]
    pub fn registered(&self) -> Vec<ServiceType> {
        let mut types: Vec<ServiceType> =
            self.state.lock().borrow().entries.keys().copied().collect();
        types.sort_by_key(ServiceType::name);
        types
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().borrow().entries.is_empty()
    }

    /// Run `T`'s construction while holding the lock but no map borrow.
    fn build_locked<T: LazyService>(
        &self,
        state: &RefCell<RegistryState>,
        ty: ServiceType,
    ) -> Result<(Arc<T>, RegistryEvent), RegistryError> {
        {
            let mut state = state.borrow_mut();
            if state.building.contains(&ty) {
                tracing::debug!(service = %ty, "service requested by its own constructor");
                return Err(RegistryError::CyclicResolution { service: ty });
            }
            state.building.push(ty);
        }
        let _building = BuildingGuard { state, ty };
        self.provide::<T>(ty)
    }

    /// Build `T` according to its provision. Called with the lock held and the map unborrowed.
    fn provide<T: LazyService>(
        &self,
        ty: ServiceType,
    ) -> Result<(Arc<T>, RegistryEvent), RegistryError> {
        match T::provision() {
            Provision::Plain(construct) => {
                let service = construct().map_err(|source| {
                    tracing::debug!(service = %ty, error = %source, "construction failed");
                    RegistryError::InstantiationFailed {
                        service: ty,
                        source,
                    }
                })?;
                let event = RegistryEvent::new(
                    ty,
                    RegistryAction::Registered,
                    "registered and instantiated successfully",
                );
                Ok((Arc::new(service), event))
            }
            Provision::HostBound(build) => self.attach_to_new_host::<T>(ty, build),
        }
    }

    fn attach_to_new_host<T: LazyService>(
        &self,
        ty: ServiceType,
        build: fn(&HostObject) -> anyhow::Result<T>,
    ) -> Result<(Arc<T>, RegistryEvent), RegistryError> {
        let attach_failed = |source: anyhow::Error| {
            tracing::debug!(service = %ty, error = %source, "host attachment failed");
            RegistryError::HostAttachFailed { service: ty, source }
        };

        let host = self
            .hosts
            .create_host_object(&self.config.host_name_for(ty))
            .map_err(attach_failed)?;

        let factory = |host: &HostObject| -> anyhow::Result<ServiceInstance> {
            let service: ServiceInstance = Arc::new(build(host)?);
            Ok(service)
        };
        let instance = self
            .hosts
            .attach_behavior(&host, Behavior::new(ty, &factory))
            .map_err(attach_failed)?;

        let service = instance.downcast::<T>().map_err(|_| {
            attach_failed(anyhow::anyhow!(
                "host object `{}` returned a behavior of a different type",
                host.name()
            ))
        })?;

        let event = RegistryEvent::new(
            ty,
            RegistryAction::AttachedAsHost,
            format!(
                "registered as a host-bound service on new host object `{}` ({})",
                host.name(),
                host.id()
            ),
        );
        Ok((service, event))
    }

    fn notify(&self, event: &RegistryEvent) {
        if self.config.emit_events {
            self.observer.on_event(event);
        }
    }
}

/// Entries are only ever inserted as `Arc<T>` under `ServiceType::of::<T>()`.
#[allow(clippy::expect_used)]
fn typed<T: ?Sized + 'static>(boxed: &Boxed) -> Arc<T> {
    boxed
        .downcast_ref::<Arc<T>>()
        .cloned()
        .expect("registry entry stored under a foreign type key")
}

#[allow(clippy::expect_used)]
fn typed_owned<T: ?Sized + 'static>(boxed: Boxed) -> Arc<T> {
    *boxed
        .downcast::<Arc<T>>()
        .ok()
        .expect("registry entry stored under a foreign type key")
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.registered())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceRegistry`].
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    config: RegistryConfig,
    hosts: Option<Arc<dyn HostObjects>>,
    observer: Option<Arc<dyn RegistryObserver>>,
}

impl ServiceRegistryBuilder {
    #[must_use]
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn host_objects(mut self, hosts: Arc<dyn HostObjects>) -> Self {
        self.hosts = Some(hosts);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn RegistryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            state: ReentrantMutex::new(RefCell::new(RegistryState::default())),
            hosts: self
                .hosts
                .unwrap_or_else(|| Arc::new(InMemoryHosts::new())),
            observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
            config: self.config,
        }
    }
}
