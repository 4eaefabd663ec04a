//! Typed service registry.
//!
//! A [`ServiceRegistry`] keeps at most one instance per service type and hands out
//! shared `Arc`s to it. Services are registered either eagerly with an existing
//! instance or lazily on first [`get`](ServiceRegistry::get):
//! - *plain* services are built by their no-argument constructor;
//! - *host-bound* services are attached to a freshly created host object through
//!   the [`HostObjects`] collaborator.
//!
//! ```
//! use std::sync::Arc;
//! use service_locator::{ServiceRegistry, plain_service};
//!
//! #[derive(Default)]
//! struct Clock;
//! plain_service!(Clock);
//!
//! let registry = ServiceRegistry::new();
//! let first = registry.get::<Clock>().unwrap();
//! let second = registry.get::<Clock>().unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod error;
pub mod events;
pub mod global;
pub mod host;
pub mod provision;
pub mod registry;
pub mod service_type;

pub use config::{ConfigError, HostNaming, RegistryConfig};
pub use error::RegistryError;
pub use events::{RegistryAction, RegistryEvent, RegistryObserver, TracingObserver};
pub use global::{global, install_global};
pub use host::{Behavior, HostObject, HostObjectId, HostObjects, InMemoryHosts, ServiceInstance};
pub use provision::{LazyService, Provision};
pub use registry::{ServiceRegistry, ServiceRegistryBuilder};
pub use service_type::ServiceType;

/// Implements [`LazyService`] for `Default` types so they are built on first lookup.
#[macro_export]
macro_rules! plain_service {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::LazyService for $ty {
                fn provision() -> $crate::Provision<Self> {
                    $crate::Provision::default_constructed()
                }
            }
        )+
    };
}
