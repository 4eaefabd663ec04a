//! How a service is brought into existence when it is resolved lazily.

use crate::host::HostObject;

/// Construction policy of a lazily registered service.
pub enum Provision<T> {
    /// Built directly by a no-argument constructor.
    Plain(fn() -> anyhow::Result<T>),
    /// Cannot exist on its own; built while being attached to a new host object.
    HostBound(fn(&HostObject) -> anyhow::Result<T>),
}

impl<T: Default> Provision<T> {
    /// Plain provision through `T::default()`.
    #[must_use]
    pub fn default_constructed() -> Self {
        Self::Plain(construct_default::<T>)
    }
}

impl<T> Provision<T> {
    #[must_use]
    pub fn is_host_bound(&self) -> bool {
        matches!(self, Self::HostBound(_))
    }
}

#[allow(clippy::unnecessary_wraps)]
fn construct_default<T: Default>() -> anyhow::Result<T> {
    Ok(T::default())
}

/// A service the registry may create on demand.
///
/// Plain services usually go through [`plain_service!`](crate::plain_service);
/// host-bound ones implement the trait by hand:
///
/// ```
/// use service_locator::{HostObject, LazyService, Provision};
///
/// struct Hud {
///     host: HostObject,
/// }
///
/// impl LazyService for Hud {
///     fn provision() -> Provision<Self> {
///         Provision::HostBound(|host| Ok(Hud { host: host.clone() }))
///     }
/// }
/// ```
pub trait LazyService: Send + Sync + Sized + 'static {
    fn provision() -> Provision<Self>;
}
