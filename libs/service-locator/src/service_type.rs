use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable key identifying a service's declared type.
///
/// Equality and hashing use [`TypeId`], so `dyn Trait` and concrete types are both
/// valid keys. The type name is kept only for logs, errors and host naming.
#[derive(Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully-qualified type name, e.g. `my_app::audio::Mixer`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment without generic arguments, e.g. `Mixer`.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let head = name.split('<').next().unwrap_or(name);
        head.rsplit("::").next().unwrap_or(head)
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
