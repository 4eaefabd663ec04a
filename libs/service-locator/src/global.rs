//! Optional process-wide registry.
//!
//! Prefer passing a [`ServiceRegistry`] from the composition root. This accessor
//! exists for code that cannot be handed one, such as callbacks created by an
//! outer framework.

use std::sync::OnceLock;

use crate::registry::ServiceRegistry;

static GLOBAL: OnceLock<ServiceRegistry> = OnceLock::new();

/// The process-wide registry, created with defaults on first use.
#[must_use]
pub fn global() -> &'static ServiceRegistry {
    GLOBAL.get_or_init(ServiceRegistry::new)
}

/// Install `registry` as the process-wide registry.
///
/// Must happen before the first call to [`global`].
///
/// # Errors
/// Hands `registry` back if a process-wide registry already exists.
pub fn install_global(registry: ServiceRegistry) -> Result<&'static ServiceRegistry, ServiceRegistry> {
    GLOBAL.set(registry)?;
    tracing::debug!("process-wide service registry installed");
    Ok(global())
}
