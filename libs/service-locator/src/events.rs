//! Advisory registry events.
//!
//! Observers are notified after an operation has completed and the registry lock
//! is released. They cannot fail an operation.

use std::fmt;

use crate::service_type::ServiceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryAction {
    Registered,
    Unregistered,
    AttachedAsHost,
}

impl fmt::Display for RegistryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registered => "registered",
            Self::Unregistered => "unregistered",
            Self::AttachedAsHost => "attached_as_host",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEvent {
    pub service: ServiceType,
    pub action: RegistryAction,
    pub detail: String,
}

impl RegistryEvent {
    #[must_use]
    pub fn new(service: ServiceType, action: RegistryAction, detail: impl Into<String>) -> Self {
        Self {
            service,
            action,
            detail: detail.into(),
        }
    }
}

/// Sink for [`RegistryEvent`]s.
pub trait RegistryObserver: Send + Sync {
    fn on_event(&self, event: &RegistryEvent);
}

/// Writes every event to `tracing` at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RegistryObserver for TracingObserver {
    fn on_event(&self, event: &RegistryEvent) {
        tracing::info!(
            service = %event.service,
            service_type = event.service.name(),
            action = %event.action,
            "Service {}: {}",
            event.service,
            event.detail
        );
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    struct Mixer;

    #[test]
    #[traced_test]
    fn tracing_observer_logs_service_and_detail() {
        TracingObserver.on_event(&RegistryEvent::new(
            ServiceType::of::<Mixer>(),
            RegistryAction::Registered,
            "registered successfully",
        ));

        assert!(logs_contain("Service Mixer: registered successfully"));
        assert!(logs_contain("action=registered"));
    }

    #[test]
    fn action_display_is_snake_case() {
        assert_eq!(RegistryAction::AttachedAsHost.to_string(), "attached_as_host");
        assert_eq!(RegistryAction::Unregistered.to_string(), "unregistered");
    }
}
