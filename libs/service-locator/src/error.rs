use crate::service_type::ServiceType;

/// Failure of a registry operation.
///
/// Every variant names the service it concerns. Construction and attachment
/// causes are kept as the error source.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("service `{service}` is already registered")]
    AlreadyRegistered { service: ServiceType },

    #[error("service `{service}` is not registered")]
    NotRegistered { service: ServiceType },

    /// The service was requested again from inside its own construction.
    #[error("service `{service}` was requested while it was being constructed")]
    CyclicResolution { service: ServiceType },

    #[error("failed to instantiate service `{service}`")]
    InstantiationFailed {
        service: ServiceType,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to attach service `{service}` to a host object")]
    HostAttachFailed {
        service: ServiceType,
        #[source]
        source: anyhow::Error,
    },
}

impl RegistryError {
    /// The service type the failed operation targeted.
    #[must_use]
    pub fn service(&self) -> ServiceType {
        match self {
            Self::AlreadyRegistered { service }
            | Self::NotRegistered { service }
            | Self::CyclicResolution { service }
            | Self::InstantiationFailed { service, .. }
            | Self::HostAttachFailed { service, .. } => *service,
        }
    }
}
