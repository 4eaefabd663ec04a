//! Registry configuration.
//!
//! Layering follows the usual order: defaults, then an optional YAML file, then
//! `APP__*` environment variables (`APP__SERVICE_REGISTRY__EMIT_EVENTS=false`).
//! Only the `service_registry` section is read; a missing section means defaults.

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::service_type::ServiceType;

/// Top-level key of the registry section.
pub const CONFIG_SECTION: &str = "service_registry";

/// Environment prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "APP__";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("invalid 'service_registry' config: {0}")]
    Invalid(#[source] Box<figment::Error>),
}

/// How host-object names are derived from the service type.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HostNaming {
    /// `Mixer`
    #[default]
    ShortTypeName,
    /// `my_app::audio::Mixer`
    FullTypeName,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub host_naming: HostNaming,
    /// Prepended verbatim to every derived host-object name.
    pub host_name_prefix: Option<String>,
    /// When `false`, observers are not notified.
    pub emit_events: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host_naming: HostNaming::default(),
            host_name_prefix: None,
            emit_events: true,
        }
    }
}

impl RegistryConfig {
    /// Name of the host object created for a host-bound service.
    #[must_use]
    pub fn host_name_for(&self, service: ServiceType) -> String {
        let base = match self.host_naming {
            HostNaming::ShortTypeName => service.short_name(),
            HostNaming::FullTypeName => service.name(),
        };
        match &self.host_name_prefix {
            Some(prefix) => format!("{prefix}{base}"),
            None => base.to_owned(),
        }
    }

    /// Extract the `service_registry` section of an already layered figment.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the section exists but does not deserialize.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        if !figment.contains(CONFIG_SECTION) {
            return Ok(Self::default());
        }
        figment
            .extract_inner(CONFIG_SECTION)
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Layer the optional YAML file and the environment, then extract the section.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingFile` if `path` is given but is not a file,
    /// or `ConfigError::Invalid` if the merged section is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(&figment)
    }
}
