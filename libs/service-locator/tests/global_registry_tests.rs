#![allow(clippy::unwrap_used, clippy::expect_used)]

//! The process-wide registry is a single static, so this file holds one test.

use std::sync::Arc;

use service_locator::{RegistryConfig, ServiceRegistry, global, install_global, plain_service};

#[derive(Default)]
struct Telemetry;
plain_service!(Telemetry);

#[test]
fn installed_registry_becomes_the_global_one() {
    let registry = ServiceRegistry::builder()
        .config(RegistryConfig {
            emit_events: false,
            ..RegistryConfig::default()
        })
        .build();

    let installed = install_global(registry).unwrap();
    assert!(std::ptr::eq(installed, global()));
    assert!(!global().config().emit_events);

    let rejected = install_global(ServiceRegistry::new());
    assert!(rejected.is_err(), "second install must be refused");

    let a = global().get::<Telemetry>().unwrap();
    let b = global().get::<Telemetry>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}
