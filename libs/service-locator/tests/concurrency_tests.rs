#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Concurrent access to a shared registry.
//!
//! Many tasks race on the same service type; the registry must still build at
//! most one instance and reject every duplicate registration.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use service_locator::{
    HostObject, InMemoryHosts, LazyService, Provision, RegistryError, ServiceRegistry,
};

static SLOW_BUILDS: AtomicUsize = AtomicUsize::new(0);

/// Plain service whose constructor is slow enough to widen the race window.
struct SlowIndex {
    generation: usize,
}

impl LazyService for SlowIndex {
    fn provision() -> Provision<Self> {
        Provision::Plain(|| {
            std::thread::sleep(Duration::from_millis(20));
            let generation = SLOW_BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(SlowIndex { generation })
        })
    }
}

struct Overlay {
    host: HostObject,
}

impl LazyService for Overlay {
    fn provision() -> Provision<Self> {
        Provision::HostBound(|host| {
            std::thread::sleep(Duration::from_millis(10));
            Ok(Overlay { host: host.clone() })
        })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_get_builds_a_single_instance() {
    let registry = Arc::new(ServiceRegistry::new());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            registry.get::<SlowIndex>().unwrap()
        }));
    }

    let mut instances = Vec::new();
    for handle in handles {
        instances.push(handle.await.unwrap());
    }

    assert_eq!(SLOW_BUILDS.load(Ordering::SeqCst), 1, "constructor must run once");
    let first = &instances[0];
    assert_eq!(first.generation, 0);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, first)));
    assert_eq!(registry.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_host_bound_get_creates_one_host_object() {
    let hosts = Arc::new(InMemoryHosts::new());
    let registry = Arc::new(
        ServiceRegistry::builder()
            .host_objects(hosts.clone())
            .build(),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            registry.get::<Overlay>().unwrap()
        }));
    }

    let mut overlays = Vec::new();
    for handle in handles {
        overlays.push(handle.await.unwrap());
    }

    assert_eq!(hosts.len(), 1);
    assert!(overlays.iter().all(|o| o.host == overlays[0].host));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_admits_exactly_one_winner() {
    let registry = Arc::new(ServiceRegistry::new());

    let mut handles = Vec::new();
    for i in 0..10_usize {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.register(Arc::new(i)).map(|()| i)
        }));
    }

    let mut winners = Vec::new();
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(i) => winners.push(i),
            Err(RegistryError::AlreadyRegistered { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(rejected, 9);
    assert_eq!(*registry.try_get::<usize>().unwrap(), winners[0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_register_and_unregister_never_duplicates() {
    let registry = Arc::new(ServiceRegistry::new());

    let mut handles = Vec::new();
    for i in 0..20_u32 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let _ = registry.register(Arc::new(i));
            } else {
                let _ = registry.unregister::<u32>();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert!(registry.len() <= 1);
    assert_eq!(registry.len(), usize::from(registry.contains::<u32>()));
}
