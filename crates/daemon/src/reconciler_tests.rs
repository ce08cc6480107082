use std::sync::Arc;
use std::time::Duration;

use ipvsd_core::{Backend, BackendKey, Forward, Protocol, PulseOptions, Service, ServiceKey};
use ipvsd_kernel::{Kernel, MockKernel};
use ipvsd_store::{MemStore, Store};

use super::Reconciler;

fn service(store_id: &str, scheduler: &str, flags: Vec<ipvsd_core::Flag>) -> Service {
    Service {
        key: ServiceKey {
            vip: "10.0.0.1".parse().unwrap(),
            port: 80,
            protocol: Protocol::Tcp,
        },
        scheduler: scheduler.to_owned(),
        flags,
        store_id: store_id.to_owned(),
    }
}

fn other_service(store_id: &str, port: u16) -> Service {
    Service {
        key: ServiceKey {
            vip: "10.0.0.9".parse().unwrap(),
            port,
            protocol: Protocol::Tcp,
        },
        scheduler: "wrr".to_owned(),
        flags: Vec::new(),
        store_id: store_id.to_owned(),
    }
}

fn backend(store_id: &str, weight: u32) -> Backend {
    Backend {
        key: BackendKey {
            ip: "10.0.0.2".parse().unwrap(),
            port: 8080,
        },
        weight,
        forward: Forward::Nat,
        store_id: store_id.to_owned(),
        pulse: PulseOptions::default(),
    }
}

async fn reconciler() -> (Reconciler, Arc<MemStore>, Arc<MockKernel>) {
    let store = Arc::new(MemStore::new());
    let kernel = Arc::new(MockKernel::new());
    let r = Reconciler::new(store.clone(), kernel.clone(), Duration::from_secs(1));
    (r, store, kernel)
}

#[tokio::test]
async fn add_new_service() {
    let (r, store, kernel) = reconciler().await;
    let s1 = service("vs-1", "wrr", vec![]);
    store.create_service("vs-1", &s1).await.unwrap();

    r.run_cycle().await;
    assert_eq!(kernel.list_services().await.unwrap().len(), 1);

    r.run_cycle().await;
    assert_eq!(kernel.list_services().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_scheduler() {
    let (r, store, kernel) = reconciler().await;
    let actual = service("vs-1", "sh", vec![ipvsd_core::Flag::Flag1, ipvsd_core::Flag::Flag2]);
    kernel.add_service(&actual).await.unwrap();

    let desired = service("vs-1", "wrr", vec![ipvsd_core::Flag::Flag3]);
    store.create_service("vs-1", &desired).await.unwrap();

    r.run_cycle().await;
    let listed = kernel.list_services().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].scheduler, "wrr");
    assert_eq!(listed[0].flags, vec![ipvsd_core::Flag::Flag3]);
}

#[tokio::test]
async fn delete_orphaned_service() {
    let (r, store, kernel) = reconciler().await;
    let s1 = service("vs-1", "wrr", vec![]);
    let s2 = other_service("vs-2", 81);
    kernel.add_service(&s1).await.unwrap();
    kernel.add_service(&s2).await.unwrap();
    store.create_service("vs-1", &s1).await.unwrap();

    r.run_cycle().await;

    let listed = kernel.list_services().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].store_id, "vs-1");
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let (r, store, kernel) = reconciler().await;
    let s1 = service("vs-1", "wrr", vec![]);
    store.create_service("vs-1", &s1).await.unwrap();
    store
        .create_backend("vs-1", "rs-1", &backend("rs-1", 100))
        .await
        .unwrap();

    r.run_cycle().await;
    let after_first = kernel.list_backends(&s1.key).await.unwrap();
    assert_eq!(after_first.len(), 1);

    r.run_cycle().await;
    let after_second = kernel.list_backends(&s1.key).await.unwrap();
    assert_eq!(after_second, after_first);
}

#[tokio::test]
async fn converges_backend_additions_and_removals() {
    let (r, store, kernel) = reconciler().await;
    let s1 = service("vs-1", "wrr", vec![]);
    store.create_service("vs-1", &s1).await.unwrap();
    kernel.add_service(&s1).await.unwrap();

    let stale = Backend {
        key: BackendKey {
            ip: "10.0.0.3".parse().unwrap(),
            port: 9090,
        },
        weight: 50,
        forward: Forward::Nat,
        store_id: "rs-stale".to_owned(),
        pulse: PulseOptions::default(),
    };
    kernel.add_backend(&s1.key, &stale).await.unwrap();

    store
        .create_backend("vs-1", "rs-1", &backend("rs-1", 100))
        .await
        .unwrap();

    r.run_cycle().await;

    let listed = kernel.list_backends(&s1.key).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].store_id, "rs-1");
}
