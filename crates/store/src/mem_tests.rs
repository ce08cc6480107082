use super::*;
use ipvsd_core::{Forward, Protocol, PulseOptions, ServiceKey};

fn svc() -> Service {
    Service {
        key: ServiceKey {
            vip: "10.0.0.1".parse().unwrap(),
            port: 80,
            protocol: Protocol::Tcp,
        },
        scheduler: "wrr".to_owned(),
        flags: Vec::new(),
        store_id: "vs-1".to_owned(),
    }
}

fn backend() -> Backend {
    Backend {
        key: ipvsd_core::BackendKey {
            ip: "10.0.0.2".parse().unwrap(),
            port: 8080,
        },
        weight: 100,
        forward: Forward::Nat,
        store_id: "rs-1".to_owned(),
        pulse: PulseOptions::default(),
    }
}

#[tokio::test]
async fn create_then_list_service() {
    let store = MemStore::new();
    store.create_service("vs-1", &svc()).await.unwrap();
    let listed = store.list_services().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn create_is_put_if_absent() {
    let store = MemStore::new();
    store.create_service("vs-1", &svc()).await.unwrap();
    let mut changed = svc();
    changed.scheduler = "sh".to_owned();
    store.create_service("vs-1", &changed).await.unwrap();
    let listed = store.list_services().await.unwrap();
    assert_eq!(listed[0].scheduler, "wrr");
}

#[tokio::test]
async fn update_is_unconditional_put() {
    let store = MemStore::new();
    store.create_service("vs-1", &svc()).await.unwrap();
    let mut changed = svc();
    changed.scheduler = "sh".to_owned();
    store.update_service("vs-1", &changed).await.unwrap();
    let listed = store.list_services().await.unwrap();
    assert_eq!(listed[0].scheduler, "sh");
}

#[tokio::test]
async fn list_on_unknown_key_is_empty_not_error() {
    let store = MemStore::new();
    assert!(store.list_services().await.unwrap().is_empty());
    assert!(store.list_backends("nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_service_deletes_it() {
    let store = MemStore::new();
    store.create_service("vs-1", &svc()).await.unwrap();
    store.remove_service("vs-1").await.unwrap();
    assert!(store.list_services().await.unwrap().is_empty());
}

#[tokio::test]
async fn backend_create_update_remove() {
    let store = MemStore::new();
    store
        .create_backend("vs-1", "rs-1", &backend())
        .await
        .unwrap();
    let mut changed = backend();
    changed.weight = 50;
    store
        .update_backend("vs-1", "rs-1", &changed)
        .await
        .unwrap();
    let listed = store.list_backends("vs-1").await.unwrap();
    assert_eq!(listed[0].weight, 50);

    store.remove_backend("rs-1").await.unwrap();
    assert!(store.list_backends("vs-1").await.unwrap().is_empty());
}
