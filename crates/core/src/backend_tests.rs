use super::*;
use crate::vocab::Protocol;

fn parent_v4() -> ServiceKey {
    ServiceKey {
        vip: "10.0.0.1".parse().unwrap(),
        port: 80,
        protocol: Protocol::Tcp,
    }
}

fn parent_v6() -> ServiceKey {
    ServiceKey {
        vip: "::1".parse().unwrap(),
        port: 80,
        protocol: Protocol::Tcp,
    }
}

fn opts(host: &str, port: u16) -> BackendOptions {
    BackendOptions {
        host: host.to_owned(),
        port,
        weight: 0,
        forward: String::new(),
        pulse: PulseOptions::default(),
        vs_id: String::new(),
    }
}

#[test]
fn fill_applies_defaults() {
    let b = opts("10.0.0.2", 8080).fill("rs-1", &parent_v4()).unwrap();
    assert_eq!(b.weight, 100);
    assert_eq!(b.forward, Forward::Nat);
    assert_eq!(b.store_id, "rs-1");
}

#[test]
fn fill_preserves_explicit_weight() {
    let mut o = opts("10.0.0.2", 8080);
    o.weight = 42;
    let b = o.fill("rs-1", &parent_v4()).unwrap();
    assert_eq!(b.weight, 42);
}

#[test]
fn fill_rejects_missing_endpoint() {
    let o = opts("", 8080);
    assert!(matches!(
        o.fill("rs-1", &parent_v4()),
        Err(CoreError::MalformedRequest(_))
    ));
}

#[test]
fn fill_rejects_unknown_forward_method() {
    let mut o = opts("10.0.0.2", 8080);
    o.forward = "gre".to_owned();
    assert!(matches!(
        o.fill("rs-1", &parent_v4()),
        Err(CoreError::UnknownMethod(_))
    ));
}

#[test]
fn fill_rejects_address_family_mismatch() {
    let o = opts("10.0.0.2", 8080);
    assert!(matches!(
        o.fill("rs-1", &parent_v6()),
        Err(CoreError::IncompatibleAddressFamily(_))
    ));
}

#[test]
fn equal_ignores_store_id_and_pulse_options() {
    let a = opts("10.0.0.2", 8080).fill("rs-1", &parent_v4()).unwrap();
    let b = opts("10.0.0.2", 8080).fill("rs-2", &parent_v4()).unwrap();
    assert!(a.equal(&b));
}

#[test]
fn equal_detects_weight_change() {
    let a = opts("10.0.0.2", 8080).fill("rs-1", &parent_v4()).unwrap();
    let mut o = opts("10.0.0.2", 8080);
    o.weight = 50;
    let b = o.fill("rs-1", &parent_v4()).unwrap();
    assert!(!a.equal(&b));
}
