use super::*;

fn opts(host: &str, port: u16) -> ServiceOptions {
    ServiceOptions {
        host: host.to_owned(),
        port,
        protocol: String::new(),
        scheduler: String::new(),
        flags: String::new(),
    }
}

#[test]
fn fill_applies_defaults() {
    let svc = opts("10.0.0.1", 80).fill("vs-1").unwrap();
    assert_eq!(svc.key.protocol, Protocol::Tcp);
    assert_eq!(svc.scheduler, "wrr");
    assert!(svc.flags.is_empty());
    assert_eq!(svc.store_id, "vs-1");
}

#[test]
fn fill_rejects_missing_port() {
    let mut o = opts("10.0.0.1", 0);
    o.port = 0;
    assert!(matches!(o.fill("vs-1"), Err(CoreError::MalformedRequest(_))));
}

#[test]
fn fill_rejects_missing_host() {
    let o = opts("", 80);
    assert!(matches!(o.fill("vs-1"), Err(CoreError::MalformedRequest(_))));
}

#[test]
fn fill_rejects_unknown_protocol() {
    let mut o = opts("10.0.0.1", 80);
    o.protocol = "sctp".to_owned();
    assert!(matches!(o.fill("vs-1"), Err(CoreError::UnknownProtocol(_))));
}

#[test]
fn fill_rejects_unknown_scheduler() {
    let mut o = opts("10.0.0.1", 80);
    o.scheduler = "made-up".to_owned();
    assert!(matches!(o.fill("vs-1"), Err(CoreError::UnknownMethod(_))));
}

#[test]
fn fill_rejects_unknown_flag() {
    let mut o = opts("10.0.0.1", 80);
    o.flags = "flag-9".to_owned();
    assert!(matches!(o.fill("vs-1"), Err(CoreError::UnknownFlag(_))));
}

#[test]
fn equal_compares_key_scheduler_and_flag_set_but_not_store_id() {
    let mut a = opts("10.0.0.1", 80);
    a.flags = "flag-1|flag-2".to_owned();
    let svc_a = a.fill("vs-1").unwrap();

    let mut b = opts("10.0.0.1", 80);
    b.flags = "flag-2|flag-1".to_owned();
    let svc_b = b.fill("vs-2").unwrap();

    assert!(svc_a.equal(&svc_b));
}

#[test]
fn equal_detects_scheduler_change() {
    let mut a = opts("10.0.0.1", 80);
    a.scheduler = "wrr".to_owned();
    let svc_a = a.fill("vs-1").unwrap();

    let mut b = opts("10.0.0.1", 80);
    b.scheduler = "sh".to_owned();
    let svc_b = b.fill("vs-1").unwrap();

    assert!(!svc_a.equal(&svc_b));
}

#[test]
fn fill_accepts_literal_ip_without_resolution() {
    let svc = opts("192.168.1.5", 443).fill("vs-1").unwrap();
    assert_eq!(svc.key.vip, "192.168.1.5".parse::<std::net::IpAddr>().unwrap());
}
