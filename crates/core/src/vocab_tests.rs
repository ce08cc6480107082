use super::*;
use yare::parameterized;

#[parameterized(
    tcp = { "tcp", Protocol::Tcp },
    udp = { "udp", Protocol::Udp },
    mixed_case = { "TcP", Protocol::Tcp },
)]
fn parses_known_protocols(input: &str, expected: Protocol) {
    assert_eq!(input.parse::<Protocol>().unwrap(), expected);
}

#[test]
fn rejects_unknown_protocol() {
    assert_eq!(
        "sctp".parse::<Protocol>(),
        Err(ProtocolParseError("sctp".to_owned()))
    );
}

#[parameterized(
    nat = { "nat", Forward::Nat },
    dr = { "dr", Forward::Dr },
    tunnel = { "tunnel", Forward::Tunnel },
)]
fn parses_known_forwarding_methods(input: &str, expected: Forward) {
    assert_eq!(input.parse::<Forward>().unwrap(), expected);
}

#[test]
fn rejects_unknown_forwarding_method() {
    assert!("gre".parse::<Forward>().is_err());
}

#[test]
fn protocol_number_matches_kernel_values() {
    assert_eq!(Protocol::Tcp.number(), 6);
    assert_eq!(Protocol::Udp.number(), 17);
}

#[test]
fn flag_bits_round_trip_through_the_write_mask() {
    let written = Flag::Flag1.bit() | Flag::ShFallback.bit();
    let masked = written & Flag::all_bits();
    let mut back = Flag::from_bits(masked);
    back.sort_by_key(|f| f.bit());
    assert_eq!(back, vec![Flag::Flag1, Flag::ShFallback]);
}

#[test]
fn unset_bits_are_omitted_on_round_trip() {
    assert_eq!(Flag::from_bits(0), Vec::<Flag>::new());
}

#[test]
fn parse_flags_accepts_empty_string_as_no_flags() {
    assert_eq!(parse_flags("").unwrap(), Vec::<Flag>::new());
}

#[test]
fn parse_flags_splits_on_pipe_and_dedups() {
    let flags = parse_flags("flag-1|flag-2|flag-1").unwrap();
    assert_eq!(flags, vec![Flag::Flag1, Flag::Flag2]);
}

#[test]
fn parse_flags_rejects_unknown_flag() {
    assert_eq!(
        parse_flags("flag-1|bogus"),
        Err(FlagParseError("bogus".to_owned()))
    );
}

#[test]
fn format_flags_round_trips_with_parse_flags() {
    let flags = parse_flags("sh-port|sh-fallback").unwrap();
    assert_eq!(format_flags(&flags), "sh-port|sh-fallback");
}

#[parameterized(
    wrr = { "wrr" },
    rr = { "rr" },
    sh = { "sh" },
    wlc = { "wlc" },
)]
fn accepts_known_schedulers(name: &str) {
    assert!(validate_scheduler(name).is_ok());
}

#[test]
fn rejects_unknown_scheduler() {
    assert!(validate_scheduler("made-up").is_err());
}
