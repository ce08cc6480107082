//! Closed vocabularies accepted at the REST/store boundary. Each type
//! parses from the wire string and round-trips back to it, so the kernel
//! adapter and the REST layer can share one source of truth for what is
//! valid.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown protocol `{0}`")]
pub struct ProtocolParseError(pub String);

/// Transport protocol of a virtual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// IANA protocol number, as used by the kernel's `AF_INET` socket family.
    pub fn number(self) -> u8 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        })
    }
}

impl FromStr for Protocol {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(ProtocolParseError(other.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown forwarding method `{0}`")]
pub struct ForwardParseError(pub String);

/// Packet forwarding method used to reach a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Forward {
    Nat,
    Dr,
    Tunnel,
}

impl fmt::Display for Forward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Forward::Nat => "nat",
            Forward::Dr => "dr",
            Forward::Tunnel => "tunnel",
        })
    }
}

impl FromStr for Forward {
    type Err = ForwardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nat" => Ok(Forward::Nat),
            "dr" => Ok(Forward::Dr),
            "tunnel" => Ok(Forward::Tunnel),
            other => Err(ForwardParseError(other.to_owned())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown flag `{0}`")]
pub struct FlagParseError(pub String);

/// Scheduler-flag bits, named after the kernel's `IP_VS_SVC_F_*` bitfield.
/// On write, the kernel adapter applies these with an all-ones mask so any
/// bit not named here is cleared rather than left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Flag1,
    Flag2,
    Flag3,
    ShPort,
    ShFallback,
}

impl Flag {
    pub fn bit(self) -> u32 {
        match self {
            Flag::Flag1 => 1 << 0,
            Flag::Flag2 => 1 << 1,
            Flag::Flag3 => 1 << 2,
            Flag::ShPort => 1 << 3,
            Flag::ShFallback => 1 << 4,
        }
    }

    pub fn all_bits() -> u32 {
        [
            Flag::Flag1,
            Flag::Flag2,
            Flag::Flag3,
            Flag::ShPort,
            Flag::ShFallback,
        ]
        .iter()
        .fold(0, |mask, f| mask | f.bit())
    }

    /// Round-trips a bitfield back into the set of names whose bit is set.
    pub fn from_bits(bits: u32) -> Vec<Flag> {
        [
            Flag::Flag1,
            Flag::Flag2,
            Flag::Flag3,
            Flag::ShPort,
            Flag::ShFallback,
        ]
        .into_iter()
        .filter(|f| bits & f.bit() != 0)
        .collect()
    }
}

impl serde::Serialize for Flag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Flag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flag::Flag1 => "flag-1",
            Flag::Flag2 => "flag-2",
            Flag::Flag3 => "flag-3",
            Flag::ShPort => "sh-port",
            Flag::ShFallback => "sh-fallback",
        })
    }
}

impl FromStr for Flag {
    type Err = FlagParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flag-1" => Ok(Flag::Flag1),
            "flag-2" => Ok(Flag::Flag2),
            "flag-3" => Ok(Flag::Flag3),
            "sh-port" => Ok(Flag::ShPort),
            "sh-fallback" => Ok(Flag::ShFallback),
            other => Err(FlagParseError(other.to_owned())),
        }
    }
}

/// Parses a pipe-separated flag string (`"flag-1|flag-2"`, `""` for none)
/// into a sorted, de-duplicated set of flags.
pub fn parse_flags(raw: &str) -> Result<Vec<Flag>, FlagParseError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let mut flags: Vec<Flag> = raw
        .split('|')
        .map(Flag::from_str)
        .collect::<Result<_, _>>()?;
    flags.sort_by_key(|f| f.bit());
    flags.dedup_by_key(|f| f.bit());
    Ok(flags)
}

/// Serializes a flag set back to its pipe-separated wire form.
pub fn format_flags(flags: &[Flag]) -> String {
    flags
        .iter()
        .map(Flag::to_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Scheduler names accepted by the kernel's `ip_vs_sched` registry. The
/// daemon never interprets these beyond validating and passing them
/// through; new scheduler modules only need an entry here.
pub const SCHEDULERS: &[&str] = &[
    "rr", "wrr", "lc", "wlc", "lblc", "lblcr", "dh", "sh", "sed", "nq",
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown scheduler `{0}`")]
pub struct SchedulerParseError(pub String);

pub fn validate_scheduler(name: &str) -> Result<(), SchedulerParseError> {
    if SCHEDULERS.contains(&name) {
        Ok(())
    } else {
        Err(SchedulerParseError(name.to_owned()))
    }
}

#[cfg(test)]
#[path = "vocab_tests.rs"]
mod tests;
