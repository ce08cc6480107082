//! Pure value types and validation rules shared by the IPVS control-plane
//! crates: the wire shape of services and backends, their closed
//! vocabularies (protocol, scheduler flags, forwarding method), and the
//! pulse health-update types exchanged between the prober and the
//! reconciler.

pub mod backend;
pub mod error;
pub mod key;
pub mod pulse;
pub mod service;
pub mod vocab;

pub use backend::{Backend, BackendOptions};
pub use error::CoreError;
pub use key::{BackendKey, ServiceKey};
pub use pulse::{PulseMetrics, PulseOptions, PulseStatus, PulseUpdate};
pub use service::{Service, ServiceOptions};
pub use vocab::{Flag, Forward, Protocol};
