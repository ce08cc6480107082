//! Per-backend health probing and the weight stash/restore protocol that
//! translates probe outcomes into kernel weight changes.

mod handler;
mod probe;
mod prober;
mod sink;

pub use handler::PulseHandler;
pub use sink::{WeightSink, WeightSinkError};

pub use prober::run as run_prober;
