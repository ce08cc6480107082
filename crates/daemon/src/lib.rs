//! IPVS control-plane daemon: reconciles declarative desired state held in
//! a store against the kernel's IPVS tables and health-checks backends.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod metrics;
pub mod reconciler;

pub use config::Config;
pub use context::Context;
pub use error::DaemonError;
pub use metrics::Metrics;
pub use reconciler::Reconciler;
