use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::error::DaemonError;

/// Startup configuration, assembled in increasing precedence from an
/// `ipvsd.toml` file, `IPVSD_`-prefixed environment variables, and CLI
/// flags. Invalid or missing required fields fail fast before any
/// subsystem is constructed.
#[derive(Debug, Clone, Parser)]
#[command(name = "ipvsd", about = "IPVS control-plane daemon")]
pub struct Config {
    /// Path to an `ipvsd.toml` file providing defaults for unset flags.
    #[arg(long, env = "IPVSD_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Address the HTTP surface listens on.
    #[arg(long, env = "IPVSD_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    pub listen_addr: SocketAddr,

    /// Store endpoint URLs, e.g. `etcd://127.0.0.1:2379/ipvsd` or
    /// `mem://local/ipvsd`. All must share scheme and path.
    #[arg(long = "store-url", env = "IPVSD_STORE_URLS", value_delimiter = ',')]
    pub store_urls: Vec<String>,

    /// Store key prefix under which services are kept.
    #[arg(long, env = "IPVSD_SERVICE_PREFIX", default_value = "services")]
    pub service_prefix: String,

    /// Store key prefix under which backends are kept.
    #[arg(long, env = "IPVSD_BACKEND_PREFIX", default_value = "backends")]
    pub backend_prefix: String,

    /// Reconcile cycle period, in milliseconds.
    #[arg(long, env = "IPVSD_RECONCILE_PERIOD_MS", default_value = "5000")]
    pub reconcile_period_ms: u64,

    /// Flush the kernel IPVS table before the first reconcile cycle.
    #[arg(long, env = "IPVSD_INITIAL_FLUSH", default_value = "false")]
    pub initial_flush: bool,

    /// Network interface to bind configured VIPs to. Left unimplemented
    /// (see the daemon's design notes); accepted so deployments can carry
    /// the setting forward without a breaking config change.
    #[arg(long, env = "IPVSD_VIP_INTERFACE")]
    pub vip_interface: Option<String>,

    /// `tracing-subscriber` env-filter directive, e.g. `info` or
    /// `ipvsd_daemon=debug,ipvsd_kernel=warn`.
    #[arg(long, env = "IPVSD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Mirrors [`Config`]'s fields for deserializing `ipvsd.toml`; every field
/// is optional since file values are the lowest-precedence layer.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    listen_addr: Option<SocketAddr>,
    store_urls: Option<Vec<String>>,
    service_prefix: Option<String>,
    backend_prefix: Option<String>,
    reconcile_period_ms: Option<u64>,
    initial_flush: Option<bool>,
    vip_interface: Option<String>,
    log_level: Option<String>,
}

impl Config {
    /// Parses CLI flags and environment variables, then fills any field
    /// left at its clap default from `config_file` if one was given.
    pub fn load() -> Result<Config, DaemonError> {
        let mut config = Config::parse();

        if let Some(path) = &config.config_file {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| DaemonError::Config(format!("reading {}: {e}", path.display())))?;
            let file: FileConfig = toml::from_str(&raw)
                .map_err(|e| DaemonError::Config(format!("parsing {}: {e}", path.display())))?;

            if config.store_urls.is_empty() {
                if let Some(urls) = file.store_urls {
                    config.store_urls = urls;
                }
            }
            if let Some(addr) = file.listen_addr {
                if config.listen_addr == default_listen_addr() {
                    config.listen_addr = addr;
                }
            }
            if let Some(v) = file.service_prefix {
                config.service_prefix = v;
            }
            if let Some(v) = file.backend_prefix {
                config.backend_prefix = v;
            }
            if let Some(v) = file.reconcile_period_ms {
                config.reconcile_period_ms = v;
            }
            if let Some(v) = file.initial_flush {
                config.initial_flush = v;
            }
            if file.vip_interface.is_some() {
                config.vip_interface = file.vip_interface;
            }
            if let Some(v) = file.log_level {
                config.log_level = v;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), DaemonError> {
        if self.store_urls.is_empty() {
            return Err(DaemonError::Config(
                "at least one --store-url is required".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn reconcile_period(&self) -> Duration {
        Duration::from_millis(self.reconcile_period_ms)
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}
