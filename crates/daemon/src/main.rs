use std::sync::Arc;

use ipvsd_daemon::config::Config;
use ipvsd_daemon::context::Context;
use ipvsd_daemon::http::{self, AppState};
use ipvsd_daemon::metrics::Metrics;
use ipvsd_daemon::reconciler::Reconciler;
use ipvsd_kernel::{Kernel, NetlinkKernel};
use ipvsd_pulse::PulseHandler;
use ipvsd_store::create_store;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ipvsd: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "fatal startup error");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), ipvsd_daemon::error::DaemonError> {
    let store = create_store(&config.store_urls, &config.service_prefix, &config.backend_prefix)
        .await?;

    let kernel: Arc<dyn Kernel> = Arc::new(NetlinkKernel::connect().await?);
    kernel.init().await?;
    if config.initial_flush {
        kernel.flush().await?;
    }

    let shutdown = CancellationToken::new();
    let (pulse_tx, pulse_rx) = mpsc::channel(256);
    let (sync_tx, sync_rx) = mpsc::channel(1);

    let context = Arc::new(Context::new(store.clone(), pulse_tx, sync_tx, shutdown.clone()));
    context.start().await?;

    let metrics = Arc::new(Metrics::new()?);

    let pulse_handler_context = context.clone();
    let pulse_handler_shutdown = shutdown.clone();
    let pulse_task = tokio::spawn(async move {
        let mut handler = PulseHandler::new(pulse_handler_context);
        handler.run(pulse_rx, pulse_handler_shutdown).await;
    });

    let reconciler = Arc::new(Reconciler::new(store.clone(), kernel.clone(), config.reconcile_period()));
    let reconciler_task = {
        let reconciler = reconciler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            reconciler.run(sync_rx, shutdown).await;
        })
    };

    let state = Arc::new(AppState { context: context.clone(), metrics });
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .map_err(|e| ipvsd_daemon::error::DaemonError::Config(format!("binding {}: {e}", config.listen_addr)))?;

    tracing::info!(addr = %config.listen_addr, "ipvsd listening");

    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_shutdown.cancelled().await;
    });

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "http server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
            shutdown.cancel();
        }
    }

    shutdown.cancel();
    context.close().await;
    let _ = reconciler_task.await;
    let _ = pulse_task.await;

    Ok(())
}
