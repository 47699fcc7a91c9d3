//! # tas-api — Binary Entry Point
//!
//! Loads configuration, wires the engine, publishes the TA DID document and
//! serves the API until Ctrl-C.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use tas_api::{bootstrap, AppState, TasConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TAS_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = TasConfig::load().context("loading configuration")?;
    let boot = bootstrap::build(&config).context("building trusted agent")?;
    let notifier_ctx = boot.notifier_ctx.clone();

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;
    let state = AppState::new(boot.engine).with_prometheus(prometheus);

    // Registry calls may block on HTTP.
    {
        let engine = state.engine.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || bootstrap::initialize(&engine, &config))
            .await
            .context("initialization task")?
            .context("initializing trusted agent")?;
    }

    let app = tas_api::app(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "TAS API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for shutdown signal");
            }
        })
        .await
        .context("serving")?;

    if let Some(ctx) = notifier_ctx {
        ctx.shutdown();
    }
    tracing::info!("TAS API stopped");
    Ok(())
}
