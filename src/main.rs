// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;
mod rendering;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_session::{DashboardSession, SessionDeps};
use crate::application::dispatcher::ProcessingDispatcher;
use crate::application::series_generator::SeriesGenerator;
use crate::application::stream_buffer::StreamBuffer;
use crate::application::stream_driver::StreamDriver;
use crate::domain::point::FilterSpec;
use crate::infrastructure::background_worker::BackgroundWorker;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_aggregator::HttpAggregator;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;
use crate::rendering::render_loop::{ChartView, RenderLoop};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_app_config().context("Failed to load configuration")?;
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind))?;
    let shutdown = CancellationToken::new();

    // Live buffer, back-filled so the first frame has something to show
    let mut generator = SeriesGenerator::new(config.generator.clone());
    let interval_ms = i64::try_from(config.stream.interval_ms.max(1)).unwrap_or(i64::MAX);
    let initial_points = config.stream.initial_points;
    let backfill_start = chrono::Utc::now()
        .timestamp_millis()
        .saturating_sub((initial_points as i64).saturating_mul(interval_ms));
    let buffer = Arc::new(StreamBuffer::seeded(
        config.stream.capacity,
        generator.points(initial_points, backfill_start, interval_ms),
    ));

    let lifecycle = shutdown.child_token();
    let driver = StreamDriver::new(
        buffer.clone(),
        generator,
        config.stream.interval(),
        initial_points as u64,
        lifecycle.clone(),
    );

    // Processing contexts
    let mut dispatcher = ProcessingDispatcher::new(config.dispatcher.large_payload_threshold);
    if config.dispatcher.worker_enabled {
        dispatcher = dispatcher.with_worker(Arc::new(BackgroundWorker::spawn(shutdown.clone())));
    }
    if config.dispatcher.remote_enabled {
        // Without an explicit URL, large payloads go to this server's own aggregate route.
        let remote_url = config
            .dispatcher
            .remote_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", addr.port()));
        tracing::info!("Remote aggregation at {}", remote_url);
        dispatcher = dispatcher.with_remote(Arc::new(HttpAggregator::new(&remote_url)));
    }

    let session = Arc::new(DashboardSession::new(SessionDeps {
        buffer,
        driver,
        dispatcher,
        filters: FilterSpec::default(),
        aggregation: None,
        lifecycle,
    }));

    let chart = Arc::new(ChartView::new(config.chart.chart_config(), config.chart.kind));
    let render_loop = RenderLoop::new(session.clone(), chart.clone(), config.chart.frame_interval()).spawn();

    let state = Arc::new(AppState {
        session: session.clone(),
        chart,
        table: config.table.virtual_window(),
        generator: config.generator.clone(),
    });
    let router = build_router(state);

    tracing::info!("Starting pulse-dashboard on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    session.teardown();
    shutdown.cancel();
    if let Err(e) = render_loop.await {
        tracing::warn!("Render loop ended abnormally: {}", e);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
