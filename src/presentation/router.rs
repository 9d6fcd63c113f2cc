// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    aggregate_data, aggregation_presets, chart_png, get_data, get_metrics, get_series, get_table,
    health_check, pan_chart, post_data, put_aggregation, put_chart_kind, put_filters, reset_chart,
    reset_metrics, start_stream, stop_stream, stream_data, zoom_chart,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Compression is applied per response in http_response, so no CompressionLayer here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/data", get(get_data).post(post_data))
        .route("/api/data/aggregate", post(aggregate_data))
        .route("/api/data/stream", get(stream_data))
        .route("/api/series", get(get_series))
        .route("/api/stream/start", post(start_stream))
        .route("/api/stream/stop", post(stop_stream))
        .route("/api/filters", put(put_filters))
        .route("/api/aggregation", put(put_aggregation))
        .route("/api/aggregation/presets", get(aggregation_presets))
        .route("/api/table", get(get_table))
        .route("/api/metrics", get(get_metrics).delete(reset_metrics))
        .route("/chart.png", get(chart_png))
        .route("/chart/kind", put(put_chart_kind))
        .route("/chart/zoom", post(zoom_chart))
        .route("/chart/pan", post(pan_chart))
        .route("/chart/reset", post(reset_chart))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
