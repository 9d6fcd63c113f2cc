// HTTP request handlers
use crate::application::filter_aggregator::{aggregate, validate_filters};
use crate::application::series_generator::{GeneratorConfig, SeriesGenerator};
use crate::application::virtual_window::ViewportWindow;
use crate::domain::point::{AggregationPeriod, FilterSpec, Point, Series};
use crate::infrastructure::http_aggregator::AggregateResponse;
use crate::infrastructure::http_response::{accepts_brotli, json_response, png_response};
use crate::infrastructure::ndjson_stream::{ndjson_response, paced};
use crate::presentation::app_state::AppState;
use crate::rendering::chart_renderer::ChartKind;
use crate::rendering::viewport::ZoomState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const MAX_GENERATED_POINTS: usize = 100_000;
const MAX_INTERVAL_MS: i64 = 86_400_000;

fn clamp_interval(interval_ms: i64) -> i64 {
    interval_ms.clamp(1, MAX_INTERVAL_MS)
}

fn backdated_start(count: usize, interval_ms: i64) -> i64 {
    let span = (count as i64).saturating_mul(interval_ms);
    chrono::Utc::now().timestamp_millis().saturating_sub(span)
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    pub count: Option<usize>,
    pub interval_ms: Option<i64>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DataRequest {
    pub count: Option<usize>,
    pub interval_ms: Option<i64>,
    pub config: Option<GeneratorConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub data: Series,
    pub count: usize,
    pub start_time: i64,
    pub end_time: i64,
}

fn generate(config: GeneratorConfig, count: usize, interval_ms: i64) -> DataResponse {
    let count = count.min(MAX_GENERATED_POINTS);
    let interval_ms = clamp_interval(interval_ms);
    let start_time = backdated_start(count, interval_ms);
    let data = SeriesGenerator::new(config).points(count, start_time, interval_ms);

    DataResponse {
        count: data.len(),
        data,
        start_time,
        end_time: chrono::Utc::now().timestamp_millis(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Generate a batch of synthetic points
pub async fn get_data(
    Query(query): Query<DataQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<DataResponse> {
    Json(generate(
        state.generator.clone(),
        query.count.unwrap_or(1000),
        query.interval_ms.unwrap_or(1000),
    ))
}

pub async fn post_data(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DataRequest>,
) -> Json<DataResponse> {
    Json(generate(
        body.config.unwrap_or_else(|| state.generator.clone()),
        body.count.unwrap_or(1000),
        body.interval_ms.unwrap_or(1000),
    ))
}

#[derive(Deserialize)]
pub struct AggregateRequest {
    pub data: Option<Series>,
    pub period: Option<AggregationPeriod>,
}

/// Remote aggregation service
pub async fn aggregate_data(Json(body): Json<AggregateRequest>) -> Response {
    let Some(data) = body.data else {
        return bad_request("Invalid data format");
    };
    let Some(period) = body.period.filter(AggregationPeriod::is_valid) else {
        return bad_request("Invalid aggregation period");
    };

    let original_count = data.len();
    let aggregated = match tokio::task::spawn_blocking(move || aggregate(&data, &period)).await {
        Ok(aggregated) => aggregated,
        Err(e) => {
            tracing::error!("Aggregation task failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    Json(AggregateResponse {
        original_count,
        aggregated_count: aggregated.len(),
        data: aggregated,
    })
    .into_response()
}

/// Stream synthetic points as NDJSON, one per interval
pub async fn stream_data(
    Query(query): Query<DataQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let count = query.count.unwrap_or(10).min(MAX_GENERATED_POINTS);
    let interval_ms = clamp_interval(query.interval_ms.unwrap_or(100));
    let start = backdated_start(count, interval_ms);
    let points: Vec<Point> = SeriesGenerator::new(state.generator.clone()).points(count, start, interval_ms);

    let stream = paced(points, Duration::from_millis(interval_ms as u64));
    match ndjson_response(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Latest processed series
pub async fn get_series(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let processed = state.session.processed();
    match json_response(&*processed, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

pub async fn start_stream(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let changed = state.session.start_stream();
    Json(json!({ "streaming": state.session.is_streaming(), "changed": changed }))
}

pub async fn stop_stream(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let changed = state.session.stop_stream();
    Json(json!({ "streaming": state.session.is_streaming(), "changed": changed }))
}

pub async fn put_filters(
    State(state): State<Arc<AppState>>,
    Json(filters): Json<FilterSpec>,
) -> Response {
    let issues = validate_filters(&filters);
    if !issues.is_empty() {
        let issues: Vec<String> = issues.iter().map(ToString::to_string).collect();
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "issues": issues }))).into_response();
    }
    state.session.set_filters(filters);
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
pub struct AggregationRequest {
    pub period: Option<AggregationPeriod>,
}

pub async fn put_aggregation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregationRequest>,
) -> Response {
    if body.period.as_ref().is_some_and(|p| !p.is_valid()) {
        return bad_request("Invalid aggregation period");
    }
    state.session.set_aggregation(body.period);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn aggregation_presets() -> Json<Vec<AggregationPeriod>> {
    Json(AggregationPeriod::presets())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    #[serde(default)]
    pub scroll_top: f64,
}

#[derive(Serialize)]
pub struct TableRow {
    pub index: usize,
    pub point: Point,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse {
    pub window: Option<ViewportWindow>,
    pub total_height: f64,
    pub rows: Vec<TableRow>,
}

/// Rows of the processed series visible at `scrollTop`
pub async fn get_table(
    Query(query): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<TableResponse> {
    let processed = state.session.processed();
    let series = &processed.series;

    Json(TableResponse {
        window: state.table.compute(series.len(), query.scroll_top),
        total_height: state.table.total_height(series.len()),
        rows: state
            .table
            .visible_items(series, query.scroll_top)
            .into_iter()
            .map(|(index, point)| TableRow {
                index,
                point: point.clone(),
            })
            .collect(),
    })
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chart.metrics())
}

pub async fn reset_metrics(State(state): State<Arc<AppState>>) -> StatusCode {
    state.chart.reset_metrics();
    StatusCode::NO_CONTENT
}

pub async fn chart_png(State(state): State<Arc<AppState>>) -> Response {
    let png = match state.chart.png() {
        Ok(png) => png,
        Err(e) => {
            tracing::error!("Chart export failed: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match png_response(png) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[derive(Deserialize)]
pub struct KindRequest {
    pub kind: ChartKind,
}

pub async fn put_chart_kind(
    State(state): State<Arc<AppState>>,
    Json(body): Json<KindRequest>,
) -> StatusCode {
    state.chart.renderer.write().set_kind(body.kind);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct ZoomRequest {
    /// Wheel notches; positive zooms in.
    pub steps: f64,
    pub x: f64,
    pub y: f64,
}

pub async fn zoom_chart(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ZoomRequest>,
) -> Json<ZoomState> {
    let mut renderer = state.chart.renderer.write();
    renderer.zoom_at(body.steps, body.x, body.y);
    Json(renderer.zoom())
}

#[derive(Deserialize)]
pub struct PanRequest {
    pub dx: f64,
    pub dy: f64,
}

pub async fn pan_chart(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PanRequest>,
) -> Json<ZoomState> {
    let mut renderer = state.chart.renderer.write();
    renderer.pan(body.dx, body.dy);
    Json(renderer.zoom())
}

pub async fn reset_chart(State(state): State<Arc<AppState>>) -> Json<ZoomState> {
    let mut renderer = state.chart.renderer.write();
    renderer.reset_zoom();
    Json(renderer.zoom())
}
