// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and return JSON.  There is no
// authentication: the service backs a single-user dashboard.
//
// Failures are reported as `{"error": kind, "message": text}` with
//   invalid_input      => 400
//   insufficient_data  => 422
//   data_unavailable   => 502
//
// CORS is configured permissively so the dashboard can be served from any
// origin during development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis::analyze_symbol;
use crate::app_state::AppState;
use crate::error::{AnalysisError, ErrorKind};
use crate::indicators;
use crate::market_data::CacheMode;
use crate::runtime_config::SignalThresholds;
use crate::scanner::{run_scan, ScanRequest};
use crate::types::{normalize_symbol, DateRange};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/symbols", get(symbols))
        // ── Analysis ────────────────────────────────────────────────
        .route("/api/v1/analyze/:symbol", get(analyze))
        .route("/api/v1/scan", post(scan))
        .route("/api/v1/scan/latest", get(latest_scan))
        // ── Cache & config ──────────────────────────────────────────
        .route("/api/v1/cache/invalidate", post(invalidate_cache))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config/thresholds", post(set_thresholds))
        .route("/api/v1/config/cache", post(set_cache_ttl))
        .route("/api/v1/errors", get(errors))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error responses
// =============================================================================

/// An `AnalysisError` on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(AnalysisError);

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        Self(e)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::InsufficientData => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::DataUnavailable => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let body = serde_json::json!({
            "error": kind,
            "message": self.0.to_string(),
        });
        (status_for(kind), Json(body)).into_response()
    }
}

/// Log the failure into the dashboard error ring and hand it back.
fn record(state: &AppState, err: AnalysisError) -> ApiError {
    let code = serde_json::to_value(err.kind())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string));
    state.push_error_with_code(err.to_string(), code);
    ApiError(err)
}

// =============================================================================
// Health & symbols
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
    cache_entries: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        cache_entries: state.market_data.cache().len(),
    };
    Json(resp)
}

async fn symbols(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.runtime_config.read();
    Json(serde_json::json!({
        "symbols": config.symbols,
        "default_scan_symbols": config.default_scan_symbols,
    }))
}

// =============================================================================
// Single-symbol analysis
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    range: Option<DateRange>,
    #[serde(default)]
    cache: Option<CacheMode>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(raw_symbol): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Response, ApiError> {
    let symbol = normalize_symbol(&raw_symbol).map_err(|e| record(&state, e))?;

    let (range, thresholds, min_bars) = {
        let config = state.runtime_config.read();
        (
            query.range.unwrap_or(config.default_range),
            config.thresholds.clone(),
            config.min_bars,
        )
    };

    let analysis = analyze_symbol(
        &state.market_data,
        &symbol,
        range,
        state.today(),
        query.cache.unwrap_or_default(),
        &thresholds,
        min_bars,
    )
    .await
    .map_err(|e| record(&state, e))?;

    info!(
        symbol = %analysis.symbol,
        score = analysis.signal.score,
        classification = %analysis.signal.classification,
        "analysis served"
    );
    Ok(Json(analysis).into_response())
}

// =============================================================================
// Scanner
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ScanBody {
    /// Omitted => the configured default scan list.  Present but empty is
    /// rejected.
    #[serde(default)]
    symbols: Option<Vec<String>>,
    #[serde(default)]
    max_symbols: Option<usize>,
    #[serde(default)]
    range: Option<DateRange>,
    #[serde(default)]
    cache: Option<CacheMode>,
}

async fn scan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScanBody>,
) -> Result<Response, ApiError> {
    let request = {
        let config = state.runtime_config.read();
        ScanRequest {
            symbols: body
                .symbols
                .unwrap_or_else(|| config.default_scan_symbols.clone()),
            max_symbols: body.max_symbols,
            range: body.range.unwrap_or(config.default_range),
            cache_mode: body.cache.unwrap_or_default(),
        }
    };
    let settings = state.scan_settings();

    let report = run_scan(&state.market_data, &request, &settings, state.today())
        .await
        .map_err(|e| record(&state, e))?;

    for failure in &report.failures {
        state.push_error(format!("scan {}: {}", report.id, failure.message));
    }

    let response = Json(&report).into_response();
    state.record_scan(report);
    Ok(response)
}

async fn latest_scan(State(state): State<Arc<AppState>>) -> Response {
    let last = state.last_scan.read();
    match last.as_ref() {
        Some(report) => Json(report).into_response(),
        None => {
            let body = serde_json::json!({
                "error": "not_found",
                "message": "no scan has run yet",
            });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct InvalidateBody {
    #[serde(default)]
    symbol: Option<String>,
}

async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    body: Option<Json<InvalidateBody>>,
) -> Result<Response, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let symbol = body
        .symbol
        .as_deref()
        .map(normalize_symbol)
        .transpose()
        .map_err(|e| record(&state, e))?;

    let removed = state.market_data.cache().invalidate(symbol.as_deref());
    info!(symbol = ?symbol, removed, "series cache invalidated");
    state.increment_version();

    Ok(Json(serde_json::json!({ "symbol": symbol, "removed": removed })).into_response())
}

// =============================================================================
// Config
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.runtime_config.read();
    Json(serde_json::json!({
        "thresholds": config.thresholds,
        "indicator_params": {
            "rsi_period": indicators::RSI_PERIOD,
            "macd_fast": indicators::MACD_FAST,
            "macd_slow": indicators::MACD_SLOW,
            "macd_signal": indicators::MACD_SIGNAL,
            "bollinger_period": indicators::BOLLINGER_PERIOD,
            "bollinger_std_dev": indicators::BOLLINGER_STD_DEV,
            "atr_period": indicators::ATR_PERIOD,
            "stochastic_k_period": indicators::STOCHASTIC_K_PERIOD,
            "stochastic_d_period": indicators::STOCHASTIC_D_PERIOD,
            "adx_period": indicators::ADX_PERIOD,
            "sma_periods": [indicators::SMA_SHORT, indicators::SMA_MEDIUM, indicators::SMA_LONG],
        },
        "scan": {
            "default_max_symbols": config.default_max_symbols,
            "max_scan_symbols": config.max_scan_symbols,
            "scan_concurrency": config.scan_concurrency,
            "min_bars": config.min_bars,
            "default_range": config.default_range,
        },
        "cache_ttl_secs": config.cache_ttl_secs,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdUpdate {
    #[serde(default)]
    rsi_oversold: Option<f64>,
    #[serde(default)]
    rsi_overbought: Option<f64>,
    #[serde(default)]
    adx_trend: Option<f64>,
    #[serde(default)]
    stoch_oversold: Option<f64>,
    #[serde(default)]
    stoch_overbought: Option<f64>,
    #[serde(default)]
    strong_buy_score: Option<i32>,
    #[serde(default)]
    buy_score: Option<i32>,
    #[serde(default)]
    sell_score: Option<i32>,
    #[serde(default)]
    strong_sell_score: Option<i32>,
}

async fn set_thresholds(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ThresholdUpdate>,
) -> Result<Response, ApiError> {
    let mut changes = Vec::new();

    // Merge, validate and assign under one write guard; save after it drops.
    let merged = {
        let mut config = state.runtime_config.write();
        let mut candidate: SignalThresholds = config.thresholds.clone();

        macro_rules! apply_threshold {
            ($field:ident) => {
                if let Some(val) = update.$field {
                    if candidate.$field != val {
                        changes.push(format!(
                            "{}: {} -> {}",
                            stringify!($field),
                            candidate.$field,
                            val
                        ));
                        candidate.$field = val;
                    }
                }
            };
        }

        apply_threshold!(rsi_oversold);
        apply_threshold!(rsi_overbought);
        apply_threshold!(adx_trend);
        apply_threshold!(stoch_oversold);
        apply_threshold!(stoch_overbought);
        apply_threshold!(strong_buy_score);
        apply_threshold!(buy_score);
        apply_threshold!(sell_score);
        apply_threshold!(strong_sell_score);

        candidate.validate().map(|()| {
            if !changes.is_empty() {
                config.thresholds = candidate.clone();
            }
            (candidate, config.clone())
        })
    };

    let (thresholds, config_clone) =
        merged.map_err(|msg| record(&state, AnalysisError::InvalidInput(msg)))?;

    if !changes.is_empty() {
        info!(changes = ?changes, "signal thresholds updated");

        if let Some(path) = &state.config_path {
            if let Err(e) = config_clone.save(path) {
                warn!(error = %e, "Failed to save thresholds to disk");
                state.push_error(format!("failed to persist thresholds: {e:#}"));
            }
        }

        state.increment_version();
    }

    Ok(Json(serde_json::json!({
        "thresholds": thresholds,
        "changes": changes,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct CacheTtlUpdate {
    ttl_secs: u64,
}

/// Zero disables caching and drops everything stored.
async fn set_cache_ttl(
    State(state): State<Arc<AppState>>,
    Json(update): Json<CacheTtlUpdate>,
) -> impl IntoResponse {
    state
        .market_data
        .cache()
        .set_ttl(std::time::Duration::from_secs(update.ttl_secs));

    let config_clone = {
        let mut config = state.runtime_config.write();
        config.cache_ttl_secs = update.ttl_secs;
        config.clone()
    };
    if let Some(path) = &state.config_path {
        if let Err(e) = config_clone.save(path) {
            warn!(error = %e, "Failed to save cache TTL to disk");
        }
    }

    info!(ttl_secs = update.ttl_secs, "series cache TTL changed");
    state.increment_version();

    Json(serde_json::json!({
        "ttl_secs": update.ttl_secs,
        "enabled": state.market_data.cache().is_enabled(),
        "entries": state.market_data.cache().len(),
    }))
}

// =============================================================================
// Errors
// =============================================================================

async fn errors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::PriceSource;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::{PriceBar, YearMonth};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::NaiveDate;
    use tower::ServiceExt;

    /// Twenty rising bars per month for HBL and OGDC, three for TINY,
    /// nothing for anything else.
    struct FakeSource;

    #[async_trait]
    impl PriceSource for FakeSource {
        async fn fetch_month(&self, symbol: &str, month: YearMonth) -> Result<Vec<PriceBar>, AnalysisError> {
            let count = match symbol {
                "HBL" | "OGDC" => 20,
                "TINY" => 3,
                _ => return Err(AnalysisError::unavailable(symbol, "HTTP 404")),
            };
            let start = NaiveDate::from_ymd_opt(month.year, month.month, 1).unwrap();
            let base = (month.year * 12 + month.month as i32) as f64;
            Ok((0..count)
                .map(|i| {
                    let c = base + i as f64;
                    PriceBar::new(start + chrono::Duration::days(i), c, c + 1.0, c - 1.0, c, 100).unwrap()
                })
                .collect())
        }
    }

    fn app_with(state: Arc<AppState>) -> Router {
        router(state)
    }

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(RuntimeConfig::default(), Arc::new(FakeSource), None))
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, json) = call(app_with(state()), get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache_entries"], 0);
    }

    #[tokio::test]
    async fn symbols_lists_universe_and_defaults() {
        let (status, json) = call(app_with(state()), get_req("/api/v1/symbols")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["default_scan_symbols"][0], "OGDC");
        assert!(json["symbols"].as_array().unwrap().len() > 50);
    }

    #[tokio::test]
    async fn analyze_returns_full_analysis() {
        let (status, json) = call(app_with(state()), get_req("/api/v1/analyze/hbl")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["symbol"], "HBL");
        assert_eq!(json["range"], "current_and_previous_month");
        assert_eq!(json["bars"].as_array().unwrap().len(), 40);
        assert_eq!(json["indicators"]["rsi"].as_array().unwrap().len(), 40);
        assert!(json["signal"]["classification"].is_string());
    }

    #[tokio::test]
    async fn analyze_status_mapping() {
        let state = state();

        let (status, json) = call(app_with(state.clone()), get_req("/api/v1/analyze/bad%20sym")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_input");

        let (status, json) = call(app_with(state.clone()), get_req("/api/v1/analyze/NOPE")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "data_unavailable");

        let (status, json) = call(
            app_with(state.clone()),
            get_req("/api/v1/analyze/TINY?range=current_and_previous_month"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "insufficient_data");

        let (_, errors) = call(app_with(state), get_req("/api/v1/errors")).await;
        assert_eq!(errors.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn scan_uses_defaults_and_is_retrievable() {
        let state = state();
        let (status, _) = call(app_with(state.clone()), get_req("/api/v1/scan/latest")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = call(
            app_with(state.clone()),
            post_json("/api/v1/scan", serde_json::json!({ "cache": "bypass" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // OGDC and HBL have data; UBL, MEBL and ENGRO are unknown to the fake.
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert_eq!(json["failures"].as_array().unwrap().len(), 3);
        assert_eq!(json["summary"]["total"], 5);

        let (status, latest) = call(app_with(state), get_req("/api/v1/scan/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["id"], json["id"]);
    }

    #[tokio::test]
    async fn scan_rejects_empty_list() {
        let (status, json) = call(
            app_with(state()),
            post_json("/api/v1/scan", serde_json::json!({ "symbols": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_input");
    }

    #[tokio::test]
    async fn cache_invalidation_counts_entries() {
        let state = state();
        call(app_with(state.clone()), get_req("/api/v1/analyze/HBL")).await;
        call(app_with(state.clone()), get_req("/api/v1/analyze/OGDC")).await;
        assert_eq!(state.market_data.cache().len(), 2);

        let (status, json) = call(
            app_with(state.clone()),
            post_json("/api/v1/cache/invalidate", serde_json::json!({ "symbol": "hbl" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed"], 1);

        let (_, json) = call(
            app_with(state.clone()),
            post_json("/api/v1/cache/invalidate", serde_json::json!({})),
        )
        .await;
        assert_eq!(json["removed"], 1);
        assert!(state.market_data.cache().is_empty());
    }

    #[tokio::test]
    async fn config_reports_params() {
        let (status, json) = call(app_with(state()), get_req("/api/v1/config")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["indicator_params"]["rsi_period"], 14);
        assert_eq!(json["thresholds"]["adx_trend"], 25.0);
        assert_eq!(json["scan"]["max_scan_symbols"], 20);
    }

    #[tokio::test]
    async fn zero_cache_ttl_disables_cache() {
        let state = state();
        call(app_with(state.clone()), get_req("/api/v1/analyze/HBL")).await;
        assert_eq!(state.market_data.cache().len(), 1);

        let (status, json) = call(
            app_with(state.clone()),
            post_json("/api/v1/config/cache", serde_json::json!({ "ttl_secs": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], false);
        assert_eq!(json["entries"], 0);
        assert_eq!(state.runtime_config.read().cache_ttl_secs, 0);
    }

    #[tokio::test]
    async fn threshold_update_applies_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime_config.json");
        let state = Arc::new(AppState::new(
            RuntimeConfig::default(),
            Arc::new(FakeSource),
            Some(path.clone()),
        ));

        let (status, json) = call(
            app_with(state.clone()),
            post_json("/api/v1/config/thresholds", serde_json::json!({ "rsi_oversold": 25.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["thresholds"]["rsi_oversold"], 25.0);
        assert_eq!(json["changes"].as_array().unwrap().len(), 1);
        assert!((state.runtime_config.read().thresholds.rsi_oversold - 25.0).abs() < f64::EPSILON);

        let saved = RuntimeConfig::load(&path).unwrap();
        assert!((saved.thresholds.rsi_oversold - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn concurrent_partial_updates_both_apply() {
        let state = state();
        let first = call(
            app_with(state.clone()),
            post_json("/api/v1/config/thresholds", serde_json::json!({ "rsi_oversold": 25.0 })),
        );
        let second = call(
            app_with(state.clone()),
            post_json("/api/v1/config/thresholds", serde_json::json!({ "adx_trend": 30.0 })),
        );
        let ((s1, _), (s2, _)) = tokio::join!(first, second);
        assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));

        let thresholds = state.runtime_config.read().thresholds.clone();
        assert!((thresholds.rsi_oversold - 25.0).abs() < f64::EPSILON);
        assert!((thresholds.adx_trend - 30.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn threshold_update_rejects_inverted_bands() {
        let state = state();
        let (status, json) = call(
            app_with(state.clone()),
            post_json("/api/v1/config/thresholds", serde_json::json!({ "buy_score": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_input");
        assert_eq!(state.runtime_config.read().thresholds, SignalThresholds::default());
    }
}
