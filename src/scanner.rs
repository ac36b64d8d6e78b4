// =============================================================================
// Scanner — bounded-concurrency analysis over many symbols
// =============================================================================
//
// Pipeline:
//   1. Validate the request before anything is fetched.
//   2. Normalise + dedupe symbols (first occurrence wins), truncate to the
//      effective limit.
//   3. Fan out fetch + analysis with at most `concurrency` symbols in flight.
//   4. Collect successes and failures separately; one symbol failing never
//      aborts the batch.
//   5. Sort results by score desc then symbol asc, failures by symbol.
//
// Output ordering does not depend on completion order, so a serial run and a
// parallel run over the same data produce identical reports (modulo ids and
// timestamps).
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{analyze_symbol, SymbolAnalysis};
use crate::error::{AnalysisError, ErrorKind};
use crate::indicators::atr::calculate_atr_pct;
use crate::indicators::rsi::rsi_label;
use crate::indicators::snapshot::latest;
use crate::indicators::ATR_PERIOD;
use crate::market_data::{CacheMode, MarketDataService};
use crate::runtime_config::SignalThresholds;
use crate::signals::{Classification, Signal};
use crate::types::{normalize_symbol, DateRange};

/// What to scan.  `symbols` is taken as given: an empty list is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub max_symbols: Option<usize>,
    #[serde(default)]
    pub range: DateRange,
    #[serde(default)]
    pub cache_mode: CacheMode,
}

/// Limits and engine settings a scan runs under.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub default_max_symbols: usize,
    pub max_scan_symbols: usize,
    pub concurrency: usize,
    pub min_bars: usize,
    pub thresholds: SignalThresholds,
}

/// One successfully analysed symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub symbol: String,
    pub signal: Signal,
    pub latest_price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub rsi: Option<f64>,
    /// `OVERSOLD`, `OVERBOUGHT` or `NEUTRAL`; absent with no RSI value.
    pub rsi_zone: Option<&'static str>,
    /// Latest ATR as a percentage of the latest close.
    pub atr_pct: Option<f64>,
}

impl ScanResult {
    fn from_analysis(analysis: SymbolAnalysis, thresholds: &SignalThresholds) -> Self {
        let rsi = latest(&analysis.indicators.rsi);
        let rsi_zone = rsi.map(|v| rsi_label(v, thresholds.rsi_oversold, thresholds.rsi_overbought));
        let atr_pct = calculate_atr_pct(analysis.bars.bars(), ATR_PERIOD);
        Self {
            symbol: analysis.symbol,
            signal: analysis.signal,
            latest_price: analysis.quote.price,
            change: analysis.quote.change,
            change_pct: analysis.quote.change_pct,
            high: analysis.quote.high,
            low: analysis.quote.low,
            volume: analysis.quote.volume,
            rsi,
            rsi_zone,
            atr_pct,
        }
    }
}

/// A symbol the scan could not analyse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub range: DateRange,
    pub results: Vec<ScanResult>,
    pub failures: Vec<ScanFailure>,
    pub summary: ScanSummary,
}

// =============================================================================
// Validation
// =============================================================================

/// Validate and normalise the request's symbol list.
///
/// Errors on an empty list, any malformed symbol, or `max_symbols == 0`.
/// Returns deduplicated symbols (first occurrence kept) truncated to
/// `min(max_symbols or default, hard cap)`.
pub fn plan_symbols(request: &ScanRequest, settings: &ScanSettings) -> Result<Vec<String>, AnalysisError> {
    if request.symbols.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "scan needs at least one symbol".to_string(),
        ));
    }
    if request.max_symbols == Some(0) {
        return Err(AnalysisError::InvalidInput(
            "max_symbols must be at least 1".to_string(),
        ));
    }

    let mut symbols: Vec<String> = Vec::with_capacity(request.symbols.len());
    for raw in &request.symbols {
        let symbol = normalize_symbol(raw)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }

    let limit = request
        .max_symbols
        .unwrap_or(settings.default_max_symbols)
        .min(settings.max_scan_symbols)
        .max(1);
    symbols.truncate(limit);
    Ok(symbols)
}

// =============================================================================
// Scan
// =============================================================================

/// Run a scan.  Only request validation can fail; per-symbol problems end up
/// in `ScanReport::failures`.
pub async fn run_scan(
    market_data: &MarketDataService,
    request: &ScanRequest,
    settings: &ScanSettings,
    today: NaiveDate,
) -> Result<ScanReport, AnalysisError> {
    let symbols = plan_symbols(request, settings)?;
    let started_at = Utc::now();
    let concurrency = settings.concurrency.max(1);

    info!(
        symbols = ?symbols,
        range = %request.range,
        concurrency,
        "scan started"
    );

    let outcomes: Vec<(String, Result<SymbolAnalysis, AnalysisError>)> = stream::iter(symbols)
        .map(|symbol| async move {
            let outcome = analyze_symbol(
                market_data,
                &symbol,
                request.range,
                today,
                request.cache_mode,
                &settings.thresholds,
                settings.min_bars,
            )
            .await;
            (symbol, outcome)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (symbol, outcome) in outcomes {
        match outcome {
            Ok(analysis) => results.push(ScanResult::from_analysis(analysis, &settings.thresholds)),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "symbol failed during scan");
                failures.push(ScanFailure {
                    symbol,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    sort_results(&mut results);
    failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let summary = summarise(&results, failures.len());
    let report = ScanReport {
        id: Uuid::new_v4(),
        started_at,
        finished_at: Utc::now(),
        range: request.range,
        results,
        failures,
        summary,
    };

    info!(
        scan_id = %report.id,
        analysed = report.results.len(),
        failed = report.failures.len(),
        buy = report.summary.buy,
        sell = report.summary.sell,
        "scan finished"
    );

    Ok(report)
}

/// Score descending, then symbol ascending.
pub fn sort_results(results: &mut [ScanResult]) {
    results.sort_by(|a, b| {
        b.signal
            .score
            .cmp(&a.signal.score)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

fn summarise(results: &[ScanResult], failed: usize) -> ScanSummary {
    let count = |pred: fn(Classification) -> bool| {
        results
            .iter()
            .filter(|r| pred(r.signal.classification))
            .count()
    };
    ScanSummary {
        buy: count(Classification::is_buy),
        sell: count(Classification::is_sell),
        hold: count(Classification::is_hold),
        failed,
        total: results.len() + failed,
    }
}
