// =============================================================================
// Central Application State — PSX Scanner
// =============================================================================
//
// Ties the runtime configuration, the cache-aware market data service, the
// last scan report and the error log together for the REST API.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared values.
//   - The series cache manages its own interior mutability.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::{MarketDataService, PriceSource, SeriesCache};
use crate::runtime_config::RuntimeConfig;
use crate::scanner::{ScanReport, ScanSettings};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable error kind (e.g. `data_unavailable`).
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// Central application state shared across request handlers via
/// `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter.  Incremented on every
    /// meaningful state mutation (config change, scan, error).
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    /// Where threshold updates are persisted.  `None` keeps them in memory.
    pub config_path: Option<PathBuf>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub market_data: MarketDataService,

    // ── Scans ───────────────────────────────────────────────────────────
    pub last_scan: RwLock<Option<ScanReport>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration and
    /// price source.  The returned value is typically wrapped in `Arc`
    /// immediately.
    pub fn new(config: RuntimeConfig, source: Arc<dyn PriceSource>, config_path: Option<PathBuf>) -> Self {
        let cache = match config.cache_ttl_secs {
            0 => SeriesCache::disabled(),
            secs => SeriesCache::new(Duration::from_secs(secs)),
        };

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            config_path,
            market_data: MarketDataService::new(source, cache),
            last_scan: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, msg: String) {
        self.push_error_with_code(msg, None);
    }

    /// Record an error with an optional machine-readable code.
    pub fn push_error_with_code(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
        drop(errors);

        self.increment_version();
    }

    // ── Scans ───────────────────────────────────────────────────────────

    /// Settings for a scan, taken from the current config.
    pub fn scan_settings(&self) -> ScanSettings {
        let config = self.runtime_config.read();
        ScanSettings {
            default_max_symbols: config.default_max_symbols,
            max_scan_symbols: config.max_scan_symbols,
            concurrency: config.scan_concurrency,
            min_bars: config.min_bars,
            thresholds: config.thresholds.clone(),
        }
    }

    pub fn record_scan(&self, report: ScanReport) {
        *self.last_scan.write() = Some(report);
        self.increment_version();
    }

    // ── Misc ────────────────────────────────────────────────────────────

    /// The calendar day date ranges are resolved against.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::types::{PriceBar, YearMonth};
    use async_trait::async_trait;

    struct EmptySource;

    #[async_trait]
    impl PriceSource for EmptySource {
        async fn fetch_month(&self, _symbol: &str, _month: YearMonth) -> Result<Vec<PriceBar>, AnalysisError> {
            Ok(Vec::new())
        }
    }

    fn state() -> AppState {
        AppState::new(RuntimeConfig::default(), Arc::new(EmptySource), None)
    }

    #[test]
    fn error_ring_is_capped() {
        let state = state();
        for i in 0..(MAX_RECENT_ERRORS + 7) {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "error 7");
    }

    #[test]
    fn mutations_bump_version() {
        let state = state();
        let before = state.current_state_version();
        state.push_error_with_code("boom".into(), Some("data_unavailable".into()));
        assert_eq!(state.current_state_version(), before + 1);
    }

    #[test]
    fn cache_ttl_follows_config() {
        let config = RuntimeConfig {
            cache_ttl_secs: 0,
            ..RuntimeConfig::default()
        };
        let state = AppState::new(config, Arc::new(EmptySource), None);
        assert!(!state.market_data.cache().is_enabled());
    }

    #[test]
    fn scan_settings_mirror_config() {
        let state = state();
        state.runtime_config.write().scan_concurrency = 2;
        let settings = state.scan_settings();
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.max_scan_symbols, 20);
    }
}
