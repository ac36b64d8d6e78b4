// =============================================================================
// Runtime Configuration — scanner settings with atomic save
// =============================================================================
//
// Central configuration hub for the PSX scanner.  Signal thresholds, scan
// limits, cache TTL and the upstream endpoint all live here so they can be
// adjusted through the API without a restart.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{normalize_symbol, DateRange};

/// Symbols the PSX historical endpoint is known to serve.
const PSX_SYMBOLS: &[&str] = &[
    "MEBL", "HBL", "UBL", "BAHL", "ENGRO", "LUCK", "PSO", "FFC", "OGDC", "PPL",
    "EFERT", "SNGP", "GATM", "HUBC", "KAPCO", "SYS", "TRG", "FABL", "NBP", "MCB",
    "AVN", "SEARL", "ATRL", "PAEL", "EPCL", "DGKC", "FCCL", "KOHC", "CHCC", "MLCF",
    "PIOC", "POWER", "AGP", "THALL", "INIL", "MUREB", "FCEPL", "FATIMA", "UNITY",
    "HTL", "APL", "MDTL", "BIPL", "KEL", "JDWS", "ISL", "HINOON", "SRVI", "LOTCHEM",
    "AIRLINK", "TPL", "PRL", "HUMNL", "MFL", "PAKT", "SML", "KTML", "DCR", "PSEL",
    "RPL", "NETSOL", "PKGS", "EFUG", "EFUHL", "EFU", "POL", "ATLH", "GHNI", "AVP",
    "PGLC", "CNERGY", "GSKCH", "WYETH", "ILP", "GADT", "GSK", "TSML", "NCPL", "GATI",
    "MUGHAL", "TPLP", "UGDC", "EFOODS", "AICL", "IGIHL", "PSX", "NRL", "GLAXO",
    "GTL", "ICIBL", "MEHT", "RMPL", "JLICL", "SHEL", "DAWH",
];

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_psx_base_url() -> String {
    "https://dps.psx.com.pk".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_symbols() -> Vec<String> {
    PSX_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_scan_symbols() -> Vec<String> {
    ["OGDC", "HBL", "UBL", "MEBL", "ENGRO"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_symbols() -> usize {
    10
}

fn default_max_scan_symbols() -> usize {
    20
}

fn default_scan_concurrency() -> usize {
    4
}

fn default_min_bars() -> usize {
    10
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_rsi_overbought() -> f64 {
    70.0
}

fn default_adx_trend() -> f64 {
    25.0
}

fn default_stoch_oversold() -> f64 {
    20.0
}

fn default_stoch_overbought() -> f64 {
    80.0
}

fn default_strong_buy_score() -> i32 {
    4
}

fn default_buy_score() -> i32 {
    2
}

fn default_sell_score() -> i32 {
    -2
}

fn default_strong_sell_score() -> i32 {
    -4
}

// =============================================================================
// SignalThresholds
// =============================================================================

/// Numeric cut-offs used by the signal engine's vote rules and score bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    /// RSI below this votes bullish.
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,

    /// RSI above this votes bearish.
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,

    /// ADX above this counts as a trending market.
    #[serde(default = "default_adx_trend")]
    pub adx_trend: f64,

    /// A bullish %K/%D cross only counts below this %K.
    #[serde(default = "default_stoch_oversold")]
    pub stoch_oversold: f64,

    /// A bearish %K/%D cross only counts above this %K.
    #[serde(default = "default_stoch_overbought")]
    pub stoch_overbought: f64,

    #[serde(default = "default_strong_buy_score")]
    pub strong_buy_score: i32,

    #[serde(default = "default_buy_score")]
    pub buy_score: i32,

    #[serde(default = "default_sell_score")]
    pub sell_score: i32,

    #[serde(default = "default_strong_sell_score")]
    pub strong_sell_score: i32,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            adx_trend: default_adx_trend(),
            stoch_oversold: default_stoch_oversold(),
            stoch_overbought: default_stoch_overbought(),
            strong_buy_score: default_strong_buy_score(),
            buy_score: default_buy_score(),
            sell_score: default_sell_score(),
            strong_sell_score: default_strong_sell_score(),
        }
    }
}

impl SignalThresholds {
    /// Reject threshold sets whose bands overlap or are not finite.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let levels = [
            self.rsi_oversold,
            self.rsi_overbought,
            self.adx_trend,
            self.stoch_oversold,
            self.stoch_overbought,
        ];
        if levels.iter().any(|v| !v.is_finite() || !(0.0..=100.0).contains(v)) {
            return Err("indicator thresholds must be within [0, 100]".to_string());
        }
        if self.rsi_oversold >= self.rsi_overbought {
            return Err("rsi_oversold must be below rsi_overbought".to_string());
        }
        if self.stoch_oversold >= self.stoch_overbought {
            return Err("stoch_oversold must be below stoch_overbought".to_string());
        }
        if !(self.strong_buy_score > self.buy_score
            && self.buy_score > self.sell_score
            && self.sell_score > self.strong_sell_score)
        {
            return Err(
                "score bands must satisfy strong_buy > buy > sell > strong_sell".to_string(),
            );
        }
        Ok(())
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the scanner.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Server & upstream --------------------------------------------------

    /// Address the REST API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the PSX data portal (the `/historical` path is appended).
    #[serde(default = "default_psx_base_url")]
    pub psx_base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Series cache TTL in seconds.  Zero disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    // --- Symbols & limits ---------------------------------------------------

    /// Symbol universe offered to the dashboard.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Symbols scanned when a scan request names none.
    #[serde(default = "default_scan_symbols")]
    pub default_scan_symbols: Vec<String>,

    /// Symbols scanned when a request gives no `max_symbols`.
    #[serde(default = "default_max_symbols")]
    pub default_max_symbols: usize,

    /// Hard cap on symbols per scan, whatever the request asks for.
    #[serde(default = "default_max_scan_symbols")]
    pub max_scan_symbols: usize,

    /// Symbols fetched and analysed at the same time during a scan.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Fewest bars a symbol needs before it is analysed at all.
    #[serde(default = "default_min_bars")]
    pub min_bars: usize,

    #[serde(default)]
    pub default_range: DateRange,

    // --- Signal engine ------------------------------------------------------

    #[serde(default)]
    pub thresholds: SignalThresholds,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            psx_base_url: default_psx_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            symbols: default_symbols(),
            default_scan_symbols: default_scan_symbols(),
            default_max_symbols: default_max_symbols(),
            max_scan_symbols: default_max_scan_symbols(),
            scan_concurrency: default_scan_concurrency(),
            min_bars: default_min_bars(),
            default_range: DateRange::default(),
            thresholds: SignalThresholds::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        config
            .thresholds
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid thresholds in {}: {msg}", path.display()))?;
        if config.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs in {} must be at least 1", path.display());
        }

        info!(
            path = %path.display(),
            symbols = config.symbols.len(),
            default_scan = ?config.default_scan_symbols,
            cache_ttl_secs = config.cache_ttl_secs,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        // Atomic write: write to a temporary sibling file, then rename.
        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `PSX_BIND_ADDR`, `PSX_BASE_URL` and `PSX_SCAN_SYMBOLS` from the
    /// environment.  Malformed scan symbols are dropped with a warning.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("PSX_BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            info!(bind_addr = %addr, "bind address overridden from env");
            self.bind_addr = addr.trim().to_string();
        }

        if let Some(url) = lookup("PSX_BASE_URL").filter(|v| !v.trim().is_empty()) {
            info!(psx_base_url = %url, "PSX base URL overridden from env");
            self.psx_base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup("PSX_SCAN_SYMBOLS") {
            let mut symbols = Vec::new();
            for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
                match normalize_symbol(part) {
                    Ok(sym) => symbols.push(sym),
                    Err(e) => warn!(symbol = part, error = %e, "ignoring PSX_SCAN_SYMBOLS entry"),
                }
            }
            if symbols.is_empty() {
                warn!("PSX_SCAN_SYMBOLS set but contains no usable symbols; keeping config list");
            } else {
                info!(symbols = ?symbols, "default scan symbols overridden from env");
                self.default_scan_symbols = symbols;
            }
        }
    }
}
