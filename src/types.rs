// =============================================================================
// Shared types used across the PSX scanner
// =============================================================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Longest ticker we accept from a caller.
const MAX_SYMBOL_LEN: usize = 12;

// =============================================================================
// PriceBar
// =============================================================================

/// One trading day of OHLCV data for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Build a bar, rejecting values that break the OHLC invariants.
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, AnalysisError> {
        let bar = Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        };
        bar.validate()?;
        Ok(bar)
    }

    /// Check that prices are finite and non-negative, and that the high/low
    /// bracket both the open and the close.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "bar {} has a negative or non-finite price",
                self.date
            )));
        }
        if self.high < self.low
            || self.high < self.open.max(self.close)
            || self.low > self.open.min(self.close)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "bar {} violates low <= open,close <= high",
                self.date
            )));
        }
        Ok(())
    }
}

// =============================================================================
// PriceSeries
// =============================================================================

/// Daily bars for one symbol, strictly ascending by date with no duplicates.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Strict constructor: every bar must be valid and dates must already be
    /// strictly increasing.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, AnalysisError> {
        for bar in &bars {
            bar.validate()?;
        }
        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(AnalysisError::InvalidInput(format!(
                "series is not strictly increasing at {} -> {}",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { bars })
    }

    /// Normalising constructor used when merging monthly pages: sorts by date
    /// and keeps the first bar seen for any duplicated date.
    pub fn from_unsorted(mut bars: Vec<PriceBar>) -> Result<Self, AnalysisError> {
        // Stable sort keeps arrival order among equal dates.
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Self::new(bars)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// The bar before the latest one, if any.
    pub fn previous(&self) -> Option<&PriceBar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }
}

// =============================================================================
// Date ranges
// =============================================================================

/// A calendar month, the unit the PSX historical endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Which months of history to pull for an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    CurrentMonth,
    #[default]
    CurrentAndPreviousMonth,
}

impl DateRange {
    /// Resolve the range against `today`, oldest month first.
    pub fn months(self, today: NaiveDate) -> Vec<YearMonth> {
        let current = YearMonth::of(today);
        match self {
            Self::CurrentMonth => vec![current],
            Self::CurrentAndPreviousMonth => vec![current.previous(), current],
        }
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CurrentMonth => write!(f, "current_month"),
            Self::CurrentAndPreviousMonth => write!(f, "current_and_previous_month"),
        }
    }
}

// =============================================================================
// Symbols
// =============================================================================

/// Trim and upper-case a ticker, rejecting anything that cannot be a PSX
/// symbol.
pub fn normalize_symbol(raw: &str) -> Result<String, AnalysisError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "symbol must not be empty".to_string(),
        ));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(AnalysisError::InvalidInput(format!(
            "symbol '{symbol}' is longer than {MAX_SYMBOL_LEN} characters"
        )));
    }
    let mut chars = symbol.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(AnalysisError::InvalidInput(format!(
            "symbol '{symbol}' contains invalid characters"
        )));
    }
    Ok(symbol)
}
