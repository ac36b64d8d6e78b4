// =============================================================================
// Symbol Analysis — one symbol through both engines
// =============================================================================
//
// Fetch (via the cache-aware MarketDataService), compute the IndicatorSnapshot,
// score the latest readings and summarise the last bar.  The pure half,
// `analyze_series`, takes an already-loaded series so it can be exercised
// without any I/O.
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::AnalysisError;
use crate::indicators::IndicatorSnapshot;
use crate::market_data::{CacheMode, MarketDataService};
use crate::runtime_config::SignalThresholds;
use crate::signals::{evaluate, Signal, SignalInputs};
use crate::types::{DateRange, PriceBar, PriceSeries};

/// Latest-bar summary shown on the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    /// Close minus previous close (0 with a single bar).
    pub change: f64,
    /// `change` as a percentage of the previous close (0 when that is 0).
    pub change_pct: f64,
    pub last_updated: NaiveDate,
}

impl PriceSummary {
    pub fn from_series(series: &PriceSeries) -> Option<Self> {
        let last = series.last()?;
        let (change, change_pct) = match series.previous() {
            Some(prev) => daily_change(prev, last),
            None => (0.0, 0.0),
        };
        Some(Self {
            price: last.close,
            high: last.high,
            low: last.low,
            volume: last.volume,
            change,
            change_pct,
            last_updated: last.date,
        })
    }
}

fn daily_change(prev: &PriceBar, last: &PriceBar) -> (f64, f64) {
    let change = last.close - prev.close;
    let pct = if prev.close == 0.0 {
        0.0
    } else {
        change / prev.close * 100.0
    };
    (change, pct)
}

/// Everything computed for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub range: DateRange,
    pub quote: PriceSummary,
    pub signal: Signal,
    pub bars: PriceSeries,
    pub indicators: IndicatorSnapshot,
    pub analysed_at: DateTime<Utc>,
}

/// Run both engines over an already-loaded series.
///
/// Fails with `InsufficientData` below `min_bars`; shorter indicator warm-ups
/// are not errors and simply leave those indicators undefined.
pub fn analyze_series(
    symbol: &str,
    range: DateRange,
    series: PriceSeries,
    thresholds: &SignalThresholds,
    min_bars: usize,
) -> Result<SymbolAnalysis, AnalysisError> {
    let required = min_bars.max(1);
    if series.len() < required {
        return Err(AnalysisError::InsufficientData {
            symbol: symbol.to_string(),
            found: series.len(),
            required,
        });
    }

    let quote = PriceSummary::from_series(&series).ok_or_else(|| AnalysisError::InsufficientData {
        symbol: symbol.to_string(),
        found: 0,
        required,
    })?;

    let indicators = IndicatorSnapshot::compute(&series);
    let inputs = SignalInputs::from_snapshot(&series, &indicators);
    let signal = evaluate(&inputs, thresholds);

    debug!(
        symbol,
        bars = series.len(),
        score = signal.score,
        classification = %signal.classification,
        "symbol analysed"
    );

    Ok(SymbolAnalysis {
        symbol: symbol.to_string(),
        range,
        quote,
        signal,
        bars: series,
        indicators,
        analysed_at: Utc::now(),
    })
}

/// Fetch `symbol` and analyse it.  `symbol` must already be normalised.
pub async fn analyze_symbol(
    market_data: &MarketDataService,
    symbol: &str,
    range: DateRange,
    today: NaiveDate,
    mode: CacheMode,
    thresholds: &SignalThresholds,
    min_bars: usize,
) -> Result<SymbolAnalysis, AnalysisError> {
    let series = market_data.load_series(symbol, range, today, mode).await?;
    analyze_series(symbol, range, PriceSeries::clone(&series), thresholds, min_bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::vote_score::Vote;

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                PriceBar::new(
                    start + chrono::Duration::days(i as i64),
                    c,
                    c + 0.5,
                    (c - 0.5).max(0.0),
                    c,
                    1_000 * (i as u64 + 1),
                )
                .unwrap()
            })
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let err = analyze_series(
            "HBL",
            DateRange::CurrentMonth,
            series_from_closes(&[10.0; 9]),
            &SignalThresholds::default(),
            10,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                symbol: "HBL".into(),
                found: 9,
                required: 10
            }
        );
    }

    #[test]
    fn quote_tracks_last_two_bars() {
        let mut closes = vec![100.0; 9];
        closes.push(105.0);
        let analysis = analyze_series(
            "OGDC",
            DateRange::CurrentMonth,
            series_from_closes(&closes),
            &SignalThresholds::default(),
            10,
        )
        .unwrap();

        assert_eq!(analysis.quote.price, 105.0);
        assert!((analysis.quote.change - 5.0).abs() < 1e-12);
        assert!((analysis.quote.change_pct - 5.0).abs() < 1e-12);
        assert_eq!(analysis.quote.volume, 10_000);
        assert_eq!(analysis.indicators.rsi.len(), 10);
    }

    #[test]
    fn single_bar_has_zero_change() {
        let series = series_from_closes(&[42.0]);
        let quote = PriceSummary::from_series(&series).unwrap();
        assert_eq!((quote.change, quote.change_pct), (0.0, 0.0));
    }

    #[test]
    fn zero_previous_close_has_zero_pct() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let zero = PriceBar::new(start, 0.0, 0.0, 0.0, 0.0, 0).unwrap();
        let next = PriceBar::new(start.succ_opt().unwrap(), 1.0, 1.0, 1.0, 1.0, 0).unwrap();
        let quote = PriceSummary::from_series(&PriceSeries::new(vec![zero, next]).unwrap()).unwrap();
        assert_eq!(quote.change, 1.0);
        assert_eq!(quote.change_pct, 0.0);
    }

    #[test]
    fn long_downtrend_votes_bearish_on_trend_indicators() {
        let closes: Vec<f64> = (0..260).map(|i| 500.0 - i as f64 * 1.5).collect();
        let analysis = analyze_series(
            "KEL",
            DateRange::CurrentAndPreviousMonth,
            series_from_closes(&closes),
            &SignalThresholds::default(),
            10,
        )
        .unwrap();

        let vote_of = |name: &str| {
            analysis
                .signal
                .factors
                .iter()
                .find(|f| f.indicator == name)
                .map(|f| f.vote)
        };
        assert_eq!(vote_of("ADX"), Some(Vote::Bearish));
        assert_eq!(vote_of("SMA"), Some(Vote::Bearish));
        // Every close is a new low: RSI pins at 0 and reads as oversold.
        assert_eq!(vote_of("RSI"), Some(Vote::Bullish));
        assert_eq!(analysis.signal.votes_cast, 6);
    }
}
