// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// ATR measures market volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Default period: 14
// =============================================================================

use crate::types::PriceBar;

use super::wilder_average;

/// True Range per bar, aligned with `bars`.  Index 0 has no previous close
/// and is always `None`.
pub fn true_range(bars: &[PriceBar]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(bars.len());
    if bars.is_empty() {
        return out;
    }
    out.push(None);

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);
        let hl = bar.high - bar.low;
        let hc = (bar.high - prev.close).abs();
        let lc = (bar.low - prev.close).abs();
        let tr = hl.max(hc).max(lc);
        out.push(Some(tr).filter(|v| v.is_finite()));
    }

    out
}

/// ATR series for `bars`, aligned with the input.
///
/// The first defined value sits at index `period` (the mean of the True
/// Ranges at indices `1..=period`), so `period + 1` bars are required.
pub fn calculate_atr(bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
    if period == 0 || bars.len() < period + 1 {
        return vec![None; bars.len()];
    }
    wilder_average(&true_range(bars), period)
}

/// Calculate the latest ATR as a percentage of the latest close.
///
/// Useful for comparing volatility across symbols with different price scales.
pub fn calculate_atr_pct(bars: &[PriceBar], period: usize) -> Option<f64> {
    let atr = calculate_atr(bars, period).last().copied().flatten()?;
    let last_close = bars.last()?.close;
    if last_close == 0.0 {
        return None;
    }
    Some((atr / last_close) * 100.0)
}
