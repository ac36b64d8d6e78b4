// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the trailing `period` values:
//   SMA_t = (x_{t-period+1} + ... + x_t) / period
//
// Used directly for the 20/50/200-day trend stack, as the Bollinger middle
// band, and to smooth Stochastic %K into %D.
// =============================================================================

use super::place;

/// SMA of `closes`, aligned with the input.
///
/// Entries before index `period - 1` are `None`.  A zero period or an input
/// shorter than `period` yields an all-`None` series.
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || closes.len() < period {
        return vec![None; closes.len()];
    }

    let period_f = period as f64;
    let means = closes
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period_f);

    place(closes.len(), period - 1, means)
}

/// SMA over a partially-defined series.  A window containing any `None`
/// produces `None`.
pub fn sma_of_series(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let period_f = period as f64;
    for (i, window) in values.windows(period).enumerate() {
        let sum: Option<f64> = window.iter().copied().sum();
        out[i + period - 1] = sum.map(|s| s / period_f).filter(|m| m.is_finite());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_known_values() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sma = calculate_sma(&closes, 3);
        assert_eq!(sma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn sma_short_series_all_undefined() {
        let closes: Vec<f64> = (1..=199).map(|x| x as f64).collect();
        let sma = calculate_sma(&closes, 200);
        assert_eq!(sma.len(), 199);
        assert!(sma.iter().all(Option::is_none));
    }

    #[test]
    fn sma_period_zero() {
        assert!(calculate_sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn sma_undefined_exactly_until_window_fills() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let sma = calculate_sma(&closes, 20);
        for (i, v) in sma.iter().enumerate() {
            assert_eq!(v.is_some(), i >= 19, "index {i}");
        }
    }

    #[test]
    fn sma_of_series_skips_gaps() {
        let values = [None, Some(3.0), Some(6.0), Some(9.0)];
        let out = sma_of_series(&values, 2);
        assert_eq!(out, vec![None, None, Some(4.5), Some(7.5)]);
    }
}
