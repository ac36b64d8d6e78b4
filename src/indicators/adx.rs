// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. Compute +DM (positive directional movement) and -DM per bar.
//   2. Compute True Range (TR) per bar.
//   3. Apply Wilder's smoothing (period) to +DM, -DM, and TR.
//   4. Derive +DI = smoothed(+DM) / smoothed(TR) * 100
//            -DI = smoothed(-DM) / smoothed(TR) * 100
//   5. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   6. ADX = Wilder's smoothed average of DX over `period` bars.
//
// With period 14 the DI lines are defined from index 14 and ADX from index
// 27, i.e. 28 bars are needed for the first ADX value.
//
// Interpretation:
//   ADX > 25  => trending market
//   ADX < 20  => ranging / choppy market
// =============================================================================

use serde::Serialize;

use crate::types::PriceBar;

use super::wilder_average;

/// Aligned ADX output together with the directional indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdxSeries {
    pub adx: Vec<Option<f64>>,
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
}

/// Compute ADX, +DI and -DI for `bars`.
///
/// All three series are `None` when `period` is zero or there are fewer than
/// `period + 1` bars.  ADX itself needs `2 * period` bars.
pub fn calculate_adx(bars: &[PriceBar], period: usize) -> AdxSeries {
    let n = bars.len();
    let mut out = AdxSeries {
        adx: vec![None; n],
        plus_di: vec![None; n],
        minus_di: vec![None; n],
    };
    if period == 0 || n < period + 1 {
        return out;
    }

    let period_f = period as f64;

    // ------------------------------------------------------------------
    // Step 1 & 2: Raw +DM, -DM, and True Range for each consecutive pair
    // ------------------------------------------------------------------
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    let mut tr_vals = Vec::with_capacity(n - 1);

    for pair in bars.windows(2) {
        let (prev, bar) = (&pair[0], &pair[1]);

        // True Range
        let tr = (bar.high - bar.low)
            .max((bar.high - prev.close).abs())
            .max((bar.low - prev.close).abs());

        // Directional Movement
        let up_move = bar.high - prev.high;
        let down_move = prev.low - bar.low;

        let pdm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let mdm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        plus_dm.push(pdm);
        minus_dm.push(mdm);
        tr_vals.push(tr);
    }

    // ------------------------------------------------------------------
    // Step 3: Wilder's running sums, seeded with the first `period` values
    // ------------------------------------------------------------------
    let mut smooth_plus_dm: f64 = plus_dm[..period].iter().sum();
    let mut smooth_minus_dm: f64 = minus_dm[..period].iter().sum();
    let mut smooth_tr: f64 = tr_vals[..period].iter().sum();

    let mut dx = vec![None; n];

    // Transition `t` ends at bar `t + 1`.
    for t in (period - 1)..tr_vals.len() {
        if t >= period {
            smooth_plus_dm = smooth_plus_dm - smooth_plus_dm / period_f + plus_dm[t];
            smooth_minus_dm = smooth_minus_dm - smooth_minus_dm / period_f + minus_dm[t];
            smooth_tr = smooth_tr - smooth_tr / period_f + tr_vals[t];
        }

        let idx = t + 1;
        if let Some((pdi, mdi, dx_val)) = directional(smooth_plus_dm, smooth_minus_dm, smooth_tr) {
            out.plus_di[idx] = Some(pdi);
            out.minus_di[idx] = Some(mdi);
            dx[idx] = Some(dx_val);
        }
    }

    // ------------------------------------------------------------------
    // Step 6: ADX = Wilder's smoothed average of DX
    // ------------------------------------------------------------------
    out.adx = wilder_average(&dx, period);
    out
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Compute (+DI, -DI, DX) from smoothed +DM, -DM, and TR values.
///
/// Returns `None` if the smoothed TR is zero or any result is non-finite.
fn directional(smooth_plus_dm: f64, smooth_minus_dm: f64, smooth_tr: f64) -> Option<(f64, f64, f64)> {
    if smooth_tr == 0.0 {
        return None;
    }

    let plus_di = (smooth_plus_dm / smooth_tr) * 100.0;
    let minus_di = (smooth_minus_dm / smooth_tr) * 100.0;

    let di_sum = plus_di + minus_di;
    let dx = if di_sum == 0.0 {
        // Both +DI and -DI are zero: no directional movement.
        0.0
    } else {
        ((plus_di - minus_di).abs() / di_sum) * 100.0
    };

    if plus_di.is_finite() && minus_di.is_finite() && dx.is_finite() {
        Some((plus_di, minus_di, dx))
    } else {
        None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Build a bar for testing.  Volume is irrelevant for ADX.
    fn bar(day: usize, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(day as i64);
        PriceBar {
            date,
            open,
            high,
            low,
            close,
            volume: 1,
        }
    }

    fn trending(count: usize) -> Vec<PriceBar> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                bar(i, base, base + 1.5, base - 0.5, base + 1.0)
            })
            .collect()
    }

    fn latest(series: &[Option<f64>]) -> Option<f64> {
        series.last().copied().flatten()
    }

    #[test]
    fn adx_period_zero() {
        let bars = trending(50);
        assert!(calculate_adx(&bars, 0).adx.iter().all(Option::is_none));
    }

    #[test]
    fn adx_insufficient_data() {
        let out = calculate_adx(&trending(10), 14);
        assert_eq!(out.adx.len(), 10);
        assert!(out.adx.iter().all(Option::is_none));
        assert!(out.plus_di.iter().all(Option::is_none));
    }

    #[test]
    fn adx_needs_twenty_eight_bars() {
        let out = calculate_adx(&trending(27), 14);
        assert!(out.adx.iter().all(Option::is_none));
        assert_eq!(out.plus_di.iter().position(Option::is_some), Some(14));

        let out = calculate_adx(&trending(28), 14);
        assert_eq!(out.adx.iter().position(Option::is_some), Some(27));
    }

    #[test]
    fn adx_strong_uptrend() {
        // Consecutive higher highs and higher lows, a strong trend.
        let out = calculate_adx(&trending(60), 14);
        let value = latest(&out.adx).unwrap();
        assert!(value > 25.0, "expected ADX > 25 for strong trend, got {value}");
        assert!(latest(&out.plus_di).unwrap() > latest(&out.minus_di).unwrap());
    }

    #[test]
    fn adx_flat_market() {
        // Identical bars, no directional movement.
        let bars: Vec<PriceBar> = (0..60).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect();
        let value = latest(&calculate_adx(&bars, 14).adx).unwrap();
        // DX = 0 for every bar => ADX converges to 0.
        assert!(value < 1.0, "expected ADX near 0 for flat market, got {value}");
    }

    #[test]
    fn adx_result_range() {
        // ADX should always be in [0, 100].
        let bars: Vec<PriceBar> = (0..100)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.3).sin() * 10.0;
                bar(i, base - 0.5, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        for value in calculate_adx(&bars, 14).adx.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "ADX {value} out of [0,100] range");
        }
    }

    #[test]
    fn zero_range_bars_leave_di_undefined() {
        let bars: Vec<PriceBar> = (0..20).map(|i| bar(i, 10.0, 10.0, 10.0, 10.0)).collect();
        let out = calculate_adx(&bars, 5);
        assert!(out.plus_di.iter().all(Option::is_none));
        assert!(out.adx.iter().all(Option::is_none));
    }
}
