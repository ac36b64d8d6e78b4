// =============================================================================
// Stochastic Oscillator (%K, %D)
// =============================================================================
//
//   %K = 100 * (close - lowest low over k) / (highest high over k - lowest low over k)
//   %D = SMA(d) of %K
//
// A window whose highest high equals its lowest low has no range to measure
// against; %K is undefined there instead of a division by zero.
// =============================================================================

use serde::Serialize;

use crate::types::PriceBar;

use super::sma::sma_of_series;

/// Aligned %K / %D output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> StochasticSeries {
    let n = bars.len();
    let mut k = vec![None; n];

    if k_period > 0 && n >= k_period {
        for (i, window) in bars.windows(k_period).enumerate() {
            let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            let range = highest - lowest;
            if range == 0.0 || !range.is_finite() {
                continue;
            }

            let close = window[window.len() - 1].close;
            let value = 100.0 * (close - lowest) / range;
            if value.is_finite() {
                k[i + k_period - 1] = Some(value);
            }
        }
    }

    let d = sma_of_series(&k, d_period);
    StochasticSeries { k, d }
}
