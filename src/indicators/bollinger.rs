// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the population standard deviation
// of the closes in the same window.  The Band Width (BBW) is the normalised
// distance: BBW = (upper - lower) / middle * 100.

use serde::Serialize;

/// Result of a single-window Bollinger Band calculation.
#[derive(Debug, Clone)]
pub struct BollingerResult {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: Option<f64>,
}

/// Aligned Bollinger output.  `width` is `None` wherever the middle band is
/// zero, even if the bands themselves are defined.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub width: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands over every `period` window of `closes`.
///
/// Entries before index `period - 1` are `None` in all four series.
pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let n = closes.len();
    let mut bands = BollingerBands {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
        width: vec![None; n],
    };
    if period == 0 || n < period {
        return bands;
    }

    for (i, window) in closes.windows(period).enumerate() {
        let Some(bb) = bollinger_window(window, num_std) else {
            continue;
        };
        let idx = i + period - 1;
        bands.upper[idx] = Some(bb.upper);
        bands.middle[idx] = Some(bb.middle);
        bands.lower[idx] = Some(bb.lower);
        bands.width[idx] = bb.width;
    }

    bands
}

/// Bands for one window of closes (the window length is the period).
///
/// Returns `None` when the window is empty or any band is non-finite.
pub fn bollinger_window(window: &[f64], num_std: f64) -> Option<BollingerResult> {
    if window.is_empty() {
        return None;
    }

    let period = window.len() as f64;
    let middle = window.iter().sum::<f64>() / period;
    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;

    if !(upper.is_finite() && middle.is_finite() && lower.is_finite()) {
        return None;
    }

    let width = if middle == 0.0 {
        None
    } else {
        Some((upper - lower) / middle * 100.0).filter(|w| w.is_finite())
    };

    Some(BollingerResult {
        upper,
        middle,
        lower,
        width,
    })
}
