// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// dashboard.  Every series function returns a `Vec<Option<f64>>` aligned 1:1
// with its input: an entry is `None` until the indicator's warm-up window is
// satisfied, or where the value is degenerate (e.g. a zero-width stochastic
// range).  Nothing here ever substitutes zero or NaN for "not enough data".

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod snapshot;
pub mod stochastic;

pub use snapshot::IndicatorSnapshot;

// Standard periods used by the engine.
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const ATR_PERIOD: usize = 14;
pub const STOCHASTIC_K_PERIOD: usize = 14;
pub const STOCHASTIC_D_PERIOD: usize = 3;
pub const ADX_PERIOD: usize = 14;
pub const SMA_SHORT: usize = 20;
pub const SMA_MEDIUM: usize = 50;
pub const SMA_LONG: usize = 200;

// =============================================================================
// Shared helpers
// =============================================================================

/// Lay a compact run of values into an aligned series of length `len`,
/// starting at `offset`.  Non-finite values end the run.
pub(crate) fn place(len: usize, offset: usize, values: impl IntoIterator<Item = f64>) -> Vec<Option<f64>> {
    let mut out = vec![None; len];
    for (slot, v) in out.iter_mut().skip(offset).zip(values) {
        if !v.is_finite() {
            break;
        }
        *slot = Some(v);
    }
    out
}

/// Wilder's smoothing over a partially-defined input.
///
/// The average is seeded with the simple mean of the first `period`
/// consecutive defined values, then follows
///   avg_t = (avg_{t-1} * (period - 1) + x_t) / period
///
/// An undefined or non-finite input makes that entry undefined and restarts
/// the seeding.
pub(crate) fn wilder_average(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let period_f = period as f64;
    let mut seed_sum = 0.0;
    let mut seed_count = 0usize;
    let mut prev: Option<f64> = None;

    for (i, value) in values.iter().copied().enumerate() {
        let Some(x) = value.filter(|x| x.is_finite()) else {
            prev = None;
            seed_sum = 0.0;
            seed_count = 0;
            continue;
        };

        match prev {
            Some(avg) => {
                let next = (avg * (period_f - 1.0) + x) / period_f;
                if next.is_finite() {
                    out[i] = Some(next);
                    prev = Some(next);
                } else {
                    prev = None;
                }
            }
            None => {
                seed_sum += x;
                seed_count += 1;
                if seed_count == period {
                    let seed = seed_sum / period_f;
                    if seed.is_finite() {
                        out[i] = Some(seed);
                        prev = Some(seed);
                    }
                    seed_sum = 0.0;
                    seed_count = 0;
                }
            }
        }
    }

    out
}
