// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period` closes.
// =============================================================================

use super::place;

/// Compute the EMA series for `closes`, aligned with the input.
///
/// The first defined entry sits at index `period - 1` (the SMA seed).
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() < period` => all `None`
/// - A non-finite intermediate value ends the series; later entries stay `None`.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }
    place(closes.len(), period - 1, ema_run(closes, period))
}

/// EMA over a series whose leading entries may be undefined (e.g. the MACD
/// line).  The computation starts at the first defined value and runs over the
/// contiguous defined stretch that follows.
pub fn ema_of_series(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let Some(start) = values.iter().position(Option::is_some) else {
        return vec![None; values.len()];
    };
    if period == 0 {
        return vec![None; values.len()];
    }

    let run: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    place(values.len(), start + period - 1, ema_run(&run, period))
}

/// Compact EMA: one value per input starting at index `period - 1`.
fn ema_run(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let sma: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &close in &closes[period..] {
        let ema = close * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            // Downstream consumers should not trust a broken series.
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}
