// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD line   = EMA(fast) - EMA(slow)
//   Signal line = EMA(signal) of the MACD line
//   Histogram   = MACD line - Signal line
//
// With the standard 12/26/9 settings the MACD line is defined from index 25
// and the signal line / histogram from index 33.
// =============================================================================

use serde::Serialize;

use super::ema::{calculate_ema, ema_of_series};

/// Aligned MACD output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute MACD line, signal line and histogram for `closes`.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = calculate_ema(closes, fast);
    let slow_ema = calculate_ema(closes, slow);

    let macd = difference(&fast_ema, &slow_ema);
    let signal_line = ema_of_series(&macd, signal);
    let histogram = difference(&macd, &signal_line);

    MacdSeries {
        macd,
        signal: signal_line,
        histogram,
    }
}

fn difference(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(x - y),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_defined(series: &[Option<f64>]) -> Option<usize> {
        series.iter().position(Option::is_some)
    }

    #[test]
    fn warm_up_offsets() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
        let macd = calculate_macd(&closes, 12, 26, 9);
        assert_eq!(first_defined(&macd.macd), Some(25));
        assert_eq!(first_defined(&macd.signal), Some(33));
        assert_eq!(first_defined(&macd.histogram), Some(33));
        assert_eq!(macd.histogram.len(), 60);
    }

    #[test]
    fn short_series_has_no_histogram() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let macd = calculate_macd(&closes, 12, 26, 9);
        assert!(macd.macd[25..].iter().all(Option::is_some));
        assert!(macd.histogram.iter().all(Option::is_none));
    }

    #[test]
    fn uptrend_has_positive_macd_line() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let macd = calculate_macd(&closes, 12, 26, 9);
        assert!(macd.macd.last().unwrap().unwrap() > 0.0);
    }

    #[test]
    fn histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 50.0 + (i as f64 * 0.3).sin() * 5.0)
            .collect();
        let macd = calculate_macd(&closes, 12, 26, 9);
        for i in 33..80 {
            let expected = macd.macd[i].unwrap() - macd.signal[i].unwrap();
            assert!((macd.histogram[i].unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn flat_series_is_zero() {
        let macd = calculate_macd(&[42.0; 40], 12, 26, 9);
        assert!(macd.histogram.last().unwrap().unwrap().abs() < 1e-12);
    }
}
