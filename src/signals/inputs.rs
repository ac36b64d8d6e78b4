// =============================================================================
// Signal inputs — the handful of values the vote rules look at
// =============================================================================

use serde::Serialize;

use crate::indicators::snapshot::{latest, previous};
use crate::indicators::IndicatorSnapshot;
use crate::types::PriceSeries;

/// Latest (and where a rule needs it, previous) indicator values.
///
/// `None` means the indicator had not warmed up, or was degenerate, at that
/// bar.  The engine treats it as "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalInputs {
    pub close: Option<f64>,
    pub rsi: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub prev_macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub prev_stoch_k: Option<f64>,
    pub prev_stoch_d: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
}

impl SignalInputs {
    /// Pull the latest readings out of a snapshot computed over `series`.
    pub fn from_snapshot(series: &PriceSeries, snap: &IndicatorSnapshot) -> Self {
        Self {
            close: series.last().map(|b| b.close),
            rsi: latest(&snap.rsi),
            macd_histogram: latest(&snap.macd.histogram),
            prev_macd_histogram: previous(&snap.macd.histogram),
            bb_upper: latest(&snap.bollinger.upper),
            bb_lower: latest(&snap.bollinger.lower),
            stoch_k: latest(&snap.stochastic.k),
            stoch_d: latest(&snap.stochastic.d),
            prev_stoch_k: previous(&snap.stochastic.k),
            prev_stoch_d: previous(&snap.stochastic.d),
            adx: latest(&snap.adx.adx),
            plus_di: latest(&snap.adx.plus_di),
            minus_di: latest(&snap.adx.minus_di),
            sma_20: latest(&snap.sma_20),
            sma_50: latest(&snap.sma_50),
            sma_200: latest(&snap.sma_200),
        }
    }
}
