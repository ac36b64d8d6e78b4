// =============================================================================
// IndicatorSnapshot — every indicator for one PriceSeries
// =============================================================================

use serde::Serialize;

use crate::types::PriceSeries;

use super::adx::{calculate_adx, AdxSeries};
use super::atr::calculate_atr;
use super::bollinger::{calculate_bollinger, BollingerBands};
use super::macd::{calculate_macd, MacdSeries};
use super::rsi::calculate_rsi;
use super::sma::calculate_sma;
use super::stochastic::{calculate_stochastic, StochasticSeries};
use super::{
    ADX_PERIOD, ATR_PERIOD, BOLLINGER_PERIOD, BOLLINGER_STD_DEV, MACD_FAST, MACD_SIGNAL, MACD_SLOW,
    RSI_PERIOD, SMA_LONG, SMA_MEDIUM, SMA_SHORT, STOCHASTIC_D_PERIOD, STOCHASTIC_K_PERIOD,
};

/// All indicator series for a PriceSeries, each aligned 1:1 with its bars.
/// Undefined entries serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdSeries,
    pub bollinger: BollingerBands,
    pub atr: Vec<Option<f64>>,
    pub stochastic: StochasticSeries,
    pub adx: AdxSeries,
    pub sma_20: Vec<Option<f64>>,
    pub sma_50: Vec<Option<f64>>,
    pub sma_200: Vec<Option<f64>>,
}

impl IndicatorSnapshot {
    /// Run the full indicator set over `series`.
    pub fn compute(series: &PriceSeries) -> Self {
        let closes = series.closes();
        let bars = series.bars();

        Self {
            rsi: calculate_rsi(&closes, RSI_PERIOD),
            macd: calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL),
            bollinger: calculate_bollinger(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV),
            atr: calculate_atr(bars, ATR_PERIOD),
            stochastic: calculate_stochastic(bars, STOCHASTIC_K_PERIOD, STOCHASTIC_D_PERIOD),
            adx: calculate_adx(bars, ADX_PERIOD),
            sma_20: calculate_sma(&closes, SMA_SHORT),
            sma_50: calculate_sma(&closes, SMA_MEDIUM),
            sma_200: calculate_sma(&closes, SMA_LONG),
        }
    }
}

/// Value at the last index of an aligned series.
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Value at the second-to-last index of an aligned series.
pub fn previous(series: &[Option<f64>]) -> Option<f64> {
    series.len().checked_sub(2).and_then(|i| series[i])
}
