// =============================================================================
// Vote Scorer — one vote per indicator, summed and banded
// =============================================================================
//
// Each indicator casts +1 (bullish), -1 (bearish) or 0 (neutral) from its
// latest reading.  An indicator without the values its rule needs casts
// nothing and is left out of the factor list entirely.
//
//   score >= strong_buy_score               => STRONG_BUY
//   buy_score <= score < strong_buy_score   => BUY
//   sell_score < score < buy_score          => HOLD
//   strong_sell_score < score <= sell_score => SELL
//   score <= strong_sell_score              => STRONG_SELL
// =============================================================================

use serde::{Serialize, Serializer};

use crate::runtime_config::SignalThresholds;

use super::inputs::SignalInputs;

/// Direction of a single indicator's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Bearish,
    Neutral,
    Bullish,
}

impl Vote {
    pub fn value(self) -> i32 {
        match self {
            Self::Bearish => -1,
            Self::Neutral => 0,
            Self::Bullish => 1,
        }
    }
}

impl Serialize for Vote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value() as i8)
    }
}

/// Final call for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Classification {
    pub fn from_score(score: i32, t: &SignalThresholds) -> Self {
        if score >= t.strong_buy_score {
            Self::StrongBuy
        } else if score >= t.buy_score {
            Self::Buy
        } else if score <= t.strong_sell_score {
            Self::StrongSell
        } else if score <= t.sell_score {
            Self::Sell
        } else {
            Self::Hold
        }
    }

    pub fn is_buy(self) -> bool {
        matches!(self, Self::StrongBuy | Self::Buy)
    }

    pub fn is_sell(self) -> bool {
        matches!(self, Self::StrongSell | Self::Sell)
    }

    pub fn is_hold(self) -> bool {
        self == Self::Hold
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
            Self::StrongSell => "STRONG_SELL",
        };
        f.write_str(s)
    }
}

/// One indicator's vote and the reading behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Factor {
    pub indicator: &'static str,
    pub vote: Vote,
    pub reason: String,
}

/// Output of the signal engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub classification: Classification,
    pub score: i32,
    pub factors: Vec<Factor>,
    /// Indicators that had enough data to vote (including neutral votes).
    pub votes_cast: usize,
}

/// Score `inputs` against `thresholds`.  Pure: identical inputs always give
/// an identical Signal.
pub fn evaluate(inputs: &SignalInputs, thresholds: &SignalThresholds) -> Signal {
    let factors: Vec<Factor> = [
        rsi_vote(inputs, thresholds),
        macd_vote(inputs),
        bollinger_vote(inputs),
        stochastic_vote(inputs, thresholds),
        adx_vote(inputs, thresholds),
        sma_vote(inputs),
    ]
    .into_iter()
    .flatten()
    .collect();

    let score = factors.iter().map(|f| f.vote.value()).sum();

    Signal {
        classification: Classification::from_score(score, thresholds),
        score,
        votes_cast: factors.len(),
        factors,
    }
}

// =============================================================================
// Per-indicator rules
// =============================================================================

fn rsi_vote(i: &SignalInputs, t: &SignalThresholds) -> Option<Factor> {
    let rsi = i.rsi?;
    let (vote, reason) = if rsi < t.rsi_oversold {
        (Vote::Bullish, format!("RSI {rsi:.2} below {:.0} (oversold)", t.rsi_oversold))
    } else if rsi > t.rsi_overbought {
        (Vote::Bearish, format!("RSI {rsi:.2} above {:.0} (overbought)", t.rsi_overbought))
    } else {
        (Vote::Neutral, format!("RSI {rsi:.2} neutral"))
    };
    Some(Factor {
        indicator: "RSI",
        vote,
        reason,
    })
}

fn macd_vote(i: &SignalInputs) -> Option<Factor> {
    let hist = i.macd_histogram?;
    let prev = i.prev_macd_histogram?;
    let (vote, reason) = if hist > 0.0 && hist > prev {
        (Vote::Bullish, format!("MACD histogram {hist:.4} positive and rising"))
    } else if hist < 0.0 && hist < prev {
        (Vote::Bearish, format!("MACD histogram {hist:.4} negative and falling"))
    } else {
        (Vote::Neutral, format!("MACD histogram {hist:.4} without momentum"))
    };
    Some(Factor {
        indicator: "MACD",
        vote,
        reason,
    })
}

fn bollinger_vote(i: &SignalInputs) -> Option<Factor> {
    let close = i.close?;
    let upper = i.bb_upper?;
    let lower = i.bb_lower?;
    let (vote, reason) = if upper <= lower {
        (Vote::Neutral, "Bollinger bands have zero width".to_string())
    } else if close <= lower {
        (Vote::Bullish, format!("close {close:.2} at or below lower band {lower:.2}"))
    } else if close >= upper {
        (Vote::Bearish, format!("close {close:.2} at or above upper band {upper:.2}"))
    } else {
        (Vote::Neutral, format!("close {close:.2} inside bands"))
    };
    Some(Factor {
        indicator: "Bollinger",
        vote,
        reason,
    })
}

fn stochastic_vote(i: &SignalInputs, t: &SignalThresholds) -> Option<Factor> {
    let k = i.stoch_k?;
    let d = i.stoch_d?;
    let prev_k = i.prev_stoch_k?;
    let prev_d = i.prev_stoch_d?;

    let crossed_up = prev_k <= prev_d && k > d;
    let crossed_down = prev_k >= prev_d && k < d;

    let (vote, reason) = if crossed_up && k < t.stoch_oversold {
        (Vote::Bullish, format!("%K {k:.2} crossed above %D {d:.2} in oversold zone"))
    } else if crossed_down && k > t.stoch_overbought {
        (Vote::Bearish, format!("%K {k:.2} crossed below %D {d:.2} in overbought zone"))
    } else {
        (Vote::Neutral, format!("%K {k:.2} / %D {d:.2} no qualifying cross"))
    };
    Some(Factor {
        indicator: "Stochastic",
        vote,
        reason,
    })
}

fn adx_vote(i: &SignalInputs, t: &SignalThresholds) -> Option<Factor> {
    let adx = i.adx?;
    let plus = i.plus_di?;
    let minus = i.minus_di?;
    let (vote, reason) = if adx > t.adx_trend && plus > minus {
        (Vote::Bullish, format!("ADX {adx:.2} trending with +DI {plus:.2} > -DI {minus:.2}"))
    } else if adx > t.adx_trend && minus > plus {
        (Vote::Bearish, format!("ADX {adx:.2} trending with -DI {minus:.2} > +DI {plus:.2}"))
    } else {
        (Vote::Neutral, format!("ADX {adx:.2} no directional trend"))
    };
    Some(Factor {
        indicator: "ADX",
        vote,
        reason,
    })
}

fn sma_vote(i: &SignalInputs) -> Option<Factor> {
    let close = i.close?;
    let s20 = i.sma_20?;
    let s50 = i.sma_50?;
    let s200 = i.sma_200?;
    let (vote, reason) = if close > s20 && s20 > s50 && s50 > s200 {
        (Vote::Bullish, "close > SMA20 > SMA50 > SMA200".to_string())
    } else if close < s20 && s20 < s50 && s50 < s200 {
        (Vote::Bearish, "close < SMA20 < SMA50 < SMA200".to_string())
    } else {
        (Vote::Neutral, "moving averages not aligned".to_string())
    };
    Some(Factor {
        indicator: "SMA",
        vote,
        reason,
    })
}
