// =============================================================================
// Analysis Error Taxonomy
// =============================================================================
//
// Every failure the engine can surface to a caller. Short indicator history
// and degenerate divisions are *not* errors: they show up as undefined
// (`None`) indicator values and are skipped by the vote engine.
// =============================================================================

use serde::Serialize;
use thiserror::Error;

/// Errors produced while validating input, fetching price data, or preparing a
/// series for analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Rejected before any fetch was attempted (bad symbol, empty scan list,
    /// out-of-range limit, malformed bar or series).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The data source could not return a series for this symbol/range.
    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// The series exists but is too short to be worth analysing at all.
    #[error("insufficient data for {symbol}: found {found} bars, need at least {required}")]
    InsufficientData {
        symbol: String,
        found: usize,
        required: usize,
    },
}

/// Machine-readable error class, used in scan failure lists and API bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    DataUnavailable,
    InsufficientData,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
        }
    }

    /// Shorthand for building a [`AnalysisError::DataUnavailable`].
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_variants() {
        assert_eq!(
            AnalysisError::InvalidInput("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            AnalysisError::unavailable("HBL", "timeout").kind(),
            ErrorKind::DataUnavailable
        );
        let err = AnalysisError::InsufficientData {
            symbol: "HBL".into(),
            found: 3,
            required: 10,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn display_includes_symbol_and_reason() {
        let err = AnalysisError::unavailable("OGDC", "HTTP 503");
        assert_eq!(err.to_string(), "data unavailable for OGDC: HTTP 503");
    }

    #[test]
    fn kind_serialises_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DataUnavailable).unwrap();
        assert_eq!(json, "\"data_unavailable\"");
    }
}
