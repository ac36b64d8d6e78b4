// =============================================================================
// Market Data Module
// =============================================================================
//
// Price ingestion for the scanner:
// - `PriceSource`: anything that can hand back one month of daily bars
// - `PsxClient`: the PSX data portal implementation
// - `SeriesCache`: TTL memoisation of merged series
// - `MarketDataService`: resolves a DateRange, fetches, merges and caches

pub mod cache;
pub mod psx_client;
pub mod psx_html;
pub mod service;

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::types::{PriceBar, YearMonth};

pub use cache::{CacheMode, SeriesCache};
pub use psx_client::PsxClient;
pub use service::MarketDataService;

/// A provider of daily bars, one calendar month per call.
///
/// Bars may come back in any order; callers normalise them into a
/// `PriceSeries`.  An empty vector means the month has no trading data.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_month(&self, symbol: &str, month: YearMonth) -> Result<Vec<PriceBar>, AnalysisError>;
}
