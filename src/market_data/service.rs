// =============================================================================
// MarketDataService — range resolution, page merging, caching
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::types::{DateRange, PriceSeries, YearMonth};

use super::cache::{CacheMode, SeriesCache, SeriesKey};
use super::PriceSource;

pub struct MarketDataService {
    source: Arc<dyn PriceSource>,
    cache: SeriesCache,
}

impl MarketDataService {
    pub fn new(source: Arc<dyn PriceSource>, cache: SeriesCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Load the merged series for `symbol` over `range`, resolved against
    /// `today`.
    ///
    /// Each month page is fetched independently.  A failing page is logged
    /// and skipped; the symbol is only `DataUnavailable` when every page
    /// fails or the merged result holds no bars.
    pub async fn load_series(
        &self,
        symbol: &str,
        range: DateRange,
        today: NaiveDate,
        mode: CacheMode,
    ) -> Result<Arc<PriceSeries>, AnalysisError> {
        let key = SeriesKey {
            symbol: symbol.to_string(),
            range,
            anchor: YearMonth::of(today),
        };

        if mode.reads() {
            if let Some(series) = self.cache.get(&key) {
                debug!(symbol, range = %range, bars = series.len(), "series cache hit");
                return Ok(series);
            }
        }

        let months = range.months(today);
        let mut bars = Vec::new();
        let mut last_error = None;
        let mut pages_ok = 0usize;

        for month in &months {
            match self.source.fetch_month(symbol, *month).await {
                Ok(page) => {
                    pages_ok += 1;
                    bars.extend(page);
                }
                Err(e) => {
                    warn!(symbol, month = %month, error = %e, "skipping month page");
                    last_error = Some(e);
                }
            }
        }

        if pages_ok == 0 {
            return Err(last_error.unwrap_or_else(|| {
                AnalysisError::unavailable(symbol, "no months to fetch for range")
            }));
        }

        let series = PriceSeries::from_unsorted(bars)?;
        if series.is_empty() {
            return Err(AnalysisError::unavailable(
                symbol,
                format!("no trading rows for {range}"),
            ));
        }

        info!(symbol, range = %range, bars = series.len(), pages = pages_ok, "series loaded");

        let series = Arc::new(series);
        if mode.writes() {
            self.cache.put(key, Arc::clone(&series));
        }
        Ok(series)
    }
}
