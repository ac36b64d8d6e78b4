// =============================================================================
// PSX Data Portal Client — monthly historical pages
// =============================================================================
//
// One POST per (symbol, month) to `{base_url}/historical` with form fields
// `symbol`, `year`, `month`.  The answer is an HTML table parsed by
// `psx_html`.  Transport problems are carried as `anyhow` errors internally
// and surface to callers as `AnalysisError::DataUnavailable`.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::AnalysisError;
use crate::types::{PriceBar, YearMonth};

use super::psx_html::parse_historical_page;
use super::PriceSource;

/// HTTP client for the PSX data portal.
#[derive(Clone)]
pub struct PsxClient {
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for PsxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsxClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PsxClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a client for `base_url` (e.g. `https://dps.psx.com.pk`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("psx-scanner/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "PsxClient initialised");

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -------------------------------------------------------------------------
    // Historical data
    // -------------------------------------------------------------------------

    /// POST /historical: raw HTML for one symbol and month.
    #[instrument(skip(self), name = "psx::historical")]
    pub async fn fetch_historical_html(&self, symbol: &str, year: i32, month: u32) -> Result<String> {
        let url = format!("{}/historical", self.base_url);
        let year = year.to_string();
        let month = month.to_string();
        let form = [("symbol", symbol), ("year", year.as_str()), ("month", month.as_str())];

        let resp = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .context("POST /historical request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("PSX POST /historical returned HTTP {}", status);
        }

        let body = resp
            .text()
            .await
            .context("failed to read /historical response body")?;

        debug!(bytes = body.len(), "historical page received");
        Ok(body)
    }
}

#[async_trait]
impl PriceSource for PsxClient {
    async fn fetch_month(&self, symbol: &str, month: YearMonth) -> Result<Vec<PriceBar>, AnalysisError> {
        let html = self
            .fetch_historical_html(symbol, month.year, month.month)
            .await
            .map_err(|e| {
                warn!(symbol, month = %month, error = %e, "PSX fetch failed");
                AnalysisError::unavailable(symbol, format!("{month}: {e:#}"))
            })?;

        let bars = parse_historical_page(&html);
        debug!(symbol, month = %month, bars = bars.len(), "historical page parsed");
        Ok(bars)
    }
}
