// =============================================================================
// Series Cache — TTL memoisation of fetched price series
// =============================================================================
//
// Keyed by (symbol, date range, anchor month) so that a range resolved in a
// new month never serves last month's pages.  A TTL of zero disables the
// cache: nothing is stored and every lookup misses.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{DateRange, PriceSeries, YearMonth};

/// How a single request interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present; otherwise fetch
    /// and store the result.
    #[default]
    Use,
    /// Always fetch, then overwrite the cached entry.
    Refresh,
    /// Always fetch; neither read nor write the cache.
    Bypass,
}

impl CacheMode {
    pub fn reads(self) -> bool {
        self == Self::Use
    }

    pub fn writes(self) -> bool {
        self != Self::Bypass
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub symbol: String,
    pub range: DateRange,
    pub anchor: YearMonth,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    series: Arc<PriceSeries>,
    expires_at: Instant,
}

/// Thread-safe in-memory cache of merged price series.
#[derive(Debug)]
pub struct SeriesCache {
    map: RwLock<HashMap<SeriesKey, CacheEntry>>,
    ttl: RwLock<Duration>,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            ttl: RwLock::new(ttl),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        *self.ttl.read()
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl().is_zero()
    }

    /// Change the TTL for future inserts.  Setting zero also drops every
    /// stored entry.
    pub fn set_ttl(&self, ttl: Duration) {
        *self.ttl.write() = ttl;
        if ttl.is_zero() {
            self.clear();
        }
    }

    /// Cached series for `key` if present and not expired.
    pub fn get(&self, key: &SeriesKey) -> Option<Arc<PriceSeries>> {
        if !self.is_enabled() {
            return None;
        }
        let now = Instant::now();
        self.map
            .read()
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| Arc::clone(&entry.series))
    }

    /// Store `series` under `key`.  No-op when the cache is disabled.
    pub fn put(&self, key: SeriesKey, series: Arc<PriceSeries>) {
        let ttl = self.ttl();
        if ttl.is_zero() {
            return;
        }
        let expires_at = Instant::now() + ttl;
        self.map.write().insert(key, CacheEntry { series, expires_at });
    }

    /// Drop entries for one symbol, or every entry when `symbol` is `None`.
    /// Returns how many entries were removed.
    pub fn invalidate(&self, symbol: Option<&str>) -> usize {
        let mut map = self.map.write();
        let before = map.len();
        match symbol {
            Some(sym) => map.retain(|key, _| key.symbol != sym),
            None => map.clear(),
        }
        before - map.len()
    }

    /// Remove expired entries.
    pub fn clear_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.map.write();
        let before = map.len();
        map.retain(|_, entry| entry.expires_at > now);
        before - map.len()
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str) -> SeriesKey {
        SeriesKey {
            symbol: symbol.to_string(),
            range: DateRange::CurrentAndPreviousMonth,
            anchor: YearMonth { year: 2025, month: 7 },
        }
    }

    fn series() -> Arc<PriceSeries> {
        Arc::new(PriceSeries::default())
    }

    #[test]
    fn hit_within_ttl() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        cache.put(key("HBL"), series());
        assert!(cache.get(&key("HBL")).is_some());
        assert!(cache.get(&key("UBL")).is_none());
    }

    #[test]
    fn anchor_month_is_part_of_key() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        cache.put(key("HBL"), series());
        let next_month = SeriesKey {
            anchor: YearMonth { year: 2025, month: 8 },
            ..key("HBL")
        };
        assert!(cache.get(&next_month).is_none());
    }

    #[test]
    fn entries_expire() {
        let cache = SeriesCache::new(Duration::from_millis(5));
        cache.put(key("HBL"), series());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get(&key("HBL")).is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.clear_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = SeriesCache::disabled();
        cache.put(key("HBL"), series());
        assert!(cache.is_empty());
        assert!(cache.get(&key("HBL")).is_none());
    }

    #[test]
    fn setting_zero_ttl_clears() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        cache.put(key("HBL"), series());
        cache.set_ttl(Duration::ZERO);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_one_symbol_or_all() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        cache.put(key("HBL"), series());
        cache.put(
            SeriesKey {
                range: DateRange::CurrentMonth,
                ..key("HBL")
            },
            series(),
        );
        cache.put(key("OGDC"), series());

        assert_eq!(cache.invalidate(Some("HBL")), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate(None), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn mode_flags() {
        assert!(CacheMode::Use.reads() && CacheMode::Use.writes());
        assert!(!CacheMode::Refresh.reads() && CacheMode::Refresh.writes());
        assert!(!CacheMode::Bypass.reads() && !CacheMode::Bypass.writes());
    }
}
