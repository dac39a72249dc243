use {
    crate::{
        cache::{CacheKey, CacheWriteError, Clock, KeyValueStore, SeriesCache, SystemClock},
        data::{NormalizeReport, Normalized, RawPayload, normalize_payload},
        domain::{CanonicalSeries, DatasetType, ParamBag},
        engine::{query::DatasetQuery, state::RequestPhase},
    },
    std::{future::Future, sync::Arc},
};

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Fetch,
}

/// Everything one `load` found out, for callers that care about more than the series.
#[derive(Debug)]
pub struct LoadOutcome {
    pub series: CanonicalSeries,
    pub source: LoadSource,
    /// Empty on a cache hit
    pub report: NormalizeReport,
    /// Best effort: an error here never fails the load
    pub cache_write: Result<(), CacheWriteError>,
}

/// Tracks one logical request through its phases.
#[cfg_attr(not(debug_assertions), allow(dead_code))]
struct RequestTrace<'a> {
    key: &'a CacheKey,
    phase: RequestPhase,
}

impl<'a> RequestTrace<'a> {
    fn start(key: &'a CacheKey) -> Self {
        Self {
            key,
            phase: RequestPhase::Idle,
        }
    }

    fn advance(&mut self, next: RequestPhase) {
        #[cfg(debug_assertions)]
        if DF.log_request_phases {
            log::info!("[{}] {} -> {}", self.key, self.phase, next);
        }
        self.phase = next;
    }
}

/// Cache-aware front door for dataset fetches.
///
/// Clones share one [`SeriesCache`]. Two concurrent loads of the same key are not
/// coalesced: both may miss, both fetch, and the later write wins.
pub struct CacheCoordinator<S, C = SystemClock> {
    cache: Arc<SeriesCache<S, C>>,
}

impl<S, C> Clone for CacheCoordinator<S, C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: KeyValueStore, C: Clock> CacheCoordinator<S, C> {
    pub fn new(cache: SeriesCache<S, C>) -> Self {
        Self::from_shared(Arc::new(cache))
    }

    pub fn from_shared(cache: Arc<SeriesCache<S, C>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &SeriesCache<S, C> {
        &self.cache
    }

    /// Cached series if live, otherwise fetch, normalize and write through.
    /// Only a fetch failure is an error, and it comes back exactly as the fetch returned it.
    pub async fn load<F, Fut>(
        &self,
        dataset: &DatasetType,
        params: &ParamBag,
        fetch: F,
    ) -> anyhow::Result<CanonicalSeries>
    where
        F: FnOnce(ParamBag) -> Fut,
        Fut: Future<Output = anyhow::Result<RawPayload>>,
    {
        self.load_detailed(dataset, params, fetch)
            .await
            .map(|outcome| outcome.series)
    }

    pub async fn load_detailed<F, Fut>(
        &self,
        dataset: &DatasetType,
        params: &ParamBag,
        fetch: F,
    ) -> anyhow::Result<LoadOutcome>
    where
        F: FnOnce(ParamBag) -> Fut,
        Fut: Future<Output = anyhow::Result<RawPayload>>,
    {
        let key = self.cache.key(dataset, params);
        let mut trace = RequestTrace::start(&key);

        trace.advance(RequestPhase::CheckingCache);
        if let Some(series) = self.cache.get::<CanonicalSeries>(&key) {
            trace.advance(RequestPhase::Done);
            return Ok(LoadOutcome {
                series,
                source: LoadSource::Cache,
                report: NormalizeReport::default(),
                cache_write: Ok(()),
            });
        }

        #[cfg(debug_assertions)]
        if DF.log_cache_hits {
            log::info!("Cache MISS for {}", key);
        }

        // Make room before the fetch rather than waiting for the store to fill up
        self.cache
            .evict_oldest(dataset, self.cache.settings().max_entries_per_dataset);

        trace.advance(RequestPhase::Fetching);
        let payload = match fetch(params.clone()).await {
            Ok(payload) => payload,
            Err(e) => {
                trace.advance(RequestPhase::DoneWithError);
                return Err(e);
            }
        };

        trace.advance(RequestPhase::Normalizing);
        let Normalized { series, report } =
            crate::trace_time!(&format!("Normalize [{}]", dataset), 2000, {
                normalize_payload(payload)
            });
        log_report(&key, &report);

        trace.advance(RequestPhase::WritingCache);
        let cache_write = self.cache.set(&key, &series);
        if let Err(e) = &cache_write {
            log::warn!("Serving {} uncached: {}", key, e);
        }

        trace.advance(RequestPhase::Done);
        Ok(LoadOutcome {
            series,
            source: LoadSource::Fetch,
            report,
            cache_write,
        })
    }

    /// Drops every cached entry of `dataset`. Returns how many went.
    pub fn invalidate(&self, dataset: &DatasetType) -> usize {
        self.cache.clear_dataset(dataset)
    }

    /// Warms the cache for `params`. Never fails; a fetch error is only logged.
    pub async fn prefetch<F, Fut>(&self, dataset: &DatasetType, params: &ParamBag, fetch: F)
    where
        F: FnOnce(ParamBag) -> Fut,
        Fut: Future<Output = anyhow::Result<RawPayload>>,
    {
        if let Err(e) = self.load(dataset, params, fetch).await {
            log::warn!("Prefetch of {} {} failed: {:#}", dataset, params.canonical(), e);
        }
    }

    /// Binds this coordinator and a fetch function to one dataset.
    pub fn dataset<F>(&self, dataset: DatasetType, fetch: F) -> DatasetQuery<S, C, F> {
        DatasetQuery::new(self.clone(), dataset, fetch)
    }
}

fn log_report(key: &CacheKey, report: &NormalizeReport) {
    if report.dropped.is_empty() {
        return;
    }
    log::warn!(
        "Dropped {} malformed records from {}",
        report.dropped.len(),
        key
    );
    #[cfg(debug_assertions)]
    if DF.log_dropped_records {
        for record in &report.dropped {
            log::info!(
                "  {} #{}: {}",
                record.series.as_deref().unwrap_or("-"),
                record.index,
                record.reason
            );
        }
    }
}
