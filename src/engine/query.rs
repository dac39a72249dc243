use {
    crate::{
        cache::{Clock, KeyValueStore},
        data::RawPayload,
        domain::{CanonicalSeries, DatasetType, ParamBag},
        engine::{
            coordinator::CacheCoordinator,
            state::{LoadState, LoadStatus},
        },
        utils::spawn_detached,
    },
    anyhow::anyhow,
    poll_promise::Promise,
    std::future::Future,
};

/// A load running in the background, polled once per frame by the rendering layer.
pub struct PendingLoad {
    promise: Promise<anyhow::Result<CanonicalSeries>>,
}

impl PendingLoad {
    fn failed(error: anyhow::Error) -> Self {
        Self {
            promise: Promise::from_ready(Err(error)),
        }
    }

    pub fn state(&self) -> LoadState<'_> {
        match self.promise.ready() {
            None => LoadState::Loading,
            Some(Ok(series)) => LoadState::Ready(series),
            Some(Err(error)) => LoadState::Error(error),
        }
    }

    pub fn status(&self) -> LoadStatus {
        self.state().status()
    }

    pub fn is_settled(&self) -> bool {
        self.promise.ready().is_some()
    }
}

/// One dataset's fetch function bound to a coordinator.
pub struct DatasetQuery<S, C, F> {
    coordinator: CacheCoordinator<S, C>,
    dataset: DatasetType,
    fetch: F,
}

impl<S, C, F, Fut> DatasetQuery<S, C, F>
where
    S: KeyValueStore,
    C: Clock,
    F: Fn(ParamBag) -> Fut,
    Fut: Future<Output = anyhow::Result<RawPayload>>,
{
    pub fn dataset(&self) -> &DatasetType {
        &self.dataset
    }

    pub async fn load(&self, params: &ParamBag) -> anyhow::Result<CanonicalSeries> {
        self.coordinator
            .load(&self.dataset, params, |params| (self.fetch)(params))
            .await
    }

    pub fn invalidate(&self) -> usize {
        self.coordinator.invalidate(&self.dataset)
    }

    pub async fn prefetch(&self, params: &ParamBag) {
        self.coordinator
            .prefetch(&self.dataset, params, |params| (self.fetch)(params))
            .await
    }
}

impl<S, C, F> DatasetQuery<S, C, F> {
    pub(crate) fn new(coordinator: CacheCoordinator<S, C>, dataset: DatasetType, fetch: F) -> Self {
        Self {
            coordinator,
            dataset,
            fetch,
        }
    }
}

impl<S, C, F, Fut> DatasetQuery<S, C, F>
where
    S: KeyValueStore + 'static,
    C: Clock + 'static,
    F: Fn(ParamBag) -> Fut + Clone + 'static,
    Fut: Future<Output = anyhow::Result<RawPayload>> + 'static,
{
    /// Owned load future, detached from `self`.
    fn owned_load(
        &self,
        params: ParamBag,
    ) -> impl Future<Output = anyhow::Result<CanonicalSeries>> + use<S, C, F, Fut> {
        let coordinator = self.coordinator.clone();
        let dataset = self.dataset.clone();
        let fetch = self.fetch.clone();
        async move { coordinator.load(&dataset, &params, fetch).await }
    }

    fn owned_prefetch(&self, params: ParamBag) -> impl Future<Output = ()> + use<S, C, F, Fut> {
        let coordinator = self.coordinator.clone();
        let dataset = self.dataset.clone();
        let fetch = self.fetch.clone();
        async move { coordinator.prefetch(&dataset, &params, fetch).await }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<S, C, F, Fut> DatasetQuery<S, C, F>
where
    S: KeyValueStore + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
    F: Fn(ParamBag) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = anyhow::Result<RawPayload>> + Send + 'static,
{
    /// Starts a load on the tokio runtime and returns immediately.
    pub fn request(&self, params: ParamBag) -> PendingLoad {
        let (sender, promise) = Promise::new();
        let load = self.owned_load(params);
        let spawned = spawn_detached(&format!("load {}", self.dataset), async move {
            sender.send(load.await);
        });
        if spawned {
            PendingLoad { promise }
        } else {
            PendingLoad::failed(anyhow!("no async runtime to load {}", self.dataset))
        }
    }

    /// Warms the cache in the background without blocking the caller.
    pub fn spawn_prefetch(&self, params: ParamBag) -> bool {
        spawn_detached(&format!("prefetch {}", self.dataset), self.owned_prefetch(params))
    }
}

#[cfg(target_arch = "wasm32")]
impl<S, C, F, Fut> DatasetQuery<S, C, F>
where
    S: KeyValueStore + 'static,
    C: Clock + 'static,
    F: Fn(ParamBag) -> Fut + Clone + 'static,
    Fut: Future<Output = anyhow::Result<RawPayload>> + 'static,
{
    pub fn request(&self, params: ParamBag) -> PendingLoad {
        let (sender, promise) = Promise::new();
        let load = self.owned_load(params);
        spawn_detached(&format!("load {}", self.dataset), async move {
            sender.send(load.await);
        });
        PendingLoad { promise }
    }

    pub fn spawn_prefetch(&self, params: ParamBag) -> bool {
        spawn_detached(&format!("prefetch {}", self.dataset), self.owned_prefetch(params))
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::{
        cache::{MemoryStore, SeriesCache},
        config::CacheSettings,
    };
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn coordinator() -> CacheCoordinator<MemoryStore> {
        CacheCoordinator::new(SeriesCache::new(MemoryStore::new(), CacheSettings::default()))
    }

    fn bars() -> DatasetType {
        DatasetType::new("bar_ohlc").unwrap()
    }

    async fn fetch_bars(params: ParamBag) -> anyhow::Result<RawPayload> {
        if params.get("category").is_none() {
            anyhow::bail!("category is required");
        }
        Ok(RawPayload::from_json(json!({
            "open": [{"time": 1, "value": 10}],
            "high": [{"time": 1, "value": 12}],
            "low": [{"time": 1, "value": 9}],
            "close": [{"time": 1, "value": 11}],
        })))
    }

    async fn settle(pending: &PendingLoad) {
        while !pending.is_settled() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_request_moves_from_loading_to_ready() {
        let query = coordinator().dataset(bars(), fetch_bars);
        let pending = query.request(ParamBag::new().with("category", "gold"));
        assert_eq!(pending.status(), LoadStatus::Loading);

        settle(&pending).await;
        assert_eq!(pending.status(), LoadStatus::Ready);
        let LoadState::Ready(series) = pending.state() else {
            panic!("expected ready state");
        };
        assert_eq!(series.as_candles().map(|candles| candles.len()), Some(1));
    }

    #[tokio::test]
    async fn test_request_surfaces_fetch_error() {
        let query = coordinator().dataset(bars(), fetch_bars);
        let pending = query.request(ParamBag::new());

        settle(&pending).await;
        match pending.state() {
            LoadState::Error(error) => assert_eq!(error.to_string(), "category is required"),
            other => panic!("expected error state, got {:?}", other.status()),
        }
    }

    #[test]
    fn test_request_without_runtime_fails_fast() {
        let query = coordinator().dataset(bars(), fetch_bars);
        let pending = query.request(ParamBag::new().with("category", "gold"));
        assert_eq!(pending.status(), LoadStatus::Error);
    }

    #[tokio::test]
    async fn test_query_load_uses_cache_on_second_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let query = coordinator().dataset(bars(), move |params| {
            counter.fetch_add(1, Ordering::SeqCst);
            fetch_bars(params)
        });
        let params = ParamBag::new().with("category", "silver");

        query.load(&params).await.unwrap();
        query.load(&params).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(query.invalidate(), 1);
        query.prefetch(&params).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_spawn_prefetch_warms_cache() {
        let coordinator = coordinator();
        let query = coordinator.dataset(bars(), fetch_bars);
        let params = ParamBag::new().with("category", "gold");
        let key = coordinator.cache().key(&bars(), &params);

        assert!(query.spawn_prefetch(params));
        while !coordinator.cache().contains(&key) {
            tokio::task::yield_now().await;
        }
    }
}
