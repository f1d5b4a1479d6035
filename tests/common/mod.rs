#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use screenpick_api::{
    db::{CacheStore, InMemoryProfileStore, ProfileStore},
    error::{ProviderError, ProviderErrorKind, ProviderResult},
    metrics::PerformanceMonitor,
    models::{
        ContentItem, DetailedItem, ExternalIds, MediaType, MediaTypeFilter, MetadataDetails,
        ProviderKind, StreamingService, UserProfile,
    },
    services::{
        providers::ProviderClient, AggregationManager, RecommendationOrchestrator, ScoringEngine,
    },
};

pub const TEST_YEAR: i32 = 2024;
pub const TIMEOUT: Duration = Duration::from_secs(10);
pub const TTL: Duration = Duration::from_secs(1800);

/// Scripted provider with an outbound call counter
pub struct FakeProvider {
    name: String,
    kind: ProviderKind,
    online: bool,
    failing: bool,
    delay: Option<Duration>,
    details_delay: Option<Duration>,
    search_results: Vec<ContentItem>,
    trending: Vec<ContentItem>,
    details: HashMap<String, DetailedItem>,
    streaming: HashMap<String, Vec<StreamingService>>,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new(name: &str, kind: ProviderKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            online: true,
            failing: false,
            delay: None,
            details_delay: None,
            search_results: Vec::new(),
            trending: Vec::new(),
            details: HashMap::new(),
            streaming: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn primary(name: &str) -> Self {
        Self::new(name, ProviderKind::PrimaryMetadata)
    }

    pub fn streaming(name: &str) -> Self {
        Self::new(name, ProviderKind::StreamingAvailability)
    }

    pub fn with_search(mut self, items: Vec<ContentItem>) -> Self {
        self.search_results = items;
        self
    }

    pub fn with_trending(mut self, items: Vec<ContentItem>) -> Self {
        self.trending = items;
        self
    }

    pub fn with_details(mut self, details: DetailedItem) -> Self {
        self.details.insert(details.item().id.clone(), details);
        self
    }

    pub fn with_streaming(mut self, id: &str, services: Vec<StreamingService>) -> Self {
        self.streaming.insert(id.to_string(), services);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delays only detail lookups
    pub fn slow_details(mut self, delay: Duration) -> Self {
        self.details_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer<T>(&self, value: impl FnOnce() -> T) -> ProviderResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(ProviderError::new(&self.name, ProviderErrorKind::Http(503)));
        }
        Ok(value())
    }

    fn filtered(items: &[ContentItem], filter: MediaTypeFilter) -> Vec<ContentItem> {
        items
            .iter()
            .filter(|item| filter.admits(item.media_type))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl ProviderClient for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn test_connection(&self) -> bool {
        self.online
    }

    async fn search_content(
        &self,
        _query: &str,
        filter: MediaTypeFilter,
        _page: u32,
    ) -> ProviderResult<Vec<ContentItem>> {
        self.answer(|| Self::filtered(&self.search_results, filter))
            .await
    }

    async fn get_trending(&self, filter: MediaTypeFilter) -> ProviderResult<Vec<ContentItem>> {
        self.answer(|| Self::filtered(&self.trending, filter)).await
    }

    async fn get_details(&self, id: &str, _media_type: MediaType) -> ProviderResult<DetailedItem> {
        if let Some(delay) = self.details_delay {
            tokio::time::sleep(delay).await;
        }
        self.answer(|| self.details.get(id).cloned())
            .await?
            .ok_or_else(|| ProviderError::new(&self.name, ProviderErrorKind::Http(404)))
    }

    async fn get_streaming_services(&self, id: &str) -> ProviderResult<Vec<StreamingService>> {
        self.answer(|| self.streaming.get(id).cloned().unwrap_or_default())
            .await
    }
}

/// Builder for list items as a provider would translate them
pub struct ItemBuilder(ContentItem);

impl ItemBuilder {
    pub fn new(provider: &str, id: &str, title: &str) -> Self {
        Self(ContentItem {
            id: id.to_string(),
            ids: ExternalIds::default(),
            title: title.to_string(),
            original_title: None,
            release_year: Some(2022),
            media_type: MediaType::Movie,
            vote_average: 7.0,
            vote_count: 2000,
            popularity: 50.0,
            genres: Vec::new(),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            source_provider: provider.to_string(),
            resolved_streaming_services: Vec::new(),
        })
    }

    pub fn year(mut self, year: i32) -> Self {
        self.0.release_year = Some(year);
        self
    }

    pub fn series(mut self) -> Self {
        self.0.media_type = MediaType::Series;
        self
    }

    pub fn rating(mut self, rating: f64, votes: u64) -> Self {
        self.0.vote_average = rating;
        self.0.vote_count = votes;
        self
    }

    pub fn popularity(mut self, popularity: f64) -> Self {
        self.0.popularity = popularity;
        self
    }

    pub fn genres(mut self, genres: &[&str]) -> Self {
        self.0.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn overview(mut self, overview: &str) -> Self {
        self.0.overview = overview.to_string();
        self
    }

    pub fn tmdb_id(mut self, id: u64) -> Self {
        self.0.ids.tmdb = Some(id);
        self
    }

    pub fn watchmode_id(mut self, id: u64) -> Self {
        self.0.ids.watchmode = Some(id);
        self
    }

    pub fn on(mut self, services: &[StreamingService]) -> Self {
        self.0.resolved_streaming_services = services.to_vec();
        self
    }

    pub fn build(self) -> ContentItem {
        self.0
    }
}

pub fn metadata_details(item: ContentItem, directors: &[&str]) -> DetailedItem {
    DetailedItem::Metadata(MetadataDetails {
        item,
        keywords: Vec::new(),
        directors: directors.iter().map(|d| d.to_string()).collect(),
        creators: Vec::new(),
        tagline: None,
        runtime_minutes: None,
    })
}

/// Registers fakes in the given priority order
pub async fn manager(providers: Vec<Arc<FakeProvider>>) -> Arc<AggregationManager> {
    let providers: Vec<Arc<dyn ProviderClient>> = providers
        .into_iter()
        .map(|p| p as Arc<dyn ProviderClient>)
        .collect();
    Arc::new(
        AggregationManager::new(providers, TIMEOUT, Arc::new(PerformanceMonitor::new())).await,
    )
}

pub async fn orchestrator_with(
    providers: Vec<Arc<FakeProvider>>,
    profiles: Vec<UserProfile>,
) -> RecommendationOrchestrator {
    let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::with_profiles(profiles));
    RecommendationOrchestrator::new(
        manager(providers).await,
        Arc::new(CacheStore::new(TTL)),
        profiles,
        ScoringEngine::new(TEST_YEAR),
    )
}
