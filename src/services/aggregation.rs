//! Fan-out across content providers, merge/dedup and raw ranking.
//!
//! Every fan-out is scoped to its call: one task per active provider in a
//! `JoinSet`, each bounded by the per-call timeout, and the join itself bounded
//! by the same deadline. Whatever has not answered by then is aborted and
//! reported as a timeout.

use futures::future::join_all;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    future::Future,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::RwLock,
    task::JoinSet,
    time::{timeout, timeout_at, Instant},
};

use crate::{
    error::{ProviderError, ProviderErrorKind, ProviderResult},
    metrics::PerformanceMonitor,
    models::{
        AggregateResponse, ContentItem, EmptyReason, EnhancedDetails, FallbackResponse, MediaType,
        MediaTypeFilter, ProviderKind, ProviderStatus, StreamingService,
    },
    services::providers::ProviderClient,
};

/// Popularity cap inside the raw composite for search results
pub const SEARCH_POPULARITY_CAP: f64 = 5.0;
/// Popularity cap inside the raw composite for trending results
pub const TRENDING_POPULARITY_CAP: f64 = 4.0;

/// Candidates inspected when matching a title on a streaming provider
const ENRICHMENT_MATCH_WINDOW: usize = 3;

struct FanOut {
    /// Successful providers with their items, in priority order
    succeeded: Vec<(String, Vec<ContentItem>)>,
    /// Failures, in priority order
    errors: Vec<ProviderError>,
}

pub struct AggregationManager {
    /// Registered providers in declared priority order
    providers: Vec<Arc<dyn ProviderClient>>,
    statuses: RwLock<Vec<ProviderStatus>>,
    timeout: Duration,
    monitor: Arc<PerformanceMonitor>,
}

impl AggregationManager {
    /// Registers providers (highest priority first) and probes them once
    pub async fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        timeout: Duration,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        let statuses = providers
            .iter()
            .enumerate()
            .map(|(priority, p)| ProviderStatus {
                name: p.name().to_string(),
                kind: p.kind(),
                priority,
                configured: p.is_configured(),
                last_probe_ok: false,
            })
            .collect();

        let manager = Self {
            providers,
            statuses: RwLock::new(statuses),
            timeout,
            monitor,
        };

        let probes = manager.test_all_providers().await;
        tracing::info!(
            providers = manager.providers.len(),
            active = probes.values().filter(|ok| **ok).count(),
            "Aggregation manager initialised"
        );

        manager
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub async fn statuses(&self) -> Vec<ProviderStatus> {
        self.statuses.read().await.clone()
    }

    /// Position in the declared priority order; unknown names sort last
    pub fn priority_of(&self, name: &str) -> usize {
        self.providers
            .iter()
            .position(|p| p.name() == name)
            .unwrap_or(self.providers.len())
    }

    /// Name of the most trusted primary metadata provider
    pub fn primary_name(&self) -> Option<&str> {
        self.providers
            .iter()
            .find(|p| p.kind() == ProviderKind::PrimaryMetadata)
            .map(|p| p.name())
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn provider(&self, name: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Active providers in priority order
    pub async fn active_providers(&self) -> Vec<Arc<dyn ProviderClient>> {
        let statuses = self.statuses.read().await;
        self.providers
            .iter()
            .filter(|p| {
                statuses
                    .iter()
                    .any(|s| s.name == p.name() && s.is_active())
            })
            .cloned()
            .collect()
    }

    async fn is_active(&self, name: &str) -> bool {
        self.statuses
            .read()
            .await
            .iter()
            .any(|s| s.name == name && s.is_active())
    }

    /// Probes every configured provider concurrently and records the outcome
    pub async fn test_all_providers(&self) -> BTreeMap<String, bool> {
        let probes = join_all(self.providers.iter().map(|provider| async move {
            let ok = if provider.is_configured() {
                timeout(self.timeout, provider.test_connection())
                    .await
                    .unwrap_or(false)
            } else {
                false
            };
            (provider.name().to_string(), ok)
        }))
        .await;

        let mut statuses = self.statuses.write().await;
        for (name, ok) in &probes {
            if let Some(status) = statuses.iter_mut().find(|s| &s.name == name) {
                status.last_probe_ok = *ok;
            }
            tracing::info!(provider = %name, active = ok, "Provider probed");
        }

        probes.into_iter().collect()
    }

    /// Runs one bounded call with timing and error logging
    async fn timed<T>(
        &self,
        provider: &dyn ProviderClient,
        call: impl Future<Output = ProviderResult<T>>,
    ) -> ProviderResult<T> {
        let started = Instant::now();
        let result = match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(provider.name())),
        };

        self.monitor
            .record_provider_call(provider.name(), started.elapsed(), result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(provider = %provider.name(), error = %e, "Provider call failed");
        }
        result
    }

    /// Dispatches `call` to every active provider concurrently
    async fn fan_out<F, Fut>(&self, operation: &'static str, call: F) -> Result<FanOut, EmptyReason>
    where
        F: Fn(Arc<dyn ProviderClient>) -> Fut,
        Fut: Future<Output = ProviderResult<Vec<ContentItem>>> + Send + 'static,
    {
        let active = self.active_providers().await;
        if active.is_empty() {
            tracing::warn!(operation, "No active providers");
            return Err(EmptyReason::NoActiveProviders);
        }

        let deadline = Instant::now() + self.timeout;
        let per_call = self.timeout;
        let mut pending: HashSet<String> = HashSet::new();
        let mut set = JoinSet::new();

        for provider in active {
            let name = provider.name().to_string();
            pending.insert(name.clone());
            let request = call(provider);
            set.spawn(async move {
                let started = Instant::now();
                let result = match timeout(per_call, request).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::timeout(&name)),
                };
                (name, result, started.elapsed())
            });
        }

        let mut succeeded = Vec::new();
        let mut errors = Vec::new();

        loop {
            match timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((name, result, elapsed)))) => {
                    pending.remove(&name);
                    self.monitor
                        .record_provider_call(&name, elapsed, result.is_ok());
                    match result {
                        Ok(items) => succeeded.push((name, items)),
                        Err(e) => {
                            tracing::warn!(operation, provider = %name, error = %e, "Provider call failed");
                            errors.push(e);
                        }
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(operation, error = %e, "Provider task failed");
                }
                Ok(None) => break,
                Err(_) => {
                    // Join deadline reached; abandon whatever is still running
                    set.abort_all();
                    for name in &pending {
                        self.monitor.record_provider_call(name, self.timeout, false);
                        tracing::warn!(operation, provider = %name, "Provider call abandoned at deadline");
                        errors.push(ProviderError::timeout(name));
                    }
                    pending.clear();
                    break;
                }
            }
        }

        // Tasks that died without reporting
        for name in pending {
            errors.push(ProviderError::new(
                &name,
                ProviderErrorKind::Network("provider task aborted".to_string()),
            ));
        }

        succeeded.sort_by_key(|(name, _)| self.priority_of(name));
        errors.sort_by_key(|e| self.priority_of(&e.provider));

        if !errors.is_empty() {
            tracing::warn!(
                operation,
                success_count = succeeded.len(),
                error_count = errors.len(),
                "Partial provider fan-out failure"
            );
        }

        Ok(FanOut { succeeded, errors })
    }

    async fn aggregate<F, Fut>(
        &self,
        operation: &'static str,
        max_results: usize,
        popularity_cap: f64,
        call: F,
    ) -> AggregateResponse
    where
        F: Fn(Arc<dyn ProviderClient>) -> Fut,
        Fut: Future<Output = ProviderResult<Vec<ContentItem>>> + Send + 'static,
    {
        let fan = match self.fan_out(operation, call).await {
            Ok(fan) => fan,
            Err(reason) => {
                let errors = self
                    .providers
                    .iter()
                    .map(|p| ProviderError::unavailable(p.name(), "provider not active"))
                    .collect();
                return AggregateResponse::failed(reason, errors);
            }
        };

        if fan.succeeded.is_empty() {
            return AggregateResponse::failed(EmptyReason::NoProvidersSucceeded, fan.errors);
        }

        let providers_used: Vec<String> = fan.succeeded.iter().map(|(n, _)| n.clone()).collect();
        let raw: Vec<ContentItem> = fan
            .succeeded
            .into_iter()
            .flat_map(|(_, items)| items)
            .collect();

        let mut results = self.rank_raw(self.merge_and_dedup(raw), popularity_cap);
        let total_results = results.len();
        results.truncate(max_results);

        tracing::info!(
            operation,
            results = results.len(),
            total_results,
            providers = providers_used.len(),
            "Aggregation completed"
        );

        AggregateResponse {
            results,
            total_results,
            providers_used,
            errors: fan.errors,
            reason: None,
        }
    }

    pub async fn search_parallel(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        max_results: usize,
    ) -> AggregateResponse {
        let query = query.to_string();
        self.aggregate("search", max_results, SEARCH_POPULARITY_CAP, move |provider| {
            let query = query.clone();
            async move { provider.search_content(&query, filter, 1).await }
        })
        .await
    }

    pub async fn get_trending_parallel(
        &self,
        filter: MediaTypeFilter,
        max_results: usize,
    ) -> AggregateResponse {
        self.aggregate("trending", max_results, TRENDING_POPULARITY_CAP, move |provider| async move {
            provider.get_trending(filter).await
        })
        .await
    }

    pub fn merge_and_dedup(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        merge_and_dedup(items, self.primary_name())
    }

    /// Non-personalized ordering by composite score
    ///
    /// Ties fall back to provider priority, then item id, so the order never
    /// depends on which provider answered first.
    pub fn rank_raw(&self, mut items: Vec<ContentItem>, popularity_cap: f64) -> Vec<ContentItem> {
        items.sort_by(|a, b| {
            composite_score(b, popularity_cap)
                .total_cmp(&composite_score(a, popularity_cap))
                .then_with(|| {
                    self.priority_of(&a.source_provider)
                        .cmp(&self.priority_of(&b.source_provider))
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        items
    }

    /// Details from one provider, enriched with streaming data when possible
    ///
    /// The whole lookup shares one timeout budget. The streaming step only
    /// gets what the details fetch left over, and any failure there (including
    /// running out of budget) still returns the base details.
    pub async fn get_enhanced_details(
        &self,
        id: &str,
        media_type: MediaType,
        preferred_provider: Option<&str>,
    ) -> ProviderResult<EnhancedDetails> {
        let name = preferred_provider
            .or_else(|| self.primary_name())
            .or_else(|| self.providers.first().map(|p| p.name()))
            .ok_or_else(|| ProviderError::unavailable("none", "no providers registered"))?;

        let provider = self
            .provider(name)
            .ok_or_else(|| ProviderError::unavailable(name, "unknown provider"))?;
        if !self.is_active(name).await {
            return Err(ProviderError::unavailable(name, "provider not active"));
        }

        let deadline = Instant::now() + self.timeout;
        let details = self
            .timed(provider.as_ref(), provider.get_details(id, media_type))
            .await?;
        let mut enhanced = EnhancedDetails::plain(details);

        if provider.kind() != ProviderKind::PrimaryMetadata {
            return Ok(enhanced);
        }

        let streaming = self
            .active_providers()
            .await
            .into_iter()
            .find(|p| p.kind() == ProviderKind::StreamingAvailability);

        if let Some(streaming) = streaming {
            let lookup = self.lookup_streaming(streaming.as_ref(), &enhanced);
            let outcome = timeout_at(deadline, lookup).await;
            match outcome {
                Ok(Ok(Some(services))) => {
                    enhanced.enhanced_streaming = services;
                    enhanced.streaming_source = Some(streaming.name().to_string());
                }
                Ok(Ok(None)) => {
                    tracing::debug!(id = %id, provider = %streaming.name(), "No streaming match found");
                }
                Ok(Err(e)) => {
                    tracing::warn!(id = %id, error = %e, "Streaming enrichment failed");
                }
                Err(_) => {
                    self.monitor
                        .record_provider_call(streaming.name(), self.timeout, false);
                    tracing::warn!(
                        id = %id,
                        provider = %streaming.name(),
                        "Streaming enrichment ran out of time"
                    );
                }
            }
        }

        Ok(enhanced)
    }

    /// Finds the same title on a streaming provider and resolves its services
    async fn lookup_streaming(
        &self,
        streaming: &dyn ProviderClient,
        base: &EnhancedDetails,
    ) -> ProviderResult<Option<Vec<StreamingService>>> {
        let item = base.details.item();
        let filter = match item.media_type {
            MediaType::Movie => MediaTypeFilter::Movie,
            MediaType::Series => MediaTypeFilter::Series,
        };

        let candidates = self
            .timed(streaming, streaming.search_content(&item.title, filter, 1))
            .await?;

        let Some(matched) = candidates
            .into_iter()
            .take(ENRICHMENT_MATCH_WINDOW)
            .find(|candidate| is_same_title(item, candidate))
        else {
            return Ok(None);
        };

        if !matched.resolved_streaming_services.is_empty() {
            return Ok(Some(matched.resolved_streaming_services));
        }

        let services = self
            .timed(streaming, streaming.get_streaming_services(&matched.id))
            .await?;
        Ok(Some(services))
    }

    /// Tries providers one at a time until one returns results
    pub async fn search_with_fallback(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        primary_provider: Option<&str>,
    ) -> FallbackResponse {
        let mut errors = Vec::new();
        let mut order = self.active_providers().await;

        let mut skipped_primary = false;
        if let Some(primary) = primary_provider {
            match order.iter().position(|p| p.name() == primary) {
                Some(index) => {
                    let chosen = order.remove(index);
                    order.insert(0, chosen);
                }
                None => {
                    skipped_primary = true;
                    errors.push(ProviderError::unavailable(primary, "provider not active"));
                }
            }
        }

        if order.is_empty() {
            return FallbackResponse {
                results: Vec::new(),
                provider_used: None,
                fallback_used: false,
                providers_tried: Vec::new(),
                errors,
                reason: Some(EmptyReason::NoActiveProviders),
            };
        }

        let mut providers_tried = Vec::new();
        let mut first_empty: Option<(usize, String)> = None;

        for (index, provider) in order.iter().enumerate() {
            providers_tried.push(provider.name().to_string());
            match self
                .timed(provider.as_ref(), provider.search_content(query, filter, 1))
                .await
            {
                Ok(items) if !items.is_empty() => {
                    let results =
                        self.rank_raw(self.merge_and_dedup(items), SEARCH_POPULARITY_CAP);
                    let fallback_used = index > 0 || skipped_primary;
                    tracing::info!(
                        query = %query,
                        provider = %provider.name(),
                        fallback_used,
                        results = results.len(),
                        "Fallback search served"
                    );
                    return FallbackResponse {
                        results,
                        provider_used: Some(provider.name().to_string()),
                        fallback_used,
                        providers_tried,
                        errors,
                        reason: None,
                    };
                }
                Ok(_) => {
                    first_empty.get_or_insert((index, provider.name().to_string()));
                }
                Err(e) => errors.push(e),
            }
        }

        match first_empty {
            Some((index, name)) => FallbackResponse {
                results: Vec::new(),
                provider_used: Some(name),
                fallback_used: index > 0 || skipped_primary,
                providers_tried,
                errors,
                reason: None,
            },
            None => FallbackResponse {
                results: Vec::new(),
                provider_used: None,
                fallback_used: providers_tried.len() > 1 || skipped_primary,
                providers_tried,
                errors,
                reason: Some(EmptyReason::NoProvidersSucceeded),
            },
        }
    }
}

/// `voteAverage*0.7 + min(popularity/100, cap)*0.3`
pub fn composite_score(item: &ContentItem, popularity_cap: f64) -> f64 {
    item.vote_average * 0.7 + (item.popularity / 100.0).min(popularity_cap) * 0.3
}

fn is_same_title(base: &ContentItem, candidate: &ContentItem) -> bool {
    base.title.trim().to_lowercase() == candidate.title.trim().to_lowercase()
        || (base.vote_average - candidate.vote_average).abs() < 1.0
}

/// Collapses items sharing a dedup key; the first occurrence is canonical
///
/// Later duplicates only fill gaps, except that the primary provider's rating
/// replaces a secondary one.
pub fn merge_and_dedup(items: Vec<ContentItem>, primary_provider: Option<&str>) -> Vec<ContentItem> {
    let mut merged: Vec<ContentItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = item.dedup_key();
        match index.get(&key) {
            Some(&position) => absorb(&mut merged[position], item, primary_provider),
            None => {
                index.insert(key, merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

fn absorb(canonical: &mut ContentItem, other: ContentItem, primary_provider: Option<&str>) {
    let other_overview = other.overview.trim();
    if other_overview.len() > canonical.overview.trim().len() {
        canonical.overview = other.overview.clone();
    }

    let canonical_is_primary = primary_provider == Some(canonical.source_provider.as_str());
    let other_is_primary = primary_provider == Some(other.source_provider.as_str());
    if other_is_primary && !canonical_is_primary && other.vote_average > 0.0 {
        canonical.vote_average = other.vote_average;
        canonical.vote_count = other.vote_count;
    } else if canonical.vote_average <= 0.0 && other.vote_average > 0.0 {
        canonical.vote_average = other.vote_average;
        canonical.vote_count = canonical.vote_count.max(other.vote_count);
    }

    if canonical.popularity <= 0.0 {
        canonical.popularity = other.popularity;
    }
    if canonical.genres.is_empty() {
        canonical.genres = other.genres;
    }
    if canonical.original_title.is_none() {
        canonical.original_title = other.original_title;
    }
    if canonical.poster_path.is_none() {
        canonical.poster_path = other.poster_path;
    }
    if canonical.backdrop_path.is_none() {
        canonical.backdrop_path = other.backdrop_path;
    }

    canonical.ids.union_with(&other.ids);
    for service in other.resolved_streaming_services {
        if !canonical.resolved_streaming_services.contains(&service) {
            canonical.resolved_streaming_services.push(service);
        }
    }
}
