use futures::{
    future::{join_all, BoxFuture},
    stream, FutureExt, StreamExt,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    cached,
    db::{CacheKey, CacheStore, ProfileStore},
    error::{AppError, AppResult, ProviderError},
    metrics::{MetricsSnapshot, PerformanceMonitor},
    models::{
        genre, history_key, user_profile::NormalizedProfile, AggregateResponse, ContentItem,
        EmptyReason, EnhancedDetails, FallbackResponse, MediaType, MediaTypeFilter,
        ProviderStatus, RecommendationResponse, ScoredCandidate, SearchResponse,
        StreamingService, TrendingResponse, UserId, UserProfile,
    },
    services::{aggregation::AggregationManager, scoring::ScoringEngine},
};

/// Liked genres turned into seed searches
const MAX_GENRE_SEEDS: usize = 3;
/// Liked keywords turned into seed searches
const MAX_KEYWORD_SEEDS: usize = 2;
const GENRE_SEED_RESULTS: usize = 10;
const KEYWORD_SEED_RESULTS: usize = 8;
const TRENDING_SEED_RESULTS: usize = 15;

pub const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 5;

/// Provider health, metrics and cache size in one report
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatusReport {
    pub active: Vec<String>,
    pub providers: Vec<ProviderStatus>,
    pub total_providers: usize,
    pub metrics: MetricsSnapshot,
    pub cache_size: usize,
}

/// Candidates gathered from every seed, already deduplicated
struct CandidatePool {
    items: Vec<ContentItem>,
    errors: Vec<ProviderError>,
    /// Set only when no seed succeeded at all
    reason: Option<EmptyReason>,
}

/// Top-level pipeline behind recommendations, search and trending
///
/// Cache miss path: generate → dedup → enrich → score → sort → store.
pub struct RecommendationOrchestrator {
    aggregation: Arc<AggregationManager>,
    cache: Arc<CacheStore>,
    scoring: ScoringEngine,
    profiles: Arc<dyn ProfileStore>,
    monitor: Arc<PerformanceMonitor>,
    enrichment_concurrency: usize,
}

impl RecommendationOrchestrator {
    pub fn new(
        aggregation: Arc<AggregationManager>,
        cache: Arc<CacheStore>,
        profiles: Arc<dyn ProfileStore>,
        scoring: ScoringEngine,
    ) -> Self {
        let monitor = aggregation.monitor().clone();
        Self {
            aggregation,
            cache,
            scoring,
            profiles,
            monitor,
            enrichment_concurrency: DEFAULT_ENRICHMENT_CONCURRENCY,
        }
    }

    /// Bounds how many candidates are enriched at once
    pub fn with_enrichment_concurrency(mut self, concurrency: usize) -> Self {
        self.enrichment_concurrency = concurrency.max(1);
        self
    }

    pub fn aggregation(&self) -> &Arc<AggregationManager> {
        &self.aggregation
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    /// Ranked recommendations for a stored user, optionally restricted to
    /// services the user names
    pub async fn get_recommendations(
        &self,
        user_id: UserId,
        n: usize,
        filter: MediaTypeFilter,
        streaming_services: Option<Vec<String>>,
    ) -> AppResult<RecommendationResponse> {
        self.monitor.record_request();

        if n == 0 {
            return Err(AppError::InvalidInput("n must be at least 1".to_string()));
        }

        let requested = streaming_services.unwrap_or_default();
        let required =
            StreamingService::resolve_all(requested.iter().map(String::as_str));
        if !requested.is_empty() && required.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "No supported streaming service in {:?}",
                requested
            )));
        }

        let key = CacheKey::recommendations(user_id, n, filter, &required);

        cached!(
            self.cache,
            self.monitor,
            key,
            |response: &RecommendationResponse| response.reason.is_none(),
            async {
                let profile = self
                    .profiles
                    .get_profile(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

                Ok::<_, AppError>(self.recommend(&profile, filter, n, &required).await)
            }
        )
    }

    /// Full pipeline for a profile snapshot, without caching
    pub async fn get_personalized_recommendations(
        &self,
        profile: &UserProfile,
        filter: MediaTypeFilter,
        max_results: usize,
    ) -> RecommendationResponse {
        self.recommend(profile, filter, max_results, &[]).await
    }

    async fn recommend(
        &self,
        profile: &UserProfile,
        filter: MediaTypeFilter,
        max_results: usize,
        required_services: &[StreamingService],
    ) -> RecommendationResponse {
        let normalized = profile.normalized();
        let pool = self.generate_candidates(&normalized, filter).await;
        let pooled = pool.items.len();

        // Only a known rating can fall below the user's floor
        let candidates: Vec<ContentItem> = pool
            .items
            .into_iter()
            .filter(|item| filter.admits(item.media_type))
            .filter(|item| item.vote_count == 0 || item.vote_average >= normalized.min_rating)
            .collect();

        let enriched = self.enrich(candidates).await;

        let mut ranked: Vec<(bool, ScoredCandidate)> = enriched
            .into_iter()
            .map(|(item, details)| {
                let score = self.scoring.score_normalized(
                    &item,
                    &normalized,
                    &profile.watch_history,
                    details.as_ref(),
                );
                let watched = item.is_in_history(&profile.watch_history);
                (
                    watched,
                    ScoredCandidate {
                        item,
                        score,
                        detailed_info: details,
                    },
                )
            })
            .filter(|(_, candidate)| candidate.score > 0.0)
            .filter(|(_, candidate)| {
                required_services.is_empty()
                    || candidate
                        .resolved_streaming_services()
                        .iter()
                        .any(|service| required_services.contains(service))
            })
            .collect();

        ranked.sort_by(|(a_watched, a), (b_watched, b)| {
            a_watched
                .cmp(b_watched)
                .then_with(|| b.score.total_cmp(&a.score))
                .then_with(|| {
                    self.aggregation
                        .priority_of(&a.item.source_provider)
                        .cmp(&self.aggregation.priority_of(&b.item.source_provider))
                })
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        ranked.truncate(max_results);

        let recommendations: Vec<ScoredCandidate> =
            ranked.into_iter().map(|(_, candidate)| candidate).collect();

        tracing::info!(
            user_id = profile.user_id,
            candidates = pooled,
            recommendations = recommendations.len(),
            errors = pool.errors.len(),
            "Recommendations generated"
        );

        RecommendationResponse {
            user_id: profile.user_id,
            recommendations,
            errors: pool.errors,
            reason: pool.reason,
        }
    }

    /// Runs every seed concurrently; each one tolerates failure on its own
    async fn generate_candidates(
        &self,
        normalized: &NormalizedProfile,
        filter: MediaTypeFilter,
    ) -> CandidatePool {
        let mut seeds: Vec<BoxFuture<'_, AggregateResponse>> = Vec::new();

        for liked in normalized.genres_liked.iter().take(MAX_GENRE_SEEDS) {
            let term = genre::search_term(liked);
            seeds.push(
                async move {
                    self.aggregation
                        .search_parallel(&term, filter, GENRE_SEED_RESULTS)
                        .await
                }
                .boxed(),
            );
        }

        for keyword in normalized.keywords_liked.iter().take(MAX_KEYWORD_SEEDS) {
            let term = keyword.clone();
            seeds.push(
                async move {
                    self.aggregation
                        .search_parallel(&term, filter, KEYWORD_SEED_RESULTS)
                        .await
                }
                .boxed(),
            );
        }

        seeds.push(
            self.aggregation
                .get_trending_parallel(filter, TRENDING_SEED_RESULTS)
                .boxed(),
        );

        let responses = join_all(seeds).await;

        let mut items = Vec::new();
        let mut errors: Vec<ProviderError> = Vec::new();
        let mut reasons = Vec::new();
        let mut succeeded = false;

        for response in responses {
            match response.reason {
                Some(reason) => reasons.push(reason),
                None => succeeded = true,
            }
            for error in response.errors {
                if !errors.contains(&error) {
                    errors.push(error);
                }
            }
            items.extend(response.results);
        }

        let reason = if succeeded {
            None
        } else if reasons.contains(&EmptyReason::NoActiveProviders) {
            Some(EmptyReason::NoActiveProviders)
        } else {
            Some(EmptyReason::NoProvidersSucceeded)
        };

        CandidatePool {
            items: self.aggregation.merge_and_dedup(items),
            errors,
            reason,
        }
    }

    /// Fetches details for every candidate through a bounded pool
    ///
    /// Each lookup is bounded by the provider timeout inside the aggregation
    /// layer. A candidate whose details fetch fails keeps its place with no
    /// details attached.
    async fn enrich(&self, items: Vec<ContentItem>) -> Vec<(ContentItem, Option<EnhancedDetails>)> {
        let mut enriched: Vec<(usize, ContentItem, Option<EnhancedDetails>)> =
            stream::iter(items.into_iter().enumerate())
                .map(|(index, item)| async move {
                    let details = match self
                        .aggregation
                        .get_enhanced_details(
                            &item.id,
                            item.media_type,
                            Some(item.source_provider.as_str()),
                        )
                        .await
                    {
                        Ok(details) => Some(details),
                        Err(e) => {
                            tracing::debug!(id = %item.id, error = %e, "Enrichment skipped");
                            None
                        }
                    };
                    (index, item, details)
                })
                .buffer_unordered(self.enrichment_concurrency.max(1))
                .collect()
                .await;

        enriched.sort_by_key(|(index, _, _)| *index);
        enriched
            .into_iter()
            .map(|(_, item, details)| (item, details))
            .collect()
    }

    pub async fn search(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        max_results: usize,
    ) -> AppResult<SearchResponse> {
        self.monitor.record_request();

        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query cannot be empty".to_string()));
        }
        if max_results == 0 {
            return Err(AppError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }

        let key = CacheKey::Search {
            query: query.to_lowercase(),
            filter,
            max_results,
        };

        // Entries are shared across spellings of the same query
        let result: AppResult<SearchResponse> = cached!(
            self.cache,
            self.monitor,
            key,
            |response: &SearchResponse| response.reason.is_none(),
            async {
                let aggregate = self
                    .aggregation
                    .search_parallel(query, filter, max_results)
                    .await;

                Ok::<_, AppError>(SearchResponse {
                    query: query.to_string(),
                    media_type: filter,
                    results: aggregate.results,
                    total_results: aggregate.total_results,
                    providers_used: aggregate.providers_used,
                    errors: aggregate.errors,
                    reason: aggregate.reason,
                })
            }
        );

        let mut response = result?;
        response.query = query.to_string();
        Ok(response)
    }

    pub async fn get_trending(
        &self,
        filter: MediaTypeFilter,
        max_results: usize,
    ) -> AppResult<TrendingResponse> {
        self.monitor.record_request();

        if max_results == 0 {
            return Err(AppError::InvalidInput(
                "max_results must be at least 1".to_string(),
            ));
        }

        let key = CacheKey::Trending {
            filter,
            max_results,
        };

        cached!(
            self.cache,
            self.monitor,
            key,
            |response: &TrendingResponse| response.reason.is_none(),
            async {
                let aggregate = self
                    .aggregation
                    .get_trending_parallel(filter, max_results)
                    .await;

                Ok::<_, AppError>(TrendingResponse {
                    media_type: filter,
                    results: aggregate.results,
                    total_results: aggregate.total_results,
                    providers_used: aggregate.providers_used,
                    errors: aggregate.errors,
                    reason: aggregate.reason,
                })
            }
        )
    }

    pub async fn search_with_fallback(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        provider: Option<&str>,
    ) -> AppResult<FallbackResponse> {
        self.monitor.record_request();

        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query cannot be empty".to_string()));
        }
        if let Some(name) = provider {
            self.ensure_known_provider(name)?;
        }

        Ok(self
            .aggregation
            .search_with_fallback(query, filter, provider)
            .await)
    }

    pub async fn get_enhanced_details(
        &self,
        id: &str,
        media_type: MediaType,
        provider: Option<&str>,
    ) -> AppResult<EnhancedDetails> {
        self.monitor.record_request();

        if let Some(name) = provider {
            self.ensure_known_provider(name)?;
        }

        Ok(self
            .aggregation
            .get_enhanced_details(id, media_type, provider)
            .await?)
    }

    fn ensure_known_provider(&self, name: &str) -> AppResult<()> {
        if self.aggregation.provider_names().contains(&name) {
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!("Unknown provider: {}", name)))
        }
    }

    /// Provider health with metrics; `refresh` re-probes every provider first
    pub async fn get_provider_status(&self, refresh: bool) -> ProviderStatusReport {
        if refresh {
            self.aggregation.test_all_providers().await;
        }

        let providers = self.aggregation.statuses().await;
        let active = providers
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.name.clone())
            .collect();

        ProviderStatusReport {
            active,
            total_providers: providers.len(),
            providers,
            metrics: self.monitor.snapshot(),
            cache_size: self.cache.len(),
        }
    }

    /// Drops every cached entry and returns how many there were
    pub fn clear_cache(&self) -> usize {
        let cleared = self.cache.len();
        self.cache.clear();
        tracing::info!(cleared, "Cache cleared");
        cleared
    }

    pub fn supported_streaming_services(&self) -> Vec<&'static str> {
        StreamingService::ALL.iter().map(|s| s.as_str()).collect()
    }

    /// Appends to the user's history, then drops the user's cached results
    ///
    /// Ids are stored as namespaced keys (`tmdb:603`, `watchmode:1295258`).
    pub async fn update_watch_history(&self, user_id: UserId, item_id: &str) -> AppResult<bool> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(AppError::InvalidInput("item_id cannot be empty".to_string()));
        }
        let key = history_key(item_id).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Unrecognised item id {:?}; use a TMDb id, an IMDb id or provider:id",
                item_id
            ))
        })?;

        let appended = self.profiles.append_watch_history(user_id, &key).await?;
        let invalidated = self.cache.invalidate_for_user(user_id);

        tracing::info!(
            user_id,
            item_id = %key,
            appended,
            invalidated,
            "Watch history updated"
        );

        Ok(appended)
    }
}
