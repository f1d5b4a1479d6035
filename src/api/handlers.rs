use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        EnhancedDetails, FallbackResponse, MediaType, MediaTypeFilter, RecommendationResponse,
        SearchResponse, TrendingResponse, UserId,
    },
    services::ProviderStatusReport,
};

use super::AppState;

const DEFAULT_RECOMMENDATIONS: usize = 10;
const DEFAULT_MAX_RESULTS: usize = 20;
const MAX_RESULTS_LIMIT: usize = 100;

// Request types

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub n: Option<usize>,
    #[serde(default)]
    pub media_type: MediaTypeFilter,
    /// Comma-separated service names
    pub streaming_services: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub media_type: MediaTypeFilter,
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FallbackQuery {
    pub q: String,
    #[serde(default)]
    pub media_type: MediaTypeFilter,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    #[serde(default)]
    pub media_type: MediaTypeFilter,
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct WatchHistoryRequest {
    pub item_id: String,
}

fn clamp_results(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).min(MAX_RESULTS_LIMIT)
}

fn split_services(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let n = clamp_results(params.n, DEFAULT_RECOMMENDATIONS);
    let response = state
        .orchestrator
        .get_recommendations(
            user_id,
            n,
            params.media_type,
            split_services(params.streaming_services),
        )
        .await?;
    Ok(Json(response))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let max_results = clamp_results(params.max_results, DEFAULT_MAX_RESULTS);
    let response = state
        .orchestrator
        .search(&params.q, params.media_type, max_results)
        .await?;
    Ok(Json(response))
}

pub async fn search_with_fallback(
    State(state): State<AppState>,
    Query(params): Query<FallbackQuery>,
) -> AppResult<Json<FallbackResponse>> {
    let response = state
        .orchestrator
        .search_with_fallback(&params.q, params.media_type, params.provider.as_deref())
        .await?;
    Ok(Json(response))
}

pub async fn get_trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingQuery>,
) -> AppResult<Json<TrendingResponse>> {
    let max_results = clamp_results(params.max_results, DEFAULT_MAX_RESULTS);
    let response = state
        .orchestrator
        .get_trending(params.media_type, max_results)
        .await?;
    Ok(Json(response))
}

/// Details for one title, enriched with streaming data when available
pub async fn get_title_details(
    State(state): State<AppState>,
    Path((media_type, id)): Path<(String, String)>,
    Query(params): Query<DetailsQuery>,
) -> AppResult<Json<EnhancedDetails>> {
    let media_type = MediaType::parse(&media_type)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown media type: {}", media_type)))?;

    let details = state
        .orchestrator
        .get_enhanced_details(&id, media_type, params.provider.as_deref())
        .await?;
    Ok(Json(details))
}

pub async fn get_provider_status(
    State(state): State<AppState>,
    Query(params): Query<StatusQuery>,
) -> Json<ProviderStatusReport> {
    Json(state.orchestrator.get_provider_status(params.refresh).await)
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.orchestrator.clear_cache();
    Json(json!({ "cleared": cleared }))
}

pub async fn get_streaming_services(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "services": state.orchestrator.supported_streaming_services() }))
}

pub async fn update_watch_history(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<WatchHistoryRequest>,
) -> AppResult<Json<Value>> {
    let updated = state
        .orchestrator
        .update_watch_history(user_id, &request.item_id)
        .await?;
    Ok(Json(json!({ "user_id": user_id, "item_id": request.item_id, "updated": updated })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_services() {
        assert_eq!(
            split_services(Some("netflix, hulu,,".to_string())),
            Some(vec!["netflix".to_string(), "hulu".to_string()])
        );
        assert_eq!(split_services(None), None);
    }

    #[test]
    fn test_clamp_results() {
        assert_eq!(clamp_results(None, 20), 20);
        assert_eq!(clamp_results(Some(5000), 20), MAX_RESULTS_LIMIT);
    }
}
