/// Watchmode API provider
///
/// Streaming-availability source. Titles carry Watchmode's own ids plus the
/// TMDb/IMDB ids when Watchmode knows them, which lets merged results keep
/// every id.
///
/// API Flow:
/// 1. Probe: /regions/
/// 2. Search: /search/?search_field=name → `title_results` (entries use `name`)
/// 3. Trending: /list-titles/?sort_by=popularity_desc → `titles` (entries use `title`)
/// 4. Details: /title/{id}/details/?append_to_response=sources
/// 5. Sources: /title/{id}/sources/?regions=..
use reqwest::Client as HttpClient;

use crate::{
    config::non_empty,
    error::{ProviderError, ProviderResult},
    models::{
        watchmode::{
            type_param, WatchmodeListResponse, WatchmodeSearchResponse, WatchmodeSourcesResponse,
            WatchmodeTitleDetails, PROVIDER_NAME,
        },
        ContentItem, DetailedItem, MediaType, MediaTypeFilter, ProviderKind,
        ServiceAvailability, StreamingService,
    },
    services::providers::{fetch_json, not_configured, probe, ProviderClient},
};

const TRENDING_LIMIT: usize = 20;

#[derive(Clone)]
pub struct WatchmodeProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    region: String,
}

impl WatchmodeProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<String>,
        api_url: String,
        region: String,
    ) -> Self {
        Self {
            http_client,
            api_key: non_empty(&api_key).map(str::to_string),
            api_url: api_url.trim_end_matches('/').to_string(),
            region,
        }
    }

    fn key(&self) -> ProviderResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| not_configured(PROVIDER_NAME))
    }

    /// Query pairs shared by list endpoints, with the type filter when pinned
    fn list_params<'a>(&'a self, api_key: &'a str, filter: MediaTypeFilter) -> Vec<(&'a str, &'a str)> {
        let mut params = vec![("apiKey", api_key)];
        if let Some(media_type) = filter.media_type() {
            params.push(("types", type_param(media_type)));
        }
        params
    }
}

#[async_trait::async_trait]
impl ProviderClient for WatchmodeProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::StreamingAvailability
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn test_connection(&self) -> bool {
        let Ok(api_key) = self.key() else {
            return false;
        };
        let request = self
            .http_client
            .get(format!("{}/regions/", self.api_url))
            .query(&[("apiKey", api_key)]);
        probe(PROVIDER_NAME, request).await
    }

    async fn search_content(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        _page: u32,
    ) -> ProviderResult<Vec<ContentItem>> {
        let api_key = self.key()?;
        let url = format!("{}/search/", self.api_url);

        let request = self
            .http_client
            .get(&url)
            .query(&self.list_params(api_key, filter))
            .query(&[("search_field", "name"), ("search_value", query)]);

        let response: WatchmodeSearchResponse = fetch_json(PROVIDER_NAME, request).await?;

        let items: Vec<ContentItem> = response
            .title_results
            .into_iter()
            .filter_map(|title| title.into_content_item())
            .filter(|item| filter.admits(item.media_type))
            .collect();

        tracing::info!(
            query = %query,
            results = items.len(),
            provider = PROVIDER_NAME,
            "Content search completed"
        );

        Ok(items)
    }

    async fn get_trending(&self, filter: MediaTypeFilter) -> ProviderResult<Vec<ContentItem>> {
        let api_key = self.key()?;
        let url = format!("{}/list-titles/", self.api_url);

        let request = self
            .http_client
            .get(&url)
            .query(&self.list_params(api_key, filter))
            .query(&[("sort_by", "popularity_desc"), ("page", "1")]);

        let response: WatchmodeListResponse = fetch_json(PROVIDER_NAME, request).await?;

        let items: Vec<ContentItem> = response
            .titles
            .into_iter()
            .filter_map(|title| title.into_content_item())
            .filter(|item| filter.admits(item.media_type))
            .take(TRENDING_LIMIT)
            .collect();

        tracing::info!(
            media_type = %filter,
            results = items.len(),
            provider = PROVIDER_NAME,
            "Trending fetch completed"
        );

        Ok(items)
    }

    async fn get_details(&self, id: &str, _media_type: MediaType) -> ProviderResult<DetailedItem> {
        let api_key = self.key()?;
        let url = format!("{}/title/{}/details/", self.api_url, id);

        let request = self.http_client.get(&url).query(&[
            ("apiKey", api_key),
            ("append_to_response", "sources"),
            ("regions", self.region.as_str()),
        ]);

        let details: WatchmodeTitleDetails = fetch_json(PROVIDER_NAME, request).await?;

        details
            .into_detailed()
            .ok_or_else(|| ProviderError::parse(PROVIDER_NAME, "details without a title"))
    }

    async fn get_streaming_services(&self, id: &str) -> ProviderResult<Vec<StreamingService>> {
        let api_key = self.key()?;
        let url = format!("{}/title/{}/sources/", self.api_url, id);

        let request = self
            .http_client
            .get(&url)
            .query(&[("apiKey", api_key), ("regions", self.region.as_str())]);

        let sources: WatchmodeSourcesResponse = fetch_json(PROVIDER_NAME, request).await?;
        let services = ServiceAvailability::resolve(&sources.into_offers());

        tracing::debug!(
            id = %id,
            services = services.len(),
            provider = PROVIDER_NAME,
            "Streaming sources resolved"
        );

        Ok(services)
    }
}
