/// TMDb provider
///
/// The primary metadata source: richest genres, keywords, credits and the only
/// provider whose vote counts are meaningful.
///
/// API Flow:
/// 1. Probe: /configuration
/// 2. Search: /search/{multi|movie|tv}
/// 3. Trending: /trending/{all|movie|tv}/week
/// 4. Details: /{movie|tv}/{id}?append_to_response=credits,keywords,watch/providers
use reqwest::Client as HttpClient;

use crate::{
    config::non_empty,
    error::{ProviderError, ProviderResult},
    models::{
        tmdb::{path_segment, TmdbDetails, TmdbListResponse, PROVIDER_NAME},
        ContentItem, DetailedItem, MediaType, MediaTypeFilter, ProviderKind,
    },
    services::providers::{fetch_json, not_configured, probe, ProviderClient},
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    language: String,
    region: String,
}

impl TmdbProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<String>,
        api_url: String,
        language: String,
        region: String,
    ) -> Self {
        Self {
            http_client,
            api_key: non_empty(&api_key).map(str::to_string),
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            region,
        }
    }

    fn key(&self) -> ProviderResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| not_configured(PROVIDER_NAME))
    }

    async fn fetch_list(
        &self,
        url: String,
        extra: &[(&str, String)],
        endpoint_type: Option<MediaType>,
        filter: MediaTypeFilter,
    ) -> ProviderResult<Vec<ContentItem>> {
        let api_key = self.key()?;

        let request = self
            .http_client
            .get(&url)
            .query(&[("api_key", api_key), ("language", self.language.as_str())])
            .query(extra);

        let response: TmdbListResponse = fetch_json(PROVIDER_NAME, request).await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|item| item.into_content_item(endpoint_type))
            .filter(|item| filter.admits(item.media_type))
            .collect())
    }
}

fn list_segment(filter: MediaTypeFilter, all: &'static str) -> &'static str {
    match filter.media_type() {
        Some(media_type) => path_segment(media_type),
        None => all,
    }
}

#[async_trait::async_trait]
impl ProviderClient for TmdbProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::PrimaryMetadata
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
            .get(format!("{}/configuration", self.api_url))
            .query(&[("api_key", api_key)]);
        probe(PROVIDER_NAME, request).await
    }

    async fn search_content(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        page: u32,
    ) -> ProviderResult<Vec<ContentItem>> {
        let url = format!("{}/search/{}", self.api_url, list_segment(filter, "multi"));
        let extra = [
            ("query", query.to_string()),
            ("page", page.max(1).to_string()),
            ("include_adult", "false".to_string()),
        ];

        let items = self
            .fetch_list(url, &extra, filter.media_type(), filter)
            .await?;

        tracing::info!(
            query = %query,
            results = items.len(),
            provider = PROVIDER_NAME,
            "Content search completed"
        );

        Ok(items)
    }

    async fn get_trending(&self, filter: MediaTypeFilter) -> ProviderResult<Vec<ContentItem>> {
        let url = format!(
            "{}/trending/{}/week",
            self.api_url,
            list_segment(filter, "all")
        );

        let items = self
            .fetch_list(url, &[], filter.media_type(), filter)
            .await?;

        tracing::info!(
            media_type = %filter,
            results = items.len(),
            provider = PROVIDER_NAME,
            "Trending fetch completed"
        );

        Ok(items)
    }

    async fn get_details(&self, id: &str, media_type: MediaType) -> ProviderResult<DetailedItem> {
        let api_key = self.key()?;
        let url = format!("{}/{}/{}", self.api_url, path_segment(media_type), id);

        let request = self.http_client.get(&url).query(&[
            ("api_key", api_key),
            ("language", self.language.as_str()),
            ("append_to_response", "credits,keywords,watch/providers"),
        ]);

        let details: TmdbDetails = fetch_json(PROVIDER_NAME, request).await?;

        details
            .into_detailed(media_type, &self.region)
            .ok_or_else(|| ProviderError::parse(PROVIDER_NAME, "details without a title"))
    }
}
