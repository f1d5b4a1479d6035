/// Streaming Availability API provider (via RapidAPI)
///
/// Secondary streaming-availability source. Ratings arrive on a 0-100 scale
/// and are scaled down during translation. There is no global trending
/// endpoint, so trending is stitched from the per-service top charts.
use futures::future::join_all;
use reqwest::{Client as HttpClient, RequestBuilder};

use crate::{
    config::non_empty,
    error::{ProviderError, ProviderResult},
    models::{
        streaming_availability::{show_type_param, ApiShow, PROVIDER_NAME},
        ContentItem, DetailedItem, MediaType, MediaTypeFilter, ProviderKind, StreamingService,
    },
    services::providers::{fetch_json, not_configured, probe, ProviderClient},
};

/// Services whose top charts make up the trending list
const TOP_CHART_SERVICES: &[&str] = &["netflix", "prime", "disney", "hbo"];

#[derive(Clone)]
pub struct StreamingAvailabilityProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    country: String,
    language: String,
}

impl StreamingAvailabilityProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<String>,
        api_url: String,
        region: &str,
        language: &str,
    ) -> Self {
        Self {
            http_client,
            api_key: non_empty(&api_key).map(str::to_string),
            api_url: api_url.trim_end_matches('/').to_string(),
            country: region.to_lowercase(),
            language: language
                .split('-')
                .next()
                .unwrap_or("en")
                .to_lowercase(),
        }
    }

    fn get(&self, path: &str) -> ProviderResult<RequestBuilder> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| not_configured(PROVIDER_NAME))?;

        Ok(self
            .http_client
            .get(format!("{}{}", self.api_url, path))
            .header("X-RapidAPI-Key", api_key)
            .query(&[
                ("country", self.country.as_str()),
                ("output_language", self.language.as_str()),
            ]))
    }

    fn translate_shows(&self, shows: Vec<ApiShow>, filter: MediaTypeFilter) -> Vec<ContentItem> {
        shows
            .into_iter()
            .filter_map(|show| show.into_content_item(&self.country))
            .filter(|item| filter.admits(item.media_type))
            .collect()
    }

    async fn top_chart(
        &self,
        service: &str,
        filter: MediaTypeFilter,
    ) -> ProviderResult<Vec<ContentItem>> {
        let mut request = self.get("/shows/top")?.query(&[("service", service)]);
        if let Some(media_type) = filter.media_type() {
            request = request.query(&[("show_type", show_type_param(media_type))]);
        }

        let shows: Vec<ApiShow> = fetch_json(PROVIDER_NAME, request).await?;
        Ok(self.translate_shows(shows, filter))
    }
}

#[async_trait::async_trait]
impl ProviderClient for StreamingAvailabilityProvider {
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
        match self.get(&format!("/countries/{}", self.country)) {
            Ok(request) => probe(PROVIDER_NAME, request).await,
            Err(_) => false,
        }
    }

    async fn search_content(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        _page: u32,
    ) -> ProviderResult<Vec<ContentItem>> {
        let mut request = self.get("/shows/search/title")?.query(&[("title", query)]);
        if let Some(media_type) = filter.media_type() {
            request = request.query(&[("show_type", show_type_param(media_type))]);
        }

        let shows: Vec<ApiShow> = fetch_json(PROVIDER_NAME, request).await?;
        let items = self.translate_shows(shows, filter);

        tracing::info!(
            query = %query,
            results = items.len(),
            provider = PROVIDER_NAME,
            "Content search completed"
        );

        Ok(items)
    }

    async fn get_trending(&self, filter: MediaTypeFilter) -> ProviderResult<Vec<ContentItem>> {
        let charts = join_all(
            TOP_CHART_SERVICES
                .iter()
                .map(|service| self.top_chart(service, filter)),
        )
        .await;

        let mut items: Vec<ContentItem> = Vec::new();
        let mut first_error = None;
        for chart in charts {
            match chart {
                Ok(chart) => {
                    for item in chart {
                        if !items.iter().any(|seen| seen.id == item.id) {
                            items.push(item);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, provider = PROVIDER_NAME, "Top chart fetch failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        // Partial charts are fine; only a complete failure is an error
        if items.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        tracing::info!(
            media_type = %filter,
            results = items.len(),
            provider = PROVIDER_NAME,
            "Trending fetch completed"
        );

        Ok(items)
    }

    async fn get_details(&self, id: &str, _media_type: MediaType) -> ProviderResult<DetailedItem> {
        let request = self.get(&format!("/shows/{}", id))?;
        let show: ApiShow = fetch_json(PROVIDER_NAME, request).await?;

        show.into_detailed(&self.country)
            .ok_or_else(|| ProviderError::parse(PROVIDER_NAME, "show without a title"))
    }

    async fn get_streaming_services(&self, id: &str) -> ProviderResult<Vec<StreamingService>> {
        let request = self.get(&format!("/shows/{}", id))?;
        let show: ApiShow = fetch_json(PROVIDER_NAME, request).await?;

        let services = show
            .into_content_item(&self.country)
            .map(|item| item.resolved_streaming_services)
            .unwrap_or_default();

        tracing::info!(
            id = %id,
            services = services.len(),
            provider = PROVIDER_NAME,
            "Availability fetched"
        );

        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use serde_json::json;

    fn create_test_provider(api_key: Option<&str>) -> StreamingAvailabilityProvider {
        StreamingAvailabilityProvider::new(
            HttpClient::new(),
            api_key.map(str::to_string),
            "http://127.0.0.1:9/".to_string(),
            "US",
            "en-US",
        )
    }

    #[test]
    fn test_region_and_language_are_normalized() {
        let provider = create_test_provider(Some("test_key"));
        assert_eq!(provider.country, "us");
        assert_eq!(provider.language, "en");
        assert_eq!(provider.api_url, "http://127.0.0.1:9");
    }

    #[test]
    fn test_translate_shows_applies_filter() {
        let provider = create_test_provider(Some("test_key"));
        let shows: Vec<ApiShow> = serde_json::from_value(json!([
            {"id": "1", "showType": "movie", "title": "Heat", "releaseYear": 1995, "rating": 83},
            {"id": "2", "showType": "series", "title": "Dark", "firstAirYear": 2017, "rating": 87},
            {"id": "3", "showType": "movie", "title": ""}
        ]))
        .unwrap();

        let movies = provider.translate_shows(shows.clone(), MediaTypeFilter::Movie);
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].title, "Heat");

        let all = provider.translate_shows(shows, MediaTypeFilter::All);
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_unavailable() {
        let provider = create_test_provider(None);
        assert!(!provider.is_configured());
        assert!(!provider.test_connection().await);

        let err = provider
            .get_details("82", MediaType::Movie)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ProviderErrorKind::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_trending_failure_is_reported_once() {
        let err = create_test_provider(None)
            .get_trending(MediaTypeFilter::All)
            .await
            .unwrap_err();
        assert_eq!(err.provider, "streaming_availability");
    }
}
