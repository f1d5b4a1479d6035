/// Content provider abstraction
///
/// Each provider talks to one external content-metadata service and translates
/// its payloads into the shared `ContentItem`/`DetailedItem` model at the
/// boundary. Providers never fail the caller: every error comes back as a
/// `ProviderError` value naming the provider.
use reqwest::{Client as HttpClient, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{
    error::{ProviderError, ProviderErrorKind, ProviderResult},
    models::{ContentItem, DetailedItem, MediaType, MediaTypeFilter, ProviderKind, StreamingService},
};

pub mod streaming_availability;
pub mod tmdb;
pub mod watchmode;

pub use streaming_availability::StreamingAvailabilityProvider;
pub use tmdb::TmdbProvider;
pub use watchmode::WatchmodeProvider;

/// Trait for content providers
///
/// Implementations are registered with the aggregation layer in priority
/// order; the first registered provider is the most trusted one.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider name for logging, diagnostics and priority lookups
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Whether a credential is present
    fn is_configured(&self) -> bool;

    /// Cheap liveness probe without side effects
    async fn test_connection(&self) -> bool;

    async fn search_content(
        &self,
        query: &str,
        filter: MediaTypeFilter,
        page: u32,
    ) -> ProviderResult<Vec<ContentItem>>;

    async fn get_trending(&self, filter: MediaTypeFilter) -> ProviderResult<Vec<ContentItem>>;

    async fn get_details(&self, id: &str, media_type: MediaType) -> ProviderResult<DetailedItem>;

    /// Subscription services carrying an item, keyed by this provider's id
    ///
    /// Only streaming-availability providers answer this.
    async fn get_streaming_services(&self, id: &str) -> ProviderResult<Vec<StreamingService>> {
        let _ = id;
        Err(ProviderError::unsupported(self.name(), "get_streaming_services"))
    }
}

/// Builds the shared HTTP client with the per-call timeout applied
pub fn build_http_client(timeout: Duration) -> HttpClient {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            HttpClient::new()
        })
}

/// Sends a request and decodes a JSON body, classifying every failure
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> ProviderResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            provider = %provider,
            status = status.as_u16(),
            body = %body,
            "Provider returned error status"
        );
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::Http(status.as_u16()),
        ));
    }

    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            provider = %provider,
            error = %e,
            "Failed to deserialize provider response"
        );
        ProviderError::parse(provider, e.to_string())
    })
}

/// Probe helper: any 2xx answer counts as alive
pub(crate) async fn probe(provider: &str, request: RequestBuilder) -> bool {
    match request.send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "Connection probe failed");
            false
        }
    }
}

pub(crate) fn not_configured(provider: &str) -> ProviderError {
    ProviderError::unavailable(provider, "no API key configured")
}
