use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display};

use crate::error::ProviderError;

pub mod genre;
pub mod streaming_availability;
pub mod streaming_service;
pub mod tmdb;
pub mod user_profile;
pub mod watchmode;

pub use streaming_service::StreamingService;
pub use user_profile::{UserId, UserProfile};

/// Kind of title after normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }

    /// Accepts our own names plus the provider spellings ("tv", "tv_series")
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "movie" | "movies" | "film" => Some(MediaType::Movie),
            "series" | "tv" | "tv_series" | "tv_miniseries" | "show" => Some(MediaType::Series),
            _ => None,
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Media type restriction passed by callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaTypeFilter {
    #[default]
    All,
    #[serde(alias = "movies")]
    Movie,
    #[serde(alias = "tv")]
    Series,
}

impl MediaTypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaTypeFilter::All => "all",
            MediaTypeFilter::Movie => "movie",
            MediaTypeFilter::Series => "series",
        }
    }

    pub fn admits(&self, media_type: MediaType) -> bool {
        match self {
            MediaTypeFilter::All => true,
            MediaTypeFilter::Movie => media_type == MediaType::Movie,
            MediaTypeFilter::Series => media_type == MediaType::Series,
        }
    }

    /// The single media type this filter pins, if any
    pub fn media_type(&self) -> Option<MediaType> {
        match self {
            MediaTypeFilter::All => None,
            MediaTypeFilter::Movie => Some(MediaType::Movie),
            MediaTypeFilter::Series => Some(MediaType::Series),
        }
    }
}

impl Display for MediaTypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifiers of one title across providers
///
/// Ids are only ever added by merging, never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchmode: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_availability: Option<String>,
}

impl ExternalIds {
    /// Fills the ids this set is missing from `other`
    pub fn union_with(&mut self, other: &ExternalIds) {
        if self.tmdb.is_none() {
            self.tmdb = other.tmdb;
        }
        if self.watchmode.is_none() {
            self.watchmode = other.watchmode;
        }
        if self.imdb.is_none() {
            self.imdb = other.imdb.clone();
        }
        if self.streaming_availability.is_none() {
            self.streaming_availability = other.streaming_availability.clone();
        }
    }

    /// Watch-history keys for every known id
    pub fn history_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(id) = self.tmdb {
            keys.push(format!("tmdb:{}", id));
        }
        if let Some(id) = self.watchmode {
            keys.push(format!("watchmode:{}", id));
        }
        if let Some(id) = &self.imdb {
            keys.push(format!("imdb:{}", id.trim().to_lowercase()));
        }
        if let Some(id) = &self.streaming_availability {
            keys.push(format!("streaming_availability:{}", id.trim()));
        }
        keys
    }
}

/// Providers whose ids may appear in a watch history
const HISTORY_NAMESPACES: [&str; 4] = ["tmdb", "watchmode", "imdb", "streaming_availability"];

/// Canonical watch-history key, `namespace:id`
///
/// Bare numeric ids are TMDb ids and bare `tt` ids are IMDb ids. Any other id
/// has to name its provider, e.g. `watchmode:1295258`.
pub fn history_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some((namespace, id)) = raw.split_once(':') {
        let namespace = namespace.trim().to_lowercase();
        let id = id.trim();
        if id.is_empty() || !HISTORY_NAMESPACES.contains(&namespace.as_str()) {
            return None;
        }
        let id = if namespace == "imdb" {
            id.to_lowercase()
        } else {
            id.to_string()
        };
        return Some(format!("{}:{}", namespace, id));
    }

    if is_imdb_id(raw) {
        Some(format!("imdb:{}", raw.to_lowercase()))
    } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        Some(format!("tmdb:{}", raw))
    } else {
        None
    }
}

fn is_imdb_id(id: &str) -> bool {
    match (id.get(..2), id.get(2..)) {
        (Some(prefix), Some(digits)) => {
            prefix.eq_ignore_ascii_case("tt")
                && !digits.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Normalized unit of content shared by every provider
///
/// Built only by translating a provider payload (see the `tmdb`, `watchmode`
/// and `streaming_availability` model modules).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Native id in `source_provider`
    pub id: String,
    pub ids: ExternalIds,
    pub title: String,
    pub original_title: Option<String>,
    pub release_year: Option<i32>,
    pub media_type: MediaType,
    /// Always on a 0-10 scale
    pub vote_average: f64,
    pub vote_count: u64,
    pub popularity: f64,
    pub genres: Vec<String>,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub source_provider: String,
    pub resolved_streaming_services: Vec<StreamingService>,
}

impl ContentItem {
    /// Deduplication key: `lower(title)_year_mediatype`
    pub fn dedup_key(&self) -> String {
        let year = self
            .release_year
            .map(|y| y.to_string())
            .unwrap_or_default();
        format!(
            "{}_{}_{}",
            self.title.trim().to_lowercase(),
            year,
            self.media_type.as_str()
        )
    }

    /// Watch-history keys for the native id and every external id
    pub fn history_keys(&self) -> Vec<String> {
        let mut keys = self.ids.history_keys();
        if let Some(native) = history_key(&format!("{}:{}", self.source_provider, self.id)) {
            if !keys.contains(&native) {
                keys.push(native);
            }
        }
        keys
    }

    /// Whether this item appears in a watch history
    ///
    /// History entries are compared as namespaced keys, so equal numbers from
    /// different providers never match each other.
    pub fn is_in_history(&self, history: &BTreeSet<String>) -> bool {
        let keys = self.history_keys();
        history
            .iter()
            .filter_map(|entry| history_key(entry))
            .any(|entry| keys.contains(&entry))
    }
}

/// How a streaming offer is priced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityType {
    Subscription,
    Rent,
    Buy,
    Free,
    Addon,
}

impl AvailabilityType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "sub" | "subscription" => Some(AvailabilityType::Subscription),
            "rent" => Some(AvailabilityType::Rent),
            "buy" | "purchase" => Some(AvailabilityType::Buy),
            "free" => Some(AvailabilityType::Free),
            "addon" => Some(AvailabilityType::Addon),
            _ => None,
        }
    }
}

/// One offer of a title on a streaming service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceAvailability {
    pub service_name: String,
    pub availability_type: AvailabilityType,
    pub quality: Option<String>,
    pub link: Option<String>,
}

impl ServiceAvailability {
    /// Resolves subscription offers into the fixed service vocabulary
    pub fn resolve(offers: &[ServiceAvailability]) -> Vec<StreamingService> {
        StreamingService::resolve_all(
            offers
                .iter()
                .filter(|o| o.availability_type == AvailabilityType::Subscription)
                .map(|o| o.service_name.as_str()),
        )
    }
}

// ============================================================================
// Provider detail payloads
// ============================================================================

/// Details from the primary metadata provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDetails {
    pub item: ContentItem,
    pub keywords: Vec<String>,
    pub directors: Vec<String>,
    pub creators: Vec<String>,
    pub tagline: Option<String>,
    pub runtime_minutes: Option<u32>,
}

/// Details from a streaming-availability provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityDetails {
    pub item: ContentItem,
    pub directors: Option<Vec<String>>,
    pub creators: Option<Vec<String>>,
    pub offers: Vec<ServiceAvailability>,
}

/// Provider-specific detail payload, typed at the translation boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailedItem {
    Metadata(MetadataDetails),
    Availability(AvailabilityDetails),
}

impl DetailedItem {
    pub fn item(&self) -> &ContentItem {
        match self {
            DetailedItem::Metadata(details) => &details.item,
            DetailedItem::Availability(details) => &details.item,
        }
    }

    pub fn keywords(&self) -> &[String] {
        match self {
            DetailedItem::Metadata(details) => &details.keywords,
            DetailedItem::Availability(_) => &[],
        }
    }

    pub fn directors(&self) -> &[String] {
        match self {
            DetailedItem::Metadata(details) => &details.directors,
            DetailedItem::Availability(details) => details.directors.as_deref().unwrap_or(&[]),
        }
    }

    pub fn creators(&self) -> &[String] {
        match self {
            DetailedItem::Metadata(details) => &details.creators,
            DetailedItem::Availability(details) => details.creators.as_deref().unwrap_or(&[]),
        }
    }

    pub fn streaming_services(&self) -> &[StreamingService] {
        &self.item().resolved_streaming_services
    }
}

/// Details plus the streaming services found through a secondary provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDetails {
    pub details: DetailedItem,
    pub enhanced_streaming: Vec<StreamingService>,
    /// Provider the enhanced streaming list came from
    pub streaming_source: Option<String>,
}

impl EnhancedDetails {
    pub fn plain(details: DetailedItem) -> Self {
        Self {
            details,
            enhanced_streaming: Vec::new(),
            streaming_source: None,
        }
    }

    pub fn streaming_services(&self) -> Vec<StreamingService> {
        let mut services: Vec<StreamingService> = self.details.streaming_services().to_vec();
        for service in &self.enhanced_streaming {
            if !services.contains(service) {
                services.push(*service);
            }
        }
        services
    }
}

/// A candidate with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub item: ContentItem,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_info: Option<EnhancedDetails>,
}

impl ScoredCandidate {
    /// Union of services from the list result and from enrichment
    pub fn resolved_streaming_services(&self) -> Vec<StreamingService> {
        let mut services = self.item.resolved_streaming_services.clone();
        if let Some(details) = &self.detailed_info {
            for service in details.streaming_services() {
                if !services.contains(&service) {
                    services.push(service);
                }
            }
        }
        services
    }
}

// ============================================================================
// Provider status and aggregate responses
// ============================================================================

/// Which capability family a provider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    PrimaryMetadata,
    StreamingAvailability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub kind: ProviderKind,
    /// Position in the declared priority order (0 = highest)
    pub priority: usize,
    pub configured: bool,
    pub last_probe_ok: bool,
}

impl ProviderStatus {
    pub fn is_active(&self) -> bool {
        self.configured && self.last_probe_ok
    }
}

/// Why a result list is empty for reasons other than "no matches"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    #[error("no active providers")]
    NoActiveProviders,
    #[error("no providers succeeded")]
    NoProvidersSucceeded,
}

/// Result of a fan-out across providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    pub results: Vec<ContentItem>,
    pub total_results: usize,
    pub providers_used: Vec<String>,
    pub errors: Vec<ProviderError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

impl AggregateResponse {
    pub fn failed(reason: EmptyReason, errors: Vec<ProviderError>) -> Self {
        Self {
            results: Vec::new(),
            total_results: 0,
            providers_used: Vec::new(),
            errors,
            reason: Some(reason),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.reason.is_some()
    }
}

/// Result of a search that walks providers one after another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub results: Vec<ContentItem>,
    pub provider_used: Option<String>,
    pub fallback_used: bool,
    pub providers_tried: Vec<String>,
    pub errors: Vec<ProviderError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

// ============================================================================
// Orchestrator responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub media_type: MediaTypeFilter,
    pub results: Vec<ContentItem>,
    pub total_results: usize,
    pub providers_used: Vec<String>,
    pub errors: Vec<ProviderError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub media_type: MediaTypeFilter,
    pub results: Vec<ContentItem>,
    pub total_results: usize,
    pub providers_used: Vec<String>,
    pub errors: Vec<ProviderError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommendations: Vec<ScoredCandidate>,
    pub errors: Vec<ProviderError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
}
