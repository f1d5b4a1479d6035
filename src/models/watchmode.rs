//! Watchmode wire payloads and their translation into the shared model.

use serde::Deserialize;

use super::{
    tmdb::non_blank, AvailabilityDetails, AvailabilityType, ContentItem, DetailedItem,
    ExternalIds, MediaType, ServiceAvailability,
};

pub const PROVIDER_NAME: &str = "watchmode";

/// `/search/` response
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSearchResponse {
    #[serde(default)]
    pub title_results: Vec<WatchmodeTitle>,
}

/// `/list-titles/` response
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeListResponse {
    #[serde(default)]
    pub titles: Vec<WatchmodeTitle>,
}

/// Title entry shared by search (`name`) and list (`title`) results
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeTitle {
    pub id: u64,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub title_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub critic_score: Option<f64>,
    #[serde(default)]
    pub plot_overview: Option<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub relevance_percentile: Option<f64>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
}

impl WatchmodeTitle {
    pub fn into_content_item(self) -> Option<ContentItem> {
        let title = non_blank(self.name)?;
        Some(ContentItem {
            id: self.id.to_string(),
            ids: ExternalIds {
                watchmode: Some(self.id),
                tmdb: self.tmdb_id,
                imdb: self.imdb_id,
                ..Default::default()
            },
            title,
            original_title: None,
            release_year: self.year,
            media_type: media_type_of(self.title_type.as_deref()),
            vote_average: rating_of(self.user_rating, self.critic_score),
            vote_count: 0,
            popularity: self.relevance_percentile.unwrap_or(0.0),
            genres: self.genre_names,
            overview: self.plot_overview.unwrap_or_default(),
            poster_path: self.poster,
            backdrop_path: self.backdrop,
            source_provider: PROVIDER_NAME.to_string(),
            resolved_streaming_services: Vec::new(),
        })
    }
}

/// `/title/{id}/details/?append_to_response=sources`
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeTitleDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(rename = "type", default)]
    pub title_type: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub user_rating: Option<f64>,
    #[serde(default)]
    pub critic_score: Option<f64>,
    #[serde(default)]
    pub plot_overview: Option<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    #[serde(default)]
    pub relevance_percentile: Option<f64>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<WatchmodeSource>>,
}

impl WatchmodeTitleDetails {
    pub fn into_detailed(self) -> Option<DetailedItem> {
        let title = non_blank(self.title)?;
        let offers = offers_from_sources(self.sources.unwrap_or_default());

        let item = ContentItem {
            id: self.id.to_string(),
            ids: ExternalIds {
                watchmode: Some(self.id),
                tmdb: self.tmdb_id,
                imdb: self.imdb_id,
                ..Default::default()
            },
            title,
            original_title: self.original_title,
            release_year: self.year,
            media_type: media_type_of(self.title_type.as_deref()),
            vote_average: rating_of(self.user_rating, self.critic_score),
            vote_count: 0,
            popularity: self.relevance_percentile.unwrap_or(0.0),
            genres: self.genre_names,
            overview: self.plot_overview.unwrap_or_default(),
            poster_path: self.poster,
            backdrop_path: self.backdrop,
            source_provider: PROVIDER_NAME.to_string(),
            resolved_streaming_services: ServiceAvailability::resolve(&offers),
        };

        Some(DetailedItem::Availability(AvailabilityDetails {
            item,
            directors: None,
            creators: None,
            offers,
        }))
    }
}

/// Watchmode streaming source
#[derive(Debug, Clone, Deserialize)]
pub struct WatchmodeSource {
    pub name: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// `/title/{id}/sources/` is a bare array; older payloads wrap it
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WatchmodeSourcesResponse {
    List(Vec<WatchmodeSource>),
    Wrapped { sources: Vec<WatchmodeSource> },
}

impl WatchmodeSourcesResponse {
    pub fn into_offers(self) -> Vec<ServiceAvailability> {
        match self {
            WatchmodeSourcesResponse::List(sources)
            | WatchmodeSourcesResponse::Wrapped { sources } => offers_from_sources(sources),
        }
    }
}

/// Sources with an unknown offer type are skipped
pub fn offers_from_sources(sources: Vec<WatchmodeSource>) -> Vec<ServiceAvailability> {
    sources
        .into_iter()
        .filter_map(|source| {
            let availability_type = AvailabilityType::parse(&source.source_type)?;
            Some(ServiceAvailability {
                service_name: source.name,
                availability_type,
                quality: source.format,
                link: source.web_url,
            })
        })
        .collect()
}

/// Type filter value for `types=`
pub fn type_param(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Series => "tv_series",
    }
}

fn media_type_of(title_type: Option<&str>) -> MediaType {
    match title_type {
        Some(kind) if kind.starts_with("tv_") && kind != "tv_movie" => MediaType::Series,
        _ => MediaType::Movie,
    }
}

/// `user_rating` is already 0-10; `critic_score` is 0-100
fn rating_of(user_rating: Option<f64>, critic_score: Option<f64>) -> f64 {
    user_rating
        .or_else(|| critic_score.map(|score| score / 10.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamingService;
    use serde_json::json;

    #[test]
    fn test_search_result_uses_name() {
        let raw = json!({
            "title_results": [{
                "id": 1295258,
                "name": "Breaking Bad",
                "type": "tv_series",
                "year": 2008,
                "imdb_id": "tt0903747",
                "tmdb_id": 1396,
                "tmdb_type": "tv"
            }]
        });
        let response: WatchmodeSearchResponse = serde_json::from_value(raw).unwrap();
        let item = response.title_results[0].clone().into_content_item().unwrap();

        assert_eq!(item.title, "Breaking Bad");
        assert_eq!(item.media_type, MediaType::Series);
        assert_eq!(item.ids.watchmode, Some(1295258));
        assert_eq!(item.ids.tmdb, Some(1396));
        assert_eq!(item.vote_average, 0.0);
        assert_eq!(item.source_provider, "watchmode");
    }

    #[test]
    fn test_list_result_uses_title() {
        let raw = json!({
            "titles": [{"id": 3173903, "title": "Dune", "type": "movie", "year": 2021}]
        });
        let response: WatchmodeListResponse = serde_json::from_value(raw).unwrap();
        let item = response.titles[0].clone().into_content_item().unwrap();
        assert_eq!(item.title, "Dune");
        assert_eq!(item.media_type, MediaType::Movie);
    }

    #[test]
    fn test_critic_score_is_scaled_when_user_rating_missing() {
        assert_eq!(rating_of(Some(7.4), Some(90.0)), 7.4);
        assert_eq!(rating_of(None, Some(85.0)), 8.5);
        assert_eq!(rating_of(None, None), 0.0);
    }

    #[test]
    fn test_tv_movie_is_a_movie() {
        assert_eq!(media_type_of(Some("tv_movie")), MediaType::Movie);
        assert_eq!(media_type_of(Some("tv_miniseries")), MediaType::Series);
        assert_eq!(media_type_of(None), MediaType::Movie);
    }

    #[test]
    fn test_details_resolve_subscription_sources() {
        let raw = json!({
            "id": 3173903,
            "title": "Dune",
            "type": "movie",
            "year": 2021,
            "user_rating": 7.9,
            "genre_names": ["Science Fiction", "Adventure"],
            "plot_overview": "Paul Atreides travels to Arrakis.",
            "sources": [
                {"source_id": 387, "name": "HBO MAX", "type": "sub", "region": "US", "web_url": "https://play.max.com", "format": "HD"},
                {"source_id": 349, "name": "iTunes", "type": "buy", "region": "US"},
                {"source_id": 1, "name": "Somewhere", "type": "tve", "region": "US"}
            ]
        });
        let details: WatchmodeTitleDetails = serde_json::from_value(raw).unwrap();
        let detailed = details.into_detailed().unwrap();

        assert_eq!(detailed.streaming_services(), [StreamingService::Hbo]);
        match detailed {
            DetailedItem::Availability(details) => {
                assert_eq!(details.offers.len(), 2);
                assert!(details.directors.is_none());
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_sources_response_shapes() {
        let bare: WatchmodeSourcesResponse =
            serde_json::from_value(json!([{"name": "Netflix", "type": "sub"}])).unwrap();
        assert_eq!(bare.into_offers().len(), 1);

        let wrapped: WatchmodeSourcesResponse = serde_json::from_value(
            json!({"sources": [{"name": "Hulu", "type": "sub"}, {"name": "Vudu", "type": "rent"}]}),
        )
        .unwrap();
        assert_eq!(wrapped.into_offers().len(), 2);
    }
}
