//! TMDb wire payloads and their translation into the shared model.

use serde::Deserialize;
use std::collections::HashMap;

use super::{
    genre, ContentItem, DetailedItem, ExternalIds, MediaType, MetadataDetails, StreamingService,
};

pub const PROVIDER_NAME: &str = "tmdb";

/// Envelope of `/search/*` and `/trending/*`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListResponse {
    #[serde(default)]
    pub results: Vec<TmdbListItem>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbListItem {
    pub id: u64,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

impl TmdbListItem {
    /// Translates one list entry
    ///
    /// `endpoint_type` is the media type implied by a typed endpoint
    /// (`/search/movie`). People from `/search/multi` yield `None`.
    pub fn into_content_item(self, endpoint_type: Option<MediaType>) -> Option<ContentItem> {
        let media_type = match self.media_type.as_deref() {
            Some(kind) => MediaType::parse(kind)?,
            None => endpoint_type.or_else(|| {
                if self.title.is_some() {
                    Some(MediaType::Movie)
                } else if self.name.is_some() {
                    Some(MediaType::Series)
                } else {
                    None
                }
            })?,
        };

        let title = non_blank(self.title.or(self.name))?;
        let release_year = year_of(self.release_date.as_deref())
            .or_else(|| year_of(self.first_air_date.as_deref()));

        let genres = self
            .genre_ids
            .iter()
            .filter_map(|id| genre::tmdb_genre_name(*id))
            .map(str::to_string)
            .collect();

        Some(ContentItem {
            id: self.id.to_string(),
            ids: ExternalIds {
                tmdb: Some(self.id),
                ..Default::default()
            },
            title,
            original_title: self.original_title.or(self.original_name),
            release_year,
            media_type,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            genres,
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            source_provider: PROVIDER_NAME.to_string(),
            resolved_streaming_services: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbNamed {
    pub name: String,
}

/// Movies list keywords under `keywords`, series under `results`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbKeywords {
    #[serde(default)]
    pub keywords: Vec<TmdbNamed>,
    #[serde(default)]
    pub results: Vec<TmdbNamed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbProviderEntry {
    pub provider_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbRegionProviders {
    /// Subscription offers
    #[serde(default)]
    pub flatrate: Vec<TmdbProviderEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

/// `/{movie|tv}/{id}?append_to_response=credits,keywords,watch/providers`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbDetails {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub episode_run_time: Vec<u32>,
    #[serde(default)]
    pub created_by: Vec<TmdbNamed>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
    #[serde(default)]
    pub keywords: Option<TmdbKeywords>,
    #[serde(default, rename = "watch/providers")]
    pub watch_providers: Option<TmdbWatchProviders>,
}

impl TmdbDetails {
    pub fn into_detailed(self, media_type: MediaType, region: &str) -> Option<DetailedItem> {
        let title = non_blank(self.title.or(self.name))?;
        let release_year = year_of(self.release_date.as_deref())
            .or_else(|| year_of(self.first_air_date.as_deref()));

        let directors = self
            .credits
            .unwrap_or_default()
            .crew
            .into_iter()
            .filter(|member| member.job.as_deref() == Some("Director"))
            .map(|member| member.name)
            .collect();

        let keywords = self
            .keywords
            .map(|k| {
                k.keywords
                    .into_iter()
                    .chain(k.results)
                    .map(|kw| kw.name)
                    .collect()
            })
            .unwrap_or_default();

        let resolved_streaming_services = self
            .watch_providers
            .and_then(|mut wp| wp.results.remove(region))
            .map(|region| {
                StreamingService::resolve_all(
                    region.flatrate.iter().map(|p| p.provider_name.as_str()),
                )
            })
            .unwrap_or_default();

        let item = ContentItem {
            id: self.id.to_string(),
            ids: ExternalIds {
                tmdb: Some(self.id),
                imdb: self.imdb_id,
                ..Default::default()
            },
            title,
            original_title: self.original_title.or(self.original_name),
            release_year,
            media_type,
            vote_average: self.vote_average,
            vote_count: self.vote_count,
            popularity: self.popularity,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            overview: self.overview.unwrap_or_default(),
            poster_path: self.poster_path,
            backdrop_path: self.backdrop_path,
            source_provider: PROVIDER_NAME.to_string(),
            resolved_streaming_services,
        };

        Some(DetailedItem::Metadata(MetadataDetails {
            item,
            keywords,
            directors,
            creators: self.created_by.into_iter().map(|c| c.name).collect(),
            tagline: self.tagline.filter(|t| !t.is_empty()),
            runtime_minutes: self.runtime.or_else(|| self.episode_run_time.first().copied()),
        }))
    }
}

/// Path segment TMDb uses for a media type
pub fn path_segment(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Series => "tv",
    }
}

pub(crate) fn year_of(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_movie_list_item_translation() {
        let raw = json!({
            "id": 603,
            "media_type": "movie",
            "title": "The Matrix",
            "original_title": "The Matrix",
            "release_date": "1999-03-30",
            "vote_average": 8.2,
            "vote_count": 25000,
            "popularity": 85.3,
            "genre_ids": [28, 878],
            "overview": "A hacker learns the truth.",
            "poster_path": "/p.jpg"
        });
        let item: TmdbListItem = serde_json::from_value(raw).unwrap();
        let content = item.into_content_item(None).unwrap();

        assert_eq!(content.id, "603");
        assert_eq!(content.ids.tmdb, Some(603));
        assert_eq!(content.title, "The Matrix");
        assert_eq!(content.release_year, Some(1999));
        assert_eq!(content.media_type, MediaType::Movie);
        assert_eq!(content.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(content.source_provider, "tmdb");
    }

    #[test]
    fn test_series_uses_name_and_first_air_date() {
        let raw = json!({
            "id": 1399,
            "name": "Game of Thrones",
            "first_air_date": "2011-04-17",
            "vote_average": 8.4,
            "vote_count": 22000
        });
        let item: TmdbListItem = serde_json::from_value(raw).unwrap();
        let content = item.into_content_item(None).unwrap();

        assert_eq!(content.title, "Game of Thrones");
        assert_eq!(content.release_year, Some(2011));
        assert_eq!(content.media_type, MediaType::Series);
        assert_eq!(content.overview, "");
    }

    #[test]
    fn test_person_results_are_skipped() {
        let raw = json!({"id": 6384, "media_type": "person", "name": "Keanu Reeves"});
        let item: TmdbListItem = serde_json::from_value(raw).unwrap();
        assert!(item.into_content_item(None).is_none());
    }

    #[test]
    fn test_endpoint_type_wins_when_media_type_absent() {
        let raw = json!({"id": 1, "title": "Untitled", "release_date": ""});
        let item: TmdbListItem = serde_json::from_value(raw).unwrap();
        let content = item.into_content_item(Some(MediaType::Movie)).unwrap();
        assert_eq!(content.release_year, None);
    }

    #[test]
    fn test_details_translation() {
        let raw = json!({
            "id": 27205,
            "title": "Inception",
            "release_date": "2010-07-15",
            "vote_average": 8.4,
            "vote_count": 35000,
            "popularity": 90.0,
            "imdb_id": "tt1375666",
            "genres": [{"id": 878, "name": "Science Fiction"}, {"id": 53, "name": "Thriller"}],
            "overview": "Dreams within dreams.",
            "tagline": "Your mind is the scene of the crime.",
            "runtime": 148,
            "credits": {"crew": [
                {"name": "Christopher Nolan", "job": "Director"},
                {"name": "Hans Zimmer", "job": "Original Music Composer"}
            ]},
            "keywords": {"keywords": [{"id": 1, "name": "dream"}, {"id": 2, "name": "heist"}]},
            "watch/providers": {"results": {
                "US": {"flatrate": [{"provider_name": "Netflix"}, {"provider_name": "Max"}]},
                "FR": {"flatrate": [{"provider_name": "Canal+"}]}
            }}
        });
        let details: TmdbDetails = serde_json::from_value(raw).unwrap();
        let detailed = details.into_detailed(MediaType::Movie, "US").unwrap();

        assert_eq!(detailed.directors(), ["Christopher Nolan".to_string()]);
        assert_eq!(detailed.keywords(), ["dream".to_string(), "heist".to_string()]);
        assert_eq!(
            detailed.streaming_services(),
            [StreamingService::Netflix, StreamingService::Hbo]
        );
        assert_eq!(detailed.item().ids.imdb.as_deref(), Some("tt1375666"));
        match detailed {
            DetailedItem::Metadata(meta) => assert_eq!(meta.runtime_minutes, Some(148)),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_series_details_use_creators_and_result_keywords() {
        let raw = json!({
            "id": 66732,
            "name": "Stranger Things",
            "first_air_date": "2016-07-15",
            "created_by": [{"id": 1, "name": "Matt Duffer"}, {"id": 2, "name": "Ross Duffer"}],
            "keywords": {"results": [{"id": 9, "name": "supernatural"}]},
            "episode_run_time": [50]
        });
        let details: TmdbDetails = serde_json::from_value(raw).unwrap();
        let detailed = details.into_detailed(MediaType::Series, "US").unwrap();

        assert_eq!(detailed.creators().len(), 2);
        assert_eq!(detailed.keywords(), ["supernatural".to_string()]);
        assert!(detailed.streaming_services().is_empty());
    }
}
