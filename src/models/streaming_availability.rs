//! Streaming Availability (RapidAPI) wire payloads.

use serde::Deserialize;
use std::collections::HashMap;

use super::{
    tmdb::non_blank, AvailabilityDetails, AvailabilityType, ContentItem, DetailedItem,
    ExternalIds, MediaType, ServiceAvailability,
};

pub const PROVIDER_NAME: &str = "streaming_availability";

/// Show as returned by `/shows/search/title`, `/shows/top` and `/shows/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiShow {
    pub id: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Formatted as `movie/603` or `tv/1399`
    #[serde(default)]
    pub tmdb_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub show_type: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub first_air_year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<ApiGenre>,
    #[serde(default)]
    pub directors: Option<Vec<String>>,
    #[serde(default)]
    pub creators: Option<Vec<String>>,
    /// 0-100
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub streaming_options: HashMap<String, Vec<ApiStreamingOption>>,
    #[serde(default)]
    pub image_set: Option<ApiImageSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenre {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStreamingOption {
    pub service: ApiService,
    #[serde(rename = "type")]
    pub availability_type: String,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiService {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiImageSet {
    #[serde(default)]
    pub vertical_poster: HashMap<String, String>,
    #[serde(default)]
    pub horizontal_backdrop: HashMap<String, String>,
}

impl ApiShow {
    /// Offers available in `country` (lowercase ISO code)
    fn offers(&self, country: &str) -> Vec<ServiceAvailability> {
        self.streaming_options
            .get(country)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| {
                        let availability_type = AvailabilityType::parse(&option.availability_type)?;
                        Some(ServiceAvailability {
                            service_name: option.service.name.clone(),
                            availability_type,
                            quality: option.quality.clone(),
                            link: option.link.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn tmdb_numeric_id(&self) -> Option<u64> {
        self.tmdb_id
            .as_deref()
            .and_then(|id| id.rsplit('/').next())
            .and_then(|id| id.parse().ok())
    }

    fn translate(self, country: &str) -> Option<Translated> {
        let offers = self.offers(country);
        let tmdb = self.tmdb_numeric_id();
        let title = non_blank(self.title)?;
        let media_type = match self.show_type.as_deref() {
            Some("series") => MediaType::Series,
            _ => MediaType::Movie,
        };
        let images = self.image_set.unwrap_or_default();

        let item = ContentItem {
            id: self.id.clone(),
            ids: ExternalIds {
                tmdb,
                imdb: self.imdb_id,
                streaming_availability: Some(self.id),
                ..Default::default()
            },
            title,
            original_title: self.original_title,
            release_year: self.release_year.or(self.first_air_year),
            media_type,
            vote_average: self.rating.map(|r| r / 10.0).unwrap_or(0.0),
            vote_count: 0,
            popularity: 0.0,
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            overview: self.overview.unwrap_or_default(),
            poster_path: images.vertical_poster.get("w480").cloned(),
            backdrop_path: images.horizontal_backdrop.get("w1080").cloned(),
            source_provider: PROVIDER_NAME.to_string(),
            resolved_streaming_services: ServiceAvailability::resolve(&offers),
        };

        Some(Translated {
            item,
            offers,
            directors: self.directors,
            creators: self.creators,
        })
    }

    pub fn into_content_item(self, country: &str) -> Option<ContentItem> {
        self.translate(country).map(|t| t.item)
    }

    pub fn into_detailed(self, country: &str) -> Option<DetailedItem> {
        let t = self.translate(country)?;
        Some(DetailedItem::Availability(AvailabilityDetails {
            item: t.item,
            directors: t.directors,
            creators: t.creators,
            offers: t.offers,
        }))
    }
}

struct Translated {
    item: ContentItem,
    offers: Vec<ServiceAvailability>,
    directors: Option<Vec<String>>,
    creators: Option<Vec<String>>,
}

pub fn show_type_param(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "movie",
        MediaType::Series => "series",
    }
}
