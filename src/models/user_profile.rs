use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{genre, StreamingService};

pub type UserId = i64;

/// Taste profile snapshot supplied by the profile store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub genres_liked: Vec<String>,
    #[serde(default)]
    pub genres_disliked: Vec<String>,
    #[serde(default)]
    pub keywords_liked: Vec<String>,
    #[serde(default)]
    pub directors_liked: Vec<String>,
    /// Minimum acceptable rating on the 0-10 scale
    #[serde(default)]
    pub min_rating: f64,
    /// Free-text service names as the user entered them
    #[serde(default)]
    pub streaming_services: Vec<String>,
    /// Item ids the user has already watched
    #[serde(default)]
    pub watch_history: BTreeSet<String>,
}

/// Profile with genres and services mapped onto the fixed vocabularies
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedProfile {
    pub genres_liked: Vec<String>,
    pub genres_disliked: Vec<String>,
    pub keywords_liked: Vec<String>,
    pub directors_liked: Vec<String>,
    pub min_rating: f64,
    pub streaming_services: Vec<StreamingService>,
}

impl UserProfile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn normalized(&self) -> NormalizedProfile {
        NormalizedProfile {
            genres_liked: genre::canonicalize_all(&self.genres_liked),
            genres_disliked: genre::canonicalize_all(&self.genres_disliked),
            keywords_liked: lowercase_non_empty(&self.keywords_liked),
            directors_liked: lowercase_non_empty(&self.directors_liked),
            min_rating: self.min_rating,
            streaming_services: self.subscribed_services(),
        }
    }

    pub fn subscribed_services(&self) -> Vec<StreamingService> {
        StreamingService::resolve_all(self.streaming_services.iter().map(String::as_str))
    }
}

fn lowercase_non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}
