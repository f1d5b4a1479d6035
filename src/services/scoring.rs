//! Relevance scoring of a candidate against a user profile.
//!
//! Scoring is pure: the same item, profile, details and pinned current year
//! always produce the same score.

use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::{
    genre,
    user_profile::NormalizedProfile,
    ContentItem, EnhancedDetails, UserProfile,
};

/// Fixed weight table applied to each sub-score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub rating: f64,
    pub popularity: f64,
    pub genre: f64,
    pub keyword: f64,
    pub director: f64,
    pub streaming: f64,
}

pub const DEFAULT_WEIGHTS: ScoreWeights = ScoreWeights {
    rating: 0.25,
    popularity: 0.15,
    genre: 0.30,
    keyword: 0.15,
    director: 0.10,
    streaming: 0.05,
};

const POPULARITY_CAP: f64 = 5.0;
const RELIABLE_VOTES: u64 = 100;
const HISTORY_PENALTY: f64 = -10.0;

/// Unweighted sub-scores of one candidate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub rating: f64,
    pub popularity: f64,
    pub genre: f64,
    pub keyword: f64,
    pub director: f64,
    pub streaming: f64,
    pub recency: f64,
    pub confidence: f64,
    pub history: f64,
}

impl ScoreBreakdown {
    /// Weighted sum, floored at zero
    pub fn total(&self, weights: &ScoreWeights) -> f64 {
        let weighted = self.rating * weights.rating
            + self.popularity * weights.popularity
            + self.genre * weights.genre
            + self.keyword * weights.keyword
            + self.director * weights.director
            + self.streaming * weights.streaming;
        (weighted + self.recency + self.confidence + self.history).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    current_year: i32,
    weights: ScoreWeights,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(chrono::Utc::now().year())
    }
}

impl ScoringEngine {
    /// Engine with a pinned reference year for recency
    pub fn new(current_year: i32) -> Self {
        Self {
            current_year,
            weights: DEFAULT_WEIGHTS,
        }
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn calculate_item_score(
        &self,
        item: &ContentItem,
        profile: &UserProfile,
        details: Option<&EnhancedDetails>,
    ) -> f64 {
        self.score_normalized(item, &profile.normalized(), &profile.watch_history, details)
    }

    /// Scores against an already-normalized profile
    pub fn score_normalized(
        &self,
        item: &ContentItem,
        profile: &NormalizedProfile,
        watch_history: &BTreeSet<String>,
        details: Option<&EnhancedDetails>,
    ) -> f64 {
        self.breakdown(item, profile, watch_history, details)
            .total(&self.weights)
    }

    pub fn breakdown(
        &self,
        item: &ContentItem,
        profile: &NormalizedProfile,
        watch_history: &BTreeSet<String>,
        details: Option<&EnhancedDetails>,
    ) -> ScoreBreakdown {
        ScoreBreakdown {
            rating: rating_score(item),
            popularity: popularity_score(item.popularity),
            genre: genre_score(item, profile, details),
            keyword: keyword_score(item, profile, details),
            director: director_score(profile, details),
            streaming: streaming_score(item, profile, details),
            recency: self.recency_score(item.release_year),
            confidence: confidence_score(item.vote_count),
            history: if item.is_in_history(watch_history) {
                HISTORY_PENALTY
            } else {
                0.0
            },
        }
    }

    fn recency_score(&self, release_year: Option<i32>) -> f64 {
        let Some(year) = release_year else {
            return 0.0;
        };
        let age = self.current_year - year;
        if age <= 5 {
            1.0
        } else if age > 20 {
            -0.5
        } else {
            0.0
        }
    }
}

fn rating_score(item: &ContentItem) -> f64 {
    let reliability = if item.vote_count > RELIABLE_VOTES { 1.0 } else { 0.5 };
    item.vote_average * reliability
}

fn popularity_score(popularity: f64) -> f64 {
    ((popularity.max(0.0) + 1.0).log10() * 2.0).min(POPULARITY_CAP)
}

fn confidence_score(vote_count: u64) -> f64 {
    if vote_count > 1000 {
        1.0
    } else if vote_count > 500 {
        0.5
    } else if vote_count < 50 {
        -1.0
    } else {
        0.0
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn genre_score(
    item: &ContentItem,
    profile: &NormalizedProfile,
    details: Option<&EnhancedDetails>,
) -> f64 {
    // Detail genres are richer than list genres when present
    let labels = match details {
        Some(d) if !d.details.item().genres.is_empty() => &d.details.item().genres,
        _ => &item.genres,
    };
    let item_genres = genre::canonicalize_all(labels);
    if item_genres.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    let mut matched = 0usize;

    for item_genre in &item_genres {
        if profile
            .genres_liked
            .iter()
            .any(|liked| overlaps(liked, item_genre))
        {
            matched += 1;
            score += 3.0 * genre::quality_weight(item_genre);
        }

        if profile
            .genres_disliked
            .iter()
            .any(|disliked| overlaps(disliked, item_genre))
        {
            score -= 4.0;
        }
    }

    if matched as f64 / item_genres.len() as f64 > 0.5 {
        score += 2.0;
    }
    if !profile.genres_liked.is_empty() && matched == 0 {
        score -= 2.0;
    }

    score
}

fn keyword_score(
    item: &ContentItem,
    profile: &NormalizedProfile,
    details: Option<&EnhancedDetails>,
) -> f64 {
    if profile.keywords_liked.is_empty() {
        return 0.0;
    }

    let mut haystack = item.overview.to_lowercase();
    if let Some(details) = details {
        for keyword in details.details.keywords() {
            haystack.push('\n');
            haystack.push_str(&keyword.to_lowercase());
        }
    }

    let matches = profile
        .keywords_liked
        .iter()
        .filter(|keyword| haystack.contains(keyword.as_str()))
        .count();

    if matches == 0 {
        0.0
    } else {
        2.0 * matches as f64 + 0.5 * (matches - 1) as f64
    }
}

fn director_score(profile: &NormalizedProfile, details: Option<&EnhancedDetails>) -> f64 {
    let Some(details) = details else {
        return 0.0;
    };
    if profile.directors_liked.is_empty() {
        return 0.0;
    }

    let found = details
        .details
        .directors()
        .iter()
        .chain(details.details.creators())
        .map(|name| name.to_lowercase())
        .any(|name| {
            profile
                .directors_liked
                .iter()
                .any(|liked| name.contains(liked.as_str()))
        });

    if found {
        5.0
    } else {
        0.0
    }
}

fn streaming_score(
    item: &ContentItem,
    profile: &NormalizedProfile,
    details: Option<&EnhancedDetails>,
) -> f64 {
    let mut available = item.resolved_streaming_services.clone();
    if let Some(details) = details {
        for service in details.streaming_services() {
            if !available.contains(&service) {
                available.push(service);
            }
        }
    }

    let matches = profile
        .streaming_services
        .iter()
        .filter(|service| available.contains(service))
        .count();

    2.0 * matches as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DetailedItem, ExternalIds, MediaType, MetadataDetails, StreamingService,
    };

    const YEAR: i32 = 2024;

    fn item() -> ContentItem {
        ContentItem {
            id: "1".to_string(),
            ids: ExternalIds {
                tmdb: Some(1),
                ..Default::default()
            },
            title: "Arrival".to_string(),
            original_title: None,
            release_year: Some(2016),
            media_type: MediaType::Movie,
            vote_average: 7.6,
            vote_count: 800,
            popularity: 99.0,
            genres: vec!["Drama".to_string(), "Science Fiction".to_string()],
            overview: "A linguist works with the military to communicate with alien lifeforms."
                .to_string(),
            poster_path: None,
            backdrop_path: None,
            source_provider: "tmdb".to_string(),
            resolved_streaming_services: vec![],
        }
    }

    fn details(directors: &[&str], keywords: &[&str], services: &[StreamingService]) -> EnhancedDetails {
        let mut base = item();
        base.resolved_streaming_services = services.to_vec();
        EnhancedDetails::plain(DetailedItem::Metadata(MetadataDetails {
            item: base,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            directors: directors.iter().map(|d| d.to_string()).collect(),
            creators: vec![],
            tagline: None,
            runtime_minutes: None,
        }))
    }

    fn score(item: &ContentItem, profile: &UserProfile, details: Option<&EnhancedDetails>) -> f64 {
        ScoringEngine::new(YEAR).calculate_item_score(item, profile, details)
    }

    #[test]
    fn test_base_score_without_preferences() {
        let engine = ScoringEngine::new(YEAR);
        let profile = UserProfile::new(1);
        let b = engine.breakdown(&item(), &profile.normalized(), &profile.watch_history, None);

        assert_eq!(b.rating, 7.6);
        assert!((b.popularity - 4.0).abs() < 1e-9);
        assert_eq!(b.genre, 0.0);
        assert_eq!(b.recency, 0.0);
        assert_eq!(b.confidence, 0.5);

        let expected = 7.6 * 0.25 + 4.0 * 0.15 + 0.5;
        assert!((b.total(&DEFAULT_WEIGHTS) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_few_votes_halve_the_rating() {
        let mut few = item();
        few.vote_count = 100;
        let engine = ScoringEngine::new(YEAR);
        let profile = UserProfile::new(1).normalized();
        let b = engine.breakdown(&few, &profile, &BTreeSet::new(), None);
        assert_eq!(b.rating, 3.8);
    }

    #[test]
    fn test_popularity_is_capped() {
        assert_eq!(popularity_score(1_000_000.0), 5.0);
        assert_eq!(popularity_score(0.0), 0.0);
        assert_eq!(popularity_score(-3.0), 0.0);
    }

    #[test]
    fn test_genre_matches_use_quality_weights() {
        let profile = UserProfile {
            genres_liked: vec!["Drama".to_string(), "Sci-Fi".to_string()],
            ..UserProfile::new(1)
        };
        let g = genre_score(&item(), &profile.normalized(), None);
        // 3*1.2 + 3*1.1 + 2 (all genres matched)
        assert!((g - 8.9).abs() < 1e-9);
    }

    #[test]
    fn test_genre_penalty_when_nothing_liked_matches() {
        let profile = UserProfile {
            genres_liked: vec!["Comedy".to_string()],
            genres_disliked: vec!["Drama".to_string()],
            ..UserProfile::new(1)
        };
        assert_eq!(genre_score(&item(), &profile.normalized(), None), -6.0);
    }

    #[test]
    fn test_genre_score_zero_without_item_genres() {
        let mut bare = item();
        bare.genres.clear();
        let profile = UserProfile {
            genres_liked: vec!["Comedy".to_string()],
            ..UserProfile::new(1)
        };
        assert_eq!(genre_score(&bare, &profile.normalized(), None), 0.0);
    }

    #[test]
    fn test_keyword_bonus_grows_after_first_match() {
        let profile = UserProfile {
            keywords_liked: vec!["alien".to_string(), "linguist".to_string(), "heist".to_string()],
            ..UserProfile::new(1)
        };
        assert_eq!(keyword_score(&item(), &profile.normalized(), None), 4.5);

        let with_kw = details(&[], &["Heist"], &[]);
        assert_eq!(
            keyword_score(&item(), &profile.normalized(), Some(&with_kw)),
            7.0
        );
    }

    #[test]
    fn test_director_bonus_is_flat() {
        let profile = UserProfile {
            directors_liked: vec!["villeneuve".to_string(), "Denis".to_string()],
            ..UserProfile::new(1)
        };
        let d = details(&["Denis Villeneuve"], &[], &[]);
        assert_eq!(director_score(&profile.normalized(), Some(&d)), 5.0);
        assert_eq!(director_score(&profile.normalized(), None), 0.0);
    }

    #[test]
    fn test_streaming_counts_subscribed_services() {
        let profile = UserProfile {
            streaming_services: vec!["Netflix".to_string(), "Hulu".to_string()],
            ..UserProfile::new(1)
        };
        let mut listed = item();
        listed.resolved_streaming_services = vec![StreamingService::Netflix];
        let d = details(&[], &[], &[StreamingService::Hulu, StreamingService::Apple]);
        assert_eq!(streaming_score(&listed, &profile.normalized(), Some(&d)), 4.0);
    }

    #[test]
    fn test_recency_and_confidence_adjustments() {
        let engine = ScoringEngine::new(YEAR);
        assert_eq!(engine.recency_score(Some(2020)), 1.0);
        assert_eq!(engine.recency_score(Some(2003)), -0.5);
        assert_eq!(engine.recency_score(None), 0.0);
        assert_eq!(confidence_score(5000), 1.0);
        assert_eq!(confidence_score(10), -1.0);
        assert_eq!(confidence_score(200), 0.0);
    }

    #[test]
    fn test_history_penalty_and_floor() {
        let mut profile = UserProfile::new(1);
        profile.watch_history.insert("1".to_string());
        assert_eq!(score(&item(), &profile, None), 0.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let profile = UserProfile {
            genres_liked: vec!["Drama".to_string()],
            keywords_liked: vec!["alien".to_string()],
            ..UserProfile::new(1)
        };
        let d = details(&["Denis Villeneuve"], &["language"], &[]);
        assert_eq!(
            score(&item(), &profile, Some(&d)),
            score(&item(), &profile, Some(&d))
        );
    }

    #[test]
    fn test_higher_rating_never_scores_lower() {
        let profile = UserProfile {
            genres_liked: vec!["Thriller".to_string()],
            ..UserProfile::new(1)
        };
        let low = item();
        let mut high = item();
        high.vote_average = 8.9;
        assert!(score(&high, &profile, None) >= score(&low, &profile, None));
    }

    #[test]
    fn test_disliked_genre_strictly_lowers_score() {
        let profile = UserProfile {
            genres_disliked: vec!["Horror".to_string()],
            ..UserProfile::new(1)
        };
        let mut with = item();
        with.genres = vec!["Horror".to_string()];
        let mut without = item();
        without.genres = vec![];
        assert!(score(&with, &profile, None) < score(&without, &profile, None));
    }

    #[test]
    fn test_removing_a_disliked_genre_raises_score() {
        let profile = UserProfile {
            genres_liked: vec!["Drama".to_string()],
            genres_disliked: vec!["Horror".to_string()],
            ..UserProfile::new(1)
        };
        let mut mixed = item();
        mixed.genres = vec!["Drama".to_string(), "Horror".to_string()];
        let mut drama = item();
        drama.genres = vec!["Drama".to_string()];

        let engine = ScoringEngine::new(YEAR);
        let normalized = profile.normalized();
        let mixed_genre = engine.breakdown(&mixed, &normalized, &BTreeSet::new(), None).genre;
        let drama_genre = engine.breakdown(&drama, &normalized, &BTreeSet::new(), None).genre;
        assert!((mixed_genre - (3.6 - 4.0)).abs() < 1e-9);
        assert!((drama_genre - (3.6 + 2.0)).abs() < 1e-9);

        assert!(score(&mixed, &profile, None) > 0.0);
        assert!(score(&mixed, &profile, None) < score(&drama, &profile, None));
    }
}
