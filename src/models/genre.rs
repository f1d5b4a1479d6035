//! Static genre tables: synonyms, quality weights and TMDb genre ids.

/// Canonical genre followed by every spelling that maps onto it
const GENRE_VARIATIONS: &[(&str, &[&str])] = &[
    ("action", &["action", "adventure", "aventure"]),
    ("comedy", &["comedy", "comédie", "comedie"]),
    ("drama", &["drama", "drame"]),
    ("horror", &["horror", "horreur", "épouvante"]),
    ("thriller", &["thriller", "suspense"]),
    ("romance", &["romance", "romantique"]),
    (
        "science fiction",
        &["science fiction", "sci-fi", "science-fiction", "sf", "scifi"],
    ),
    ("fantasy", &["fantasy", "fantastique", "fantaisie"]),
    ("animation", &["animation", "anime", "animé"]),
    ("documentary", &["documentary", "documentaire"]),
    ("crime", &["crime", "criminel", "polar"]),
    ("mystery", &["mystery", "mystère", "mystere"]),
    ("war", &["war", "guerre"]),
    ("western", &["western"]),
    ("music", &["music", "musical", "musique"]),
    ("family", &["family", "famille", "familial"]),
    ("biography", &["biography", "biographie", "biopic"]),
];

/// Multiplier on the liked-genre bonus; unlisted genres weigh 1.0
const QUALITY_WEIGHTS: &[(&str, f64)] = &[
    ("drama", 1.2),
    ("thriller", 1.1),
    ("science fiction", 1.1),
    ("mystery", 1.1),
    ("crime", 1.0),
    ("animation", 1.0),
    ("action", 0.9),
    ("comedy", 0.9),
    ("horror", 0.8),
    ("romance", 0.8),
];

/// TMDb genre ids (movie and tv lists share one id space)
const TMDB_GENRES: &[(u32, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
    (10759, "Action & Adventure"),
    (10762, "Kids"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
];

/// Normalizes one genre name to its canonical lowercase form
///
/// Unknown genres are returned lowercased and trimmed.
pub fn normalize_genre(genre: &str) -> String {
    let lower = genre.trim().to_lowercase();
    GENRE_VARIATIONS
        .iter()
        .find(|(_, variations)| variations.contains(&lower.as_str()))
        .map(|(canonical, _)| canonical.to_string())
        .unwrap_or(lower)
}

/// Canonical genres for a provider genre label
///
/// Compound labels such as "Sci-Fi & Fantasy" are split on `&`.
pub fn canonical_genres(genre: &str) -> Vec<String> {
    let mut genres = Vec::new();
    for part in genre.split('&') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let normalized = normalize_genre(part);
        if !genres.contains(&normalized) {
            genres.push(normalized);
        }
    }
    genres
}

/// Canonical genres for a list of labels, deduplicated in order
pub fn canonicalize_all<S: AsRef<str>>(genres: &[S]) -> Vec<String> {
    let mut out = Vec::new();
    for genre in genres {
        for normalized in canonical_genres(genre.as_ref()) {
            if !out.contains(&normalized) {
                out.push(normalized);
            }
        }
    }
    out
}

pub fn quality_weight(canonical_genre: &str) -> f64 {
    QUALITY_WEIGHTS
        .iter()
        .find(|(genre, _)| *genre == canonical_genre)
        .map(|(_, weight)| *weight)
        .unwrap_or(1.0)
}

pub fn tmdb_genre_name(id: u32) -> Option<&'static str> {
    TMDB_GENRES
        .iter()
        .find(|(genre_id, _)| *genre_id == id)
        .map(|(_, name)| *name)
}

/// Search seed for a liked genre, in the provider's own vocabulary
pub fn search_term(genre: &str) -> String {
    let canonical = normalize_genre(genre);
    TMDB_GENRES
        .iter()
        .find(|(_, name)| name.to_lowercase() == canonical)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| genre.trim().to_string())
}
