use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Fixed vocabulary of streaming services a profile can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingService {
    Netflix,
    Disney,
    Amazon,
    Hbo,
    Hulu,
    Apple,
    Peacock,
    Paramount,
}

/// Exact provider spellings, matched after lowercasing
const ALIASES: &[(&str, StreamingService)] = &[
    ("netflix", StreamingService::Netflix),
    ("netflix france", StreamingService::Netflix),
    ("netflix fr", StreamingService::Netflix),
    ("netflix basic with ads", StreamingService::Netflix),
    ("disney", StreamingService::Disney),
    ("disney+", StreamingService::Disney),
    ("disney plus", StreamingService::Disney),
    ("disney+ france", StreamingService::Disney),
    ("walt disney pictures", StreamingService::Disney),
    ("amazon", StreamingService::Amazon),
    ("amazon prime", StreamingService::Amazon),
    ("amazon prime video", StreamingService::Amazon),
    ("amazon video", StreamingService::Amazon),
    ("prime", StreamingService::Amazon),
    ("prime video", StreamingService::Amazon),
    ("hbo", StreamingService::Hbo),
    ("hbo max", StreamingService::Hbo),
    ("hbo france", StreamingService::Hbo),
    ("max", StreamingService::Hbo),
    ("hulu", StreamingService::Hulu),
    ("apple", StreamingService::Apple),
    ("apple tv", StreamingService::Apple),
    ("apple tv+", StreamingService::Apple),
    ("apple tv plus", StreamingService::Apple),
    ("peacock", StreamingService::Peacock),
    ("peacock premium", StreamingService::Peacock),
    ("paramount", StreamingService::Paramount),
    ("paramount+", StreamingService::Paramount),
    ("paramount plus", StreamingService::Paramount),
];

/// Fallback fragments, checked in order
const FRAGMENTS: &[(&str, StreamingService)] = &[
    ("netflix", StreamingService::Netflix),
    ("disney", StreamingService::Disney),
    ("amazon", StreamingService::Amazon),
    ("prime", StreamingService::Amazon),
    ("hbo", StreamingService::Hbo),
    ("hulu", StreamingService::Hulu),
    ("apple", StreamingService::Apple),
    ("peacock", StreamingService::Peacock),
    ("paramount", StreamingService::Paramount),
];

impl StreamingService {
    pub const ALL: [StreamingService; 8] = [
        StreamingService::Netflix,
        StreamingService::Disney,
        StreamingService::Amazon,
        StreamingService::Hbo,
        StreamingService::Hulu,
        StreamingService::Apple,
        StreamingService::Peacock,
        StreamingService::Paramount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingService::Netflix => "netflix",
            StreamingService::Disney => "disney",
            StreamingService::Amazon => "amazon",
            StreamingService::Hbo => "hbo",
            StreamingService::Hulu => "hulu",
            StreamingService::Apple => "apple",
            StreamingService::Peacock => "peacock",
            StreamingService::Paramount => "paramount",
        }
    }

    /// Maps a provider's service name onto the vocabulary
    ///
    /// Exact aliases win; otherwise the first known fragment contained in the
    /// name decides. Unknown services resolve to `None`.
    pub fn from_provider_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }

        if let Some((_, service)) = ALIASES.iter().find(|(alias, _)| *alias == name) {
            return Some(*service);
        }

        FRAGMENTS
            .iter()
            .find(|(fragment, _)| name.contains(fragment))
            .map(|(_, service)| *service)
    }

    /// Resolves a list of names, dropping unknowns and duplicates
    pub fn resolve_all<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Self> {
        let mut services = Vec::new();
        for service in names.into_iter().filter_map(Self::from_provider_name) {
            if !services.contains(&service) {
                services.push(service);
            }
        }
        services
    }
}

impl Display for StreamingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
