use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Display, time::Duration};
use tokio::time::Instant;

use crate::models::{MediaTypeFilter, StreamingService, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search {
        query: String,
        filter: MediaTypeFilter,
        max_results: usize,
    },
    Trending {
        filter: MediaTypeFilter,
        max_results: usize,
    },
    Recommendations {
        user_id: UserId,
        n: usize,
        filter: MediaTypeFilter,
        services: Vec<StreamingService>,
    },
}

impl CacheKey {
    /// Recommendation key with the service filter put in canonical order
    pub fn recommendations(
        user_id: UserId,
        n: usize,
        filter: MediaTypeFilter,
        services: &[StreamingService],
    ) -> Self {
        let mut services = services.to_vec();
        services.sort();
        services.dedup();
        CacheKey::Recommendations {
            user_id,
            n,
            filter,
            services,
        }
    }

    /// The user whose state this entry depends on
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            CacheKey::Recommendations { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search {
                query,
                filter,
                max_results,
            } => write!(
                f,
                "search:{}:{}:{}",
                query.trim().to_lowercase(),
                filter,
                max_results
            ),
            CacheKey::Trending {
                filter,
                max_results,
            } => write!(f, "trending:{}:{}", filter, max_results),
            CacheKey::Recommendations {
                user_id,
                n,
                filter,
                services,
            } => {
                let services = if services.is_empty() {
                    "any".to_string()
                } else {
                    services
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                };
                write!(f, "recs:{}:{}:{}:{}", user_id, n, filter, services)
            }
        }
    }
}

struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
    user_id: Option<UserId>,
}

/// In-process TTL cache for aggregate results
///
/// Entries are evicted lazily: an expired entry is removed by the `get` that
/// finds it. A read racing an eviction simply misses.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value, or `None` on a miss
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let key = key.to_string();

        let expired = {
            let entry = self.entries.get(&key)?;
            if entry.inserted_at.elapsed() <= self.ttl {
                match serde_json::from_value(entry.value.clone()) {
                    Ok(value) => return Some(value),
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Cache entry has unexpected shape");
                    }
                }
            }
            entry.inserted_at
        };

        // Only drop the entry we inspected; a fresh write may have replaced it
        self.entries
            .remove_if(&key, |_, entry| entry.inserted_at == expired);
        tracing::debug!(key = %key, "Evicted cache entry");
        None
    }

    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_value(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: json,
                inserted_at: Instant::now(),
                user_id: key.user_id(),
            },
        );
    }

    /// Removes every entry derived from this user's state
    pub fn invalidate_for_user(&self, user_id: UserId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.user_id != Some(user_id));
        let removed = before.saturating_sub(self.entries.len());
        tracing::debug!(user_id, removed, "Invalidated user cache entries");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
