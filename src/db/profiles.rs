use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{history_key, UserId, UserProfile},
};

/// Source of user profiles, owned outside the recommendation core
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read-only snapshot of a profile, `None` for an unknown user
    async fn get_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>>;

    /// Appends an item to the watch history
    ///
    /// Returns `false` when the user is unknown or the item was already there.
    async fn append_watch_history(&self, user_id: UserId, item_id: &str) -> AppResult<bool>;
}

/// Profile store kept in process memory
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            profiles: RwLock::new(profiles.into_iter().map(|p| (p.user_id, p)).collect()),
        }
    }

    pub async fn upsert(&self, profile: UserProfile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn append_watch_history(&self, user_id: UserId, item_id: &str) -> AppResult<bool> {
        let key = watch_key(item_id)?;
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(&user_id) else {
            return Ok(false);
        };

        // Entries stored before namespacing still count as the same title
        let already_watched = profile
            .watch_history
            .iter()
            .any(|entry| history_key(entry).as_deref() == Some(key.as_str()));
        if already_watched {
            return Ok(false);
        }
        Ok(profile.watch_history.insert(key))
    }
}

fn watch_key(item_id: &str) -> AppResult<String> {
    history_key(item_id)
        .ok_or_else(|| AppError::InvalidInput(format!("Unrecognised item id: {}", item_id)))
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: i64,
    genres_liked: Vec<String>,
    genres_disliked: Vec<String>,
    keywords_liked: Vec<String>,
    directors_liked: Vec<String>,
    min_rating: f64,
    streaming_services: Vec<String>,
}

/// Profile store backed by PostgreSQL
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, genres_liked, genres_disliked, keywords_liked,
                   directors_liked, min_rating, streaming_services
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let history: Vec<String> =
            sqlx::query_scalar("SELECT item_id FROM watch_history WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(UserProfile {
            user_id: row.user_id,
            genres_liked: row.genres_liked,
            genres_disliked: row.genres_disliked,
            keywords_liked: row.keywords_liked,
            directors_liked: row.directors_liked,
            min_rating: row.min_rating,
            streaming_services: row.streaming_services,
            watch_history: history.into_iter().collect(),
        }))
    }

    async fn append_watch_history(&self, user_id: UserId, item_id: &str) -> AppResult<bool> {
        let key = watch_key(item_id)?;
        let result = sqlx::query(
            r#"
            INSERT INTO watch_history (user_id, item_id)
            SELECT $1, $2
            WHERE EXISTS (SELECT 1 FROM user_profiles WHERE user_id = $1)
            ON CONFLICT (user_id, item_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(&key)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            user_id,
            item_id = %key,
            inserted = result.rows_affected(),
            "Watch history append"
        );

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_unknown_user_has_no_profile() {
        let store = InMemoryProfileStore::new();
        assert!(assert_ok!(store.get_profile(9).await).is_none());
        assert!(!assert_ok!(store.append_watch_history(9, "603").await));
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let store = InMemoryProfileStore::with_profiles([UserProfile::new(1)]);
        assert!(assert_ok!(store.append_watch_history(1, "603").await));
        assert!(!assert_ok!(store.append_watch_history(1, "603").await));

        let profile = store.get_profile(1).await.unwrap().unwrap();
        assert_eq!(profile.watch_history.len(), 1);
        assert!(profile.watch_history.contains("tmdb:603"));
    }

    #[tokio::test]
    async fn test_append_namespaces_ids() {
        let mut legacy = UserProfile::new(1);
        legacy.watch_history.insert("603".to_string());
        let store = InMemoryProfileStore::with_profiles([legacy]);

        assert!(!assert_ok!(store.append_watch_history(1, "tmdb:603").await));
        assert!(assert_ok!(store.append_watch_history(1, "watchmode:603").await));
        assert!(matches!(
            store.append_watch_history(1, "not an id").await,
            Err(AppError::InvalidInput(_))
        ));

        let profile = store.get_profile(1).await.unwrap().unwrap();
        assert!(profile.watch_history.contains("watchmode:603"));
        assert_eq!(profile.watch_history.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_profile() {
        let store = InMemoryProfileStore::new();
        let mut profile = UserProfile::new(2);
        store.upsert(profile.clone()).await;
        profile.min_rating = 7.0;
        store.upsert(profile).await;
        assert_eq!(store.get_profile(2).await.unwrap().unwrap().min_rating, 7.0);
    }
}
