use serde::Deserialize;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL for user profiles; in-memory profiles when absent
    #[serde(default)]
    pub database_url: Option<String>,

    /// TMDb API key (primary metadata provider)
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Watchmode API key
    #[serde(default)]
    pub watchmode_api_key: Option<String>,

    #[serde(default = "default_watchmode_api_url")]
    pub watchmode_api_url: String,

    /// Streaming Availability API key (RapidAPI)
    #[serde(default)]
    pub streaming_api_key: Option<String>,

    /// Streaming Availability API base URL
    #[serde(default = "default_streaming_api_url")]
    pub streaming_api_url: String,

    /// Language requested from metadata providers
    #[serde(default = "default_response_language")]
    pub response_language: String,

    /// Region used for watch-provider lookups
    #[serde(default = "default_region")]
    pub region: String,

    /// Per-call provider timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Result cache TTL in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Worker pool size for per-candidate enrichment
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_watchmode_api_url() -> String {
    "https://api.watchmode.com/v1".to_string()
}

fn default_streaming_api_url() -> String {
    "https://streaming-availability.p.rapidapi.com".to_string()
}

fn default_response_language() -> String {
    "en-US".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_enrichment_concurrency() -> usize {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns the key only when it is set and non-blank
pub fn non_empty(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.tmdb_api_url, "https://api.themoviedb.org/3");
        assert_eq!(config.provider_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.enrichment_concurrency, 5);
        assert!(config.tmdb_api_key.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_overrides_from_environment() {
        let vars = vec![
            ("TMDB_API_KEY".to_string(), "abc".to_string()),
            ("CACHE_TTL_SECS".to_string(), "60".to_string()),
            ("REGION".to_string(), "FR".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(non_empty(&config.tmdb_api_key), Some("abc"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.region, "FR");
    }

    #[test]
    fn test_non_empty_rejects_blank_keys() {
        assert_eq!(non_empty(&Some("   ".to_string())), None);
        assert_eq!(non_empty(&None), None);
    }
}
