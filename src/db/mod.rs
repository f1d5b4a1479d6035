pub mod cache;
mod macros;
pub mod postgres;
pub mod profiles;

pub use cache::{CacheKey, CacheStore};
pub use postgres::create_pool;
pub use profiles::{InMemoryProfileStore, PgProfileStore, ProfileStore};
