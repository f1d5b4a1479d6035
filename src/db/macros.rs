/// A macro to simplify read-through caching on the `CacheStore`.
///
/// This macro checks if a value is present in the cache.
/// If found, it records a hit and returns the cached value.
/// If not found, it records a miss, executes the provided block to compute the
/// value, stores it when `$keep` accepts it, and then returns the computed value.
///
/// # Arguments
/// * `$cache`: The cache instance. Must have `get` and `set` methods.
/// * `$monitor`: The `PerformanceMonitor` that counts hits and misses.
/// * `$key`: The `CacheKey` for the value.
/// * `$keep`: Optional predicate; values it rejects are returned but not stored.
/// * `$block`: Future computing the value on a miss, yielding an `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let response = cached!(self.cache, self.monitor, key, |r: &SearchResponse| r.reason.is_none(), async move {
///     compute_expensive_value().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $monitor:expr, $key:expr, $block:expr) => {
        $crate::cached!($cache, $monitor, $key, |_| true, $block)
    };
    ($cache:expr, $monitor:expr, $key:expr, $keep:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get(&key) {
            $monitor.record_cache_hit();
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            $monitor.record_cache_miss();
            tracing::debug!(key = %key, "Cache miss");
            let value = $block.await?;
            if ($keep)(&value) {
                $cache.set(&key, &value);
            }
            Ok(value)
        }
    }};
}
