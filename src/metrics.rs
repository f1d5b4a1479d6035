//! Performance monitor shared by the aggregation layer and the orchestrator.
//!
//! All counters are atomics so concurrent fan-out tasks can record without
//! locking and without lost updates.

use dashmap::DashMap;
use serde::Serialize;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

#[derive(Debug, Default)]
struct ProviderCounters {
    calls: AtomicU64,
    errors: AtomicU64,
    latency_micros: AtomicU64,
}

#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    provider_calls: AtomicU64,
    provider_errors: AtomicU64,
    provider_latency_micros: AtomicU64,
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    per_provider: DashMap<String, ProviderCounters>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub provider_calls: u64,
    pub provider_errors: u64,
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub average_latency_ms: f64,
    pub error_rate: f64,
    pub cache_hit_rate: f64,
    pub providers: Vec<ProviderMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderMetrics {
    pub name: String,
    pub calls: u64,
    pub errors: u64,
    pub average_latency_ms: f64,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one outbound provider call and how long it took
    pub fn record_provider_call(&self, provider: &str, latency: Duration, success: bool) {
        let micros = latency.as_micros().min(u64::MAX as u128) as u64;

        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        self.provider_latency_micros
            .fetch_add(micros, Ordering::Relaxed);
        if !success {
            self.provider_errors.fetch_add(1, Ordering::Relaxed);
        }

        let counters = self.per_provider.entry(provider.to_string()).or_default();
        counters.calls.fetch_add(1, Ordering::Relaxed);
        counters.latency_micros.fetch_add(micros, Ordering::Relaxed);
        if !success {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_calls(&self) -> u64 {
        self.provider_calls.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let provider_calls = self.provider_calls.load(Ordering::Relaxed);
        let provider_errors = self.provider_errors.load(Ordering::Relaxed);
        let latency = self.provider_latency_micros.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);

        let mut providers: Vec<ProviderMetrics> = self
            .per_provider
            .iter()
            .map(|entry| {
                let calls = entry.calls.load(Ordering::Relaxed);
                ProviderMetrics {
                    name: entry.key().clone(),
                    calls,
                    errors: entry.errors.load(Ordering::Relaxed),
                    average_latency_ms: average_ms(entry.latency_micros.load(Ordering::Relaxed), calls),
                }
            })
            .collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name));

        MetricsSnapshot {
            provider_calls,
            provider_errors,
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            average_latency_ms: average_ms(latency, provider_calls),
            error_rate: ratio(provider_errors, provider_calls),
            cache_hit_rate: ratio(cache_hits, cache_hits + cache_misses),
            providers,
        }
    }

    pub fn reset(&self) {
        self.provider_calls.store(0, Ordering::Relaxed);
        self.provider_errors.store(0, Ordering::Relaxed);
        self.provider_latency_micros.store(0, Ordering::Relaxed);
        self.requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.per_provider.clear();
    }
}

fn average_ms(total_micros: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_micros as f64 / count as f64 / 1000.0
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
