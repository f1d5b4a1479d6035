pub mod aggregation;
pub mod providers;
pub mod recommendations;
pub mod scoring;

pub use aggregation::AggregationManager;
pub use recommendations::{ProviderStatusReport, RecommendationOrchestrator};
pub use scoring::ScoringEngine;
