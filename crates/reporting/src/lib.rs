//! Reporting — read-only aggregation over ads and their event logs.

pub mod analytics;

pub use analytics::{AnalyticsAggregator, AnalyticsFilters, AnalyticsReport};
