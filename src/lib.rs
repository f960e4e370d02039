//! # Sales Performance
//!
//! A library for turning sparse, grouped order-item aggregates into dense,
//! timezone-normalized sales performance series.
//!
//! ## Core Concepts
//!
//! - **Skeleton**: every bucket (day, week or month) in the requested window,
//!   computed in the caller's UTC offset, with zeroed metrics
//! - **Dimension**: a secondary grouping axis (sales channel, category, product,
//!   option code); null or blank labels fall into [`UNASSIGNED_LABEL`]
//! - **Merge**: provider rows overlay the skeleton by `(bucket, dimension)` key,
//!   so the output has no gaps even where nothing was sold
//! - **Projection**: the merged entries reshaped into JSON-ready report types
//!
//! ## Example
//!
//! ```rust,ignore
//! use sales_performance::*;
//! use chrono::{TimeZone, Utc};
//!
//! let store = InMemoryOrderItemStore::new(vec![OrderItemRecord {
//!     channel_order_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap()),
//!     sales_channel: Some("Naver".to_string()),
//!     unit: 2,
//!     price: 15_000,
//!     delivery_charge: 3_000,
//!     sold: true,
//!     ..Default::default()
//! }]);
//! let engine = SalesPerformanceEngine::new(store, StaticCatalog::new());
//!
//! let filter = SearchFilter::range(
//!     Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 1, 3, 14, 59, 59).unwrap(),
//!     9,
//! );
//!
//! // Three days at +9; the order lands on 2024-01-02.
//! let dashboard = engine.dashboard(&filter).await?;
//! let channels = engine.channel_performance(&filter).await?;
//! ```

pub mod config;
pub mod dimension;
pub mod engine;
pub mod error;
pub mod memory;
pub mod merge;
pub mod projection;
pub mod provider;
pub mod schema;
pub mod skeleton;
pub mod utils;

pub use config::EngineConfig;
pub use dimension::{DimensionKey, KnownDimensions, UNASSIGNED_LABEL};
pub use engine::SalesPerformanceEngine;
pub use error::{Result, SalesPerformanceError};
pub use memory::{InMemoryOrderItemStore, OrderItemRecord, StaticCatalog};
pub use merge::{merge, merge_detailed, MergeOutcome};
pub use projection::*;
pub use provider::{AggregateQuery, AggregateQueryProvider, CatalogLookup, ProviderError};
pub use schema::*;
pub use skeleton::CalendarSkeleton;
pub use utils::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_end_to_end_dashboard() {
        let store = InMemoryOrderItemStore::new(vec![OrderItemRecord {
            channel_order_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap()),
            sales_channel: Some("Naver".to_string()),
            unit: 2,
            price: 15_000,
            delivery_charge: 3_000,
            sold: true,
            ..Default::default()
        }]);
        let engine = SalesPerformanceEngine::new(store, StaticCatalog::new());

        let filter = SearchFilter::range(
            Utc.with_ymd_and_hms(2023, 12, 31, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 14, 59, 59).unwrap(),
            9,
        );

        let dashboard = engine.dashboard(&filter).await.unwrap();
        let buckets: Vec<_> = dashboard.iter().map(|d| d.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);

        assert!(dashboard[0].metrics.is_zero());
        assert_eq!(dashboard[1].metrics.order_unit, 2);
        assert_eq!(dashboard[1].metrics.sales_pay_amount, 18_000);
        assert!(dashboard[2].metrics.is_zero());
    }

    #[tokio::test]
    async fn test_end_to_end_from_params() {
        let store = InMemoryOrderItemStore::new(vec![OrderItemRecord {
            channel_order_date: Some(Utc.with_ymd_and_hms(2024, 1, 10, 3, 0, 0).unwrap()),
            price: 1_000,
            unit: 1,
            ..Default::default()
        }]);
        let engine = SalesPerformanceEngine::new(store, StaticCatalog::new());

        let params: std::collections::HashMap<String, String> = [
            ("startDate", "2023-12-31T15:00:00.000Z"),
            ("endDate", "2024-01-31T14:59:59.999Z"),
            ("utcHourDifference", "9"),
            ("dimension", "week"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let filter = engine.parse_filter(&params).unwrap();
        let dashboard = engine.dashboard(&filter).await.unwrap();

        // Mondays covering January 2024
        let buckets: Vec<_> = dashboard.iter().map(|d| d.bucket.as_str()).collect();
        assert_eq!(
            buckets,
            vec![
                "2024-01-01",
                "2024-01-08",
                "2024-01-15",
                "2024-01-22",
                "2024-01-29"
            ]
        );
        assert_eq!(dashboard[1].metrics.order_pay_amount, 1_000);
        assert_eq!(dashboard[1].metrics.sales_pay_amount, 0);
    }
}
