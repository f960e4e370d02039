//! Seams to the data store: grouped aggregate queries and catalog names.

use crate::schema::{AggregateRow, BucketGranularity, CalendarSource, DimensionMode};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::error::Error as StdError;

pub type ProviderError = Box<dyn StdError + Send + Sync>;

/// Describes one grouped query. Providers must bucket instants exactly like the
/// skeleton does: shift by `utc_offset_hours`, truncate to a date, then format
/// with [`BucketGranularity::bucket_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub calendar: CalendarSource,
    pub utc_offset_hours: i32,
    pub granularity: BucketGranularity,
    pub dimension_mode: DimensionMode,
    /// `false` for leaderboard-style queries that collapse the date axis.
    pub group_by_bucket: bool,
    /// Option codes to restrict to, when present.
    pub dimension_constraint: Option<BTreeSet<String>>,
}

#[async_trait]
pub trait AggregateQueryProvider: Send + Sync {
    /// Returns one row per non-empty group. Null or blank labels are grouped
    /// together as a single unassigned group.
    async fn query(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, ProviderError>;
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn list_category_names(&self) -> Result<Vec<String>, ProviderError>;

    async fn list_product_names_by_category(
        &self,
        category_name: &str,
    ) -> Result<Vec<String>, ProviderError>;
}

#[async_trait]
impl<T: AggregateQueryProvider + ?Sized> AggregateQueryProvider for std::sync::Arc<T> {
    async fn query(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, ProviderError> {
        (**self).query(query).await
    }
}

#[async_trait]
impl<T: CatalogLookup + ?Sized> CatalogLookup for std::sync::Arc<T> {
    async fn list_category_names(&self) -> Result<Vec<String>, ProviderError> {
        (**self).list_category_names().await
    }

    async fn list_product_names_by_category(
        &self,
        category_name: &str,
    ) -> Result<Vec<String>, ProviderError> {
        (**self).list_product_names_by_category(category_name).await
    }
}
