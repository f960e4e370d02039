//! In-memory implementations of the provider and catalog seams, bucketing raw
//! order items the same way a SQL-backed provider would.

use crate::dimension::DimensionKey;
use crate::provider::{AggregateQuery, AggregateQueryProvider, CatalogLookup, ProviderError};
use crate::schema::{AggregateRow, CalendarSource, DimensionMode, PerformanceMetrics};
use crate::utils::{offset_from_hours, shifted_date};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRecord {
    /// Stored in UTC. Items without an order date are never aggregated.
    pub channel_order_date: Option<DateTime<Utc>>,
    pub sales_channel: Option<String>,
    pub category_name: Option<String>,
    pub product_name: Option<String>,
    pub option_code: Option<String>,
    pub unit: u64,
    pub price: u64,
    pub delivery_charge: u64,
    /// Whether the item has been released as a sale.
    pub sold: bool,
}

impl OrderItemRecord {
    /// Order metrics count every item; sales metrics only sold ones.
    pub fn metrics(&self) -> PerformanceMetrics {
        let pay_amount = self.price + self.delivery_charge;
        let mut metrics = PerformanceMetrics {
            order_registration: 1,
            order_unit: self.unit,
            order_pay_amount: pay_amount,
            ..Default::default()
        };

        if self.sold {
            metrics.sales_registration = 1;
            metrics.sales_unit = self.unit;
            metrics.sales_pay_amount = pay_amount;
        }

        metrics
    }

    fn labels(&self, mode: DimensionMode) -> (Option<String>, Option<String>) {
        let label = |raw: &Option<String>| Some(DimensionKey::normalize(raw.as_deref()).label);

        match mode {
            DimensionMode::Total => (None, None),
            DimensionMode::SalesChannel => (label(&self.sales_channel), None),
            DimensionMode::Category => (label(&self.category_name), None),
            DimensionMode::CategoryProduct => {
                (label(&self.category_name), label(&self.product_name))
            }
            DimensionMode::ProductOption => (label(&self.option_code), None),
            DimensionMode::Product => (label(&self.product_name), None),
        }
    }
}

type GroupKey = (Option<String>, Option<String>, Option<String>);

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderItemStore {
    records: Vec<OrderItemRecord>,
}

impl InMemoryOrderItemStore {
    pub fn new(records: Vec<OrderItemRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: OrderItemRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Synchronous core of the provider.
    pub fn aggregate(&self, query: &AggregateQuery) -> crate::error::Result<Vec<AggregateRow>> {
        let offset = offset_from_hours(query.utc_offset_hours)?;
        let granularity = query.granularity;

        let wanted_buckets: Option<HashSet<String>> = match &query.calendar {
            CalendarSource::Instants(instants) => Some(
                instants
                    .iter()
                    .map(|i| granularity.bucket_key(shifted_date(*i, &offset)))
                    .collect(),
            ),
            CalendarSource::Range { .. } => None,
        };

        let mut groups: BTreeMap<GroupKey, PerformanceMetrics> = BTreeMap::new();

        for record in &self.records {
            let Some(ordered_at) = record.channel_order_date else {
                continue;
            };

            if let CalendarSource::Range { start, end } = &query.calendar {
                if ordered_at < *start || ordered_at > *end {
                    continue;
                }
            }

            let bucket = granularity.bucket_key(shifted_date(ordered_at, &offset));
            if let Some(wanted) = &wanted_buckets {
                if !wanted.contains(&bucket) {
                    continue;
                }
            }

            if let Some(codes) = &query.dimension_constraint {
                match &record.option_code {
                    Some(code) if codes.contains(code.trim()) => {}
                    _ => continue,
                }
            }

            let (dimension, sub_dimension) = record.labels(query.dimension_mode);
            let bucket = query.group_by_bucket.then_some(bucket);

            *groups.entry((bucket, dimension, sub_dimension)).or_default() += record.metrics();
        }

        Ok(groups
            .into_iter()
            .map(|((bucket, dimension, sub_dimension), metrics)| AggregateRow {
                bucket,
                dimension,
                sub_dimension,
                metrics,
            })
            .collect())
    }
}

#[async_trait]
impl AggregateQueryProvider for InMemoryOrderItemStore {
    async fn query(&self, query: &AggregateQuery) -> Result<Vec<AggregateRow>, ProviderError> {
        self.aggregate(query).map_err(Into::into)
    }
}

/// Category → product names, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    categories: Vec<(String, Vec<String>)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category<I, S>(mut self, name: impl Into<String>, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .push((name.into(), products.into_iter().map(Into::into).collect()));
        self
    }
}

#[async_trait]
impl CatalogLookup for StaticCatalog {
    async fn list_category_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.categories.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_product_names_by_category(
        &self,
        category_name: &str,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(self
            .categories
            .iter()
            .find(|(name, _)| name == category_name)
            .map(|(_, products)| products.clone())
            .unwrap_or_default())
    }
}
