use crate::schema::{PerformanceEntry, PerformanceMetrics};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One bucket of a headline series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatePerformance {
    pub datetime: NaiveDate,
    pub bucket: String,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DimensionPerformance {
    pub label: String,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateDimensionPerformance {
    pub datetime: NaiveDate,
    pub bucket: String,
    pub performances: Vec<DimensionPerformance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProductPerformance {
    pub category: String,
    /// Sum over the category's products.
    pub total: PerformanceMetrics,
    pub products: Vec<DimensionPerformance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceOverview {
    pub dashboard: Vec<DatePerformance>,
    pub channels: Vec<DateDimensionPerformance>,
    pub categories: Vec<DateDimensionPerformance>,
}

/// Flat series, one item per dated entry.
pub fn flat_series(entries: &[PerformanceEntry]) -> Vec<DatePerformance> {
    entries
        .iter()
        .filter_map(|entry| {
            entry.bucket.as_ref().map(|bucket| DatePerformance {
                datetime: bucket.start,
                bucket: bucket.key.clone(),
                metrics: entry.metrics,
            })
        })
        .collect()
}

/// Groups dated entries by bucket, keeping bucket order and per-bucket dimension order.
pub fn by_date(entries: &[PerformanceEntry]) -> Vec<DateDimensionPerformance> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<DateDimensionPerformance> = Vec::new();

    for entry in entries {
        let (Some(bucket), Some(dimension)) = (&entry.bucket, &entry.dimension) else {
            continue;
        };

        let idx = *positions.entry(bucket.key.as_str()).or_insert_with(|| {
            groups.push(DateDimensionPerformance {
                datetime: bucket.start,
                bucket: bucket.key.clone(),
                performances: Vec::new(),
            });
            groups.len() - 1
        });

        groups[idx].performances.push(DimensionPerformance {
            label: dimension.label.clone(),
            metrics: entry.metrics,
        });
    }

    groups
}

/// Groups undated two-level entries by their parent, ranking children within each parent.
pub fn by_dimension(entries: &[PerformanceEntry]) -> Vec<CategoryProductPerformance> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<CategoryProductPerformance> = Vec::new();

    for entry in entries {
        let (Some(parent), Some(child)) = (&entry.dimension, &entry.sub_dimension) else {
            continue;
        };

        let idx = *positions.entry(parent.label.as_str()).or_insert_with(|| {
            groups.push(CategoryProductPerformance {
                category: parent.label.clone(),
                total: PerformanceMetrics::default(),
                products: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[idx];
        group.total += entry.metrics;
        group.products.push(DimensionPerformance {
            label: child.label.clone(),
            metrics: entry.metrics,
        });
    }

    for group in &mut groups {
        rank(&mut group.products);
    }

    groups
}

/// Best-performer list over undated single-level entries. Entries with no
/// activity at all are left out; `limit` keeps the top N.
pub fn leaderboard(entries: &[PerformanceEntry], limit: Option<usize>) -> Vec<DimensionPerformance> {
    let mut performers: Vec<DimensionPerformance> = entries
        .iter()
        .filter(|entry| !entry.metrics.is_zero())
        .filter_map(|entry| {
            entry.dimension.as_ref().map(|dimension| DimensionPerformance {
                label: dimension.label.clone(),
                metrics: entry.metrics,
            })
        })
        .collect();

    rank(&mut performers);

    if let Some(limit) = limit {
        performers.truncate(limit);
    }
    performers
}

/// Descending by sales pay amount; ties keep input order.
pub fn rank(performances: &mut [DimensionPerformance]) {
    performances.sort_by(|a, b| b.metrics.sales_pay_amount.cmp(&a.metrics.sales_pay_amount));
}
