use crate::dimension::DimensionKey;
use crate::error::{Result, SalesPerformanceError};
use crate::schema::{AggregateRow, PerformanceEntry, PerformanceMetrics};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MergeKey {
    bucket: Option<String>,
    dimension: Option<DimensionKey>,
    sub_dimension: Option<DimensionKey>,
}

impl MergeKey {
    fn from_entry(entry: &PerformanceEntry) -> Self {
        Self {
            bucket: entry.bucket.as_ref().map(|b| b.key.clone()),
            dimension: entry
                .dimension
                .as_ref()
                .map(|d| DimensionKey::normalize(Some(&d.label))),
            sub_dimension: entry
                .sub_dimension
                .as_ref()
                .map(|d| DimensionKey::normalize(Some(&d.label))),
        }
    }

    fn from_row(row: &AggregateRow, shape: Shape) -> Self {
        Self {
            bucket: row.bucket.clone(),
            dimension: shape.dimension.then(|| row.dimension_key()),
            sub_dimension: shape.sub_dimension.then(|| row.sub_dimension_key()),
        }
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.bucket.as_deref().unwrap_or("*"))?;
        if let Some(dimension) = &self.dimension {
            write!(f, ", {}", dimension)?;
        }
        if let Some(sub) = &self.sub_dimension {
            write!(f, ", {}", sub)?;
        }
        write!(f, ")")
    }
}

// Which label axes the skeleton carries; row labels outside it are not keyed.
#[derive(Debug, Clone, Copy)]
struct Shape {
    dimension: bool,
    sub_dimension: bool,
}

impl Shape {
    fn of(skeleton: &[PerformanceEntry]) -> Self {
        Self {
            dimension: skeleton.iter().any(|e| e.dimension.is_some()),
            sub_dimension: skeleton.iter().any(|e| e.sub_dimension.is_some()),
        }
    }
}

struct RowSlot<'a> {
    metrics: &'a PerformanceMetrics,
    matches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub entries: Vec<PerformanceEntry>,
    /// Rows whose key has no skeleton entry; they are dropped.
    pub unmatched_rows: usize,
}

/// Overlays sparse provider rows onto a zero-filled skeleton.
///
/// The result has the skeleton's length and order. Matched entries take the
/// row's metrics verbatim; unmatched entries keep zeros. A skeleton key hit by
/// more than one row is an upstream grouping bug and fails the merge.
pub fn merge(skeleton: &[PerformanceEntry], rows: &[AggregateRow]) -> Result<Vec<PerformanceEntry>> {
    merge_detailed(skeleton, rows).map(|outcome| outcome.entries)
}

pub fn merge_detailed(
    skeleton: &[PerformanceEntry],
    rows: &[AggregateRow],
) -> Result<MergeOutcome> {
    let shape = Shape::of(skeleton);

    let mut index: HashMap<MergeKey, RowSlot<'_>> = HashMap::with_capacity(rows.len());
    for row in rows {
        index
            .entry(MergeKey::from_row(row, shape))
            .and_modify(|slot| slot.matches += 1)
            .or_insert(RowSlot {
                metrics: &row.metrics,
                matches: 1,
            });
    }

    let mut matched = 0usize;
    let entries = skeleton
        .iter()
        .map(|entry| {
            let key = MergeKey::from_entry(entry);
            match index.get(&key) {
                Some(slot) if slot.matches > 1 => {
                    Err(SalesPerformanceError::MultipleMatchInvariantViolation {
                        key: key.to_string(),
                        matches: slot.matches,
                    })
                }
                Some(slot) => {
                    matched += 1;
                    Ok(PerformanceEntry {
                        metrics: *slot.metrics,
                        ..entry.clone()
                    })
                }
                None => Ok(entry.clone()),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let unmatched_rows = rows.len().saturating_sub(matched);
    if unmatched_rows > 0 {
        warn!(
            "{} aggregate row(s) fell outside the skeleton and were dropped",
            unmatched_rows
        );
    }
    debug!(
        "Merged {} of {} rows into {} skeleton entries",
        matched,
        rows.len(),
        entries.len()
    );

    Ok(MergeOutcome {
        entries,
        unmatched_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{expand, expand_dates, expand_nested, DimensionKey, KnownDimensions};
    use crate::schema::{BucketGranularity, DateBucket};
    use chrono::NaiveDate;
    use rand::Rng;

    fn buckets(days: std::ops::RangeInclusive<u32>) -> Vec<DateBucket> {
        days.map(|d| {
            DateBucket::new(
                NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                BucketGranularity::Day,
            )
        })
        .collect()
    }

    fn metrics(order_registration: u64, order_pay_amount: u64) -> PerformanceMetrics {
        PerformanceMetrics {
            order_registration,
            order_pay_amount,
            ..Default::default()
        }
    }

    #[test]
    fn test_gap_fill_and_exact_match() {
        let skeleton = expand_dates(&buckets(1..=3));
        let row_metrics = PerformanceMetrics {
            order_registration: 3,
            order_pay_amount: 1500,
            sales_registration: 1,
            sales_pay_amount: 500,
            ..Default::default()
        };
        let rows = vec![AggregateRow::for_bucket("2024-01-02", row_metrics)];

        let merged = merge(&skeleton, &rows).unwrap();

        assert_eq!(merged.len(), 3);
        assert!(merged[0].metrics.is_zero());
        assert_eq!(merged[1].metrics, row_metrics);
        assert!(merged[2].metrics.is_zero());
    }

    #[test]
    fn test_blank_label_lands_in_unassigned() {
        let keys = KnownDimensions::new().seed(["Naver"]).into_keys();
        let skeleton = expand(&buckets(1..=1), &keys);
        let rows = vec![AggregateRow::for_bucket("2024-01-01", metrics(1, 100))
            .with_dimension(Some("  "))];

        let merged = merge(&skeleton, &rows).unwrap();

        let naver = merged
            .iter()
            .find(|e| e.dimension.as_ref().map(|d| d.label.as_str()) == Some("Naver"))
            .unwrap();
        assert!(naver.metrics.is_zero());

        let unassigned = merged
            .iter()
            .find(|e| e.dimension.as_ref().is_some_and(|d| d.is_unassigned()))
            .unwrap();
        assert_eq!(unassigned.metrics, metrics(1, 100));
    }

    #[test]
    fn test_duplicate_match_fails_loudly() {
        let skeleton = expand_dates(&buckets(1..=2));
        let rows = vec![
            AggregateRow::for_bucket("2024-01-01", metrics(1, 10)),
            AggregateRow::for_bucket("2024-01-01", metrics(2, 20)),
        ];

        let result = merge(&skeleton, &rows);
        assert!(matches!(
            result,
            Err(SalesPerformanceError::MultipleMatchInvariantViolation { matches: 2, .. })
        ));
    }

    #[test]
    fn test_nested_rows_match_on_both_levels() {
        let outer = DimensionKey::normalize(Some("Outer"));
        let products = KnownDimensions::new().seed(["Coat"]).into_keys();
        let skeleton = expand_nested(&[(outer, products)]);
        let rows = vec![
            AggregateRow {
                bucket: None,
                metrics: metrics(2, 200),
                ..Default::default()
            }
            .with_dimension(Some("Outer"))
            .with_sub_dimension(Some(" Coat")),
            AggregateRow {
                bucket: None,
                metrics: metrics(1, 50),
                ..Default::default()
            }
            .with_dimension(Some("Outer"))
            .with_sub_dimension(None),
        ];

        let merged = merge(&skeleton, &rows).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].metrics, metrics(2, 200));
        assert!(merged[1].sub_dimension.as_ref().is_some_and(|d| d.is_unassigned()));
        assert_eq!(merged[1].metrics, metrics(1, 50));
    }

    #[test]
    fn test_unmatched_rows_are_counted_not_placed() {
        let skeleton = expand_dates(&buckets(1..=2));
        let rows = vec![
            AggregateRow::for_bucket("2024-01-02", metrics(1, 10)),
            AggregateRow::for_bucket("2024-02-01", metrics(5, 50)),
        ];

        let outcome = merge_detailed(&skeleton, &rows).unwrap();
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.unmatched_rows, 1);
        assert_eq!(outcome.entries[1].metrics, metrics(1, 10));
    }

    #[test]
    fn test_merge_is_idempotent_and_leaves_rows_untouched() {
        let mut rng = rand::thread_rng();
        let keys = KnownDimensions::new().seed(["A", "B", "C"]).into_keys();
        let skeleton = expand(&buckets(1..=10), &keys);

        let mut rows = Vec::new();
        for entry in &skeleton {
            if !rng.gen_bool(0.4) {
                continue;
            }
            rows.push(AggregateRow {
                bucket: entry.bucket.as_ref().map(|b| b.key.clone()),
                dimension: entry.dimension.as_ref().map(|d| d.label.clone()),
                sub_dimension: None,
                metrics: metrics(rng.gen_range(1..50), rng.gen_range(100..10_000)),
            });
        }
        let rows_before = rows.clone();

        let once = merge(&skeleton, &rows).unwrap();
        let twice = merge(&once, &rows).unwrap();

        assert_eq!(once, twice);
        assert_eq!(rows, rows_before);
        assert_eq!(
            once.iter().filter(|e| !e.metrics.is_zero()).count(),
            rows.len()
        );
    }
}
