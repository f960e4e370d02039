use crate::schema::{AggregateRow, DateBucket, PerformanceEntry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Reserved label for records whose dimension attribute is null or blank.
pub const UNASSIGNED_LABEL: &str = "미지정";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DimensionKey {
    pub label: String,
}

impl DimensionKey {
    pub fn unassigned() -> Self {
        Self {
            label: UNASSIGNED_LABEL.to_string(),
        }
    }

    /// Maps a raw label to its key: trimmed text, or [`UNASSIGNED_LABEL`] when
    /// the label is null or blank. Every comparison of labels goes through here.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(label) if !label.is_empty() => Self {
                label: label.to_string(),
            },
            _ => Self::unassigned(),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.label == UNASSIGNED_LABEL
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Ordered, de-duplicated dimension keys with the unassigned key kept last.
#[derive(Debug, Clone, Default)]
pub struct KnownDimensions {
    keys: Vec<DimensionKey>,
    seen: HashSet<DimensionKey>,
}

impl KnownDimensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds keys in the given order (catalog or constraint order).
    pub fn seed<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            self.push(DimensionKey::normalize(Some(label.as_ref())));
        }
        self
    }

    /// Adds labels observed in provider rows that the seed did not know about,
    /// in sorted order after the seeded keys.
    pub fn observe<'a, I>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let extra: BTreeSet<DimensionKey> = labels
            .into_iter()
            .map(DimensionKey::normalize)
            .filter(|key| !self.seen.contains(key))
            .collect();

        for key in extra {
            self.push(key);
        }
        self
    }

    fn push(&mut self, key: DimensionKey) {
        if key.is_unassigned() {
            return;
        }
        if self.seen.insert(key.clone()) {
            self.keys.push(key);
        }
    }

    /// Final key list; the unassigned key is always present exactly once.
    pub fn into_keys(self) -> Vec<DimensionKey> {
        let mut keys = self.keys;
        keys.push(DimensionKey::unassigned());
        keys
    }
}

/// Key list for a single-level breakdown: seed, then anything the rows mention.
pub fn known_keys<S: AsRef<str>>(seed: &[S], rows: &[AggregateRow]) -> Vec<DimensionKey> {
    KnownDimensions::new()
        .seed(seed)
        .observe(rows.iter().map(|row| row.dimension.as_deref()))
        .into_keys()
}

/// Date-first expansion: one zero entry per (bucket, key), bucket-major.
pub fn expand(skeleton: &[DateBucket], keys: &[DimensionKey]) -> Vec<PerformanceEntry> {
    skeleton
        .iter()
        .flat_map(|bucket| {
            keys.iter().map(move |key| {
                PerformanceEntry::zeroed(Some(bucket.clone()), Some(key.clone()), None)
            })
        })
        .collect()
}

/// Flat skeleton with no dimension axis.
pub fn expand_dates(skeleton: &[DateBucket]) -> Vec<PerformanceEntry> {
    skeleton
        .iter()
        .map(|bucket| PerformanceEntry::zeroed(Some(bucket.clone()), None, None))
        .collect()
}

/// Dimension-first expansion with no date axis.
pub fn expand_without_dates(keys: &[DimensionKey]) -> Vec<PerformanceEntry> {
    keys.iter()
        .map(|key| PerformanceEntry::zeroed(None, Some(key.clone()), None))
        .collect()
}

/// Two-level expansion (category → product) with no date axis. Each parent's
/// child list must already end with the unassigned key.
pub fn expand_nested(parents: &[(DimensionKey, Vec<DimensionKey>)]) -> Vec<PerformanceEntry> {
    parents
        .iter()
        .flat_map(|(parent, children)| {
            children.iter().map(move |child| {
                PerformanceEntry::zeroed(None, Some(parent.clone()), Some(child.clone()))
            })
        })
        .collect()
}
