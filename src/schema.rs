use crate::dimension::DimensionKey;
use crate::error::{Result, SalesPerformanceError};
use crate::utils::{month_start, parse_instant, parse_instant_list, week_start};
use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::ops::{Add, AddAssign};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BucketGranularity {
    #[default]
    #[schemars(description = "One bucket per calendar day, keyed YYYY-MM-DD")]
    Day,

    #[schemars(description = "One bucket per ISO week, keyed by the Monday that starts it (YYYY-MM-DD)")]
    Week,

    #[schemars(description = "One bucket per calendar month, keyed YYYY-MM")]
    Month,
}

impl BucketGranularity {
    /// First calendar day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => week_start(date),
            Self::Month => month_start(date),
        }
    }

    /// The key both the skeleton and the provider must use for `date`.
    pub fn bucket_key(&self, date: NaiveDate) -> String {
        match self {
            Self::Day | Self::Week => self.bucket_start(date).format("%Y-%m-%d").to_string(),
            Self::Month => date.format("%Y-%m").to_string(),
        }
    }

    /// Parses the `dimension` request parameter (`date`, `week`, `month`).
    pub fn from_param(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "date" | "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(SalesPerformanceError::InvalidParameter {
                name: "dimension".to_string(),
                value: raw.to_string(),
                reason: "expected one of date, week, month".to_string(),
            }),
        }
    }
}

/// Secondary axis a provider groups by, in addition to the date bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DimensionMode {
    Total,
    SalesChannel,
    Category,
    /// Category with a nested product level.
    CategoryProduct,
    ProductOption,
    Product,
}

/// Where the calendar skeleton comes from for a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarSource {
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    Instants(Vec<DateTime<Utc>>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    #[schemars(description = "Inclusive lower bound of the search range (UTC instant)")]
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[schemars(description = "Inclusive upper bound of the search range (UTC instant)")]
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[schemars(
        description = "Hours added to stored UTC instants before truncating to a business date (e.g. 9 for KST)"
    )]
    #[serde(default)]
    pub utc_offset_hours: i32,

    #[schemars(description = "Restrict aggregation to these option codes")]
    #[serde(default)]
    pub dimension_constraint: Option<BTreeSet<String>>,

    #[schemars(
        description = "Explicit list of instants whose shifted dates form the skeleton. Takes precedence over the range when non-empty."
    )]
    #[serde(default)]
    pub explicit_dates: Option<Vec<DateTime<Utc>>>,

    #[schemars(description = "Bucket size; falls back to the engine default when absent")]
    #[serde(default)]
    pub granularity: Option<BucketGranularity>,
}

impl SearchFilter {
    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>, utc_offset_hours: i32) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            utc_offset_hours,
            ..Self::default()
        }
    }

    pub fn dates(instants: Vec<DateTime<Utc>>, utc_offset_hours: i32) -> Self {
        Self {
            explicit_dates: Some(instants),
            utc_offset_hours,
            ..Self::default()
        }
    }

    pub fn with_dimension_constraint<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimension_constraint = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_granularity(mut self, granularity: BucketGranularity) -> Self {
        self.granularity = Some(granularity);
        self
    }

    /// Resolves which calendar source this filter describes.
    ///
    /// A non-empty explicit list wins over the range. Absent bounds are a
    /// validation failure, never an empty result.
    pub fn calendar_source(&self) -> Result<CalendarSource> {
        if let Some(instants) = self.explicit_dates.as_ref().filter(|d| !d.is_empty()) {
            return Ok(CalendarSource::Instants(instants.clone()));
        }

        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(SalesPerformanceError::InvalidRange { start, end });
                }
                Ok(CalendarSource::Range { start, end })
            }
            (None, None) if self.explicit_dates.is_some() => Err(
                SalesPerformanceError::MissingParameter("date list is empty".to_string()),
            ),
            (None, _) => Err(SalesPerformanceError::MissingParameter(
                "startDate".to_string(),
            )),
            (_, None) => Err(SalesPerformanceError::MissingParameter(
                "endDate".to_string(),
            )),
        }
    }

    /// Builds a filter from flat request parameters.
    ///
    /// Recognised keys: `startDate`, `endDate`, `date` (comma separated),
    /// `utcHourDifference`, `optionCodes` (comma separated) and `dimension`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        Self::from_params_or(params, 0)
    }

    /// Like [`SearchFilter::from_params`], falling back to `default_utc_offset_hours`
    /// when no `utcHourDifference` is given.
    pub fn from_params_or(
        params: &HashMap<String, String>,
        default_utc_offset_hours: i32,
    ) -> Result<Self> {
        let param = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let start_date = param("startDate")
            .map(|raw| parse_instant("startDate", raw))
            .transpose()?;
        let end_date = param("endDate")
            .map(|raw| parse_instant("endDate", raw))
            .transpose()?;
        let explicit_dates = param("date")
            .map(|raw| parse_instant_list("date", raw))
            .transpose()?;

        let utc_offset_hours = match param("utcHourDifference") {
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|e| SalesPerformanceError::InvalidParameter {
                    name: "utcHourDifference".to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })?,
            None => default_utc_offset_hours,
        };

        let dimension_constraint = param("optionCodes").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
        });

        let granularity = param("dimension")
            .map(BucketGranularity::from_param)
            .transpose()?;

        Ok(Self {
            start_date,
            end_date,
            utc_offset_hours,
            dimension_constraint,
            explicit_dates,
            granularity,
        })
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SearchFilter)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub order_registration: u64,
    pub order_unit: u64,
    pub order_pay_amount: u64,
    pub sales_registration: u64,
    pub sales_unit: u64,
    pub sales_pay_amount: u64,
}

impl PerformanceMetrics {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for PerformanceMetrics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            order_registration: self.order_registration + rhs.order_registration,
            order_unit: self.order_unit + rhs.order_unit,
            order_pay_amount: self.order_pay_amount + rhs.order_pay_amount,
            sales_registration: self.sales_registration + rhs.sales_registration,
            sales_unit: self.sales_unit + rhs.sales_unit,
            sales_pay_amount: self.sales_pay_amount + rhs.sales_pay_amount,
        }
    }
}

impl AddAssign for PerformanceMetrics {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for PerformanceMetrics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DateBucket {
    /// Formatted key in the shifted timezone (`YYYY-MM-DD`, or `YYYY-MM` for months).
    pub key: String,
    /// First calendar day covered by the bucket.
    pub start: NaiveDate,
}

impl DateBucket {
    pub fn new(date: NaiveDate, granularity: BucketGranularity) -> Self {
        Self {
            key: granularity.bucket_key(date),
            start: granularity.bucket_start(date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceEntry {
    pub bucket: Option<DateBucket>,
    pub dimension: Option<DimensionKey>,
    pub sub_dimension: Option<DimensionKey>,
    pub metrics: PerformanceMetrics,
}

impl PerformanceEntry {
    pub fn zeroed(
        bucket: Option<DateBucket>,
        dimension: Option<DimensionKey>,
        sub_dimension: Option<DimensionKey>,
    ) -> Self {
        Self {
            bucket,
            dimension,
            sub_dimension,
            metrics: PerformanceMetrics::default(),
        }
    }
}

/// Sparse grouped result from an aggregate query provider. Labels are raw and
/// may be null or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub bucket: Option<String>,
    pub dimension: Option<String>,
    pub sub_dimension: Option<String>,
    pub metrics: PerformanceMetrics,
}

impl AggregateRow {
    pub fn for_bucket(bucket: impl Into<String>, metrics: PerformanceMetrics) -> Self {
        Self {
            bucket: Some(bucket.into()),
            metrics,
            ..Self::default()
        }
    }

    pub fn with_dimension(mut self, label: Option<&str>) -> Self {
        self.dimension = label.map(str::to_string);
        self
    }

    pub fn with_sub_dimension(mut self, label: Option<&str>) -> Self {
        self.sub_dimension = label.map(str::to_string);
        self
    }

    pub fn dimension_key(&self) -> DimensionKey {
        DimensionKey::normalize(self.dimension.as_deref())
    }

    pub fn sub_dimension_key(&self) -> DimensionKey {
        DimensionKey::normalize(self.sub_dimension.as_deref())
    }
}
