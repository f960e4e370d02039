use crate::error::{Result, SalesPerformanceError};
use crate::schema::{BucketGranularity, CalendarSource, DateBucket, SearchFilter};
use crate::utils::{days_between, next_day, offset_from_hours, shifted_date};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use std::collections::BTreeMap;

/// Builds the zero-filled calendar axis for a single request.
pub struct CalendarSkeleton {
    granularity: BucketGranularity,
}

impl CalendarSkeleton {
    pub fn new(granularity: BucketGranularity) -> Self {
        Self { granularity }
    }

    pub fn build(&self, filter: &SearchFilter) -> Result<Vec<DateBucket>> {
        match filter.calendar_source()? {
            CalendarSource::Range { start, end } => {
                self.build_range(start, end, filter.utc_offset_hours)
            }
            CalendarSource::Instants(instants) => {
                self.build_from_instants(&instants, filter.utc_offset_hours)
            }
        }
    }

    /// Every bucket between the shifted dates of `start` and `end`, inclusive.
    pub fn build_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        utc_offset_hours: i32,
    ) -> Result<Vec<DateBucket>> {
        if start > end {
            return Err(SalesPerformanceError::InvalidRange { start, end });
        }

        let offset = offset_from_hours(utc_offset_hours)?;
        let first = shifted_date(start, &offset);
        let last = shifted_date(end, &offset);

        debug!(
            "Building {:?} skeleton from {} to {} ({} days, offset {:+}h)",
            self.granularity,
            first,
            last,
            days_between(first, last) + 1,
            utc_offset_hours
        );

        Ok(self.collapse(days_inclusive(first, last)))
    }

    /// One bucket per distinct shifted date, ascending. Gaps are preserved.
    pub fn build_from_instants(
        &self,
        instants: &[DateTime<Utc>],
        utc_offset_hours: i32,
    ) -> Result<Vec<DateBucket>> {
        if instants.is_empty() {
            return Err(SalesPerformanceError::MissingParameter(
                "date list is empty".to_string(),
            ));
        }

        let offset = offset_from_hours(utc_offset_hours)?;
        let mut dates: Vec<NaiveDate> = instants
            .iter()
            .map(|instant| shifted_date(*instant, &offset))
            .collect();
        dates.sort();
        dates.dedup();

        Ok(self.collapse(dates))
    }

    // Maps ascending dates to buckets, keeping the first occurrence of each key.
    fn collapse(&self, dates: Vec<NaiveDate>) -> Vec<DateBucket> {
        let buckets: BTreeMap<NaiveDate, DateBucket> = dates
            .into_iter()
            .map(|date| {
                let bucket = DateBucket::new(date, self.granularity);
                (bucket.start, bucket)
            })
            .collect();

        buckets.into_values().collect()
    }
}

fn days_inclusive(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(days_between(first, last).max(0) as usize + 1);
    let mut current = Some(first);

    while let Some(date) = current.filter(|d| *d <= last) {
        dates.push(date);
        current = next_day(date);
    }

    dates
}
