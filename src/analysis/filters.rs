//! Row filters by date range and calendar month.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::AnalysisError;
use crate::parsers::types::TimeSeriesTable;

/// Date range with a half-open test: `start < t <= end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, AnalysisError> {
        if end < start {
            return Err(AnalysisError::InvalidParameter(format!(
                "date range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Range covering every row of a table
    pub fn covering(table: &TimeSeriesTable) -> Option<Self> {
        let first = *table.times.iter().min()?;
        let last = *table.times.iter().max()?;
        // Start is exclusive; step back so the first row is kept
        Some(Self {
            start: first - chrono::Duration::seconds(1),
            end: last,
        })
    }

    #[inline]
    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        self.start < *t && *t <= self.end
    }
}

/// Set of calendar months (1-12). Empty means no restriction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSet(BTreeSet<u32>);

impl MonthSet {
    pub fn new<I: IntoIterator<Item = u32>>(months: I) -> Result<Self, AnalysisError> {
        let set: BTreeSet<u32> = months.into_iter().collect();
        if let Some(bad) = set.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(AnalysisError::InvalidParameter(format!(
                "month {bad} is outside 1-12"
            )));
        }
        Ok(Self(set))
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn contains(&self, month: u32) -> bool {
        self.0.is_empty() || self.0.contains(&month)
    }

    pub fn months(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

/// Keep rows inside `range` whose month is in `months`.
///
/// Row order is preserved. An empty result is not an error.
pub fn filter_table(table: &TimeSeriesTable, range: &DateRange, months: &MonthSet) -> TimeSeriesTable {
    let filtered = table.filter_rows(|t, _| range.contains(t) && months.contains(t.month()));
    tracing::debug!(
        "Date filter kept {} of {} rows",
        filtered.len(),
        table.len()
    );
    filtered
}

/// Group values by (year, month), skipping missing samples
pub fn group_by_month(times: &[NaiveDateTime], values: &[f64]) -> BTreeMap<(i32, u32), Vec<f64>> {
    let mut groups: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for (t, &v) in times.iter().zip(values) {
        if v.is_nan() {
            continue;
        }
        groups.entry((t.year(), t.month())).or_default().push(v);
    }
    groups
}
