//! Resampling of irregular series onto a fixed grid and alignment of
//! several series into one table.
//!
//! Grid buckets start at multiples of the period counted from the Unix epoch,
//! so a 15-minute grid always falls on :00, :15, :30 and :45. Each bucket
//! holds the mean of the samples in `[bucket, bucket + period)`. Empty
//! interior buckets are filled by linear interpolation; nothing is
//! extrapolated.

use super::*;
use crate::parsers::types::{Channel, ChannelKind};
use chrono::{DateTime, Duration, NaiveDateTime};

/// Series sampled on a regular grid
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegularSeries {
    pub start: NaiveDateTime,
    pub period_minutes: u32,
    pub values: Vec<f64>,
}

impl RegularSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn period(&self) -> Duration {
        Duration::minutes(self.period_minutes as i64)
    }

    pub fn time_at(&self, index: usize) -> NaiveDateTime {
        self.start + self.period() * index as i32
    }

    pub fn times(&self) -> Vec<NaiveDateTime> {
        (0..self.len()).map(|i| self.time_at(i)).collect()
    }

    /// Timestamp of the last grid point
    pub fn end(&self) -> NaiveDateTime {
        self.time_at(self.len().saturating_sub(1))
    }

    pub fn gap_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// Most grid points a single resample or alignment will allocate
pub const MAX_GRID_POINTS: usize = 5_000_000;

/// Number of grid points spanning `steps` periods, rejecting implausible spans
fn grid_len(steps: i64) -> Result<usize, AnalysisError> {
    usize::try_from(steps)
        .ok()
        .and_then(|s| s.checked_add(1))
        .filter(|&len| len <= MAX_GRID_POINTS)
        .ok_or_else(|| {
            AnalysisError::InvalidParameter(format!(
                "time span of {} grid steps exceeds the {MAX_GRID_POINTS}-point limit; check for a stray timestamp",
                steps
            ))
        })
}

fn bucket_of(t: &NaiveDateTime, period_ms: i64) -> i64 {
    t.and_utc().timestamp_millis().div_euclid(period_ms)
}

fn bucket_start(bucket: i64, period_ms: i64) -> Result<NaiveDateTime, AnalysisError> {
    DateTime::from_timestamp_millis(bucket * period_ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| AnalysisError::Computation(format!("grid bucket {bucket} out of range")))
}

/// Mean of each grid bucket, without interpolation. Missing samples are ignored.
pub fn bucket_means(
    table: &TimeSeriesTable,
    field: &str,
    period_minutes: u32,
) -> Result<RegularSeries, AnalysisError> {
    require_non_empty(table)?;
    if period_minutes == 0 {
        return Err(AnalysisError::InvalidParameter(
            "resample period must be at least one minute".to_string(),
        ));
    }
    let values = require_channel(table, field)?;

    let period_ms = period_minutes as i64 * 60_000;
    let buckets: Vec<i64> = table.times.iter().map(|t| bucket_of(t, period_ms)).collect();
    // Tables are time-sorted, but min/max keeps this independent of row order
    let first = buckets.iter().copied().min().unwrap_or_default();
    let last = buckets.iter().copied().max().unwrap_or_default();
    let len = grid_len(last - first)?;

    let mut sums = vec![0.0; len];
    let mut counts = vec![0usize; len];
    for (&b, &v) in buckets.iter().zip(&values) {
        if v.is_nan() {
            continue;
        }
        let idx = (b - first) as usize;
        sums[idx] += v;
        counts[idx] += 1;
    }

    Ok(RegularSeries {
        start: bucket_start(first, period_ms)?,
        period_minutes,
        values: sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { f64::NAN } else { s / c as f64 })
            .collect(),
    })
}

/// Fill interior NaN runs by linear interpolation between their neighbours.
/// Leading and trailing NaNs are left in place.
pub fn interpolate_linear(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    let mut last_valid: Option<usize> = None;

    for i in 0..out.len() {
        if out[i].is_nan() {
            continue;
        }
        if let Some(prev) = last_valid {
            if i - prev > 1 {
                let (a, b) = (out[prev], out[i]);
                let span = (i - prev) as f64;
                for (offset, slot) in out[prev + 1..i].iter_mut().enumerate() {
                    *slot = a + (b - a) * (offset + 1) as f64 / span;
                }
            }
        }
        last_valid = Some(i);
    }

    out
}

/// Resample one channel onto the epoch-aligned grid and interpolate gaps
pub fn resample(
    table: &TimeSeriesTable,
    field: &str,
    period_minutes: u32,
) -> Result<RegularSeries, AnalysisError> {
    let mut series = bucket_means(table, field, period_minutes)?;
    let gaps = series.gap_count();
    series.values = interpolate_linear(&series.values);

    if gaps > 0 {
        tracing::debug!(
            "Interpolated {} empty {}-minute buckets in '{}'",
            gaps,
            period_minutes,
            field
        );
    }
    Ok(series)
}

/// Place named series on their union grid.
///
/// Every series must share one period. Grid points a series does not cover
/// are NaN; use [`TimeSeriesTable::drop_missing`] to keep complete rows only.
pub fn align(series: &[(String, RegularSeries)]) -> Result<TimeSeriesTable, AnalysisError> {
    let Some((_, first)) = series.first() else {
        return Err(AnalysisError::EmptyDataset);
    };
    let period_minutes = first.period_minutes;

    if let Some((name, s)) = series.iter().find(|(_, s)| s.period_minutes != period_minutes) {
        return Err(AnalysisError::Alignment(format!(
            "series '{name}' uses a {}-minute grid, expected {period_minutes}",
            s.period_minutes
        )));
    }

    let non_empty: Vec<&RegularSeries> = series.iter().map(|(_, s)| s).filter(|s| !s.is_empty()).collect();
    let (Some(start), Some(end)) = (
        non_empty.iter().map(|s| s.start).min(),
        non_empty.iter().map(|s| s.end()).max(),
    ) else {
        return Err(AnalysisError::EmptyDataset);
    };

    let step = Duration::minutes(period_minutes as i64);
    let len = grid_len((end - start).num_minutes() / period_minutes as i64)?;

    let columns: Vec<Vec<f64>> = series
        .iter()
        .map(|(_, s)| {
            let mut col = vec![f64::NAN; len];
            if !s.is_empty() {
                let offset = ((s.start - start).num_minutes() / period_minutes as i64) as usize;
                col[offset..offset + s.len()].copy_from_slice(&s.values);
            }
            col
        })
        .collect();

    let channels = series
        .iter()
        .map(|(name, _)| Channel::new(name.clone(), ChannelKind::from_column_name(name)))
        .collect();
    let times = (0..len).map(|i| start + step * i as i32).collect();

    Ok(TimeSeriesTable::from_columns(channels, times, &columns))
}
