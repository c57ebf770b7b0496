use chrono::NaiveDateTime;
use serde::Serialize;
use strum::{AsRefStr, EnumString};
use thiserror::Error;

use crate::units::TemperatureUnit;

/// Canonical channel names produced by the parsers and derived-field engine
pub const TEMPERATURE_F: &str = "temperature_f";
pub const RELATIVE_HUMIDITY_PCT: &str = "relative_humidity_pct";
pub const DEW_POINT_F: &str = "dew_point_f";

/// Timestamp layouts accepted in logs and interchange files.
///
/// Two-digit-year layouts come first: chrono's `%Y` happily reads `13` as
/// the year 13 AD.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse a calendar datetime in any of the supported layouts
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Errors raised while turning raw log text into a table
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("log is truncated: expected {expected} header lines, found {found}")]
    MissingHeader { expected: usize, found: usize },
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: cannot parse timestamp '{value}'")]
    Timestamp { line: usize, value: String },
    #[error("line {line}: cannot parse '{value}' as a number in column '{column}'")]
    Number {
        line: usize,
        column: String,
        value: String,
    },
}

/// Physical quantity carried by a channel
#[derive(AsRefStr, Clone, Copy, Debug, Default, EnumString, PartialEq, Eq, Hash, Serialize)]
pub enum ChannelKind {
    Temperature,
    RelativeHumidity,
    DewPoint,
    #[default]
    Other,
}

impl ChannelKind {
    pub fn unit(&self) -> &'static str {
        match self {
            ChannelKind::Temperature | ChannelKind::DewPoint => TemperatureUnit::Fahrenheit.symbol(),
            ChannelKind::RelativeHumidity => "%",
            ChannelKind::Other => "",
        }
    }

    /// Column prefix used for per-room columns of an aligned dataset
    pub fn column_prefix(&self) -> &'static str {
        match self {
            ChannelKind::Temperature => "Temp_",
            ChannelKind::RelativeHumidity => "RH_",
            ChannelKind::DewPoint => "DP_",
            ChannelKind::Other => "",
        }
    }

    /// Infer the kind of an aligned-dataset column from its prefix
    pub fn from_column_name(name: &str) -> Self {
        [
            ChannelKind::Temperature,
            ChannelKind::RelativeHumidity,
            ChannelKind::DewPoint,
        ]
        .into_iter()
        .find(|kind| name.starts_with(kind.column_prefix()))
        .unwrap_or(ChannelKind::Other)
    }
}

/// Channel definition
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,
    pub unit: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            unit: kind.unit().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Sample value storage. Missing samples (resampling gaps, alignment holes)
/// are stored as NaN.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Value(f64);

impl Value {
    pub const MISSING: Value = Value(f64::NAN);

    #[inline]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.0.is_nan()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if self.is_missing() {
            serializer.serialize_none()
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// Source details kept alongside a parsed log
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LogMeta {
    /// Preamble lines preceding the column header
    pub preamble: Vec<String>,
    /// Column names exactly as written in the source header
    pub source_columns: Vec<String>,
}

/// Time-indexed table of samples.
///
/// Rows are stored in timestamp order; `data[i]` holds one value per channel
/// for `times[i]`. Transforms never modify a table in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimeSeriesTable {
    pub meta: LogMeta,
    pub channels: Vec<Channel>,
    pub times: Vec<NaiveDateTime>,
    pub data: Vec<Vec<Value>>,
}

impl TimeSeriesTable {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    /// Build a table from a time axis and one column per channel.
    /// Columns shorter than the time axis are padded with missing values.
    pub fn from_columns(
        channels: Vec<Channel>,
        times: Vec<NaiveDateTime>,
        columns: &[Vec<f64>],
    ) -> Self {
        let data = (0..times.len())
            .map(|row| {
                columns
                    .iter()
                    .map(|col| col.get(row).copied().map_or(Value::MISSING, Value::new))
                    .collect()
            })
            .collect();

        Self {
            meta: LogMeta::default(),
            channels,
            times,
            data,
        }
    }

    pub fn push_row(&mut self, time: NaiveDateTime, values: Vec<Value>) {
        self.times.push(time);
        self.data.push(values);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Get data for a specific channel by index
    pub fn get_channel_data(&self, channel_index: usize) -> Vec<f64> {
        self.data
            .iter()
            .filter_map(|row| row.get(channel_index).map(|v| v.as_f64()))
            .collect()
    }

    /// Find channel index by name (case-insensitive)
    pub fn find_channel_index(&self, name: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.find_channel_index(name).is_some()
    }

    /// Get channel values by name (case-insensitive)
    pub fn channel_values(&self, name: &str) -> Option<Vec<f64>> {
        self.find_channel_index(name)
            .map(|idx| self.get_channel_data(idx))
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    /// All channels as column vectors, in channel order
    pub fn columns(&self) -> Vec<Vec<f64>> {
        (0..self.channels.len())
            .map(|idx| self.get_channel_data(idx))
            .collect()
    }

    /// New table with one extra channel appended.
    /// Missing trailing values are padded with NaN.
    pub fn with_channel(&self, channel: Channel, values: &[f64]) -> Self {
        let mut table = self.clone();
        for (row, slot) in table.data.iter_mut().enumerate() {
            slot.push(values.get(row).copied().map_or(Value::MISSING, Value::new));
        }
        table.channels.push(channel);
        table
    }

    /// New table restricted to the named channels, in the given order.
    /// Unknown names are skipped.
    pub fn select_channels(&self, names: &[&str]) -> Self {
        let indices: Vec<usize> = names
            .iter()
            .filter_map(|name| self.find_channel_index(name))
            .collect();

        Self {
            meta: self.meta.clone(),
            channels: indices.iter().map(|&i| self.channels[i].clone()).collect(),
            times: self.times.clone(),
            data: self
                .data
                .iter()
                .map(|row| indices.iter().map(|&i| row[i]).collect())
                .collect(),
        }
    }

    /// New table containing only rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&NaiveDateTime, &[Value]) -> bool,
    {
        let mut table = Self {
            meta: self.meta.clone(),
            channels: self.channels.clone(),
            ..Default::default()
        };
        for (time, row) in self.times.iter().zip(&self.data) {
            if keep(time, row) {
                table.push_row(*time, row.clone());
            }
        }
        table
    }

    pub fn has_missing(&self) -> bool {
        self.data.iter().flatten().any(Value::is_missing)
    }

    /// New table without any row that has a missing value
    pub fn drop_missing(&self) -> Self {
        self.filter_rows(|_, row| !row.iter().any(Value::is_missing))
    }

    pub fn is_time_sorted(&self) -> bool {
        self.times.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable sort of rows by timestamp
    pub fn sorted_by_time(&self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.times[i]);

        Self {
            meta: self.meta.clone(),
            channels: self.channels.clone(),
            times: order.iter().map(|&i| self.times[i]).collect(),
            data: order.iter().map(|&i| self.data[i].clone()).collect(),
        }
    }

    /// Median spacing between consecutive samples in minutes
    pub fn sample_period_minutes(&self) -> Option<f64> {
        let mut gaps: Vec<f64> = self
            .times
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds() as f64 / 60.0)
            .filter(|gap| *gap > 0.0)
            .collect();

        if gaps.is_empty() {
            return None;
        }

        gaps.sort_by(|a, b| a.total_cmp(b));
        Some(gaps[gaps.len() / 2])
    }
}

/// Trait for log file parsers
pub trait Parseable {
    fn parse(&self, data: &str) -> Result<TimeSeriesTable, ParseError>;
}
