//! Multi-room datasets.
//!
//! A dataset is built once from a [`DatasetSource`]: either raw sensor logs
//! (parsed, resampled and merged here) or a previously saved aligned table.
//! Analyses then read from the resulting [`AlignedDataset`] without caring
//! where it came from.
//!
//! Aligned column names are `Temp_<room>` and `RH_<room>`, all temperature
//! columns first.

mod csv_table;
mod parquet_table;

use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::resample::{align, resample, RegularSeries};
use crate::analysis::AnalysisError;
use crate::parsers::types::{
    Channel, ChannelKind, ParseError, Parseable, TimeSeriesTable, RELATIVE_HUMIDITY_PCT,
    TEMPERATURE_F,
};
use crate::parsers::Pm2;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to parse log for room '{room}': {source}")]
    Parse {
        room: String,
        #[source]
        source: ParseError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("{0}")]
    Analysis(#[from] AnalysisError),
    #[error("unsupported dataset format: '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),
    #[error("malformed dataset: {0}")]
    Format(String),
    #[error("room '{0}' appears more than once")]
    DuplicateRoom(String),
    #[error("dataset contains no rooms")]
    NoRooms,
}

/// Raw log text for one room
#[derive(Clone, Debug)]
pub struct RawLog {
    pub room: String,
    pub contents: String,
}

impl RawLog {
    pub fn new(room: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            contents: contents.into(),
        }
    }

    /// Read a log file; the room is named after the file stem
    pub fn read(path: &Path) -> Result<Self, DatasetError> {
        let room = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("room")
            .to_string();
        Ok(Self::new(room, std::fs::read_to_string(path)?))
    }
}

/// Where a dataset comes from
#[derive(Clone, Debug)]
pub enum DatasetSource {
    /// Freshly parsed sensor logs, merged onto one grid
    Logs(Vec<RawLog>),
    /// Previously saved aligned table (.csv or .parquet)
    Persisted(PathBuf),
}

/// On-disk format of an aligned table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    /// Select a format by file extension
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "parquet" | "pq" => Ok(TableFormat::Parquet),
            other => Err(DatasetError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Read an aligned table from disk
pub fn read_table(path: &Path) -> Result<TimeSeriesTable, DatasetError> {
    let table = match TableFormat::from_path(path)? {
        TableFormat::Csv => csv_table::read(path)?,
        TableFormat::Parquet => parquet_table::read(path)?,
    };
    tracing::info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.channels.len(),
        path.display()
    );
    Ok(table)
}

/// Write an aligned table to disk
pub fn write_table(table: &TimeSeriesTable, path: &Path) -> Result<(), DatasetError> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => csv_table::write(table, path),
        TableFormat::Parquet => parquet_table::write(table, path),
    }
}

/// One room's samples
#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    pub name: String,
    pub table: TimeSeriesTable,
}

/// Parse a sensor log for one room
pub fn parse_log(log: &RawLog) -> Result<Room, DatasetError> {
    let table = Pm2.parse(&log.contents).map_err(|source| DatasetError::Parse {
        room: log.room.clone(),
        source,
    })?;
    Ok(Room {
        name: log.room.clone(),
        table,
    })
}

/// Parse several logs in parallel, preserving input order
pub fn parse_logs(logs: &[RawLog]) -> Result<Vec<Room>, DatasetError> {
    let mut seen = HashSet::new();
    if let Some(dup) = logs.iter().find(|l| !seen.insert(l.room.as_str())) {
        return Err(DatasetError::DuplicateRoom(dup.room.clone()));
    }
    logs.par_iter().map(parse_log).collect()
}

pub fn column_name(kind: ChannelKind, room: &str) -> String {
    format!("{}{}", kind.column_prefix(), room)
}

/// Room name of an aligned-dataset column (`Temp_Library` -> `Library`)
pub fn room_of(column: &str) -> &str {
    let prefix = ChannelKind::from_column_name(column).column_prefix();
    &column[prefix.len()..]
}

/// Per-room tables with their aligned multi-room table
#[derive(Clone, Debug)]
pub struct AlignedDataset {
    pub rooms: Vec<Room>,
    /// Union grid; missing values where a room has no data
    pub aligned: TimeSeriesTable,
    pub period_minutes: u32,
}

impl AlignedDataset {
    /// Resolve a source into a dataset
    pub fn load(source: &DatasetSource, period_minutes: u32) -> Result<Self, DatasetError> {
        match source {
            DatasetSource::Logs(logs) => Self::from_logs(logs, period_minutes),
            DatasetSource::Persisted(path) => Self::from_aligned(read_table(path)?, period_minutes),
        }
    }

    /// Parse, resample and merge raw logs
    pub fn from_logs(logs: &[RawLog], period_minutes: u32) -> Result<Self, DatasetError> {
        if logs.is_empty() {
            return Err(DatasetError::NoRooms);
        }
        let rooms = parse_logs(logs)?;
        Self::from_rooms(rooms, period_minutes)
    }

    /// Resample already-parsed rooms onto a common grid
    pub fn from_rooms(rooms: Vec<Room>, period_minutes: u32) -> Result<Self, DatasetError> {
        if rooms.is_empty() {
            return Err(DatasetError::NoRooms);
        }

        let resampled: Vec<[(String, RegularSeries); 2]> = rooms
            .par_iter()
            .filter(|room| !room.table.is_empty())
            .map(|room| -> Result<_, AnalysisError> {
                Ok([
                    (
                        column_name(ChannelKind::Temperature, &room.name),
                        resample(&room.table, TEMPERATURE_F, period_minutes)?,
                    ),
                    (
                        column_name(ChannelKind::RelativeHumidity, &room.name),
                        resample(&room.table, RELATIVE_HUMIDITY_PCT, period_minutes)?,
                    ),
                ])
            })
            .collect::<Result<_, _>>()?;

        if resampled.len() < rooms.len() {
            tracing::warn!(
                "{} rooms have no samples and are left out of the aligned table",
                rooms.len() - resampled.len()
            );
        }

        let (temps, rhs): (Vec<_>, Vec<_>) = resampled
            .into_iter()
            .map(|[t, rh]| (t, rh))
            .unzip();
        let series: Vec<(String, RegularSeries)> = temps.into_iter().chain(rhs).collect();

        let aligned = align(&series)?;
        tracing::info!(
            "Aligned {} rooms onto {} rows at {} min",
            rooms.len(),
            aligned.len(),
            period_minutes
        );

        Ok(Self {
            rooms,
            aligned,
            period_minutes,
        })
    }

    /// Rebuild per-room tables from a saved aligned table
    pub fn from_aligned(aligned: TimeSeriesTable, period_minutes: u32) -> Result<Self, DatasetError> {
        let mut names: Vec<String> = Vec::new();
        for channel in &aligned.channels {
            let room = room_of(&channel.name).to_string();
            if !names.contains(&room) {
                names.push(room);
            }
        }
        if names.is_empty() {
            return Err(DatasetError::NoRooms);
        }

        let rooms = names
            .into_iter()
            .filter_map(|name| {
                let temp = aligned.channel_values(&column_name(ChannelKind::Temperature, &name))?;
                let rh = aligned
                    .channel_values(&column_name(ChannelKind::RelativeHumidity, &name))
                    .unwrap_or_else(|| vec![f64::NAN; temp.len()]);
                let table = TimeSeriesTable::from_columns(
                    vec![
                        Channel::new(TEMPERATURE_F, ChannelKind::Temperature),
                        Channel::new(RELATIVE_HUMIDITY_PCT, ChannelKind::RelativeHumidity),
                    ],
                    aligned.times.clone(),
                    &[temp, rh],
                )
                .filter_rows(|_, row| !row[0].is_missing());
                Some(Room { name, table })
            })
            .collect();

        Ok(Self {
            rooms,
            aligned,
            period_minutes,
        })
    }

    pub fn room_names(&self) -> Vec<&str> {
        self.rooms.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Aligned columns of one kind, incomplete rows dropped
    pub fn complete_columns_of(&self, kind: ChannelKind) -> TimeSeriesTable {
        let names: Vec<String> = self
            .aligned
            .channels
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.aligned.select_channels(&refs).drop_missing()
    }

    /// Every aligned column, incomplete rows dropped
    pub fn complete(&self) -> TimeSeriesTable {
        self.aligned.drop_missing()
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        write_table(&self.aligned, path)
    }
}
