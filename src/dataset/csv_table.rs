//! CSV layout: header `timestamp,<column>,...`, timestamps written as
//! `%Y-%m-%d %H:%M:%S`, an empty cell for a missing value.

use std::path::Path;

use super::DatasetError;
use crate::parsers::types::{parse_timestamp, Channel, ChannelKind, TimeSeriesTable, Value};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(super) fn write(table: &TimeSeriesTable, path: &Path) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["timestamp".to_string()];
    header.extend(table.channel_names());
    writer.write_record(&header)?;

    for (time, row) in table.times.iter().zip(&table.data) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(time.format(TIMESTAMP_FORMAT).to_string());
        record.extend(row.iter().map(|v| {
            if v.is_missing() {
                String::new()
            } else {
                v.as_f64().to_string()
            }
        }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// The first column is the timestamp whatever its name
pub(super) fn read(path: &Path) -> Result<TimeSeriesTable, DatasetError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    if headers.len() < 2 {
        return Err(DatasetError::Format(format!(
            "{}: expected a timestamp column and at least one data column",
            path.display()
        )));
    }

    let mut table = TimeSeriesTable::new(
        headers[1..]
            .iter()
            .map(|name| Channel::new(name.clone(), ChannelKind::from_column_name(name)))
            .collect(),
    );

    for (row_no, result) in reader.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = row_no + 2;

        let raw_time = record.get(0).unwrap_or("");
        let time = parse_timestamp(raw_time).ok_or_else(|| {
            DatasetError::Format(format!("line {line}: cannot parse timestamp '{raw_time}'"))
        })?;

        let values = headers[1..]
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let cell = record.get(i + 1).unwrap_or("").trim();
                if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                    return Ok(Value::MISSING);
                }
                cell.parse::<f64>().map(Value::new).map_err(|_| {
                    DatasetError::Format(format!(
                        "line {line}: '{cell}' in column '{column}' is not a number"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        table.push_row(time, values);
    }

    if !table.is_time_sorted() {
        tracing::warn!("{} is not in time order; sorting rows", path.display());
        table = table.sorted_by_time();
    }
    Ok(table)
}
