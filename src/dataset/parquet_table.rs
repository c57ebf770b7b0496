//! Parquet layout: `timestamp` (Int64, epoch milliseconds) followed by one
//! nullable Float64 column per channel.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::DatasetError;
use crate::parsers::types::{Channel, ChannelKind, TimeSeriesTable, Value};

const TIMESTAMP_COLUMN: &str = "timestamp";

pub(super) fn write(table: &TimeSeriesTable, path: &Path) -> Result<(), DatasetError> {
    let mut fields = vec![Field::new(TIMESTAMP_COLUMN, DataType::Int64, false)];
    fields.extend(
        table
            .channels
            .iter()
            .map(|c| Field::new(c.name.as_str(), DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(
        table
            .times
            .iter()
            .map(|t| t.and_utc().timestamp_millis())
            .collect::<Vec<_>>(),
    ))];
    for idx in 0..table.channels.len() {
        let values: Float64Array = table
            .data
            .iter()
            .map(|row| row.get(idx).filter(|v| !v.is_missing()).map(Value::as_f64))
            .collect();
        columns.push(Arc::new(values));
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn from_millis(ms: i64) -> Result<NaiveDateTime, DatasetError> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DatasetError::Format(format!("timestamp {ms} is out of range")))
}

fn timestamps(column: &ArrayRef) -> Result<Vec<NaiveDateTime>, DatasetError> {
    let millis: Vec<Option<i64>> = if let Some(arr) = column.as_any().downcast_ref::<Int64Array>() {
        arr.iter().collect()
    } else if let Some(arr) = column.as_any().downcast_ref::<TimestampMillisecondArray>() {
        arr.iter().collect()
    } else {
        return Err(DatasetError::Format(format!(
            "timestamp column has type {:?}, expected Int64 milliseconds",
            column.data_type()
        )));
    };

    millis
        .into_iter()
        .map(|ms| {
            ms.ok_or_else(|| DatasetError::Format("null timestamp".to_string()))
                .and_then(from_millis)
        })
        .collect()
}

fn float_values(name: &str, column: &ArrayRef) -> Result<Vec<Value>, DatasetError> {
    if let Some(arr) = column.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.map_or(Value::MISSING, Value::new)).collect())
    } else if let Some(arr) = column.as_any().downcast_ref::<Float32Array>() {
        Ok(arr
            .iter()
            .map(|v| v.map_or(Value::MISSING, |f| Value::new(f as f64)))
            .collect())
    } else {
        Err(DatasetError::Format(format!(
            "column '{name}' has type {:?}, expected Float64",
            column.data_type()
        )))
    }
}

pub(super) fn read(path: &Path) -> Result<TimeSeriesTable, DatasetError> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut table: Option<TimeSeriesTable> = None;

    for batch in reader {
        let batch = batch?;
        let schema = batch.schema();
        let ts_idx = schema
            .index_of(TIMESTAMP_COLUMN)
            .map_err(|_| DatasetError::Format("missing 'timestamp' column".to_string()))?;

        let data_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        let table = table.get_or_insert_with(|| {
            TimeSeriesTable::new(
                data_cols
                    .iter()
                    .map(|(_, name)| Channel::new(name.clone(), ChannelKind::from_column_name(name)))
                    .collect(),
            )
        });

        let times = timestamps(batch.column(ts_idx))?;
        let columns = data_cols
            .iter()
            .map(|(i, name)| float_values(name, batch.column(*i)))
            .collect::<Result<Vec<_>, _>>()?;

        for (row, time) in times.into_iter().enumerate() {
            table.push_row(time, columns.iter().map(|col| col[row]).collect());
        }
    }

    let table = table.unwrap_or_default();
    if !table.is_time_sorted() {
        tracing::warn!("{} is not in time order; sorting rows", path.display());
        return Ok(table.sorted_by_time());
    }
    Ok(table)
}
