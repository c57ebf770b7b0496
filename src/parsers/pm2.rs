//! Parser for the tab-delimited text logs exported by the building sensors.
//!
//! Layout:
//! - Lines 1-2: free-form preamble (logger name, serial number, ...)
//! - Line 3: column header, e.g. `DATE AND TIME GMT    TEMP    RH`
//! - Line 4: units/description row (ignored)
//! - Remaining lines: `timestamp <TAB> temperature °F <TAB> relative humidity %`
//!
//! Columns are separated by tabs or runs of two or more spaces. A row that
//! only uses single spaces is accepted when its last two tokens are numbers.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{
    parse_timestamp, Channel, ChannelKind, LogMeta, ParseError, Parseable, TimeSeriesTable, Value,
    RELATIVE_HUMIDITY_PCT, TEMPERATURE_F,
};

/// Number of lines before the first data row
const HEADER_LINES: usize = 4;
const PREAMBLE_LINES: usize = 2;
const COLUMN_COUNT: usize = 3;

static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t+| {2,}").expect("Failed to compile delimiter regex"));

/// Sensor log parser
pub struct Pm2;

impl Pm2 {
    /// Check whether file contents look like a sensor log
    pub fn detect(contents: &str) -> bool {
        contents
            .lines()
            .nth(PREAMBLE_LINES)
            .map(|header| header.to_ascii_uppercase().contains("DATE AND TIME"))
            .unwrap_or(false)
    }

    fn split_fields(line: &str) -> Vec<String> {
        let fields: Vec<String> = DELIMITER
            .split(line.trim())
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        if fields.len() >= COLUMN_COUNT || line.contains('\t') {
            return fields;
        }

        // Single-space separated row: timestamp tokens followed by two numbers
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < COLUMN_COUNT {
            return fields;
        }
        let split = tokens.len() - 2;
        vec![
            tokens[..split].join(" "),
            tokens[split].to_string(),
            tokens[split + 1].to_string(),
        ]
    }

    fn parse_number(field: &str, column: &str, line: usize) -> Result<f64, ParseError> {
        field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::Number {
                line,
                column: column.to_string(),
                value: field.to_string(),
            })
    }
}

impl Parseable for Pm2 {
    fn parse(&self, contents: &str) -> Result<TimeSeriesTable, ParseError> {
        let lines: Vec<&str> = contents.lines().collect();
        if lines.len() < HEADER_LINES {
            return Err(ParseError::MissingHeader {
                expected: HEADER_LINES,
                found: lines.len(),
            });
        }

        let meta = LogMeta {
            preamble: lines[..PREAMBLE_LINES]
                .iter()
                .map(|l| l.trim().to_string())
                .collect(),
            source_columns: Self::split_fields(lines[PREAMBLE_LINES]),
        };

        let mut table = TimeSeriesTable::new(vec![
            Channel::new(TEMPERATURE_F, ChannelKind::Temperature),
            Channel::new(RELATIVE_HUMIDITY_PCT, ChannelKind::RelativeHumidity),
        ]);
        table.meta = meta;

        for (idx, raw) in lines.iter().enumerate().skip(HEADER_LINES) {
            let line_no = idx + 1;
            if raw.trim().is_empty() {
                continue;
            }

            let fields = Self::split_fields(raw);
            if fields.len() != COLUMN_COUNT {
                return Err(ParseError::ColumnCount {
                    line: line_no,
                    expected: COLUMN_COUNT,
                    found: fields.len(),
                });
            }

            let time = parse_timestamp(&fields[0]).ok_or_else(|| ParseError::Timestamp {
                line: line_no,
                value: fields[0].clone(),
            })?;
            let temperature = Self::parse_number(&fields[1], TEMPERATURE_F, line_no)?;
            let humidity = Self::parse_number(&fields[2], RELATIVE_HUMIDITY_PCT, line_no)?;

            table.push_row(time, vec![Value::new(temperature), Value::new(humidity)]);
        }

        if !table.is_time_sorted() {
            tracing::warn!("Log rows are out of order; sorting {} rows by timestamp", table.len());
            table = table.sorted_by_time();
        }

        tracing::debug!("Parsed sensor log with {} rows", table.len());
        Ok(table)
    }
}
