//! Tests for the sensor log parser
//!
//! Tests cover:
//! - Format detection
//! - Delimiters and timestamp layouts
//! - Blank and out-of-order rows
//! - Error reporting

use crate::common::assertions::*;
use crate::common::float_cmp::*;
use crate::common::synthetic::*;
use chrono::{NaiveDate, Timelike};
use climalog::parsers::types::{
    ChannelKind, ParseError, Parseable, RELATIVE_HUMIDITY_PCT, TEMPERATURE_F,
};
use climalog::parsers::Pm2;

// ============================================
// Format Detection Tests
// ============================================

#[test]
fn test_pm2_detection_by_header_row() {
    assert!(Pm2::detect(pm2_header()));
    assert!(Pm2::detect("a\nb\nDate and Time GMT-05:00\tTemp\tRH\n"));
}

#[test]
fn test_pm2_detection_rejects_other_formats() {
    assert!(!Pm2::detect("%DataLog%\nDataLogVersion : 1.1\n"));
    assert!(!Pm2::detect("timestamp,Temp_A\n2013-07-09 00:00:00,68\n"));
    assert!(!Pm2::detect(""));
}

// ============================================
// Basic Parsing Tests
// ============================================

#[test]
fn test_parse_minimal_log() {
    let contents = pm2_log(start(), 15, &[(68.0, 45.0), (68.5, 44.0), (69.0, 43.5)]);
    let table = Pm2.parse(&contents).unwrap();

    assert_valid_table(&table);
    assert_monotonic_times(&table);
    assert_finite_values(&table);
    assert_eq!(table.len(), 3);
    assert_eq!(table.channel_names(), vec![TEMPERATURE_F, RELATIVE_HUMIDITY_PCT]);
    assert_eq!(table.channels[0].kind, ChannelKind::Temperature);
    assert_eq!(table.channels[1].kind, ChannelKind::RelativeHumidity);
    assert_eq!(table.times[0], start());
    assert_eq!(table.times[2].minute(), 30);
    assert_eq!(table.channel_values(TEMPERATURE_F), Some(vec![68.0, 68.5, 69.0]));
}

#[test]
fn test_parse_keeps_preamble_and_source_columns() {
    let table = Pm2.parse(&pm2_log(start(), 15, &[(68.0, 45.0)])).unwrap();

    assert_eq!(
        table.meta.preamble,
        vec!["PM2 Logger Export", "Serial Number: 10482"]
    );
    assert_eq!(table.meta.source_columns, vec!["DATE AND TIME GMT", "TEMP", "RH"]);
}

#[test]
fn test_parse_header_only_log_is_empty() {
    let table = Pm2.parse(pm2_header()).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.channels.len(), 2);
}

#[test]
fn test_parse_skips_blank_rows() {
    let contents = format!(
        "{}07/09/13 00:00:00\t68.0\t45.0\n\n   \n07/09/13 00:15:00\t68.2\t45.1\n",
        pm2_header()
    );
    let table = Pm2.parse(&contents).unwrap();
    assert_eq!(table.len(), 2);
}

// ============================================
// Delimiter Tests
// ============================================

#[test]
fn test_parse_multi_space_delimiter() {
    let contents = format!(
        "{}07/09/13 00:00:00    68.0    45.0\n07/09/13 00:15:00  68.4  44.9\n",
        pm2_header()
    );
    let table = Pm2.parse(&contents).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.channel_values(RELATIVE_HUMIDITY_PCT), Some(vec![45.0, 44.9]));
}

#[test]
fn test_parse_single_space_delimiter() {
    let contents = format!("{}07/09/13 00:00:00 68.0 45.0\n", pm2_header());
    let table = Pm2.parse(&contents).unwrap();

    assert_eq!(table.times[0], start());
    assert_eq!(table.channel_values(TEMPERATURE_F), Some(vec![68.0]));
}

// ============================================
// Timestamp Layout Tests
// ============================================

#[test]
fn test_parse_timestamp_layouts() {
    let contents = format!(
        "{}07/09/13 00:00\t60\t40\n07/09/2013 01:00:00\t61\t41\n07/09/13 01:30:00 PM\t62\t42\n\
         2013-07-09 14:00:00\t63\t43\n2013-07-09T14:30:00\t64\t44\n",
        pm2_header()
    );
    let table = Pm2.parse(&contents).unwrap();
    let day = NaiveDate::from_ymd_opt(2013, 7, 9).unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(table.times[0], day.and_hms_opt(0, 0, 0).unwrap());
    assert_eq!(table.times[1], day.and_hms_opt(1, 0, 0).unwrap());
    assert_eq!(table.times[2], day.and_hms_opt(13, 30, 0).unwrap());
    assert_eq!(table.times[3], day.and_hms_opt(14, 0, 0).unwrap());
    assert_eq!(table.times[4], day.and_hms_opt(14, 30, 0).unwrap());
}

#[test]
fn test_parse_sorts_out_of_order_rows() {
    let contents = format!(
        "{}07/09/13 00:30:00\t70.0\t40.0\n07/09/13 00:00:00\t68.0\t45.0\n07/09/13 00:15:00\t69.0\t42.0\n",
        pm2_header()
    );
    let table = Pm2.parse(&contents).unwrap();

    assert_monotonic_times(&table);
    assert_eq!(table.channel_values(TEMPERATURE_F), Some(vec![68.0, 69.0, 70.0]));
}

#[test]
fn test_parse_daily_cycle() {
    let table = Pm2.parse(&pm2_log(start(), 15, &daily_cycle(2, 68.0, 6.0))).unwrap();

    assert_eq!(table.len(), 192);
    assert_eq!(table.sample_period_minutes(), Some(15.0));
    let temps = table.channel_values(TEMPERATURE_F).unwrap();
    assert_approx_eq(temps[24], 74.0, DEFAULT_TOLERANCE);
    assert_approx_eq(temps[72], 62.0, DEFAULT_TOLERANCE);
}

// ============================================
// Error Handling Tests
// ============================================

#[test]
fn test_truncated_header_is_rejected() {
    assert_eq!(
        Pm2.parse("Logger\nSerial\n"),
        Err(ParseError::MissingHeader {
            expected: 4,
            found: 2
        })
    );
}

#[test]
fn test_wrong_column_count_reports_line() {
    let contents = format!(
        "{}07/09/13 00:00:00\t68.0\t45.0\n07/09/13 00:15:00\t68.0\n",
        pm2_header()
    );
    assert_eq!(
        Pm2.parse(&contents),
        Err(ParseError::ColumnCount {
            line: 6,
            expected: 3,
            found: 2
        })
    );
}

#[test]
fn test_bad_number_reports_line_and_column() {
    let contents = format!("{}07/09/13 00:00:00\t68.0\t--\n", pm2_header());
    let err = Pm2.parse(&contents).unwrap_err();

    assert_eq!(
        err,
        ParseError::Number {
            line: 5,
            column: RELATIVE_HUMIDITY_PCT.to_string(),
            value: "--".to_string()
        }
    );
    assert!(err.to_string().contains("line 5"));
}

#[test]
fn test_non_finite_number_is_rejected() {
    let contents = format!("{}07/09/13 00:00:00\tNaN\t45.0\n", pm2_header());
    assert!(matches!(
        Pm2.parse(&contents),
        Err(ParseError::Number { line: 5, .. })
    ));
}

#[test]
fn test_bad_timestamp_reports_line() {
    let contents = format!("{}13/45/13 00:00:00\t68.0\t45.0\n", pm2_header());
    assert_eq!(
        Pm2.parse(&contents),
        Err(ParseError::Timestamp {
            line: 5,
            value: "13/45/13 00:00:00".to_string()
        })
    );
}
