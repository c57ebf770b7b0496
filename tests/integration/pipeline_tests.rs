//! End-to-end analysis runs over synthetic multi-room logs
//!
//! Three rooms follow a daily temperature cycle:
//! - Library: 60-76 °F (crosses both default bounds, 16 °F swing)
//! - Vault: 65-67 °F (within bounds, 2 °F swing)
//! - Attic: 77-83 °F (over the upper bound, 6 °F swing)

use crate::common::float_cmp::*;
use crate::common::synthetic::*;
use climalog::analysis::bounds::BoundsCategory;
use climalog::analysis::filters::{DateRange, MonthSet};
use climalog::analysis::Parameter;
use climalog::dataset::DatasetSource;
use climalog::parsers::types::ChannelKind;
use climalog::session::{AnalysisSession, BoundsRequest, SessionError, SwingRequest};
use climalog::settings::AnalysisSettings;
use climalog::severity::{CODE_BOTH_VIOLATING, CODE_OVER_ONLY, CODE_SWING_FAIL, CODE_SWING_PASS, CODE_WITHIN_BOUNDS};
use std::collections::HashMap;

const DAYS: usize = 3;

fn building() -> AnalysisSession {
    let source = DatasetSource::Logs(vec![
        room_log("Library", &daily_cycle(DAYS, 68.0, 8.0)),
        room_log("Vault", &daily_cycle(DAYS, 66.0, 1.0)),
        room_log("Attic", &daily_cycle(DAYS, 80.0, 3.0)),
    ]);
    AnalysisSession::open(&source, AnalysisSettings::default()).unwrap()
}

// ============================================
// Loading Tests
// ============================================

#[test]
fn test_logs_align_on_shared_grid() {
    let session = building();

    assert_eq!(session.dataset.room_names(), vec!["Library", "Vault", "Attic"]);
    assert_eq!(session.dataset.aligned.len(), DAYS * 96);
    assert_eq!(
        session.dataset.aligned.channel_names(),
        vec!["Temp_Library", "Temp_Vault", "Temp_Attic", "RH_Library", "RH_Vault", "RH_Attic"]
    );
    assert!(!session.dataset.aligned.has_missing());
}

// ============================================
// Bounds Tests
// ============================================

#[test]
fn test_bounds_report_with_default_limits() {
    let session = building();
    let reports = session.bounds_report(&BoundsRequest::new(Parameter::Temperature)).unwrap();

    let categories: Vec<BoundsCategory> = reports.iter().map(|r| r.result.category).collect();
    assert_eq!(
        categories,
        vec![
            BoundsCategory::BothViolating,
            BoundsCategory::WithinBounds,
            BoundsCategory::OverOnly
        ]
    );

    let library = &reports[0].result;
    assert_approx_eq(library.min, 60.0, DEFAULT_TOLERANCE);
    assert_approx_eq(library.max, 76.0, DEFAULT_TOLERANCE);
    assert_eq!(library.count, DAYS * 96);
    assert!(library.fraction_below_min + library.fraction_above_max <= 1.0);

    let codes: Vec<f64> = session.bounds_map(&reports).iter().map(|c| c.code).collect();
    assert_eq!(codes, vec![CODE_BOTH_VIOLATING, CODE_WITHIN_BOUNDS, CODE_OVER_ONLY]);
}

#[test]
fn test_humidity_within_default_bounds() {
    let reports = building()
        .bounds_report(&BoundsRequest::new(Parameter::RelativeHumidity))
        .unwrap();

    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.result.category, BoundsCategory::WithinBounds);
        assert_eq!(report.result.fraction_below_min, 0.0);
    }
}

#[test]
fn test_dew_point_bounds_are_derived() {
    let reports = building()
        .bounds_report(&BoundsRequest::new(Parameter::DewPoint))
        .unwrap();

    assert_eq!(reports.len(), 3);
    // Warmer air at the same humidity holds more moisture
    assert!(reports[2].result.max > reports[1].result.max);
}

#[test]
fn test_narrower_range_never_adds_rows() {
    let session = building();
    let full = session.bounds_report(&BoundsRequest::new(Parameter::Temperature)).unwrap();

    let mut request = BoundsRequest::new(Parameter::Temperature);
    request.selection.range =
        Some(DateRange::new(start(), start() + chrono::Duration::days(1)).unwrap());
    let day = session.bounds_report(&request).unwrap();

    assert_eq!(day[0].result.count, 96);
    assert!(day[0].result.count <= full[0].result.count);
}

#[test]
fn test_month_filter_excludes_everything() {
    let mut request = BoundsRequest::new(Parameter::Temperature);
    request.selection.months = MonthSet::new([12, 1, 2]).unwrap();

    assert!(building().bounds_report(&request).unwrap().is_empty());
}

#[test]
fn test_monthly_bounds_breakdown() {
    let rows = building()
        .monthly_bounds("Library", &BoundsRequest::new(Parameter::Temperature))
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!((rows[0].year, rows[0].month), (2013, 7));
    assert_eq!(rows[0].samples, DAYS * 96);
    assert!(rows[0].percent_under > 0.0);
    assert!(rows[0].percent_over > 0.0);
}

// ============================================
// Swing Tests
// ============================================

#[test]
fn test_swing_report() {
    let session = building();
    let reports = session.swing_report(&SwingRequest::new(Parameter::Temperature)).unwrap();

    assert_eq!(reports.len(), 3);
    assert_approx_eq(reports[0].result.max_swing, 16.0, 0.01);
    assert_approx_eq(reports[1].result.max_swing, 2.0, 0.01);
    assert_approx_eq(reports[2].result.max_swing, 6.0, 0.01);

    // Every complete window in the library swings 16 °F; the zero tail does not count
    assert_eq!(reports[0].result.window, 96);
    assert_eq!(reports[0].result.violation_count, (DAYS - 1) * 96);
    assert_eq!(reports[2].result.violation_count, 0);

    let codes: Vec<f64> = session.swing_map(&reports).iter().map(|c| c.code).collect();
    assert_eq!(codes, vec![CODE_SWING_FAIL, CODE_SWING_PASS, CODE_SWING_PASS]);
}

#[test]
fn test_swing_threshold_override() {
    let mut request = SwingRequest::new(Parameter::Temperature);
    request.threshold = Some(5.0);

    let reports = building().swing_report(&request).unwrap();
    assert_eq!(reports[2].result.violation_count, (DAYS - 1) * 96);
}

#[test]
fn test_monthly_swing_breakdown() {
    let rows = building()
        .monthly_swing("library", &SwingRequest::new(Parameter::Temperature))
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_approx_eq(rows[0].percent_violating, 200.0 / 3.0, 0.01);
}

// ============================================
// Correlation Tests
// ============================================

#[test]
fn test_correlation_between_rooms() {
    let session = building();
    let matrix = session.correlation(ChannelKind::Temperature).unwrap();

    assert_eq!(matrix.names, vec!["Temp_Library", "Temp_Vault", "Temp_Attic"]);
    for i in 0..3 {
        assert_eq!(matrix.values[i][i], 1.0);
        for j in 0..3 {
            assert_eq!(matrix.values[i][j], matrix.values[j][i]);
            assert!(matrix.values[i][j] > 0.99);
        }
    }

    let map = session.correlation_map("vault", ChannelKind::Temperature).unwrap();
    let rooms: Vec<&str> = map.iter().map(|c| c.room.as_str()).collect();
    assert_eq!(rooms, vec!["Library", "Vault", "Attic"]);
    assert_eq!(map[1].code, 1.0);
}

#[test]
fn test_correlation_map_unknown_room() {
    assert!(matches!(
        building().correlation_map("Basement", ChannelKind::Temperature),
        Err(SessionError::UnknownRoom(_))
    ));
}

// ============================================
// Analyzer Registry Tests
// ============================================

#[test]
fn test_run_dew_point_analyzer() {
    let result = building()
        .run_analyzer("Attic", "dew_point", &HashMap::new())
        .unwrap();

    assert_eq!(result.values.len(), DAYS * 96);
    assert!(result.values.iter().all(|v| v.is_finite()));
}
