//! Dataset interchange round trips
//!
//! An aligned dataset exported to CSV or Parquet must reload into a session
//! that produces the same analysis results as the original logs.

use crate::common::synthetic::*;
use chrono::Duration;
use climalog::analysis::{AnalysisError, Parameter};
use climalog::dataset::{DatasetError, DatasetSource, RawLog};
use climalog::parsers::types::ChannelKind;
use climalog::session::{AnalysisSession, BoundsRequest, SessionError, SwingRequest};
use climalog::settings::AnalysisSettings;
use std::path::Path;

fn from_logs() -> AnalysisSession {
    let source = DatasetSource::Logs(vec![
        room_log("Library", &daily_cycle(2, 68.0, 8.0)),
        room_log("Vault", &daily_cycle(2, 66.0, 1.5)),
    ]);
    AnalysisSession::open(&source, AnalysisSettings::default()).unwrap()
}

fn reopen(path: &Path) -> AnalysisSession {
    AnalysisSession::open(
        &DatasetSource::Persisted(path.to_path_buf()),
        AnalysisSettings::default(),
    )
    .unwrap()
}

fn assert_same_results(original: &AnalysisSession, reloaded: &AnalysisSession) {
    assert_eq!(reloaded.dataset.room_names(), original.dataset.room_names());
    assert_eq!(reloaded.dataset.aligned.channels, original.dataset.aligned.channels);
    assert_eq!(reloaded.dataset.aligned.times, original.dataset.aligned.times);

    let bounds = BoundsRequest::new(Parameter::Temperature);
    assert_eq!(
        reloaded.bounds_report(&bounds).unwrap(),
        original.bounds_report(&bounds).unwrap()
    );

    let swing = SwingRequest::new(Parameter::Temperature);
    assert_eq!(
        reloaded.swing_report(&swing).unwrap(),
        original.swing_report(&swing).unwrap()
    );

    assert_eq!(
        reloaded.correlation(ChannelKind::RelativeHumidity).unwrap(),
        original.correlation(ChannelKind::RelativeHumidity).unwrap()
    );
}

// ============================================
// Round Trip Tests
// ============================================

#[test]
fn test_csv_round_trip() {
    let original = from_logs();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("building.csv");

    original.export(&path).unwrap();
    let header = std::fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("timestamp,Temp_Library,Temp_Vault,RH_Library,RH_Vault\n"));

    assert_same_results(&original, &reopen(&path));
}

#[test]
fn test_parquet_round_trip() {
    let original = from_logs();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("building.parquet");

    original.export(&path).unwrap();
    assert_same_results(&original, &reopen(&path));
}

#[test]
fn test_partial_overlap_keeps_missing_cells() {
    let source = DatasetSource::Logs(vec![
        room_log("Library", &daily_cycle(2, 68.0, 8.0)),
        RawLog::new(
            "Vault",
            pm2_log(start() + Duration::days(1), 15, &daily_cycle(2, 66.0, 1.5)),
        ),
    ]);
    let original = AnalysisSession::open(&source, AnalysisSettings::default()).unwrap();
    assert_eq!(original.dataset.aligned.len(), 3 * 96);

    let dir = tempfile::tempdir().unwrap();
    for name in ["building.csv", "building.parquet"] {
        let path = dir.path().join(name);
        original.export(&path).unwrap();
        let reloaded = reopen(&path);

        assert!(reloaded.dataset.aligned.has_missing());
        assert_eq!(reloaded.dataset.complete_columns_of(ChannelKind::Temperature).len(), 96);
        assert_eq!(reloaded.dataset.room("Vault").unwrap().table.len(), 2 * 96);
        assert_eq!(reloaded.correlation(ChannelKind::Temperature).unwrap().len(), 2);
    }
}

// ============================================
// Error Handling Tests
// ============================================

#[test]
fn test_unsupported_extension() {
    let result = AnalysisSession::open(
        &DatasetSource::Persisted("building.pickle".into()),
        AnalysisSettings::default(),
    );
    assert!(matches!(
        result,
        Err(SessionError::Dataset(DatasetError::UnsupportedFormat(_)))
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = AnalysisSession::open(
        &DatasetSource::Persisted(dir.path().join("absent.csv")),
        AnalysisSettings::default(),
    );
    assert!(matches!(result, Err(SessionError::Dataset(_))));
}

#[test]
fn test_disjoint_rooms_fail_alignment() {
    let source = DatasetSource::Logs(vec![
        room_log("Library", &daily_cycle(1, 68.0, 8.0)[..20]),
        RawLog::new(
            "Vault",
            pm2_log(start() + Duration::days(19), 15, &daily_cycle(1, 66.0, 1.5)[..20]),
        ),
    ]);
    let session = AnalysisSession::open(&source, AnalysisSettings::default()).unwrap();
    assert!(!session.dataset.aligned.is_empty());

    assert!(matches!(
        session.correlation(ChannelKind::Temperature),
        Err(SessionError::Analysis(AnalysisError::Alignment(_)))
    ));
    assert!(matches!(
        session.suitability(ChannelKind::Temperature),
        Err(SessionError::Analysis(AnalysisError::Alignment(_)))
    ));
    assert!(matches!(
        session.eigen_spectrum(ChannelKind::RelativeHumidity),
        Err(SessionError::Analysis(AnalysisError::Alignment(_)))
    ));
    assert!(matches!(
        session.factors(ChannelKind::Temperature, Some(1)),
        Err(SessionError::Analysis(AnalysisError::Alignment(_)))
    ));
}
