//! Factor analysis over a synthetic two-zone building
//!
//! Rooms `North1..3` share one latent climate signal and `South1..3`
//! another, so a two-factor solution should separate the zones.

use crate::common::float_cmp::*;
use crate::common::synthetic::*;
use climalog::analysis::suitability::Suitability;
use climalog::analysis::AnalysisError;
use climalog::dataset::DatasetSource;
use climalog::parsers::types::ChannelKind;
use climalog::session::{AnalysisSession, SessionError};
use climalog::settings::AnalysisSettings;

const ROWS: usize = 400;

fn building() -> AnalysisSession {
    let source = DatasetSource::Logs(two_zone_building(ROWS));
    AnalysisSession::open(&source, AnalysisSettings::default()).unwrap()
}

fn strong_rooms(session: &AnalysisSession, factor: usize) -> Vec<String> {
    let report = session.factors(ChannelKind::Temperature, Some(2)).unwrap();
    let mut rooms: Vec<String> = session
        .factor_map(&report.model, factor)
        .unwrap()
        .into_iter()
        .filter(|c| c.code.abs() > 0.5)
        .map(|c| c.room)
        .collect();
    rooms.sort();
    rooms
}

// ============================================
// Eigen Spectrum Tests
// ============================================

#[test]
fn test_eigen_spectrum_recommends_two_factors() {
    let session = building();
    let eigenvalues = session.eigen_spectrum(ChannelKind::Temperature).unwrap();

    assert_eq!(eigenvalues.len(), 6);
    assert!(eigenvalues.windows(2).all(|w| w[0] >= w[1]));
    assert_approx_eq(eigenvalues.iter().sum::<f64>(), 6.0, 1e-6);
    assert_eq!(eigenvalues.iter().filter(|&&e| e > 1.0).count(), 2);
}

// ============================================
// Suitability Tests
// ============================================

#[test]
fn test_two_zone_building_is_suitable() {
    let report = building().suitability(ChannelKind::Temperature).unwrap();

    assert_eq!(report.bartlett_suitability, Suitability::Suitable);
    assert!(report.bartlett.p_value <= 0.05);
    assert_eq!(report.bartlett.degrees_of_freedom, 15);
    assert_eq!(report.kmo.per_variable.len(), 6);
    assert!(report.kmo.overall > 0.0 && report.kmo.overall <= 1.0);
}

// ============================================
// Extraction Tests
// ============================================

#[test]
fn test_default_factor_count_uses_eigenvalues() {
    let report = building().factors(ChannelKind::Temperature, None).unwrap();

    assert_eq!(report.recommended_factors, 2);
    assert_eq!(report.model.factor_count(), 2);
    assert_eq!(report.model.variables.len(), 6);
    assert!(report.model.total_variance_explained > 0.6);
    assert!(report.model.total_variance_explained < 1.0);
}

#[test]
fn test_factors_separate_zones() {
    let session = building();
    let first = strong_rooms(&session, 1);
    let second = strong_rooms(&session, 2);

    let north = vec!["North1", "North2", "North3"];
    let south = vec!["South1", "South2", "South3"];
    assert!(
        (first == north && second == south) || (first == south && second == north),
        "unexpected grouping: {first:?} / {second:?}"
    );
}

#[test]
fn test_contributions_sorted_by_loading() {
    let report = building().factors(ChannelKind::Temperature, Some(2)).unwrap();

    for contribution in &report.model.contributions {
        let loadings: Vec<f64> = contribution.variables.iter().map(|(_, l)| l.abs()).collect();
        assert!(loadings.windows(2).all(|w| w[0] >= w[1]));
        assert!(loadings.iter().all(|&l| l > 0.25));
    }
}

#[test]
fn test_extraction_is_deterministic() {
    let session = building();
    let a = session.factors(ChannelKind::Temperature, Some(2)).unwrap();
    let b = session.factors(ChannelKind::Temperature, Some(2)).unwrap();
    assert_eq!(a.model, b.model);
}

#[test]
fn test_invalid_factor_counts() {
    let session = building();

    for k in [0, 6, 9] {
        match session.factors(ChannelKind::Temperature, Some(k)) {
            Err(SessionError::Analysis(AnalysisError::InvalidFactorCount { requested, variables })) => {
                assert_eq!(requested, k);
                assert_eq!(variables, 6);
            }
            other => panic!("expected InvalidFactorCount for k={k}, got {other:?}"),
        }
    }
}
