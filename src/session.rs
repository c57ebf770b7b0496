//! Analysis session.
//!
//! An [`AnalysisSession`] owns the loaded dataset and the settings used to
//! fill in request defaults. Every operation reads from it; nothing is
//! cached between calls.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::analysis::bounds::{analyze_bounds_with, monthly_bounds_breakdown, BoundsResult, MonthlyBoundsRow};
use crate::analysis::derived::with_dew_point;
use crate::analysis::factor::{eigen_spectrum, extract_factors_with, recommended_factor_count, FactorModel};
use crate::analysis::filters::{filter_table, DateRange, MonthSet};
use crate::analysis::statistics::{correlate, CorrelationMatrix};
use crate::analysis::suitability::{assess, SuitabilityReport};
use crate::analysis::swing::{
    analyze_swing, monthly_swing_breakdown, window_samples, MonthlySwingRow, SwingSummary,
};
use crate::analysis::{AnalysisError, AnalysisResult, AnalyzerRegistry, Parameter};
use crate::dataset::{column_name, AlignedDataset, DatasetError, DatasetSource, Room};
use crate::parsers::types::{ChannelKind, TimeSeriesTable};
use crate::settings::AnalysisSettings;
use crate::severity::{self, RoomCode};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("unknown room '{0}'")]
    UnknownRoom(String),
    #[error("unknown analyzer '{0}'")]
    UnknownAnalyzer(String),
}

/// Rows selected for a per-room analysis
#[derive(Clone, Debug, Default)]
pub struct Selection {
    /// `None` keeps every row
    pub range: Option<DateRange>,
    pub months: MonthSet,
}

impl Selection {
    pub fn apply(&self, table: &TimeSeriesTable) -> TimeSeriesTable {
        match self.range.or_else(|| DateRange::covering(table)) {
            Some(range) => filter_table(table, &range, &self.months),
            None => table.clone(),
        }
    }
}

/// Bounds request; unset limits come from the settings
#[derive(Clone, Debug)]
pub struct BoundsRequest {
    pub parameter: Parameter,
    pub selection: Selection,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl BoundsRequest {
    pub fn new(parameter: Parameter) -> Self {
        Self {
            parameter,
            selection: Selection::default(),
            lower: None,
            upper: None,
        }
    }
}

/// Swing request; an unset threshold comes from the settings
#[derive(Clone, Debug)]
pub struct SwingRequest {
    pub parameter: Parameter,
    pub selection: Selection,
    pub threshold: Option<f64>,
}

impl SwingRequest {
    pub fn new(parameter: Parameter) -> Self {
        Self {
            parameter,
            selection: Selection::default(),
            threshold: None,
        }
    }
}

/// One room's result in a multi-room report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomReport<T> {
    pub room: String,
    pub result: T,
}

#[derive(Clone, Debug, Serialize)]
pub struct FactorReport {
    pub eigenvalues: Vec<f64>,
    pub recommended_factors: usize,
    pub model: FactorModel,
}

pub struct AnalysisSession {
    pub settings: AnalysisSettings,
    pub dataset: AlignedDataset,
}

impl AnalysisSession {
    pub fn new(dataset: AlignedDataset, settings: AnalysisSettings) -> Self {
        Self { settings, dataset }
    }

    /// Resolve a source once and keep the dataset for later requests
    pub fn open(source: &DatasetSource, settings: AnalysisSettings) -> Result<Self, SessionError> {
        let dataset = AlignedDataset::load(source, settings.sample_period_minutes)?;
        Ok(Self::new(dataset, settings))
    }

    fn room(&self, name: &str) -> Result<&Room, SessionError> {
        self.dataset
            .room(name)
            .ok_or_else(|| SessionError::UnknownRoom(name.to_string()))
    }

    /// Single-channel table for one room, filtered and without missing rows
    fn parameter_table(
        room: &Room,
        parameter: Parameter,
        selection: &Selection,
    ) -> Result<TimeSeriesTable, AnalysisError> {
        let table = match parameter {
            Parameter::DewPoint => with_dew_point(&room.table)?,
            _ => room.table.clone(),
        };
        let column = table.select_channels(&[parameter.channel()]);
        if column.channels.is_empty() {
            return Err(AnalysisError::MissingChannel(parameter.channel().to_string()));
        }
        Ok(selection.apply(&column).drop_missing())
    }

    /// Run `f` over every room in parallel. Rooms with no rows in the
    /// selection are left out.
    fn per_room<T, F>(&self, parameter: Parameter, selection: &Selection, f: F) -> Result<Vec<RoomReport<T>>, SessionError>
    where
        T: Send,
        F: Fn(&TimeSeriesTable) -> Result<T, AnalysisError> + Sync,
    {
        let results: Vec<Option<RoomReport<T>>> = self
            .dataset
            .rooms
            .par_iter()
            .map(|room| {
                let table = Self::parameter_table(room, parameter, selection)?;
                if table.is_empty() {
                    tracing::warn!("Room '{}' has no {} samples in the selection", room.name, parameter);
                    return Ok(None);
                }
                Ok(Some(RoomReport {
                    room: room.name.clone(),
                    result: f(&table)?,
                }))
            })
            .collect::<Result<_, AnalysisError>>()?;

        Ok(results.into_iter().flatten().collect())
    }

    fn bounds_limits(&self, request: &BoundsRequest) -> (f64, f64) {
        let defaults = self.settings.bounds_for(request.parameter);
        (
            request.lower.unwrap_or(defaults.lower),
            request.upper.unwrap_or(defaults.upper),
        )
    }

    fn swing_window(&self, table: &TimeSeriesTable) -> Result<usize, AnalysisError> {
        let period = table
            .sample_period_minutes()
            .unwrap_or(self.settings.sample_period_minutes as f64);
        window_samples(period)
    }

    pub fn bounds_report(&self, request: &BoundsRequest) -> Result<Vec<RoomReport<BoundsResult>>, SessionError> {
        let (lower, upper) = self.bounds_limits(request);
        let precedence = self.settings.category_precedence;
        let field = request.parameter.channel();

        self.per_room(request.parameter, &request.selection, |table| {
            analyze_bounds_with(table, field, lower, upper, precedence)
        })
    }

    pub fn swing_report(&self, request: &SwingRequest) -> Result<Vec<RoomReport<SwingSummary>>, SessionError> {
        let threshold = request.threshold.unwrap_or(self.settings.swing_threshold);
        let policy = self.settings.swing_tail_policy;
        let field = request.parameter.channel();

        self.per_room(request.parameter, &request.selection, |table| {
            let window = self.swing_window(table)?;
            let (series, _) = analyze_swing(table, field, window, threshold, policy)?;
            Ok(SwingSummary::from_series(&series, threshold))
        })
    }

    pub fn monthly_bounds(&self, room: &str, request: &BoundsRequest) -> Result<Vec<MonthlyBoundsRow>, SessionError> {
        let (lower, upper) = self.bounds_limits(request);
        let table = Self::parameter_table(self.room(room)?, request.parameter, &request.selection)?;
        Ok(monthly_bounds_breakdown(&table, request.parameter.channel(), lower, upper)?)
    }

    pub fn monthly_swing(&self, room: &str, request: &SwingRequest) -> Result<Vec<MonthlySwingRow>, SessionError> {
        let threshold = request.threshold.unwrap_or(self.settings.swing_threshold);
        let table = Self::parameter_table(self.room(room)?, request.parameter, &request.selection)?;
        let window = self.swing_window(&table)?;
        Ok(monthly_swing_breakdown(&table, request.parameter.channel(), window, threshold)?)
    }

    pub fn bounds_map(&self, reports: &[RoomReport<BoundsResult>]) -> Vec<RoomCode> {
        let pairs: Vec<(String, BoundsResult)> = reports
            .iter()
            .map(|r| (r.room.clone(), r.result.clone()))
            .collect();
        severity::bounds_map(&pairs)
    }

    pub fn swing_map(&self, reports: &[RoomReport<SwingSummary>]) -> Vec<RoomCode> {
        let pairs: Vec<(String, SwingSummary)> = reports
            .iter()
            .map(|r| (r.room.clone(), r.result.clone()))
            .collect();
        severity::swing_map(&pairs)
    }

    /// Aligned columns of one kind restricted to rows where every room reported.
    ///
    /// A dataset whose rooms never overlap in time is an alignment failure,
    /// not an empty one.
    fn overlapping_columns(&self, kind: ChannelKind) -> Result<TimeSeriesTable, AnalysisError> {
        let table = self.dataset.complete_columns_of(kind);
        if table.is_empty() && !self.dataset.aligned.is_empty() {
            return Err(AnalysisError::Alignment(format!(
                "no timestamp where every room has a {} reading",
                kind.as_ref()
            )));
        }
        Ok(table)
    }

    /// Pearson matrix over every room's column of one kind
    pub fn correlation(&self, kind: ChannelKind) -> Result<CorrelationMatrix, SessionError> {
        Ok(correlate(&self.overlapping_columns(kind)?)?)
    }

    /// Correlation of every room against one room's column
    pub fn correlation_map(&self, room: &str, kind: ChannelKind) -> Result<Vec<RoomCode>, SessionError> {
        let column = column_name(kind, &self.room(room)?.name);
        let matrix = self.correlation(kind)?;
        Ok(severity::correlation_map(&matrix, &column)?)
    }

    pub fn suitability(&self, kind: ChannelKind) -> Result<SuitabilityReport, SessionError> {
        Ok(assess(
            &self.overlapping_columns(kind)?,
            self.settings.bartlett_alpha,
            self.settings.kmo_minimum,
        )?)
    }

    pub fn eigen_spectrum(&self, kind: ChannelKind) -> Result<Vec<f64>, SessionError> {
        Ok(eigen_spectrum(&self.overlapping_columns(kind)?)?)
    }

    /// Extract `k` factors, or the eigenvalue-one count when `k` is `None`
    pub fn factors(&self, kind: ChannelKind, k: Option<usize>) -> Result<FactorReport, SessionError> {
        let table = self.overlapping_columns(kind)?;
        let eigenvalues = eigen_spectrum(&table)?;
        let recommended = recommended_factor_count(&eigenvalues);
        let k = k.unwrap_or(recommended);
        let model = extract_factors_with(&table, k, self.settings.loading_threshold)?;

        Ok(FactorReport {
            eigenvalues,
            recommended_factors: recommended,
            model,
        })
    }

    pub fn factor_map(&self, model: &FactorModel, factor: usize) -> Result<Vec<RoomCode>, SessionError> {
        Ok(severity::factor_map(model, factor)?)
    }

    /// Run a registered analyzer on one room, overriding its parameters
    pub fn run_analyzer(
        &self,
        room: &str,
        id: &str,
        parameters: &HashMap<String, String>,
    ) -> Result<AnalysisResult, SessionError> {
        let room = self.room(room)?;
        let table = with_dew_point(&room.table).unwrap_or_else(|_| room.table.clone());

        let mut registry = AnalyzerRegistry::new();
        let analyzer = registry
            .find_by_id_mut(id)
            .ok_or_else(|| SessionError::UnknownAnalyzer(id.to_string()))?;

        let mut config = analyzer.get_config();
        config
            .parameters
            .extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        analyzer.set_config(&config);

        Ok(analyzer.analyze(&table)?)
    }

    pub fn export(&self, path: &Path) -> Result<(), SessionError> {
        self.dataset.save(path)?;
        tracing::info!("Exported {} rooms to {}", self.dataset.rooms.len(), path.display());
        Ok(())
    }
}
