//! Exploratory factor analysis.
//!
//! Extraction is iterated principal-axis factoring: communalities start at
//! the squared multiple correlations, the reduced correlation matrix is
//! decomposed and the communalities re-estimated until they settle. Loadings
//! are then varimax-rotated (Kaiser-normalized) and sign-normalized so every
//! factor's column sum is non-negative.

use super::statistics::{correlate, CorrelationMatrix};
use super::suitability::inverse_correlation;
use super::*;
use nalgebra::{DMatrix, SymmetricEigen};

const PAF_MAX_ITER: usize = 100;
const PAF_TOLERANCE: f64 = 1e-6;
const VARIMAX_MAX_ITER: usize = 500;
const VARIMAX_TOLERANCE: f64 = 1e-5;

/// Loading threshold below which a variable is not listed as contributing
pub const DEFAULT_LOADING_THRESHOLD: f64 = 0.25;

/// Variables that load on one factor, strongest first
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactorContribution {
    /// 1-based factor number
    pub factor: usize,
    pub variables: Vec<(String, f64)>,
}

/// Rotated factor solution
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactorModel {
    pub variables: Vec<String>,
    /// p rows (variables) by k columns (factors)
    pub loadings: Vec<Vec<f64>>,
    pub communalities: Vec<f64>,
    /// Sum of squared loadings per factor
    pub variance: Vec<f64>,
    pub proportional_variance: Vec<f64>,
    pub cumulative_variance: Vec<f64>,
    pub total_variance_explained: f64,
    pub contributions: Vec<FactorContribution>,
    pub iterations: usize,
    pub converged: bool,
}

impl FactorModel {
    pub fn factor_count(&self) -> usize {
        self.variance.len()
    }

    /// Loading of every variable on a 1-based factor
    pub fn loadings_for(&self, factor: usize) -> Option<Vec<(String, f64)>> {
        if factor == 0 || factor > self.factor_count() {
            return None;
        }
        Some(
            self.variables
                .iter()
                .zip(&self.loadings)
                .map(|(name, row)| (name.clone(), row[factor - 1]))
                .collect(),
        )
    }
}

fn sorted_eigen(matrix: DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
    let eig = SymmetricEigen::new(matrix);
    let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let vectors = DMatrix::from_fn(eig.eigenvectors.nrows(), order.len(), |r, c| {
        eig.eigenvectors[(r, order[c])]
    });
    (values, vectors)
}

/// Eigenvalues of the correlation matrix, descending
pub fn eigen_spectrum(table: &TimeSeriesTable) -> Result<Vec<f64>, AnalysisError> {
    let matrix = correlate(table)?;
    Ok(sorted_eigen(matrix.to_dmatrix()).0)
}

/// Kaiser criterion: number of eigenvalues greater than 1
pub fn recommended_factor_count(eigenvalues: &[f64]) -> usize {
    eigenvalues.iter().filter(|&&v| v > 1.0).count()
}

/// Extract and rotate `k` factors from an aligned, complete table
pub fn extract_factors(table: &TimeSeriesTable, k: usize) -> Result<FactorModel, AnalysisError> {
    extract_factors_with(table, k, DEFAULT_LOADING_THRESHOLD)
}

pub fn extract_factors_with(
    table: &TimeSeriesTable,
    k: usize,
    loading_threshold: f64,
) -> Result<FactorModel, AnalysisError> {
    check_factor_count(k, table.channels.len())?;
    let matrix = correlate(table)?;
    extract_from_matrix(&matrix, k, loading_threshold)
}

fn check_factor_count(k: usize, variables: usize) -> Result<(), AnalysisError> {
    if k == 0 || k >= variables {
        return Err(AnalysisError::InvalidFactorCount {
            requested: k,
            variables,
        });
    }
    Ok(())
}

pub fn extract_from_matrix(
    matrix: &CorrelationMatrix,
    k: usize,
    loading_threshold: f64,
) -> Result<FactorModel, AnalysisError> {
    let p = matrix.len();
    check_factor_count(k, p)?;

    let (unrotated, iterations, converged) = principal_axis(&matrix.to_dmatrix(), k)?;
    let rotated = normalize_signs(varimax(&unrotated));

    let loadings: Vec<Vec<f64>> = (0..p)
        .map(|i| (0..k).map(|j| rotated[(i, j)]).collect())
        .collect();
    let communalities = loadings
        .iter()
        .map(|row| row.iter().map(|l| l * l).sum())
        .collect();

    let variance: Vec<f64> = (0..k)
        .map(|j| rotated.column(j).iter().map(|l| l * l).sum())
        .collect();
    let proportional_variance: Vec<f64> = variance.iter().map(|v| v / p as f64).collect();
    let cumulative_variance: Vec<f64> = proportional_variance
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect();
    let total_variance_explained = cumulative_variance.last().copied().unwrap_or(0.0);

    let contributions = (0..k)
        .map(|j| {
            let mut variables: Vec<(String, f64)> = matrix
                .names
                .iter()
                .zip(&loadings)
                .map(|(name, row)| (name.clone(), row[j]))
                .filter(|(_, l)| l.abs() > loading_threshold)
                .collect();
            variables.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
            FactorContribution {
                factor: j + 1,
                variables,
            }
        })
        .collect();

    tracing::info!(
        "Extracted {} factors from {} variables ({:.1}% variance explained)",
        k,
        p,
        total_variance_explained * 100.0
    );

    Ok(FactorModel {
        variables: matrix.names.clone(),
        loadings,
        communalities,
        variance,
        proportional_variance,
        cumulative_variance,
        total_variance_explained,
        contributions,
        iterations,
        converged,
    })
}

/// Iterated principal-axis factoring. Returns p x k loadings, the number of
/// iterations run and whether the communalities converged.
fn principal_axis(r: &DMatrix<f64>, k: usize) -> Result<(DMatrix<f64>, usize, bool), AnalysisError> {
    let p = r.nrows();
    let inv = inverse_correlation(r)?;

    // Squared multiple correlations
    let mut communalities: Vec<f64> = (0..p)
        .map(|i| {
            let d = inv[(i, i)];
            if d > 0.0 {
                (1.0 - 1.0 / d).clamp(0.0, 1.0)
            } else {
                1.0
            }
        })
        .collect();

    let mut loadings = DMatrix::zeros(p, k);
    let mut heywood = false;

    for iteration in 1..=PAF_MAX_ITER {
        let mut reduced = r.clone();
        for (i, &h) in communalities.iter().enumerate() {
            reduced[(i, i)] = h;
        }

        let (values, vectors) = sorted_eigen(reduced);
        for j in 0..k {
            let scale = values[j].max(0.0).sqrt();
            for i in 0..p {
                loadings[(i, j)] = vectors[(i, j)] * scale;
            }
        }

        let mut delta: f64 = 0.0;
        for (i, h) in communalities.iter_mut().enumerate() {
            let mut updated = loadings.row(i).norm_squared();
            if updated > 1.0 {
                heywood = true;
                updated = 1.0;
            }
            delta = delta.max((updated - *h).abs());
            *h = updated;
        }

        if delta < PAF_TOLERANCE {
            if heywood {
                tracing::warn!("Heywood case: communalities clamped at 1");
            }
            return Ok((loadings, iteration, true));
        }
    }

    tracing::warn!(
        "Principal-axis extraction did not converge after {} iterations",
        PAF_MAX_ITER
    );
    Ok((loadings, PAF_MAX_ITER, false))
}

/// Kaiser-normalized varimax rotation
pub fn varimax(loadings: &DMatrix<f64>) -> DMatrix<f64> {
    let (n_rows, n_cols) = loadings.shape();
    if n_cols < 2 {
        return loadings.clone();
    }

    let norms: Vec<f64> = (0..n_rows)
        .map(|i| {
            let norm = loadings.row(i).norm();
            if norm > 0.0 {
                norm
            } else {
                1.0
            }
        })
        .collect();
    let x = DMatrix::from_fn(n_rows, n_cols, |i, j| loadings[(i, j)] / norms[i]);

    let mut rotation = DMatrix::<f64>::identity(n_cols, n_cols);
    let mut d = 0.0;

    for _ in 0..VARIMAX_MAX_ITER {
        let old_d = d;
        let basis = &x * &rotation;

        let column_sq: Vec<f64> = (0..n_cols)
            .map(|j| basis.column(j).iter().map(|b| b * b).sum())
            .collect();
        let target = DMatrix::from_fn(n_rows, n_cols, |i, j| {
            let b = basis[(i, j)];
            b.powi(3) - b * column_sq[j] / n_rows as f64
        });

        let svd = (x.transpose() * target).svd(true, true);
        let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
            break;
        };
        rotation = u * v_t;
        d = svd.singular_values.sum();

        if d < old_d * (1.0 + VARIMAX_TOLERANCE) {
            break;
        }
    }

    let rotated = x * rotation;
    DMatrix::from_fn(n_rows, n_cols, |i, j| rotated[(i, j)] * norms[i])
}

/// Flip factors whose loadings sum to a negative value
fn normalize_signs(mut loadings: DMatrix<f64>) -> DMatrix<f64> {
    for mut column in loadings.column_iter_mut() {
        if column.sum() < 0.0 {
            column.neg_mut();
        }
    }
    loadings
}
