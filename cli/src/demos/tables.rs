//! Column reductions over integer matrices and the city × company pivot.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{DemoError, DemoResult};
use crate::models::{CityCompanyTable, Matrix, PresenceMatrix};

/// Sample used by `ratio --sample`.
pub fn sample_matrix() -> Matrix<i64> {
    Matrix::from_rows(vec![vec![1, 2], vec![3, 8], vec![5, 4]])
        .unwrap_or_else(|_| unreachable!("sample rows share one width"))
}

/// Per-column `max / min` via two direct column reductions.
///
/// A zero minimum fails with [`DemoError::DivideByZero`] for the first such column.
pub fn max_by_min(matrix: &Matrix<i64>) -> DemoResult<Vec<f64>> {
    ensure_non_empty(matrix)?;
    let (rows, cols) = matrix.shape();

    let mut mins = vec![i64::MAX; cols];
    let mut maxs = vec![i64::MIN; cols];
    for r in 0..rows {
        for (c, &value) in matrix.row(r).iter().enumerate() {
            mins[c] = mins[c].min(value);
            maxs[c] = maxs[c].max(value);
        }
    }

    mins.iter()
        .zip(&maxs)
        .enumerate()
        .map(|(column, (&min, &max))| ratio(column, min, max))
        .collect()
}

/// Same result as [`max_by_min`], computed by applying a closure to each column.
pub fn max_by_min_apply(matrix: &Matrix<i64>) -> DemoResult<Vec<f64>> {
    ensure_non_empty(matrix)?;

    apply_along_columns(matrix, |column, values| {
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        ratio(column, min, max)
    })
    .into_iter()
    .collect()
}

/// Apply `f(column_index, column_values)` to every column in parallel.
///
/// Results come back in column order regardless of scheduling.
pub fn apply_along_columns<T, R, F>(matrix: &Matrix<T>, f: F) -> Vec<R>
where
    T: Copy + Send + Sync,
    R: Send,
    F: Fn(usize, &[T]) -> R + Sync,
{
    let (_, cols) = matrix.shape();
    debug!(columns = cols, "applying reduction along columns");

    (0..cols)
        .into_par_iter()
        .map(|c| f(c, &matrix.column(c)))
        .collect()
}

/// Count matrix of (city, company) co-occurrences.
pub fn presence_matrix(table: &CityCompanyTable) -> PresenceMatrix {
    PresenceMatrix::from_table(table)
}

fn ratio(column: usize, min: i64, max: i64) -> DemoResult<f64> {
    if min == 0 {
        return Err(DemoError::DivideByZero { column });
    }
    Ok(max as f64 / min as f64)
}

fn ensure_non_empty(matrix: &Matrix<i64>) -> DemoResult<()> {
    if matrix.is_empty() {
        return Err(DemoError::invalid("matrix has no cells"));
    }
    Ok(())
}
