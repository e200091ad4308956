use rand::Rng;
use serde::Serialize;
use std::fmt;

use crate::error::{DemoError, DemoResult};

/// Fixed-shape 2D matrix stored row-major: `data[r * cols + c]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix<T> {
    data: Vec<T>,
    shape: (usize, usize), // [rows, cols]
}

impl<T: Copy> Matrix<T> {
    /// Build from rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> DemoResult<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);

        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != num_cols) {
            return Err(DemoError::invalid(format!(
                "row {} has {} columns, expected {}",
                idx,
                row.len(),
                num_cols
            )));
        }

        Ok(Self {
            data: rows.into_iter().flatten().collect(),
            shape: (num_rows, num_cols),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        let (rows, cols) = self.shape;
        if row < rows && col < cols {
            Some(self.data[row * cols + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[T] {
        let cols = self.shape.1;
        &self.data[row * cols..(row + 1) * cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.shape.0).map(move |r| self.row(r))
    }

    /// Copy of one column, top to bottom.
    pub fn column(&self, col: usize) -> Vec<T> {
        let (rows, cols) = self.shape;
        (0..rows).map(|r| self.data[r * cols + col]).collect()
    }
}

impl<T: Copy + fmt::Display> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .data
            .iter()
            .map(|value| value.to_string().len())
            .max()
            .unwrap_or(1);

        f.write_str("[")?;
        for (idx, row) in self.rows().enumerate() {
            if idx > 0 {
                f.write_str(",\n ")?;
            }
            f.write_str("[")?;
            for (c, value) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:>width$}", value, width = width)?;
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}

/// Random integer matrix with values uniformly drawn from `low..=high`.
pub fn random_matrix<R: Rng>(
    rows: usize,
    cols: usize,
    low: i64,
    high: i64,
    rng: &mut R,
) -> DemoResult<Matrix<i64>> {
    if rows == 0 || cols == 0 {
        return Err(DemoError::invalid("matrix shape must be non-zero"));
    }
    if low > high {
        return Err(DemoError::invalid(format!(
            "low ({}) must not exceed high ({})",
            low, high
        )));
    }

    Ok(Matrix {
        data: (0..rows * cols).map(|_| rng.random_range(low..=high)).collect(),
        shape: (rows, cols),
    })
}
