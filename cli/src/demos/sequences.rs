//! List and nested-list transformations over fixed inputs.

use serde::Serialize;

/// Names run through [`filter_names`] by the `sequences` command.
pub const FIXED_NAMES: [&str; 10] = [
    "any", "all", "sum", "any", "all", "sum", "apple", "banana", "cherry", "",
];

/// Integers 0..=9.
pub fn first_ten() -> Vec<u32> {
    (0..10).collect()
}

/// Even integers in `0..limit`, ascending.
pub fn evens_below(limit: u32) -> Vec<u32> {
    (0..limit).filter(|i| i % 2 == 0).collect()
}

/// Keep names that are non-empty, do not start with `a` and do not end with `y`.
pub fn filter_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| !name.is_empty())
        .filter(|name| !name.starts_with('a'))
        .filter(|name| !name.ends_with('y'))
        .map(String::from)
        .collect()
}

/// `size × size` grid where row `j`, column `i` holds `i + j`.
pub fn sum_grid(size: usize) -> Vec<Vec<usize>> {
    (0..size)
        .map(|j| (0..size).map(|i| i + j).collect())
        .collect()
}

/// Row-major concatenation of `rows`.
pub fn flatten<T: Clone>(rows: &[Vec<T>]) -> Vec<T> {
    rows.iter().flat_map(|row| row.iter().cloned()).collect()
}

/// Every derived sequence, ready to print.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceReport {
    pub first_ten: Vec<u32>,
    pub evens: Vec<u32>,
    pub filtered_names: Vec<String>,
    pub grid: Vec<Vec<usize>>,
    pub flattened: Vec<usize>,
}

impl SequenceReport {
    pub fn build() -> Self {
        let grid = sum_grid(5);
        let flattened = flatten(&grid);
        Self {
            first_ten: first_ten(),
            evens: evens_below(50),
            filtered_names: filter_names(&FIXED_NAMES),
            grid,
            flattened,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_ten_is_zero_through_nine() {
        assert_eq!(first_ten(), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_evens_below_fifty() {
        let evens = evens_below(50);
        for i in 0..50 {
            assert_eq!(evens.contains(&i), i % 2 == 0, "membership of {}", i);
        }
        assert!(evens.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(evens.len(), 25);
    }

    #[test]
    fn test_filter_fixed_names() {
        assert_eq!(filter_names(&FIXED_NAMES), vec!["sum", "sum", "banana"]);
    }

    #[test]
    fn test_filter_short_list() {
        let names = ["any", "all", "sum", "apple", "banana", "cherry", ""];
        assert_eq!(filter_names(&names), vec!["sum", "banana"]);
    }

    #[test]
    fn test_filter_excludes_both_conditions() {
        let names = vec!["a".to_string(), "y".to_string(), "x".to_string()];
        assert_eq!(filter_names(&names), vec!["x"]);
    }

    #[test]
    fn test_grid_rows_and_flattening() {
        let grid = sum_grid(5);
        for (j, row) in grid.iter().enumerate() {
            assert_eq!(row, &vec![j, j + 1, j + 2, j + 3, j + 4]);
        }

        let flat = flatten(&grid);
        assert_eq!(flat.len(), 25);
        assert_eq!(&flat[..5], &[0, 1, 2, 3, 4]);
        assert_eq!(&flat[20..], &[4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_report_bundles_all_sequences() {
        let report = SequenceReport::build();
        assert_eq!(report.first_ten.len(), 10);
        assert_eq!(report.filtered_names, vec!["sum", "sum", "banana"]);
        assert_eq!(report.flattened, flatten(&report.grid));
    }
}
