use serde::Serialize;

use crate::error::{DemoError, DemoResult};

/// One rolling-mean overlay: `values[i]` is `None` until `window` rows are available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverageSeries {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

impl MovingAverageSeries {
    pub fn label(&self) -> String {
        format!("MA{}", self.window)
    }

    /// Defined points as `(row index, value)` pairs.
    pub fn defined_points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| value.map(|v| (idx, v)))
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }
}

/// Simple moving average over `values` with a fixed `window`.
///
/// Uses a running sum, so the cost is linear in the number of rows.
pub fn simple_moving_average(values: &[f64], window: usize) -> DemoResult<Vec<Option<f64>>> {
    if window == 0 {
        return Err(DemoError::invalid("moving average window must be at least 1"));
    }

    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (idx, value) in values.iter().enumerate() {
        sum += value;
        if idx >= window {
            sum -= values[idx - window];
        }

        if idx + 1 < window {
            result.push(None);
        } else {
            result.push(Some(sum / window as f64));
        }
    }

    Ok(result)
}

/// Compute one series per window, in the order given.
pub fn moving_averages(closes: &[f64], windows: &[usize]) -> DemoResult<Vec<MovingAverageSeries>> {
    windows
        .iter()
        .map(|&window| {
            Ok(MovingAverageSeries {
                window,
                values: simple_moving_average(closes, window)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_until_window_fills() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ma = simple_moving_average(&closes, 4).unwrap();
        assert!(ma[..3].iter().all(Option::is_none));
        assert_eq!(ma[3], Some(2.5));
        assert_eq!(ma[4], Some(3.5));
    }

    #[test]
    fn test_window_longer_than_history_is_all_undefined() {
        let closes = [10.0, 11.0, 12.0];
        let ma = simple_moving_average(&closes, 30).unwrap();
        assert_eq!(ma.len(), 3);
        assert!(ma.iter().all(Option::is_none));
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let closes = [3.0, 1.5, 7.25];
        let ma = simple_moving_average(&closes, 1).unwrap();
        assert_eq!(ma, vec![Some(3.0), Some(1.5), Some(7.25)]);
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert!(matches!(
            simple_moving_average(&[1.0], 0),
            Err(DemoError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_running_sum_matches_naive_mean() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let ma = simple_moving_average(&closes, 30).unwrap();
        for idx in 29..closes.len() {
            let naive: f64 = closes[idx + 1 - 30..=idx].iter().sum::<f64>() / 30.0;
            assert!((ma[idx].unwrap() - naive).abs() < 1e-9);
        }
    }

    #[test]
    fn test_series_per_window_keeps_order() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        let series = moving_averages(&closes, &[4, 2]).unwrap();
        assert_eq!(series[0].label(), "MA4");
        assert_eq!(series[1].window, 2);
        assert_eq!(series[1].defined_points().count(), 3);
        assert_eq!(series[0].last(), Some(2.5));
    }
}
