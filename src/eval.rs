//! Forecast evaluation.
//!
//! Pure functions over aligned actual/predicted sequences: squared-error
//! metrics, the derived accuracy percentage, residual series, and the
//! Pearson correlation matrix backing the heatmap chart.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::ModelKind;

/// Per-model evaluation scalars, computed once and never mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean squared error
    pub mse: f64,
    /// Root mean squared error (the square root of `mse`, exactly)
    pub rmse: f64,
    /// R² (coefficient of determination)
    pub r2: f64,
    /// 100 × R², negative when the model underperforms the mean
    pub accuracy_pct: f64,
}

impl Evaluation {
    /// Calculate metrics from aligned actual and predicted values.
    pub fn from_predictions(actual: &[f64], predicted: &[f64]) -> Result<Self, EvalError> {
        if actual.len() != predicted.len() {
            return Err(EvalError::DimensionMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Err(EvalError::EmptyData);
        }

        let n = actual.len() as f64;

        let ss_res: f64 = actual
            .iter()
            .zip(predicted.iter())
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let mse = ss_res / n;
        let rmse = mse.sqrt();

        let mean_actual = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
        let r2 = if ss_tot > 1e-10 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        };

        Ok(Self {
            mse,
            rmse,
            r2,
            accuracy_pct: 100.0 * r2,
        })
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MSE={:.2}, RMSE={:.2}, R²={:.4}, Accuracy={:.2}%",
            self.mse, self.rmse, self.r2, self.accuracy_pct
        )
    }
}

/// Evaluation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    #[error("dimension mismatch: actual={actual}, predicted={predicted}")]
    DimensionMismatch { actual: usize, predicted: usize },

    #[error("empty data provided")]
    EmptyData,
}

/// Hold-out predictions aligned with their observed values by day.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionSeries {
    pub days: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl PredictionSeries {
    pub fn new(days: Vec<NaiveDate>, actual: Vec<f64>, predicted: Vec<f64>) -> Self {
        debug_assert_eq!(days.len(), actual.len());
        debug_assert_eq!(actual.len(), predicted.len());
        Self {
            days,
            actual,
            predicted,
        }
    }

    /// Elementwise actual − predicted.
    pub fn residuals(&self) -> Vec<f64> {
        self.actual
            .iter()
            .zip(self.predicted.iter())
            .map(|(a, p)| a - p)
            .collect()
    }
}

/// Pearson correlation matrix over named columns.
///
/// The diagonal is 1.0 by definition; a zero-variance column correlates 0.0
/// with everything else.
pub fn correlation_matrix(columns: &[(String, Vec<f64>)]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut matrix = vec![vec![0.0; k]; k];

    for i in 0..k {
        matrix[i][i] = 1.0;
        for j in (i + 1)..k {
            let rho = pearson(&columns[i].1, &columns[j].1);
            matrix[i][j] = rho;
            matrix[j][i] = rho;
        }
    }

    matrix
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;

    let mean_x = x[..n].iter().sum::<f64>() / nf;
    let mean_y = y[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 1e-10 || var_y <= 1e-10 {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

/// The final cross-model comparison, indexed by model name.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTable {
    rows: Vec<(ModelKind, Evaluation)>,
}

impl ComparisonTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push(&mut self, kind: ModelKind, evaluation: Evaluation) {
        self.rows.push((kind, evaluation));
    }

    pub fn rows(&self) -> &[(ModelKind, Evaluation)] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for ComparisonTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:>14} {:>12} {:>10} {:>12}",
            "Model", "MSE", "RMSE", "R²", "Accuracy %"
        )?;
        for (kind, eval) in &self.rows {
            writeln!(
                f,
                "{:<24} {:>14.2} {:>12.2} {:>10.4} {:>12.2}",
                kind.to_string(),
                eval.mse,
                eval.rmse,
                eval.r2,
                eval.accuracy_pct
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn perfect_forecast() {
        let actual = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let eval = Evaluation::from_predictions(&actual, &actual).unwrap();

        assert_eq!(eval.mse, 0.0);
        assert_eq!(eval.rmse, 0.0);
        assert_eq!(eval.r2, 1.0);
        assert_eq!(eval.accuracy_pct, 100.0);
    }

    #[test]
    fn worse_than_mean_yields_negative_accuracy() {
        let actual = vec![1.0, 2.0, 3.0, 4.0];
        let predicted = vec![10.0, -10.0, 10.0, -10.0];
        let eval = Evaluation::from_predictions(&actual, &predicted).unwrap();

        assert!(eval.r2 < 0.0);
        assert_eq!(eval.accuracy_pct, 100.0 * eval.r2);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let result = Evaluation::from_predictions(&[1.0, 2.0], &[1.0]);
        assert!(matches!(
            result,
            Err(EvalError::DimensionMismatch {
                actual: 2,
                predicted: 1
            })
        ));
    }

    #[test]
    fn empty_data_is_an_error() {
        assert!(matches!(
            Evaluation::from_predictions(&[], &[]),
            Err(EvalError::EmptyData)
        ));
    }

    #[test]
    fn residuals_are_elementwise_differences() {
        let series = PredictionSeries::new(
            vec![
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            ],
            vec![100.0, 200.0],
            vec![90.0, 210.0],
        );
        assert_eq!(series.residuals(), vec![10.0, -10.0]);
    }

    #[test]
    fn correlation_of_identical_columns_is_one() {
        let columns = vec![
            ("a".to_string(), vec![1.0, 2.0, 3.0, 4.0]),
            ("b".to_string(), vec![2.0, 4.0, 6.0, 8.0]),
        ];
        let matrix = correlation_matrix(&columns);

        assert!((matrix[0][1] - 1.0).abs() < 1e-12);
        assert_eq!(matrix[0][0], 1.0);
        assert_eq!(matrix[1][1], 1.0);
    }

    #[test]
    fn anticorrelated_columns_score_minus_one() {
        let columns = vec![
            ("a".to_string(), vec![1.0, 2.0, 3.0]),
            ("b".to_string(), vec![3.0, 2.0, 1.0]),
        ];
        let matrix = correlation_matrix(&columns);
        assert!((matrix[0][1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_variance_column_correlates_zero() {
        let columns = vec![
            ("a".to_string(), vec![5.0, 5.0, 5.0]),
            ("b".to_string(), vec![1.0, 2.0, 3.0]),
        ];
        let matrix = correlation_matrix(&columns);
        assert_eq!(matrix[0][1], 0.0);
    }

    proptest! {
        /// RMSE is exactly the square root of MSE.
        #[test]
        fn rmse_is_sqrt_of_mse(
            pairs in proptest::collection::vec((-1e4f64..1e4, -1e4f64..1e4), 1..200)
        ) {
            let actual: Vec<f64> = pairs.iter().map(|(a, _)| *a).collect();
            let predicted: Vec<f64> = pairs.iter().map(|(_, p)| *p).collect();
            let eval = Evaluation::from_predictions(&actual, &predicted).unwrap();

            prop_assert!((eval.rmse - eval.mse.sqrt()).abs() <= f64::EPSILON * eval.mse.sqrt().max(1.0));
        }

        /// Accuracy is exactly 100 × R², sign included.
        #[test]
        fn accuracy_is_scaled_r2(
            pairs in proptest::collection::vec((-1e4f64..1e4, -1e4f64..1e4), 2..200)
        ) {
            let actual: Vec<f64> = pairs.iter().map(|(a, _)| *a).collect();
            let predicted: Vec<f64> = pairs.iter().map(|(_, p)| *p).collect();
            let eval = Evaluation::from_predictions(&actual, &predicted).unwrap();

            prop_assert_eq!(eval.accuracy_pct, 100.0 * eval.r2);
        }
    }
}
