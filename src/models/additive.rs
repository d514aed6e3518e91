//! Additive time-series decomposition with external regressors.
//!
//! The target is modelled as a regressor effect plus a seasonal-trend
//! baseline: a linear regression of consumption on the feature matrix
//! captures the exogenous effect, and the regression residuals are handed
//! to an MSTL decomposition (weekly — plus yearly once two full years of
//! training data exist) with an AutoETS trend model. The hold-out forecast
//! is the residual baseline forecast plus the regressor effect evaluated on
//! held-out feature values.

use anyhow::Result;
use augurs::ets::AutoETS;
use augurs::forecaster::{transforms::LinearInterpolator, Forecaster, Transformer};
use augurs::mstl::MSTLModel;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};

use super::{DemandModel, FitReport, ModelKind};
use crate::data::FeatureTable;

const WEEKLY_PERIOD: usize = 7;
const YEARLY_PERIOD: usize = 365;

/// Below this many training rows the seasonal decomposition is skipped and a
/// plain AutoETS carries the baseline.
const MIN_SEASONAL_DATA_POINTS: usize = 2 * WEEKLY_PERIOD;

const CONFIDENCE_LEVEL: f64 = 0.95;

pub struct AdditiveModel {
    regression: Option<LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
    /// Training residuals after removing the regressor effect; the baseline
    /// forecaster fits on these alone, so no hold-out value leaks in.
    train_residuals: Vec<f64>,
}

impl AdditiveModel {
    pub fn new() -> Self {
        Self {
            regression: None,
            train_residuals: Vec::new(),
        }
    }

    fn regressor_effect(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        let regression = self
            .regression
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("model not fitted"))?;

        let x = DenseMatrix::new(
            table.len(),
            table.feature_count(),
            table.flat_features(),
            false,
        );
        regression
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("regressor prediction failed: {:?}", e))
    }
}

impl Default for AdditiveModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DemandModel for AdditiveModel {
    fn kind(&self) -> ModelKind {
        ModelKind::AdditiveDecomposition
    }

    fn fit(&mut self, train: &FeatureTable) -> Result<FitReport> {
        if train.is_empty() {
            anyhow::bail!("cannot train on an empty partition");
        }

        let x = DenseMatrix::new(
            train.len(),
            train.feature_count(),
            train.flat_features(),
            false,
        );
        let regression =
            LinearRegression::fit(&x, &train.target, LinearRegressionParameters::default())
                .map_err(|e| anyhow::anyhow!("regressor fit failed: {:?}", e))?;

        let fitted = regression
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("regressor prediction failed: {:?}", e))?;

        self.train_residuals = train
            .target
            .iter()
            .zip(fitted.iter())
            .map(|(y, f)| y - f)
            .collect();
        self.regression = Some(regression);

        Ok(FitReport {
            kind: self.kind(),
            training_samples: train.len(),
            loss_history: None,
        })
    }

    fn predict(&self, test: &FeatureTable) -> Result<Vec<f64>> {
        let effect = self.regressor_effect(test)?;
        let baseline = forecast_baseline(&self.train_residuals, test.len())?;

        Ok(effect
            .iter()
            .zip(baseline.iter())
            .map(|(e, b)| e + b)
            .collect())
    }
}

/// Forecast the residual baseline over `horizon` steps.
fn forecast_baseline(residuals: &[f64], horizon: usize) -> Result<Vec<f64>> {
    if horizon == 0 {
        return Ok(Vec::new());
    }

    let forecast = if residuals.len() >= MIN_SEASONAL_DATA_POINTS {
        let mut periods = vec![WEEKLY_PERIOD];
        if residuals.len() >= 2 * YEARLY_PERIOD {
            periods.push(YEARLY_PERIOD);
        }
        forecast_with_mstl(residuals, horizon, periods)?
    } else {
        forecast_with_ets(residuals, horizon)?
    };

    Ok(forecast.point)
}

/// MSTL seasonal decomposition with an AutoETS trend model.
fn forecast_with_mstl(
    values: &[f64],
    horizon: usize,
    periods: Vec<usize>,
) -> Result<augurs::Forecast> {
    let ets = AutoETS::non_seasonal().into_trend_model();
    let mstl = MSTLModel::new(periods, ets);

    let transformers: Vec<Box<dyn Transformer>> = vec![Box::new(LinearInterpolator::default())];
    let mut forecaster = Forecaster::new(mstl).with_transformers(transformers);

    forecaster
        .fit(values)
        .map_err(|e| anyhow::anyhow!("MSTL fit error: {e}"))?;
    forecaster
        .predict(horizon, CONFIDENCE_LEVEL)
        .map_err(|e| anyhow::anyhow!("MSTL predict error: {e}"))
}

/// Plain AutoETS, for training windows too short to decompose.
fn forecast_with_ets(values: &[f64], horizon: usize) -> Result<augurs::Forecast> {
    let ets = AutoETS::non_seasonal();

    let transformers: Vec<Box<dyn Transformer>> = vec![Box::new(LinearInterpolator::default())];
    let mut forecaster = Forecaster::new(ets).with_transformers(transformers);

    forecaster
        .fit(values)
        .map_err(|e| anyhow::anyhow!("ETS fit error: {e}"))?;
    forecaster
        .predict(horizon, CONFIDENCE_LEVEL)
        .map_err(|e| anyhow::anyhow!("ETS predict error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn regressor_driven_table(rows: usize, offset: usize) -> FeatureTable {
        // y = 4*x1 + 10, with x1 cycling so train and test share its range
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut days = Vec::new();
        let mut feature_rows = Vec::new();
        let mut target = Vec::new();
        for i in 0..rows {
            let x1 = ((i + offset) % 11) as f64;
            days.push(start + chrono::Duration::days((i + offset) as i64));
            feature_rows.push(vec![x1, 1.0]);
            target.push(4.0 * x1 + 10.0);
        }
        FeatureTable {
            days,
            feature_names: vec!["x1".to_string(), "x2".to_string()],
            rows: feature_rows,
            target,
        }
    }

    #[test]
    fn recovers_pure_regressor_signal() {
        let train = regressor_driven_table(140, 0);
        let test = regressor_driven_table(28, 140);

        let mut model = AdditiveModel::new();
        model.fit(&train).unwrap();
        let predicted = model.predict(&test).unwrap();

        assert_eq!(predicted.len(), 28);
        let eval = crate::eval::Evaluation::from_predictions(&test.target, &predicted).unwrap();
        assert!(eval.r2 > 0.9, "R² was {}", eval.r2);
    }

    #[test]
    fn short_series_falls_back_to_ets() {
        // 10 residuals is below the seasonal threshold; the ETS path must
        // still produce a full-length forecast.
        let residuals = vec![0.5, -0.2, 0.1, 0.4, -0.3, 0.2, 0.0, -0.1, 0.3, -0.4];
        let baseline = forecast_baseline(&residuals, 5).unwrap();
        assert_eq!(baseline.len(), 5);
        assert!(baseline.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_horizon_is_empty() {
        let baseline = forecast_baseline(&[1.0; 30], 0).unwrap();
        assert!(baseline.is_empty());
    }

    #[test]
    fn predict_before_fit_fails() {
        let model = AdditiveModel::new();
        assert!(model.predict(&regressor_driven_table(5, 0)).is_err());
    }
}
