//! Seasonal ARIMA with exogenous covariates.
//!
//! Regression-with-SARIMA-errors rendition of SARIMAX(1,1,1)(1,1,1)s: a
//! linear regression captures the exogenous effect, the regression
//! residuals are differenced once regularly and once seasonally, and an
//! ARMA(1,1)x(1,1)s structure on the differenced series is estimated by
//! conditional least squares with a finite-difference gradient descent.
//! Neither stationarity nor invertibility is enforced on the coefficients.
//!
//! Forecasts run the ARMA recursion over the hold-out horizon with future
//! shocks at zero, integrate both differencing passes back, and add the
//! exogenous effect from held-out feature values.

use anyhow::Result;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};

use super::{DemandModel, FitReport, ModelKind};
use crate::data::FeatureTable;

/// Multiplicative ARMA coefficients: non-seasonal and seasonal AR/MA terms.
#[derive(Debug, Clone, Copy, Default)]
struct ArmaParams {
    ar: f64,
    sar: f64,
    ma: f64,
    sma: f64,
}

impl ArmaParams {
    fn from_array(values: [f64; 4]) -> Self {
        Self {
            ar: values[0],
            sar: values[1],
            ma: values[2],
            sma: values[3],
        }
    }

    fn to_array(self) -> [f64; 4] {
        [self.ar, self.sar, self.ma, self.sma]
    }
}

/// Conditional-least-squares settings.
#[derive(Debug, Clone)]
struct CssConfig {
    learning_rate: f64,
    max_iterations: usize,
    gradient_step: f64,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.02,
            max_iterations: 300,
            gradient_step: 1e-5,
        }
    }
}

pub struct SarimaModel {
    seasonal_period: usize,
    css: CssConfig,
    regression: Option<LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
    params: ArmaParams,
    /// Std of the differenced residual series; the optimizer works on the
    /// normalized series so the learning rate is scale-free.
    scale: f64,
    /// Normalized differenced residuals observed in training.
    w: Vec<f64>,
    /// One-step errors at the fitted coefficients, aligned with `w`.
    eps: Vec<f64>,
    /// Residual levels (target minus exogenous effect) over training, the
    /// anchor for integrating the differencing back.
    residual_levels: Vec<f64>,
}

impl SarimaModel {
    /// Standard specification: (1,1,1) non-seasonal, (1,1,1)s seasonal.
    pub fn new(seasonal_period: usize) -> Self {
        Self {
            seasonal_period,
            css: CssConfig::default(),
            regression: None,
            params: ArmaParams::default(),
            scale: 1.0,
            w: Vec::new(),
            eps: Vec::new(),
            residual_levels: Vec::new(),
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
            .map_err(|e| anyhow::anyhow!("exogenous prediction failed: {:?}", e))
    }
}

impl DemandModel for SarimaModel {
    fn kind(&self) -> ModelKind {
        ModelKind::SeasonalArima
    }

    fn fit(&mut self, train: &FeatureTable) -> Result<FitReport> {
        let s = self.seasonal_period;
        // One regular and one seasonal difference plus the ARMA burn-in.
        let min_rows = 1 + s + 2 * (s + 1);
        if train.len() < min_rows {
            anyhow::bail!(
                "training partition has {} rows; seasonal differencing with period {} needs at least {}",
                train.len(),
                s,
                min_rows
            );
        }

        let x = DenseMatrix::new(
            train.len(),
            train.feature_count(),
            train.flat_features(),
            false,
        );
        let regression =
            LinearRegression::fit(&x, &train.target, LinearRegressionParameters::default())
                .map_err(|e| anyhow::anyhow!("exogenous fit failed: {:?}", e))?;
        let effect = regression
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("exogenous prediction failed: {:?}", e))?;

        let residuals: Vec<f64> = train
            .target
            .iter()
            .zip(effect.iter())
            .map(|(y, f)| y - f)
            .collect();

        let w_raw = difference(&difference(&residuals, 1), s);
        let scale = std_dev(&w_raw).max(1e-9);
        let w: Vec<f64> = w_raw.iter().map(|v| v / scale).collect();

        let params = estimate_css(&w, s, &self.css);
        let eps = one_step_errors(params, &w, s);

        self.regression = Some(regression);
        self.params = params;
        self.scale = scale;
        self.w = w;
        self.eps = eps;
        self.residual_levels = residuals;

        Ok(FitReport {
            kind: self.kind(),
            training_samples: train.len(),
            loss_history: None,
        })
    }

    fn predict(&self, test: &FeatureTable) -> Result<Vec<f64>> {
        let effect = self.regressor_effect(test)?;
        let horizon = test.len();
        let s = self.seasonal_period;
        let k = s + 1;

        // ARMA recursion over the horizon; future shocks are zero.
        let mut w = self.w.clone();
        let mut eps = self.eps.clone();
        for _ in 0..horizon {
            let t = w.len();
            let p = self.params;
            let next = p.ar * w[t - 1] + p.sar * w[t - s] - p.ar * p.sar * w[t - k]
                + p.ma * eps[t - 1]
                + p.sma * eps[t - s]
                + p.ma * p.sma * eps[t - k];
            w.push(next);
            eps.push(0.0);
        }

        // Integrate the regular and seasonal differences back to levels.
        let mut levels = self.residual_levels.clone();
        for step in 0..horizon {
            let w_hat = w[self.w.len() + step] * self.scale;
            let m = levels.len();
            let next = w_hat + levels[m - 1] + levels[m - s] - levels[m - k];
            levels.push(next);
        }

        Ok(effect
            .iter()
            .zip(levels[self.residual_levels.len()..].iter())
            .map(|(e, r)| e + r)
            .collect())
    }
}

/// Lagged difference: `out[t] = series[t + lag] - series[t]` shifted so the
/// result aligns with the later observation.
fn difference(series: &[f64], lag: usize) -> Vec<f64> {
    series
        .iter()
        .skip(lag)
        .zip(series.iter())
        .map(|(later, earlier)| later - earlier)
        .collect()
}

/// One-step prediction errors of the multiplicative ARMA(1,1)x(1,1)s
/// recursion, with pre-sample errors conditioned to zero.
fn one_step_errors(params: ArmaParams, w: &[f64], s: usize) -> Vec<f64> {
    let k = s + 1;
    let mut eps = vec![0.0; w.len()];
    for t in k..w.len() {
        let pred = params.ar * w[t - 1] + params.sar * w[t - s] - params.ar * params.sar * w[t - k]
            + params.ma * eps[t - 1]
            + params.sma * eps[t - s]
            + params.ma * params.sma * eps[t - k];
        eps[t] = w[t] - pred;
    }
    eps
}

fn css_loss(values: [f64; 4], w: &[f64], s: usize) -> f64 {
    let k = s + 1;
    if w.len() <= k {
        return 0.0;
    }
    let eps = one_step_errors(ArmaParams::from_array(values), w, s);
    eps[k..].iter().map(|e| e * e).sum::<f64>() / (w.len() - k) as f64
}

/// Minimize the conditional sum of squares by plain gradient descent with
/// central-difference gradients over the four coefficients.
fn estimate_css(w: &[f64], s: usize, cfg: &CssConfig) -> ArmaParams {
    let mut values = [0.0f64; 4];

    for _ in 0..cfg.max_iterations {
        let mut gradient = [0.0f64; 4];
        for i in 0..4 {
            let mut upper = values;
            let mut lower = values;
            upper[i] += cfg.gradient_step;
            lower[i] -= cfg.gradient_step;
            gradient[i] =
                (css_loss(upper, w, s) - css_loss(lower, w, s)) / (2.0 * cfg.gradient_step);
        }

        for i in 0..4 {
            values[i] -= cfg.learning_rate * gradient[i];
        }
    }

    ArmaParams::from_array(values)
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
