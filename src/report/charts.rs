//! Chart payloads.
//!
//! All structs serialize to JSON so a charting frontend can render them
//! directly; the pipeline only guarantees that each payload reflects the
//! already-computed values.

use chrono::NaiveDate;
use itertools::{Itertools, MinMaxResult};
use serde::Serialize;

use crate::eval::{ComparisonTable, Evaluation, PredictionSeries};
use crate::models::{LossHistory, ModelKind};

/// Actual vs predicted over the hold-out window.
#[derive(Debug, Clone, Serialize)]
pub struct LineChart {
    pub model: ModelKind,
    pub title: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

impl LineChart {
    pub fn from_series(model: ModelKind, series: &PredictionSeries) -> Self {
        Self {
            model,
            title: format!("Actual vs Predicted Over Time ({model})"),
            points: series_points(series),
        }
    }
}

/// Actual vs predicted scatter with the identity reference segment.
#[derive(Debug, Clone, Serialize)]
pub struct ScatterChart {
    pub model: ModelKind,
    pub title: String,
    pub points: Vec<ScatterPoint>,
    /// Endpoints of the y = x reference line over the actual-value range.
    pub identity: IdentitySegment,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterPoint {
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct IdentitySegment {
    pub min: f64,
    pub max: f64,
}

impl ScatterChart {
    pub fn from_series(model: ModelKind, series: &PredictionSeries) -> Self {
        let identity = match series.actual.iter().copied().minmax() {
            MinMaxResult::NoElements => IdentitySegment { min: 0.0, max: 0.0 },
            MinMaxResult::OneElement(v) => IdentitySegment { min: v, max: v },
            MinMaxResult::MinMax(min, max) => IdentitySegment { min, max },
        };

        Self {
            model,
            title: format!("Actual vs Predicted Scatter ({model})"),
            points: series
                .actual
                .iter()
                .zip(series.predicted.iter())
                .map(|(a, p)| ScatterPoint {
                    actual: *a,
                    predicted: *p,
                })
                .collect(),
            identity,
        }
    }
}

/// Residuals over time; renderers draw the zero reference themselves.
#[derive(Debug, Clone, Serialize)]
pub struct ResidualChart {
    pub model: ModelKind,
    pub title: String,
    pub points: Vec<ResidualPoint>,
    pub reference: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResidualPoint {
    pub date: NaiveDate,
    pub residual: f64,
}

impl ResidualChart {
    pub fn from_series(model: ModelKind, series: &PredictionSeries) -> Self {
        Self {
            model,
            title: format!("Residuals Over Time ({model})"),
            points: series
                .days
                .iter()
                .zip(series.residuals())
                .map(|(date, residual)| ResidualPoint {
                    date: *date,
                    residual,
                })
                .collect(),
            reference: 0.0,
        }
    }
}

/// Pearson correlation heatmap over features and target.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapChart {
    pub model: ModelKind,
    pub title: String,
    pub labels: Vec<String>,
    /// Square matrix aligned with `labels` on both axes.
    pub matrix: Vec<Vec<f64>>,
}

impl HeatmapChart {
    pub fn new(model: ModelKind, labels: Vec<String>, matrix: Vec<Vec<f64>>) -> Self {
        Self {
            model,
            title: format!("Feature Correlation Heatmap ({model})"),
            labels,
            matrix,
        }
    }
}

/// Per-epoch loss trace of an iterative trainer.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingHistoryChart {
    pub model: ModelKind,
    pub title: String,
    pub train_loss: Vec<f64>,
    pub validation_loss: Vec<f64>,
}

impl TrainingHistoryChart {
    pub fn from_history(model: ModelKind, history: &LossHistory) -> Self {
        Self {
            model,
            title: format!("Training Loss Over Epochs ({model})"),
            train_loss: history.train.clone(),
            validation_loss: history.validation.clone(),
        }
    }
}

/// The final grouped bar chart comparing all models across all metrics.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonBarChart {
    pub title: String,
    pub groups: Vec<MetricBarGroup>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricBarGroup {
    pub model: ModelKind,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub accuracy_pct: f64,
}

impl ComparisonBarChart {
    pub fn from_table(table: &ComparisonTable) -> Self {
        Self {
            title: "Model Evaluation Metrics Comparison".to_string(),
            groups: table
                .rows()
                .iter()
                .map(|(model, eval)| MetricBarGroup::new(*model, eval))
                .collect(),
        }
    }
}

impl MetricBarGroup {
    fn new(model: ModelKind, eval: &Evaluation) -> Self {
        Self {
            model,
            mse: eval.mse,
            rmse: eval.rmse,
            r2: eval.r2,
            accuracy_pct: eval.accuracy_pct,
        }
    }
}

fn series_points(series: &PredictionSeries) -> Vec<SeriesPoint> {
    series
        .days
        .iter()
        .zip(series.actual.iter().zip(series.predicted.iter()))
        .map(|(date, (actual, predicted))| SeriesPoint {
            date: *date,
            actual: *actual,
            predicted: *predicted,
        })
        .collect()
}
