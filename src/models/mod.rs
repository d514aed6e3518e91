//! The four demand forecasting models.
//!
//! Each model consumes the same train/test partition through the
//! [`DemandModel`] seam and produces one prediction per hold-out day. The
//! models are independent: no shared state, no ensembling.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::data::FeatureTable;

pub mod additive;
pub mod forest;
pub mod neural;
pub mod sarima;

pub use additive::AdditiveModel;
pub use forest::RandomForestModel;
pub use neural::{NeuralModel, StandardScaler};
pub use sarima::SarimaModel;

/// Model family identifier, used as the comparison-table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ModelKind {
    #[strum(serialize = "Random Forest")]
    RandomForest,
    #[strum(serialize = "Additive Decomposition")]
    AdditiveDecomposition,
    #[strum(serialize = "Seasonal ARIMA")]
    SeasonalArima,
    #[strum(serialize = "Neural Network")]
    NeuralNetwork,
}

impl ModelKind {
    /// Stable lowercase identifier used in chart file names.
    pub fn slug(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::AdditiveDecomposition => "additive",
            ModelKind::SeasonalArima => "sarima",
            ModelKind::NeuralNetwork => "neural",
        }
    }
}

/// Per-epoch loss trace recorded by iterative trainers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LossHistory {
    pub train: Vec<f64>,
    pub validation: Vec<f64>,
}

/// What a fit run reports back to the benchmark.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub kind: ModelKind,
    pub training_samples: usize,
    /// Present only for trainers with an epoch loop.
    pub loss_history: Option<LossHistory>,
}

/// Common seam for the four trainers.
pub trait DemandModel {
    fn kind(&self) -> ModelKind;

    /// Fit on the training partition only.
    fn fit(&mut self, train: &FeatureTable) -> Result<FitReport>;

    /// Predict one value per row of the test partition.
    fn predict(&self, test: &FeatureTable) -> Result<Vec<f64>>;
}
