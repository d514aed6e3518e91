//! Random forest regression on the raw feature matrix.

use anyhow::Result;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::{DemandModel, FitReport, ModelKind};
use crate::data::FeatureTable;

/// Fixed seed so repeated runs produce identical forests.
const FOREST_SEED: u64 = 42;

pub struct RandomForestModel {
    n_trees: usize,
    model: Option<RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
}

impl RandomForestModel {
    pub fn new(n_trees: usize) -> Self {
        Self {
            n_trees,
            model: None,
        }
    }

    fn parameters(&self) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees: self.n_trees,
            m: None,
            keep_samples: false,
            seed: FOREST_SEED,
        }
    }
}

impl DemandModel for RandomForestModel {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
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

        let model = RandomForestRegressor::fit(&x, &train.target, self.parameters())
            .map_err(|e| anyhow::anyhow!("random forest training failed: {:?}", e))?;
        self.model = Some(model);

        Ok(FitReport {
            kind: self.kind(),
            training_samples: train.len(),
            loss_history: None,
        })
    }

    fn predict(&self, test: &FeatureTable) -> Result<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("model not fitted"))?;

        let x = DenseMatrix::new(
            test.len(),
            test.feature_count(),
            test.flat_features(),
            false,
        );

        model
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("random forest prediction failed: {:?}", e))
    }
}
