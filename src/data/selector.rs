//! Feature/target projection.
//!
//! Fixes the feature list and target used by all four models and turns the
//! loaded records into a numeric table. Categorical columns are integer
//! encoded via [`LabelEncoding`]; numeric columns pass through.

use chrono::NaiveDate;

use super::{DataError, Dataset, LabelEncoding};

pub const FEATURE_COLUMNS: [&str; 5] = [
    "Temperature",
    "Humidity",
    "Season Factor",
    "Holidays",
    "Household_size",
];

pub const TARGET_COLUMN: &str = "Unit(Litre)";

/// Numeric view of the dataset: one feature row and one target value per day.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub days: Vec<NaiveDate>,
    pub feature_names: Vec<String>,
    /// Row-major feature matrix, aligned with `days` and `target`.
    pub rows: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split off the trailing `holdout` rows as the test partition.
    ///
    /// Every test day is strictly after every training day; there is no
    /// overlap and no gap. Fails unless at least one training row remains.
    pub fn split_tail(&self, holdout: usize) -> Result<(FeatureTable, FeatureTable), DataError> {
        if self.len() <= holdout {
            return Err(DataError::NotEnoughRows {
                rows: self.len(),
                holdout,
            });
        }

        let pivot = self.len() - holdout;
        let slice = |range: std::ops::Range<usize>| FeatureTable {
            days: self.days[range.clone()].to_vec(),
            feature_names: self.feature_names.clone(),
            rows: self.rows[range.clone()].to_vec(),
            target: self.target[range].to_vec(),
        };

        Ok((slice(0..pivot), slice(pivot..self.len())))
    }

    /// Flatten the feature matrix row-major, for dense-matrix construction.
    pub fn flat_features(&self) -> Vec<f64> {
        self.rows.iter().flatten().copied().collect()
    }

    pub fn feature_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

/// Project the fixed feature columns and the litre target out of `dataset`.
///
/// One label encoding per categorical column, fit over the full column, so
/// all models and both partitions see identical codes.
pub fn select_features(dataset: &Dataset) -> Result<FeatureTable, DataError> {
    let records = dataset.records();

    let season_encoding = LabelEncoding::fit(records.iter().map(|r| r.season_factor.as_str()));
    let holiday_encoding = LabelEncoding::fit(records.iter().map(|r| r.holidays.as_str()));

    let mut days = Vec::with_capacity(records.len());
    let mut rows = Vec::with_capacity(records.len());
    let mut target = Vec::with_capacity(records.len());

    for record in records {
        days.push(record.day);
        rows.push(vec![
            record.temperature,
            record.humidity,
            season_encoding.encode("Season Factor", &record.season_factor)?,
            holiday_encoding.encode("Holidays", &record.holidays)?,
            record.household_size,
        ]);
        target.push(record.consumption_litres);
    }

    Ok(FeatureTable {
        days,
        feature_names: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        target,
    })
}
