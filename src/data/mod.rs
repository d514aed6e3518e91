//! Dataset ingestion and preparation.
//!
//! The loader reads the consumption table once; everything downstream
//! (feature selection, the hold-out split, all four models) works on that
//! single read-only copy.

use chrono::NaiveDate;

pub mod dataset;
pub mod encoding;
pub mod loader;
pub mod selector;

pub use dataset::{ConsumptionRecord, Dataset};
pub use encoding::LabelEncoding;
pub use loader::load_dataset;
pub use selector::{select_features, FeatureTable, FEATURE_COLUMNS, TARGET_COLUMN};

/// Errors raised while loading or partitioning the dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("row {row}: invalid date '{value}' in column '{column}'")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: invalid numeric value '{value}' in column '{column}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("duplicate observation for {0}")]
    DuplicateDay(NaiveDate),

    #[error("dataset has {rows} rows; need more than {holdout} to keep a training remainder")]
    NotEnoughRows { rows: usize, holdout: usize },

    #[error("column '{column}' contains a value '{value}' outside the fitted encoding")]
    UnknownCategory { column: String, value: String },
}
