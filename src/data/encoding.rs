//! Integer encoding for categorical columns.
//!
//! A column whose cells all parse as numbers passes through unchanged.
//! Otherwise the distinct values are sorted and numbered from zero. The
//! encoding is fit once over the full column and shared by every model, so
//! train and test rows can never disagree about a category's code.

use std::collections::BTreeMap;

use super::DataError;

#[derive(Debug, Clone)]
pub struct LabelEncoding {
    /// `None` when the column is already numeric.
    codes: Option<BTreeMap<String, f64>>,
}

impl LabelEncoding {
    /// Fit an encoding over every value in the column.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values: Vec<&str> = values.into_iter().collect();

        if values.iter().all(|v| v.parse::<f64>().is_ok()) {
            return Self { codes: None };
        }

        let mut distinct: Vec<&str> = values.to_vec();
        distinct.sort_unstable();
        distinct.dedup();

        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code as f64))
            .collect();

        Self { codes: Some(codes) }
    }

    /// Encode one cell. Fails only if the value was never seen at fit time.
    pub fn encode(&self, column: &str, value: &str) -> Result<f64, DataError> {
        match &self.codes {
            None => value.parse::<f64>().map_err(|_| DataError::UnknownCategory {
                column: column.to_string(),
                value: value.to_string(),
            }),
            Some(codes) => codes
                .get(value)
                .copied()
                .ok_or_else(|| DataError::UnknownCategory {
                    column: column.to_string(),
                    value: value.to_string(),
                }),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.codes.is_none()
    }
}
