//! In-memory representation of the consumption table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DataError;

/// One daily observation.
///
/// `season_factor` and `holidays` keep the raw cell text: the source table
/// carries them either as numbers or as category labels, and the encoding
/// decision belongs to the feature selector, not the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub day: NaiveDate,
    pub temperature: f64,
    pub humidity: f64,
    pub season_factor: String,
    pub holidays: String,
    pub household_size: f64,
    pub consumption_litres: f64,
}

/// The full dataset, sorted ascending by day with exactly one record per day.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<ConsumptionRecord>,
}

impl Dataset {
    /// Build a dataset from records in arbitrary order.
    ///
    /// Sorts ascending by day and rejects duplicate days: the models assume
    /// one target value per timestamp.
    pub fn new(mut records: Vec<ConsumptionRecord>) -> Result<Self, DataError> {
        records.sort_by_key(|r| r.day);

        for pair in records.windows(2) {
            if pair[0].day == pair[1].day {
                return Err(DataError::DuplicateDay(pair[0].day));
            }
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[ConsumptionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
