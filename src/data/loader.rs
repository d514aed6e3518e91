//! CSV ingestion with a strict column contract.
//!
//! Required columns: `Day`, `Unit(Gallon)` (read and discarded),
//! `Unit(Litre)`, `Temperature`, `Humidity`, `Season Factor`, `Holidays`,
//! `Household_size`. A missing column or a malformed cell aborts the load;
//! there is no partial-load recovery.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;

use super::{ConsumptionRecord, DataError, Dataset};

const DAY_COLUMN: &str = "Day";
const GALLON_COLUMN: &str = "Unit(Gallon)";
const LITRE_COLUMN: &str = "Unit(Litre)";

/// Date layouts seen in exports of the source table.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%d-%m-%Y"];

struct ColumnIndices {
    day: usize,
    litre: usize,
    temperature: usize,
    humidity: usize,
    season_factor: usize,
    holidays: usize,
    household_size: usize,
}

/// Load the consumption table from `path`.
///
/// The gallon column must be present (schema check) but its values never
/// reach the dataset; the litre column is the target.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers)?;

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        // Header is line 1; data rows start at line 2.
        let line = idx + 2;

        records.push(ConsumptionRecord {
            day: parse_date(&row, columns.day, DAY_COLUMN, line)?,
            temperature: parse_number(&row, columns.temperature, "Temperature", line)?,
            humidity: parse_number(&row, columns.humidity, "Humidity", line)?,
            season_factor: row.get(columns.season_factor).unwrap_or("").to_string(),
            holidays: row.get(columns.holidays).unwrap_or("").to_string(),
            household_size: parse_number(&row, columns.household_size, "Household_size", line)?,
            consumption_litres: parse_number(&row, columns.litre, LITRE_COLUMN, line)?,
        });
    }

    Dataset::new(records)
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnIndices, DataError> {
    let find = |name: &str| -> Result<usize, DataError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))
    };

    // The gallon column is required by the schema even though it is dropped.
    find(GALLON_COLUMN)?;

    Ok(ColumnIndices {
        day: find(DAY_COLUMN)?,
        litre: find(LITRE_COLUMN)?,
        temperature: find("Temperature")?,
        humidity: find("Humidity")?,
        season_factor: find("Season Factor")?,
        holidays: find("Holidays")?,
        household_size: find("Household_size")?,
    })
}

fn parse_date(
    row: &csv::StringRecord,
    index: usize,
    column: &str,
    line: usize,
) -> Result<NaiveDate, DataError> {
    let raw = row.get(index).unwrap_or("");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| DataError::InvalidDate {
            row: line,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn parse_number(
    row: &csv::StringRecord,
    index: usize,
    column: &str,
    line: usize,
) -> Result<f64, DataError> {
    let raw = row.get(index).unwrap_or("");
    raw.parse::<f64>().map_err(|_| DataError::InvalidNumber {
        row: line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("hydrocast-{}.csv", uuid_suffix()));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn uuid_suffix() -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        format!("{}-{nanos}", std::process::id())
    }

    const HEADER: &str =
        "Day,Unit(Gallon),Unit(Litre),Temperature,Humidity,Season Factor,Holidays,Household_size";

    #[test]
    fn loads_and_sorts_rows() {
        let path = write_temp_csv(&format!(
            "{HEADER}\n\
             2021-01-02,53.0,200.5,21.0,55.0,Summer,0,4\n\
             2021-01-01,26.5,100.2,20.0,60.0,Winter,1,4\n"
        ));

        let dataset = load_dataset(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(dataset.len(), 2);
        assert_eq!(
            dataset.records()[0].day,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
        assert_eq!(dataset.records()[0].consumption_litres, 100.2);
        assert_eq!(dataset.records()[1].season_factor, "Summer");
    }

    #[test]
    fn dropping_gallons_leaves_litres_untouched() {
        // Same litre values, wildly different gallon values: the loaded
        // target must match the litre column exactly.
        let path = write_temp_csv(&format!(
            "{HEADER}\n\
             2021-01-01,999999.0,150.0,20.0,60.0,1,0,4\n\
             2021-01-02,0.0,151.5,21.0,55.0,1,0,4\n"
        ));

        let dataset = load_dataset(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let litres: Vec<f64> = dataset
            .records()
            .iter()
            .map(|r| r.consumption_litres)
            .collect();
        assert_eq!(litres, vec![150.0, 151.5]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let path = write_temp_csv(
            "Day,Unit(Litre),Temperature,Humidity,Season Factor,Holidays,Household_size\n\
             2021-01-01,150.0,20.0,60.0,1,0,4\n",
        );

        let result = load_dataset(&path);
        std::fs::remove_file(&path).ok();

        match result {
            Err(DataError::MissingColumn(name)) => assert_eq!(name, "Unit(Gallon)"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn malformed_date_is_an_error() {
        let path = write_temp_csv(&format!(
            "{HEADER}\n\
             not-a-date,26.5,100.2,20.0,60.0,1,0,4\n"
        ));

        let result = load_dataset(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(DataError::InvalidDate { row: 2, .. })));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let path = write_temp_csv(&format!(
            "{HEADER}\n\
             2021-01-01,26.5,lots,20.0,60.0,1,0,4\n"
        ));

        let result = load_dataset(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            result,
            Err(DataError::InvalidNumber { ref column, .. }) if column == "Unit(Litre)"
        ));
    }
}
