//! End-to-end pipeline tests on synthetic datasets.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use uuid::Uuid;

use hydrocast::config::{Config, DatasetConfig, ModelsConfig, ReportConfig};
use hydrocast::data::{load_dataset, select_features};
use hydrocast::eval::Evaluation;
use hydrocast::models::{DemandModel, RandomForestModel};
use hydrocast::pipeline;

const HEADER: &str =
    "Day,Unit(Gallon),Unit(Litre),Temperature,Humidity,Season Factor,Holidays,Household_size";

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hydrocast-{label}-{}", Uuid::new_v4()))
}

fn season_for_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Winter",
        3 | 4 | 5 => "Spring",
        6 | 7 | 8 => "Summer",
        _ => "Autumn",
    }
}

/// A noiseless dataset where consumption is linear in temperature.
fn write_linear_csv(rows: usize) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut csv = String::from(HEADER);
    csv.push('\n');

    for i in 0..rows {
        let day = start + chrono::Duration::days(i as i64);
        let temperature = (i % 10) as f64;
        let litres = 3.0 * temperature + 50.0;
        let gallons = litres * 0.264172;
        csv.push_str(&format!(
            "{day},{gallons:.4},{litres:.4},{temperature:.1},60.0,{},0,4\n",
            season_for_month(chrono::Datelike::month(&day)),
        ));
    }

    let path = temp_path("linear").with_extension("csv");
    fs::write(&path, csv).unwrap();
    path
}

/// A richer seasonal dataset exercising all feature columns.
fn write_seasonal_csv(rows: usize) -> PathBuf {
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
    let mut csv = String::from(HEADER);
    csv.push('\n');

    for i in 0..rows {
        let day = start + chrono::Duration::days(i as i64);
        let month = chrono::Datelike::month(&day);
        let temperature = 18.0 + 10.0 * (i as f64 * std::f64::consts::TAU / 365.0).sin();
        let humidity = 55.0 + 15.0 * (i as f64 * std::f64::consts::TAU / 30.0).cos();
        let holiday = u64::from(i % 13 == 0);
        let household = 3 + (i / 200) % 3;
        let wobble = ((i * 7 + 3) % 11) as f64 - 5.0;
        let litres = 150.0
            + 2.0 * temperature
            + 0.4 * humidity
            + 12.0 * holiday as f64
            + 5.0 * household as f64
            + wobble;
        let gallons = litres * 0.264172;
        csv.push_str(&format!(
            "{day},{gallons:.4},{litres:.4},{temperature:.3},{humidity:.3},{},{holiday},{household}\n",
            season_for_month(month),
        ));
    }

    let path = temp_path("seasonal").with_extension("csv");
    fs::write(&path, csv).unwrap();
    path
}

#[test]
fn forest_explains_a_noiseless_linear_dataset() {
    let csv_path = write_linear_csv(400);

    let dataset = load_dataset(&csv_path).unwrap();
    let table = select_features(&dataset).unwrap();
    let (train, test) = table.split_tail(365).unwrap();
    assert_eq!(train.len(), 35);
    assert_eq!(test.len(), 365);

    let mut model = RandomForestModel::new(100);
    model.fit(&train).unwrap();
    let predicted = model.predict(&test).unwrap();

    let eval = Evaluation::from_predictions(&test.target, &predicted).unwrap();
    assert!(eval.r2 > 0.95, "R² was {}", eval.r2);

    fs::remove_file(&csv_path).ok();
}

#[test]
fn full_benchmark_runs_all_four_models() {
    let csv_path = write_seasonal_csv(800);
    let out_dir = temp_path("reports");

    let config = Config {
        dataset: DatasetConfig {
            path: csv_path.clone(),
            holdout_days: 365,
        },
        report: ReportConfig {
            out_dir: out_dir.clone(),
        },
        models: ModelsConfig {
            forest_trees: 40,
            neural_epochs: 25,
            sarima_seasonal_period: 12,
        },
    };

    let outcome = pipeline::run(&config).unwrap();

    let rows = outcome.table.rows();
    assert_eq!(rows.len(), 4, "all four models must be evaluated");
    for (_, eval) in rows {
        assert!((eval.rmse - eval.mse.sqrt()).abs() < 1e-12);
        assert_eq!(eval.accuracy_pct, 100.0 * eval.r2);
        assert!(eval.mse.is_finite());
    }

    // 4 charts per model, plus the neural training history, plus the
    // cross-model comparison.
    assert_eq!(outcome.charts_written, 18);
    assert!(out_dir.join("model_comparison.json").exists());
    assert!(out_dir.join("random_forest_line.json").exists());
    assert!(out_dir.join("additive_scatter.json").exists());
    assert!(out_dir.join("sarima_residuals.json").exists());
    assert!(out_dir.join("neural_training_history.json").exists());

    fs::remove_file(&csv_path).ok();
    fs::remove_dir_all(&out_dir).ok();
}

#[test]
fn gallon_column_never_reaches_the_target() {
    // Two files identical except for absurd gallon values: the loaded
    // targets must match exactly.
    let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    let mut normal = String::from(HEADER);
    normal.push('\n');
    let mut corrupted = normal.clone();

    for i in 0..10u32 {
        let day = start + chrono::Duration::days(i as i64);
        let litres = 100.0 + i as f64;
        normal.push_str(&format!("{day},{:.2},{litres:.2},20.0,60.0,1,0,4\n", litres * 0.264172));
        corrupted.push_str(&format!("{day},{:.2},{litres:.2},20.0,60.0,1,0,4\n", -9e9));
    }

    let normal_path = temp_path("gallons-a").with_extension("csv");
    let corrupted_path = temp_path("gallons-b").with_extension("csv");
    fs::write(&normal_path, normal).unwrap();
    fs::write(&corrupted_path, corrupted).unwrap();

    let a = load_dataset(&normal_path).unwrap();
    let b = load_dataset(&corrupted_path).unwrap();

    let litres = |d: &hydrocast::data::Dataset| -> Vec<f64> {
        d.records().iter().map(|r| r.consumption_litres).collect()
    };
    assert_eq!(litres(&a), litres(&b));

    fs::remove_file(&normal_path).ok();
    fs::remove_file(&corrupted_path).ok();
}
