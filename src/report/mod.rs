//! Chart emission and console reporting.
//!
//! Charts are written as one JSON payload per file under the configured
//! report directory; metrics are printed to the console. Nothing here feeds
//! back into the pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::eval::Evaluation;
use crate::models::ModelKind;

pub mod charts;

pub use charts::{
    ComparisonBarChart, HeatmapChart, LineChart, ResidualChart, ScatterChart,
    TrainingHistoryChart,
};

pub struct ReportWriter {
    out_dir: PathBuf,
    run_id: Uuid,
}

/// Envelope adding the run id to every chart file.
#[derive(Serialize)]
struct ChartEnvelope<'a, T: Serialize> {
    run_id: Uuid,
    chart: &'a T,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Serialize one chart payload to `<out_dir>/<name>.json`.
    pub fn write(&self, name: &str, chart: &impl Serialize) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating report directory {}", self.out_dir.display()))?;

        let path = self.out_dir.join(format!("{name}.json"));
        let envelope = ChartEnvelope {
            run_id: self.run_id,
            chart,
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(&path, json).with_context(|| format!("writing chart {}", path.display()))?;

        info!(chart = name, path = %path.display(), "chart written");
        Ok(path)
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

/// Console block for one model, printed as each run completes.
pub fn print_model_metrics(kind: ModelKind, eval: &Evaluation) {
    println!("\n{kind} performance:");
    println!("  Mean Squared Error (MSE): {:.2}", eval.mse);
    println!("  Root Mean Squared Error (RMSE): {:.2}", eval.rmse);
    println!("  R² Score: {:.4}", eval.r2);
    println!("  Accuracy: {:.2}%", eval.accuracy_pct);
}
