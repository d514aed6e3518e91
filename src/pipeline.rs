//! The benchmark pipeline.
//!
//! Loads the dataset once, projects the shared feature table, splits off the
//! trailing hold-out window, then runs the four models in sequence. Each
//! model is fit, asked for hold-out predictions, evaluated, and charted;
//! the run ends with the cross-model comparison chart and table.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::data::{load_dataset, select_features, FeatureTable};
use crate::eval::{correlation_matrix, ComparisonTable, Evaluation, PredictionSeries};
use crate::models::{
    AdditiveModel, DemandModel, ModelKind, NeuralModel, RandomForestModel, SarimaModel,
};
use crate::models::neural::NeuralConfig;
use crate::report::{
    print_model_metrics, ComparisonBarChart, HeatmapChart, LineChart, ReportWriter, ResidualChart,
    ScatterChart, TrainingHistoryChart,
};

pub struct BenchmarkOutcome {
    pub table: ComparisonTable,
    pub charts_written: usize,
}

pub fn run(config: &Config) -> Result<BenchmarkOutcome> {
    let dataset = load_dataset(&config.dataset.path)
        .with_context(|| format!("loading {}", config.dataset.path.display()))?;
    info!(rows = dataset.len(), "dataset loaded");

    let table = select_features(&dataset)?;
    let (train, test) = table.split_tail(config.dataset.holdout_days)?;
    info!(
        train_rows = train.len(),
        test_rows = test.len(),
        "hold-out split"
    );

    // Every model sees the same correlation structure; compute it once.
    let heatmap_matrix = correlation_matrix(&correlation_columns(&table));
    let heatmap_labels: Vec<String> = table
        .feature_names
        .iter()
        .cloned()
        .chain(std::iter::once(crate::data::TARGET_COLUMN.to_string()))
        .collect();

    let writer = ReportWriter::new(&config.report.out_dir);
    info!(run_id = %writer.run_id(), out_dir = %writer.out_dir().display(), "reporting to");

    let mut models: Vec<Box<dyn DemandModel>> = vec![
        Box::new(RandomForestModel::new(config.models.forest_trees)),
        Box::new(AdditiveModel::new()),
        Box::new(SarimaModel::new(config.models.sarima_seasonal_period)),
        Box::new(NeuralModel::new(NeuralConfig {
            epochs: config.models.neural_epochs,
            ..NeuralConfig::default()
        })),
    ];

    let mut comparison = ComparisonTable::new();
    let mut charts_written = 0usize;

    for model in models.iter_mut() {
        let kind = model.kind();
        info!(model = %kind, "fitting");

        let report = model
            .fit(&train)
            .with_context(|| format!("fitting {kind}"))?;
        let predicted = model
            .predict(&test)
            .with_context(|| format!("predicting with {kind}"))?;

        let evaluation = Evaluation::from_predictions(&test.target, &predicted)?;
        info!(model = %kind, %evaluation, "evaluated");
        print_model_metrics(kind, &evaluation);

        let series = PredictionSeries::new(test.days.clone(), test.target.clone(), predicted);
        charts_written += write_model_charts(
            &writer,
            kind,
            &series,
            &heatmap_labels,
            &heatmap_matrix,
            report.loss_history.as_ref(),
        )?;

        comparison.push(kind, evaluation);
    }

    writer.write(
        "model_comparison",
        &ComparisonBarChart::from_table(&comparison),
    )?;
    charts_written += 1;

    Ok(BenchmarkOutcome {
        table: comparison,
        charts_written,
    })
}

fn write_model_charts(
    writer: &ReportWriter,
    kind: ModelKind,
    series: &PredictionSeries,
    heatmap_labels: &[String],
    heatmap_matrix: &[Vec<f64>],
    loss_history: Option<&crate::models::LossHistory>,
) -> Result<usize> {
    let slug = kind.slug();
    let mut written = 0usize;

    writer.write(
        &format!("{slug}_line"),
        &LineChart::from_series(kind, series),
    )?;
    written += 1;

    writer.write(
        &format!("{slug}_scatter"),
        &ScatterChart::from_series(kind, series),
    )?;
    written += 1;

    writer.write(
        &format!("{slug}_residuals"),
        &ResidualChart::from_series(kind, series),
    )?;
    written += 1;

    writer.write(
        &format!("{slug}_heatmap"),
        &HeatmapChart::new(kind, heatmap_labels.to_vec(), heatmap_matrix.to_vec()),
    )?;
    written += 1;

    if let Some(history) = loss_history {
        writer.write(
            &format!("{slug}_training_history"),
            &TrainingHistoryChart::from_history(kind, history),
        )?;
        written += 1;
    }

    Ok(written)
}

/// Feature columns plus the target, in heatmap order.
fn correlation_columns(table: &FeatureTable) -> Vec<(String, Vec<f64>)> {
    let mut columns: Vec<(String, Vec<f64>)> = table
        .feature_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            (
                name.clone(),
                table.rows.iter().map(|row| row[i]).collect::<Vec<f64>>(),
            )
        })
        .collect();
    columns.push((crate::data::TARGET_COLUMN.to_string(), table.target.clone()));
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn correlation_columns_align_with_rows() {
        let table = FeatureTable {
            days: vec![
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            ],
            feature_names: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![1.0, 10.0], vec![2.0, 20.0]],
            target: vec![5.0, 6.0],
        };

        let columns = correlation_columns(&table);
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].1, vec![1.0, 2.0]);
        assert_eq!(columns[1].1, vec![10.0, 20.0]);
        assert_eq!(columns[2].0, crate::data::TARGET_COLUMN);
    }
}
