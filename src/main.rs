use anyhow::Result;
use hydrocast::{config::Config, pipeline, telemetry::init_tracing};
use tracing::info;

fn main() -> Result<()> {
    init_tracing();

    let config = Config::load()?;
    let outcome = pipeline::run(&config)?;

    println!("\n{}", outcome.table);
    info!(charts = outcome.charts_written, "benchmark complete");
    Ok(())
}
