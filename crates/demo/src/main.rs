//! Demo entry point.

use saga_demo::{Config, LogFormat};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), saga_demo::DemoError> {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env()?;
    init_tracing(&config);

    // 2. Pick a seed so the run can be reproduced
    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, "starting saga demo");

    // 3. Choreography
    let report = saga_demo::run_choreography(&config, seed).await?;
    tracing::info!(
        order_id = %report.order_id,
        outcome = ?report.outcome,
        summary = %serde_json::to_string(&report).unwrap_or_default(),
        "choreographed order finished"
    );

    // 4. Orchestration
    let report = saga_demo::run_orchestration(&config, seed)?;
    let (order_id, status) = (report.order_id, report.status);
    if report.run.succeeded() {
        tracing::info!(%order_id, %status, "order processed successfully");
    } else {
        let failed_step = report.run.failed_step;
        tracing::warn!(%order_id, %status, ?failed_step, "order processing failed");
    }
    tracing::info!(
        summary = %serde_json::to_string(&report).unwrap_or_default(),
        "orchestrated order finished"
    );

    Ok(())
}
