//! Worker binary: validate configuration, run the orchestrator, exit.
//!
//! Exit code 0 covers every completed run, including runs with per-item
//! failures and runs stopped by the drain ceiling. A non-zero exit means the
//! run itself failed: bad configuration, engine acquisition, or a catalog
//! listing error.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use snapfill::{Config, Orchestrator};

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let mut orchestrator = match Orchestrator::from_config(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "failed to start");
            std::process::exit(1);
        }
    };

    if let Err(e) = orchestrator.run().await {
        tracing::error!(error = %e, "run failed");
        std::process::exit(1);
    }
}
