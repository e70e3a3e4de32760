//! Ad-hoc capture binary: render one address and write it to `capture.jpg`.
//!
//! No catalog, no bucket. Useful for checking what the engine produces for a
//! given page before queueing it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use snapfill::{CaptureConfig, CaptureService, ChromiumLauncher};

const OUTPUT_PATH: &str = "capture.jpg";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(target) = std::env::args().nth(1) else {
        eprintln!("usage: snapfill-once <url>");
        std::process::exit(2);
    };

    let mut capture =
        CaptureService::new(Box::new(ChromiumLauncher::new(CaptureConfig::default())));

    let result = capture.capture(&target).await;
    capture.release().await;

    match result {
        Ok(image) => {
            if let Err(e) = tokio::fs::write(OUTPUT_PATH, &image).await {
                tracing::error!(error = %e, path = OUTPUT_PATH, "failed to write capture");
                std::process::exit(1);
            }
            tracing::info!(path = OUTPUT_PATH, bytes = image.len(), "capture written");
        }
        Err(e) => {
            tracing::error!(error = %e, target, "capture failed");
            std::process::exit(1);
        }
    }
}
