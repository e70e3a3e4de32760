//! Screenshot capture on top of a lazily started rendering engine.
//!
//! [`CaptureService`] is the orchestrator-facing surface. It owns an
//! [`EngineHandle`] and adds address validation in front of it; the handle
//! itself tracks the engine lifecycle (unstarted, running, closed) and
//! guarantees at most one engine per run. The default engine is
//! headless Chromium via [`ChromiumLauncher`].

mod chromium;
mod engine;

pub use chromium::ChromiumLauncher;
pub use engine::{EngineHandle, EngineLauncher, EngineSession, EngineState};

use url::Url;

use crate::error::CaptureError;

/// Renders page screenshots, starting the engine on first use.
pub struct CaptureService {
    engine: EngineHandle,
}

impl CaptureService {
    /// Service over the given launcher. The engine is not started yet.
    pub fn new(launcher: Box<dyn EngineLauncher>) -> Self {
        Self {
            engine: EngineHandle::new(launcher),
        }
    }

    /// Starts the engine now rather than on the first capture.
    pub async fn acquire(&mut self) -> Result<(), CaptureError> {
        self.engine.acquire().await
    }

    /// Renders `target` and returns the encoded screenshot bytes.
    ///
    /// The address is validated before the engine is touched, so a malformed
    /// target never forces a launch. Render failures are returned per call
    /// and leave the engine running for the next one.
    pub async fn capture(&mut self, target: &str) -> Result<Vec<u8>, CaptureError> {
        if let Err(e) = Url::parse(target) {
            return Err(CaptureError::InvalidAddress {
                address: target.to_string(),
                reason: e.to_string(),
            });
        }

        tracing::debug!(target, "rendering screenshot");
        let image = self.engine.render(target).await?;
        tracing::debug!(target, bytes = image.len(), "screenshot rendered");
        Ok(image)
    }

    /// Shuts the engine down. Safe to call on a never-started service.
    pub async fn release(&mut self) {
        self.engine.release().await;
    }

    /// Current lifecycle state of the underlying engine.
    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }
}
