//! Rendering-engine lifecycle: one shared handle with explicit
//! acquire/release semantics.
//!
//! The engine is expensive to start, so a run launches it at most once and
//! shares the instance across every capture. The handle enforces the
//! lifecycle: `Unstarted → Running` happens at most once, `Running → Closed`
//! happens at most once, and `Closed` is terminal within a run.

use async_trait::async_trait;

use crate::error::CaptureError;

/// Launches rendering-engine sessions.
///
/// Production uses the headless-Chromium launcher; tests substitute fakes
/// that count launches.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Start the engine and hand back a live session.
    async fn launch(&self) -> Result<Box<dyn EngineSession>, CaptureError>;
}

/// A running engine instance.
#[async_trait]
pub trait EngineSession: Send {
    /// Render one address to image bytes.
    async fn render(&mut self, url: &str) -> Result<Vec<u8>, CaptureError>;

    /// Shut the engine down. Called exactly once, by
    /// [`EngineHandle::release`]; render paths never call this.
    async fn close(&mut self) -> Result<(), CaptureError>;
}

/// Observable lifecycle state of the shared engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not yet launched.
    Unstarted,
    /// Launched and usable.
    Running,
    /// Released. Terminal: a run never relaunches.
    Closed,
}

enum Slot {
    Unstarted,
    Running(Box<dyn EngineSession>),
    Closed,
}

/// The single shared engine instance for a run.
///
/// The run owner drives [`acquire`](Self::acquire) and
/// [`release`](Self::release); capture code only borrows the running session
/// through [`render`](Self::render).
pub struct EngineHandle {
    launcher: Box<dyn EngineLauncher>,
    slot: Slot,
}

impl EngineHandle {
    /// Handle over the given launcher; nothing is started yet.
    pub fn new(launcher: Box<dyn EngineLauncher>) -> Self {
        Self {
            launcher,
            slot: Slot::Unstarted,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        match self.slot {
            Slot::Unstarted => EngineState::Unstarted,
            Slot::Running(_) => EngineState::Running,
            Slot::Closed => EngineState::Closed,
        }
    }

    /// Ensure the engine is running. Idempotent while the handle is open.
    ///
    /// # Errors
    ///
    /// Fails if the launch fails or the handle was already released.
    pub async fn acquire(&mut self) -> Result<(), CaptureError> {
        if matches!(self.slot, Slot::Closed) {
            return Err(CaptureError::EngineClosed);
        }
        if matches!(self.slot, Slot::Unstarted) {
            tracing::info!("launching rendering engine");
            let session = self.launcher.launch().await?;
            self.slot = Slot::Running(session);
        }
        Ok(())
    }

    /// Render through the running engine, launching it on first use.
    ///
    /// # Errors
    ///
    /// Propagates launch failures, the terminal-closed state, and render
    /// failures.
    pub async fn render(&mut self, url: &str) -> Result<Vec<u8>, CaptureError> {
        self.acquire().await?;
        match &mut self.slot {
            Slot::Running(session) => session.render(url).await,
            // acquire() either left the slot Running or already returned
            _ => Err(CaptureError::EngineClosed),
        }
    }

    /// Release the engine. Idempotent, and safe to call whether or not the
    /// engine ever started. Close failures are logged rather than
    /// propagated so shutdown always completes.
    pub async fn release(&mut self) {
        match std::mem::replace(&mut self.slot, Slot::Closed) {
            Slot::Running(mut session) => {
                if let Err(e) = session.close().await {
                    tracing::warn!(error = %e, "rendering engine shutdown reported an error");
                } else {
                    tracing::info!("rendering engine released");
                }
            }
            Slot::Unstarted | Slot::Closed => {}
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLauncher {
        launches: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    struct CountingSession {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EngineLauncher for CountingLauncher {
        async fn launch(&self) -> Result<Box<dyn EngineSession>, CaptureError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSession {
                closes: self.closes.clone(),
            }))
        }
    }

    #[async_trait]
    impl EngineSession for CountingSession {
        async fn render(&mut self, _url: &str) -> Result<Vec<u8>, CaptureError> {
            Ok(vec![0xFF, 0xD8])
        }

        async fn close(&mut self) -> Result<(), CaptureError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_handle() -> (EngineHandle, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let launches = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(AtomicUsize::new(0));
        let handle = EngineHandle::new(Box::new(CountingLauncher {
            launches: launches.clone(),
            closes: closes.clone(),
        }));
        (handle, launches, closes)
    }

    #[tokio::test]
    async fn new_handle_starts_unstarted_without_launching() {
        let (handle, launches, _) = counting_handle();

        assert_eq!(handle.state(), EngineState::Unstarted);
        assert_eq!(launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn acquire_launches_once_and_is_idempotent() {
        let (mut handle, launches, _) = counting_handle();

        handle.acquire().await.unwrap();
        handle.acquire().await.unwrap();

        assert_eq!(handle.state(), EngineState::Running);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn render_launches_lazily_on_first_use() {
        let (mut handle, launches, _) = counting_handle();

        let image = handle.render("https://example.test").await.unwrap();

        assert_eq!(image, vec![0xFF, 0xD8]);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), EngineState::Running);
    }

    #[tokio::test]
    async fn repeated_renders_share_one_launch() {
        let (mut handle, launches, _) = counting_handle();

        for _ in 0..5 {
            handle.render("https://example.test").await.unwrap();
        }

        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_closes_exactly_once() {
        let (mut handle, _, closes) = counting_handle();

        handle.acquire().await.unwrap();
        handle.release().await;
        handle.release().await;

        assert_eq!(handle.state(), EngineState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn release_without_start_skips_close_but_still_terminates() {
        let (mut handle, _, closes) = counting_handle();

        handle.release().await;

        assert_eq!(handle.state(), EngineState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn closed_handle_is_terminal() {
        let (mut handle, launches, _) = counting_handle();

        handle.acquire().await.unwrap();
        handle.release().await;

        let acquire_err = handle.acquire().await.unwrap_err();
        assert!(matches!(acquire_err, CaptureError::EngineClosed));

        let render_err = handle.render("https://example.test").await.unwrap_err();
        assert!(matches!(render_err, CaptureError::EngineClosed));

        assert_eq!(launches.load(Ordering::SeqCst), 1, "no relaunch after close");
    }

    #[tokio::test]
    async fn launch_failure_leaves_the_handle_unstarted() {
        struct FailingLauncher;

        #[async_trait]
        impl EngineLauncher for FailingLauncher {
            async fn launch(&self) -> Result<Box<dyn EngineSession>, CaptureError> {
                Err(CaptureError::Launch("no chromium binary".into()))
            }
        }

        let mut handle = EngineHandle::new(Box::new(FailingLauncher));

        let err = handle.acquire().await.unwrap_err();

        assert!(matches!(err, CaptureError::Launch(_)));
        assert_eq!(handle.state(), EngineState::Unstarted);
    }
}
