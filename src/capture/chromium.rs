//! Headless-Chromium implementation of the engine traits.
//!
//! One launched browser serves the whole run. Every render opens a fresh
//! page, so a crashed or wedged target never poisons the next item, and the
//! page is closed no matter how the render went.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::config::CaptureConfig;
use crate::error::CaptureError;

use super::engine::{EngineLauncher, EngineSession};

/// Hardening flags for running Chromium inside containers.
const CHROMIUM_ARGS: [&str; 4] = [
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
];

/// How long shutdown waits for the CDP event loop to drain before aborting it.
const EVENT_LOOP_GRACE: Duration = Duration::from_secs(5);

/// Launches headless-Chromium sessions sized to the configured viewport.
pub struct ChromiumLauncher {
    config: CaptureConfig,
}

impl ChromiumLauncher {
    /// Launcher with the given rendering settings.
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn EngineSession>, CaptureError> {
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(self.config.viewport_width, self.config.viewport_height)
            .viewport(Viewport {
                width: self.config.viewport_width,
                height: self.config.viewport_height,
                ..Viewport::default()
            })
            .args(CHROMIUM_ARGS)
            .build()
            .map_err(CaptureError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::Launch(e.to_string()))?;

        // Drive CDP events until the browser goes away.
        let event_loop = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            event_loop,
            config: self.config.clone(),
        }))
    }
}

/// One live headless-Chromium instance.
pub struct ChromiumSession {
    browser: Browser,
    event_loop: JoinHandle<()>,
    config: CaptureConfig,
}

impl ChromiumSession {
    async fn navigate_and_capture(&self, page: &Page, url: &str) -> Result<Vec<u8>, CaptureError> {
        let navigation = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };
        match tokio::time::timeout(self.config.navigation_timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(CaptureError::Navigation(e.to_string())),
            Err(_) => {
                return Err(CaptureError::NavigationTimeout(
                    self.config.navigation_timeout,
                ));
            }
        }

        // Late-loading scripts and images get a fixed window to settle.
        tokio::time::sleep(self.config.settle_delay).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(self.config.jpeg_quality)
            .full_page(false)
            .build();

        page.screenshot(params)
            .await
            .map_err(|e| CaptureError::Screenshot(e.to_string()))
    }
}

#[async_trait]
impl EngineSession for ChromiumSession {
    async fn render(&mut self, url: &str) -> Result<Vec<u8>, CaptureError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::Context(e.to_string()))?;

        let result = self.navigate_and_capture(&page, url).await;

        // The page is per-render; close it regardless of the outcome.
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close rendering context");
        }

        result
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.browser
            .close()
            .await
            .map_err(|e| CaptureError::Shutdown(e.to_string()))?;

        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "browser process wait failed");
        }

        if tokio::time::timeout(EVENT_LOOP_GRACE, &mut self.event_loop)
            .await
            .is_err()
        {
            self.event_loop.abort();
        }

        Ok(())
    }
}
