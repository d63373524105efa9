//! Chromium driver speaking CDP through chromiumoxide.

use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use futures_util::StreamExt;
use proto::ToolError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use super::driver::BrowserDriver;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const MAX_TIMEOUT_SECS: u64 = 60;

/// Launch options for [`ChromiumDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromiumSettings {
    pub headless: bool,
    /// Per-operation timeout, clamped to 1..=60 seconds.
    pub timeout_secs: u64,
    /// Browser executable; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
}

impl Default for ChromiumSettings {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chrome_path: None,
        }
    }
}

impl ChromiumSettings {
    fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }
}

struct BrowserState {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserState {
    fn new() -> Self {
        Self {
            browser: None,
            page: None,
            handler_task: None,
        }
    }

    async fn ensure_ready(&mut self, settings: &ChromiumSettings) -> Result<Page, ToolError> {
        if self.browser.is_none() {
            self.launch(settings).await?;
        }

        if self.page.is_none() {
            let browser = self
                .browser
                .as_mut()
                .ok_or_else(|| {
                    ToolError::ExecutionFailed("Browser is not initialized".to_string())
                })?;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| cdp_failure("Failed to create page", e))?;
            self.page = Some(page);
        }

        self.page
            .clone()
            .ok_or_else(|| {
                ToolError::ExecutionFailed("Browser page is not initialized".to_string())
            })
    }

    async fn launch(&mut self, settings: &ChromiumSettings) -> Result<(), ToolError> {
        let mut builder = BrowserConfig::builder();
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| cdp_failure("Failed to build browser config", e))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            ToolError::MissingDependency(format!(
                "Chrome/Chromium could not be launched ({e}); install it or set browser.chrome_path"
            ))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!(headless = settings.headless, "Chromium session launched");
        self.browser = Some(browser);
        self.handler_task = Some(handler_task);
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.page = None;
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Failed to close Chromium cleanly");
            }
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "Failed to reap Chromium process");
            }
        }
        if let Some(handle) = self.handler_task.take() {
            handle.abort();
        }
    }
}

impl Drop for BrowserState {
    fn drop(&mut self) {
        if let Some(handle) = self.handler_task.take() {
            handle.abort();
        }
    }
}

fn cdp_failure(context: &str, e: impl Display) -> ToolError {
    ToolError::ExecutionFailed(format!("{context}: {e}"))
}

/// Driver owning one lazily launched Chromium session.
///
/// Session access is serialized; the browser starts on first use.
pub struct ChromiumDriver {
    settings: ChromiumSettings,
    state: Mutex<BrowserState>,
}

impl ChromiumDriver {
    pub fn new(settings: ChromiumSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(BrowserState::new()),
        }
    }

    pub fn settings(&self) -> &ChromiumSettings {
        &self.settings
    }

    async fn page(&self) -> Result<Page, ToolError> {
        self.state.lock().await.ensure_ready(&self.settings).await
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, ToolError>>,
    ) -> Result<T, ToolError> {
        let limit = self.settings.operation_timeout();
        timeout(limit, operation)
            .await
            .map_err(|_| ToolError::Timeout(limit.as_secs()))?
    }
}

impl Default for ChromiumDriver {
    fn default() -> Self {
        Self::new(ChromiumSettings::default())
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> Result<(), ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            page.goto(url)
                .await
                .map_err(|e| cdp_failure("Navigation failed", e))?;
            Ok(())
        })
        .await
    }

    async fn html(&self) -> Result<String, ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            page.content()
                .await
                .map_err(|e| cdp_failure("Failed to read page HTML", e))
        })
        .await
    }

    async fn title(&self) -> Result<String, ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            Ok(page
                .get_title()
                .await
                .map_err(|e| cdp_failure("Failed to read page title", e))?
                .unwrap_or_default())
        })
        .await
    }

    async fn url(&self) -> Result<String, ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            Ok(page
                .url()
                .await
                .map_err(|e| cdp_failure("Failed to read page URL", e))?
                .unwrap_or_default())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<(), ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            let element = page
                .find_element(selector)
                .await
                .map_err(|e| cdp_failure(&format!("Failed to find element '{selector}'"), e))?;
            element
                .click()
                .await
                .map_err(|e| cdp_failure(&format!("Failed to click element '{selector}'"), e))?;
            Ok(())
        })
        .await
    }

    async fn fill_in(&self, selector: &str, text: &str) -> Result<(), ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            let element = page
                .find_element(selector)
                .await
                .map_err(|e| cdp_failure(&format!("Failed to find element '{selector}'"), e))?;
            element
                .call_js_fn("function() { this.value = ''; }", false)
                .await
                .map_err(|e| cdp_failure(&format!("Failed to clear element '{selector}'"), e))?;
            element
                .click()
                .await
                .map_err(|e| cdp_failure(&format!("Failed to focus element '{selector}'"), e))?
                .type_str(text)
                .await
                .map_err(|e| cdp_failure(&format!("Failed to type into element '{selector}'"), e))?;
            Ok(())
        })
        .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ToolError> {
        self.bounded(async {
            let page = self.page().await?;
            page.screenshot(ScreenshotParams::builder().full_page(false).build())
                .await
                .map_err(|e| cdp_failure("Failed to capture screenshot", e))
        })
        .await
    }

    async fn close(&self) -> Result<(), ToolError> {
        self.state.lock().await.shutdown().await;
        Ok(())
    }
}
