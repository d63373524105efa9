use async_trait::async_trait;
use proto::ToolError;
use tracing::{debug, info, warn};

use crate::short_type_name;

/// Browser capability set.
///
/// Every method fails with [`ToolError::NotImplemented`] unless the driver
/// overrides it.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Name reported in errors and logs.
    fn driver_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Navigates the current page to `url`.
    async fn goto(&self, _url: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "goto"))
    }

    /// Serialized HTML of the current page.
    async fn html(&self) -> Result<String, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "html"))
    }

    async fn title(&self) -> Result<String, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "title"))
    }

    async fn url(&self) -> Result<String, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "url"))
    }

    /// Clicks the first element matching a CSS selector.
    async fn click(&self, _selector: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "click"))
    }

    /// Replaces the value of the text field matching a CSS selector.
    async fn fill_in(&self, _selector: &str, _text: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "fill_in"))
    }

    /// PNG screenshot of the visible viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "screenshot"))
    }

    /// Releases the browser session. Calling it twice is a no-op.
    async fn close(&self) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "close"))
    }
}

/// Decorator that logs every call before forwarding it to the wrapped driver.
pub struct LoggingDriver<D> {
    inner: D,
}

impl<D: BrowserDriver> LoggingDriver<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    /// The wrapped driver.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn finish<T>(&self, method: &str, outcome: Result<T, ToolError>) -> Result<T, ToolError> {
        let driver = self.inner.driver_name();
        match &outcome {
            Ok(_) => debug!(driver, method, "Browser call completed"),
            Err(e) => warn!(driver, method, error = %e, "Browser call failed"),
        }
        outcome
    }
}

#[async_trait]
impl<D: BrowserDriver> BrowserDriver for LoggingDriver<D> {
    fn driver_name(&self) -> &'static str {
        self.inner.driver_name()
    }

    async fn goto(&self, url: &str) -> Result<(), ToolError> {
        info!(driver = self.inner.driver_name(), url, "goto");
        self.finish("goto", self.inner.goto(url).await)
    }

    async fn html(&self) -> Result<String, ToolError> {
        info!(driver = self.inner.driver_name(), "html");
        self.finish("html", self.inner.html().await)
    }

    async fn title(&self) -> Result<String, ToolError> {
        info!(driver = self.inner.driver_name(), "title");
        self.finish("title", self.inner.title().await)
    }

    async fn url(&self) -> Result<String, ToolError> {
        info!(driver = self.inner.driver_name(), "url");
        self.finish("url", self.inner.url().await)
    }

    async fn click(&self, selector: &str) -> Result<(), ToolError> {
        info!(driver = self.inner.driver_name(), selector, "click");
        self.finish("click", self.inner.click(selector).await)
    }

    async fn fill_in(&self, selector: &str, text: &str) -> Result<(), ToolError> {
        info!(
            driver = self.inner.driver_name(),
            selector,
            chars = text.chars().count(),
            "fill_in"
        );
        self.finish("fill_in", self.inner.fill_in(selector, text).await)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ToolError> {
        info!(driver = self.inner.driver_name(), "screenshot");
        self.finish("screenshot", self.inner.screenshot().await)
    }

    async fn close(&self) -> Result<(), ToolError> {
        info!(driver = self.inner.driver_name(), "close");
        self.finish("close", self.inner.close().await)
    }
}
