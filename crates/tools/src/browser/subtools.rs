//! Single-purpose browser operations used by [`super::BrowserTool`].

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use proto::ToolError;
use reqwest::Url;
use serde_json::{Value, json};

use super::driver::BrowserDriver;
use super::html;

fn invalid(action: &str, field: &str, reason: impl Into<String>) -> ToolError {
    ToolError::InvalidParameter {
        action: action.to_string(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Navigates to an http(s) URL.
pub struct VisitTool {
    driver: Arc<dyn BrowserDriver>,
}

impl VisitTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    /// Validates `url` and hands it to the driver exactly as given.
    pub async fn execute(&self, url: &str) -> Result<Value, ToolError> {
        let parsed =
            Url::parse(url).map_err(|e| invalid("visit", "url", format!("invalid URL: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(invalid("visit", "url", "only http/https URLs are supported"));
        }
        self.driver.goto(url).await?;
        Ok(json!({ "status": "ok", "url": url }))
    }
}

/// Summarizes the current page, or returns its full HTML.
pub struct PageInspectTool {
    driver: Arc<dyn BrowserDriver>,
}

impl PageInspectTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn execute(&self, full_html: bool) -> Result<Value, ToolError> {
        let page = self.driver.html().await?;
        if full_html {
            return Ok(Value::String(page));
        }
        let title = self.driver.title().await?;
        let url = self.driver.url().await?;
        Ok(Value::String(html::page_summary(&page, &title, &url)))
    }
}

/// Finds elements by visible text.
pub struct UiInspectTool {
    driver: Arc<dyn BrowserDriver>,
}

impl UiInspectTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn execute(
        &self,
        text_content: &str,
        context_size: usize,
    ) -> Result<Value, ToolError> {
        if text_content.trim().is_empty() {
            return Err(invalid("ui_inspect", "text_content", "must not be empty"));
        }
        let page = self.driver.html().await?;
        Ok(Value::String(html::inspect_text(&page, text_content, context_size)))
    }
}

/// Finds elements by CSS selector.
pub struct SelectorInspectTool {
    driver: Arc<dyn BrowserDriver>,
}

impl SelectorInspectTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn execute(&self, selector: &str, context_size: usize) -> Result<Value, ToolError> {
        let page = self.driver.html().await?;
        html::inspect_selector(&page, selector, context_size)
            .map(Value::String)
            .map_err(|reason| invalid("selector_inspect", "selector", reason))
    }
}

pub struct ClickTool {
    driver: Arc<dyn BrowserDriver>,
}

impl ClickTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn execute(&self, selector: &str) -> Result<Value, ToolError> {
        self.driver.click(selector).await?;
        Ok(json!({ "status": "ok", "action": "click", "selector": selector }))
    }
}

pub struct TextFieldSetTool {
    driver: Arc<dyn BrowserDriver>,
}

impl TextFieldSetTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn execute(&self, selector: &str, text: &str) -> Result<Value, ToolError> {
        self.driver.fill_in(selector, text).await?;
        Ok(json!({
            "status": "ok",
            "action": "text_field_set",
            "selector": selector,
            "typed_chars": text.chars().count(),
        }))
    }
}

/// Captures the viewport as a base64 PNG data URI.
pub struct ScreenshotTool {
    driver: Arc<dyn BrowserDriver>,
}

impl ScreenshotTool {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn execute(&self) -> Result<Value, ToolError> {
        let png = self.driver.screenshot().await?;
        let (width, height) = image::load_from_memory(&png)
            .map(|img| (img.width(), img.height()))
            .unwrap_or((0, 0));
        Ok(json!({
            "mime": "image/png",
            "width": width,
            "height": height,
            "size_bytes": png.len(),
            "data_uri": format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&png)),
        }))
    }
}
