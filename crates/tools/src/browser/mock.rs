//! Scripted browser driver for tests.

use std::io::Cursor;

use async_trait::async_trait;
use image::ImageFormat;
use parking_lot::Mutex;
use proto::ToolError;

use super::driver::BrowserDriver;

const BLANK_PAGE: &str = "<html><head><title></title></head><body></body></html>";

/// Driver serving a fixed HTML document and recording every call.
pub struct MockDriver {
    html: Mutex<String>,
    url: Mutex<String>,
    calls: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            html: Mutex::new(BLANK_PAGE.to_string()),
            url: Mutex::new("about:blank".to_string()),
            calls: Mutex::default(),
            closed: Mutex::new(false),
        }
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` as the current page.
    pub fn with_html(self, html: impl Into<String>) -> Self {
        *self.html.lock() = html.into();
        self
    }

    /// Calls received so far, formatted as `"method arg1 arg2"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

fn title_of(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    scraper::Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|title| title.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn goto(&self, url: &str) -> Result<(), ToolError> {
        self.record(format!("goto {url}"));
        *self.url.lock() = url.to_string();
        Ok(())
    }

    async fn html(&self) -> Result<String, ToolError> {
        self.record("html".to_string());
        Ok(self.html.lock().clone())
    }

    async fn title(&self) -> Result<String, ToolError> {
        self.record("title".to_string());
        Ok(title_of(&self.html.lock()))
    }

    async fn url(&self) -> Result<String, ToolError> {
        self.record("url".to_string());
        Ok(self.url.lock().clone())
    }

    async fn click(&self, selector: &str) -> Result<(), ToolError> {
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn fill_in(&self, selector: &str, text: &str) -> Result<(), ToolError> {
        self.record(format!("fill_in {selector} {text}"));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ToolError> {
        self.record("screenshot".to_string());
        let mut png = Vec::new();
        image::DynamicImage::new_rgb8(4, 3)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to encode PNG: {e}")))?;
        Ok(png)
    }

    async fn close(&self) -> Result<(), ToolError> {
        let mut closed = self.closed.lock();
        if !*closed {
            self.record("close".to_string());
            *closed = true;
        }
        Ok(())
    }
}
