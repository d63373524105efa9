//! Browser facade: page navigation, inspection and interaction.

mod chromium;
mod driver;
mod html;
mod mock;
mod subtools;

pub use chromium::{ChromiumDriver, ChromiumSettings};
pub use driver::{BrowserDriver, LoggingDriver};
pub use mock::MockDriver;
pub use subtools::{
    ClickTool, PageInspectTool, ScreenshotTool, SelectorInspectTool, TextFieldSetTool,
    UiInspectTool, VisitTool,
};

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use proto::{ToolError, ToolResult};
use serde_json::{Value, json};

use crate::{ActionRequest, ActionSet, Tool};

const TOOL_NAME: &str = "browser";
const DEFAULT_CONTEXT_SIZE: u64 = 2;

/// Actions understood by [`BrowserTool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserAction {
    Visit,
    PageInspect,
    UiInspect,
    SelectorInspect,
    Click,
    TextFieldSet,
    Screenshot,
}

impl ActionSet for BrowserAction {
    const ALL: &'static [Self] = &[
        Self::Visit,
        Self::PageInspect,
        Self::UiInspect,
        Self::SelectorInspect,
        Self::Click,
        Self::TextFieldSet,
        Self::Screenshot,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::PageInspect => "page_inspect",
            Self::UiInspect => "ui_inspect",
            Self::SelectorInspect => "selector_inspect",
            Self::Click => "click",
            Self::TextFieldSet => "text_field_set",
            Self::Screenshot => "screenshot",
        }
    }
}

/// Facade routing browser actions to lazily built sub-tools.
///
/// Every sub-tool shares the facade's driver.
pub struct BrowserTool {
    driver: Arc<dyn BrowserDriver>,
    visit: OnceLock<VisitTool>,
    page_inspect: OnceLock<PageInspectTool>,
    ui_inspect: OnceLock<UiInspectTool>,
    selector_inspect: OnceLock<SelectorInspectTool>,
    click: OnceLock<ClickTool>,
    text_field_set: OnceLock<TextFieldSetTool>,
    screenshot: OnceLock<ScreenshotTool>,
}

impl BrowserTool {
    /// Creates a browser tool over a logged Chromium session.
    pub fn new(settings: ChromiumSettings) -> Self {
        Self::with_driver(Arc::new(LoggingDriver::new(ChromiumDriver::new(settings))))
    }

    pub fn with_driver(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            visit: OnceLock::new(),
            page_inspect: OnceLock::new(),
            ui_inspect: OnceLock::new(),
            selector_inspect: OnceLock::new(),
            click: OnceLock::new(),
            text_field_set: OnceLock::new(),
            screenshot: OnceLock::new(),
        }
    }

    fn visit_tool(&self) -> &VisitTool {
        self.visit.get_or_init(|| VisitTool::new(self.driver.clone()))
    }

    fn page_inspect_tool(&self) -> &PageInspectTool {
        self.page_inspect
            .get_or_init(|| PageInspectTool::new(self.driver.clone()))
    }

    fn ui_inspect_tool(&self) -> &UiInspectTool {
        self.ui_inspect
            .get_or_init(|| UiInspectTool::new(self.driver.clone()))
    }

    fn selector_inspect_tool(&self) -> &SelectorInspectTool {
        self.selector_inspect
            .get_or_init(|| SelectorInspectTool::new(self.driver.clone()))
    }

    fn click_tool(&self) -> &ClickTool {
        self.click.get_or_init(|| ClickTool::new(self.driver.clone()))
    }

    fn text_field_set_tool(&self) -> &TextFieldSetTool {
        self.text_field_set
            .get_or_init(|| TextFieldSetTool::new(self.driver.clone()))
    }

    fn screenshot_tool(&self) -> &ScreenshotTool {
        self.screenshot
            .get_or_init(|| ScreenshotTool::new(self.driver.clone()))
    }

    /// Validates and routes one request.
    pub async fn dispatch(&self, request: ActionRequest) -> Result<Value, ToolError> {
        request.log_start(TOOL_NAME);
        let outcome = self.route(&request).await;
        request.log_outcome(TOOL_NAME, &outcome);
        outcome
    }

    async fn route(&self, request: &ActionRequest) -> Result<Value, ToolError> {
        match BrowserAction::parse(TOOL_NAME, request.action())? {
            BrowserAction::Visit => {
                let url = request.require_str("url")?;
                self.visit_tool().execute(url).await
            }
            BrowserAction::PageInspect => {
                let full_html = request.optional_bool("full_html")?.unwrap_or(false);
                self.page_inspect_tool().execute(full_html).await
            }
            BrowserAction::UiInspect => {
                let text = request.require_str("text_content")?;
                let context = context_size(request)?;
                self.ui_inspect_tool().execute(text, context).await
            }
            BrowserAction::SelectorInspect => {
                let selector = request.require_str("selector")?;
                let context = context_size(request)?;
                self.selector_inspect_tool().execute(selector, context).await
            }
            BrowserAction::Click => {
                let selector = request.require_str("selector")?;
                self.click_tool().execute(selector).await
            }
            BrowserAction::TextFieldSet => {
                let selector = request.require_str("selector")?;
                let text = request.require_str("text")?;
                self.text_field_set_tool().execute(selector, text).await
            }
            BrowserAction::Screenshot => self.screenshot_tool().execute().await,
        }
    }

    /// Ends the browser session.
    pub async fn close(&self) -> Result<(), ToolError> {
        self.driver.close().await
    }
}

fn context_size(request: &ActionRequest) -> Result<usize, ToolError> {
    let size = request
        .optional_u64("context_size")?
        .unwrap_or(DEFAULT_CONTEXT_SIZE);
    usize::try_from(size).map_err(|_| request.invalid("context_size", "value is too large"))
}

#[async_trait]
impl Tool for BrowserTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Drive a web browser: visit URLs, summarize or search the current page, \
         click elements, fill text fields and take screenshots."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": BrowserAction::names(),
                    "description": "Operation to perform"
                },
                "url": {
                    "type": "string",
                    "description": "http(s) URL for visit"
                },
                "full_html": {
                    "type": "boolean",
                    "description":
                        "page_inspect: return raw HTML instead of a summary (default: false)"
                },
                "text_content": {
                    "type": "string",
                    "description": "ui_inspect: visible text to look for"
                },
                "selector": {
                    "type": "string",
                    "description": "CSS selector for selector_inspect, click and text_field_set"
                },
                "context_size": {
                    "type": "integer",
                    "description": "Ancestor levels shown around inspected elements (default: 2)"
                },
                "text": {
                    "type": "string",
                    "description": "text_field_set: value to enter"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, call_id: &str, args: Value) -> ToolResult {
        let outcome = match ActionRequest::from_args(args, None) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(e),
        };
        ToolResult::from_outcome(call_id, self.name(), outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Login</title></head><body>
        <form id="login"><label>User <input id="user" name="user"></label>
        <button id="go">Sign in</button></form></body></html>"#;

    fn mock_tool() -> (Arc<MockDriver>, BrowserTool) {
        let driver = Arc::new(MockDriver::new().with_html(PAGE));
        (driver.clone(), BrowserTool::with_driver(driver))
    }

    #[tokio::test]
    async fn visit_records_exactly_one_goto() {
        let (driver, tool) = mock_tool();
        let value = tool
            .dispatch(ActionRequest::new("visit").with("url", "https://x.test"))
            .await
            .expect("visit");
        assert_eq!(value["url"], "https://x.test");
        assert_eq!(driver.calls(), vec!["goto https://x.test"]);
    }

    #[tokio::test]
    async fn page_inspect_summarizes_by_default() {
        let (driver, tool) = mock_tool();
        let summary = tool
            .dispatch(ActionRequest::new("page_inspect"))
            .await
            .expect("inspect");
        let summary = summary.as_str().unwrap();
        assert!(summary.starts_with("Title: Login\nURL: about:blank"));
        assert!(summary.contains("Sign in"));
        assert_eq!(driver.calls(), vec!["html", "title", "url"]);
    }

    #[tokio::test]
    async fn ui_inspect_uses_default_context() {
        let (_driver, tool) = mock_tool();
        let found = tool
            .dispatch(ActionRequest::new("ui_inspect").with("text_content", "sign in"))
            .await
            .expect("inspect");
        assert_eq!(
            found,
            json!("Match 1:\n<body>\n  <form id=\"login\">\n    <button id=\"go\"> \"Sign in\"")
        );
    }

    #[tokio::test]
    async fn interactions_reach_driver_with_parameters() {
        let (driver, tool) = mock_tool();
        tool.dispatch(
            ActionRequest::new("text_field_set")
                .with("selector", "#user")
                .with("text", "ada"),
        )
        .await
        .expect("fill");
        tool.dispatch(ActionRequest::new("click").with("selector", "#go"))
            .await
            .expect("click");
        assert_eq!(driver.calls(), vec!["fill_in #user ada", "click #go"]);
    }

    #[tokio::test]
    async fn missing_selector_never_reaches_driver() {
        let (driver, tool) = mock_tool();
        let err = tool
            .dispatch(ActionRequest::new("text_field_set").with("text", "ada"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'selector' for action 'text_field_set'"
        );
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn sub_tools_are_built_once() {
        let (_driver, tool) = mock_tool();
        let first: *const VisitTool = tool.visit_tool();
        let second: *const VisitTool = tool.visit_tool();
        assert_eq!(first, second);
        assert!(tool.click.get().is_none());
    }

    #[tokio::test]
    async fn execute_reports_unknown_action() {
        let (_driver, tool) = mock_tool();
        let result = tool.execute("c9", json!({"action": "scroll"})).await;
        assert!(result.is_error);
        assert_eq!(result.call_id, "c9");
        assert!(result.output.contains("Unsupported action 'scroll' for tool 'browser'"));
    }

    #[tokio::test]
    async fn close_is_forwarded_once() {
        let (driver, tool) = mock_tool();
        tool.close().await.unwrap();
        tool.close().await.unwrap();
        assert_eq!(driver.calls(), vec!["close"]);
    }
}
