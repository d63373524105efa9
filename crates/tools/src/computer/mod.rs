//! Computer facade: mouse, keyboard and scroll input on the local desktop.

mod driver;
mod mock;
mod xdotool;

pub use driver::{ComputerDriver, Coordinate, MouseButton, ScrollDirection};
pub use mock::MockDriver;
pub use xdotool::XdotoolDriver;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proto::{ToolError, ToolResult};
use serde_json::{Value, json};

use crate::{ActionRequest, ActionSet, Tool};

const TOOL_NAME: &str = "computer";
const DEFAULT_WAIT_SECS: f64 = 1.0;
const MAX_CLICKS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputerAction {
    MouseClick,
    MouseMove,
    MousePosition,
    MouseDown,
    MouseUp,
    MouseDrag,
    Type,
    Key,
    HoldKey,
    Scroll,
    Wait,
}

impl ActionSet for ComputerAction {
    const ALL: &'static [Self] = &[
        Self::MouseClick,
        Self::MouseMove,
        Self::MousePosition,
        Self::MouseDown,
        Self::MouseUp,
        Self::MouseDrag,
        Self::Type,
        Self::Key,
        Self::HoldKey,
        Self::Scroll,
        Self::Wait,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::MouseClick => "mouse_click",
            Self::MouseMove => "mouse_move",
            Self::MousePosition => "mouse_position",
            Self::MouseDown => "mouse_down",
            Self::MouseUp => "mouse_up",
            Self::MouseDrag => "mouse_drag",
            Self::Type => "type",
            Self::Key => "key",
            Self::HoldKey => "hold_key",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
        }
    }
}

/// Facade driving desktop input through a [`ComputerDriver`].
pub struct ComputerTool {
    driver: Arc<dyn ComputerDriver>,
}

impl ComputerTool {
    /// Creates a computer tool that runs `xdotool` from `program`.
    pub fn new(program: impl Into<std::path::PathBuf>) -> Self {
        Self::with_driver(Arc::new(XdotoolDriver::new(program)))
    }

    pub fn with_driver(driver: Arc<dyn ComputerDriver>) -> Self {
        Self { driver }
    }

    /// Validates and routes one request.
    pub async fn dispatch(&self, request: ActionRequest) -> Result<Value, ToolError> {
        request.log_start(TOOL_NAME);
        let outcome = self.route(&request).await;
        request.log_outcome(TOOL_NAME, &outcome);
        outcome
    }

    async fn route(&self, request: &ActionRequest) -> Result<Value, ToolError> {
        match ComputerAction::parse(TOOL_NAME, request.action())? {
            ComputerAction::MouseClick => {
                let at = parse_coordinate(request)?;
                let button = parse_button(request)?;
                let clicks = request.optional_u64("num_clicks")?.unwrap_or(1);
                if !(1..=MAX_CLICKS).contains(&clicks) {
                    return Err(request.invalid(
                        "num_clicks",
                        format!("must be between 1 and {MAX_CLICKS}"),
                    ));
                }
                self.driver.mouse_click(at, button, clicks as u32).await?;
                Ok(json!(format!(
                    "Clicked {} button {clicks} time(s) at ({}, {})",
                    button.as_str(),
                    at.x,
                    at.y
                )))
            }
            ComputerAction::MouseMove => {
                let at = parse_coordinate(request)?;
                self.driver.mouse_move(at).await?;
                Ok(json!(format!("Moved mouse to ({}, {})", at.x, at.y)))
            }
            ComputerAction::MousePosition => {
                let at = self.driver.mouse_position().await?;
                Ok(json!({ "x": at.x, "y": at.y }))
            }
            ComputerAction::MouseDown => {
                let button = parse_button(request)?;
                self.driver.mouse_down(button).await?;
                Ok(json!(format!("Pressed {} button", button.as_str())))
            }
            ComputerAction::MouseUp => {
                let button = parse_button(request)?;
                self.driver.mouse_up(button).await?;
                Ok(json!(format!("Released {} button", button.as_str())))
            }
            ComputerAction::MouseDrag => {
                let at = parse_coordinate(request)?;
                let button = parse_button(request)?;
                self.driver.mouse_drag(at, button).await?;
                Ok(json!(format!(
                    "Dragged with {} button to ({}, {})",
                    button.as_str(),
                    at.x,
                    at.y
                )))
            }
            ComputerAction::Type => {
                let text = request.require_str("text")?;
                self.driver.type_text(text).await?;
                Ok(json!(format!("Typed {} character(s)", text.chars().count())))
            }
            ComputerAction::Key => {
                let combo = key_combo(request)?;
                self.driver.key_press(combo).await?;
                Ok(json!(format!("Pressed {combo}")))
            }
            ComputerAction::HoldKey => {
                let combo = key_combo(request)?;
                let secs = request.require_seconds("duration")?;
                self.driver
                    .hold_key(combo, to_duration(request, secs)?)
                    .await?;
                Ok(json!(format!("Held {combo} for {secs}s")))
            }
            ComputerAction::Scroll => {
                let raw = request.require_str("scroll_direction")?;
                let direction = ScrollDirection::from_name(raw).ok_or_else(|| {
                    request.invalid(
                        "scroll_direction",
                        format!("expected one of {}", ScrollDirection::NAMES.join(", ")),
                    )
                })?;
                let amount = request.require_u64("scroll_amount")?;
                let amount = u32::try_from(amount)
                    .ok()
                    .filter(|a| *a > 0)
                    .ok_or_else(|| request.invalid("scroll_amount", "must be a positive integer"))?;
                self.driver.scroll(direction, amount).await?;
                Ok(json!(format!("Scrolled {} by {amount}", direction.as_str())))
            }
            ComputerAction::Wait => {
                let secs = request
                    .optional_seconds("duration")?
                    .unwrap_or(DEFAULT_WAIT_SECS);
                self.driver.wait(to_duration(request, secs)?).await?;
                Ok(json!(format!("Waited {secs}s")))
            }
        }
    }
}

fn parse_coordinate(request: &ActionRequest) -> Result<Coordinate, ToolError> {
    let (x, y) = request.require_coordinate("coordinate")?;
    Ok(Coordinate::new(x, y))
}

fn parse_button(request: &ActionRequest) -> Result<MouseButton, ToolError> {
    match request.optional_str("button")? {
        None => Ok(MouseButton::Left),
        Some(name) => MouseButton::from_name(name).ok_or_else(|| {
            request.invalid(
                "button",
                format!("expected one of {}", MouseButton::NAMES.join(", ")),
            )
        }),
    }
}

fn to_duration(request: &ActionRequest, secs: f64) -> Result<Duration, ToolError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| request.invalid("duration", "value is out of range"))
}

fn key_combo(request: &ActionRequest) -> Result<&str, ToolError> {
    let combo = request.require_str("text")?;
    if combo.trim().is_empty() {
        return Err(request.invalid("text", "must name a key"));
    }
    Ok(combo)
}

#[async_trait]
impl Tool for ComputerTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Control the desktop: move and click the mouse, drag, type text, press \
         key combinations, scroll and wait."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ComputerAction::names(),
                    "description": "Operation to perform"
                },
                "coordinate": {
                    "type": "object",
                    "properties": {
                        "x": { "type": "integer" },
                        "y": { "type": "integer" }
                    },
                    "required": ["x", "y"],
                    "description": "Screen position in pixels"
                },
                "button": {
                    "type": "string",
                    "enum": MouseButton::NAMES,
                    "description": "Mouse button (default: left)"
                },
                "num_clicks": {
                    "type": "integer",
                    "description": "Clicks for mouse_click (default: 1)"
                },
                "text": {
                    "type": "string",
                    "description":
                        "Text for type, or key combination such as ctrl+c for key and hold_key"
                },
                "duration": {
                    "type": "number",
                    "description": "Seconds for hold_key and wait (wait default: 1)"
                },
                "scroll_direction": {
                    "type": "string",
                    "enum": ScrollDirection::NAMES
                },
                "scroll_amount": {
                    "type": "integer",
                    "description": "Wheel clicks to scroll"
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

    fn mock_tool() -> (Arc<MockDriver>, ComputerTool) {
        let driver = Arc::new(MockDriver::new());
        (driver.clone(), ComputerTool::with_driver(driver))
    }

    #[tokio::test]
    async fn click_defaults_to_single_left_click() {
        let (driver, tool) = mock_tool();
        let out = tool
            .dispatch(
                ActionRequest::new("mouse_click").with("coordinate", json!({"x": 10, "y": 20})),
            )
            .await
            .unwrap();
        assert_eq!(out, json!("Clicked left button 1 time(s) at (10, 20)"));
        assert_eq!(driver.calls(), vec!["mouse_click 10 20 left 1"]);
    }

    #[tokio::test]
    async fn position_follows_moves() {
        let (_driver, tool) = mock_tool();
        tool.dispatch(ActionRequest::new("mouse_move").with("coordinate", json!({"x": 3, "y": 4})))
            .await
            .unwrap();
        let at = tool
            .dispatch(ActionRequest::new("mouse_position"))
            .await
            .unwrap();
        assert_eq!(at, json!({"x": 3, "y": 4}));
    }

    #[tokio::test]
    async fn invalid_button_and_direction_are_rejected() {
        let (driver, tool) = mock_tool();
        let err = tool
            .dispatch(ActionRequest::new("mouse_down").with("button", "back"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("left, middle, right"));

        let err = tool
            .dispatch(
                ActionRequest::new("scroll")
                    .with("scroll_direction", "sideways")
                    .with("scroll_amount", 2),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("up, down, left, right"));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn scroll_requires_positive_amount() {
        let (driver, tool) = mock_tool();
        let err = tool
            .dispatch(
                ActionRequest::new("scroll")
                    .with("scroll_direction", "down")
                    .with("scroll_amount", 0),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidParameter { ref field, .. } if field == "scroll_amount"
        ));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn hold_key_requires_duration() {
        let (driver, tool) = mock_tool();
        let err = tool
            .dispatch(ActionRequest::new("hold_key").with("text", "shift"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'duration' for action 'hold_key'"
        );

        tool.dispatch(
            ActionRequest::new("hold_key")
                .with("text", "shift")
                .with("duration", 0.25),
        )
        .await
        .unwrap();
        assert_eq!(driver.calls(), vec!["hold_key shift 250ms"]);
    }

    #[tokio::test]
    async fn wait_defaults_to_one_second() {
        let (driver, tool) = mock_tool();
        tool.dispatch(ActionRequest::new("wait")).await.unwrap();
        assert_eq!(driver.calls(), vec!["wait 1000ms"]);
    }

    #[tokio::test]
    async fn type_and_key_are_distinct() {
        let (driver, tool) = mock_tool();
        tool.dispatch(ActionRequest::new("type").with("text", "hello"))
            .await
            .unwrap();
        tool.dispatch(ActionRequest::new("key").with("text", "ctrl+c"))
            .await
            .unwrap();
        assert_eq!(driver.calls(), vec!["type_text hello", "key_press ctrl+c"]);
    }
}
