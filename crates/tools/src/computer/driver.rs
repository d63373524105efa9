use std::time::Duration;

use async_trait::async_trait;
use proto::ToolError;
use serde::Serialize;

use crate::short_type_name;

/// Screen position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coordinate {
    pub x: i64,
    pub y: i64,
}

impl Coordinate {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub const NAMES: &'static [&'static str] = &["left", "middle", "right"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "middle" => Some(Self::Middle),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Middle => "middle",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub const NAMES: &'static [&'static str] = &["up", "down", "left", "right"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Desktop input capability set.
///
/// Every method fails with [`ToolError::NotImplemented`] unless overridden.
#[async_trait]
pub trait ComputerDriver: Send + Sync {
    fn driver_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    async fn mouse_click(
        &self,
        _coordinate: Coordinate,
        _button: MouseButton,
        _num_clicks: u32,
    ) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "mouse_click"))
    }

    async fn mouse_move(&self, _coordinate: Coordinate) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "mouse_move"))
    }

    async fn mouse_position(&self) -> Result<Coordinate, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "mouse_position"))
    }

    async fn mouse_down(&self, _button: MouseButton) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "mouse_down"))
    }

    async fn mouse_up(&self, _button: MouseButton) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "mouse_up"))
    }

    /// Presses `button`, moves to `coordinate` and releases.
    async fn mouse_drag(
        &self,
        _coordinate: Coordinate,
        _button: MouseButton,
    ) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "mouse_drag"))
    }

    async fn type_text(&self, _text: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "type_text"))
    }

    /// Presses a key combination such as `ctrl+c`.
    async fn key_press(&self, _combo: &str) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "key_press"))
    }

    async fn hold_key(&self, _combo: &str, _duration: Duration) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "hold_key"))
    }

    async fn scroll(&self, _direction: ScrollDirection, _amount: u32) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "scroll"))
    }

    async fn wait(&self, _duration: Duration) -> Result<(), ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "wait"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BareDriver;

    impl ComputerDriver for BareDriver {}

    #[tokio::test]
    async fn bare_driver_reports_method() {
        let err = BareDriver.scroll(ScrollDirection::Down, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "BareDriver does not implement 'scroll'");
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(MouseButton::from_name(" Right "), Some(MouseButton::Right));
        assert_eq!(MouseButton::from_name("back"), None);
        assert_eq!(ScrollDirection::from_name("UP"), Some(ScrollDirection::Up));
        for name in ScrollDirection::NAMES {
            let parsed = ScrollDirection::from_name(name).unwrap();
            assert_eq!(parsed.as_str(), *name);
        }
    }
}
