//! Recording desktop driver for tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use proto::ToolError;

use super::driver::{ComputerDriver, Coordinate, MouseButton, ScrollDirection};

/// Driver that tracks the pointer position and records every call.
pub struct MockDriver {
    position: Mutex<Coordinate>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            position: Mutex::new(Coordinate::new(0, 0)),
            calls: Mutex::default(),
        }
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ComputerDriver for MockDriver {
    async fn mouse_click(
        &self,
        coordinate: Coordinate,
        button: MouseButton,
        num_clicks: u32,
    ) -> Result<(), ToolError> {
        self.record(format!(
            "mouse_click {} {} {} {num_clicks}",
            coordinate.x,
            coordinate.y,
            button.as_str()
        ));
        *self.position.lock() = coordinate;
        Ok(())
    }

    async fn mouse_move(&self, coordinate: Coordinate) -> Result<(), ToolError> {
        self.record(format!("mouse_move {} {}", coordinate.x, coordinate.y));
        *self.position.lock() = coordinate;
        Ok(())
    }

    async fn mouse_position(&self) -> Result<Coordinate, ToolError> {
        self.record("mouse_position".to_string());
        Ok(*self.position.lock())
    }

    async fn mouse_down(&self, button: MouseButton) -> Result<(), ToolError> {
        self.record(format!("mouse_down {}", button.as_str()));
        Ok(())
    }

    async fn mouse_up(&self, button: MouseButton) -> Result<(), ToolError> {
        self.record(format!("mouse_up {}", button.as_str()));
        Ok(())
    }

    async fn mouse_drag(
        &self,
        coordinate: Coordinate,
        button: MouseButton,
    ) -> Result<(), ToolError> {
        self.record(format!(
            "mouse_drag {} {} {}",
            coordinate.x,
            coordinate.y,
            button.as_str()
        ));
        *self.position.lock() = coordinate;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), ToolError> {
        self.record(format!("type_text {text}"));
        Ok(())
    }

    async fn key_press(&self, combo: &str) -> Result<(), ToolError> {
        self.record(format!("key_press {combo}"));
        Ok(())
    }

    async fn hold_key(&self, combo: &str, duration: Duration) -> Result<(), ToolError> {
        self.record(format!("hold_key {combo} {}ms", duration.as_millis()));
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), ToolError> {
        self.record(format!("scroll {} {amount}", direction.as_str()));
        Ok(())
    }

    async fn wait(&self, duration: Duration) -> Result<(), ToolError> {
        self.record(format!("wait {}ms", duration.as_millis()));
        Ok(())
    }
}
