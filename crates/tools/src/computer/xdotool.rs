//! X11 desktop driver shelling out to `xdotool`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use proto::ToolError;
use tokio::process::Command;
use tracing::debug;

use super::driver::{ComputerDriver, Coordinate, MouseButton, ScrollDirection};

/// Typing delay between keystrokes, in milliseconds.
const TYPE_DELAY_MS: u32 = 12;

pub struct XdotoolDriver {
    program: PathBuf,
}

impl XdotoolDriver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<String, ToolError> {
        debug!(program = %self.program.display(), ?args, "Running xdotool");
        let output = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ToolError::MissingDependency(format!(
                        "{} not found; install xdotool or set computer.xdotool_path",
                        self.program.display()
                    ))
                } else {
                    ToolError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ToolError::ExecutionFailed(format!(
                "xdotool {} failed (exit {}): {}",
                args.join(" "),
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for XdotoolDriver {
    fn default() -> Self {
        Self::new("xdotool")
    }
}

fn button_code(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "1",
        MouseButton::Middle => "2",
        MouseButton::Right => "3",
    }
}

fn scroll_code(direction: ScrollDirection) -> &'static str {
    match direction {
        ScrollDirection::Up => "4",
        ScrollDirection::Down => "5",
        ScrollDirection::Left => "6",
        ScrollDirection::Right => "7",
    }
}

fn move_args(coordinate: Coordinate) -> Vec<String> {
    vec![
        "mousemove".to_string(),
        "--sync".to_string(),
        coordinate.x.to_string(),
        coordinate.y.to_string(),
    ]
}

fn click_args(coordinate: Coordinate, button: MouseButton, num_clicks: u32) -> Vec<String> {
    let mut args = move_args(coordinate);
    args.extend([
        "click".to_string(),
        "--repeat".to_string(),
        num_clicks.to_string(),
        button_code(button).to_string(),
    ]);
    args
}

fn drag_args(coordinate: Coordinate, button: MouseButton) -> Vec<String> {
    let mut args = vec!["mousedown".to_string(), button_code(button).to_string()];
    args.extend(move_args(coordinate));
    args.extend(["mouseup".to_string(), button_code(button).to_string()]);
    args
}

fn scroll_args(direction: ScrollDirection, amount: u32) -> Vec<String> {
    vec![
        "click".to_string(),
        "--repeat".to_string(),
        amount.to_string(),
        scroll_code(direction).to_string(),
    ]
}

/// Parses `getmouselocation --shell` output (`X=..`, `Y=..` lines).
fn parse_location(output: &str) -> Option<Coordinate> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("X", value)) => x = value.trim().parse().ok(),
            Some(("Y", value)) => y = value.trim().parse().ok(),
            _ => {}
        }
    }
    Some(Coordinate::new(x?, y?))
}

#[async_trait]
impl ComputerDriver for XdotoolDriver {
    async fn mouse_click(
        &self,
        coordinate: Coordinate,
        button: MouseButton,
        num_clicks: u32,
    ) -> Result<(), ToolError> {
        self.run(click_args(coordinate, button, num_clicks)).await?;
        Ok(())
    }

    async fn mouse_move(&self, coordinate: Coordinate) -> Result<(), ToolError> {
        self.run(move_args(coordinate)).await?;
        Ok(())
    }

    async fn mouse_position(&self) -> Result<Coordinate, ToolError> {
        let output = self
            .run(vec!["getmouselocation".to_string(), "--shell".to_string()])
            .await?;
        parse_location(&output).ok_or_else(|| {
            ToolError::ExecutionFailed(format!("Unexpected getmouselocation output: {output:?}"))
        })
    }

    async fn mouse_down(&self, button: MouseButton) -> Result<(), ToolError> {
        self.run(vec!["mousedown".to_string(), button_code(button).to_string()])
            .await?;
        Ok(())
    }

    async fn mouse_up(&self, button: MouseButton) -> Result<(), ToolError> {
        self.run(vec!["mouseup".to_string(), button_code(button).to_string()])
            .await?;
        Ok(())
    }

    async fn mouse_drag(
        &self,
        coordinate: Coordinate,
        button: MouseButton,
    ) -> Result<(), ToolError> {
        self.run(drag_args(coordinate, button)).await?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), ToolError> {
        self.run(vec![
            "type".to_string(),
            "--delay".to_string(),
            TYPE_DELAY_MS.to_string(),
            "--".to_string(),
            text.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn key_press(&self, combo: &str) -> Result<(), ToolError> {
        self.run(vec!["key".to_string(), "--".to_string(), combo.to_string()])
            .await?;
        Ok(())
    }

    async fn hold_key(&self, combo: &str, duration: Duration) -> Result<(), ToolError> {
        self.run(vec!["keydown".to_string(), "--".to_string(), combo.to_string()])
            .await?;
        tokio::time::sleep(duration).await;
        self.run(vec!["keyup".to_string(), "--".to_string(), combo.to_string()])
            .await?;
        Ok(())
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), ToolError> {
        self.run(scroll_args(direction, amount)).await?;
        Ok(())
    }

    async fn wait(&self, duration: Duration) -> Result<(), ToolError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }
}
