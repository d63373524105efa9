//! Operator prompt backends for the authorizer.

use std::io::{IsTerminal, Read, Write};

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use proto::{ApprovalDecision, ApprovalHandler, ApprovalRequest};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

const RULE_WIDTH: usize = 42;

/// Renders the text shown to the operator for `req`.
pub fn render_prompt(req: &ApprovalRequest) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let description = if req.description.trim().is_empty() {
        "(no description provided)"
    } else {
        req.description.as_str()
    };
    format!(
        "\n\nThe AI (tool: {}) wants to do the following ...\n\
         {rule}\n{description}\n{rule}\n\nIs it okay to proceed? (y/N) ",
        req.actor
    )
}

/// Maps one keystroke to a decision. Only `y`/`Y` approves.
pub fn decision_for(key: char) -> ApprovalDecision {
    match key {
        'y' | 'Y' => ApprovalDecision::Approve,
        _ => ApprovalDecision::Reject,
    }
}

/// Prompts on the controlling terminal and reads a single keystroke.
///
/// On a TTY the keystroke is read in raw mode so no Enter is needed. When
/// stdin is not a terminal the first byte of stdin is used instead.
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Creates a terminal prompt.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalHandler for TerminalPrompt {
    async fn request_approval(&self, req: ApprovalRequest) -> ApprovalDecision {
        let text = render_prompt(&req);
        let key = tokio::task::spawn_blocking(move || -> std::io::Result<Option<char>> {
            let mut stdout = std::io::stdout();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            let key = if std::io::stdin().is_terminal() {
                read_raw_keystroke()
            } else {
                read_piped_byte()
            };
            writeln!(stdout)?;
            key
        })
        .await;

        match key {
            Ok(Ok(Some(key))) => decision_for(key),
            Ok(Ok(None)) => ApprovalDecision::Reject,
            Ok(Err(e)) => {
                debug!("Approval prompt read failed: {e}");
                ApprovalDecision::Reject
            }
            Err(e) => {
                debug!("Approval prompt task failed: {e}");
                ApprovalDecision::Reject
            }
        }
    }
}

fn read_raw_keystroke() -> std::io::Result<Option<char>> {
    terminal::enable_raw_mode()?;
    let key = loop {
        match event::read() {
            Ok(Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            })) => {
                break Ok(match code {
                    KeyCode::Char(_) if modifiers.contains(KeyModifiers::CONTROL) => None,
                    KeyCode::Char(c) => Some(c),
                    _ => None,
                });
            }
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode()?;
    key
}

fn read_piped_byte() -> std::io::Result<Option<char>> {
    let mut buf = [0u8; 1];
    match std::io::stdin().read(&mut buf)? {
        0 => Ok(None),
        _ => Ok(Some(buf[0] as char)),
    }
}

/// Prompts over an arbitrary async reader/writer pair.
///
/// Reads exactly one byte per request. End of input rejects.
pub struct StreamPrompt {
    input: Mutex<Box<dyn AsyncRead + Send + Unpin>>,
    output: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl StreamPrompt {
    /// Creates a prompt over `input`/`output`.
    pub fn new(
        input: impl AsyncRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Reads answers from stdin and writes prompts to stderr, leaving
    /// stdout to tool output.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stderr())
    }
}

#[async_trait]
impl ApprovalHandler for StreamPrompt {
    async fn request_approval(&self, req: ApprovalRequest) -> ApprovalDecision {
        {
            let mut output = self.output.lock().await;
            let rendered = render_prompt(&req);
            if output.write_all(rendered.as_bytes()).await.is_err() || output.flush().await.is_err()
            {
                return ApprovalDecision::Reject;
            }
        }

        let mut input = self.input.lock().await;
        match input.read_u8().await {
            Ok(byte) => decision_for(byte as char),
            Err(_) => ApprovalDecision::Reject,
        }
    }
}
