//! Disk facade: file and directory actions routed to a [`DiskDriver`].

mod driver;
mod local;
mod mock;

pub use driver::{DirectoryEntry, DiskDriver, EntryKind};
pub use local::LocalDriver;
pub use mock::MockDriver;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use proto::{ToolError, ToolResult};
use serde_json::{Value, json};

use crate::{ActionRequest, ActionSet, Authorizer, Tool};

const TOOL_NAME: &str = "disk";

/// Actions understood by [`DiskTool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskAction {
    FileCreate,
    FileRead,
    FileWrite,
    FileDelete,
    FileMove,
    FileReplace,
    DirectoryCreate,
    DirectoryList,
    DirectoryMove,
    DirectoryDelete,
}

impl ActionSet for DiskAction {
    const ALL: &'static [Self] = &[
        Self::FileCreate,
        Self::FileRead,
        Self::FileWrite,
        Self::FileDelete,
        Self::FileMove,
        Self::FileReplace,
        Self::DirectoryCreate,
        Self::DirectoryList,
        Self::DirectoryMove,
        Self::DirectoryDelete,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::FileCreate => "file_create",
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::FileDelete => "file_delete",
            Self::FileMove => "file_move",
            Self::FileReplace => "file_replace",
            Self::DirectoryCreate => "directory_create",
            Self::DirectoryList => "directory_list",
            Self::DirectoryMove => "directory_move",
            Self::DirectoryDelete => "directory_delete",
        }
    }
}

/// Facade exposing filesystem actions.
///
/// Writes, replacements, moves and deletions ask the authorizer first.
pub struct DiskTool {
    driver: Arc<dyn DiskDriver>,
    authorizer: Arc<Authorizer>,
}

impl DiskTool {
    /// Creates a disk tool backed by a [`LocalDriver`] rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        Ok(Self::with_driver(Arc::new(LocalDriver::new(root)?)))
    }

    /// Creates a disk tool over an existing driver.
    pub fn with_driver(driver: Arc<dyn DiskDriver>) -> Self {
        Self {
            driver,
            authorizer: Authorizer::global(),
        }
    }

    /// Replaces the authorizer consulted before sensitive actions.
    pub fn with_authorizer(mut self, authorizer: Arc<Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Validates, authorizes and routes one request.
    pub async fn dispatch(&self, request: ActionRequest) -> Result<Value, ToolError> {
        request.log_start(TOOL_NAME);
        let outcome = self.route(&request).await;
        request.log_outcome(TOOL_NAME, &outcome);
        outcome
    }

    async fn confirm(&self, action: DiskAction, description: String) -> Result<(), ToolError> {
        self.authorizer
            .ensure(TOOL_NAME, action.as_str(), &description)
            .await
    }

    async fn route(&self, request: &ActionRequest) -> Result<Value, ToolError> {
        let action = DiskAction::parse(TOOL_NAME, request.action())?;
        match action {
            DiskAction::FileCreate => {
                let path = request.require_str("path")?;
                self.driver.file_create(path).await?;
                Ok(json!(format!("Created file {path}")))
            }
            DiskAction::FileRead => {
                let path = request.require_str("path")?;
                Ok(Value::String(self.driver.file_read(path).await?))
            }
            DiskAction::FileWrite => {
                let path = request.require_str("path")?;
                let text = request.require_str("text")?;
                let chars = text.chars().count();
                self.confirm(action, format!("Write {chars} characters to the file {path}"))
                    .await?;
                self.driver.file_write(path, text).await?;
                Ok(json!(format!("Wrote {chars} characters to {path}")))
            }
            DiskAction::FileDelete => {
                let path = request.require_str("path")?;
                self.confirm(action, format!("Delete the file {path}")).await?;
                self.driver.file_delete(path).await?;
                Ok(json!(format!("Deleted file {path}")))
            }
            DiskAction::FileMove => {
                let path = request.require_str("path")?;
                let destination = request.require_str("destination")?;
                self.confirm(action, format!("Move the file {path} to {destination}"))
                    .await?;
                self.driver.file_move(path, destination).await?;
                Ok(json!(format!("Moved file {path} to {destination}")))
            }
            DiskAction::FileReplace => {
                let path = request.require_str("path")?;
                let old_text = request.require_str("old_text")?;
                let new_text = request.require_str("new_text")?;
                if old_text.is_empty() {
                    return Err(request.invalid("old_text", "must not be empty"));
                }
                self.confirm(
                    action,
                    format!("Replace every occurrence of {old_text:?} with {new_text:?} in {path}"),
                )
                .await?;
                let count = self.driver.file_replace(path, old_text, new_text).await?;
                Ok(json!(format!("Replaced {count} occurrence(s) in {path}")))
            }
            DiskAction::DirectoryCreate => {
                let path = request.require_str("path")?;
                self.driver.directory_create(path).await?;
                Ok(json!(format!("Created directory {path}")))
            }
            DiskAction::DirectoryList => {
                let path = request.optional_str("path")?.unwrap_or(".");
                let entries = self.driver.directory_list(path).await?;
                serde_json::to_value(entries)
                    .map_err(|e| {
                        ToolError::ExecutionFailed(format!("Failed to encode listing: {e}"))
                    })
            }
            DiskAction::DirectoryMove => {
                let path = request.require_str("path")?;
                let destination = request.require_str("destination")?;
                self.confirm(action, format!("Move the directory {path} to {destination}"))
                    .await?;
                self.driver.directory_move(path, destination).await?;
                Ok(json!(format!("Moved directory {path} to {destination}")))
            }
            DiskAction::DirectoryDelete => {
                let path = request.require_str("path")?;
                self.confirm(
                    action,
                    format!("Delete the directory {path} and everything inside it"),
                )
                .await?;
                self.driver.directory_delete(path).await?;
                Ok(json!(format!("Deleted directory {path}")))
            }
        }
    }
}

#[async_trait]
impl Tool for DiskTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Read, write, move and delete files and directories inside the sandbox root. \
         Paths are relative to the root; paths escaping it are rejected."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": DiskAction::names(),
                    "description": "Operation to perform"
                },
                "path": {
                    "type": "string",
                    "description": "File or directory path relative to the sandbox root"
                },
                "destination": {
                    "type": "string",
                    "description": "Target path for file_move / directory_move"
                },
                "text": {
                    "type": "string",
                    "description": "Contents for file_write"
                },
                "old_text": {
                    "type": "string",
                    "description": "Text to replace for file_replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "Replacement text for file_replace"
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
    use proto::ApprovalDecision;

    use super::*;
    use crate::authorizer::testing::{ScriptedPrompt, asking};

    fn mock_tool() -> (Arc<MockDriver>, DiskTool) {
        let driver = Arc::new(MockDriver::new());
        let tool =
            DiskTool::with_driver(driver.clone()).with_authorizer(Arc::new(Authorizer::auto()));
        (driver, tool)
    }

    #[tokio::test]
    async fn write_then_read_returns_text() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tool = DiskTool::new(dir.path())
            .expect("tool")
            .with_authorizer(Arc::new(Authorizer::auto()));

        tool.dispatch(
            ActionRequest::new("file_write")
                .with("path", "./a.txt")
                .with("text", "hi"),
        )
        .await
        .expect("write");
        let read = tool
            .dispatch(ActionRequest::new("file_read").with("path", "./a.txt"))
            .await
            .expect("read");
        assert_eq!(read, json!("hi"));
    }

    #[tokio::test]
    async fn unknown_action_names_value() {
        let (driver, tool) = mock_tool();
        let err = tool
            .dispatch(ActionRequest::new("file_explode").with("path", "a"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'file_explode'"));
        assert!(err.to_string().contains("directory_delete"));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn every_required_parameter_is_checked_before_driver() {
        let cases: &[(&str, &[&str])] = &[
            ("file_create", &["path"]),
            ("file_read", &["path"]),
            ("file_write", &["path", "text"]),
            ("file_delete", &["path"]),
            ("file_move", &["path", "destination"]),
            ("file_replace", &["path", "old_text", "new_text"]),
            ("directory_create", &["path"]),
            ("directory_move", &["path", "destination"]),
            ("directory_delete", &["path"]),
        ];

        for (action, required) in cases {
            for missing in *required {
                let (driver, tool) = mock_tool();
                let mut request = ActionRequest::new(action);
                for field in required.iter().filter(|f| *f != missing) {
                    request = request.with(field, "x");
                }
                let err = tool.dispatch(request).await.unwrap_err();
                match err {
                    ToolError::MissingParameter { action: a, field } => {
                        assert_eq!(a, *action);
                        assert_eq!(field, *missing);
                    }
                    other => panic!("{action}/{missing}: unexpected {other:?}"),
                }
                assert!(driver.calls().is_empty(), "{action} reached the driver");
            }
        }
    }

    #[tokio::test]
    async fn denied_delete_never_reaches_driver() {
        let driver = Arc::new(MockDriver::new());
        let prompt = ScriptedPrompt::new(ApprovalDecision::Reject);
        let tool = DiskTool::with_driver(driver.clone()).with_authorizer(asking(prompt.clone()));

        let err = tool
            .dispatch(ActionRequest::new("file_delete").with("path", "a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Declined { .. }));
        assert_eq!(prompt.asked(), 1);
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn approved_delete_reaches_driver_once() {
        let driver = Arc::new(MockDriver::new());
        driver.file_write("a.txt", "x").await.unwrap();
        let prompt = ScriptedPrompt::new(ApprovalDecision::Approve);
        let tool = DiskTool::with_driver(driver.clone()).with_authorizer(asking(prompt.clone()));

        tool.dispatch(ActionRequest::new("file_delete").with("path", "a.txt"))
            .await
            .expect("delete");
        assert_eq!(prompt.asked(), 1);
        assert_eq!(driver.calls(), vec!["file_write a.txt", "file_delete a.txt"]);
    }

    #[tokio::test]
    async fn reads_do_not_prompt() {
        let driver = Arc::new(MockDriver::new());
        let prompt = ScriptedPrompt::new(ApprovalDecision::Reject);
        let tool = DiskTool::with_driver(driver.clone()).with_authorizer(asking(prompt.clone()));

        tool.dispatch(ActionRequest::new("directory_list"))
            .await
            .expect("list");
        assert_eq!(prompt.asked(), 0);
        assert_eq!(driver.calls(), vec!["directory_list ."]);
    }

    #[tokio::test]
    async fn replace_rejects_empty_old_text() {
        let (driver, tool) = mock_tool();
        let err = tool
            .dispatch(
                ActionRequest::new("file_replace")
                    .with("path", "a")
                    .with("old_text", "")
                    .with("new_text", "b"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidParameter { ref field, .. } if field == "old_text"
        ));
        assert!(driver.calls().is_empty());
    }

    #[tokio::test]
    async fn execute_wraps_security_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tool = DiskTool::new(dir.path())
            .expect("tool")
            .with_authorizer(Arc::new(Authorizer::auto()));
        let result = tool
            .execute(
                "c1",
                json!({"action":"FILE_READ","path":"../../etc/passwd"}),
            )
            .await;
        assert!(result.is_error);
        assert!(result.output.starts_with("Security violation"));
    }

    #[test]
    fn schema_lists_every_action() {
        let (_driver, tool) = mock_tool();
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"][0], "action");
        assert_eq!(
            schema["properties"]["action"]["enum"]
                .as_array()
                .map(Vec::len),
            Some(DiskAction::ALL.len())
        );
    }
}
