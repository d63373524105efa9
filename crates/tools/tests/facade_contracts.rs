//! End-to-end contracts of the facades as seen through the tool registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use proto::{ApprovalDecision, ApprovalHandler, ApprovalRequest, StepRecord, StepStatus};
use serde_json::json;
use tools::browser::{BrowserTool, LoggingDriver, MockDriver as MockBrowser};
use tools::database::{DatabaseTool, MockDriver as MockDatabase};
use tools::disk::{DiskTool, MockDriver as MockDisk};
use tools::{
    ActionRequest, AuthorizationPolicy, Authorizer, DocTool, EvalTool, StreamPrompt, Tool,
    ToolRegistry,
};

/// Handler that answers with a fixed decision and counts prompts.
struct CountingHandler {
    decision: ApprovalDecision,
    prompts: AtomicUsize,
}

impl CountingHandler {
    fn new(decision: ApprovalDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            prompts: AtomicUsize::new(0),
        })
    }

    fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApprovalHandler for CountingHandler {
    async fn request_approval(&self, _req: ApprovalRequest) -> ApprovalDecision {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}

fn authorizer(policy: AuthorizationPolicy, handler: Arc<CountingHandler>) -> Arc<Authorizer> {
    Arc::new(Authorizer::new(policy, handler))
}

#[tokio::test]
async fn registry_lists_every_facade() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut registry = ToolRegistry::new();
    registry.register(DiskTool::new(dir.path()).expect("disk"));
    registry.register(DocTool::new(dir.path()).expect("doc"));
    registry.register(EvalTool::default());
    registry.register(BrowserTool::with_driver(Arc::new(MockBrowser::new())));
    registry.register(DatabaseTool::with_driver(Arc::new(MockDatabase::new())));

    assert_eq!(
        registry.tool_names(),
        vec!["browser", "database", "disk", "doc", "eval"]
    );
    for definition in registry.definitions() {
        assert_eq!(definition.parameters["type"], "object", "{}", definition.name);
        assert!(definition.parameters["properties"]["action"]["enum"].is_array());
    }
}

#[tokio::test]
async fn write_then_read_through_registry_returns_text() {
    let dir = tempfile::tempdir().expect("temp dir");
    let handler = CountingHandler::new(ApprovalDecision::Reject);
    let mut registry = ToolRegistry::new();
    registry.register(
        DiskTool::new(dir.path())
            .expect("disk")
            .with_authorizer(authorizer(AuthorizationPolicy::Auto, handler.clone())),
    );

    let write = registry
        .execute(
            "w1",
            "disk",
            json!({"action": "file_write", "path": "./a.txt", "text": "hi"}),
        )
        .await;
    assert!(!write.is_error, "{}", write.output);

    let read = registry
        .execute("r1", "disk", json!({"action": "file_read", "path": "./a.txt"}))
        .await;
    assert_eq!(read.output, "hi");
    assert_eq!(handler.prompts(), 0);
}

#[tokio::test]
async fn traversal_is_refused_before_any_io() {
    let dir = tempfile::tempdir().expect("temp dir");
    let sandbox = dir.path().join("sandbox");
    std::fs::create_dir(&sandbox).unwrap();
    std::fs::write(dir.path().join("outside.txt"), "keep").unwrap();

    let tool = DiskTool::new(&sandbox)
        .expect("disk")
        .with_authorizer(Arc::new(Authorizer::auto()));
    let result = tool
        .execute(
            "s1",
            json!({"action": "file_delete", "path": "../outside.txt"}),
        )
        .await;
    assert!(result.is_error);
    assert!(result.output.starts_with("Security violation"));
    assert_eq!(std::fs::read_to_string(dir.path().join("outside.txt")).unwrap(), "keep");
}

#[tokio::test]
async fn ask_with_piped_no_declines_and_leaves_driver_untouched() {
    let driver = Arc::new(MockDisk::new());
    let prompt = StreamPrompt::new(std::io::Cursor::new(b"n\n".to_vec()), tokio::io::sink());
    let tool = DiskTool::with_driver(driver.clone()).with_authorizer(Arc::new(Authorizer::new(
        AuthorizationPolicy::Ask,
        Arc::new(prompt),
    )));

    let result = tool
        .execute(
            "d1",
            json!({"action": "file_write", "path": "a.txt", "text": "x"}),
        )
        .await;
    assert!(result.is_error);
    assert!(result.output.contains("declined"));
    assert!(driver.calls().is_empty());
}

#[tokio::test]
async fn ask_with_piped_yes_reaches_driver_once() {
    let driver = Arc::new(MockDisk::new());
    let prompt = StreamPrompt::new(std::io::Cursor::new(b"Y".to_vec()), tokio::io::sink());
    let tool = DiskTool::with_driver(driver.clone()).with_authorizer(Arc::new(Authorizer::new(
        AuthorizationPolicy::Ask,
        Arc::new(prompt),
    )));

    tool.dispatch(
        ActionRequest::new("file_write")
            .with("path", "a.txt")
            .with("text", "x"),
    )
    .await
    .expect("write");
    assert_eq!(driver.calls(), vec!["file_write a.txt"]);
}

#[tokio::test]
async fn policy_switch_takes_effect_on_next_call() {
    let driver = Arc::new(MockDisk::new());
    let handler = CountingHandler::new(ApprovalDecision::Reject);
    let shared = authorizer(AuthorizationPolicy::Ask, handler.clone());
    let tool = DiskTool::with_driver(driver.clone()).with_authorizer(shared.clone());
    let request = || {
        ActionRequest::new("file_write")
            .with("path", "notes.txt")
            .with("text", "x")
    };

    assert!(tool.dispatch(request()).await.is_err());
    assert_eq!(handler.prompts(), 1);

    assert!(driver.calls().is_empty());

    shared.set_auto_execute(true);
    tool.dispatch(request()).await.expect("auto-approved");
    assert_eq!(handler.prompts(), 1);
    assert_eq!(driver.calls(), vec!["file_write notes.txt"]);
}

#[tokio::test]
async fn batch_stops_after_first_error() {
    let tool = DatabaseTool::with_driver(Arc::new(MockDatabase::failing_on("BAD")))
        .with_authorizer(Arc::new(Authorizer::auto()));
    let result = tool
        .execute(
            "b1",
            json!({"statements": [
                "INSERT INTO t VALUES (1)",
                "INSERT BAD",
                "INSERT INTO t VALUES (3)"
            ]}),
        )
        .await;
    assert!(!result.is_error);

    let records: Vec<StepRecord> = serde_json::from_str(&result.output).expect("records");
    let statuses: Vec<StepStatus> = records.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![StepStatus::Ok, StepStatus::Error]);
}

#[tokio::test]
async fn sqlite_scenario_returns_inserted_row() {
    let tool = DatabaseTool::sqlite("sqlite::memory:")
        .await
        .expect("sqlite")
        .with_authorizer(Arc::new(Authorizer::auto()));
    let result = tool
        .execute(
            "q1",
            json!({
                "action": "execute",
                "statements": [
                    "CREATE TABLE t(id)",
                    "INSERT INTO t VALUES (1)",
                    "SELECT * FROM t"
                ]
            }),
        )
        .await;

    let records: Vec<StepRecord> = serde_json::from_str(&result.output).expect("records");
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].result, json!([[1]]));
}

#[tokio::test]
async fn visit_through_logging_driver_records_one_goto() {
    let driver = Arc::new(LoggingDriver::new(MockBrowser::new()));
    let tool = BrowserTool::with_driver(driver.clone());
    let result = tool
        .execute("v1", json!({"action": "Visit", "url": "https://example.com/docs"}))
        .await;

    assert!(!result.is_error, "{}", result.output);
    assert_eq!(driver.inner().calls(), vec!["goto https://example.com/docs"]);
}

#[tokio::test]
async fn unknown_action_names_the_value_for_each_facade() {
    let dir = tempfile::tempdir().expect("temp dir");
    let facades: Vec<Arc<dyn Tool>> = vec![
        Arc::new(DiskTool::new(dir.path()).expect("disk")),
        Arc::new(DocTool::new(dir.path()).expect("doc")),
        Arc::new(EvalTool::default()),
        Arc::new(BrowserTool::with_driver(Arc::new(MockBrowser::new()))),
        Arc::new(DatabaseTool::with_driver(Arc::new(MockDatabase::new()))),
    ];

    for facade in facades {
        let result = facade.execute("u1", json!({"action": "teleport"})).await;
        assert!(result.is_error);
        assert!(
            result.output.starts_with("Unsupported action 'teleport'"),
            "{}: {}",
            facade.name(),
            result.output
        );
    }
}
