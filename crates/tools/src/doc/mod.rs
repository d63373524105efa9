//! Doc facade: page-level text extraction from documents.

mod reader;

pub use reader::{DocumentReader, PdfExtractReader};

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use proto::{ToolError, ToolResult};
use serde_json::{Value, json};
use tracing::warn;

use crate::{ActionRequest, ActionSet, Tool};

const TOOL_NAME: &str = "doc";
/// Upper bound on pages a single range may expand to.
const MAX_RANGE_PAGES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocAction {
    PdfRead,
}

impl ActionSet for DocAction {
    const ALL: &'static [Self] = &[Self::PdfRead];

    fn as_str(self) -> &'static str {
        match self {
            Self::PdfRead => "pdf_read",
        }
    }
}

/// Parses a page list such as `"1, 3-5"` into 1-based page numbers.
///
/// Order is preserved and duplicates are dropped.
pub fn parse_page_numbers(list: &str) -> Result<Vec<usize>, String> {
    let mut pages = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_page(a)?, parse_page(b)?),
            None => {
                let page = parse_page(part)?;
                (page, page)
            }
        };
        if start > end {
            return Err(format!("range '{part}' is descending"));
        }
        if end - start >= MAX_RANGE_PAGES {
            return Err(format!("range '{part}' spans more than {MAX_RANGE_PAGES} pages"));
        }
        for page in start..=end {
            if !pages.contains(&page) {
                pages.push(page);
            }
        }
    }
    if pages.is_empty() {
        return Err("no page numbers given".to_string());
    }
    Ok(pages)
}

fn parse_page(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("page numbers start at 1".to_string()),
        Ok(page) => Ok(page),
        Err(_) => Err(format!("'{}' is not a page number", raw.trim())),
    }
}

/// Facade reading selected pages from documents.
pub struct DocTool {
    reader: Arc<dyn DocumentReader>,
}

impl DocTool {
    /// Creates a doc tool reading PDFs below `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        Ok(Self::with_reader(Arc::new(PdfExtractReader::new(root)?)))
    }

    pub fn with_reader(reader: Arc<dyn DocumentReader>) -> Self {
        Self { reader }
    }

    /// Validates and routes one request.
    pub async fn dispatch(&self, request: ActionRequest) -> Result<Value, ToolError> {
        request.log_start(TOOL_NAME);
        let outcome = self.route(&request).await;
        request.log_outcome(TOOL_NAME, &outcome);
        outcome
    }

    async fn route(&self, request: &ActionRequest) -> Result<Value, ToolError> {
        match DocAction::parse(TOOL_NAME, request.action())? {
            DocAction::PdfRead => {
                let doc_path = request.require_str("doc_path")?;
                let page_list = request.require_str("page_numbers")?;
                let requested = parse_page_numbers(page_list)
                    .map_err(|reason| request.invalid("page_numbers", reason))?;

                let pages = self.reader.pages(doc_path).await?;
                let total = pages.len();
                let (found, missing): (Vec<usize>, Vec<usize>) =
                    requested.iter().partition(|page| **page <= total);
                if !missing.is_empty() {
                    warn!(doc_path, total, ?missing, "Requested pages outside document");
                }

                let texts: Vec<Value> = found
                    .iter()
                    .map(|page| json!({ "page": page, "text": pages[page - 1].trim() }))
                    .collect();
                Ok(json!({
                    "doc_path": doc_path,
                    "total_pages": total,
                    "requested_pages": requested,
                    "invalid_pages": missing,
                    "pages": texts,
                }))
            }
        }
    }
}

#[async_trait]
impl Tool for DocTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Read the text of selected pages from a PDF document. Pages outside \
         the document are listed in invalid_pages instead of failing."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": DocAction::names(),
                    "description": "Operation to perform"
                },
                "doc_path": {
                    "type": "string",
                    "description": "Path of the PDF relative to the document root"
                },
                "page_numbers": {
                    "type": "string",
                    "description": "Pages to read, e.g. \"1, 3-5\""
                }
            },
            "required": ["action", "doc_path", "page_numbers"]
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
