use std::path::Path;

use async_trait::async_trait;
use proto::ToolError;
use tracing::debug;

use crate::disk::LocalDriver;
use crate::short_type_name;

/// Document text extraction, one string per page.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    fn driver_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Text of every page of the document at `path`, in page order.
    async fn pages(&self, _path: &str) -> Result<Vec<String>, ToolError> {
        Err(ToolError::not_implemented(self.driver_name(), "pages"))
    }
}

/// PDF reader backed by `pdf-extract`, confined to a root directory.
pub struct PdfExtractReader {
    sandbox: LocalDriver,
}

impl PdfExtractReader {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        Ok(Self {
            sandbox: LocalDriver::new(root)?,
        })
    }
}

#[async_trait]
impl DocumentReader for PdfExtractReader {
    async fn pages(&self, path: &str) -> Result<Vec<String>, ToolError> {
        let resolved = self.sandbox.resolve(path).await?;
        let bytes = tokio::fs::read(&resolved).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolError::NotFound(path.to_string())
            } else {
                ToolError::Io(e)
            }
        })?;
        debug!(path, bytes = bytes.len(), "Extracting PDF text");

        let label = path.to_string();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| {
                ToolError::ExecutionFailed(format!("PDF extraction aborted for {label}: {e}"))
            })?
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read PDF {label}: {e}")))
    }
}
