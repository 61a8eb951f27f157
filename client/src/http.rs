use crate::Answer;
use crate::DocumentBackend;
use crate::Error;
use crate::Result;
use crate::ServerError;
use crate::UploadFile;
use crate::UploadReceipt;

use kbase_backend_client as backend;
use kbase_backend_client::BackendError;
use kbase_backend_client::PathStyle;
use kbase_backend_client::UploadPart;
use tracing::debug;

#[derive(Clone)]
pub struct HttpClient {
    pub base_url: String,
    backend: backend::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let backend = backend::Client::new(base_url)?;
        Ok(Self {
            base_url: backend.base_url().to_string(),
            backend,
        })
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.backend = self.backend.clone().with_user_agent(ua);
        self
    }

    pub fn with_path_style(mut self, style: PathStyle) -> Self {
        self.backend = self.backend.clone().with_path_style(style);
        self
    }

    pub fn path_style(&self) -> PathStyle {
        self.backend.path_style()
    }
}

fn map_backend_error(err: BackendError) -> Error {
    match err {
        BackendError::Status {
            status, detail, ..
        } => {
            let mut server = ServerError::new(status.as_u16(), detail);
            if let Some(reason) = status.canonical_reason() {
                server = server.with_status_text(reason);
            }
            Error::Server(server)
        }
        BackendError::Decode {
            ref message,
            ref content_type,
            ..
        } => {
            debug!("decode failed: {err}");
            if content_type.contains("json") {
                Error::Malformed(message.clone())
            } else {
                Error::Malformed(format!("unexpected content type {content_type}"))
            }
        }
        BackendError::Build(_) | BackendError::Transport { .. } | BackendError::Part { .. } => {
            Error::Transport(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl DocumentBackend for HttpClient {
    async fn ask(&self, query: &str) -> Result<Answer> {
        let resp = self.backend.query(query).await.map_err(map_backend_error)?;
        let sources = resp
            .source_documents
            .unwrap_or_default()
            .iter()
            .map(|doc| doc.source_label().unwrap_or_else(|| "N/A".to_string()))
            .collect();
        Ok(Answer {
            text: resp.answer,
            sources,
        })
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let resp = self.backend.list_files().await.map_err(map_backend_error)?;
        debug!("http.list_files: count={}", resp.files.len());
        Ok(resp.files)
    }

    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<UploadReceipt> {
        let sent = files.len();
        let mut parts = Vec::with_capacity(sent);
        for file in files {
            let bytes = file
                .content
                .load()
                .await
                .map_err(|e| Error::Io(format!("failed to read {}: {e}", file.name)))?;
            parts.push(UploadPart::new(file.name, bytes));
        }
        let resp = self.backend.upload(parts).await.map_err(map_backend_error)?;
        let accepted_count = resp
            .uploaded_files
            .as_ref()
            .map_or(sent, std::vec::Vec::len);
        debug!("http.upload_files: sent={sent} accepted={accepted_count}");
        Ok(UploadReceipt {
            accepted_count,
            message: resp.message,
        })
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        self.backend
            .delete_file(name)
            .await
            .map_err(map_backend_error)?;
        Ok(())
    }
}
