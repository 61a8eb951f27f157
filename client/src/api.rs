use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Network unreachable, connection reset, or any other send failure.
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Server(ServerError),
    /// The server answered 2xx but the body was not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// A staged file could not be read before sending it.
    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    pub fn server(status: u16, detail: Option<String>) -> Self {
        Self::Server(ServerError::new(status, detail))
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Server(e) => e.detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server(e) => Some(e.status),
            _ => None,
        }
    }

    /// Text shown to the user: the server `detail` when present, `fallback` for
    /// a non-2xx without one, otherwise the transport description.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Server(e) => e
                .detail
                .clone()
                .unwrap_or_else(|| fallback.to_string()),
            other => other.to_string(),
        }
    }
}

/// Non-2xx response from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub status: u16,
    pub status_text: Option<String>,
    pub detail: Option<String>,
}

impl ServerError {
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self {
            status,
            status_text: None,
            detail,
        }
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.detail, &self.status_text) {
            (Some(detail), _) => write!(f, "{detail}"),
            (None, Some(text)) => write!(f, "{} {text}", self.status),
            (None, None) => write!(f, "HTTP {}", self.status),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Labels of the documents the answer cites, in server order.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Answer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Opaque handle to the bytes of a user-selected file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContent {
    /// Read lazily at upload time.
    Path(PathBuf),
    Bytes(Bytes),
}

impl FileContent {
    pub async fn load(&self) -> std::io::Result<Bytes> {
        match self {
            Self::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content: FileContent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub accepted_count: usize,
    pub message: Option<String>,
}

#[async_trait::async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Ask a question grounded in the uploaded documents.
    async fn ask(&self, query: &str) -> Result<Answer>;
    async fn list_files(&self) -> Result<Vec<String>>;
    /// Upload every file in one request.
    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<UploadReceipt>;
    async fn delete_file(&self, name: &str) -> Result<()>;
}
