use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Metadata of the chunks the answer was synthesized from.
    #[serde(default)]
    pub source_documents: Option<Vec<SourceDocument>>,
}

/// Free-form metadata for one retrieved chunk. Only `source` is interpreted.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct SourceDocument {
    pub metadata: Map<String, Value>,
}

impl SourceDocument {
    pub fn source_label(&self) -> Option<String> {
        match self.metadata.get("source")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub uploaded_files: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// One file destined for the shared `files` multipart field.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPart {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadPart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn mime(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_raw()
            .unwrap_or(DEFAULT_MIME)
            .to_string()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// Extract the human-readable `detail` from an error body.
///
/// FastAPI reports either a plain string or a list of validation items
/// (`[{"loc": [...], "msg": "...", "type": "..."}]`); anything else is
/// rendered as compact JSON.
pub fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        Value::Null => None,
        Value::String(s) => (!s.trim().is_empty()).then_some(s),
        Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .or_else(|| item.as_str())
                        .map_or_else(|| item.to_string(), str::to_string)
                })
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        other => Some(other.to_string()),
    }
}
