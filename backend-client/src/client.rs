use crate::types::FilesResponse;
use crate::types::MessageResponse;
use crate::types::QueryRequest;
use crate::types::QueryResponse;
use crate::types::UploadPart;
use crate::types::UploadResponse;
use crate::types::detail_message;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::USER_AGENT;
use reqwest::multipart::Form;
use reqwest::multipart::Part;
use serde::de::DeserializeOwned;

pub type Result<T> = std::result::Result<T, BackendError>;

/// Shared multipart field name for every uploaded file.
const UPLOAD_FIELD: &str = "files";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} failed: {status}; content-type={content_type}; body={body}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
        content_type: String,
        detail: Option<String>,
        body: String,
    },
    #[error("Decode error for {url}: {message}; content-type={content_type}; body={body}")]
    Decode {
        url: String,
        message: String,
        content_type: String,
        body: String,
    },
    #[error("invalid upload part {file_name}: {source}")]
    Part {
        file_name: String,
        #[source]
        source: reqwest::Error,
    },
}

impl BackendError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-supplied `detail`, when the error body carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Which listing endpoint the server exposes. Deployments differ; deletion
/// always goes through `/api/files/{name}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PathStyle {
    #[default]
    Documents, // /api/documents
    Files, // /api/files
}

#[derive(Clone, Debug)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    user_agent: Option<HeaderValue>,
    path_style: PathStyle,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(BackendError::Build)?;
        Ok(Self {
            base_url,
            http,
            user_agent: None,
            path_style: PathStyle::default(),
        })
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        if let Ok(hv) = HeaderValue::from_str(&ua.into()) {
            self.user_agent = Some(hv);
        }
        self
    }

    pub fn with_path_style(mut self, style: PathStyle) -> Self {
        self.path_style = style;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path_style(&self) -> PathStyle {
        self.path_style
    }

    fn headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(ua) = &self.user_agent {
            h.insert(USER_AGENT, ua.clone());
        } else {
            h.insert(USER_AGENT, HeaderValue::from_static("kbase-client"));
        }
        h
    }

    pub fn list_url(&self) -> String {
        match self.path_style {
            PathStyle::Documents => format!("{}/api/documents", self.base_url),
            PathStyle::Files => format!("{}/api/files", self.base_url),
        }
    }

    pub fn delete_url(&self, name: &str) -> String {
        format!("{}/api/files/{}", self.base_url, urlencoding::encode(name))
    }

    /// POST `/api/query` with `{ "query": ... }`.
    pub async fn query(&self, query: &str) -> Result<QueryResponse> {
        let url = format!("{}/api/query", self.base_url);
        let req = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(&QueryRequest { query });
        let body = self.execute("POST", &url, req).await?;
        decode(&url, body)
    }

    pub async fn list_files(&self) -> Result<FilesResponse> {
        let url = self.list_url();
        let req = self.http.get(&url).headers(self.headers());
        let body = self.execute("GET", &url, req).await?;
        decode(&url, body)
    }

    /// Send every part in one multipart request under the shared `files` field.
    pub async fn upload(&self, parts: Vec<UploadPart>) -> Result<UploadResponse> {
        let url = format!("{}/api/upload", self.base_url);
        let mut form = Form::new();
        for part in parts {
            let mime = part.mime();
            let file_name = part.file_name;
            let p = Part::bytes(part.bytes.to_vec())
                .file_name(file_name.clone())
                .mime_str(&mime)
                .map_err(|source| BackendError::Part { file_name, source })?;
            form = form.part(UPLOAD_FIELD, p);
        }
        let req = self.http.post(&url).headers(self.headers()).multipart(form);
        let body = self.execute("POST", &url, req).await?;
        decode(&url, body)
    }

    /// DELETE `/api/files/{name}`. An empty success body is accepted.
    pub async fn delete_file(&self, name: &str) -> Result<MessageResponse> {
        let url = self.delete_url(name);
        let req = self.http.delete(&url).headers(self.headers());
        let body = self.execute("DELETE", &url, req).await?;
        if body.text.trim().is_empty() {
            return Ok(MessageResponse::default());
        }
        decode(&url, body)
    }

    async fn execute(&self, method: &'static str, url: &str, req: RequestBuilder) -> Result<Body> {
        let res = req.send().await.map_err(|source| BackendError::Transport {
            method,
            url: url.to_string(),
            source,
        })?;
        let status = res.status();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(BackendError::Status {
                method,
                url: url.to_string(),
                status,
                content_type,
                detail: detail_message(&text),
                body: text,
            });
        }
        Ok(Body { content_type, text })
    }
}

struct Body {
    content_type: String,
    text: String,
}

fn decode<T: DeserializeOwned>(url: &str, body: Body) -> Result<T> {
    serde_json::from_str::<T>(&body.text).map_err(|e| BackendError::Decode {
        url: url.to_string(),
        message: e.to_string(),
        content_type: body.content_type,
        body: body.text,
    })
}
