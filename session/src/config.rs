use std::time::Duration;

use anyhow::Context as _;
use kbase_client::PathStyle;
use url::Url;

use crate::staging::DEFAULT_MAX_FILE_BYTES;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const BASE_URL_ENV_VAR: &str = "KBASE_BASE_URL";
pub const PATH_STYLE_ENV_VAR: &str = "KBASE_PATH_STYLE";
pub const MODE_ENV_VAR: &str = "KBASE_MODE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub base_url: String,
    pub path_style: PathStyle,
    pub query_timeout: Duration,
    pub list_timeout: Duration,
    pub upload_timeout: Duration,
    pub max_file_bytes: u64,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path_style: PathStyle::default(),
            query_timeout: Duration::from_secs(120),
            list_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            user_agent: format!("kbase/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(base_url) = non_blank(BASE_URL_ENV_VAR) {
            config.base_url = normalize_base_url(&base_url)
                .with_context(|| format!("invalid {BASE_URL_ENV_VAR}"))?;
        }
        if let Some(style) = non_blank(PATH_STYLE_ENV_VAR) {
            config.path_style = parse_path_style(&style).with_context(|| {
                format!("invalid {PATH_STYLE_ENV_VAR} {style:?} (expected documents or files)")
            })?;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> anyhow::Result<Self> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }
}

/// Validate an http(s) URL and drop trailing slashes.
pub fn normalize_base_url(input: &str) -> anyhow::Result<String> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).with_context(|| format!("not a URL: {trimmed}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("unsupported scheme {:?} in {trimmed}", url.scheme());
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

pub fn parse_path_style(value: &str) -> Option<PathStyle> {
    match value.trim().to_ascii_lowercase().as_str() {
        "documents" | "docs" => Some(PathStyle::Documents),
        "files" => Some(PathStyle::Files),
        _ => None,
    }
}

/// `KBASE_MODE=mock` selects the in-memory backend.
pub fn mock_mode_from_env() -> bool {
    matches!(
        std::env::var(MODE_ENV_VAR).ok().as_deref(),
        Some("mock") | Some("MOCK")
    )
}
