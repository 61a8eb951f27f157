//! Client-side file selection: validation and the staged set awaiting upload.

use bytes::Bytes;
use kbase_client::FileContent;
use kbase_client::UploadFile;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

/// Extensions the backend knows how to extract text from.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "doc", "docx"];

/// Advertised per-file ceiling (10 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Stable identifier assigned to each staged file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct StagedFileId(u64);

impl StagedFileId {
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A file offered by the picker or a drop, not yet validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub size_bytes: u64,
    pub content: FileContent,
}

impl Candidate {
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            size_bytes: metadata.len(),
            content: FileContent::Path(PathBuf::from(path)),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            content: FileContent::Bytes(bytes),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    pub id: StagedFileId,
    pub name: String,
    pub size_bytes: u64,
    pub content: FileContent,
}

impl StagedFile {
    pub fn to_upload(&self) -> UploadFile {
        UploadFile {
            name: self.name.clone(),
            content: self.content.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedExtension { extension: Option<String> },
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

/// Why a candidate never made it into the staged set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub name: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectReason::UnsupportedExtension { extension: Some(ext) } => write!(
                f,
                "{}: .{ext} files are not supported (allowed: {})",
                self.name,
                allowed_list()
            ),
            RejectReason::UnsupportedExtension { extension: None } => write!(
                f,
                "{}: file has no extension (allowed: {})",
                self.name,
                allowed_list()
            ),
            RejectReason::TooLarge {
                size_bytes,
                max_bytes,
            } => write!(
                f,
                "{}: {} exceeds the {} limit",
                self.name,
                format_bytes(*size_bytes),
                format_bytes(*max_bytes)
            ),
        }
    }
}

fn allowed_list() -> String {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text after the final `.`, lowercased. `None` when the name has no dot.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub fn is_allowed_extension(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[derive(Debug)]
pub struct FileStaging {
    staged: Vec<StagedFile>,
    next_id: u64,
    max_file_bytes: u64,
    last_rejections: Vec<Rejection>,
}

impl Default for FileStaging {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_BYTES)
    }
}

impl FileStaging {
    pub fn new(max_file_bytes: u64) -> Self {
        Self {
            staged: Vec::new(),
            next_id: 0,
            max_file_bytes,
            last_rejections: Vec::new(),
        }
    }

    fn validate(&self, candidate: &Candidate) -> Result<(), RejectReason> {
        if !is_allowed_extension(&candidate.name) {
            return Err(RejectReason::UnsupportedExtension {
                extension: extension_of(&candidate.name),
            });
        }
        if candidate.size_bytes > self.max_file_bytes {
            return Err(RejectReason::TooLarge {
                size_bytes: candidate.size_bytes,
                max_bytes: self.max_file_bytes,
            });
        }
        Ok(())
    }

    /// Stage every valid candidate in order; the rest are returned with a reason.
    pub fn add_candidates<I>(&mut self, candidates: I) -> Vec<Rejection>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut rejected = Vec::new();
        for candidate in candidates {
            match self.validate(&candidate) {
                Ok(()) => {
                    self.next_id += 1;
                    self.staged.push(StagedFile {
                        id: StagedFileId(self.next_id),
                        name: candidate.name,
                        size_bytes: candidate.size_bytes,
                        content: candidate.content,
                    });
                }
                Err(reason) => {
                    tracing::debug!("staging.reject: name={} reason={reason:?}", candidate.name);
                    rejected.push(Rejection {
                        name: candidate.name,
                        reason,
                    });
                }
            }
        }
        self.last_rejections = rejected.clone();
        rejected
    }

    pub fn remove_candidate(&mut self, index: usize) -> Option<StagedFile> {
        if index >= self.staged.len() {
            return None;
        }
        Some(self.staged.remove(index))
    }

    pub fn clear(&mut self) {
        self.staged.clear();
        self.last_rejections.clear();
    }

    /// Drop the files an upload carried; anything staged meanwhile stays.
    pub(crate) fn remove_committed(&mut self, ids: &[StagedFileId]) {
        self.staged.retain(|f| !ids.contains(&f.id));
        if self.staged.is_empty() {
            self.last_rejections.clear();
        }
    }

    pub fn snapshot(&self) -> Vec<StagedFile> {
        self.staged.clone()
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    pub fn last_rejections(&self) -> &[Rejection] {
        &self.last_rejections
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.staged.iter().map(|f| f.size_bytes).sum()
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }
}
