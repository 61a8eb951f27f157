use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::app::AppEvent;
use crate::app::AppEventTx;
use crate::app::Notice;
use crate::app::SharedBackend;
use crate::app::with_timeout;
use crate::staging::FileStaging;
use crate::staging::StagedFile;
use crate::staging::StagedFileId;
use kbase_client::DocumentBackend;
use kbase_client::UploadFile;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const EMPTY_SELECTION_HINT: &str = "Please select files to upload.";
const GENERIC_UPLOAD_FAILURE: &str = "Upload failed";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadSummary {
    pub accepted_count: usize,
    pub server_message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadError {
    pub message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Started { batch: u64, file_count: usize },
    /// Nothing staged; a hint was recorded and no request was sent.
    NothingStaged,
    /// An upload is already running.
    Busy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum UploadPhase {
    Idle,
    Uploading {
        batch: u64,
        files: Vec<StagedFileId>,
    },
}

/// Sends the staged set as one batch and announces completed uploads.
pub struct UploadCoordinator {
    phase: UploadPhase,
    next_batch: u64,
    completed: watch::Sender<u64>,
    last_outcome: Option<Result<UploadSummary, UploadError>>,
    hint: Option<&'static str>,
    timeout: Duration,
}

impl UploadCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (completed, _) = watch::channel(0);
        Self {
            phase: UploadPhase::Idle,
            next_batch: 0,
            completed,
            last_outcome: None,
            hint: None,
            timeout,
        }
    }

    /// Observe successful uploads. The value counts completions; each change
    /// is one "files changed" signal.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.completed.subscribe()
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Uploading { .. })
    }

    pub fn last_outcome(&self) -> Option<&Result<UploadSummary, UploadError>> {
        self.last_outcome.as_ref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint
    }

    pub fn commit(
        &mut self,
        staging: &FileStaging,
        backend: &SharedBackend,
        tx: &AppEventTx,
    ) -> CommitOutcome {
        if staging.is_empty() {
            self.hint = Some(EMPTY_SELECTION_HINT);
            return CommitOutcome::NothingStaged;
        }
        if self.is_uploading() {
            debug!("upload.busy: ignoring commit");
            return CommitOutcome::Busy;
        }
        self.hint = None;

        let staged = staging.snapshot();
        let ids: Vec<StagedFileId> = staged.iter().map(|f| f.id).collect();
        let files: Vec<UploadFile> = staged.iter().map(StagedFile::to_upload).collect();
        let file_count = files.len();
        self.next_batch += 1;
        let batch = self.next_batch;
        self.phase = UploadPhase::Uploading { batch, files: ids };
        info!("upload.start: batch={batch} files={file_count}");

        let backend = Arc::clone(backend);
        let tx = tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = upload_batch(backend.as_ref(), files, timeout).await;
            let _ = tx.send(AppEvent::UploadFinished { batch, result });
        });
        CommitOutcome::Started { batch, file_count }
    }

    /// Settle a batch. Success drops the committed files from `staging` and
    /// bumps the completion counter; failure leaves the staged set intact.
    pub fn apply_finished(
        &mut self,
        batch: u64,
        result: Result<UploadSummary, UploadError>,
        staging: &mut FileStaging,
    ) -> Option<Notice> {
        let files = match &mut self.phase {
            UploadPhase::Uploading {
                batch: current,
                files,
            } if *current == batch => std::mem::take(files),
            _ => {
                debug!("upload.drop: batch={batch}");
                return None;
            }
        };
        self.phase = UploadPhase::Idle;

        let notice = match &result {
            Ok(summary) => {
                staging.remove_committed(&files);
                self.completed.send_modify(|n| *n += 1);
                info!(
                    "upload.finished: batch={batch} accepted={}",
                    summary.accepted_count
                );
                Notice::success(format!("Uploaded {} file(s)", summary.accepted_count))
            }
            Err(err) => {
                warn!("upload.failed: batch={batch} error={err}");
                Notice::error(err.message.clone())
            }
        };
        self.last_outcome = Some(result);
        Some(notice)
    }

    /// Forget the in-flight batch; its completion will be dropped.
    pub fn reset(&mut self) {
        self.phase = UploadPhase::Idle;
        self.last_outcome = None;
        self.hint = None;
    }
}

/// One multipart request carrying every file.
pub async fn upload_batch(
    backend: &dyn DocumentBackend,
    files: Vec<UploadFile>,
    timeout: Duration,
) -> Result<UploadSummary, UploadError> {
    match with_timeout(timeout, backend.upload_files(files)).await {
        Ok(receipt) => Ok(UploadSummary {
            accepted_count: receipt.accepted_count,
            server_message: receipt.message,
        }),
        Err(err) => Err(UploadError::new(err.user_message(GENERIC_UPLOAD_FAILURE))),
    }
}
