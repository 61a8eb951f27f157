use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::conversation::Conversation;
use crate::conversation::SubmitOutcome;
use crate::registry::RemoteFileEntry;
use crate::registry::RemoteFileRegistry;
use crate::staging::Candidate;
use crate::staging::FileStaging;
use crate::staging::Rejection;
use crate::staging::StagedFile;
use crate::upload::CommitOutcome;
use crate::upload::UploadCoordinator;
use crate::upload::UploadError;
use crate::upload::UploadSummary;
use kbase_client::Answer;
use kbase_client::DocumentBackend;
use kbase_client::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::watch;
use tracing::debug;

pub type SharedBackend = Arc<dyn DocumentBackend>;

/// Internal app events delivered from background tasks.
/// Each carries the token of the request that produced it so late arrivals
/// can be recognized and dropped.
#[derive(Debug)]
pub enum AppEvent {
    AnswerReady {
        turn: u64,
        result: Result<Answer, Error>,
    },
    UploadFinished {
        batch: u64,
        result: Result<UploadSummary, UploadError>,
    },
    FilesLoaded {
        generation: u64,
        result: Result<Vec<RemoteFileEntry>, Error>,
    },
    DeleteFinished {
        op: u64,
        result: Result<(), Error>,
    },
}

pub type AppEventTx = UnboundedSender<AppEvent>;
pub type AppEventRx = UnboundedReceiver<AppEvent>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// One user-visible outcome notification (upload or delete).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Bound a backend call; expiry surfaces as [`Error::Timeout`].
pub(crate) async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(limit)))
}

/// Page-session container. Owns the components and the event channel and
/// only delegates; every state change happens on the caller's task.
pub struct Session {
    backend: SharedBackend,
    tx: AppEventTx,
    rx: AppEventRx,
    conversation: Conversation,
    staging: FileStaging,
    uploader: UploadCoordinator,
    registry: RemoteFileRegistry,
    refresh_trigger: watch::Sender<u64>,
    notices: VecDeque<Notice>,
}

impl Session {
    pub fn new(backend: SharedBackend, config: &SessionConfig) -> Self {
        let (tx, rx) = unbounded_channel();
        let (refresh_trigger, manual_rx) = watch::channel(0u64);
        let uploader = UploadCoordinator::new(config.upload_timeout);
        let mut registry = RemoteFileRegistry::new(config.list_timeout);
        registry.watch_trigger(uploader.subscribe());
        registry.watch_trigger(manual_rx);
        Self {
            backend,
            tx,
            rx,
            conversation: Conversation::new(config.query_timeout),
            staging: FileStaging::new(config.max_file_bytes),
            uploader,
            registry,
            refresh_trigger,
            notices: VecDeque::new(),
        }
    }

    /// Initial fetch of the server file list.
    pub fn start(&mut self) -> u64 {
        self.registry.refresh(&self.backend, &self.tx)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn staging(&self) -> &FileStaging {
        &self.staging
    }

    pub fn uploader(&self) -> &UploadCoordinator {
        &self.uploader
    }

    pub fn registry(&self) -> &RemoteFileRegistry {
        &self.registry
    }

    pub fn submit(&mut self, question: &str) -> SubmitOutcome {
        self.conversation.submit(question, &self.backend, &self.tx)
    }

    pub fn add_candidates<I>(&mut self, candidates: I) -> Vec<Rejection>
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.staging.add_candidates(candidates)
    }

    pub fn remove_candidate(&mut self, index: usize) -> Option<StagedFile> {
        self.staging.remove_candidate(index)
    }

    pub fn clear_staged(&mut self) {
        self.staging.clear();
    }

    pub fn commit_upload(&mut self) -> CommitOutcome {
        self.uploader.commit(&self.staging, &self.backend, &self.tx)
    }

    pub fn request_delete(&mut self, name: &str) -> bool {
        self.registry.request_delete(name)
    }

    pub fn confirm_delete(&mut self) -> Option<u64> {
        self.registry.confirm_delete(&self.backend, &self.tx)
    }

    pub fn cancel_delete(&mut self) -> Option<String> {
        self.registry.cancel_delete()
    }

    /// User-initiated refresh of the file list (the retry action).
    pub fn retry_files(&mut self) -> bool {
        self.refresh_trigger.send_modify(|n| *n += 1);
        self.registry.poll_triggers(&self.backend, &self.tx)
    }

    /// True when no request of any kind is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.conversation.is_pending() && !self.uploader.is_uploading() && !self.registry.is_busy()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AnswerReady { turn, result } => {
                self.conversation.apply_answer(turn, result);
            }
            AppEvent::UploadFinished { batch, result } => {
                if let Some(notice) = self.uploader.apply_finished(batch, result, &mut self.staging)
                {
                    self.notices.push_back(notice);
                }
                self.registry.poll_triggers(&self.backend, &self.tx);
            }
            AppEvent::FilesLoaded { generation, result } => {
                self.registry.apply_loaded(generation, result);
            }
            AppEvent::DeleteFinished { op, result } => {
                if let Some(notice) =
                    self.registry.apply_deleted(op, result, &self.backend, &self.tx)
                {
                    self.notices.push_back(notice);
                }
            }
        }
    }

    /// Apply events until nothing is in flight.
    pub async fn settle(&mut self) {
        while !self.is_idle() {
            match self.rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    /// Start over as if the page were reloaded. Outstanding requests keep
    /// running but their completions no longer match any live token.
    pub fn reset(&mut self) {
        debug!("session.reset");
        self.conversation.reset();
        self.staging.clear();
        self.uploader.reset();
        self.registry.reset();
        self.notices.clear();
    }
}
