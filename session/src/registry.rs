//! Cached view of the files the server already holds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::app::AppEvent;
use crate::app::AppEventTx;
use crate::app::Notice;
use crate::app::SharedBackend;
use crate::app::with_timeout;
use kbase_client::DocumentBackend;
use kbase_client::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

const GENERIC_DELETE_FAILURE: &str = "Delete failed";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFileEntry {
    pub name: String,
}

impl RemoteFileEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// What the file panel should show right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryView<'a> {
    Loading,
    Failed(&'a str),
    Empty,
    Loaded(&'a [RemoteFileEntry]),
}

/// Entry removed ahead of server confirmation, kept for rollback.
#[derive(Debug)]
struct OptimisticRemoval {
    name: String,
    /// Position in the list as last loaded, not the visible one.
    slot: usize,
    cache_version: u64,
}

pub struct RemoteFileRegistry {
    files: Vec<RemoteFileEntry>,
    /// Bumped whenever `files` is replaced wholesale.
    cache_version: u64,
    generation: u64,
    loading: bool,
    inflight: Option<JoinHandle<()>>,
    error: Option<String>,
    triggers: Vec<watch::Receiver<u64>>,
    pending_delete: Option<String>,
    deletes: HashMap<u64, OptimisticRemoval>,
    /// Slots of the loaded list currently hidden by a delete, pending or
    /// confirmed. Cleared whenever `files` is replaced.
    vacated: Vec<usize>,
    next_delete_op: u64,
    timeout: Duration,
}

impl RemoteFileRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            files: Vec::new(),
            cache_version: 0,
            generation: 0,
            loading: false,
            inflight: None,
            error: None,
            triggers: Vec::new(),
            pending_delete: None,
            deletes: HashMap::new(),
            vacated: Vec::new(),
            next_delete_op: 0,
            timeout,
        }
    }

    /// Register a "files changed" signal. Every change seen by
    /// [`Self::poll_triggers`] starts a refresh.
    pub fn watch_trigger(&mut self, rx: watch::Receiver<u64>) {
        self.triggers.push(rx);
    }

    /// Consume pending trigger changes; refreshes once if any fired.
    pub fn poll_triggers(&mut self, backend: &SharedBackend, tx: &AppEventTx) -> bool {
        let mut fired = false;
        for rx in &mut self.triggers {
            if rx.has_changed().unwrap_or(false) {
                let seen = *rx.borrow_and_update();
                debug!("refresh.trigger: value={seen}");
                fired = true;
            }
        }
        if fired {
            self.refresh(backend, tx);
        }
        fired
    }

    /// Start a new list request. A request still in flight is abandoned and
    /// its response, should it arrive, is ignored.
    pub fn refresh(&mut self, backend: &SharedBackend, tx: &AppEventTx) -> u64 {
        self.generation += 1;
        let generation = self.generation;
        if let Some(previous) = self.inflight.take() {
            debug!("refresh.cancel: superseded by generation={generation}");
            previous.abort();
        }
        self.loading = true;
        self.error = None;

        let backend = Arc::clone(backend);
        let tx = tx.clone();
        let timeout = self.timeout;
        self.inflight = Some(tokio::spawn(async move {
            let result = fetch_files(backend.as_ref(), timeout).await;
            let _ = tx.send(AppEvent::FilesLoaded { generation, result });
        }));
        generation
    }

    /// Apply a list response; returns false when it belongs to an older
    /// generation.
    pub fn apply_loaded(
        &mut self,
        generation: u64,
        result: Result<Vec<RemoteFileEntry>, Error>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                "refresh.drop: generation={generation} current={}",
                self.generation
            );
            return false;
        }
        self.loading = false;
        self.inflight = None;
        match result {
            Ok(files) => {
                info!("refresh.apply: generation={generation} files={}", files.len());
                self.files = files;
                self.cache_version += 1;
                self.vacated.clear();
                self.error = None;
            }
            Err(err) => {
                warn!("refresh.failed: generation={generation} error={err}");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn view(&self) -> RegistryView<'_> {
        if self.loading {
            RegistryView::Loading
        } else if let Some(err) = &self.error {
            RegistryView::Failed(err)
        } else if self.files.is_empty() {
            RegistryView::Empty
        } else {
            RegistryView::Loaded(&self.files)
        }
    }

    pub fn files(&self) -> &[RemoteFileEntry] {
        &self.files
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A list request or a delete is outstanding.
    pub fn is_busy(&self) -> bool {
        self.loading || !self.deletes.is_empty()
    }

    /// First half of the confirm-then-delete flow.
    pub fn request_delete(&mut self, name: &str) -> bool {
        if !self.files.iter().any(|f| f.name == name) {
            return false;
        }
        self.pending_delete = Some(name.to_string());
        true
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn cancel_delete(&mut self) -> Option<String> {
        self.pending_delete.take()
    }

    pub fn confirm_delete(&mut self, backend: &SharedBackend, tx: &AppEventTx) -> Option<u64> {
        let name = self.pending_delete.take()?;
        self.start_delete(name, backend, tx)
    }

    /// Delete without the confirmation step; the caller has already asked.
    pub fn delete_entry(
        &mut self,
        name: &str,
        backend: &SharedBackend,
        tx: &AppEventTx,
    ) -> Option<u64> {
        self.start_delete(name.to_string(), backend, tx)
    }

    fn start_delete(
        &mut self,
        name: String,
        backend: &SharedBackend,
        tx: &AppEventTx,
    ) -> Option<u64> {
        let index = self.files.iter().position(|f| f.name == name)?;
        self.files.remove(index);
        let slot = self.slot_of(index);
        self.vacated.push(slot);
        self.next_delete_op += 1;
        let op = self.next_delete_op;
        info!("delete.start: op={op} name={name}");
        self.deletes.insert(
            op,
            OptimisticRemoval {
                name: name.clone(),
                slot,
                cache_version: self.cache_version,
            },
        );

        let backend = Arc::clone(backend);
        let tx = tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = with_timeout(timeout, backend.delete_file(&name)).await;
            let _ = tx.send(AppEvent::DeleteFinished { op, result });
        });
        Some(op)
    }

    /// Settle a delete. On failure the entry goes back where it was unless the
    /// list has been replaced since; either way a refresh reconciles with the
    /// server.
    pub fn apply_deleted(
        &mut self,
        op: u64,
        result: Result<(), Error>,
        backend: &SharedBackend,
        tx: &AppEventTx,
    ) -> Option<Notice> {
        let Some(removal) = self.deletes.remove(&op) else {
            debug!("delete.drop: op={op}");
            return None;
        };
        let notice = match result {
            Ok(()) => {
                info!("delete.done: op={op} name={}", removal.name);
                Notice::success(format!("Deleted {}", removal.name))
            }
            Err(err) => {
                warn!("delete.failed: op={op} name={} error={err}", removal.name);
                if removal.cache_version == self.cache_version {
                    self.vacated.retain(|&v| v != removal.slot);
                    let index = self.index_of(removal.slot).min(self.files.len());
                    self.files
                        .insert(index, RemoteFileEntry::new(removal.name.clone()));
                }
                Notice::error(format!(
                    "Failed to delete {}: {}",
                    removal.name,
                    err.user_message(GENERIC_DELETE_FAILURE)
                ))
            }
        };
        self.refresh(backend, tx);
        Some(notice)
    }

    /// Map a visible index to its slot in the loaded list.
    fn slot_of(&self, index: usize) -> usize {
        let mut vacated = self.vacated.clone();
        vacated.sort_unstable();
        let mut slot = index;
        for v in vacated {
            if v <= slot {
                slot += 1;
            }
        }
        slot
    }

    /// Visible index a restored slot goes back to.
    fn index_of(&self, slot: usize) -> usize {
        slot - self.vacated.iter().filter(|&&v| v < slot).count()
    }

    pub fn reset(&mut self) {
        if let Some(previous) = self.inflight.take() {
            previous.abort();
        }
        self.generation += 1;
        self.cache_version += 1;
        self.loading = false;
        self.error = None;
        self.files.clear();
        self.pending_delete = None;
        self.deletes.clear();
        self.vacated.clear();
    }
}

pub async fn fetch_files(
    backend: &dyn DocumentBackend,
    timeout: Duration,
) -> Result<Vec<RemoteFileEntry>, Error> {
    let names = with_timeout(timeout, backend.list_files()).await?;
    Ok(names.into_iter().map(RemoteFileEntry::new).collect())
}
