use crate::Answer;
use crate::DocumentBackend;
use crate::Error;
use crate::Result;
use crate::UploadFile;
use crate::UploadReceipt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Number of calls observed per endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MockCalls {
    pub ask: usize,
    pub list: usize,
    pub upload: usize,
    pub delete: usize,
}

#[derive(Default)]
struct MockState {
    files: Vec<String>,
    answers: VecDeque<Result<Answer>>,
    list_failures: VecDeque<Error>,
    upload_failures: VecDeque<Error>,
    delete_failures: VecDeque<Error>,
    ask_delay: Option<Duration>,
    calls: MockCalls,
}

/// In-memory backend: keeps an uploaded-file list and answers from scripted
/// replies, falling back to a canned answer that cites every stored file.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = MockState {
            files: files.into_iter().map(Into::into).collect(),
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn push_answer(&self, answer: Result<Answer>) {
        self.state.lock().await.answers.push_back(answer);
    }

    pub async fn fail_next_list(&self, err: Error) {
        self.state.lock().await.list_failures.push_back(err);
    }

    pub async fn fail_next_upload(&self, err: Error) {
        self.state.lock().await.upload_failures.push_back(err);
    }

    pub async fn fail_next_delete(&self, err: Error) {
        self.state.lock().await.delete_failures.push_back(err);
    }

    /// Hold every answer for `delay` before replying.
    pub async fn set_ask_delay(&self, delay: Duration) {
        self.state.lock().await.ask_delay = Some(delay);
    }

    pub async fn files(&self) -> Vec<String> {
        self.state.lock().await.files.clone()
    }

    pub async fn calls(&self) -> MockCalls {
        self.state.lock().await.calls
    }
}

#[async_trait::async_trait]
impl DocumentBackend for MockClient {
    async fn ask(&self, query: &str) -> Result<Answer> {
        let (scripted, delay, files) = {
            let mut state = self.state.lock().await;
            state.calls.ask += 1;
            (
                state.answers.pop_front(),
                state.ask_delay,
                state.files.clone(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(answer) = scripted {
            return answer;
        }
        if files.is_empty() {
            return Ok(Answer::new(
                "No documents found. Please upload documents first.",
            ));
        }
        Ok(Answer {
            text: format!(
                "Mock answer for \"{}\" based on {} document(s).",
                query.trim(),
                files.len()
            ),
            sources: files,
        })
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        state.calls.list += 1;
        if let Some(err) = state.list_failures.pop_front() {
            return Err(err);
        }
        Ok(state.files.clone())
    }

    async fn upload_files(&self, files: Vec<UploadFile>) -> Result<UploadReceipt> {
        let mut state = self.state.lock().await;
        state.calls.upload += 1;
        if let Some(err) = state.upload_failures.pop_front() {
            return Err(err);
        }
        let names: Vec<String> = files.into_iter().map(|f| f.name).collect();
        let message = format!("Successfully uploaded {names:?}");
        let accepted_count = names.len();
        for name in names {
            // The server overwrites same-named files.
            if !state.files.contains(&name) {
                state.files.push(name);
            }
        }
        Ok(UploadReceipt {
            accepted_count,
            message: Some(message),
        })
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.delete += 1;
        if let Some(err) = state.delete_failures.pop_front() {
            return Err(err);
        }
        let Some(pos) = state.files.iter().position(|f| f == name) else {
            return Err(Error::server(404, Some("File not found".to_string())));
        };
        state.files.remove(pos);
        Ok(())
    }
}
