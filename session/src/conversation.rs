use std::sync::Arc;
use std::time::Duration;

use crate::app::AppEvent;
use crate::app::AppEventTx;
use crate::app::SharedBackend;
use crate::app::with_timeout;
use crate::rich_text::Block;
use crate::rich_text::Inline;
use crate::rich_text::parse_answer;
use kbase_client::Answer;
use kbase_client::DocumentBackend;
use kbase_client::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

const GENERIC_QUERY_FAILURE: &str = "An error occurred.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

/// One transcript entry. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    sender: Sender,
    text: String,
    sources: Vec<String>,
    failed: bool,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            sources: Vec::new(),
            failed: false,
        }
    }

    pub fn assistant(answer: Answer) -> Self {
        Self {
            sender: Sender::Assistant,
            text: answer.text,
            sources: answer.sources,
            failed: false,
        }
    }

    /// Assistant-side entry describing a failed query.
    pub fn failure(detail: &str) -> Self {
        Self {
            sender: Sender::Assistant,
            text: format!("Error: {detail}"),
            sources: Vec::new(),
            failed: true,
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Display blocks. Only successful assistant answers get markup; each
    /// distinct source is appended as a citation.
    pub fn blocks(&self) -> Vec<Block> {
        if self.sender == Sender::User || self.failed {
            return vec![Block::Paragraph(vec![Inline::Text(self.text.clone())])];
        }
        let mut blocks = parse_answer(&self.text);
        let mut seen: Vec<&str> = Vec::new();
        for source in &self.sources {
            if !seen.contains(&source.as_str()) {
                seen.push(source);
                blocks.push(Block::Citation(source.clone()));
            }
        }
        blocks
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Pending { turn: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { turn: u64 },
    /// Whitespace-only input; nothing happened.
    Blank,
    /// A previous question is still unanswered.
    Busy,
}

/// Ordered transcript plus the single outstanding query, if any.
pub struct Conversation {
    messages: Vec<Message>,
    phase: TurnPhase,
    next_turn: u64,
    last_error: Option<String>,
    timeout: Duration,
}

impl Conversation {
    pub fn new(timeout: Duration) -> Self {
        Self {
            messages: Vec::new(),
            phase: TurnPhase::Idle,
            next_turn: 0,
            last_error: None,
            timeout,
        }
    }

    /// Append the question and start a query for it.
    pub fn submit(
        &mut self,
        question: &str,
        backend: &SharedBackend,
        tx: &AppEventTx,
    ) -> SubmitOutcome {
        if question.trim().is_empty() {
            return SubmitOutcome::Blank;
        }
        if self.is_pending() {
            debug!("conversation.busy: ignoring submit");
            return SubmitOutcome::Busy;
        }
        self.messages.push(Message::user(question));
        self.last_error = None;
        self.next_turn += 1;
        let turn = self.next_turn;
        self.phase = TurnPhase::Pending { turn };
        info!("conversation.submit: turn={turn}");

        let backend = Arc::clone(backend);
        let tx = tx.clone();
        let question = question.to_string();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = ask(backend.as_ref(), &question, timeout).await;
            let _ = tx.send(AppEvent::AnswerReady { turn, result });
        });
        SubmitOutcome::Submitted { turn }
    }

    /// Settle the pending turn. Returns false for a completion that does not
    /// match it.
    pub fn apply_answer(&mut self, turn: u64, result: Result<Answer, Error>) -> bool {
        if self.phase != (TurnPhase::Pending { turn }) {
            debug!("conversation.drop: turn={turn} phase={:?}", self.phase);
            return false;
        }
        self.phase = TurnPhase::Idle;
        match result {
            Ok(answer) => {
                info!(
                    "conversation.answer: turn={turn} sources={}",
                    answer.sources.len()
                );
                self.messages.push(Message::assistant(answer));
            }
            Err(err) => {
                warn!("conversation.failed: turn={turn} error={err}");
                let detail = err.user_message(GENERIC_QUERY_FAILURE);
                self.messages.push(Message::failure(&detail));
                self.last_error = Some(detail);
            }
        }
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, TurnPhase::Pending { .. })
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Plain-text export, one `Sender: text` block per message.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for message in &self.messages {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(message.sender.label());
            out.push_str(": ");
            out.push_str(&message.text);
            for source in &message.sources {
                out.push_str("\n  Source: ");
                out.push_str(source);
            }
        }
        out
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.phase = TurnPhase::Idle;
        self.last_error = None;
    }
}

pub async fn ask(
    backend: &dyn DocumentBackend,
    question: &str,
    timeout: Duration,
) -> Result<Answer, Error> {
    with_timeout(timeout, backend.ask(question)).await
}
