//! The chat session controller.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::transcript::{Entry, Transcript};
use crate::attachment::Attachment;
use crate::backend::{ChatBackend, ChatRequest};
use crate::error::{self, Error, REQUEST_FAILED_MESSAGE};
use crate::stream::{ContextSource, ResponseEvent};

/// Where the controller is in the `idle -> sending -> idle` cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Sending,
}

/// Text and file waiting to be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl Draft {
    /// Blank text and no file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}

/// Why an input action was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    /// Nothing to send.
    #[error("nothing to send")]
    Empty,
    /// A request is already pending; input controls are disabled.
    #[error("a request is already in flight")]
    InFlight,
}

/// How a driven exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Owns the UI state of one chat session.
///
/// At most one exchange is in flight: [`ChatController::begin_submit`]
/// refuses while sending, and [`ChatController::send_with`] holds the
/// controller mutably until the exchange ends.
#[derive(Debug)]
pub struct ChatController {
    id: String,
    created_at: DateTime<Utc>,
    transcript: Transcript,
    draft: Draft,
    phase: Phase,
    error: Option<String>,
    /// Index of the assistant entry the current exchange writes into.
    reply_slot: Option<usize>,
    sources: Vec<ContextSource>,
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatController {
    #[must_use]
    pub fn new() -> Self {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        debug!(name: "session.started", session = %id, created_at = %created_at.to_rfc3339(), "Session started");

        Self {
            id,
            created_at,
            transcript: Transcript::new(),
            draft: Draft::default(),
            phase: Phase::Idle,
            error: None,
            reply_slot: None,
            sources: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The in-flight flag.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Sending
    }

    /// User-visible error from the last exchange, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Passages reported with the most recent answer.
    pub fn last_sources(&self) -> &[ContextSource] {
        &self.sources
    }

    /// Whether the send control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.draft.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Draft edits
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_draft(&mut self, text: impl Into<String>) -> Result<(), SubmitRejected> {
        self.ensure_idle()?;
        self.draft.text = text.into();
        Ok(())
    }

    pub fn attach(&mut self, attachment: Attachment) -> Result<(), SubmitRejected> {
        self.ensure_idle()?;
        debug!(name: "chat.attach", session = %self.id, file = %attachment.file_name(), "File attached");
        self.draft.attachment = Some(attachment);
        Ok(())
    }

    pub fn detach(&mut self) -> Result<Option<Attachment>, SubmitRejected> {
        self.ensure_idle()?;
        Ok(self.draft.attachment.take())
    }

    fn ensure_idle(&self) -> Result<(), SubmitRejected> {
        if self.is_loading() {
            return Err(SubmitRejected::InFlight);
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Exchange transitions
    // ─────────────────────────────────────────────────────────────────────

    /// Accept the draft: echo it into the transcript and enter `Sending`.
    pub fn begin_submit(&mut self) -> Result<ChatRequest, SubmitRejected> {
        self.ensure_idle()?;
        if self.draft.is_empty() {
            return Err(SubmitRejected::Empty);
        }

        let message = self.draft.text.clone();
        let attachment = self.draft.attachment.clone();
        let file_name = attachment.as_ref().map(|a| a.file_name().to_string());

        info!(
            name: "chat.submit",
            session = %self.id,
            chars = message.chars().count(),
            file = file_name.as_deref().unwrap_or(""),
            "Submitting message"
        );

        self.transcript.push(Entry::user(message.clone(), file_name));
        self.phase = Phase::Sending;
        self.error = None;
        self.reply_slot = None;
        self.sources.clear();

        Ok(ChatRequest {
            message,
            attachment,
            messages: self.transcript.turns(),
        })
    }

    /// Fold one response event into the assistant entry.
    ///
    /// Events arriving outside an exchange (after cancel) are dropped.
    pub fn apply(&mut self, event: ResponseEvent) {
        if !self.is_loading() {
            debug!(name: "chat.event.dropped", session = %self.id, "Event outside an exchange");
            return;
        }

        match event {
            ResponseEvent::Delta { text } => {
                let idx = self.reply_index();
                self.transcript.append_to(idx, &text);
            }
            ResponseEvent::Answer { text, sources } => {
                let idx = self.reply_index();
                self.transcript.set_content(idx, text);
                self.sources = sources;
            }
        }
    }

    fn reply_index(&mut self) -> usize {
        *self
            .reply_slot
            .get_or_insert_with(|| self.transcript.push(Entry::assistant("")))
    }

    /// Successful end of stream.
    pub fn finish(&mut self) {
        if !self.is_loading() {
            return;
        }
        // A stream with no bytes still produces an (empty) reply.
        let idx = self.reply_index();
        info!(
            name: "chat.exchange.completed",
            session = %self.id,
            chars = self.transcript.entries()[idx].content.chars().count(),
            "Exchange completed"
        );
        self.end_exchange();
    }

    /// Request-level failure: one static message, user entry kept.
    pub fn fail(&mut self, err: &Error) {
        if !self.is_loading() {
            return;
        }
        warn!(name: "chat.exchange.failed", session = %self.id, error = %err, "Exchange failed");
        self.error = Some(REQUEST_FAILED_MESSAGE.to_string());
        self.end_exchange();
    }

    /// Abandon the exchange; text received so far stays in the transcript.
    pub fn cancel(&mut self) {
        if !self.is_loading() {
            return;
        }
        info!(name: "chat.exchange.cancelled", session = %self.id, "Exchange cancelled");
        self.end_exchange();
    }

    fn end_exchange(&mut self) {
        self.phase = Phase::Idle;
        self.reply_slot = None;
        self.draft = Draft::default();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Driving an exchange
    // ─────────────────────────────────────────────────────────────────────

    /// Submit the draft and consume the whole reply.
    pub async fn send(&mut self, backend: &dyn ChatBackend) -> Result<ExchangeOutcome, SubmitRejected> {
        self.send_with(backend, &CancellationToken::new(), |_| {}).await
    }

    /// Submit the draft, reporting each event to `observer` as it is applied.
    ///
    /// Cancelling `cancel` drops the response stream, which closes the
    /// connection; no further events are applied.
    pub async fn send_with<F>(
        &mut self,
        backend: &dyn ChatBackend,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> Result<ExchangeOutcome, SubmitRejected>
    where
        F: FnMut(&ResponseEvent),
    {
        let request = self.begin_submit()?;

        let result = {
            let exchange = self.consume(backend, request, &mut observer);
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = exchange => Some(result),
            }
        };

        let outcome = match result {
            None => {
                self.cancel();
                ExchangeOutcome::Cancelled
            }
            Some(Ok(())) => {
                self.finish();
                ExchangeOutcome::Completed
            }
            Some(Err(err)) => {
                self.fail(&err);
                ExchangeOutcome::Failed
            }
        };
        Ok(outcome)
    }

    async fn consume<F>(
        &mut self,
        backend: &dyn ChatBackend,
        request: ChatRequest,
        observer: &mut F,
    ) -> error::Result<()>
    where
        F: FnMut(&ResponseEvent),
    {
        let mut events = backend.send(request).await?;
        while let Some(event) = events.next().await {
            let event = event?;
            observer(&event);
            self.apply(event);
        }
        Ok(())
    }
}
