//! ChatSession — the message log and composing flag behind every front-end.
//!
//! `send_message` appends the user message synchronously and schedules the bot
//! reply as a tokio task. The caller gets a `PendingReply` it may await or drop;
//! the reply lands either way. `clear_chat` bumps the session epoch so replies
//! scheduled before the clear are discarded instead of touching the fresh log.
//!
//! The composing flag is derived from an in-flight counter, so overlapping
//! sends keep it set until the last reply resolves.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::analysis::{ImageAnalyzer, TemplateAnalyzer, ANALYZING_PLACEHOLDER, APOLOGY};
use crate::config::ChatConfig;
use crate::error::AssistantError;
use crate::models::{AnalysisStatus, ImageRef, Message, MessageId};
use crate::responses::{ResponsePolicy, GREETING};

/// How a scheduled reply ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Text reply appended to the log.
    Answered(Message),
    /// Pending analysis message updated in place.
    Analyzed(Message),
    /// Pending analysis message replaced with the apology.
    AnalysisFailed(Message),
    /// The session was cleared before the reply landed.
    Discarded,
}

impl ReplyOutcome {
    pub fn message(&self) -> Option<&Message> {
        match self {
            ReplyOutcome::Answered(m)
            | ReplyOutcome::Analyzed(m)
            | ReplyOutcome::AnalysisFailed(m) => Some(m),
            ReplyOutcome::Discarded => None,
        }
    }
}

/// Handle on a scheduled bot reply.
#[derive(Debug)]
pub struct PendingReply {
    user_message: MessageId,
    placeholder: Option<MessageId>,
    appended: Vec<Message>,
    handle: JoinHandle<ReplyOutcome>,
}

impl PendingReply {
    pub fn user_message_id(&self) -> MessageId {
        self.user_message
    }

    /// Id of the `pending` analysis message, for image sends.
    pub fn placeholder_id(&self) -> Option<MessageId> {
        self.placeholder
    }

    /// The user message and any `pending` placeholder, as they were appended.
    pub fn appended(&self) -> &[Message] {
        &self.appended
    }

    /// Wait for the reply to land.
    pub async fn outcome(self) -> ReplyOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Reply task did not complete");
                ReplyOutcome::Discarded
            }
        }
    }
}

/// Point-in-time copy of the session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
    pub composing: bool,
    pub revision: u64,
}

struct SessionState {
    messages: Vec<Message>,
    in_flight: usize,
    next_id: u64,
    epoch: u64,
}

impl SessionState {
    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    fn reply_resolved(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}

struct Inner {
    id: Uuid,
    config: ChatConfig,
    policy: ResponsePolicy,
    analyzer: Arc<dyn ImageAnalyzer>,
    rng: Arc<Mutex<StdRng>>,
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

/// Cheap to clone; clones share the same log.
#[derive(Clone)]
pub struct ChatSession {
    inner: Arc<Inner>,
}

pub struct SessionBuilder {
    config: ChatConfig,
    rng: Option<StdRng>,
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
}

impl SessionBuilder {
    /// Replace the random source. Overrides `rng_seed`.
    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn build(self) -> ChatSession {
        let rng = self.rng.unwrap_or_else(|| match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        });
        let rng = Arc::new(Mutex::new(rng));
        let analyzer: Arc<dyn ImageAnalyzer> = match self.analyzer {
            Some(analyzer) => analyzer,
            None => Arc::new(TemplateAnalyzer::new(
                Arc::clone(&rng),
                self.config.failure_rate(),
            )),
        };

        let mut state = SessionState {
            messages: Vec::new(),
            in_flight: 0,
            next_id: 1,
            epoch: 0,
        };
        let greeting_id = state.allocate_id();
        state.messages.push(Message::bot(greeting_id, GREETING));

        let (revision, _) = watch::channel(0);
        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, analyzer = analyzer.name(), "Chat session created");

        ChatSession {
            inner: Arc::new(Inner {
                id,
                config: self.config,
                policy: ResponsePolicy,
                analyzer,
                rng,
                state: Mutex::new(state),
                revision,
            }),
        }
    }
}

impl ChatSession {
    pub fn new(config: ChatConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ChatConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            rng: None,
            analyzer: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.lock_state().messages.len()
    }

    /// Always false: the log holds at least the greeting.
    pub fn is_empty(&self) -> bool {
        self.lock_state().messages.is_empty()
    }

    pub fn is_composing(&self) -> bool {
        self.lock_state().in_flight > 0
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            session_id: self.inner.id,
            messages: state.messages.clone(),
            composing: state.in_flight > 0,
            revision: *self.inner.revision.borrow(),
        }
    }

    /// Receiver that observes a new revision after every change to the log.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Append a user message and schedule the bot reply.
    ///
    /// Returns `Ok(None)` when the trimmed text is empty and no image is
    /// attached. Must be called from within a tokio runtime.
    pub fn send_message(
        &self,
        text: &str,
        image: Option<ImageRef>,
    ) -> Result<Option<PendingReply>, AssistantError> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Ok(None);
        }

        let (epoch, appended) = {
            let mut state = self.lock_state();
            if self.inner.config.single_flight && state.in_flight > 0 {
                return Err(AssistantError::ReplyInFlight);
            }

            let user_id = state.allocate_id();
            let mut appended = vec![Message::user(user_id, text, image.clone())];
            if image.is_some() {
                let id = state.allocate_id();
                let mut pending = Message::bot(id, ANALYZING_PLACEHOLDER);
                pending.analysis = Some(AnalysisStatus::Pending);
                appended.push(pending);
            }
            state.messages.extend(appended.iter().cloned());

            state.in_flight += 1;
            self.bump();
            (state.epoch, appended)
        };
        let user_message = appended[0].id;
        let placeholder = appended.get(1).map(|m| m.id);

        // The deadline is fixed at send time, not when the task is first polled.
        let delay = self.draw_delay(image.is_some());
        let deadline = Instant::now() + delay;
        tracing::debug!(
            session_id = %self.inner.id,
            message_id = %user_message,
            with_image = image.is_some(),
            delay_ms = delay.as_millis() as u64,
            "Reply scheduled"
        );

        let session = self.clone();
        let prompt = text.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            match (image, placeholder) {
                (Some(image), Some(id)) => session.finish_analysis(epoch, id, image).await,
                _ => session.finish_reply(epoch, &prompt),
            }
        });

        Ok(Some(PendingReply {
            user_message,
            placeholder,
            appended,
            handle,
        }))
    }

    /// Reset to a single fresh greeting and clear the composing flag.
    pub fn clear_chat(&self) {
        let mut state = self.lock_state();
        state.epoch += 1;
        state.in_flight = 0;
        let id = state.allocate_id();
        state.messages = vec![Message::bot(id, GREETING)];
        self.bump();
        tracing::info!(session_id = %self.inner.id, epoch = state.epoch, "Chat cleared");
    }

    fn finish_reply(&self, epoch: u64, prompt: &str) -> ReplyOutcome {
        let reply = {
            let mut rng = self.lock_rng();
            self.inner.policy.respond(prompt, &mut *rng)
        };

        let mut state = self.lock_state();
        if state.epoch != epoch {
            tracing::debug!(session_id = %self.inner.id, "Session cleared, dropping reply");
            return ReplyOutcome::Discarded;
        }

        let id = state.allocate_id();
        let message = Message::bot(id, reply);
        state.messages.push(message.clone());
        state.reply_resolved();
        self.bump();
        ReplyOutcome::Answered(message)
    }

    async fn finish_analysis(&self, epoch: u64, id: MessageId, image: ImageRef) -> ReplyOutcome {
        // Run the analyzer in its own task so a panic there still resolves the
        // pending message.
        let analyzer = Arc::clone(&self.inner.analyzer);
        let uri = image.uri.clone();
        let result = match tokio::spawn(async move { analyzer.analyze(&image).await }).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let mut state = self.lock_state();
        if state.epoch != epoch {
            tracing::debug!(session_id = %self.inner.id, "Session cleared, dropping analysis");
            return ReplyOutcome::Discarded;
        }

        let Some(message) = state.messages.iter_mut().find(|m| m.id == id) else {
            state.reply_resolved();
            return ReplyOutcome::Discarded;
        };

        let outcome = match result {
            Ok(text) => {
                message.text = text;
                message.analysis = Some(AnalysisStatus::Complete);
                ReplyOutcome::Analyzed(message.clone())
            }
            Err(e) => {
                tracing::warn!(session_id = %self.inner.id, uri = %uri, error = %e, "Image analysis failed");
                message.text = APOLOGY.to_string();
                message.analysis = Some(AnalysisStatus::Failed);
                ReplyOutcome::AnalysisFailed(message.clone())
            }
        };
        state.reply_resolved();
        self.bump();
        outcome
    }

    fn draw_delay(&self, with_image: bool) -> Duration {
        let range = if with_image {
            self.inner.config.analysis_delay_ms()
        } else {
            self.inner.config.reply_delay_ms()
        };
        let ms = self.lock_rng().gen_range(range);
        Duration::from_millis(ms)
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|r| *r += 1);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_rng(&self) -> MutexGuard<'_, StdRng> {
        self.inner.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.inner.id)
            .field("messages", &self.len())
            .field("composing", &self.is_composing())
            .finish()
    }
}
