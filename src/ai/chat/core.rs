use tokio::sync::mpsc;
use uuid::Uuid;

use super::models::{ChatState, Transcript, TranscriptEvent, Turn};
use crate::ai::prompt::{APOLOGY, SAFETY_REFUSAL};
use crate::ai::retry::{BoxedSleeper, RetryPolicy, TokioSleeper};
use crate::core::AppConfig;
use crate::gemini::{BoxedTransport, CompletionError, GenerateContentRequest, HttpTransport, Reply};

/// Turns a transcript into exactly one assistant turn using a hosted
/// completion endpoint.
///
/// Every outcome is a `Turn`: a reply, a canned refusal when the
/// endpoint blocks the answer, or an apology once all attempts
/// failed. Callers never see an error.
///
/// Use `CompletionClient::builder()` or
/// `CompletionClient::from_config()` to construct one.
pub struct CompletionClient {
    transport: BoxedTransport,
    sleeper: BoxedSleeper,
    retry_policy: RetryPolicy,
    system_instruction: String,
}

impl CompletionClient {
    pub fn builder(transport: BoxedTransport, system_instruction: &str) -> CompletionClientBuilder {
        CompletionClientBuilder::new(transport, system_instruction)
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let transport = HttpTransport::new(&config.completion_url, config.request_timeout);
        CompletionClientBuilder::new(Box::new(transport), &config.system_instruction)
            .retry_policy(config.retry_policy())
            .build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Resolves the transcript, which should end with the user's
    /// latest turn, into the next assistant turn.
    pub async fn complete(&self, transcript: &Transcript) -> Turn {
        match self.try_complete(transcript).await {
            Ok(Reply::Text(text)) => Turn::assistant(&text),
            Ok(Reply::Blocked) => Turn::assistant(SAFETY_REFUSAL),
            Err(err) => {
                tracing::error!("Completion failed, replying with an apology: {}", err);
                Turn::assistant(APOLOGY)
            }
        }
    }

    /// Same as `complete` but leaves the failure for the caller to
    /// handle.
    pub async fn try_complete(&self, transcript: &Transcript) -> Result<Reply, CompletionError> {
        if transcript.is_empty() {
            return Err(CompletionError::EmptyTranscript);
        }

        let request = GenerateContentRequest::new(transcript, &self.system_instruction);
        let request = &request;
        let transport = &self.transport;

        self.retry_policy
            .run(&*self.sleeper, move |_attempt| async move {
                transport
                    .generate(request)
                    .await
                    .and_then(|response| response.reply())
            })
            .await
    }
}

pub struct CompletionClientBuilder {
    transport: BoxedTransport,
    sleeper: BoxedSleeper,
    retry_policy: RetryPolicy,
    system_instruction: String,
}

impl CompletionClientBuilder {
    pub fn new(transport: BoxedTransport, system_instruction: &str) -> Self {
        Self {
            transport,
            sleeper: Box::new(TokioSleeper),
            retry_policy: RetryPolicy::default(),
            system_instruction: system_instruction.to_string(),
        }
    }

    pub fn build(self) -> CompletionClient {
        CompletionClient {
            transport: self.transport,
            sleeper: self.sleeper,
            retry_policy: self.retry_policy,
            system_instruction: self.system_instruction,
        }
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn sleeper(mut self, sleeper: BoxedSleeper) -> Self {
        self.sleeper = sleeper;
        self
    }
}

/// Proof that a submit was accepted. Carries the transcript to send
/// and the session it belongs to so a reply that arrives after a
/// reset can be recognized and dropped.
#[derive(Debug)]
pub struct PendingCompletion {
    session_id: Uuid,
    transcript: Transcript,
}

impl PendingCompletion {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

/// State of one chat widget: the transcript plus the IDLE/SENDING
/// gate that keeps at most one completion outstanding.
pub struct ChatSession {
    session_id: Uuid,
    greeting: String,
    transcript: Transcript,
    state: ChatState,
    visible: bool,
    tx: Option<mpsc::UnboundedSender<TranscriptEvent>>,
}

impl ChatSession {
    pub fn new(greeting: &str) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            greeting: greeting.to_string(),
            transcript: Transcript::new(),
            state: ChatState::Idle,
            visible: false,
            tx: None,
        }
    }

    /// Sends a `TranscriptEvent` to `transmitter` on every change.
    pub fn events(mut self, transmitter: mpsc::UnboundedSender<TranscriptEvent>) -> Self {
        self.tx = Some(transmitter);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows the widget. The greeting is only added the first time so
    /// opening and closing repeatedly keeps the history as is.
    pub fn open(&mut self) {
        self.visible = true;
        if self.transcript.seed_if_empty(&self.greeting) {
            if let Some(greeting) = self.transcript.last().cloned() {
                self.notify(TranscriptEvent::Appended(greeting));
            }
        }
    }

    /// Hides the widget. Nothing is cancelled or cleared: a reply that
    /// is in flight still lands in this transcript.
    pub fn close(&mut self) {
        self.visible = false;
    }

    /// Starts over with an empty transcript under a new session id.
    /// Replies still in flight for the old session are dropped when
    /// they arrive.
    pub fn reset(&mut self) {
        let old_session_id = self.session_id;
        self.session_id = Uuid::new_v4();
        self.transcript = Transcript::new();
        tracing::debug!(
            "Reset chat session {} to {}",
            old_session_id,
            self.session_id
        );
        self.notify(TranscriptEvent::Reset);
        self.set_state(ChatState::Idle);
        if self.visible {
            self.open();
        }
    }

    /// Accepts the user's input if it isn't blank and no completion is
    /// outstanding. On success the user turn is appended, the session
    /// is SENDING, and the returned ticket holds the transcript to send.
    pub fn begin(&mut self, text: &str) -> Option<PendingCompletion> {
        if self.state == ChatState::Sending {
            tracing::debug!("Ignoring submit while a completion is outstanding");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.append(Turn::user(text));
        self.set_state(ChatState::Sending);

        Some(PendingCompletion {
            session_id: self.session_id,
            transcript: self.transcript.clone(),
        })
    }

    /// Appends the assistant's turn for `pending` and returns to IDLE.
    /// Returns false, changing nothing, when the session was reset
    /// after `pending` was issued.
    pub fn finish(&mut self, pending: PendingCompletion, turn: Turn) -> bool {
        if pending.session_id != self.session_id {
            tracing::debug!(
                "Dropping reply for stale session {} (current {})",
                pending.session_id,
                self.session_id
            );
            return false;
        }

        self.append(turn);
        self.set_state(ChatState::Idle);
        true
    }

    /// Runs a whole exchange: accept the input, wait for the
    /// completion, and append the reply. Returns the assistant turn,
    /// or `None` if the input was ignored or the reply was dropped.
    pub async fn submit(&mut self, client: &CompletionClient, text: &str) -> Option<Turn> {
        let pending = self.begin(text)?;
        let turn = client.complete(pending.transcript()).await;
        self.finish(pending, turn.clone()).then_some(turn)
    }

    fn append(&mut self, turn: Turn) {
        self.transcript.push(turn.clone());
        self.notify(TranscriptEvent::Appended(turn));
    }

    fn set_state(&mut self, state: ChatState) {
        if self.state != state {
            self.state = state;
            self.notify(TranscriptEvent::StateChanged(state));
        }
    }

    fn notify(&self, event: TranscriptEvent) {
        // A front end that went away doesn't stop the session
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
