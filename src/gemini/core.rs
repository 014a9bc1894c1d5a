use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::chat::{Role, Turn};

/// Who authored a piece of content, as the hosted API names it.
/// Assistant turns are called `model` on the wire.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Author {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "model", alias = "assistant")]
    Model,
}

impl From<Role> for Author {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Author::User,
            Role::Assistant => Author::Model,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Part {
    pub text: String,
}

// {"role": "user", "parts": [{"text": "Hi"}]}
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Content {
    pub role: Author,
    pub parts: Vec<Part>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Content {
            role: turn.role().into(),
            parts: vec![Part {
                text: turn.text().to_string(),
            }],
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: SystemInstruction,
}

impl GenerateContentRequest {
    /// Serializes the turns in order, one `Content` per turn.
    pub fn new<'a>(turns: impl IntoIterator<Item = &'a Turn>, system_instruction: &str) -> Self {
        Self {
            contents: turns.into_iter().map(Content::from).collect(),
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
        }
    }
}

// Response parts can be something other than text (e.g. function
// calls) so everything is optional and validated in `reply`.
#[derive(Clone, Deserialize, Debug, Default)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Clone, Deserialize, Debug, Default)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Clone, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

/// What a well-formed response resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// The endpoint withheld an answer for content-policy reasons
    Blocked,
}

impl GenerateContentResponse {
    pub fn reply(&self) -> Result<Reply, CompletionError> {
        let Some(candidate) = self.candidates.first() else {
            // The whole prompt was refused, there are no candidates
            if let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
            {
                tracing::info!("Prompt blocked by the completion endpoint: {}", reason);
                return Ok(Reply::Blocked);
            }
            return Err(CompletionError::MalformedResponse(String::from(
                "response has no candidates",
            )));
        };

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            tracing::info!("Candidate blocked by the completion endpoint for safety");
            return Ok(Reply::Blocked);
        }

        match candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
        {
            Some(text) if !text.is_empty() => Ok(Reply::Text(text.to_string())),
            _ => Err(CompletionError::MalformedResponse(format!(
                "candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("none")
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("request to the completion endpoint failed: {0}")]
    Transport(reqwest::Error),
    #[error("completion endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("can't request a completion for an empty transcript")]
    EmptyTranscript,
}

/// The boundary to the external completion service. `HttpTransport`
/// is the real thing, tests swap in scripted fakes.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, CompletionError>;
}

pub type BoxedTransport = Box<dyn CompletionTransport + 'static>;

pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    /// `url` is the full endpoint, including any credential the host
    /// environment put into it.
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, CompletionError> {
        tracing::debug!(
            "Sending completion request with {} turns",
            request.contents.len()
        );

        // Errors are stripped of the URL so a key in the query string
        // never ends up in the logs
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.without_url().to_string()))
    }
}
