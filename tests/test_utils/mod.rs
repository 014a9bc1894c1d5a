//! Test utilities for integration tests
#![allow(dead_code)]
use std::time::Duration;

use serde_json::{Value, json};

use folio::ai::chat::{CompletionClient, Transcript, Turn};
use folio::ai::retry::RetryPolicy;
use folio::gemini::HttpTransport;

pub const PERSONA: &str = "You are a test persona.";
pub const MODEL: &str = "test-model";
pub const ENDPOINT: &str = "/v1beta/models/test-model:generateContent";

/// Creates a client against a mock server. Retries don't wait unless
/// a delay is given so the tests stay fast.
pub fn test_client(server_url: &str, max_attempts: u32, base_delay: Duration) -> CompletionClient {
    let url = format!("{}{}", server_url, ENDPOINT);
    let transport = HttpTransport::new(&url, Duration::from_secs(5));
    CompletionClient::builder(Box::new(transport), PERSONA)
        .retry_policy(RetryPolicy::new(max_attempts, base_delay))
        .build()
}

pub fn transcript_of(turns: &[Turn]) -> Transcript {
    let mut transcript = Transcript::new();
    for turn in turns {
        transcript.push(turn.clone());
    }
    transcript
}

/// A successful `generateContent` response body.
pub fn text_body(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
    })
    .to_string()
}

pub fn safety_body() -> String {
    json!({
        "candidates": [{
            "finishReason": "SAFETY",
            "index": 0,
            "safetyRatings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "probability": "HIGH"}
            ]
        }]
    })
    .to_string()
}

/// The exact request body expected for `contents`.
pub fn request_body(contents: Value) -> Value {
    json!({
        "contents": contents,
        "systemInstruction": {"parts": [{"text": PERSONA}]}
    })
}
