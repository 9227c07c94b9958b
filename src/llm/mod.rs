pub mod queue;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::constants::llm::{
    BACKOFF_BASE_MS, DEFAULT_BASE_URL, MAX_ATTEMPTS, MAX_TOKENS, TEMPERATURE,
};
use crate::error::LlmError;

pub use queue::{LlmQueue, Priority};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Thin client over one chat-completions endpoint.
///
/// Handles credential injection and retry/backoff; everything above it goes
/// through [`LlmQueue`], which bounds how many of these calls are in flight.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    pub model: String,
    backoff_base: Duration,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model,
            backoff_base: Duration::from_millis(BACKOFF_BASE_MS),
        }
    }

    /// Override the backoff base. The production default is 2000ms; tests
    /// compress it to keep the retry path fast.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Wait before the retry following `attempt` (0-based) rate-limited
    /// attempts: 2^attempt * base, i.e. 2s then 4s at the default base.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt)
    }

    /// Send one chat completion and return the assistant message text.
    ///
    /// Up to 3 attempts total: HTTP 429 retries with exponential backoff,
    /// transport failures retry after a flat wait, any other non-2xx fails
    /// immediately.
    pub async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::Configuration)?;

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_input,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        info!("🤖 Sending request to LLM (Model: {})...", self.model);

        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&body)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: ChatResponse = resp.json().await?;
                        let content = parsed
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|choice| choice.message.content)
                            .unwrap_or_default();
                        info!("🤖 LLM Response received.");
                        return Ok(content);
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        if attempt + 1 >= MAX_ATTEMPTS {
                            return Err(LlmError::RateLimited {
                                attempts: MAX_ATTEMPTS,
                            });
                        }
                        let wait = self.backoff_delay(attempt);
                        warn!(
                            "Rate limited (HTTP 429), retrying in {}ms...",
                            wait.as_millis()
                        );
                        sleep(wait).await;
                        attempt += 1;
                        continue;
                    }

                    // Other non-2xx statuses are not retryable
                    let message = api_error_message(resp).await;
                    return Err(LlmError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(err) => {
                    // Transport-level failure (DNS, connect, timeout)
                    if attempt + 1 >= MAX_ATTEMPTS {
                        return Err(LlmError::Transport(err));
                    }
                    warn!(
                        "Network error calling LLM ({}), retrying in {}ms...",
                        err,
                        self.backoff_base.as_millis()
                    );
                    sleep(self.backoff_base).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Best-effort extraction of `error.message` from a failed response body,
/// falling back to the HTTP status text.
async fn api_error_message(resp: reqwest::Response) -> String {
    let status_text = resp
        .status()
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string();
    match resp.json::<ApiErrorBody>().await {
        Ok(body) => body
            .error
            .map(|detail| detail.message)
            .unwrap_or(status_text),
        Err(_) => status_text,
    }
}
