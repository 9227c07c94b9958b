use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::info;

use super::LlmClient;
use crate::error::LlmError;

/// Priority level for LLM requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// High priority: pipeline continuations (debate, risk, decision)
    High,
    /// Normal priority: fresh analyst requests
    Normal,
}

struct QueuedRequest {
    system_prompt: String,
    user_input: String,
    response_tx: oneshot::Sender<Result<String, LlmError>>,
}

/// Bounds how many gateway calls are in flight and prioritizes pipeline
/// continuations over fresh analysis.
///
/// Max-in-flight defaults to 1, which keeps a whole run under the
/// upstream rate limit; raising it lets independent calls overlap.
#[derive(Clone)]
pub struct LlmQueue {
    high_tx: mpsc::Sender<QueuedRequest>,
    normal_tx: mpsc::Sender<QueuedRequest>,
    configured: bool,
}

impl LlmQueue {
    pub fn new(client: LlmClient, max_concurrent: usize, queue_size: usize) -> Self {
        let (high_tx, high_rx) = mpsc::channel::<QueuedRequest>(queue_size);
        let (normal_tx, normal_rx) = mpsc::channel::<QueuedRequest>(queue_size);

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let configured = client.is_configured();

        tokio::spawn(Self::process_queue(client, semaphore, high_rx, normal_rx));

        Self {
            high_tx,
            normal_tx,
            configured,
        }
    }

    /// Whether the underlying client has a credential. Checked by the
    /// pipeline before any work is enqueued.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    async fn process_queue(
        client: LlmClient,
        semaphore: Arc<Semaphore>,
        mut high_rx: mpsc::Receiver<QueuedRequest>,
        mut normal_rx: mpsc::Receiver<QueuedRequest>,
    ) {
        info!(
            "📬 [QUEUE] LLM queue processor started (max in-flight: {})",
            semaphore.available_permits()
        );

        loop {
            let request = tokio::select! {
                biased;

                Some(req) = high_rx.recv() => req,
                Some(req) = normal_rx.recv() => req,
                else => {
                    info!("📬 [QUEUE] All channels closed, shutting down");
                    break;
                }
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = request
                        .response_tx
                        .send(Err(LlmError::Queue("semaphore closed".to_string())));
                    continue;
                }
            };

            let client = client.clone();
            tokio::spawn(async move {
                let result = client
                    .chat(&request.system_prompt, &request.user_input)
                    .await;
                let _ = request.response_tx.send(result);
                drop(permit);
            });
        }
    }

    /// Send a chat request at the given priority and wait for its response.
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_input: &str,
        priority: Priority,
    ) -> Result<String, LlmError> {
        let (response_tx, response_rx) = oneshot::channel();

        let request = QueuedRequest {
            system_prompt: system_prompt.to_string(),
            user_input: user_input.to_string(),
            response_tx,
        };

        let send_result = match priority {
            Priority::High => self.high_tx.send(request).await,
            Priority::Normal => self.normal_tx.send(request).await,
        };
        if send_result.is_err() {
            return Err(LlmError::Queue("queue processor stopped".to_string()));
        }

        match response_rx.await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Queue("request was dropped".to_string())),
        }
    }

    /// Convenience method for normal priority (fresh analyst calls)
    pub async fn chat_normal(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String, LlmError> {
        self.chat(system_prompt, user_input, Priority::Normal).await
    }

    /// Convenience method for high priority (pipeline continuations)
    pub async fn chat_high(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String, LlmError> {
        self.chat(system_prompt, user_input, Priority::High).await
    }
}
