pub mod fundamental;
pub mod news;
pub mod sentiment;
pub mod technical;

use async_trait::async_trait;
use tracing::info;

use crate::error::LlmError;
use crate::llm::{LlmQueue, Priority};
use crate::models::{AnalysisRequest, AnalystKind};
use crate::prompts::SYSTEM_PROMPT;

pub use fundamental::FundamentalAnalyst;
pub use news::NewsAnalyst;
pub use sentiment::SentimentAnalyst;
pub use technical::TechnicalAnalyst;

/// One analytical role of the fan-out stage. Implementations supply the
/// role-specific prompt; the shared `run` pushes it through the gateway
/// queue at normal priority (new analysis, not a pipeline continuation).
#[async_trait]
pub trait Analyst: Send + Sync {
    fn kind(&self) -> AnalystKind;

    fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    fn build_prompt(&self, request: &AnalysisRequest) -> String;

    async fn run(&self, request: &AnalysisRequest, llm: &LlmQueue) -> Result<String, LlmError> {
        info!(
            "🤖 [AGENT] {} analyzing {} {}...",
            self.name(),
            request.market,
            request.symbol
        );
        let response = llm
            .chat(SYSTEM_PROMPT, &self.build_prompt(request), Priority::Normal)
            .await?;
        info!(
            "🤖 [AGENT] {} finished ({} chars)",
            self.name(),
            response.len()
        );
        Ok(response)
    }
}

/// Static dispatch table from role kind to its analyst.
pub fn analyst_for(kind: AnalystKind) -> &'static dyn Analyst {
    match kind {
        AnalystKind::Technical => &TechnicalAnalyst,
        AnalystKind::Fundamental => &FundamentalAnalyst,
        AnalystKind::News => &NewsAnalyst,
        AnalystKind::Sentiment => &SentimentAnalyst,
    }
}
