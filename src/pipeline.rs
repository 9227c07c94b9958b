//! The multi-stage analysis pipeline.
//!
//! Strictly ordered stages: INIT -> AGENTS -> DEBATE -> RISK -> DECISION ->
//! SCORING -> PERSIST -> DONE. A failed gateway call degrades that stage to
//! placeholder text instead of aborting, so every validated, configured run
//! reaches DONE with a complete record.

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::analyst_for;
use crate::bus::EventBus;
use crate::config::PipelineConfig;
use crate::constants::progress;
use crate::constants::score::DEFAULT_SCORE;
use crate::data::store::AnalysisStore;
use crate::error::PipelineError;
use crate::events::Event;
use crate::llm::LlmQueue;
use crate::models::{
    AgentReports, AiScore, AnalysisRecord, AnalysisRequest, AnalystKind, DebateResult,
};
use crate::prompts;
use crate::score::extract_score;

pub struct AnalysisPipeline {
    llm: LlmQueue,
    store: AnalysisStore,
    bus: EventBus,
    inter_call_delay: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        llm: LlmQueue,
        store: AnalysisStore,
        bus: EventBus,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            llm,
            store,
            bus,
            inter_call_delay: Duration::from_millis(config.inter_call_delay_ms),
        }
    }

    /// Run one analysis to completion and persist the record.
    ///
    /// Only validation failures and a missing credential escape; per-stage
    /// gateway errors are downgraded to placeholder text.
    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisRecord, PipelineError> {
        request.validate()?;
        if !self.llm.is_configured() {
            return Err(PipelineError::Configuration(
                "API credential is not configured".into(),
            ));
        }

        info!(
            "🧠 Starting analysis of {} {} (depth {})",
            request.market, request.symbol, request.depth
        );
        self.progress(progress::INIT, "初始化分析環境".to_string());

        // AGENTS: fixed fan-out order, one call at a time, paced by the
        // inter-call delay
        let selected = request.agents_in_order();
        let mut reports = AgentReports::new();
        for (i, kind) in selected.iter().enumerate() {
            let percent = progress::AGENTS_BASE
                + ((i + 1) as f64 / selected.len() as f64) * progress::AGENTS_SPAN;
            self.progress(percent, format!("{}正在分析", kind.display_name()));

            let text = match analyst_for(*kind).run(&request, &self.llm).await {
                Ok(text) => text,
                Err(err) => {
                    error!("❌ {} failed for {}: {}", kind.display_name(), request.symbol, err);
                    kind.failure_placeholder()
                }
            };
            reports.insert(*kind, text);

            sleep(self.inter_call_delay).await;
        }

        // DEBATE: bull then bear. Both go through the queue at high
        // priority; with the default max-in-flight of 1 they serialize.
        self.progress(progress::DEBATE, "多空辯論研究中".to_string());
        let combined = reports.values().cloned().collect::<Vec<_>>().join("\n\n");
        let bull_case = self
            .stage_call(
                prompts::bull_case(request.market, &request.symbol, &combined),
                "[多頭分析失敗]",
            )
            .await;
        let bear_case = self
            .stage_call(
                prompts::bear_case(request.market, &request.symbol, &combined),
                "[空頭分析失敗]",
            )
            .await;
        let debate = DebateResult {
            bull_case,
            bear_case,
        };

        // RISK
        self.progress(progress::RISK, "風險管理評估".to_string());
        let risk = self
            .stage_call(prompts::risk_assessment(&reports, &debate), "[風險評估失敗]")
            .await;

        // DECISION
        self.progress(progress::DECISION, "生成最終投資建議".to_string());
        let decision = self
            .stage_call(
                prompts::final_decision(request.market, &request.symbol, &reports, &debate, &risk),
                "[最終決策失敗]",
            )
            .await;

        // SCORING: technical/fundamental/sentiment only; anything missing
        // or unextractable contributes the neutral default
        let ai_score = AiScore::from_components(
            component_score(&reports, AnalystKind::Technical),
            component_score(&reports, AnalystKind::Fundamental),
            component_score(&reports, AnalystKind::Sentiment),
        );

        // PERSIST
        let record = AnalysisRecord {
            id: Uuid::new_v4().to_string(),
            symbol: request.symbol.clone(),
            market: request.market,
            date: request.date.clone(),
            depth: request.depth,
            agent_reports: reports,
            debate,
            risk,
            decision,
            ai_score,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.store.add_to_history(record.clone());

        self.progress(progress::DONE, "分析完成".to_string());
        let _ = self.bus.publish(Event::Completed(record.clone()));

        info!(
            "🧠 Analysis of {} complete: {} ({:.1}/10)",
            record.symbol,
            record.ai_score.label(),
            record.ai_score.overall
        );
        Ok(record)
    }

    /// One high-priority stage call, degraded to `fallback` on any error.
    async fn stage_call(&self, prompt: String, fallback: &str) -> String {
        match self.llm.chat_high(prompts::SYSTEM_PROMPT, &prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!("Pipeline stage call failed: {}", err);
                fallback.to_string()
            }
        }
    }

    fn progress(&self, percent: f64, step: String) {
        self.bus.publish_progress(percent, step);
    }
}

fn component_score(reports: &AgentReports, kind: AnalystKind) -> f64 {
    reports
        .get(&kind)
        .map(|text| extract_score(text))
        .unwrap_or(DEFAULT_SCORE)
}
