//! Domain records shared by the pipeline, the store and the CLI.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::score::{DEFAULT_SCORE, MAX_SCORE, MIN_SCORE};
use crate::error::PipelineError;

/// Market a symbol trades on. `Auto` lets the model infer it from the code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "TW")]
    Tw,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "HK")]
    Hk,
    #[serde(rename = "AUTO")]
    Auto,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Tw => "TW",
            Market::Us => "US",
            Market::Hk => "HK",
            Market::Auto => "AUTO",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TW" => Ok(Market::Tw),
            "US" => Ok(Market::Us),
            "HK" => Ok(Market::Hk),
            "AUTO" => Ok(Market::Auto),
            other => Err(format!("unknown market: {}", other)),
        }
    }
}

/// One LLM-prompted analytical role. Declaration order is the fixed
/// iteration order of the agent fan-out stage.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalystKind {
    Technical,
    Fundamental,
    News,
    Sentiment,
}

impl AnalystKind {
    pub fn all() -> [AnalystKind; 4] {
        [
            AnalystKind::Technical,
            AnalystKind::Fundamental,
            AnalystKind::News,
            AnalystKind::Sentiment,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            AnalystKind::Technical => "technical",
            AnalystKind::Fundamental => "fundamental",
            AnalystKind::News => "news",
            AnalystKind::Sentiment => "sentiment",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AnalystKind::Technical => "技術分析師",
            AnalystKind::Fundamental => "基本面分析師",
            AnalystKind::News => "新聞分析師",
            AnalystKind::Sentiment => "情緒分析師",
        }
    }

    /// News commentary carries no numeric rating, so it is left out of the
    /// AI score.
    pub fn is_scored(&self) -> bool {
        !matches!(self, AnalystKind::News)
    }

    /// Placeholder substituted for this analyst's report when its call fails.
    pub fn failure_placeholder(&self) -> String {
        format!("[{}分析暫時無法完成]", self.display_name())
    }
}

impl FromStr for AnalystKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "technical" => Ok(AnalystKind::Technical),
            "fundamental" => Ok(AnalystKind::Fundamental),
            "news" => Ok(AnalystKind::News),
            "sentiment" => Ok(AnalystKind::Sentiment),
            other => Err(format!("unknown analyst: {}", other)),
        }
    }
}

/// Everything a pipeline run needs, owned by the caller and immutable once
/// the run starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub market: Market,
    pub symbol: String,
    /// ISO date (YYYY-MM-DD) the analysis is anchored to
    pub date: String,
    /// Requested thoroughness, 1-5. Embedded in prompts only; does not
    /// change control flow.
    pub depth: u8,
    pub selected_agents: Vec<AnalystKind>,
}

impl AnalysisRequest {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.symbol.trim().is_empty() {
            return Err(PipelineError::Validation("symbol must not be empty".into()));
        }
        if self.selected_agents.is_empty() {
            return Err(PipelineError::Validation(
                "at least one analyst must be selected".into(),
            ));
        }
        Ok(())
    }

    /// Selected analysts in the fixed fan-out order, deduplicated.
    pub fn agents_in_order(&self) -> Vec<AnalystKind> {
        AnalystKind::all()
            .into_iter()
            .filter(|kind| self.selected_agents.contains(kind))
            .collect()
    }
}

/// Raw analyst responses keyed by role. Exactly one entry per selected
/// analyst once the fan-out stage completes (placeholder text on failure).
pub type AgentReports = BTreeMap<AnalystKind, String>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateResult {
    pub bull_case: String,
    pub bear_case: String,
}

/// Component scores extracted from the analyst reports, each in [1,10].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiScore {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    /// Mean of the three components, rounded to one decimal
    pub overall: f64,
}

impl AiScore {
    pub fn from_components(technical: f64, fundamental: f64, sentiment: f64) -> Self {
        let technical = clamp_score(technical);
        let fundamental = clamp_score(fundamental);
        let sentiment = clamp_score(sentiment);
        let overall = ((technical + fundamental + sentiment) / 3.0 * 10.0).round() / 10.0;
        Self {
            technical,
            fundamental,
            sentiment,
            overall,
        }
    }

    /// Human-readable rating band for the overall score.
    pub fn label(&self) -> &'static str {
        if self.overall >= 8.0 {
            "強力買入"
        } else if self.overall >= 6.5 {
            "建議買入"
        } else if self.overall >= 5.0 {
            "中性持有"
        } else if self.overall >= 3.5 {
            "建議賣出"
        } else {
            "強力賣出"
        }
    }
}

impl Default for AiScore {
    fn default() -> Self {
        Self::from_components(DEFAULT_SCORE, DEFAULT_SCORE, DEFAULT_SCORE)
    }
}

/// Structured decision the portfolio-manager stage is asked to embed in its
/// response. Parsing is best-effort; a response without a parseable payload
/// is still a valid decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionSummary {
    pub recommendation: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub confidence_change: Option<f64>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub risk_change: Option<f64>,
    #[serde(default)]
    pub target_price: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl DecisionSummary {
    /// Pull the first JSON-like substring mentioning "recommendation" out of
    /// the free-text decision and deserialize it. Returns None on any
    /// failure; callers fall back to the raw text.
    pub fn parse(decision: &str) -> Option<DecisionSummary> {
        let pattern = decision_json_pattern();
        let candidate = pattern.find(decision)?.as_str();
        serde_json::from_str(candidate).ok()
    }
}

fn decision_json_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)\{.*"recommendation".*\}"#).expect("decision pattern is valid")
    })
}

/// Extract the bare recommendation string from a decision text, falling
/// back to 持有 when nothing is found.
pub fn extract_recommendation(decision: &str) -> String {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#""recommendation"\s*:\s*"([^"]+)""#).expect("recommendation pattern is valid")
    });
    pattern
        .captures(decision)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "持有".to_string())
}

/// The unit persisted to history and embedded in watchlist entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub symbol: String,
    pub market: Market,
    pub date: String,
    pub depth: u8,
    pub agent_reports: AgentReports,
    pub debate: DebateResult,
    pub risk: String,
    pub decision: String,
    pub ai_score: AiScore,
    /// RFC3339 completion time
    pub timestamp: String,
}

impl AnalysisRecord {
    pub fn recommendation(&self) -> String {
        extract_recommendation(&self.decision)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub market: Market,
    pub ai_score: f64,
    pub recommendation: String,
    /// RFC3339 time the entry was added
    pub added_date: String,
    pub record: AnalysisRecord,
}

impl WatchlistEntry {
    pub fn from_record(record: &AnalysisRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            market: record.market,
            ai_score: record.ai_score.overall,
            recommendation: record.recommendation(),
            added_date: chrono::Utc::now().to_rfc3339(),
            record: record.clone(),
        }
    }
}

/// Sanity clamp used when scores come from external text. Values already
/// validated by the extractor pass through unchanged.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}
