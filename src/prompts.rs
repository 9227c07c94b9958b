//! Stage prompt builders. Pure string formatting, no error conditions.
//!
//! The per-analyst prompts live with their agents (`crate::agents`); this
//! module owns the shared system prompt and the prompts for the debate,
//! risk and decision stages, which work over accumulated pipeline output.

use serde_json::json;

use crate::models::{AgentReports, DebateResult, Market};

/// System prompt shared by every call in a pipeline run.
pub const SYSTEM_PROMPT: &str = "你是專業的投資分析AI。";

pub fn bull_case(market: Market, symbol: &str, combined_analysis: &str) -> String {
    format!(
        "作為多頭分析師，基於以下分析，提出 {} {} 的看多論點：\n{}",
        market, symbol, combined_analysis
    )
}

pub fn bear_case(market: Market, symbol: &str, combined_analysis: &str) -> String {
    format!(
        "作為空頭分析師，基於以下分析，提出 {} {} 的看空論點：\n{}",
        market, symbol, combined_analysis
    )
}

pub fn risk_assessment(reports: &AgentReports, debate: &DebateResult) -> String {
    let payload = json!({
        "agentResults": reports,
        "debate": {
            "bullCase": debate.bull_case,
            "bearCase": debate.bear_case,
        },
    });
    format!(
        "作為風險管理團隊，評估以下投資的風險：\n{}\n請提供：1. 風險評分（0-100） 2. 主要風險因素 3. 風險控制建議 4. 倉位配置建議",
        serde_json::to_string_pretty(&payload).unwrap_or_default()
    )
}

pub fn final_decision(
    market: Market,
    symbol: &str,
    reports: &AgentReports,
    debate: &DebateResult,
    risk: &str,
) -> String {
    let payload = json!({
        "agentResults": reports,
        "debate": {
            "bullCase": debate.bull_case,
            "bearCase": debate.bear_case,
        },
        "risk": risk,
    });
    format!(
        r#"作為投資組合經理，基於所有分析做出最終決策：
市場：{}，股票：{}
分析：{}

請提供JSON格式的決策（包含在回應中）：
{{
  "recommendation": "買入/持有/賣出",
  "confidence": 85,
  "confidenceChange": 10,
  "riskScore": 45,
  "riskChange": -5,
  "targetPrice": "$XXX.XX",
  "reasoning": "詳細理由..."
}}"#,
        market,
        symbol,
        serde_json::to_string_pretty(&payload).unwrap_or_default()
    )
}
