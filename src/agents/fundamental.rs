use super::Analyst;
use crate::models::{AnalysisRequest, AnalystKind};

pub struct FundamentalAnalyst;

impl Analyst for FundamentalAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::Fundamental
    }

    fn build_prompt(&self, request: &AnalysisRequest) -> String {
        format!(
            "作為基本面分析師，請分析 {} 市場的 {} 股票（分析日期：{}）。\n\
             請提供：1. 財務狀況 2. 成長性評估 3. 估值分析 4. 產業地位 5. 投資評價\n\
             深度等級：{}/5\n\
             請在回應末尾提供一個基本面評分（1-10分）。",
            request.market, request.symbol, request.date, request.depth
        )
    }
}
