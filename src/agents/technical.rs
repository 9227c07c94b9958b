use super::Analyst;
use crate::models::{AnalysisRequest, AnalystKind};

pub struct TechnicalAnalyst;

impl Analyst for TechnicalAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::Technical
    }

    fn build_prompt(&self, request: &AnalysisRequest) -> String {
        format!(
            "作為技術分析師，請分析 {} 市場的 {} 股票（分析日期：{}）。\n\
             請提供：1. 技術指標分析 2. 價格趨勢 3. 支撐壓力位 4. 量價關係 5. 買賣建議\n\
             深度等級：{}/5\n\
             請在回應末尾提供一個技術面評分（1-10分）。",
            request.market, request.symbol, request.date, request.depth
        )
    }
}
