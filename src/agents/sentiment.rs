use super::Analyst;
use crate::models::{AnalysisRequest, AnalystKind};

pub struct SentimentAnalyst;

impl Analyst for SentimentAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::Sentiment
    }

    fn build_prompt(&self, request: &AnalysisRequest) -> String {
        format!(
            "作為市場情緒分析師，請分析 {} 市場的 {} 股票（分析日期：{}）的市場情緒。\n\
             請提供：1. 社群情緒 2. 投資者情緒指標 3. 機構動向 4. 市場恐慌/貪婪程度 5. 綜合評價\n\
             深度等級：{}/5\n\
             請在回應末尾提供一個情緒面評分（1-10分）。",
            request.market, request.symbol, request.date, request.depth
        )
    }
}
