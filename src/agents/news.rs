use super::Analyst;
use crate::models::{AnalysisRequest, AnalystKind};

/// News commentary is qualitative only; it is not asked for a rating and
/// is excluded from scoring.
pub struct NewsAnalyst;

impl Analyst for NewsAnalyst {
    fn kind(&self) -> AnalystKind {
        AnalystKind::News
    }

    fn build_prompt(&self, request: &AnalysisRequest) -> String {
        format!(
            "作為新聞分析師，請分析 {} 市場的 {} 股票（分析日期：{}）的相關新聞。\n\
             請提供：1. 重大新聞事件 2. 新聞影響評估 3. 政策面影響 4. 產業趨勢 5. 綜合評價\n\
             深度等級：{}/5",
            request.market, request.symbol, request.date, request.depth
        )
    }
}
