use crate::models::AnalysisRecord;

/// Progress checkpoint published at each pipeline stage transition.
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    /// Fixed checkpoint percentage (10 at init, 100 at done)
    pub percent: f64,
    /// Human-readable step label, e.g. 技術分析師正在分析
    pub step: String,
}

/// Global event enum carried by the bus. Observability only — pipeline
/// correctness never depends on anyone listening.
#[derive(Clone, Debug)]
pub enum Event {
    Progress(ProgressUpdate),
    Completed(AnalysisRecord),
}
