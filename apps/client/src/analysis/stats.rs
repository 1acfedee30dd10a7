use crate::analysis::presenter::ScoreBand;
use crate::models::analysis::AnalysisRecord;

/// Aggregates over the cached history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub count: usize,
    /// Mean ATS score, rounded half-up.
    pub average_score: u8,
    pub max_score: u8,
}

impl HistoryStats {
    pub fn average_band(&self) -> ScoreBand {
        ScoreBand::of(self.average_score)
    }
}

/// `None` for an empty list: there is no mean or max to show.
pub fn compute_stats(records: &[AnalysisRecord]) -> Option<HistoryStats> {
    let max_score = records.iter().map(|r| r.ats_score).max()?;
    let count = records.len();
    let sum: u64 = records.iter().map(|r| u64::from(r.ats_score)).sum();
    let n = count as u64;
    // (2*sum + n) / (2*n) == floor(sum/n + 0.5)
    let average = (2 * sum + n) / (2 * n);

    Some(HistoryStats {
        count,
        average_score: average as u8,
        max_score,
    })
}
