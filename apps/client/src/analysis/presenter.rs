//! Presentation facts derived from an analysis record. No network access.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use crate::analysis::normalize::normalize_record;
use crate::errors::ClientError;
use crate::models::analysis::AnalysisRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsImprovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTier {
    Green,
    Yellow,
    Red,
}

impl ScoreBand {
    /// `>= 80` Excellent, `60..80` Good, below 60 Needs Improvement.
    pub fn of(score: u8) -> Self {
        match score {
            s if s >= 80 => ScoreBand::Excellent,
            s if s >= 60 => ScoreBand::Good,
            _ => ScoreBand::NeedsImprovement,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn tier(self) -> ColorTier {
        match self {
            ScoreBand::Excellent => ColorTier::Green,
            ScoreBand::Good => ColorTier::Yellow,
            ScoreBand::NeedsImprovement => ColorTier::Red,
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ColorTier {
    pub fn name(self) -> &'static str {
        match self {
            ColorTier::Green => "green",
            ColorTier::Yellow => "yellow",
            ColorTier::Red => "red",
        }
    }
}

/// Where copy/download affordances end up. The platform clipboard and the
/// download location live behind this.
pub trait ExportSink {
    fn copy_text(&self, text: &str) -> Result<(), ClientError>;
    fn save_file(&self, file_name: &str, contents: &str) -> Result<PathBuf, ClientError>;
}

/// A received analysis, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub record: AnalysisRecord,
    pub band: ScoreBand,
    pub ai_band: Option<ScoreBand>,
}

impl AnalysisView {
    pub fn new(record: AnalysisRecord) -> Self {
        Self {
            band: ScoreBand::of(record.ats_score),
            ai_band: record.ai_score.map(ScoreBand::of),
            record,
        }
    }

    /// Builds a view from a raw payload of either upstream shape.
    /// No payload means there is nothing to show and the caller should return to upload.
    pub fn from_payload(payload: Option<&Value>) -> Result<Self, ClientError> {
        payload
            .and_then(normalize_record)
            .map(Self::new)
            .ok_or(ClientError::MissingAnalysis)
    }

    pub fn tier(&self) -> ColorTier {
        self.band.tier()
    }

    /// The full record as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string_pretty(&self.record)?)
    }

    /// `<resumeFileName>-analysis.json`, with path separators neutralized.
    pub fn export_file_name(&self) -> String {
        let stem: String = self
            .record
            .resume_file_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("{stem}-analysis.json")
    }

    pub fn keywords_text(&self) -> String {
        self.record.missing_keywords.join(", ")
    }

    pub fn copy_keywords(&self, sink: &dyn ExportSink) -> Result<(), ClientError> {
        sink.copy_text(&self.keywords_text())
    }

    pub fn copy_json(&self, sink: &dyn ExportSink) -> Result<(), ClientError> {
        sink.copy_text(&self.export_json()?)
    }

    pub fn download(&self, sink: &dyn ExportSink) -> Result<PathBuf, ClientError> {
        sink.save_file(&self.export_file_name(), &self.export_json()?)
    }
}
