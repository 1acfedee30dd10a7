//! Boundary adapter: every upstream analysis shape becomes one `AnalysisRecord`.
//!
//! Two payload generations exist upstream:
//! - results: `atsScore`/`matchScore`, `resumeFileName`/`fileName`,
//!   `improvements`/`suggestedImprovements`, `createdAt`
//! - history summaries: `id`/`_id`, `score`, `filename`, `date`
//!
//! Missing scores become 0, missing lists become empty, missing improvements
//! become `{}`. Nothing here fails on a sparse payload.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

use crate::models::analysis::{AnalysisRecord, SuggestedImprovements};
use crate::models::record_id;

const ID_KEYS: &[&str] = &["id", "_id", "analysisId"];
const SCORE_KEYS: &[&str] = &["atsScore", "matchScore", "score"];
const FILE_NAME_KEYS: &[&str] = &["resumeFileName", "fileName", "filename"];
const IMPROVEMENT_KEYS: &[&str] = &["improvements", "suggestedImprovements"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "date"];
const HISTORY_WRAPPER_KEYS: &[&str] = &["history", "analyses", "data"];

pub const DEFAULT_RESUME_FILE_NAME: &str = "Resume";

/// Strips an `{ "analysis": ... }` envelope if there is one.
pub fn unwrap_analysis(payload: &Value) -> &Value {
    match payload.get("analysis") {
        Some(inner) => inner,
        None => payload,
    }
}

/// `None` when there is no analysis payload at all (null, or not an object).
pub fn normalize_record(payload: &Value) -> Option<AnalysisRecord> {
    let obj = unwrap_analysis(payload).as_object()?;

    Some(AnalysisRecord {
        id: first(obj, ID_KEYS).and_then(record_id),
        resume_file_name: first(obj, FILE_NAME_KEYS)
            .and_then(non_empty_text)
            .unwrap_or_else(|| DEFAULT_RESUME_FILE_NAME.to_string()),
        target_role: obj.get("targetRole").and_then(non_empty_text),
        experience_level: obj
            .get("experienceLevel")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok()),
        ats_score: first(obj, SCORE_KEYS).and_then(score).unwrap_or(0),
        ai_score: obj.get("aiScore").and_then(score),
        missing_keywords: text_list(obj.get("missingKeywords")),
        missing_skills: text_list(obj.get("missingSkills")),
        whats_working: text_list(obj.get("whatsWorking")),
        suggested_improvements: first(obj, IMPROVEMENT_KEYS)
            .map(improvements)
            .unwrap_or_default(),
        quick_tips: text_list(obj.get("quickTips")),
        created_at: first(obj, CREATED_AT_KEYS).and_then(timestamp),
    })
}

/// Normalizes a history listing. Accepts a bare array or an object wrapping one.
///
/// Entries without an identifier cannot be viewed or deleted and are dropped;
/// for duplicate identifiers the first (most recent) entry wins.
pub fn normalize_history(payload: &Value) -> Result<Vec<AnalysisRecord>, serde_json::Error> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(obj) => HISTORY_WRAPPER_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array))
            .ok_or_else(|| serde_json::Error::custom("history response has no list of analyses"))?,
        Value::Null => return Ok(Vec::new()),
        _ => return Err(serde_json::Error::custom("history response is not a list")),
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(record) = normalize_record(item) else {
            warn!("Skipping non-object history entry");
            continue;
        };
        let Some(id) = record.id.clone() else {
            warn!("Skipping history entry without an id");
            continue;
        };
        if !seen.insert(id.clone()) {
            warn!("Skipping duplicate history entry {id}");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

fn first<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Integer score in `0..=100`. Fractions round, out-of-range values clamp.
fn score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn non_empty_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn improvements(value: &Value) -> SuggestedImprovements {
    SuggestedImprovements {
        summary: value.get("summary").and_then(non_empty_text),
        experience: value.get("experience").and_then(non_empty_text),
    }
}

/// RFC 3339 strings or epoch milliseconds.
fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::ExperienceLevel;
    use serde_json::json;

    #[test]
    fn test_results_shape() {
        let payload = json!({
            "analysis": {
                "_id": "a1",
                "resumeFileName": "cv.pdf",
                "targetRole": "Backend Developer",
                "experienceLevel": "mid",
                "atsScore": 72,
                "aiScore": 81,
                "missingKeywords": ["Kubernetes", "gRPC"],
                "missingSkills": ["Go"],
                "whatsWorking": ["Clear layout"],
                "suggestedImprovements": {"summary": "Lead with impact"},
                "quickTips": ["Use numbers"],
                "createdAt": "2024-05-01T10:00:00.000Z"
            }
        });
        let record = normalize_record(&payload).unwrap();
        assert_eq!(record.id.as_deref(), Some("a1"));
        assert_eq!(record.resume_file_name, "cv.pdf");
        assert_eq!(record.target_role.as_deref(), Some("Backend Developer"));
        assert_eq!(record.experience_level, Some(ExperienceLevel::Mid));
        assert_eq!(record.ats_score, 72);
        assert_eq!(record.ai_score, Some(81));
        assert_eq!(record.missing_keywords, vec!["Kubernetes", "gRPC"]);
        assert_eq!(
            record.suggested_improvements.summary.as_deref(),
            Some("Lead with impact")
        );
        assert_eq!(record.suggested_improvements.experience, None);
        assert_eq!(
            record.created_at.unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_legacy_aliases() {
        let record = normalize_record(&json!({
            "matchScore": 64,
            "fileName": "resume.docx",
            "improvements": {"experience": "Quantify results"}
        }))
        .unwrap();
        assert_eq!(record.ats_score, 64);
        assert_eq!(record.resume_file_name, "resume.docx");
        assert_eq!(
            record.suggested_improvements.experience.as_deref(),
            Some("Quantify results")
        );
    }

    #[test]
    fn test_ats_score_wins_over_match_score() {
        let record = normalize_record(&json!({"atsScore": 90, "matchScore": 10})).unwrap();
        assert_eq!(record.ats_score, 90);
    }

    #[test]
    fn test_null_alias_falls_through() {
        let record = normalize_record(&json!({"atsScore": null, "matchScore": 55})).unwrap();
        assert_eq!(record.ats_score, 55);
    }

    #[test]
    fn test_history_summary_shape() {
        let record = normalize_record(&json!({
            "id": 3,
            "filename": "old.pdf",
            "score": 58,
            "date": "2023-12-24T08:30:00Z"
        }))
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("3"));
        assert_eq!(record.resume_file_name, "old.pdf");
        assert_eq!(record.ats_score, 58);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_defaults_for_sparse_payload() {
        let record = normalize_record(&json!({})).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.ats_score, 0);
        assert_eq!(record.ai_score, None);
        assert_eq!(record.resume_file_name, DEFAULT_RESUME_FILE_NAME);
        assert!(record.missing_keywords.is_empty());
        assert!(record.quick_tips.is_empty());
        assert!(record.suggested_improvements.is_empty());
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn test_no_payload() {
        assert_eq!(normalize_record(&Value::Null), None);
        assert_eq!(normalize_record(&json!({"analysis": null})), None);
        assert_eq!(normalize_record(&json!("text")), None);
    }

    #[test]
    fn test_scores_clamped_and_rounded() {
        let record = normalize_record(&json!({"atsScore": 140, "aiScore": -3})).unwrap();
        assert_eq!(record.ats_score, 100);
        assert_eq!(record.ai_score, Some(0));

        let record = normalize_record(&json!({"atsScore": 79.5, "aiScore": "61"})).unwrap();
        assert_eq!(record.ats_score, 80);
        assert_eq!(record.ai_score, Some(61));
    }

    #[test]
    fn test_unknown_experience_level_dropped() {
        let record = normalize_record(&json!({"experienceLevel": "principal"})).unwrap();
        assert_eq!(record.experience_level, None);
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let record = normalize_record(&json!({"createdAt": 1_700_000_000_000_i64})).unwrap();
        assert_eq!(record.created_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_history_drops_unaddressable_and_duplicates() {
        let records = normalize_history(&json!([
            {"id": 1, "score": 90},
            {"score": 40},
            {"id": "1", "score": 10},
            "garbage",
            {"_id": "2", "score": 70}
        ]))
        .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(records[0].ats_score, 90);
    }

    #[test]
    fn test_history_wrapped_and_empty() {
        let wrapped = normalize_history(&json!({"history": [{"id": "x", "score": 1}]})).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert!(normalize_history(&Value::Null).unwrap().is_empty());
        assert!(normalize_history(&json!({"unexpected": true})).is_err());
        assert!(normalize_history(&json!(42)).is_err());
    }
}
