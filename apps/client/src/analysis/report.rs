use crate::analysis::presenter::{AnalysisView, ScoreBand};
use crate::analysis::stats::HistoryStats;
use crate::models::analysis::AnalysisRecord;

/// Renders an analysis as a plain-text report, sections in results-screen order.
/// Empty sections are left out.
pub fn render_report(view: &AnalysisView) -> String {
    let record = &view.record;
    let mut out = String::from("# Resume Analysis Complete\n\n");

    out.push_str(&format!(
        "Match score: {}/100 ({}, {})\n",
        record.ats_score,
        view.band,
        view.tier().name()
    ));
    if let (Some(ai_score), Some(ai_band)) = (record.ai_score, view.ai_band) {
        out.push_str(&format!("AI score: {ai_score}/100 ({ai_band})\n"));
    }
    out.push_str(&format!("File: {}\n", record.resume_file_name));
    if let Some(role) = &record.target_role {
        out.push_str(&format!("Target role: {role}\n"));
    }
    if let Some(level) = record.experience_level {
        out.push_str(&format!("Experience level: {level}\n"));
    }
    out.push('\n');

    push_list(&mut out, "What's Working", &record.whats_working);
    if !record.missing_keywords.is_empty() {
        out.push_str("## Missing Keywords\n\n");
        out.push_str(&view.keywords_text());
        out.push_str("\n\n");
    }
    if !record.missing_skills.is_empty() {
        out.push_str("## Skills Gap Analysis\n\n");
        out.push_str(&record.missing_skills.join(", "));
        out.push_str(
            "\n\nConsider adding these skills to your resume if you have experience with them.\n\n",
        );
    }

    let improvements = &record.suggested_improvements;
    if !improvements.is_empty() {
        out.push_str("## Suggested Improvements\n\n");
        if let Some(summary) = &improvements.summary {
            out.push_str(&format!("### Summary\n{summary}\n\n"));
        }
        if let Some(experience) = &improvements.experience {
            out.push_str(&format!("### Experience Section\n{experience}\n\n"));
        }
    }

    if let Some(created_at) = record.created_at {
        out.push_str(&format!(
            "Analyzed: {}\n\n",
            created_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    push_list(&mut out, "Quick Tips to Improve", &record.quick_tips);
    out.trim_end().to_string() + "\n"
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {title}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}

/// One line per cached record followed by the aggregate summary.
/// Rows whose deletion is in flight are marked.
pub fn render_history(
    records: &[AnalysisRecord],
    stats: Option<HistoryStats>,
    is_pending: impl Fn(&str) -> bool,
) -> String {
    if records.is_empty() {
        return "No History Yet\n\nUpload your first resume to get started: refinery analyze <FILE>\n"
            .to_string();
    }

    let mut out = String::from("# Analysis History\n\n");
    for record in records {
        let id = record.id.as_deref().unwrap_or("-");
        let band = ScoreBand::of(record.ats_score);
        let date = record
            .created_at
            .map(|d| d.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        out.push_str(&format!(
            "[{id}] {} - {date} - {} ({}){}",
            record.resume_file_name,
            record.ats_score,
            band.tier().name(),
            if is_pending(id) { " (deleting…)" } else { "" }
        ));
        if let Some(role) = &record.target_role {
            out.push_str(&format!(" - {role}"));
        }
        out.push('\n');
    }

    if let Some(stats) = stats {
        out.push_str(&format!(
            "\nTotal analyses: {}\nAverage score: {} ({})\nBest score: {}\n",
            stats.count,
            stats.average_score,
            stats.average_band(),
            stats.max_score
        ));
    }
    out
}
