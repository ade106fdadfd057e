use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::aggregate::AggregateView;
use crate::catalog::{CatalogueSummary, SubmissionEntry};
use crate::models::{MatchResult, SimilarityRecord};
use crate::present::{self, CORPUS_LISTING_LIMIT};
use crate::risk::{classify_fraction, RiskTier};

const TOP_SUSPECTS: usize = 10;

fn percent(score: f64) -> f64 {
    score * 100.0
}

pub fn build_statistics_report(
    scope: Option<&str>,
    generated_at: DateTime<Utc>,
    view: &AggregateView,
    records: &[SimilarityRecord],
) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all assignments");

    let _ = writeln!(output, "# Similarity Risk Report");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        scope_label,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Students: {}", view.totals.total_students);
    let _ = writeln!(output, "- Submissions: {}", view.totals.total_submissions);
    let _ = writeln!(output, "- Comparisons: {}", view.totals.total_comparisons);
    let _ = writeln!(output, "- High risk pairs: {}", view.high_risk_pairs.len());
    let mix: Vec<String> = tier_counts(records)
        .iter()
        .map(|(tier, count)| format!("{} {}", tier.label().to_lowercase(), count))
        .collect();
    let _ = writeln!(output, "- Risk mix: {}", mix.join(", "));

    let _ = writeln!(output);
    let _ = writeln!(output, "## High Risk Pairs");

    if view.high_risk_pairs.is_empty() {
        let _ = writeln!(output, "No pairs at or above the high risk threshold.");
    } else {
        for pair in view.high_risk_pairs.iter() {
            let _ = writeln!(
                output,
                "- {} / {} ({}): {:.1}%",
                pair.student_a,
                pair.student_b,
                pair.assignment,
                percent(pair.composite_score)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Similarities");

    let listing = present::similarity_listing(records, CORPUS_LISTING_LIMIT);
    if listing.is_empty() {
        let _ = writeln!(
            output,
            "No similarity data available yet. Upload at least 2 files to see comparisons."
        );
    } else {
        for entry in listing.iter() {
            let record = entry.record;
            let [lexical, ast, jaccard, sequence] = record.metrics.values().map(percent);
            let _ = writeln!(
                output,
                "- [{}] {} vs {} on {}: {:.1}% match (lexical {:.1}%, AST {:.1}%, jaccard {:.1}%, sequence {:.1}%)",
                entry.risk.label,
                record.student_a,
                record.student_b,
                record.assignment,
                percent(record.composite_score),
                lexical,
                ast,
                jaccard,
                sequence
            );
        }
        if records.len() > listing.len() {
            let _ = writeln!(
                output,
                "- ... {} more comparisons not shown",
                records.len() - listing.len()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Suspects");

    if view.suspect_ranking.is_empty() {
        let _ = writeln!(output, "No suspects identified yet.");
    } else {
        for (rank, suspect) in view.suspect_ranking.iter().take(TOP_SUSPECTS).enumerate() {
            let _ = writeln!(
                output,
                "{}. {} averages {:.0}% ({}): {} high-risk, {} medium-risk across {} comparisons",
                rank + 1,
                suspect.student_id,
                percent(suspect.avg_similarity),
                classify_fraction(suspect.avg_similarity).label,
                suspect.high_risk_count,
                suspect.medium_risk_count,
                suspect.total_submissions
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Assignment");

    if view.assignment_rollup.is_empty() {
        let _ = writeln!(output, "No assignment data available yet.");
    } else {
        for group in view.assignment_rollup.iter() {
            let _ = writeln!(
                output,
                "- {}: {} pairs analyzed, low {} / medium {} / high {}, avg similarity {:.0}%",
                group.assignment,
                group.total_pairs,
                group.low_risk,
                group.medium_risk,
                group.high_risk,
                percent(group.avg_similarity)
            );
        }
    }

    output
}

/// Charts cover the top matches only; the detailed section ranks every
/// result unless `detail_limit` caps it.
pub fn build_match_report(results: &[MatchResult], detail_limit: Option<usize>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Analysis Results");

    if results.is_empty() {
        let _ = writeln!(output, "No similar code found. This submission appears to be original.");
        return output;
    }

    let view = present::present(results);
    let _ = writeln!(output);
    let _ = writeln!(output, "- Matches found: {}", view.summary.count);
    let _ = writeln!(
        output,
        "- Highest match: {:.1}%",
        percent(view.summary.max_score.unwrap_or(0.0))
    );
    let _ = writeln!(output, "- Average: {:.1}%", percent(view.summary.avg_score));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Matches");
    for point in view.charts.bar.points.iter() {
        let _ = writeln!(output, "- {}: {:.1}%", point.label, point.value);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Average Metrics");
    for (axis, value) in view.charts.radar.axes.iter().zip(view.charts.radar.values) {
        let _ = writeln!(output, "- {}: {:.1}%", axis, value);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Detailed Match Analysis");
    let ranked = present::top_matches(results, detail_limit.unwrap_or(results.len()));
    for result in ranked.iter() {
        let risk = classify_fraction(result.composite_score);
        let [lexical, ast, jaccard, sequence] = result.metrics.values().map(percent);
        let _ = writeln!(
            output,
            "- {} {:.2}% [{} {}] lexical {:.1}%, AST {:.1}%, jaccard {:.1}%, sequence {:.1}%",
            result.filename,
            percent(result.composite_score),
            risk.tier.icon(),
            risk.label,
            lexical,
            ast,
            jaccard,
            sequence
        );
    }
    if ranked.len() < results.len() {
        let _ = writeln!(
            output,
            "- ... {} more matches not shown",
            results.len() - ranked.len()
        );
    }

    output
}

pub fn build_catalogue_report(entries: &[SubmissionEntry], summary: &CatalogueSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Uploaded Files");
    let _ = writeln!(
        output,
        "{} files, {:.2} KB stored",
        summary.total_files, summary.total_size_kb
    );
    let _ = writeln!(output);

    if entries.is_empty() {
        let _ = writeln!(output, "No submissions found.");
        return output;
    }

    for entry in entries.iter() {
        let _ = writeln!(
            output,
            "## {} ({} students, {}, {})",
            entry.assignment_name,
            entry.student_count(),
            entry.timestamp,
            entry.status
        );
        for (owner, filename) in entry.file_owners() {
            let _ = writeln!(output, "- {}: {}", owner, filename);
        }
    }

    output
}

/// Counts of each tier in a corpus, lowest tier first.
pub fn tier_counts(records: &[SimilarityRecord]) -> [(RiskTier, usize); 3] {
    let mut counts = [(RiskTier::Low, 0), (RiskTier::Medium, 0), (RiskTier::High, 0)];
    for record in records {
        let tier = classify_fraction(record.composite_score).tier;
        if let Some(slot) = counts.iter_mut().find(|(t, _)| *t == tier) {
            slot.1 += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::models::ComponentMetrics;
    use chrono::TimeZone;

    fn record(a: &str, b: &str, percent: f64) -> SimilarityRecord {
        SimilarityRecord {
            student_a: a.to_string(),
            student_b: b.to_string(),
            assignment: "asgn1".to_string(),
            composite_score: percent / 100.0,
            metrics: ComponentMetrics {
                lexical: 0.5,
                structural: 0.25,
                jaccard: 0.125,
                sequence: 1.0,
            },
        }
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, 9, 30, 0).unwrap()
    }

    #[test]
    fn statistics_report_lists_every_section() {
        let records = vec![
            record("A", "B", 90.0),
            record("A", "C", 40.0),
            record("B", "C", 60.0),
        ];
        let view = aggregate(&records, 3);
        let report = build_statistics_report(Some("asgn1"), generated_at(), &view, &records);

        assert!(report.contains("Generated for asgn1 at 2026-02-03 09:30 UTC"));
        assert!(report.contains("- Comparisons: 3"));
        assert!(report.contains("- Risk mix: low risk 1, medium risk 1, high risk 1"));
        assert!(report.contains("- A / B (asgn1): 90.0%"));
        assert!(report.contains("[MEDIUM RISK] B vs C on asgn1: 60.0% match"));
        assert!(report.contains("1. B averages 75% (MEDIUM RISK)"));
        assert!(report.contains("low 1 / medium 1 / high 1, avg similarity 63%"));
    }

    #[test]
    fn empty_statistics_report_has_placeholders() {
        let view = aggregate(&[], 0);
        let report = build_statistics_report(None, generated_at(), &view, &[]);
        assert!(report.contains("all assignments"));
        assert!(report.contains("No pairs at or above the high risk threshold."));
        assert!(report.contains("No suspects identified yet."));
        assert!(report.contains("No assignment data available yet."));
    }

    #[test]
    fn match_report_summarizes_results() {
        let results = vec![
            MatchResult {
                filename: "hw1_alice.py".to_string(),
                composite_score: 0.75,
                metrics: ComponentMetrics::default(),
            },
            MatchResult {
                filename: "hw1_bob.py".to_string(),
                composite_score: 0.25,
                metrics: ComponentMetrics::default(),
            },
        ];
        let report = build_match_report(&results, None);
        assert!(report.contains("- Matches found: 2"));
        assert!(report.contains("- Highest match: 75.0%"));
        assert!(report.contains("- Average: 50.0%"));
        assert!(report.contains("- alice: 75.0%"));
        assert!(report.contains("- hw1_bob.py 25.00% [fa-check-circle LOW RISK]"));
    }

    #[test]
    fn empty_match_report_reads_as_original() {
        let report = build_match_report(&[], None);
        assert!(report.contains("appears to be original"));
    }

    fn ranked_matches(count: usize) -> Vec<MatchResult> {
        (0..count)
            .map(|i| MatchResult {
                filename: format!("hw1_s{i}.py"),
                composite_score: (i + 1) as f64 / 20.0,
                metrics: ComponentMetrics {
                    lexical: 0.123,
                    structural: 0.5,
                    jaccard: 0.25,
                    sequence: 0.0,
                },
            })
            .collect()
    }

    #[test]
    fn detailed_analysis_lists_every_match_with_metrics() {
        let results = ranked_matches(12);
        let report = build_match_report(&results, None);
        let detail = report
            .split("## Detailed Match Analysis")
            .nth(1)
            .unwrap();

        assert_eq!(detail.lines().filter(|l| l.starts_with("- ")).count(), 12);
        // lowest score ranks last, past the ten charted matches
        assert!(detail.contains(
            "- hw1_s0.py 5.00% [fa-check-circle LOW RISK] lexical 12.3%, AST 50.0%, jaccard 25.0%, sequence 0.0%"
        ));
        assert!(detail.contains("- hw1_s11.py 60.00% [fa-exclamation-circle MEDIUM RISK]"));

        let charted = report.split("## Top Matches").nth(1).unwrap();
        assert!(!charted
            .split("## Average Metrics")
            .next()
            .unwrap()
            .contains("- s0:"));
    }

    #[test]
    fn detail_limit_caps_rows_and_notes_the_rest() {
        let report = build_match_report(&ranked_matches(12), Some(3));
        assert!(report.contains("- hw1_s11.py"));
        assert!(!report.contains("- hw1_s8.py"));
        assert!(report.contains("- ... 9 more matches not shown"));
        assert!(report.contains("- Matches found: 12"));
    }

    #[test]
    fn tier_counts_cover_the_corpus() {
        let records = vec![record("A", "B", 90.0), record("A", "C", 10.0), record("B", "C", 20.0)];
        assert_eq!(
            tier_counts(&records),
            [(RiskTier::Low, 2), (RiskTier::Medium, 0), (RiskTier::High, 1)]
        );
    }
}
