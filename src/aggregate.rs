use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::models::SimilarityRecord;
use crate::risk::{classify_fraction, RiskTier};

/// Per-student summary across every comparison mentioning the student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentSuspect {
    pub student_id: String,
    pub high_risk_count: usize,
    pub medium_risk_count: usize,
    pub total_submissions: usize,
    pub avg_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentRollup {
    pub assignment: String,
    pub total_pairs: usize,
    pub low_risk: usize,
    pub medium_risk: usize,
    pub high_risk: usize,
    pub avg_similarity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GlobalTotals {
    pub total_students: usize,
    pub total_submissions: usize,
    pub total_comparisons: usize,
}

/// Every aggregate derived from one corpus snapshot. Averages are `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateView {
    #[serde(flatten)]
    pub totals: GlobalTotals,
    pub high_risk_pairs: Vec<SimilarityRecord>,
    #[serde(rename = "top_suspects")]
    pub suspect_ranking: Vec<StudentSuspect>,
    #[serde(rename = "assignment_stats")]
    pub assignment_rollup: Vec<AssignmentRollup>,
}

/// `total_submissions` comes from the submission catalogue; it cannot be
/// derived from comparisons.
pub fn aggregate(records: &[SimilarityRecord], total_submissions: usize) -> AggregateView {
    let view = AggregateView {
        totals: global_totals(records, total_submissions),
        high_risk_pairs: high_risk_pairs(records),
        suspect_ranking: rank_suspects(records),
        assignment_rollup: rollup_assignments(records),
    };

    debug!(
        comparisons = view.totals.total_comparisons,
        students = view.totals.total_students,
        high_risk = view.high_risk_pairs.len(),
        assignments = view.assignment_rollup.len(),
        "aggregated similarity corpus"
    );
    view
}

pub fn global_totals(records: &[SimilarityRecord], total_submissions: usize) -> GlobalTotals {
    let students: HashSet<&str> = records
        .iter()
        .flat_map(|record| [record.student_a.as_str(), record.student_b.as_str()])
        .collect();

    GlobalTotals {
        total_students: students.len(),
        total_submissions,
        total_comparisons: records.len(),
    }
}

pub fn high_risk_pairs(records: &[SimilarityRecord]) -> Vec<SimilarityRecord> {
    records
        .iter()
        .filter(|record| classify_fraction(record.composite_score).tier == RiskTier::High)
        .cloned()
        .collect()
}

#[derive(Default)]
struct RiskTally {
    low: usize,
    medium: usize,
    high: usize,
    count: usize,
    score_sum: f64,
}

impl RiskTally {
    fn add(&mut self, score: f64) {
        match classify_fraction(score).tier {
            RiskTier::High => self.high += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::Low => self.low += 1,
        }
        self.count += 1;
        self.score_sum += score;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.score_sum / self.count as f64
        }
    }
}

/// Ordered by average similarity, then high-risk count, then student id.
pub fn rank_suspects(records: &[SimilarityRecord]) -> Vec<StudentSuspect> {
    let mut tallies: HashMap<&str, RiskTally> = HashMap::new();

    for record in records {
        for student in [record.student_a.as_str(), record.student_b.as_str()] {
            tallies.entry(student).or_default().add(record.composite_score);
        }
    }

    let mut ranking: Vec<StudentSuspect> = tallies
        .into_iter()
        .map(|(student, tally)| StudentSuspect {
            student_id: student.to_string(),
            high_risk_count: tally.high,
            medium_risk_count: tally.medium,
            total_submissions: tally.count,
            avg_similarity: tally.mean(),
        })
        .collect();

    ranking.sort_by(|a, b| {
        b.avg_similarity
            .total_cmp(&a.avg_similarity)
            .then_with(|| b.high_risk_count.cmp(&a.high_risk_count))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    ranking
}

/// Groups are returned in the order their assignment first appears.
pub fn rollup_assignments(records: &[SimilarityRecord]) -> Vec<AssignmentRollup> {
    let mut order: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, RiskTally)> = Vec::new();

    for record in records {
        let slot = *order.entry(record.assignment.as_str()).or_insert_with(|| {
            groups.push((record.assignment.as_str(), RiskTally::default()));
            groups.len() - 1
        });
        groups[slot].1.add(record.composite_score);
    }

    groups
        .into_iter()
        .map(|(assignment, tally)| AssignmentRollup {
            assignment: assignment.to_string(),
            total_pairs: tally.count,
            low_risk: tally.low,
            medium_risk: tally.medium,
            high_risk: tally.high,
            avg_similarity: tally.mean(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentMetrics;
    use proptest::prelude::*;

    fn record(a: &str, b: &str, assignment: &str, percent: f64) -> SimilarityRecord {
        SimilarityRecord {
            student_a: a.to_string(),
            student_b: b.to_string(),
            assignment: assignment.to_string(),
            composite_score: percent / 100.0,
            metrics: ComponentMetrics::default(),
        }
    }

    fn sample_corpus() -> Vec<SimilarityRecord> {
        vec![
            record("A", "B", "asgn1", 90.0),
            record("A", "C", "asgn1", 40.0),
            record("B", "C", "asgn1", 60.0),
        ]
    }

    #[test]
    fn totals_count_distinct_students() {
        let totals = global_totals(&sample_corpus(), 7);
        assert_eq!(
            totals,
            GlobalTotals {
                total_students: 3,
                total_submissions: 7,
                total_comparisons: 3,
            }
        );
    }

    #[test]
    fn high_risk_pairs_keep_corpus_order() {
        let mut corpus = sample_corpus();
        corpus.push(record("D", "E", "asgn2", 80.0));
        let pairs = high_risk_pairs(&corpus);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].student_b, "B");
        assert_eq!(pairs[1].student_a, "D");
    }

    #[test]
    fn suspects_accumulate_per_student() {
        let ranking = rank_suspects(&sample_corpus());
        let ids: Vec<_> = ranking.iter().map(|s| s.student_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);

        let a = &ranking[1];
        assert_eq!(a.high_risk_count, 1);
        assert_eq!(a.medium_risk_count, 0);
        assert_eq!(a.total_submissions, 2);
        assert!((a.avg_similarity - 0.65).abs() < 1e-9);

        let b = &ranking[0];
        assert!((b.avg_similarity - 0.75).abs() < 1e-9);
        assert_eq!((b.high_risk_count, b.medium_risk_count), (1, 1));
    }

    #[test]
    fn suspect_ties_break_on_high_risk_then_id() {
        let corpus = vec![
            record("zed", "amy", "hw", 87.5),
            record("zed", "amy", "hw", 12.5),
            record("bob", "cat", "hw", 50.0),
            record("bob", "cat", "hw", 50.0),
        ];
        let ids: Vec<_> = rank_suspects(&corpus)
            .into_iter()
            .map(|s| s.student_id)
            .collect();
        assert_eq!(ids, vec!["amy", "zed", "bob", "cat"]);
    }

    #[test]
    fn rollup_groups_in_first_seen_order() {
        let mut corpus = vec![record("X", "Y", "zeta", 10.0)];
        corpus.extend(sample_corpus());
        corpus.push(record("X", "Z", "zeta", 95.0));

        let rollup = rollup_assignments(&corpus);
        assert_eq!(rollup.len(), 2);
        assert_eq!(rollup[0].assignment, "zeta");
        assert_eq!(rollup[0].total_pairs, 2);
        assert_eq!((rollup[0].low_risk, rollup[0].high_risk), (1, 1));

        let asgn1 = &rollup[1];
        assert_eq!(asgn1.assignment, "asgn1");
        assert_eq!(
            (asgn1.low_risk, asgn1.medium_risk, asgn1.high_risk),
            (1, 1, 1)
        );
        assert!((asgn1.avg_similarity - 190.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn empty_corpus_degrades_to_zeroes() {
        let view = aggregate(&[], 0);
        assert_eq!(view, AggregateView::default());
    }

    #[test]
    fn view_serializes_with_service_keys() {
        let view = aggregate(&sample_corpus(), 3);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["total_comparisons"], 3);
        assert_eq!(json["top_suspects"][0]["student_id"], "A");
        assert_eq!(json["assignment_stats"][0]["total_pairs"], 3);
    }

    fn arb_corpus() -> impl Strategy<Value = Vec<SimilarityRecord>> {
        let students = prop::sample::select(vec!["ann", "ben", "cy", "dee", "eve"]);
        prop::collection::vec(
            (students.clone(), students, 0u8..3, 0.0f64..100.0),
            0..40,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .filter(|(a, b, _, _)| a != b)
                .map(|(a, b, asg, score)| record(a, b, &format!("hw{asg}"), score))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn every_record_counts_for_two_students(corpus in arb_corpus()) {
            let ranking = rank_suspects(&corpus);
            let touched: usize = ranking.iter().map(|s| s.total_submissions).sum();
            prop_assert_eq!(touched, 2 * corpus.len());
        }

        #[test]
        fn ranking_is_sorted_and_repeatable(corpus in arb_corpus()) {
            let first = rank_suspects(&corpus);
            for pair in first.windows(2) {
                prop_assert!(pair[0].avg_similarity >= pair[1].avg_similarity);
            }
            prop_assert_eq!(first, rank_suspects(&corpus));
        }

        #[test]
        fn rollup_pairs_partition_the_corpus(corpus in arb_corpus()) {
            let rollup = rollup_assignments(&corpus);
            let pairs: usize = rollup.iter().map(|g| g.total_pairs).sum();
            prop_assert_eq!(pairs, corpus.len());
            for group in &rollup {
                prop_assert_eq!(group.low_risk + group.medium_risk + group.high_risk, group.total_pairs);
            }
        }
    }
}
