//! Records exchanged with the statistics and upload services.
//!
//! Wire rows (`SimilarityRow`, `MatchRow`) mirror the JSON the services send.
//! They are converted once into canonical records whose scores are fractions
//! in `[0, 1]`; nothing past this module sees percentages on the way in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// The four similarity sub-measures reported for every comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComponentMetrics {
    pub lexical: f64,
    pub structural: f64,
    pub jaccard: f64,
    pub sequence: f64,
}

impl ComponentMetrics {
    pub const LABELS: [&'static str; 4] = ["Lexical", "AST", "Jaccard", "Sequence"];

    pub fn values(&self) -> [f64; 4] {
        [self.lexical, self.structural, self.jaccard, self.sequence]
    }

    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|value| value.is_finite())
    }

    fn from_wire(values: [f64; 4], scale: MetricScale) -> Result<Self, RecordError> {
        const FIELDS: [&str; 4] = ["sim_lex", "sim_ast", "jaccard", "seqmatch"];
        for (value, field) in values.iter().zip(FIELDS) {
            if !value.is_finite() {
                return Err(RecordError::NonFinite { field });
            }
        }

        let [lexical, structural, jaccard, sequence] = values.map(|v| scale.to_fraction(v));
        Ok(Self {
            lexical,
            structural,
            jaccard,
            sequence,
        })
    }
}

/// Scale in which an upstream service reports a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MetricScale {
    #[default]
    Percent,
    Fraction,
}

impl MetricScale {
    pub fn to_fraction(self, value: f64) -> f64 {
        match self {
            MetricScale::Percent => value / 100.0,
            MetricScale::Fraction => value,
        }
    }
}

/// One pairwise comparison between two students' submissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityRecord {
    pub student_a: String,
    pub student_b: String,
    pub assignment: String,
    pub composite_score: f64,
    pub metrics: ComponentMetrics,
}

impl SimilarityRecord {
    /// False when the score or any metric is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.composite_score.is_finite() && self.metrics.is_finite()
    }
}

/// One file-vs-corpus outcome for a freshly uploaded submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub filename: String,
    pub composite_score: f64,
    pub metrics: ComponentMetrics,
}

/// A file staged for upload together with the student it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub file: PathBuf,
    pub student_id: String,
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRow {
    pub student1: String,
    pub student2: String,
    pub assignment: String,
    pub similarity: f64,
    pub sim_lex: f64,
    pub sim_ast: f64,
    pub jaccard: f64,
    pub seqmatch: f64,
}

impl SimilarityRow {
    /// `similarity` is always a percentage; `scale` applies to the four metrics.
    pub fn into_record(self, scale: MetricScale) -> Result<SimilarityRecord, RecordError> {
        if self.student1 == self.student2 {
            return Err(RecordError::SelfComparison(self.student1));
        }
        if !self.similarity.is_finite() {
            return Err(RecordError::NonFinite {
                field: "similarity",
            });
        }

        let metrics = ComponentMetrics::from_wire(
            [self.sim_lex, self.sim_ast, self.jaccard, self.seqmatch],
            scale,
        )?;

        Ok(SimilarityRecord {
            student_a: self.student1,
            student_b: self.student2,
            assignment: self.assignment,
            composite_score: MetricScale::Percent.to_fraction(self.similarity),
            metrics,
        })
    }
}

/// Payload of the statistics endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    #[serde(default)]
    pub total_students: usize,
    #[serde(default)]
    pub total_submissions: usize,
    #[serde(default)]
    pub similarities: Vec<SimilarityRow>,
}

impl StatisticsSnapshot {
    pub fn into_corpus(self, scale: MetricScale) -> Result<Corpus, RecordError> {
        let records = self
            .similarities
            .into_iter()
            .enumerate()
            .map(|(index, row)| row.into_record(scale).map_err(|err| err.at_row(index)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Corpus {
            reported_students: self.total_students,
            total_submissions: self.total_submissions,
            records,
        })
    }
}

/// A canonical similarity corpus plus the totals supplied alongside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub reported_students: usize,
    pub total_submissions: usize,
    pub records: Vec<SimilarityRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRow {
    pub filename: String,
    pub probability: f64,
    pub sim_lex: f64,
    pub sim_ast: f64,
    pub jaccard: f64,
    pub seqmatch: f64,
}

impl MatchRow {
    pub fn into_result(self) -> Result<MatchResult, RecordError> {
        if !self.probability.is_finite() {
            return Err(RecordError::NonFinite {
                field: "probability",
            });
        }

        let metrics = ComponentMetrics::from_wire(
            [self.sim_lex, self.sim_ast, self.jaccard, self.seqmatch],
            MetricScale::Fraction,
        )?;

        Ok(MatchResult {
            filename: self.filename,
            composite_score: self.probability,
            metrics,
        })
    }
}

/// Payload returned by the upload endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSet {
    #[serde(default)]
    pub top_matches: Vec<MatchRow>,
}

impl MatchSet {
    pub fn into_results(self) -> Result<Vec<MatchResult>, RecordError> {
        self.top_matches
            .into_iter()
            .enumerate()
            .map(|(index, row)| row.into_result().map_err(|err| err.at_row(index)))
            .collect()
    }
}
