//! Presentation-ready derivations over match sets and similarity corpora.
//!
//! Everything here is a pure transform: the rendering layer receives plain
//! values and never calls back into the core. Chart values are percentages.

use serde::Serialize;

use crate::models::{ComponentMetrics, MatchResult, SimilarityRecord};
use crate::risk::{classify_fraction, RiskClass};

/// Matches listed after an upload.
pub const LISTING_LIMIT: usize = 10;
/// Bars drawn in the top-matches chart.
pub const BAR_CHART_LIMIT: usize = 5;
/// Corpus rows listed on the statistics page.
pub const CORPUS_LISTING_LIMIT: usize = 50;

pub const BAR_SERIES_LABEL: &str = "Plagiarism Probability (%)";
pub const RADAR_SERIES_LABEL: &str = "Average Similarity Metrics";

/// Anything carrying a composite score and the four component metrics.
pub trait Scored {
    /// Composite score in `[0, 1]`.
    fn score(&self) -> f64;
    fn metrics(&self) -> &ComponentMetrics;
    fn chart_label(&self) -> String;
}

impl Scored for MatchResult {
    fn score(&self) -> f64 {
        self.composite_score
    }

    fn metrics(&self) -> &ComponentMetrics {
        &self.metrics
    }

    /// `hw1_alice.py` is labelled `alice`.
    fn chart_label(&self) -> String {
        let tail = self.filename.rsplit('_').next().unwrap_or(self.filename.as_str());
        tail.strip_suffix(".py").unwrap_or(tail).to_string()
    }
}

impl Scored for SimilarityRecord {
    fn score(&self) -> f64 {
        self.composite_score
    }

    fn metrics(&self) -> &ComponentMetrics {
        &self.metrics
    }

    fn chart_label(&self) -> String {
        format!("{} vs {}", self.student_a, self.student_b)
    }
}

/// Highest scores first; equal scores keep their original relative order.
pub fn top_matches<T: Scored + Clone>(results: &[T], n: usize) -> Vec<T> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    /// `None` for an empty set.
    pub max_score: Option<f64>,
    pub avg_score: f64,
}

pub fn summary<T: Scored>(results: &[T]) -> ScoreSummary {
    let max_score = results.iter().map(Scored::score).reduce(f64::max);
    let total: f64 = results.iter().map(Scored::score).sum();

    ScoreSummary {
        count: results.len(),
        max_score,
        avg_score: mean(total, results.len()),
    }
}

/// Mean of each component metric; zeroes for an empty set.
pub fn component_means<T: Scored>(results: &[T]) -> ComponentMetrics {
    let mut sums = [0.0f64; 4];
    for result in results {
        for (sum, value) in sums.iter_mut().zip(result.metrics().values()) {
            *sum += value;
        }
    }

    let [lexical, structural, jaccard, sequence] = sums.map(|sum| mean(sum, results.len()));
    ComponentMetrics {
        lexical,
        structural,
        jaccard,
        sequence,
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarPoint {
    pub label: String,
    pub value: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub label: &'static str,
    pub points: Vec<BarPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    pub label: &'static str,
    pub axes: [&'static str; 4],
    pub values: [f64; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub bar: BarSeries,
    pub radar: RadarSeries,
}

/// Bars cover the five best scores; the radar averages the whole input.
pub fn chart_series<T: Scored + Clone>(results: &[T]) -> ChartSeries {
    let points = top_matches(results, BAR_CHART_LIMIT)
        .iter()
        .map(|result| BarPoint {
            label: result.chart_label(),
            value: result.score() * 100.0,
            color: classify_fraction(result.score()).color,
        })
        .collect();

    ChartSeries {
        bar: BarSeries {
            label: BAR_SERIES_LABEL,
            points,
        },
        radar: RadarSeries {
            label: RADAR_SERIES_LABEL,
            axes: ComponentMetrics::LABELS,
            values: component_means(results).values().map(|v| v * 100.0),
        },
    }
}

/// What the result screen shows for one freshly analyzed upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPresentation<T> {
    pub listing: Vec<T>,
    pub summary: ScoreSummary,
    pub charts: ChartSeries,
}

/// The summary covers every result; the listing and both charts only the
/// top [`LISTING_LIMIT`].
pub fn present<T: Scored + Clone>(results: &[T]) -> MatchPresentation<T> {
    let listing = top_matches(results, LISTING_LIMIT);
    let charts = chart_series(&listing);

    MatchPresentation {
        summary: summary(results),
        listing,
        charts,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedPair<'a> {
    pub record: &'a SimilarityRecord,
    pub risk: RiskClass,
}

/// First `limit` corpus rows in corpus order, each with its risk badge.
pub fn similarity_listing(records: &[SimilarityRecord], limit: usize) -> Vec<ListedPair<'_>> {
    records
        .iter()
        .take(limit)
        .map(|record| ListedPair {
            record,
            risk: classify_fraction(record.composite_score),
        })
        .collect()
}
