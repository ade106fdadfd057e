//! Risk classification, aggregation and ranking over pairwise code-similarity
//! results.
//!
//! The core modules (`risk`, `aggregate`, `batch`, `present`) are pure and
//! synchronous; `db` and the binary are the only places that perform I/O.

pub mod aggregate;
pub mod batch;
pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod present;
pub mod report;
pub mod risk;

pub use aggregate::{aggregate, AggregateView, AssignmentRollup, GlobalTotals, StudentSuspect};
pub use batch::{SubmissionBatch, UploadRequest};
pub use error::{RecordError, ValidationError};
pub use models::{ComponentMetrics, Corpus, MatchResult, MetricScale, SimilarityRecord, UploadItem};
pub use risk::{classify, RiskClass, RiskTier};
