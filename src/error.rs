//! Error types returned by the review core.
//!
//! Neither type represents a fault: both describe input the caller can fix
//! and are meant to be shown to the user as-is.

use thiserror::Error;

/// A staged upload batch that cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select at least one file")]
    EmptyBatch,

    #[error("Please enter an assignment name")]
    MissingAssignment,

    /// Positions are 0-based; the message shows them 1-based.
    #[error("Please enter student ID for all files (blank rows: {})", display_rows(.positions))]
    BlankStudentIds { positions: Vec<usize> },

    #[error("No staged file at position {index} (batch has {len} files)")]
    UnknownItem { index: usize, len: usize },
}

/// An inbound row that cannot become a canonical record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("student {0} is compared against itself")]
    SelfComparison(String),

    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("row {index}: {source}")]
    Row {
        index: usize,
        source: Box<RecordError>,
    },
}

impl RecordError {
    pub(crate) fn at_row(self, index: usize) -> Self {
        RecordError::Row {
            index,
            source: Box::new(self),
        }
    }
}

fn display_rows(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|position| (position + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_rows_are_reported_one_based() {
        let err = ValidationError::BlankStudentIds {
            positions: vec![0, 2],
        };
        assert_eq!(
            err.to_string(),
            "Please enter student ID for all files (blank rows: 1, 3)"
        );
    }

    #[test]
    fn row_errors_name_the_offending_row() {
        let err = RecordError::NonFinite { field: "sim_ast" }.at_row(4);
        assert_eq!(err.to_string(), "row 4: sim_ast is not a finite number");
    }
}
