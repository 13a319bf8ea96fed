use thiserror::Error;

use crate::data::model::Polarity;

// ---------------------------------------------------------------------------
// Library error taxonomy
// ---------------------------------------------------------------------------

/// Everything the analysis core can reject.
///
/// Per-segment errors (`NoEligibleSamples`, `DegenerateResistance`) are
/// recoverable at the dataset level: the offending cycle is skipped.
/// `InsufficientCycleMarkers` and `EmptyDataset` are fatal for a dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("no {polarity} branch beyond the activation threshold")]
    NoEligibleSamples { polarity: Polarity },

    #[error("every eligible {polarity} sample has zero or undefined current")]
    DegenerateResistance { polarity: Polarity },

    #[error("expected at least 2 zero-voltage cycle markers, found {found}")]
    InsufficientCycleMarkers { found: usize },

    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("the uploaded sheets contain no voltage data")]
    EmptyDataset,

    #[error("no pulse found: {reason}")]
    NoPulse { reason: String },
}

/// A per-cycle detection failure, tagged with where it happened so the
/// message can point at the cycle.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no {polarity} transition found in cycle {}", .cycle + 1)]
pub struct CycleFailure {
    pub polarity: Polarity,
    /// Zero-based position within the polarity group.
    pub cycle: usize,
    #[source]
    pub source: AnalysisError,
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
