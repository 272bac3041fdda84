//! Error types for the extraction engine.
//!
//! Fatal conditions abort the extraction of the whole document. Soft misses
//! (absent description, unparseable date, skipped table) never reach these
//! types; they are folded into the output as empty values.

use std::fmt;

use thiserror::Error;

use crate::chapter_number::ChapterNumber;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("url does not match the {pattern} pattern: {url}")]
    StructuralMismatch { pattern: &'static str, url: String },

    #[error("could not determine {field} for {subject}")]
    MissingRequiredField { field: &'static str, subject: String },

    #[error("chapter number inference failed for group {group:?}")]
    Inference {
        group: String,
        #[source]
        source: InferenceError,
    },

    #[error("document location is not a valid absolute url: {0:?}")]
    InvalidLocation(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ExtractError {
    pub(crate) fn mismatch(pattern: &'static str, url: impl fmt::Display) -> Self {
        Self::StructuralMismatch {
            pattern,
            url: url.to_string(),
        }
    }

    pub(crate) fn missing(field: &'static str, subject: impl fmt::Display) -> Self {
        Self::MissingRequiredField {
            field,
            subject: subject.to_string(),
        }
    }
}

/// Failure modes of [`crate::inference::infer_missing`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("no chapter numbers could be inferred: none of the {len} chapters has a known number")]
    NoAnchor { len: usize },

    #[error("chapter number inference failed ({case}) at index {index}")]
    Contradiction { case: ContradictionCase, index: usize },

    #[error("no chapter number precedes {number} (index {index})")]
    Underflow { number: ChapterNumber, index: usize },

    #[error("invalid switching point ({left}, {right})")]
    InvalidSwitchingPoint { left: usize, right: usize },
}

/// The five distinct ways neighbour evidence can contradict itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContradictionCase {
    /// Both neighbours carry the same number.
    EqualNeighbors,
    /// The more recent neighbour carries the smaller number.
    InvertedNeighbors,
    /// A prediction reaches past the neighbour on the other side.
    PredictionCrossesNeighbor,
    /// The predictions disagree and the policy does not allow picking one.
    IrreconcilablePredictions,
    /// An edge was queued with neither neighbour known.
    NoKnownNeighbor,
}

impl ContradictionCase {
    pub fn id(self) -> u8 {
        match self {
            Self::EqualNeighbors => 0,
            Self::InvertedNeighbors => 1,
            Self::PredictionCrossesNeighbor => 2,
            Self::IrreconcilablePredictions => 3,
            Self::NoKnownNeighbor => 4,
        }
    }
}

impl fmt::Display for ContradictionCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {}", self.id())
    }
}
