//! Error types for profile validation and per-model fitting.

use crate::types::ShapeKind;
use thiserror::Error;

/// Fatal input problems. Nothing downstream of profile construction fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    #[error("height and volume sequences differ in length ({heights} vs {volumes})")]
    LengthMismatch { heights: usize, volumes: usize },
    #[error("need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("non-finite {field} at sample {index}")]
    NonFinite { field: &'static str, index: usize },
    #[error("heights must be strictly increasing (sample {index})")]
    NonMonotonicHeight { index: usize },
    #[error("volume decreases at sample {index}")]
    DecreasingVolume { index: usize },
    #[error("volume range is zero")]
    DegenerateVolume,
}

/// Reasons a single shape model could not describe a segment.
///
/// These are recovered per model and never escape the analyzer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("{model}: segment has {actual} samples, need {required}")]
    TooFewSamples {
        model: ShapeKind,
        required: usize,
        actual: usize,
    },
    #[error("{model}: optimizer did not converge within {iterations} iterations")]
    NoConvergence { model: ShapeKind, iterations: usize },
    #[error("{model}: residuals became non-finite")]
    NonFinite { model: ShapeKind },
    #[error("{model}: {reason}")]
    Invalid {
        model: ShapeKind,
        reason: &'static str,
    },
}
