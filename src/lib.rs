#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod analyzer;
pub mod diagnostics;
pub mod error;
pub mod params;
pub mod types;

// Stage modules – public for tools and experiments, considered internals.
pub mod curvature;
pub mod diameter;
pub mod fit;
pub mod merge;
pub mod profile;
pub mod refine;
pub mod stability;
pub mod stats;
pub mod transitions;

// Tool support.
pub mod config;
pub mod io;

// --- High-level re-exports -------------------------------------------------

// Main entry point and its configuration.
pub use crate::analyzer::ProfileAnalyzer;
pub use crate::params::{AdaptiveParams, AnalyzerConfig, ConfidenceLevel};

// Results and errors.
pub use crate::diagnostics::{AnalysisDiagnostics, AnalysisReport, VolumeCheck};
pub use crate::error::{FitError, ProfileError};
pub use crate::types::{Segment, ShapeKind, ShapeParams};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use profile_segmenter::prelude::*;
///
/// # fn main() -> Result<(), ProfileError> {
/// let heights: Vec<f64> = (1..=50).map(|i| i as f64).collect();
/// let volumes: Vec<f64> = heights.iter().map(|h| std::f64::consts::PI * 25.0 * h).collect();
///
/// let report = ProfileAnalyzer::new(AnalyzerConfig::default()).analyze(&heights, &volumes)?;
/// for seg in &report.segments {
///     println!("{} error={:.4}", seg.shape, seg.fit_error);
/// }
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::{
        AnalysisReport, AnalyzerConfig, ProfileAnalyzer, ProfileError, Segment, ShapeKind,
        ShapeParams,
    };
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    // Stage runners.
    pub use crate::curvature::{CurvatureProfile, ShapeSignature};
    pub use crate::diameter::estimate_diameter;
    pub use crate::fit::{partition, FitterOptions, SegmentFitter, ShapeModel};
    pub use crate::merge::SegmentMerger;
    pub use crate::profile::{AreaProfile, ProfileOptions};
    pub use crate::refine::{RefineOptions, SegmentRefiner};
    pub use crate::stability::{
        detect_stability_transitions, predict_segment_count, DetectionMethod, StabilityRouter,
    };
    pub use crate::transitions::{detect_transitions, estimate_snr, validate_all};

    // Structured intermediate types.
    pub use crate::diagnostics::{DetectionTrace, Stage, StageTiming, TimingBreakdown};
    pub use crate::fit::ScoredSegment;
    pub use crate::refine::RefinementTrace;
    pub use crate::params::{DensityCategory, SizeCategory, SnrBand};
    pub use crate::stability::SegmentCountPrediction;
    pub use crate::transitions::{CandidateCounts, DetectionOutcome, SnrEstimate, Transition};
}
