use super::timing::TimingBreakdown;
use crate::params::{AdaptiveParams, DensityCategory, SizeCategory};
use crate::refine::RefinementTrace;
use crate::stability::{DetectionMethod, SegmentCountPrediction};
use crate::transitions::validation::ValidationReport;
use crate::transitions::{CandidateCounts, SnrEstimate, Transition};
use crate::types::{AreaPoint, Segment, ShapeKind};
use serde::Serialize;

/// Relative volume discrepancy accepted by [`VolumeCheck::within_tolerance`].
pub const VOLUME_TOLERANCE: f64 = 0.01;

/// Result of [`ProfileAnalyzer::analyze`](crate::ProfileAnalyzer::analyze).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub segments: Vec<Segment>,
    pub diagnostics: AnalysisDiagnostics,
}

impl AnalysisReport {
    /// Summed model volume against the measured one, over fitted segments.
    pub fn volume_check(&self) -> Option<&VolumeCheck> {
        self.diagnostics.volume_check.as_ref()
    }

    /// Number of segments that no model could describe.
    pub fn unfit_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.shape == ShapeKind::Unfit)
            .count()
    }

    /// One line per segment, for logs and demos.
    pub fn summary(&self) -> String {
        self.segments
            .iter()
            .map(|s| {
                format!(
                    "[{:>4}, {:>4}] {:<10} error={:.4}{}",
                    s.start_idx,
                    s.end_idx,
                    s.shape.as_str(),
                    s.fit_error,
                    if s.low_confidence { " (low confidence)" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything the analyzer decided on the way to the segments.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDiagnostics {
    pub sample_count: usize,
    pub regression_window: usize,
    pub smoothing_window: usize,
    pub diameter_mm: f64,
    pub size_category: SizeCategory,
    pub density_category: DensityCategory,
    pub snr: SnrEstimate,
    /// Parameters after SNR refinement.
    pub params: AdaptiveParams,
    pub detection: DetectionTrace,
    pub segments_before_merge: usize,
    pub segments_after_merge: usize,
    /// Boundary changes after merging.
    pub refinement: RefinementTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_check: Option<VolumeCheck>,
    /// Derived cross-sectional areas, for plotting against the segments.
    pub area_profile: Vec<AreaPoint>,
    pub timings: TimingBreakdown,
}

/// Detector choice and its intermediate results.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionTrace {
    pub method: DetectionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<SegmentCountPrediction>,
    pub transitions: Vec<usize>,
    pub accepted: Vec<Transition>,
    pub validations: Vec<ValidationReport>,
    pub counts: CandidateCounts,
    pub percentile: f64,
    pub threshold: f64,
    pub min_spacing: usize,
    pub too_short: bool,
}

/// Measured against modelled volume over the fitted segments.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeCheck {
    pub measured: f64,
    pub modelled: f64,
    pub relative_error: f64,
    pub within_tolerance: bool,
    /// Segments left out because they are unfit.
    pub skipped_segments: usize,
}

/// Compares each segment's model volume over its height span with the
/// measured volume gained over the same span.
///
/// Returns `None` when no segment has a model or nothing was measured.
pub fn volume_check(segments: &[Segment], heights: &[f64], volumes: &[f64]) -> Option<VolumeCheck> {
    let mut measured = 0.0;
    let mut modelled = 0.0;
    let mut skipped = 0;
    let mut used = 0;
    for seg in segments {
        let (Some(h0), Some(h1), Some(v0), Some(v1)) = (
            heights.get(seg.start_idx),
            heights.get(seg.end_idx),
            volumes.get(seg.start_idx),
            volumes.get(seg.end_idx),
        ) else {
            skipped += 1;
            continue;
        };
        match seg.params.volume_at(h1 - h0) {
            Some(v) if v.is_finite() => {
                measured += v1 - v0;
                modelled += v;
                used += 1;
            }
            _ => skipped += 1,
        }
    }
    if used == 0 || measured <= 0.0 {
        return None;
    }
    let relative_error = (modelled - measured).abs() / measured;
    Some(VolumeCheck {
        measured,
        modelled,
        relative_error,
        within_tolerance: relative_error <= VOLUME_TOLERANCE,
        skipped_segments: skipped,
    })
}
