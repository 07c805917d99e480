//! Transition detection on the area profile.
//!
//! Boundaries between primitives show up as abrupt changes of the area slope
//! (a kink between a cone and a cylinder) or as bursts of curvature. The
//! detector works on the Savitzky–Golay smoothed area and proceeds as:
//!
//! 1. Profiles shorter than `2 · min_points` are a single segment.
//! 2. Score every step with `0.6 · norm(|ΔA'|) + 0.4 · norm(|A''|)`.
//! 3. Threshold at the configured percentile of the scores and reduce each
//!    above-threshold run to its peaks ([`scoring::peak_candidates`]).
//! 4. Drop peaks buried inside a curved region ([`filter`]).
//! 5. Enforce spacing from the ends and between candidates, strongest first.
//! 6. Keep the candidates that pass the statistical checks ([`validation`]).
//!
//! The output always starts at `0`, ends at `n − 1` and is strictly
//! increasing. When nothing survives, the whole profile is one segment; this
//! also happens for smooth curved-to-straight junctions whose slope is
//! continuous, which the score cannot separate from a gentle bend.

pub mod filter;
pub mod scoring;
pub mod snr;
pub mod validation;

#[cfg(test)]
mod tests;

pub use scoring::Transition;
pub use snr::{estimate_snr, SnrEstimate};

use crate::curvature::CurvatureProfile;
use crate::params::AdaptiveParams;
use crate::profile::AreaProfile;
use crate::stats::percentile;
use log::{debug, warn};
use serde::Serialize;
use validation::{validate_candidate, ValidationReport};

/// Candidate counts after each detection step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CandidateCounts {
    pub above_threshold: usize,
    pub peaks: usize,
    pub after_curve_filter: usize,
    pub after_spacing: usize,
    pub validated: usize,
}

/// Detected boundaries plus the intermediate evidence.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionOutcome {
    /// `[0, t_1, …, n − 1]`.
    pub transitions: Vec<usize>,
    /// Interior boundaries with their scores.
    pub accepted: Vec<Transition>,
    /// Checks of every spaced candidate, accepted or not.
    pub validations: Vec<ValidationReport>,
    pub percentile: f64,
    pub threshold: f64,
    pub min_spacing: usize,
    pub counts: CandidateCounts,
    /// True when the profile was too short to search.
    pub too_short: bool,
}

impl DetectionOutcome {
    fn single_segment(n: usize, params: &AdaptiveParams, min_spacing: usize) -> Self {
        Self {
            transitions: boundaries(&[], n),
            accepted: Vec::new(),
            validations: Vec::new(),
            percentile: params.percentile,
            threshold: f64::NAN,
            min_spacing,
            counts: CandidateCounts::default(),
            too_short: true,
        }
    }
}

/// Runs the multi-derivative detector with the given working parameters.
pub fn detect_transitions(
    profile: &AreaProfile,
    signals: &CurvatureProfile,
    params: &AdaptiveParams,
) -> DetectionOutcome {
    let n = profile.len();
    let min_spacing = params.min_spacing(profile.median_step());
    if n < 2 * params.min_points {
        warn!(
            "profile has {} samples (< {}), treating it as one segment",
            n,
            2 * params.min_points
        );
        return DetectionOutcome::single_segment(n, params, min_spacing);
    }

    let scores = scoring::transition_scores(signals);
    let threshold = percentile(&scores, params.percentile);
    let found = scoring::peak_candidates(&scores, threshold);
    if found.peaks.is_empty() {
        // Smooth curved/straight junctions have no score peak and end up here.
        warn!("no transition candidates above {threshold:.4}, keeping one segment");
    }
    let curved_free = filter::filter_transitions_in_curves(
        &found.peaks,
        signals,
        params.curvature_threshold,
        params.min_points / 2,
    );
    let spaced = filter::enforce_spacing(&curved_free, n, min_spacing);
    let (accepted, validations) = validate_all(profile, &spaced, params);

    let counts = CandidateCounts {
        above_threshold: found.above_threshold,
        peaks: found.peaks.len(),
        after_curve_filter: curved_free.len(),
        after_spacing: spaced.len(),
        validated: accepted.len(),
    };
    debug!(
        "detect_transitions n={} percentile={:.1} threshold={:.4} spacing={} counts={:?}",
        n, params.percentile, threshold, min_spacing, counts
    );

    let interior: Vec<usize> = accepted.iter().map(|t| t.index).collect();
    DetectionOutcome {
        transitions: boundaries(&interior, n),
        accepted,
        validations,
        percentile: params.percentile,
        threshold,
        min_spacing,
        counts,
        too_short: false,
    }
}

/// Applies the two-of-three statistical checks to each candidate.
pub fn validate_all(
    profile: &AreaProfile,
    candidates: &[Transition],
    params: &AdaptiveParams,
) -> (Vec<Transition>, Vec<ValidationReport>) {
    let mut accepted = Vec::with_capacity(candidates.len());
    let mut reports = Vec::with_capacity(candidates.len());
    for cand in candidates {
        let report = validate_candidate(
            profile.areas(),
            profile.heights(),
            cand.index,
            params.min_points,
            params.variance_threshold,
        );
        if report.accepted() {
            accepted.push(*cand);
        } else {
            debug!(
                "candidate {} rejected ({} of 3 criteria)",
                cand.index,
                report.criteria_met()
            );
        }
        reports.push(report);
    }
    (accepted, reports)
}

/// `[0, interior…, n − 1]` with duplicates and out-of-range entries removed.
pub fn boundaries(interior: &[usize], n: usize) -> Vec<usize> {
    let last = n.saturating_sub(1);
    let mut out = Vec::with_capacity(interior.len() + 2);
    out.push(0);
    let mut sorted: Vec<usize> = interior
        .iter()
        .copied()
        .filter(|&i| i > 0 && i < last)
        .collect();
    sorted.sort_unstable();
    sorted.dedup();
    out.extend(sorted);
    if last > 0 {
        out.push(last);
    }
    out
}
