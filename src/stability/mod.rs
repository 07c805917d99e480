//! Experimental detector for containers with three or more segments.
//!
//! The router predicts the segment count with a small ensemble and, when the
//! prediction is at least three with enough agreement, replaces the
//! multi-derivative detector with the stability-metric one. Its output goes
//! through the same statistical validation and has the same shape, so the
//! fitting stages do not know which detector ran. Disabled by default: on
//! two-segment composites the stability path tends to misplace boundaries.

pub mod detector;
pub mod ensemble;

pub use detector::find_stability_transitions;
pub use ensemble::{
    predict_by_curvature_regimes, predict_by_variance_peaks, predict_by_zero_crossings,
    predict_segment_count, SegmentCountPrediction,
};

use crate::curvature::CurvatureProfile;
use crate::params::{AdaptiveParams, ConfidenceLevel};
use crate::profile::AreaProfile;
use crate::transitions::{self, boundaries, CandidateCounts, DetectionOutcome};
use log::{debug, warn};
use serde::Serialize;

/// Smallest predicted count that triggers the stability detector.
pub const ROUTE_MIN_SEGMENTS: usize = 3;

/// Which detector produced the transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    #[default]
    MultiDerivative,
    Stability,
}

/// Routing result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub method: DetectionMethod,
    pub prediction: SegmentCountPrediction,
}

/// Chooses the detector from the segment-count ensemble.
#[derive(Clone, Copy, Debug)]
pub struct StabilityRouter {
    gate: ConfidenceLevel,
}

impl StabilityRouter {
    pub fn new(gate: ConfidenceLevel) -> Self {
        Self { gate }
    }

    pub fn should_route(&self, prediction: &SegmentCountPrediction) -> bool {
        prediction.count >= ROUTE_MIN_SEGMENTS && prediction.confidence >= self.gate
    }

    /// Predicts on the measured areas and picks the detector.
    pub fn route(&self, profile: &AreaProfile) -> RouteDecision {
        let prediction = predict_segment_count(profile.areas(), profile.heights());
        let method = if self.should_route(&prediction) {
            DetectionMethod::Stability
        } else {
            DetectionMethod::MultiDerivative
        };
        debug!(
            "segment count votes {:?} -> {} ({:?}), using {:?}",
            prediction.votes, prediction.count, prediction.confidence, method
        );
        RouteDecision { method, prediction }
    }

    /// Runs the detector chosen by [`StabilityRouter::route`].
    pub fn detect(
        &self,
        profile: &AreaProfile,
        signals: &CurvatureProfile,
        params: &AdaptiveParams,
    ) -> (DetectionOutcome, RouteDecision) {
        let decision = self.route(profile);
        let outcome = match decision.method {
            DetectionMethod::Stability => detect_stability_transitions(profile, signals, params),
            DetectionMethod::MultiDerivative => {
                transitions::detect_transitions(profile, signals, params)
            }
        };
        (outcome, decision)
    }
}

/// Stability-metric detection followed by the shared validation.
pub fn detect_stability_transitions(
    profile: &AreaProfile,
    signals: &CurvatureProfile,
    params: &AdaptiveParams,
) -> DetectionOutcome {
    let n = profile.len();
    let too_short = n < 2 * params.min_points;
    if too_short {
        warn!(
            "profile has {} samples (< {}), treating it as one segment",
            n,
            2 * params.min_points
        );
    }
    let candidates = find_stability_transitions(signals, params.min_points);
    let (accepted, validations) = transitions::validate_all(profile, &candidates, params);
    let interior: Vec<usize> = accepted.iter().map(|t| t.index).collect();
    let counts = CandidateCounts {
        above_threshold: candidates.len(),
        peaks: candidates.len(),
        after_curve_filter: candidates.len(),
        after_spacing: candidates.len(),
        validated: accepted.len(),
    };
    debug!("stability detector counts={counts:?}");
    DetectionOutcome {
        transitions: boundaries(&interior, n),
        accepted,
        validations,
        percentile: params.percentile,
        threshold: f64::NAN,
        min_spacing: (2 * params.min_points).max((0.15 * n as f64) as usize),
        counts,
        too_short,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(count: usize, confidence: ConfidenceLevel) -> SegmentCountPrediction {
        SegmentCountPrediction {
            count,
            confidence,
            votes: [count; 3],
        }
    }

    #[test]
    fn router_gate_needs_count_and_confidence() {
        let router = StabilityRouter::new(ConfidenceLevel::Medium);
        assert!(router.should_route(&prediction(3, ConfidenceLevel::Medium)));
        assert!(router.should_route(&prediction(3, ConfidenceLevel::High)));
        assert!(!router.should_route(&prediction(3, ConfidenceLevel::Low)));
        assert!(!router.should_route(&prediction(2, ConfidenceLevel::High)));

        let strict = StabilityRouter::new(ConfidenceLevel::High);
        assert!(!strict.should_route(&prediction(3, ConfidenceLevel::Medium)));
    }

    #[test]
    fn straight_profile_stays_on_the_default_detector() {
        use crate::profile::ProfileOptions;
        let heights: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let volumes: Vec<f64> = heights.iter().map(|h| 50.0 * h).collect();
        let profile =
            AreaProfile::build(&heights, &volumes, &ProfileOptions::default()).expect("profile");
        let signals = CurvatureProfile::from_profile(&profile);
        let router = StabilityRouter::new(ConfidenceLevel::Low);
        let (outcome, decision) = router.detect(&profile, &signals, &AdaptiveParams::select(8.0));
        assert_eq!(decision.method, DetectionMethod::MultiDerivative);
        assert_eq!(outcome.transitions, vec![0, 59]);
    }
}
