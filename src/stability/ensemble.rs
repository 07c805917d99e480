//! Segment-count predictors and their ensemble.
//!
//! Each predictor is a cheap heuristic returning `1..=3`. None of them is
//! reliable alone; the ensemble takes their median and reports how much they
//! agree.

use crate::curvature::CurvatureProfile;
use crate::params::ConfidenceLevel;
use crate::profile::smoothing::{gradient, savgol_smooth};
use crate::stats::{median, sign_changes, std_dev};
use serde::Serialize;

const MAX_PREDICTION: usize = 3;
/// Profiles shorter than this are predicted as a single segment.
const MIN_PREDICTOR_SAMPLES: usize = 10;
const MIN_VARIANCE_SAMPLES: usize = 15;
const VARIANCE_PEAK_FACTOR: f64 = 1.2;
/// Relative level below which derivative wiggles are rounding noise.
const NUMERICAL_FLOOR: f64 = 1e-9;

/// Ensemble output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SegmentCountPrediction {
    pub count: usize,
    pub confidence: ConfidenceLevel,
    /// Zero-crossing, curvature-regime and variance-peak votes.
    pub votes: [usize; 3],
}

/// Sign changes of `d²A/dh²`; two changes per boundary.
pub fn predict_by_zero_crossings(area: &[f64], heights: &[f64]) -> usize {
    if area.len() < MIN_PREDICTOR_SAMPLES {
        return 1;
    }
    let first = gradient(area, heights);
    let second = gradient(&first, heights);
    let step = heights.windows(2).map(|w| w[1] - w[0]).fold(f64::INFINITY, f64::min);
    let tol = NUMERICAL_FLOOR * area_scale(area) / (step * step).max(f64::MIN_POSITIVE);
    let second: Vec<f64> = second
        .into_iter()
        .map(|v| if v.abs() <= tol { 0.0 } else { v })
        .collect();
    (1 + sign_changes(&second) / 2).min(MAX_PREDICTION)
}

/// Large jumps of the smoothed curvature coefficient; three per boundary.
pub fn predict_by_curvature_regimes(area: &[f64], heights: &[f64]) -> usize {
    let n = area.len();
    if n < MIN_PREDICTOR_SAMPLES {
        return 1;
    }
    let curvature = CurvatureProfile::compute(area, heights).curvature;
    let smooth = savgol_smooth(&curvature, 7.min(n), 2);
    let steps = unit_gradient(&smooth);
    let threshold = std_dev(&steps);
    if threshold <= NUMERICAL_FLOOR {
        return 1;
    }
    let jumps = steps.iter().filter(|d| d.abs() > threshold).count();
    (1 + jumps / 3).min(MAX_PREDICTION)
}

/// Peaks of the sliding-window area variance; two per boundary.
pub fn predict_by_variance_peaks(area: &[f64]) -> usize {
    let n = area.len();
    if n < MIN_VARIANCE_SAMPLES {
        return 1;
    }
    let window = (n / 5).max(4);
    let step = (window / 2).max(1);
    let variances: Vec<f64> = (0..n - window)
        .step_by(step)
        .map(|i| {
            let s = std_dev(&area[i..i + window]);
            s * s
        })
        .collect();
    let scale = area_scale(area);
    let largest = variances.iter().fold(0.0f64, |m, &v| m.max(v));
    if variances.is_empty() || largest <= NUMERICAL_FLOOR * NUMERICAL_FLOOR * scale * scale {
        return 1;
    }
    let level = median(&variances) * VARIANCE_PEAK_FACTOR;
    let peaks = variances.iter().filter(|&&v| v > level).count();
    (1 + peaks / 2).min(MAX_PREDICTION)
}

/// Median of the three predictors with an agreement label.
pub fn predict_segment_count(area: &[f64], heights: &[f64]) -> SegmentCountPrediction {
    let votes = [
        predict_by_zero_crossings(area, heights),
        predict_by_curvature_regimes(area, heights),
        predict_by_variance_peaks(area),
    ];
    let mut sorted = votes;
    sorted.sort_unstable();
    let count = sorted[1];
    let agreeing = votes.iter().filter(|&&v| v == count).count();
    let confidence = match agreeing {
        3 => ConfidenceLevel::High,
        2 => ConfidenceLevel::Medium,
        _ => ConfidenceLevel::Low,
    };
    SegmentCountPrediction {
        count,
        confidence,
        votes,
    }
}

fn area_scale(area: &[f64]) -> f64 {
    area.iter().fold(1.0f64, |m, v| m.max(v.abs()))
}

/// Gradient over sample indices rather than heights.
pub(crate) fn unit_gradient(values: &[f64]) -> Vec<f64> {
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    gradient(values, &xs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_profile_predicts_one_segment() {
        let heights: Vec<f64> = (0..60).map(|i| i as f64 * 0.5).collect();
        let area = vec![78.5; 60];
        assert_eq!(predict_by_zero_crossings(&area, &heights), 1);
        assert_eq!(predict_by_curvature_regimes(&area, &heights), 1);
        assert_eq!(predict_by_variance_peaks(&area), 1);
        let p = predict_segment_count(&area, &heights);
        assert_eq!(p.count, 1);
        assert_eq!(p.confidence, ConfidenceLevel::High);
    }

    #[test]
    fn short_profiles_default_to_one() {
        let heights = [0.0, 1.0, 2.0, 3.0];
        let area = [1.0, 5.0, 2.0, 7.0];
        assert_eq!(predict_by_zero_crossings(&area, &heights), 1);
        assert_eq!(predict_by_curvature_regimes(&area, &heights), 1);
        assert_eq!(predict_by_variance_peaks(&area), 1);
    }

    #[test]
    fn oscillating_second_derivative_saturates() {
        let heights: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let area: Vec<f64> = heights.iter().map(|h| 50.0 + (h * 0.7).sin()).collect();
        assert_eq!(predict_by_zero_crossings(&area, &heights), 3);
    }
}
