//! Stability-metric transition detector.
//!
//! `S(h) = mean|A''|_w / (1 + |A'|)` is roughly flat inside a primitive and
//! steps between levels at a boundary. Candidates are positions where the
//! mean of `S` over 7 samples on each side differs by a sustained jump, which
//! favours boundaries between long stretches over isolated peaks.

use super::ensemble::unit_gradient;
use crate::curvature::CurvatureProfile;
use crate::profile::smoothing::savgol_smooth;
use crate::stats::{mean, std_dev};
use crate::transitions::Transition;

/// Half width of the `|A''|` averaging window.
const METRIC_HALF_WINDOW: usize = 2;
/// Samples averaged on each side of a candidate.
const SIDE_SAMPLES: usize = 7;
/// Outer reach of the sustained-change check.
const SUSTAIN_REACH: usize = 12;
const SUSTAIN_FACTOR: f64 = 0.4;
const THRESHOLD_FACTOR: f64 = 1.5;
const JUMP_FACTOR: f64 = 0.6;
const SLOPE_FACTOR: f64 = 0.5;
/// Detector output is limited to three segments.
pub const MAX_INTERIOR: usize = 2;

/// Smoothed stability metric over the smoothed area.
pub fn stability_metric(signals: &CurvatureProfile) -> Vec<f64> {
    let n = signals.len();
    let raw: Vec<f64> = (0..n)
        .map(|i| {
            let lo = i.saturating_sub(METRIC_HALF_WINDOW);
            let hi = (i + METRIC_HALF_WINDOW + 1).min(n);
            let bend = signals.second[lo..hi].iter().map(|v| v.abs()).sum::<f64>()
                / (hi - lo) as f64;
            bend / (1.0 + signals.first[i].abs() + 1e-8)
        })
        .collect();
    savgol_smooth(&raw, 7.min(n), 2)
}

/// Scored interior candidates, spaced and strongest first, at most two.
///
/// The spacing is `max(2 · min_points, 0.15 · n)` between candidates and from
/// both ends. Returns nothing for profiles shorter than `2 · min_points`.
pub fn find_stability_transitions(signals: &CurvatureProfile, min_points: usize) -> Vec<Transition> {
    let n = signals.len();
    if n < 2 * min_points || n < 3 {
        return Vec::new();
    }
    let metric = stability_metric(signals);
    let slope = unit_gradient(&metric);

    let peak_slope = slope.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if peak_slope < 1e-12 {
        return Vec::new();
    }
    let mut threshold = std_dev(&slope) * THRESHOLD_FACTOR;
    if threshold < 1e-8 {
        threshold = peak_slope * 0.3;
    }

    let mut candidates = Vec::new();
    for i in min_points.max(1)..n - min_points {
        let left = mean(&metric[i.saturating_sub(SIDE_SAMPLES)..i]);
        let right = mean(&metric[i..(i + SIDE_SAMPLES).min(n)]);
        let jump = (right - left).abs();

        let sustained = if i > SUSTAIN_REACH && i + SUSTAIN_REACH < n {
            let before = mean(&metric[i - SUSTAIN_REACH..i - SIDE_SAMPLES]);
            let after = mean(&metric[i + SIDE_SAMPLES..i + SUSTAIN_REACH]);
            (before - left).abs() < jump * SUSTAIN_FACTOR
                && (right - after).abs() < jump * SUSTAIN_FACTOR
        } else {
            true
        };

        if jump > threshold * JUMP_FACTOR && slope[i].abs() > threshold * SLOPE_FACTOR && sustained
        {
            candidates.push(Transition {
                index: i,
                score: jump * slope[i].abs(),
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let spacing = (2 * min_points).max((0.15 * n as f64) as usize);
    let last = n - 1;
    let mut kept: Vec<Transition> = Vec::with_capacity(MAX_INTERIOR);
    for cand in candidates {
        if kept.len() == MAX_INTERIOR {
            break;
        }
        if cand.index < spacing || cand.index + spacing > last {
            continue;
        }
        if kept.iter().all(|k| k.index.abs_diff(cand.index) >= spacing) {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|t| t.index);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_profile_has_no_stability_jump() {
        let heights: Vec<f64> = (0..80).map(|i| i as f64 * 0.5).collect();
        let area: Vec<f64> = heights.iter().map(|h| 40.0 + 2.0 * h).collect();
        let signals = CurvatureProfile::compute(&area, &heights);
        assert!(find_stability_transitions(&signals, 12).is_empty());
    }

    #[test]
    fn candidates_are_spaced_and_bounded() {
        // Straight, curved, straight: S steps up and back down.
        let heights: Vec<f64> = (0..120).map(|i| i as f64 * 0.5).collect();
        let area: Vec<f64> = heights
            .iter()
            .map(|&h| {
                if h < 20.0 {
                    30.0
                } else if h < 40.0 {
                    30.0 + 0.2 * (h - 20.0) * (h - 20.0)
                } else {
                    110.0 + 8.0 * (h - 40.0)
                }
            })
            .collect();
        let signals = CurvatureProfile::compute(&area, &heights);
        let found = find_stability_transitions(&signals, 12);
        assert!(!found.is_empty());
        assert!(found.len() <= MAX_INTERIOR);
        let spacing = 24;
        for t in &found {
            assert!(t.index >= spacing && t.index + spacing <= 119, "{t:?}");
        }
        for w in found.windows(2) {
            assert!(w[1].index - w[0].index >= spacing);
        }
    }
}
