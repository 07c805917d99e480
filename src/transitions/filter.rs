//! Candidate pruning: curved-region suppression and minimum spacing.

use super::scoring::Transition;
use crate::curvature::CurvatureProfile;

/// The curved-region test uses a looser curvature level than the signature.
pub const CURVE_FILTER_FACTOR: f64 = 0.6;
/// Share of curved samples that marks a side window as curved.
pub const CURVED_SIDE_FRACTION: f64 = 0.75;

/// Drops candidates lying inside a continuously curved region.
///
/// The two side windows of `side` samples start beyond the smoothing guard
/// band around the candidate, so the bend produced by the transition itself
/// is not counted. A candidate is dropped only when both windows are curved;
/// windows that do not fit inside the profile count as straight.
pub fn filter_transitions_in_curves(
    candidates: &[Transition],
    signals: &CurvatureProfile,
    curvature_threshold: f64,
    side: usize,
) -> Vec<Transition> {
    let n = signals.len();
    let guard = signals.window();
    let side = side.max(3);
    let level = CURVE_FILTER_FACTOR * curvature_threshold;
    candidates
        .iter()
        .copied()
        .filter(|c| {
            let left_curved = c
                .index
                .checked_sub(guard + side)
                .map(|lo| signals.curved_fraction(lo, lo + side, level) >= CURVED_SIDE_FRACTION)
                .unwrap_or(false);
            let right_lo = c.index + guard + 1;
            let right_curved = right_lo + side <= n
                && signals.curved_fraction(right_lo, right_lo + side, level)
                    >= CURVED_SIDE_FRACTION;
            !(left_curved && right_curved)
        })
        .collect()
}

/// Greedy spacing: higher scores claim their neighbourhood first.
///
/// A candidate survives when it is at least `min_spacing` samples away from
/// both profile ends and from every candidate already kept. The result is
/// sorted by index.
pub fn enforce_spacing(candidates: &[Transition], n: usize, min_spacing: usize) -> Vec<Transition> {
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    let last = n.saturating_sub(1);
    let mut kept: Vec<Transition> = Vec::new();
    for cand in ranked {
        if cand.index < min_spacing || cand.index + min_spacing > last {
            continue;
        }
        if kept.iter().all(|k| k.index.abs_diff(cand.index) >= min_spacing) {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|t| t.index);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(index: usize, score: f64) -> Transition {
        Transition { index, score }
    }

    #[test]
    fn spacing_prefers_stronger_candidates() {
        let cands = [t(20, 0.5), t(25, 0.9), t(60, 0.4), t(95, 1.0)];
        let kept = enforce_spacing(&cands, 100, 12);
        let idx: Vec<usize> = kept.iter().map(|c| c.index).collect();
        assert_eq!(idx, vec![25, 60]);
    }

    #[test]
    fn candidates_inside_a_dome_are_dropped() {
        let r = 5.0;
        let heights: Vec<f64> = (0..80).map(|i| i as f64 * 0.06).collect();
        let area: Vec<f64> = heights
            .iter()
            .map(|x| std::f64::consts::PI * (r * r - x * x))
            .collect();
        let signals = CurvatureProfile::compute(&area, &heights);
        let kept = filter_transitions_in_curves(&[t(40, 1.0)], &signals, 0.05, 6);
        assert!(kept.is_empty());
    }

    #[test]
    fn kink_between_straight_sections_survives() {
        let heights: Vec<f64> = (0..80).map(|i| i as f64).collect();
        let area: Vec<f64> = heights
            .iter()
            .map(|&h| if h < 40.0 { 30.0 } else { 30.0 + 2.0 * (h - 40.0) })
            .collect();
        let signals = CurvatureProfile::compute(&area, &heights);
        let kept = filter_transitions_in_curves(&[t(40, 1.0)], &signals, 0.05, 6);
        assert_eq!(kept.len(), 1);
    }
}
