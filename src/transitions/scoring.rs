//! Multi-derivative transition score and candidate extraction.

use crate::curvature::CurvatureProfile;
use crate::stats::normalize_min_max;
use serde::Serialize;

/// Weight of the slope-change term; the curvature term gets the rest.
pub const SLOPE_CHANGE_WEIGHT: f64 = 0.6;
/// Margin a score must clear above the percentile threshold.
pub const SCORE_MARGIN: f64 = 1e-6;
/// Minimum prominence of a secondary peak inside one above-threshold run.
pub const MIN_PEAK_PROMINENCE: f64 = 0.1;

/// Candidate boundary at `index` of the area sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Transition {
    pub index: usize,
    pub score: f64,
}

/// Score per step `j` of the profile; `score[j]` rates index `j + 1`.
///
/// `0.6 · norm(|Δ A'|) + 0.4 · norm(|A''|)` on the smoothed area.
pub fn transition_scores(signals: &CurvatureProfile) -> Vec<f64> {
    let n = signals.len();
    if n < 2 {
        return Vec::new();
    }
    let change: Vec<f64> = signals
        .first
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .collect();
    let bend: Vec<f64> = signals.second[..n - 1].iter().map(|v| v.abs()).collect();
    let change = normalize_min_max(&change);
    let bend = normalize_min_max(&bend);
    change
        .iter()
        .zip(&bend)
        .map(|(c, b)| SLOPE_CHANGE_WEIGHT * c + (1.0 - SLOPE_CHANGE_WEIGHT) * b)
        .collect()
}

/// Result of thresholding the score sequence.
#[derive(Clone, Debug, Default)]
pub struct PeakCandidates {
    /// Steps whose score clears the threshold.
    pub above_threshold: usize,
    /// One or more peaks per contiguous above-threshold run.
    pub peaks: Vec<Transition>,
}

/// Keeps the steps scoring above `threshold` and reduces each contiguous run
/// of them to its maximum plus any secondary peak with enough prominence.
pub fn peak_candidates(scores: &[f64], threshold: f64) -> PeakCandidates {
    let cut = threshold + SCORE_MARGIN;
    let mut out = PeakCandidates::default();
    let mut j = 0;
    while j < scores.len() {
        if scores[j] <= cut {
            j += 1;
            continue;
        }
        let start = j;
        while j < scores.len() && scores[j] > cut {
            j += 1;
        }
        let end = j - 1;
        out.above_threshold += end + 1 - start;
        for peak in run_peaks(scores, start, end, threshold) {
            out.peaks.push(Transition {
                index: peak + 1,
                score: scores[peak],
            });
        }
    }
    out
}

fn run_peaks(scores: &[f64], start: usize, end: usize, floor: f64) -> Vec<usize> {
    let run = &scores[start..=end];
    let best = run
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut peaks = Vec::new();
    let mut i = 0;
    while i < run.len() {
        let rises = i == 0 || run[i] > run[i - 1];
        // Walk across a plateau to the first differing value.
        let mut k = i;
        while k + 1 < run.len() && run[k + 1] == run[i] {
            k += 1;
        }
        let falls = k + 1 == run.len() || run[k + 1] < run[i];
        if rises && falls {
            let at = (i + k) / 2;
            if (i..=k).contains(&best) || prominence(run, at, floor) >= MIN_PEAK_PROMINENCE {
                peaks.push(start + at);
            }
        }
        i = k + 1;
    }
    if peaks.is_empty() {
        peaks.push(start + best);
    }
    peaks
}

/// Height of `run[at]` above the higher of its two bases inside the run;
/// the run edges are bounded below by `floor`.
fn prominence(run: &[f64], at: usize, floor: f64) -> f64 {
    let height = run[at];
    let mut left = height;
    let mut hit_left = false;
    for &v in run[..at].iter().rev() {
        if v > height {
            hit_left = true;
            break;
        }
        left = left.min(v);
    }
    if !hit_left {
        left = left.min(floor);
    }
    let mut right = height;
    let mut hit_right = false;
    for &v in &run[at + 1..] {
        if v > height {
            hit_right = true;
            break;
        }
        right = right.min(v);
    }
    if !hit_right {
        right = right.min(floor);
    }
    height - left.max(right)
}
