//! Curvature of the area profile and curved-shape signatures.
//!
//! The curvature coefficient `κ = |A''| / (1 + |A'|)^1.5` is large where the
//! area bends and small on straight stretches, independent of the slope
//! direction. It drives two decisions:
//!
//! - suppressing transition candidates that sit inside a continuously curved
//!   region (a sphere cap or dome has no internal boundary);
//! - flagging segments whose area trend matches a dome (hemisphere) or a
//!   rounded bottom (sphere cap) so the fitter tries those models first.

use crate::profile::smoothing::{gradient, savgol_smooth};
use crate::profile::AreaProfile;
use crate::stats::{make_odd, median};
use serde::Serialize;
use std::f64::consts::PI;

/// Fraction of steps that must follow the expected trend.
const MONOTONIC_FRACTION: f64 = 0.8;
/// Dome: start area relative to the segment maximum.
const DOME_START_FRACTION: f64 = 0.8;
/// Dome: required drop relative to the start area.
const DOME_DROP_FRACTION: f64 = 0.5;
/// Cap: start area relative to the segment maximum.
const CAP_START_FRACTION: f64 = 0.25;
/// Cap: tolerance of the mid-height area against the cap law.
const CAP_LAW_TOLERANCE: f64 = 0.2;
/// Shortest segment on which signatures are evaluated.
const MIN_SIGNATURE_SAMPLES: usize = 5;

/// Polynomial order of the smoothing applied before differentiation.
pub const SMOOTHING_ORDER: usize = 2;

/// Savitzky–Golay window used before differentiating an area sequence of
/// `n` samples: `clamp(n / 10, 5, 15)`, forced odd.
pub fn smoothing_window(n: usize) -> usize {
    make_odd((n / 10).clamp(5, 15))
}

/// Derivatives and curvature coefficient along a (smoothed) area sequence.
#[derive(Clone, Debug)]
pub struct CurvatureProfile {
    heights: Vec<f64>,
    area: Vec<f64>,
    window: usize,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
    pub curvature: Vec<f64>,
}

/// Individual checks behind a shape signature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SignatureChecks {
    pub monotonic: bool,
    pub start_level: bool,
    pub curved: bool,
    pub consistent: bool,
}

impl SignatureChecks {
    pub fn passed(&self) -> bool {
        self.monotonic && self.start_level && self.curved && self.consistent
    }
}

/// Curved model suggested by the area trend of a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeSignature {
    None,
    Hemisphere,
    SphereCap,
}

impl CurvatureProfile {
    /// Smooths the profile's areas and differentiates the result.
    pub fn from_profile(profile: &AreaProfile) -> Self {
        let window = smoothing_window(profile.len());
        let smooth = savgol_smooth(profile.areas(), window, SMOOTHING_ORDER);
        Self {
            window,
            ..Self::compute(&smooth, profile.heights())
        }
    }

    /// Differentiates `area` as given.
    pub fn compute(area: &[f64], heights: &[f64]) -> Self {
        let first = gradient(area, heights);
        let second = gradient(&first, heights);
        let curvature = first
            .iter()
            .zip(&second)
            .map(|(d1, d2)| d2.abs() / (1.0 + d1.abs()).powf(1.5))
            .collect();
        Self {
            heights: heights.to_vec(),
            area: area.to_vec(),
            window: 1,
            first,
            second,
            curvature,
        }
    }

    pub fn len(&self) -> usize {
        self.curvature.len()
    }

    /// Smoothing window applied to the area (1 when unsmoothed).
    pub fn window(&self) -> usize {
        self.window
    }

    /// Area sequence the derivatives were taken from.
    pub fn area(&self) -> &[f64] {
        &self.area
    }

    pub fn is_empty(&self) -> bool {
        self.curvature.is_empty()
    }

    pub fn curved_mask(&self, threshold: f64) -> Vec<bool> {
        self.curvature.iter().map(|&k| k > threshold).collect()
    }

    /// Share of samples in `[start, end)` whose curvature exceeds `threshold`.
    pub fn curved_fraction(&self, start: usize, end: usize, threshold: f64) -> f64 {
        let end = end.min(self.len());
        if start >= end {
            return 0.0;
        }
        let curved = self.curvature[start..end]
            .iter()
            .filter(|&&k| k > threshold)
            .count();
        curved as f64 / (end - start) as f64
    }

    /// Dome signature on the inclusive range `[start, end]`: area falls
    /// steadily from near its maximum with concave curvature.
    pub fn hemisphere_signature(&self, start: usize, end: usize, threshold: f64) -> SignatureChecks {
        let Some(area) = self.slice(start, end) else {
            return SignatureChecks::default();
        };
        let peak = area.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let first = area[0];
        let last = area[area.len() - 1];
        SignatureChecks {
            monotonic: step_fraction(area, |d| d < 0.0) >= MONOTONIC_FRACTION,
            start_level: first >= DOME_START_FRACTION * peak,
            curved: self.is_concave(start, end, threshold),
            consistent: first - last >= DOME_DROP_FRACTION * first,
        }
    }

    /// Rounded-bottom signature on `[start, end]`: area grows from near zero
    /// with concave curvature and follows the cap law `A = π(2Rx − x²)`.
    pub fn sphere_cap_signature(&self, start: usize, end: usize, threshold: f64) -> SignatureChecks {
        let Some(area) = self.slice(start, end) else {
            return SignatureChecks::default();
        };
        let peak = area.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        SignatureChecks {
            monotonic: step_fraction(area, |d| d > 0.0) >= MONOTONIC_FRACTION,
            start_level: area[0] <= CAP_START_FRACTION * peak,
            curved: self.is_concave(start, end, threshold),
            consistent: self.follows_cap_law(start, end),
        }
    }

    /// Signature of `[start, end]`, dome checked first.
    pub fn signature(&self, start: usize, end: usize, threshold: f64) -> ShapeSignature {
        if self.hemisphere_signature(start, end, threshold).passed() {
            ShapeSignature::Hemisphere
        } else if self.sphere_cap_signature(start, end, threshold).passed() {
            ShapeSignature::SphereCap
        } else {
            ShapeSignature::None
        }
    }

    fn slice(&self, start: usize, end: usize) -> Option<&[f64]> {
        if end >= self.area.len() || end < start || end + 1 - start < MIN_SIGNATURE_SAMPLES {
            return None;
        }
        Some(&self.area[start..=end])
    }

    fn is_concave(&self, start: usize, end: usize, threshold: f64) -> bool {
        let bending = median(&self.second[start..=end]);
        let peak = self.curvature[start..=end]
            .iter()
            .cloned()
            .fold(0.0, f64::max);
        bending < 0.0 && peak >= threshold
    }

    fn follows_cap_law(&self, start: usize, end: usize) -> bool {
        let base = self.heights[start];
        let span = self.heights[end] - base;
        if span <= 0.0 {
            return false;
        }
        let radius = (self.area[end] / PI + span * span) / (2.0 * span);
        let mid_target = base + 0.5 * span;
        let mid = (start..=end)
            .min_by(|&a, &b| {
                let da = (self.heights[a] - mid_target).abs();
                let db = (self.heights[b] - mid_target).abs();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(start);
        let x = self.heights[mid] - base;
        let predicted = PI * (2.0 * radius * x - x * x);
        let actual = self.area[mid];
        (predicted - actual).abs() <= CAP_LAW_TOLERANCE * actual.abs().max(f64::EPSILON)
    }
}

fn step_fraction(area: &[f64], accept: impl Fn(f64) -> bool) -> f64 {
    let steps = area.len().saturating_sub(1);
    if steps == 0 {
        return 0.0;
    }
    let hits = area.windows(2).filter(|w| accept(w[1] - w[0])).count();
    hits as f64 / steps as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(n: usize, top: f64) -> Vec<f64> {
        (0..n).map(|i| top * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn straight_profile_has_no_curvature() {
        let h = heights(30, 29.0);
        let area: Vec<f64> = h.iter().map(|x| 10.0 + 2.0 * x).collect();
        let profile = CurvatureProfile::compute(&area, &h);
        assert!(profile.curvature.iter().all(|&k| k < 1e-9));
        assert_eq!(profile.curved_fraction(0, 30, 0.01), 0.0);
        assert_eq!(profile.signature(0, 29, 0.05), ShapeSignature::None);
    }

    #[test]
    fn dome_area_matches_hemisphere_signature() {
        let r = 10.0;
        let h = heights(40, r);
        let area: Vec<f64> = h.iter().map(|x| PI * (r * r - x * x)).collect();
        let profile = CurvatureProfile::compute(&area, &h);
        let checks = profile.hemisphere_signature(0, 39, 0.05);
        assert!(checks.passed(), "dome checks failed: {checks:?}");
        assert_eq!(profile.signature(0, 39, 0.05), ShapeSignature::Hemisphere);
    }

    #[test]
    fn rounded_bottom_matches_sphere_cap_signature() {
        let r = 10.0;
        let h = heights(40, r);
        let area: Vec<f64> = h.iter().map(|x| PI * (2.0 * r * x - x * x)).collect();
        let profile = CurvatureProfile::compute(&area, &h);
        let checks = profile.sphere_cap_signature(0, 39, 0.05);
        assert!(checks.passed(), "cap checks failed: {checks:?}");
        assert_eq!(profile.signature(0, 39, 0.05), ShapeSignature::SphereCap);
    }

    #[test]
    fn cone_area_is_not_a_cap() {
        let h = heights(40, 20.0);
        let area: Vec<f64> = h.iter().map(|x| 0.2 * x * x).collect();
        let profile = CurvatureProfile::compute(&area, &h);
        assert_eq!(profile.signature(0, 39, 0.05), ShapeSignature::None);
    }
}
