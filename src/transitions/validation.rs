//! Statistical plausibility checks for transition candidates.
//!
//! A candidate is kept when at least two of three criteria hold on the
//! `min_points` samples either side of it:
//!
//! - variation: the coefficient of variation exceeds `variance_threshold`;
//! - structure: the lag-1 autocorrelation magnitude exceeds 0.4;
//! - model consistency: the left side is well described by a line
//!   (R² > 0.65), or both sides are consistently poorly described.

use crate::stats::{coefficient_of_variation, lag1_autocorrelation, linear_r_squared};
use serde::Serialize;

pub const AUTOCORRELATION_FLOOR: f64 = 0.4;
pub const R_SQUARED_FLOOR: f64 = 0.65;
pub const REQUIRED_CRITERIA: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ValidationReport {
    pub index: usize,
    pub cv: f64,
    pub autocorrelation: f64,
    pub r_squared_left: f64,
    pub r_squared_right: f64,
    pub has_variation: bool,
    pub has_structure: bool,
    pub fits_model: bool,
}

impl ValidationReport {
    pub fn criteria_met(&self) -> usize {
        [self.has_variation, self.has_structure, self.fits_model]
            .iter()
            .filter(|&&c| c)
            .count()
    }

    pub fn accepted(&self) -> bool {
        self.criteria_met() >= REQUIRED_CRITERIA
    }
}

/// Evaluates the window `[index − half_width, index + half_width]`.
pub fn validate_candidate(
    area: &[f64],
    heights: &[f64],
    index: usize,
    half_width: usize,
    variance_threshold: f64,
) -> ValidationReport {
    let n = area.len().min(heights.len());
    let lo = index.saturating_sub(half_width);
    let hi = (index + half_width).min(n.saturating_sub(1));
    let window = &area[lo..=hi];

    let cv = coefficient_of_variation(window);
    let autocorrelation = lag1_autocorrelation(window);
    let r_squared_left = linear_r_squared(&heights[lo..=index], &area[lo..=index]);
    let r_squared_right = linear_r_squared(&heights[index..=hi], &area[index..=hi]);
    let left_good = r_squared_left > R_SQUARED_FLOOR;
    let right_good = r_squared_right > R_SQUARED_FLOOR;

    ValidationReport {
        index,
        cv,
        autocorrelation,
        r_squared_left,
        r_squared_right,
        has_variation: cv > variance_threshold,
        has_structure: autocorrelation.abs() > AUTOCORRELATION_FLOOR,
        fits_model: left_good || !right_good,
    }
}
