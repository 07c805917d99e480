//! Cross-sectional area profile derived from volume-vs-height samples.
//!
//! For an axisymmetric container the horizontal section at height `h` has
//! area `A(h) = dV/dh`. The builder validates the raw samples and estimates
//! that derivative:
//!
//! - Local regression (default): a least-squares line `V = a h + b` is fitted
//!   over a sliding window of `clamp(n / 10, 5, 9)` samples (forced odd,
//!   truncated at the ends) and its slope taken as the area. The result is
//!   floored at [`MIN_AREA`] and passed through a size-3 median filter to
//!   suppress isolated spikes from measurement noise.
//! - Legacy differencing: point-to-point `ΔV / Δh` with the same floor and a
//!   minimum height step; the first point is back-filled from the second.
//!
//! The profile keeps one area per input sample, so indices into the area
//! sequence and into the sample arrays coincide.

pub mod smoothing;

#[cfg(test)]
mod tests;

use crate::error::ProfileError;
use crate::stats::{make_odd, median};
use crate::types::AreaPoint;
use log::debug;
use serde::{Deserialize, Serialize};

/// Fewer samples than this cannot support any derivative estimate.
pub const MIN_SAMPLES: usize = 5;
/// Lower bound on a derived area (mm²).
pub const MIN_AREA: f64 = 0.01;
/// Lower bound on a height step in legacy differencing (mm).
pub const MIN_HEIGHT_STEP: f64 = 0.01;

/// How the area derivative is estimated.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOptions {
    /// Sliding-window regression when true, point-to-point differences otherwise.
    pub use_local_regression: bool,
    /// Floor applied to every derived area.
    pub min_area: f64,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            use_local_regression: true,
            min_area: MIN_AREA,
        }
    }
}

/// Validated samples together with their area sequence.
#[derive(Clone, Debug)]
pub struct AreaProfile {
    heights: Vec<f64>,
    volumes: Vec<f64>,
    areas: Vec<f64>,
    regression_window: usize,
}

impl AreaProfile {
    /// Validates the samples and derives the area sequence.
    pub fn build(
        heights: &[f64],
        volumes: &[f64],
        options: &ProfileOptions,
    ) -> Result<Self, ProfileError> {
        validate_samples(heights, volumes)?;
        let n = heights.len();
        let floor = options.min_area.max(0.0);

        let (areas, regression_window) = if options.use_local_regression {
            let window = make_odd((n / 10).clamp(5, 9));
            let slopes = smoothing::local_slopes(heights, volumes, window);
            let floored: Vec<f64> = slopes.into_iter().map(|a| a.max(floor)).collect();
            (smoothing::median_filter3(&floored), window)
        } else {
            (point_differences(heights, volumes, floor), 2)
        };

        debug!(
            "AreaProfile::build n={} window={} mode={} area_range=[{:.3}, {:.3}]",
            n,
            regression_window,
            if options.use_local_regression {
                "regression"
            } else {
                "differences"
            },
            areas.iter().cloned().fold(f64::INFINITY, f64::min),
            areas.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        );

        Ok(Self {
            heights: heights.to_vec(),
            volumes: volumes.to_vec(),
            areas,
            regression_window,
        })
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    /// Number of samples used by each local regression (2 for differencing).
    pub fn regression_window(&self) -> usize {
        self.regression_window
    }

    pub fn points(&self) -> impl Iterator<Item = AreaPoint> + '_ {
        self.heights
            .iter()
            .zip(&self.areas)
            .map(|(&height, &area)| AreaPoint { height, area })
    }

    /// Median spacing between consecutive heights.
    pub fn median_step(&self) -> f64 {
        let steps: Vec<f64> = self.heights.windows(2).map(|w| w[1] - w[0]).collect();
        median(&steps)
    }
}

fn validate_samples(heights: &[f64], volumes: &[f64]) -> Result<(), ProfileError> {
    if heights.len() != volumes.len() {
        return Err(ProfileError::LengthMismatch {
            heights: heights.len(),
            volumes: volumes.len(),
        });
    }
    if heights.len() < MIN_SAMPLES {
        return Err(ProfileError::InsufficientData {
            required: MIN_SAMPLES,
            actual: heights.len(),
        });
    }
    for (index, (h, v)) in heights.iter().zip(volumes).enumerate() {
        if !h.is_finite() {
            return Err(ProfileError::NonFinite {
                field: "height",
                index,
            });
        }
        if !v.is_finite() {
            return Err(ProfileError::NonFinite {
                field: "volume",
                index,
            });
        }
    }
    for i in 1..heights.len() {
        if heights[i] <= heights[i - 1] {
            return Err(ProfileError::NonMonotonicHeight { index: i });
        }
        if volumes[i] < volumes[i - 1] {
            return Err(ProfileError::DecreasingVolume { index: i });
        }
    }
    let span = volumes[volumes.len() - 1] - volumes[0];
    if span <= 0.0 {
        return Err(ProfileError::DegenerateVolume);
    }
    Ok(())
}

fn point_differences(heights: &[f64], volumes: &[f64], floor: f64) -> Vec<f64> {
    let n = heights.len();
    let mut areas = vec![floor; n];
    for i in 1..n {
        let dh = (heights[i] - heights[i - 1]).max(MIN_HEIGHT_STEP);
        let dv = (volumes[i] - volumes[i - 1]).max(floor);
        areas[i] = (dv / dh).max(floor);
    }
    areas[0] = areas[1];
    areas
}
