//! Analyzer configuration and diameter/SNR-driven parameter selection.
//!
//! [`AnalyzerConfig`] is the caller-facing knob set. When adaptive
//! thresholding is enabled the working values are taken from a small table
//! keyed by the container's estimated diameter, and the detection percentile
//! is further refined from the measured signal-to-noise band:
//!
//! | size   | diameter (mm) | percentile | merge | min_points | variance | curvature |
//! |--------|---------------|-----------:|------:|-----------:|---------:|----------:|
//! | small  | `< 12`        | 96         | 0.12  | 12         | 0.14     | 0.04      |
//! | medium | `[12, 14)`    | 95         | 0.10  | 12         | 0.12     | 0.06      |
//! | large  | `>= 14`       | 96         | 0.12  | 12         | 0.14     | 0.05      |
//!
//! All selectors are total: NaN or negative diameters fall into the smallest
//! category.

use crate::profile::{ProfileOptions, MIN_AREA};
use serde::{Deserialize, Serialize};

/// Confidence levels shared by the segment-count ensemble and its gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Caller-facing analyzer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Minimum samples per segment and minimum spacing between transitions.
    pub min_points: usize,
    /// Score percentile used when adaptive thresholding is disabled.
    pub percentile: f64,
    /// Coefficient-of-variation floor for transition validation.
    pub variance_threshold: f64,
    /// Relative radius difference below which neighbours merge.
    pub merge_threshold: f64,
    /// Curvature coefficient marking a point as curved.
    pub curvature_threshold: f64,
    /// Minimum height (mm) between transitions, converted to samples.
    pub transition_buffer: f64,
    /// Derive parameters from diameter and SNR instead of the fields above.
    pub use_adaptive_threshold: bool,
    /// Route predicted 3+ segment containers to the stability detector.
    pub use_selective_detection: bool,
    /// Minimum ensemble confidence for stability routing.
    pub selective_confidence_threshold: ConfidenceLevel,
    /// Sliding-window regression for areas; point differences otherwise.
    pub use_local_regression: bool,
    /// Fit errors above this are reported as low confidence.
    pub max_fit_error: f64,
    /// Optimizer iteration cap per shape model.
    pub max_iterations: usize,
    /// Revisit boundaries against the volume residuals after merging.
    pub use_boundary_refinement: bool,
    /// Parameter weight of the refinement criterion; larger keeps fewer
    /// boundaries.
    pub refinement_penalty: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_points: 12,
            percentile: 96.0,
            variance_threshold: 0.14,
            merge_threshold: 0.12,
            curvature_threshold: 0.05,
            transition_buffer: 2.5,
            use_adaptive_threshold: true,
            use_selective_detection: false,
            selective_confidence_threshold: ConfidenceLevel::Medium,
            use_local_regression: true,
            max_fit_error: 0.25,
            max_iterations: 200,
            use_boundary_refinement: true,
            refinement_penalty: 6.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn profile_options(&self) -> ProfileOptions {
        ProfileOptions {
            use_local_regression: self.use_local_regression,
            min_area: MIN_AREA,
        }
    }
}

/// Container size class used for the base parameter table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    pub fn from_diameter(diameter: f64) -> Self {
        if diameter >= 14.0 {
            SizeCategory::Large
        } else if diameter >= 12.0 {
            SizeCategory::Medium
        } else {
            SizeCategory::Small
        }
    }
}

/// Diameter class used by the SNR percentile table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityCategory {
    Small,
    Medium,
    Large,
}

impl DensityCategory {
    pub fn from_diameter(diameter: f64) -> Self {
        if diameter >= 12.0 {
            DensityCategory::Large
        } else if diameter >= 8.0 {
            DensityCategory::Medium
        } else {
            DensityCategory::Small
        }
    }
}

/// Signal-to-noise band of the area profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnrBand {
    VeryClean,
    Clean,
    Moderate,
    Noisy,
    VeryNoisy,
}

impl SnrBand {
    pub fn from_snr(snr: f64) -> Self {
        if snr.is_nan() {
            SnrBand::VeryNoisy
        } else if snr > 100.0 {
            SnrBand::VeryClean
        } else if snr > 50.0 {
            SnrBand::Clean
        } else if snr > 20.0 {
            SnrBand::Moderate
        } else if snr > 10.0 {
            SnrBand::Noisy
        } else {
            SnrBand::VeryNoisy
        }
    }

    fn column(self) -> usize {
        match self {
            SnrBand::VeryClean => 0,
            SnrBand::Clean => 1,
            SnrBand::Moderate => 2,
            SnrBand::Noisy => 3,
            SnrBand::VeryNoisy => 4,
        }
    }
}

/// Detection percentile per density row and SNR band column.
const SNR_PERCENTILES: [[f64; 5]; 3] = [
    [70.0, 75.0, 80.0, 85.0, 85.0],
    [65.0, 72.0, 75.0, 80.0, 82.0],
    [68.0, 72.0, 78.0, 80.0, 85.0],
];

/// Percentile looked up from the density category and SNR band.
pub fn snr_percentile(density: DensityCategory, band: SnrBand) -> f64 {
    let row = match density {
        DensityCategory::Small => 0,
        DensityCategory::Medium => 1,
        DensityCategory::Large => 2,
    };
    SNR_PERCENTILES[row][band.column()]
}

/// Working thresholds for one analysis run.
///
/// A plain value: refining it returns a new instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdaptiveParams {
    pub percentile: f64,
    pub merge_threshold: f64,
    pub min_points: usize,
    pub variance_threshold: f64,
    pub transition_buffer: f64,
    pub curvature_threshold: f64,
}

impl AdaptiveParams {
    /// Base parameters for a container of the given diameter.
    pub fn select(diameter: f64) -> Self {
        match SizeCategory::from_diameter(diameter) {
            SizeCategory::Small => Self {
                percentile: 96.0,
                merge_threshold: 0.12,
                min_points: 12,
                variance_threshold: 0.14,
                transition_buffer: 2.5,
                curvature_threshold: 0.04,
            },
            SizeCategory::Medium => Self {
                percentile: 95.0,
                merge_threshold: 0.10,
                min_points: 12,
                variance_threshold: 0.12,
                transition_buffer: 2.5,
                curvature_threshold: 0.06,
            },
            SizeCategory::Large => Self {
                percentile: 96.0,
                merge_threshold: 0.12,
                min_points: 12,
                variance_threshold: 0.14,
                transition_buffer: 2.5,
                curvature_threshold: 0.05,
            },
        }
    }

    /// Parameters taken verbatim from the configuration.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            percentile: config.percentile,
            merge_threshold: config.merge_threshold,
            min_points: config.min_points.max(2),
            variance_threshold: config.variance_threshold,
            transition_buffer: config.transition_buffer,
            curvature_threshold: config.curvature_threshold,
        }
    }

    /// Same parameters with the percentile chosen from the SNR table.
    pub fn with_snr_band(self, band: SnrBand, density: DensityCategory) -> Self {
        Self {
            percentile: snr_percentile(density, band),
            ..self
        }
    }

    /// Minimum index spacing between transitions for the given sampling step.
    pub fn min_spacing(&self, median_step: f64) -> usize {
        let buffer = if median_step > 0.0 && self.transition_buffer > 0.0 {
            (self.transition_buffer / median_step).ceil() as usize
        } else {
            0
        };
        self.min_points.max(buffer).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_boundaries_are_half_open() {
        assert_eq!(SizeCategory::from_diameter(11.999), SizeCategory::Small);
        assert_eq!(SizeCategory::from_diameter(12.0), SizeCategory::Medium);
        assert_eq!(SizeCategory::from_diameter(13.999), SizeCategory::Medium);
        assert_eq!(SizeCategory::from_diameter(14.0), SizeCategory::Large);
        assert_eq!(SizeCategory::from_diameter(f64::NAN), SizeCategory::Small);
        assert_eq!(SizeCategory::from_diameter(-3.0), SizeCategory::Small);
    }

    #[test]
    fn density_boundaries_are_half_open() {
        assert_eq!(DensityCategory::from_diameter(7.999), DensityCategory::Small);
        assert_eq!(DensityCategory::from_diameter(8.0), DensityCategory::Medium);
        assert_eq!(DensityCategory::from_diameter(11.999), DensityCategory::Medium);
        assert_eq!(DensityCategory::from_diameter(12.0), DensityCategory::Large);
    }

    #[test]
    fn each_diameter_selects_one_table_row() {
        let small = AdaptiveParams::select(5.0);
        let medium = AdaptiveParams::select(13.0);
        let large = AdaptiveParams::select(40.0);
        assert_ne!(small, medium);
        assert_ne!(medium, large);
        assert_ne!(small, large);
        assert_eq!(AdaptiveParams::select(12.0), medium);
        assert_eq!(AdaptiveParams::select(f64::INFINITY), large);
    }

    #[test]
    fn snr_bands_and_percentiles() {
        assert_eq!(SnrBand::from_snr(f64::INFINITY), SnrBand::VeryClean);
        assert_eq!(SnrBand::from_snr(100.0), SnrBand::Clean);
        assert_eq!(SnrBand::from_snr(50.5), SnrBand::Clean);
        assert_eq!(SnrBand::from_snr(21.0), SnrBand::Moderate);
        assert_eq!(SnrBand::from_snr(10.5), SnrBand::Noisy);
        assert_eq!(SnrBand::from_snr(3.0), SnrBand::VeryNoisy);

        let refined = AdaptiveParams::select(10.0)
            .with_snr_band(SnrBand::Moderate, DensityCategory::from_diameter(10.0));
        assert_eq!(refined.percentile, 75.0);
        assert_eq!(refined.min_points, 12);
    }

    #[test]
    fn spacing_honours_buffer_on_dense_sampling() {
        let params = AdaptiveParams::select(10.0);
        assert_eq!(params.min_spacing(1.0), 12);
        assert_eq!(params.min_spacing(0.125), 20);
        assert_eq!(params.min_spacing(0.0), 12);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: AnalyzerConfig = serde_json::from_str(
            r#"{ "min_points": 8, "selective_confidence_threshold": "high" }"#,
        )
        .expect("config parses");
        assert_eq!(cfg.min_points, 8);
        assert_eq!(cfg.selective_confidence_threshold, ConfidenceLevel::High);
        assert!(cfg.use_adaptive_threshold);
        assert_eq!(cfg.max_iterations, 200);
    }
}
