//! End-to-end analysis of one volume-vs-height profile.
//!
//! [`ProfileAnalyzer`] wires the stages together: area derivation, diameter
//! and parameter selection, curvature signals, transition detection (the
//! multi-derivative detector, or the stability detector when routing is
//! enabled and gated in), per-segment fitting, merging and boundary
//! refinement.
//!
//! Typical usage:
//! ```no_run
//! use profile_segmenter::{AnalyzerConfig, ProfileAnalyzer};
//!
//! # fn example(heights: &[f64], volumes: &[f64]) -> Result<(), profile_segmenter::ProfileError> {
//! let analyzer = ProfileAnalyzer::new(AnalyzerConfig::default());
//! let report = analyzer.analyze(heights, volumes)?;
//! for seg in &report.segments {
//!     println!("{} [{}, {}] error={:.4}", seg.shape, seg.start_idx, seg.end_idx, seg.fit_error);
//! }
//! # Ok(())
//! # }
//! ```
use crate::curvature::CurvatureProfile;
use crate::diagnostics::timing::{Stage, StageClock};
use crate::diagnostics::{volume_check, AnalysisDiagnostics, AnalysisReport, DetectionTrace};
use crate::diameter::estimate_diameter;
use crate::error::ProfileError;
use crate::fit::{FitterOptions, SegmentFitter, SolverOptions};
use crate::merge::SegmentMerger;
use crate::params::{AdaptiveParams, AnalyzerConfig, DensityCategory, SizeCategory, SnrBand};
use crate::profile::AreaProfile;
use crate::refine::{RefineOptions, RefinementTrace, SegmentRefiner};
use crate::stability::{DetectionMethod, StabilityRouter};
use crate::transitions::{detect_transitions, estimate_snr};
use log::{debug, warn};

/// Segments a container profile into geometric primitives.
#[derive(Clone, Debug, Default)]
pub struct ProfileAnalyzer {
    config: AnalyzerConfig,
}

impl ProfileAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Working parameters for a container of the given diameter and profile.
    pub fn select_params(&self, diameter: f64, band: SnrBand) -> AdaptiveParams {
        if self.config.use_adaptive_threshold {
            AdaptiveParams::select(diameter)
                .with_snr_band(band, DensityCategory::from_diameter(diameter))
        } else {
            AdaptiveParams::from_config(&self.config)
        }
    }

    /// Runs the full pipeline.
    ///
    /// Only malformed input is an error; poor fits and rejected transitions
    /// show up in the report instead.
    pub fn analyze(&self, heights: &[f64], volumes: &[f64]) -> Result<AnalysisReport, ProfileError> {
        let mut clock = StageClock::start();

        let profile = AreaProfile::build(heights, volumes, &self.config.profile_options())?;
        clock.lap(Stage::AreaProfile);

        let diameter = estimate_diameter(profile.areas());
        let snr = estimate_snr(profile.areas());
        let params = self.select_params(diameter, snr.band);
        debug!(
            "diameter={:.2} mm snr={:.1} band={:?} params={:?}",
            diameter, snr.snr, snr.band, params
        );
        clock.lap(Stage::Parameters);

        let signals = CurvatureProfile::from_profile(&profile);
        clock.lap(Stage::Curvature);

        let (outcome, method, prediction) = if self.config.use_selective_detection {
            let router = StabilityRouter::new(self.config.selective_confidence_threshold);
            let (outcome, decision) = router.detect(&profile, &signals, &params);
            (outcome, decision.method, Some(decision.prediction))
        } else {
            (
                detect_transitions(&profile, &signals, &params),
                DetectionMethod::MultiDerivative,
                None,
            )
        };
        debug!("transitions {:?} via {:?}", outcome.transitions, method);
        clock.lap(Stage::Transitions);

        let fitter = SegmentFitter::new(
            &profile,
            &signals,
            FitterOptions {
                max_fit_error: self.config.max_fit_error,
                curvature_threshold: params.curvature_threshold,
                solver: SolverOptions {
                    max_iterations: self.config.max_iterations,
                    ..SolverOptions::default()
                },
            },
        );
        let fitted = fitter.fit_partition(&outcome.transitions);
        clock.lap(Stage::Fitting);

        let merged = SegmentMerger::new(&fitter, params.merge_threshold).merge(&fitted);
        clock.lap(Stage::Merging);

        let merged_count = merged.len();
        let (segments, refinement) = if self.config.use_boundary_refinement {
            let options = RefineOptions {
                min_points: params.min_points,
                penalty: self.config.refinement_penalty,
                ..RefineOptions::default()
            };
            SegmentRefiner::new(&fitter, options).refine(&merged)
        } else {
            (merged, RefinementTrace::default())
        };
        clock.lap(Stage::Refinement);

        let check = volume_check(&segments, profile.heights(), profile.volumes());
        if let Some(c) = check.filter(|c| !c.within_tolerance) {
            warn!(
                "modelled volume {:.1} differs from measured {:.1} by {:.2}%",
                c.modelled,
                c.measured,
                100.0 * c.relative_error
            );
        }
        let timings = clock.finish();
        debug!(
            "analysis finished: {} segments ({} fitted, {} merged) in {:.2} ms",
            segments.len(),
            fitted.len(),
            merged_count,
            timings.total_ms
        );

        let diagnostics = AnalysisDiagnostics {
            sample_count: profile.len(),
            regression_window: profile.regression_window(),
            smoothing_window: signals.window(),
            diameter_mm: diameter,
            size_category: SizeCategory::from_diameter(diameter),
            density_category: DensityCategory::from_diameter(diameter),
            snr,
            params,
            detection: DetectionTrace {
                method,
                prediction,
                transitions: outcome.transitions,
                accepted: outcome.accepted,
                validations: outcome.validations,
                counts: outcome.counts,
                percentile: outcome.percentile,
                threshold: outcome.threshold,
                min_spacing: outcome.min_spacing,
                too_short: outcome.too_short,
            },
            segments_before_merge: fitted.len(),
            segments_after_merge: merged_count,
            refinement,
            volume_check: check,
            area_profile: profile.points().collect(),
            timings,
        };
        Ok(AnalysisReport {
            segments,
            diagnostics,
        })
    }
}
