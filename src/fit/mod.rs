//! Per-segment shape fitting and model selection.
//!
//! Every segment is fitted with each applicable [`ShapeModel`]. Failures of a
//! single model are logged and skipped; the remaining fits compete on their
//! relative volume error with small complexity penalties:
//!
//! - frustum `+0.005` and cone `+0.002` when their raw error is below 3 %,
//!   so a two-parameter model only wins when it explains clearly more;
//! - a winning frustum whose radii differ by less than 5 % yields to the
//!   cylinder when the cylinder error is within 1.2× (or collapses into one);
//! - a curved model flagged by the curvature signature is preferred when its
//!   error is within 1.25× of the best.
//!
//! The hemisphere model is only tried when the dome signature is present,
//! since a decreasing-area dome otherwise competes poorly with frustums on
//! short stretches. When nothing fits, the segment is reported as unfit.

pub mod models;
pub mod solver;

pub use models::{SegmentData, ShapeFit, ShapeModel};
pub use solver::SolverOptions;

use crate::curvature::{CurvatureProfile, ShapeSignature};
use crate::error::FitError;
use crate::profile::AreaProfile;
use crate::types::{Segment, ShapeKind, ShapeParams};
use log::{debug, warn};

const COMPLEXITY_GATE: f64 = 0.03;
const FRUSTUM_PENALTY: f64 = 0.005;
const CONE_PENALTY: f64 = 0.002;
const NEAR_CYLINDER_RADIUS_DIFF: f64 = 0.05;
const CYLINDER_PREFERENCE: f64 = 1.2;
const SIGNATURE_PREFERENCE: f64 = 1.25;

/// Knobs of the per-segment fitter.
#[derive(Clone, Copy, Debug)]
pub struct FitterOptions {
    /// Errors above this mark the chosen fit as low confidence.
    pub max_fit_error: f64,
    /// Curvature level used by the signature checks.
    pub curvature_threshold: f64,
    pub solver: SolverOptions,
}

impl Default for FitterOptions {
    fn default() -> Self {
        Self {
            max_fit_error: 0.25,
            curvature_threshold: 0.05,
            solver: SolverOptions::default(),
        }
    }
}

/// One model's successful fit, as seen by the selection rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelFit {
    pub model: ShapeModel,
    pub fit: ShapeFit,
}

/// A fitted segment with the residual statistics boundary refinement weighs.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredSegment {
    pub segment: Segment,
    /// Sum of squared volume residuals; infinite when nothing fits.
    pub sse: f64,
    /// Free parameters of the chosen model, volume offset included.
    pub parameters: usize,
}

impl ScoredSegment {
    pub fn is_fitted(&self) -> bool {
        self.segment.shape != ShapeKind::Unfit
    }
}

/// Fits segments of one profile.
pub struct SegmentFitter<'a> {
    profile: &'a AreaProfile,
    signals: &'a CurvatureProfile,
    options: FitterOptions,
}

impl<'a> SegmentFitter<'a> {
    pub fn new(
        profile: &'a AreaProfile,
        signals: &'a CurvatureProfile,
        options: FitterOptions,
    ) -> Self {
        Self {
            profile,
            signals,
            options,
        }
    }

    pub fn options(&self) -> &FitterOptions {
        &self.options
    }

    pub fn profile(&self) -> &'a AreaProfile {
        self.profile
    }

    /// Samples of the inclusive range `[start, end]`.
    pub fn segment_data(&self, start: usize, end: usize) -> SegmentData {
        SegmentData::new(
            &self.profile.heights()[start..=end],
            &self.profile.volumes()[start..=end],
            &self.profile.areas()[start..=end],
        )
    }

    /// Fits a single model over `[start, end]`.
    pub fn fit_model(
        &self,
        model: ShapeModel,
        start: usize,
        end: usize,
    ) -> Result<ShapeFit, FitError> {
        model.fit(&self.segment_data(start, end), &self.options.solver)
    }

    /// Fits every applicable model and keeps the preferred one.
    pub fn fit(&self, start: usize, end: usize) -> Segment {
        self.fit_scored(start, end).segment
    }

    /// [`fit`](Self::fit) together with the chosen model's residuals.
    pub fn fit_scored(&self, start: usize, end: usize) -> ScoredSegment {
        let signature = self
            .signals
            .signature(start, end, self.options.curvature_threshold);
        let data = self.segment_data(start, end);

        let mut fits = Vec::with_capacity(ShapeModel::ALL.len());
        for model in candidate_models(signature) {
            match model.fit(&data, &self.options.solver) {
                Ok(fit) => {
                    debug!(
                        "segment [{start}, {end}] {} error={:.5}",
                        model.kind(),
                        fit.error
                    );
                    fits.push(ModelFit { model, fit });
                }
                Err(err @ FitError::NoConvergence { .. }) => {
                    warn!("segment [{start}, {end}]: {err}")
                }
                Err(err) => debug!("segment [{start}, {end}] skipped: {err}"),
            }
        }

        let Some(choice) = choose_model(&fits, signature) else {
            warn!("segment [{start}, {end}] could not be fitted by any model");
            return ScoredSegment {
                segment: Segment::unfit(start, end),
                sse: f64::INFINITY,
                parameters: 1,
            };
        };
        let mut segment = Segment::new(start, end, choice.params, choice.error);
        if choice.error > self.options.max_fit_error {
            warn!(
                "segment [{start}, {end}] best fit {} has error {:.3}",
                segment.shape, choice.error
            );
            segment.low_confidence = true;
        }
        let parameters = ShapeModel::from_kind(segment.shape)
            .map_or(0, ShapeModel::parameter_count)
            + 1;
        ScoredSegment {
            segment,
            sse: choice.sse,
            parameters,
        }
    }

    /// Fits each segment implied by a transition list.
    ///
    /// Segment `i` covers `[t_i, t_{i+1} − 1]` and the last one runs to the
    /// final sample, so the result partitions the profile.
    pub fn fit_partition(&self, transitions: &[usize]) -> Vec<Segment> {
        partition(transitions, self.profile.len())
            .into_iter()
            .map(|(start, end)| self.fit(start, end))
            .collect()
    }
}

/// Inclusive index ranges implied by a transition list over `n` samples.
pub fn partition(transitions: &[usize], n: usize) -> Vec<(usize, usize)> {
    if n == 0 {
        return Vec::new();
    }
    let mut bounds: Vec<usize> = transitions.iter().copied().filter(|&t| t < n).collect();
    bounds.sort_unstable();
    bounds.dedup();
    if bounds.first() != Some(&0) {
        bounds.insert(0, 0);
    }
    if bounds.last() != Some(&(n - 1)) {
        bounds.push(n - 1);
    }
    if bounds.len() < 2 {
        return vec![(0, n - 1)];
    }
    let k = bounds.len();
    (0..k - 1)
        .map(|i| {
            let end = if i + 2 == k { n - 1 } else { bounds[i + 1] - 1 };
            (bounds[i], end)
        })
        .collect()
}

fn candidate_models(signature: ShapeSignature) -> Vec<ShapeModel> {
    let mut models = Vec::with_capacity(ShapeModel::ALL.len());
    match signature {
        ShapeSignature::Hemisphere => models.push(ShapeModel::Hemisphere),
        ShapeSignature::SphereCap => models.push(ShapeModel::SphereCap),
        ShapeSignature::None => {}
    }
    for model in [
        ShapeModel::Cylinder,
        ShapeModel::Frustum,
        ShapeModel::Cone,
        ShapeModel::SphereCap,
    ] {
        if !models.contains(&model) {
            models.push(model);
        }
    }
    models
}

fn adjusted_error(candidate: &ModelFit) -> f64 {
    let error = candidate.fit.error;
    match candidate.model {
        ShapeModel::Frustum if error < COMPLEXITY_GATE => error + FRUSTUM_PENALTY,
        ShapeModel::Cone if error < COMPLEXITY_GATE => error + CONE_PENALTY,
        _ => error,
    }
}

/// Applies the selection rules to the successful fits of one segment.
pub fn choose_model(fits: &[ModelFit], signature: ShapeSignature) -> Option<ShapeFit> {
    let best = fits.iter().min_by(|a, b| {
        adjusted_error(a)
            .partial_cmp(&adjusted_error(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let find = |model: ShapeModel| fits.iter().find(|f| f.model == model);

    let flagged = match signature {
        ShapeSignature::Hemisphere => find(ShapeModel::Hemisphere),
        ShapeSignature::SphereCap => find(ShapeModel::SphereCap),
        ShapeSignature::None => None,
    };
    if let Some(curved) = flagged {
        if curved.fit.error <= best.fit.error * SIGNATURE_PREFERENCE + 1e-9 {
            return Some(curved.fit);
        }
    }

    if let ShapeParams::Frustum { r_bottom, r_top, .. } = best.fit.params {
        let r_max = r_bottom.max(r_top);
        if r_max > 0.0 && (r_top - r_bottom).abs() / r_max < NEAR_CYLINDER_RADIUS_DIFF {
            return Some(match find(ShapeModel::Cylinder) {
                Some(cyl) if cyl.fit.error <= best.fit.error * CYLINDER_PREFERENCE + 1e-9 => {
                    cyl.fit
                }
                Some(_) => best.fit,
                None => ShapeFit {
                    params: ShapeParams::Cylinder {
                        radius: 0.5 * (r_bottom + r_top),
                    },
                    ..best.fit
                },
            });
        }
    }
    Some(best.fit)
}

#[cfg(test)]
mod tests;
