//! Shape models: volume laws, data-derived starting points and validity rules.

use super::solver::{solve_bounded, SolveFailure, SolverOptions};
use crate::error::FitError;
use crate::profile::MIN_AREA;
use crate::stats::{mean, median};
use crate::types::{
    cone_volume, cylinder_volume, frustum_volume, hemisphere_volume, sphere_cap_volume, ShapeKind,
    ShapeParams,
};
use nalgebra::DVector;
use std::f64::consts::PI;

/// Fewest samples a model is fitted to.
pub const MIN_FIT_SAMPLES: usize = 3;
/// Bounds around the area-derived radius guess.
const RADIUS_LOWER: f64 = 0.5;
const RADIUS_UPPER: f64 = 3.0;
/// Cone height relative to the segment span.
const CONE_HEIGHT_LOWER: f64 = 0.5;
const CONE_HEIGHT_UPPER: f64 = 2.0;
/// Sphere radii span a wider range than the cap's own sections.
const SPHERE_UPPER: f64 = 10.0;
/// Relative area change separating widening and narrowing frustums.
const TREND_TOLERANCE: f64 = 0.05;
/// A dome may run slightly past its radius before the fit is implausible.
const DOME_SPAN_SLACK: f64 = 1.05;

/// Samples of one segment, shifted to start at the origin.
#[derive(Clone, Debug)]
pub struct SegmentData {
    /// Height above the segment start.
    pub x: Vec<f64>,
    /// Volume above the first sample.
    pub y: Vec<f64>,
    /// Derived areas over the same samples.
    pub areas: Vec<f64>,
    /// Measured volume at the last sample, the scale of the fit error.
    pub top_volume: f64,
}

impl SegmentData {
    pub fn new(heights: &[f64], volumes: &[f64], areas: &[f64]) -> Self {
        let h0 = heights.first().copied().unwrap_or(0.0);
        let v0 = volumes.first().copied().unwrap_or(0.0);
        Self {
            x: heights.iter().map(|h| h - h0).collect(),
            y: volumes.iter().map(|v| v - v0).collect(),
            areas: areas.to_vec(),
            top_volume: volumes.last().copied().unwrap_or(0.0),
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Height covered by the segment.
    pub fn span(&self) -> f64 {
        self.x.last().copied().unwrap_or(0.0)
    }

    fn head_area(&self) -> f64 {
        mean(&self.areas[..self.areas.len().min(3)])
    }

    fn tail_area(&self) -> f64 {
        mean(&self.areas[self.areas.len().saturating_sub(3)..])
    }
}

/// Successful fit of one model.
///
/// Residuals are taken after removing their mean, i.e. with the volume at the
/// segment start fitted as a free offset. A noisy first sample then does not
/// shift the whole curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeFit {
    pub params: ShapeParams,
    /// Mean absolute volume residual relative to the volume at the top.
    pub error: f64,
    /// Sum of squared volume residuals.
    pub sse: f64,
}

/// Candidate primitive tried on every segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeModel {
    Cylinder,
    Frustum,
    Cone,
    SphereCap,
    Hemisphere,
}

impl ShapeModel {
    pub const ALL: [ShapeModel; 5] = [
        ShapeModel::Cylinder,
        ShapeModel::Frustum,
        ShapeModel::Cone,
        ShapeModel::SphereCap,
        ShapeModel::Hemisphere,
    ];

    pub fn kind(self) -> ShapeKind {
        match self {
            ShapeModel::Cylinder => ShapeKind::Cylinder,
            ShapeModel::Frustum => ShapeKind::Frustum,
            ShapeModel::Cone => ShapeKind::Cone,
            ShapeModel::SphereCap => ShapeKind::SphereCap,
            ShapeModel::Hemisphere => ShapeKind::Hemisphere,
        }
    }

    /// Shape parameters the optimizer adjusts, without the volume offset.
    pub fn parameter_count(self) -> usize {
        match self {
            ShapeModel::Frustum | ShapeModel::Cone => 2,
            ShapeModel::Cylinder | ShapeModel::SphereCap | ShapeModel::Hemisphere => 1,
        }
    }

    pub fn from_kind(kind: ShapeKind) -> Option<Self> {
        match kind {
            ShapeKind::Cylinder => Some(ShapeModel::Cylinder),
            ShapeKind::Frustum => Some(ShapeModel::Frustum),
            ShapeKind::Cone => Some(ShapeModel::Cone),
            ShapeKind::SphereCap => Some(ShapeModel::SphereCap),
            ShapeKind::Hemisphere => Some(ShapeModel::Hemisphere),
            ShapeKind::Unfit => None,
        }
    }

    /// Fits the model to the segment with the bounded optimizer.
    pub fn fit(self, data: &SegmentData, options: &SolverOptions) -> Result<ShapeFit, FitError> {
        let model = self.kind();
        if data.len() < MIN_FIT_SAMPLES {
            return Err(FitError::TooFewSamples {
                model,
                required: MIN_FIT_SAMPLES,
                actual: data.len(),
            });
        }
        let span = data.span();
        if span <= 0.0 {
            return Err(FitError::Invalid {
                model,
                reason: "segment has no height extent",
            });
        }

        let (init, lower, upper) = self.starting_point(data);
        let residuals = |p: &[f64]| self.residuals(p, data);
        let solution =
            solve_bounded(residuals, &init, &lower, &upper, options).map_err(|e| match e {
                SolveFailure::NonFinite => FitError::NonFinite { model },
                SolveFailure::NoConvergence { iterations } => {
                    FitError::NoConvergence { model, iterations }
                }
            })?;

        let p = &solution.params;
        // The cone's apex offset is a position and may be negative.
        let radii = match self {
            ShapeModel::Cone => &p[..1],
            _ => &p[..],
        };
        if p.iter().any(|v| !v.is_finite()) || radii.iter().any(|v| *v <= 0.0) {
            return Err(FitError::Invalid {
                model,
                reason: "non-positive parameter",
            });
        }
        self.check_geometry(p, data)?;

        let r = self.residuals(p, data);
        let error = r.iter().map(|v| v.abs()).sum::<f64>()
            / data.len() as f64
            / data.top_volume.abs().max(f64::EPSILON);
        if !error.is_finite() {
            return Err(FitError::NonFinite { model });
        }
        Ok(ShapeFit {
            params: self.params(p, span),
            error,
            sse: r.norm_squared(),
        })
    }

    /// Model minus measured volume, centred on zero.
    fn residuals(self, p: &[f64], data: &SegmentData) -> DVector<f64> {
        let span = data.span();
        let mut r = DVector::from_iterator(
            data.len(),
            data.x
                .iter()
                .zip(&data.y)
                .map(|(&x, &y)| self.volume(p, span, x) - y),
        );
        let offset = r.mean();
        r.add_scalar_mut(-offset);
        r
    }

    fn volume(self, p: &[f64], span: f64, x: f64) -> f64 {
        match self {
            ShapeModel::Cylinder => cylinder_volume(p[0], x),
            ShapeModel::Frustum => frustum_volume(p[0], p[1], span, x),
            ShapeModel::Cone => cone_volume(p[0], span - p[1], p[1], x),
            ShapeModel::SphereCap => sphere_cap_volume(p[0], x),
            ShapeModel::Hemisphere => hemisphere_volume(p[0], x),
        }
    }

    fn params(self, p: &[f64], span: f64) -> ShapeParams {
        match self {
            ShapeModel::Cylinder => ShapeParams::Cylinder { radius: p[0] },
            ShapeModel::Frustum => ShapeParams::Frustum {
                r_bottom: p[0],
                r_top: p[1],
                height: span,
            },
            ShapeModel::Cone => ShapeParams::Cone {
                r_base: p[0],
                height: span - p[1],
                apex_offset: p[1],
            },
            ShapeModel::SphereCap => ShapeParams::SphereCap { sphere_radius: p[0] },
            ShapeModel::Hemisphere => ShapeParams::Hemisphere { radius: p[0] },
        }
    }

    /// Initial parameters and box bounds derived from the segment's areas.
    fn starting_point(self, data: &SegmentData) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let span = data.span();
        let radial = |g: f64| (vec![g], vec![RADIUS_LOWER * g], vec![RADIUS_UPPER * g]);
        match self {
            ShapeModel::Cylinder => radial(radius_of(median(&data.areas))),
            ShapeModel::Cone => {
                // Base at the segment top, apex free to sit up to one span
                // below the start or half a span above it.
                let g = radius_of(data.tail_area());
                (
                    vec![g, 0.0],
                    vec![RADIUS_LOWER * g, (1.0 - CONE_HEIGHT_UPPER) * span],
                    vec![RADIUS_UPPER * g, (1.0 - CONE_HEIGHT_LOWER) * span],
                )
            }
            ShapeModel::Frustum => {
                let g1 = radius_of(data.head_area());
                let g2 = radius_of(data.tail_area());
                (
                    vec![g1, g2],
                    vec![RADIUS_LOWER * g1, RADIUS_LOWER * g2],
                    vec![RADIUS_UPPER * g1, RADIUS_UPPER * g2],
                )
            }
            ShapeModel::SphereCap => {
                // R from the cap law A = π(2Rx − x²) at the segment top.
                let g = ((data.tail_area() / PI + span * span) / (2.0 * span)).max(0.5 * span);
                let lower = (RADIUS_LOWER * g).max(0.5 * span);
                (vec![g], vec![lower], vec![(SPHERE_UPPER * g).max(lower)])
            }
            ShapeModel::Hemisphere => {
                let g = radius_of(data.head_area()).max(span);
                let lower = (RADIUS_LOWER * g).max(span / DOME_SPAN_SLACK);
                (vec![g], vec![lower], vec![(RADIUS_UPPER * g).max(lower)])
            }
        }
    }

    fn check_geometry(self, p: &[f64], data: &SegmentData) -> Result<(), FitError> {
        let model = self.kind();
        let span = data.span();
        let invalid = |reason| Err(FitError::Invalid { model, reason });
        match self {
            ShapeModel::Frustum => {
                let head = data.head_area();
                let tail = data.tail_area();
                let trend = (tail - head) / head.max(tail).max(f64::EPSILON);
                if trend > TREND_TOLERANCE && p[1] < p[0] {
                    return invalid("radius shrinks while area grows");
                }
                if trend < -TREND_TOLERANCE && p[1] > p[0] {
                    return invalid("radius grows while area shrinks");
                }
                Ok(())
            }
            ShapeModel::SphereCap if span > 2.0 * p[0] * (1.0 + 1e-9) => {
                invalid("cap taller than its sphere")
            }
            ShapeModel::Hemisphere if span > DOME_SPAN_SLACK * p[0] => {
                invalid("dome taller than its radius")
            }
            _ => Ok(()),
        }
    }
}

#[inline]
fn radius_of(area: f64) -> f64 {
    (area.max(MIN_AREA) / PI).sqrt()
}
