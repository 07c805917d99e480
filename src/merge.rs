//! Repair of spurious splits between neighbouring segments.
//!
//! Segments are walked left to right. A neighbour is absorbed when it has the
//! same kind and nearly the same geometry:
//!
//! - cylinders: radii within half of `merge_threshold`;
//! - frustums: the top radius of the running segment matches the bottom
//!   radius of the next within `merge_threshold`;
//! - cones: base radii within `merge_threshold`;
//! - sphere caps and hemispheres: radii within 5 %, identical kind only.
//!
//! Unfit segments never merge. A merged range is refitted with the shared
//! model; when that fails the parameters are blended by segment length.

use crate::fit::{SegmentFitter, ShapeModel};
use crate::types::{Segment, ShapeKind, ShapeParams};
use log::debug;

/// Tolerance for splitting one curved surface at an inflection.
pub const CURVED_MERGE_TOLERANCE: f64 = 0.05;

/// `|a − b| / max(a, b)`, infinite when either side is not a positive radius.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.max(b);
    if !a.is_finite() || !b.is_finite() || scale <= 0.0 {
        return f64::INFINITY;
    }
    (a - b).abs() / scale
}

/// Merges adjacent segments through a fitter over the same profile.
pub struct SegmentMerger<'f, 'a> {
    fitter: &'f SegmentFitter<'a>,
    merge_threshold: f64,
}

impl<'f, 'a> SegmentMerger<'f, 'a> {
    pub fn new(fitter: &'f SegmentFitter<'a>, merge_threshold: f64) -> Self {
        Self {
            fitter,
            merge_threshold,
        }
    }

    /// Whether `next` continues `current` closely enough to be one segment.
    pub fn should_merge(&self, current: &Segment, next: &Segment) -> bool {
        if current.shape != next.shape || current.end_idx + 1 != next.start_idx {
            return false;
        }
        match (current.params, next.params) {
            (ShapeParams::Cylinder { radius: a }, ShapeParams::Cylinder { radius: b }) => {
                relative_difference(a, b) < 0.5 * self.merge_threshold
            }
            (ShapeParams::Frustum { r_top, .. }, ShapeParams::Frustum { r_bottom, .. }) => {
                relative_difference(r_top, r_bottom) < self.merge_threshold
            }
            (ShapeParams::Cone { r_base: a, .. }, ShapeParams::Cone { r_base: b, .. }) => {
                relative_difference(a, b) < self.merge_threshold
            }
            (
                ShapeParams::SphereCap { sphere_radius: a },
                ShapeParams::SphereCap { sphere_radius: b },
            )
            | (ShapeParams::Hemisphere { radius: a }, ShapeParams::Hemisphere { radius: b }) => {
                relative_difference(a, b) < CURVED_MERGE_TOLERANCE
            }
            _ => false,
        }
    }

    /// Returns the merged list; the partition of the profile is preserved.
    pub fn merge(&self, segments: &[Segment]) -> Vec<Segment> {
        let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
        let mut iter = segments.iter();
        let Some(first) = iter.next() else {
            return out;
        };
        let mut current = first.clone();
        for next in iter {
            if self.should_merge(&current, next) {
                debug!(
                    "merging {} [{}, {}] with [{}, {}]",
                    current.shape, current.start_idx, current.end_idx, next.start_idx, next.end_idx
                );
                current = self.combine(&current, next);
            } else {
                out.push(std::mem::replace(&mut current, next.clone()));
            }
        }
        out.push(current);
        if out.len() < segments.len() {
            debug!("merge: {} -> {} segments", segments.len(), out.len());
        }
        out
    }

    fn combine(&self, current: &Segment, next: &Segment) -> Segment {
        let (start, end) = (current.start_idx, next.end_idx);
        let refit = ShapeModel::from_kind(current.shape)
            .map(|model| self.fitter.fit_model(model, start, end));
        match refit {
            Some(Ok(fit)) => {
                let mut merged = Segment::new(start, end, fit.params, fit.error);
                merged.low_confidence = fit.error > self.fitter.options().max_fit_error;
                merged
            }
            Some(Err(err)) => {
                debug!("refit of merged [{start}, {end}] failed ({err}), blending parameters");
                blend(current, next)
            }
            None => blend(current, next),
        }
    }
}

/// Length-weighted combination of two same-kind segments.
pub fn blend(current: &Segment, next: &Segment) -> Segment {
    let wa = current.len() as f64;
    let wb = next.len() as f64;
    let mix = |a: f64, b: f64| (a * wa + b * wb) / (wa + wb);
    let params = match (current.params, next.params) {
        (ShapeParams::Cylinder { radius: a }, ShapeParams::Cylinder { radius: b }) => {
            ShapeParams::Cylinder { radius: mix(a, b) }
        }
        (
            ShapeParams::Frustum {
                r_bottom, height: ha, ..
            },
            ShapeParams::Frustum {
                r_top, height: hb, ..
            },
        ) => ShapeParams::Frustum {
            r_bottom,
            r_top,
            height: ha + hb,
        },
        (
            ShapeParams::Cone {
                r_base: a,
                height: ha,
                apex_offset,
            },
            ShapeParams::Cone {
                r_base: b,
                height: hb,
                apex_offset: next_apex,
            },
        ) => ShapeParams::Cone {
            r_base: mix(a, b),
            // Apex of the lower cone, base at the top of the upper one.
            height: ha + next_apex + hb,
            apex_offset,
        },
        (ShapeParams::SphereCap { sphere_radius: a }, ShapeParams::SphereCap { sphere_radius: b }) => {
            ShapeParams::SphereCap {
                sphere_radius: mix(a, b),
            }
        }
        (ShapeParams::Hemisphere { radius: a }, ShapeParams::Hemisphere { radius: b }) => {
            ShapeParams::Hemisphere { radius: mix(a, b) }
        }
        _ => current.params,
    };
    let mut merged = Segment::new(
        current.start_idx,
        next.end_idx,
        params,
        mix(current.fit_error, next.fit_error),
    );
    merged.low_confidence = current.low_confidence || next.low_confidence;
    if merged.shape == ShapeKind::Unfit {
        merged.fit_error = f64::NAN;
    }
    merged
}
