use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Cross-sectional area derived at one sample height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AreaPoint {
    pub height: f64,
    pub area: f64,
}

/// Geometric primitive assigned to a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Cylinder,
    Frustum,
    Cone,
    SphereCap,
    Hemisphere,
    Unfit,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Frustum => "frustum",
            ShapeKind::Cone => "cone",
            ShapeKind::SphereCap => "sphere_cap",
            ShapeKind::Hemisphere => "hemisphere",
            ShapeKind::Unfit => "unfit",
        }
    }

    /// Shapes whose area varies nonlinearly with height.
    pub fn is_curved(self) -> bool {
        matches!(self, ShapeKind::SphereCap | ShapeKind::Hemisphere)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fitted parameters of a segment, in millimetres.
///
/// Heights inside a segment are measured from the segment start. The cone
/// has its base at the segment top and its apex `apex_offset` above the
/// start (negative when the apex lies below the first sample); the
/// hemisphere is a dome whose widest section sits at the start; the sphere
/// cap grows from a pole at the start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeParams {
    Cylinder { radius: f64 },
    Frustum { r_bottom: f64, r_top: f64, height: f64 },
    Cone {
        r_base: f64,
        height: f64,
        apex_offset: f64,
    },
    SphereCap { sphere_radius: f64 },
    Hemisphere { radius: f64 },
    Unfit,
}

impl ShapeParams {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeParams::Cylinder { .. } => ShapeKind::Cylinder,
            ShapeParams::Frustum { .. } => ShapeKind::Frustum,
            ShapeParams::Cone { .. } => ShapeKind::Cone,
            ShapeParams::SphereCap { .. } => ShapeKind::SphereCap,
            ShapeParams::Hemisphere { .. } => ShapeKind::Hemisphere,
            ShapeParams::Unfit => ShapeKind::Unfit,
        }
    }

    /// Radius used when comparing neighbouring segments of the same kind.
    pub fn defining_radius(&self) -> Option<f64> {
        match *self {
            ShapeParams::Cylinder { radius } => Some(radius),
            ShapeParams::Frustum { r_bottom, r_top, .. } => Some(0.5 * (r_bottom + r_top)),
            ShapeParams::Cone { r_base, .. } => Some(r_base),
            ShapeParams::SphereCap { sphere_radius } => Some(sphere_radius),
            ShapeParams::Hemisphere { radius } => Some(radius),
            ShapeParams::Unfit => None,
        }
    }

    /// Radius of the horizontal section at height `x` above the segment start.
    pub fn radius_at(&self, x: f64) -> Option<f64> {
        match *self {
            ShapeParams::Cylinder { radius } => Some(radius),
            ShapeParams::Frustum {
                r_bottom,
                r_top,
                height,
            } => {
                let t = if height > 0.0 {
                    (x / height).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                Some(r_bottom + (r_top - r_bottom) * t)
            }
            ShapeParams::Cone {
                r_base,
                height,
                apex_offset,
            } => {
                let t = if height > 0.0 {
                    ((x - apex_offset) / height).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                Some(r_base * t)
            }
            ShapeParams::SphereCap { sphere_radius: r } => {
                let x = x.clamp(0.0, 2.0 * r);
                Some((x * (2.0 * r - x)).max(0.0).sqrt())
            }
            ShapeParams::Hemisphere { radius: r } => {
                let x = x.clamp(0.0, r);
                Some((r * r - x * x).max(0.0).sqrt())
            }
            ShapeParams::Unfit => None,
        }
    }

    /// Volume enclosed between the segment start and height `x` above it.
    pub fn volume_at(&self, x: f64) -> Option<f64> {
        let x = x.max(0.0);
        match *self {
            ShapeParams::Cylinder { radius } => Some(cylinder_volume(radius, x)),
            ShapeParams::Frustum {
                r_bottom,
                r_top,
                height,
            } => Some(frustum_volume(r_bottom, r_top, height, x)),
            ShapeParams::Cone {
                r_base,
                height,
                apex_offset,
            } => Some(cone_volume(r_base, height, apex_offset, x)),
            ShapeParams::SphereCap { sphere_radius } => Some(sphere_cap_volume(sphere_radius, x)),
            ShapeParams::Hemisphere { radius } => Some(hemisphere_volume(radius, x)),
            ShapeParams::Unfit => None,
        }
    }
}

#[inline]
pub fn cylinder_volume(r: f64, x: f64) -> f64 {
    PI * r * r * x
}

/// Frustum of total height `span`, truncated at `x`.
#[inline]
pub fn frustum_volume(r1: f64, r2: f64, span: f64, x: f64) -> f64 {
    if span <= 0.0 {
        return cylinder_volume(r1, x);
    }
    let x = x.min(span);
    let rx = r1 + (r2 - r1) * x / span;
    PI * x / 3.0 * (r1 * r1 + r1 * rx + rx * rx)
}

/// Cone of height `height` with its apex at `x = apex` and base radius `r`,
/// counted from `x = 0`. Only the part above `x = 0` holds volume.
#[inline]
pub fn cone_volume(r: f64, height: f64, apex: f64, x: f64) -> f64 {
    if height <= 0.0 {
        return 0.0;
    }
    let filled = |x: f64| (x.min(apex + height) - apex).max(0.0).powi(3);
    PI * r * r * (filled(x) - filled(0.0)) / (3.0 * height * height)
}

/// Spherical cap of height `x` cut from a sphere of radius `r`.
#[inline]
pub fn sphere_cap_volume(r: f64, x: f64) -> f64 {
    let x = x.min(2.0 * r);
    PI * x * x * (3.0 * r - x) / 3.0
}

/// Slice of a dome between its equator (`x = 0`) and height `x`.
#[inline]
pub fn hemisphere_volume(r: f64, x: f64) -> f64 {
    let x = x.min(r);
    PI * (r * r * x - x * x * x / 3.0)
}

/// Contiguous index range of the profile with its fitted primitive.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub start_idx: usize,
    pub end_idx: usize,
    pub shape: ShapeKind,
    pub params: ShapeParams,
    /// Mean absolute volume residual relative to the measured volume at the
    /// segment's last sample. `NaN` for unfit segments.
    pub fit_error: f64,
    pub low_confidence: bool,
}

impl Segment {
    pub fn new(start_idx: usize, end_idx: usize, params: ShapeParams, fit_error: f64) -> Self {
        Self {
            start_idx,
            end_idx,
            shape: params.kind(),
            params,
            fit_error,
            low_confidence: false,
        }
    }

    pub fn unfit(start_idx: usize, end_idx: usize) -> Self {
        Self::new(start_idx, end_idx, ShapeParams::Unfit, f64::NAN)
    }

    pub fn len(&self) -> usize {
        self.end_idx + 1 - self.start_idx
    }

    pub fn is_empty(&self) -> bool {
        self.end_idx < self.start_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn closed_form_volumes_agree_at_limits() {
        // A frustum with equal radii is a cylinder.
        assert_relative_eq!(
            frustum_volume(3.0, 3.0, 10.0, 7.0),
            cylinder_volume(3.0, 7.0),
            epsilon = 1e-9
        );
        // A frustum starting from zero radius is a cone.
        assert_relative_eq!(
            frustum_volume(0.0, 4.0, 8.0, 5.0),
            cone_volume(4.0, 8.0, 0.0, 5.0),
            epsilon = 1e-9
        );
        // A cone whose apex lies below the segment is the frustum above it.
        assert_relative_eq!(
            cone_volume(4.0, 8.0, -2.0, 5.0),
            frustum_volume(1.0, 4.0, 6.0, 5.0),
            epsilon = 1e-9
        );
        // Half a sphere either way.
        let half = 2.0 / 3.0 * PI * 125.0;
        assert_relative_eq!(sphere_cap_volume(5.0, 5.0), half, epsilon = 1e-9);
        assert_relative_eq!(hemisphere_volume(5.0, 5.0), half, epsilon = 1e-9);
        assert_relative_eq!(hemisphere_volume(5.0, 9.0), half, epsilon = 1e-9);
    }

    #[test]
    fn radius_profiles_follow_geometry() {
        let cap = ShapeParams::SphereCap { sphere_radius: 10.0 };
        assert_relative_eq!(cap.radius_at(10.0).unwrap_or(0.0), 10.0);
        let dome = ShapeParams::Hemisphere { radius: 10.0 };
        assert_relative_eq!(dome.radius_at(0.0).unwrap_or(0.0), 10.0);
        assert_relative_eq!(dome.radius_at(10.0).unwrap_or(1.0), 0.0);
        assert!(ShapeParams::Unfit.radius_at(1.0).is_none());
        let cone = ShapeParams::Cone {
            r_base: 4.0,
            height: 8.0,
            apex_offset: 2.0,
        };
        assert_relative_eq!(cone.radius_at(1.0).unwrap_or(1.0), 0.0);
        assert_relative_eq!(cone.radius_at(6.0).unwrap_or(0.0), 2.0);
        assert_relative_eq!(cone.radius_at(10.0).unwrap_or(0.0), 4.0);
        assert_relative_eq!(cone.volume_at(2.0).unwrap_or(1.0), 0.0);
    }
}
