use super::*;
use crate::curvature::CurvatureProfile;
use crate::profile::{AreaProfile, ProfileOptions};
use crate::types::{ShapeKind, ShapeParams};
use std::f64::consts::PI;

fn model_fit(model: ShapeModel, params: ShapeParams, error: f64) -> ModelFit {
    ModelFit {
        model,
        fit: ShapeFit {
            params,
            error,
            sse: error * error,
        },
    }
}

#[test]
fn partition_covers_every_sample_once() {
    assert_eq!(partition(&[0, 99], 100), vec![(0, 99)]);
    assert_eq!(
        partition(&[0, 40, 70, 99], 100),
        vec![(0, 39), (40, 69), (70, 99)]
    );
    // Missing end points are restored.
    assert_eq!(partition(&[40], 100), vec![(0, 39), (40, 99)]);
    assert_eq!(partition(&[], 5), vec![(0, 4)]);
}

#[test]
fn complexity_penalty_keeps_simple_model() {
    let fits = [
        model_fit(ShapeModel::Cylinder, ShapeParams::Cylinder { radius: 5.0 }, 0.004),
        model_fit(
            ShapeModel::Frustum,
            ShapeParams::Frustum {
                r_bottom: 4.0,
                r_top: 6.0,
                height: 10.0,
            },
            0.002,
        ),
    ];
    let chosen = choose_model(&fits, ShapeSignature::None).expect("a fit is chosen");
    assert_eq!(chosen.params.kind(), ShapeKind::Cylinder);
}

#[test]
fn near_cylindrical_frustum_yields_to_cylinder() {
    let frustum = ShapeParams::Frustum {
        r_bottom: 5.0,
        r_top: 5.1,
        height: 10.0,
    };
    let fits = [
        model_fit(ShapeModel::Cylinder, ShapeParams::Cylinder { radius: 5.05 }, 0.11),
        model_fit(ShapeModel::Frustum, frustum, 0.10),
    ];
    let chosen = choose_model(&fits, ShapeSignature::None).expect("a fit is chosen");
    assert_eq!(chosen.params, ShapeParams::Cylinder { radius: 5.05 });

    // Without a cylinder candidate the frustum collapses into one.
    let chosen = choose_model(&fits[1..], ShapeSignature::None).expect("a fit is chosen");
    match chosen.params {
        ShapeParams::Cylinder { radius } => assert!((radius - 5.05).abs() < 1e-12),
        other => panic!("expected collapsed cylinder, got {other:?}"),
    }
}

#[test]
fn flagged_curved_model_wins_when_close() {
    let fits = [
        model_fit(
            ShapeModel::Frustum,
            ShapeParams::Frustum {
                r_bottom: 1.0,
                r_top: 9.0,
                height: 10.0,
            },
            0.040,
        ),
        model_fit(
            ShapeModel::SphereCap,
            ShapeParams::SphereCap { sphere_radius: 10.0 },
            0.048,
        ),
    ];
    let flagged = choose_model(&fits, ShapeSignature::SphereCap).expect("a fit is chosen");
    assert_eq!(flagged.params.kind(), ShapeKind::SphereCap);
    let plain = choose_model(&fits, ShapeSignature::None).expect("a fit is chosen");
    assert_eq!(plain.params.kind(), ShapeKind::Frustum);
}

#[test]
fn no_fits_means_no_choice() {
    assert!(choose_model(&[], ShapeSignature::None).is_none());
}

#[test]
fn fitter_recognises_cone_and_cylinder_ranges() {
    // Cone from the apex up to h = 20, then a cylinder of radius 5.
    let k = PI * 25.0 / 400.0;
    let heights: Vec<f64> = (0..=100).map(|i| i as f64 * 0.5).collect();
    let volumes: Vec<f64> = heights
        .iter()
        .map(|&h| {
            if h <= 20.0 {
                k * h * h * h / 3.0
            } else {
                k * 8000.0 / 3.0 + PI * 25.0 * (h - 20.0)
            }
        })
        .collect();
    let profile =
        AreaProfile::build(&heights, &volumes, &ProfileOptions::default()).expect("valid profile");
    let signals = CurvatureProfile::from_profile(&profile);
    let fitter = SegmentFitter::new(&profile, &signals, FitterOptions::default());

    let segments = fitter.fit_partition(&[0, 40, 100]);
    assert_eq!(segments.len(), 2);
    assert!(
        matches!(segments[0].shape, ShapeKind::Cone | ShapeKind::Frustum),
        "bottom should be conical, got {:?}",
        segments[0]
    );
    assert_eq!(segments[1].shape, ShapeKind::Cylinder);
    match segments[1].params {
        ShapeParams::Cylinder { radius } => assert!((radius - 5.0).abs() < 0.05),
        other => panic!("unexpected params {other:?}"),
    }
    assert!(segments.iter().all(|s| s.fit_error < 0.05));
}
