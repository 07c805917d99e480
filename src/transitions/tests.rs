use super::*;
use crate::params::DensityCategory;
use crate::profile::ProfileOptions;
use std::f64::consts::PI;

fn build(heights: &[f64], volumes: &[f64]) -> (AreaProfile, CurvatureProfile) {
    let profile =
        AreaProfile::build(heights, volumes, &ProfileOptions::default()).expect("valid profile");
    let signals = CurvatureProfile::from_profile(&profile);
    (profile, signals)
}

fn params_for(profile: &AreaProfile, diameter: f64) -> AdaptiveParams {
    let snr = estimate_snr(profile.areas());
    AdaptiveParams::select(diameter).with_snr_band(snr.band, DensityCategory::from_diameter(diameter))
}

#[test]
fn boundaries_are_normalised() {
    assert_eq!(boundaries(&[], 50), vec![0, 49]);
    assert_eq!(boundaries(&[30, 10, 30, 0, 49, 70], 50), vec![0, 10, 30, 49]);
}

#[test]
fn cylinder_has_no_interior_transition() {
    let heights: Vec<f64> = (1..=50).map(|i| i as f64).collect();
    let volumes: Vec<f64> = heights.iter().map(|h| PI * 25.0 * h).collect();
    let (profile, signals) = build(&heights, &volumes);
    let params = params_for(&profile, 10.0);
    let outcome = detect_transitions(&profile, &signals, &params);
    assert_eq!(outcome.transitions, vec![0, 49]);
    assert!(!outcome.too_short);
}

#[test]
fn cone_to_cylinder_kink_is_found() {
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
    let (profile, signals) = build(&heights, &volumes);
    let params = params_for(&profile, 10.0);
    let outcome = detect_transitions(&profile, &signals, &params);
    assert_eq!(
        outcome.transitions.len(),
        3,
        "expected one interior boundary, got {:?} (counts {:?})",
        outcome.transitions,
        outcome.counts
    );
    let kink = outcome.transitions[1];
    assert!((36..=44).contains(&kink), "kink detected at {kink}");
}

#[test]
fn short_profile_is_a_single_segment() {
    let heights: Vec<f64> = (0..15).map(|i| i as f64).collect();
    let volumes: Vec<f64> = heights.iter().map(|h| 3.0 * h + h * h).collect();
    let (profile, signals) = build(&heights, &volumes);
    let outcome = detect_transitions(&profile, &signals, &AdaptiveParams::select(5.0));
    assert!(outcome.too_short);
    assert_eq!(outcome.transitions, vec![0, 14]);
}

#[test]
fn transitions_respect_spacing() {
    // Three stacked cylinders with clear steps in radius.
    let radii = [3.0, 6.0, 4.0];
    let heights: Vec<f64> = (0..150).map(|i| i as f64 * 0.5).collect();
    let mut volumes = Vec::with_capacity(heights.len());
    let mut v = 0.0;
    for (i, _) in heights.iter().enumerate() {
        let r: f64 = radii[(i / 50).min(2)];
        if i > 0 {
            v += PI * r * r * 0.5;
        }
        volumes.push(v);
    }
    let (profile, signals) = build(&heights, &volumes);
    let params = params_for(&profile, 8.0);
    let outcome = detect_transitions(&profile, &signals, &params);
    let t = &outcome.transitions;
    assert_eq!(t[0], 0);
    assert_eq!(*t.last().unwrap_or(&0), 149);
    for w in t.windows(2) {
        assert!(w[1] > w[0]);
    }
    for &inner in &t[1..t.len() - 1] {
        assert!(inner >= outcome.min_spacing && inner + outcome.min_spacing <= 149);
    }
}
