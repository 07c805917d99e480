use super::*;
use approx::assert_relative_eq;
use std::f64::consts::PI;

fn cylinder_samples(radius: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
    let heights: Vec<f64> = (1..=n).map(|i| i as f64).collect();
    let volumes = heights.iter().map(|h| PI * radius * radius * h).collect();
    (heights, volumes)
}

#[test]
fn cylinder_area_is_constant() {
    let (h, v) = cylinder_samples(5.0, 50);
    let profile = AreaProfile::build(&h, &v, &ProfileOptions::default()).expect("valid profile");
    assert_eq!(profile.len(), 50);
    assert_eq!(profile.regression_window(), 5);
    for a in profile.areas() {
        assert_relative_eq!(*a, PI * 25.0, max_relative = 1e-9);
    }
}

#[test]
fn legacy_differences_keep_length() {
    let (h, v) = cylinder_samples(2.0, 12);
    let opts = ProfileOptions {
        use_local_regression: false,
        ..Default::default()
    };
    let profile = AreaProfile::build(&h, &v, &opts).expect("valid profile");
    assert_eq!(profile.areas().len(), 12);
    assert_relative_eq!(profile.areas()[0], PI * 4.0, max_relative = 1e-9);
}

#[test]
fn flat_volume_is_floored() {
    let h: Vec<f64> = (0..20).map(|i| i as f64).collect();
    let mut v = vec![0.0; 20];
    for (i, slot) in v.iter_mut().enumerate().skip(10) {
        *slot = (i - 9) as f64 * 10.0;
    }
    let profile = AreaProfile::build(&h, &v, &ProfileOptions::default()).expect("valid profile");
    assert!(profile.areas()[..5].iter().all(|&a| a == MIN_AREA));
}

#[test]
fn validation_rejects_bad_samples() {
    let opts = ProfileOptions::default();
    assert_eq!(
        AreaProfile::build(&[1.0, 2.0], &[1.0], &opts).unwrap_err(),
        ProfileError::LengthMismatch {
            heights: 2,
            volumes: 1
        }
    );
    assert_eq!(
        AreaProfile::build(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], &opts).unwrap_err(),
        ProfileError::InsufficientData {
            required: 5,
            actual: 3
        }
    );
    let h = [0.0, 1.0, 1.0, 2.0, 3.0];
    let v = [0.0, 1.0, 2.0, 3.0, 4.0];
    assert_eq!(
        AreaProfile::build(&h, &v, &opts).unwrap_err(),
        ProfileError::NonMonotonicHeight { index: 2 }
    );
    let h = [0.0, 1.0, 2.0, 3.0, 4.0];
    let v = [0.0, 2.0, 1.0, 3.0, 4.0];
    assert_eq!(
        AreaProfile::build(&h, &v, &opts).unwrap_err(),
        ProfileError::DecreasingVolume { index: 2 }
    );
    let v = [0.0, 1.0, f64::NAN, 3.0, 4.0];
    assert_eq!(
        AreaProfile::build(&h, &v, &opts).unwrap_err(),
        ProfileError::NonFinite {
            field: "volume",
            index: 2
        }
    );
    assert_eq!(
        AreaProfile::build(&h, &[7.0; 5], &opts).unwrap_err(),
        ProfileError::DegenerateVolume
    );
}
