//! Representative container diameter from the top of the area profile.

use crate::stats::{mean, median};
use std::f64::consts::PI;

/// Estimates the container diameter (mm) from its area sequence.
///
/// Uses the median of the uppermost tenth of the profile, where most
/// containers reach their working diameter, converted through
/// `d = 2 sqrt(A / π)`. Profiles shorter than ten samples fall back to the
/// mean of all areas; an empty profile yields `0.0`.
pub fn estimate_diameter(areas: &[f64]) -> f64 {
    let top = areas.len() / 10;
    let area = if top > 0 {
        median(&areas[areas.len() - top..])
    } else {
        mean(areas)
    };
    2.0 * (area.max(0.0) / PI).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cylinder_profile_gives_its_diameter() {
        let areas = vec![PI * 25.0; 40];
        assert_relative_eq!(estimate_diameter(&areas), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn uses_upper_tenth_only() {
        let mut areas = vec![1.0; 90];
        areas.extend(std::iter::repeat(PI * 36.0).take(10));
        assert_relative_eq!(estimate_diameter(&areas), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn short_and_empty_profiles_degrade() {
        let areas = [PI, PI, PI];
        assert_relative_eq!(estimate_diameter(&areas), 2.0, epsilon = 1e-9);
        assert_eq!(estimate_diameter(&[]), 0.0);
    }
}
