//! Signal-to-noise estimate of an area profile.

use crate::params::SnrBand;
use crate::profile::smoothing::savgol_smooth;
use crate::stats::{make_odd, min_max, std_dev};
use serde::Serialize;

/// Added to the noise level so near-clean profiles stay finite.
const NOISE_EPS: f64 = 1e-8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SnrEstimate {
    /// `range / noise_std`; infinite for a noiseless profile.
    pub snr: f64,
    pub noise_std: f64,
    pub band: SnrBand,
}

/// Compares the area with a heavily smoothed copy of itself.
///
/// The residual against a wide quadratic Savitzky–Golay fit
/// (`min(21, n / 5)` samples, forced odd) is taken as noise.
pub fn estimate_snr(area: &[f64]) -> SnrEstimate {
    let window = make_odd((area.len() / 5).clamp(5, 21));
    let trend = savgol_smooth(area, window, 2);
    let noise: Vec<f64> = area.iter().zip(&trend).map(|(a, t)| a - t).collect();
    let noise_std = std_dev(&noise);
    let (lo, hi) = min_max(area);
    let range = hi - lo;
    let snr = if noise_std <= 1e-12 * hi.abs().max(lo.abs()).max(1.0) {
        f64::INFINITY
    } else {
        range / (noise_std + NOISE_EPS)
    };
    SnrEstimate {
        snr,
        noise_std,
        band: SnrBand::from_snr(snr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_profile_is_very_clean() {
        let area: Vec<f64> = (0..60).map(|i| 10.0 + 0.3 * i as f64).collect();
        let est = estimate_snr(&area);
        assert!(est.snr.is_infinite());
        assert_eq!(est.band, SnrBand::VeryClean);
    }

    #[test]
    fn alternating_noise_lowers_the_band() {
        let area: Vec<f64> = (0..60)
            .map(|i| 10.0 + 0.1 * i as f64 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let est = estimate_snr(&area);
        assert!(est.snr < 10.0, "snr={}", est.snr);
        assert_eq!(est.band, SnrBand::VeryNoisy);
    }
}
