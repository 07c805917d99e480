//! Synthetic container profiles with closed-form volumes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Heights `0, step, 2·step, …` up to and including `top`.
pub fn heights(step: f64, top: f64) -> Vec<f64> {
    let n = (top / step).round() as usize;
    (0..=n).map(|i| i as f64 * step).collect()
}

pub fn cylinder(radius: f64, heights: &[f64]) -> Vec<f64> {
    heights.iter().map(|h| PI * radius * radius * h).collect()
}

/// Cone with its apex at `h = 0` widening to `radius` at `cone_height`,
/// then a cylinder of the same radius.
pub fn cone_then_cylinder(radius: f64, cone_height: f64, heights: &[f64]) -> Vec<f64> {
    let k = PI * radius * radius / (cone_height * cone_height);
    let cone_volume = k * cone_height.powi(3) / 3.0;
    heights
        .iter()
        .map(|&h| {
            if h <= cone_height {
                k * h.powi(3) / 3.0
            } else {
                cone_volume + PI * radius * radius * (h - cone_height)
            }
        })
        .collect()
}

/// Cylinder of radius `r1` up to `h1`, then a frustum widening to `r2` over
/// `h2`.
pub fn cylinder_then_frustum(r1: f64, h1: f64, r2: f64, h2: f64, heights: &[f64]) -> Vec<f64> {
    let base = PI * r1 * r1 * h1;
    heights
        .iter()
        .map(|&h| {
            if h <= h1 {
                PI * r1 * r1 * h
            } else {
                let x = (h - h1).min(h2);
                let rx = r1 + (r2 - r1) * x / h2;
                base + PI * x / 3.0 * (r1 * r1 + r1 * rx + rx * rx)
            }
        })
        .collect()
}

/// Frustum from `r1` to `rc` over `h1`, a cylinder of radius `rc` over `h2`,
/// then a frustum from `rc` to `r3` over `h3`.
pub fn frustum_cylinder_frustum(
    (r1, h1): (f64, f64),
    (rc, h2): (f64, f64),
    (r3, h3): (f64, f64),
    heights: &[f64],
) -> Vec<f64> {
    let frustum = |a: f64, b: f64, span: f64, x: f64| {
        let rx = a + (b - a) * x / span;
        PI * x / 3.0 * (a * a + a * rx + rx * rx)
    };
    let lower = frustum(r1, rc, h1, h1);
    let middle = PI * rc * rc * h2;
    heights
        .iter()
        .map(|&h| {
            if h <= h1 {
                frustum(r1, rc, h1, h)
            } else if h <= h1 + h2 {
                lower + PI * rc * rc * (h - h1)
            } else {
                lower + middle + frustum(rc, r3, h3, (h - h1 - h2).min(h3))
            }
        })
        .collect()
}

/// Round bottom: a cap of a sphere of radius `r` growing from its pole.
pub fn sphere_cap(r: f64, heights: &[f64]) -> Vec<f64> {
    heights
        .iter()
        .map(|&h| PI * h * h * (3.0 * r - h) / 3.0)
        .collect()
}

/// Dome: a hemisphere of radius `r` filled from its equator.
pub fn dome(r: f64, heights: &[f64]) -> Vec<f64> {
    heights
        .iter()
        .map(|&h| PI * (r * r * h - h.powi(3) / 3.0))
        .collect()
}

/// Adds Gaussian noise with a standard deviation of `level · mean(volume)`
/// and restores monotonicity with a running maximum.
pub fn with_noise(volumes: &[f64], level: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mean = volumes.iter().sum::<f64>() / volumes.len().max(1) as f64;
    let sigma = level * mean;
    let mut running = f64::NEG_INFINITY;
    volumes
        .iter()
        .map(|&v| {
            // Box–Muller
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
            running = running.max(v + sigma * z);
            running
        })
        .collect()
}
