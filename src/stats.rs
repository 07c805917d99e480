//! Small statistics helpers shared by the profile stages.
//!
//! All helpers are total: empty or degenerate inputs return a neutral value
//! instead of panicking, so callers can feed them arbitrary slices of a
//! profile.

use std::cmp::Ordering;

#[inline]
fn cmp_f64(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (ddof = 0).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.max(0.0).sqrt()
}

/// Median of the slice; `0.0` when empty.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(cmp_f64);
    let m = sorted.len();
    if m % 2 == 1 {
        sorted[m / 2]
    } else {
        0.5 * (sorted[m / 2 - 1] + sorted[m / 2])
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is expressed in percent and clamped to `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(cmp_f64);
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Min-max normalisation into `[0, 1]`.
///
/// Returns zeros when the range is numerically flat relative to the
/// magnitude of the data, so floating-point jitter on a constant signal is
/// not amplified into full-scale noise.
pub fn normalize_min_max(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = min_max(values);
    let scale = lo.abs().max(hi.abs()).max(1e-12);
    let range = hi - lo;
    if !(range > 1e-8 * scale) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - lo) / range).collect()
}

/// Minimum and maximum of a slice, `(0, 0)` when empty.
pub fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Coefficient of variation `std / |mean|`; `0.0` for a zero-mean slice.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.abs() <= f64::EPSILON {
        return 0.0;
    }
    std_dev(values) / m.abs()
}

/// Pearson correlation between `values[..n-1]` and `values[1..]`.
///
/// Constant or too-short inputs have no defined correlation and yield `0.0`.
pub fn lag1_autocorrelation(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let a = &values[..values.len() - 1];
    let b = &values[1..];
    let (ma, mb) = (mean(a), mean(b));
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma) * (x - ma);
        vb += (y - mb) * (y - mb);
    }
    let denom = (va * vb).sqrt();
    let scale = ma.abs().max(mb.abs()).max(1.0);
    if denom <= 1e-12 * scale * scale {
        return 0.0;
    }
    cov / denom
}

/// Ordinary least-squares line `y = slope * x + intercept`.
///
/// Returns `None` when the abscissae are degenerate.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&xs[..n]);
    let my = mean(&ys[..n]);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        sxx += dx * dx;
        sxy += dx * (ys[i] - my);
    }
    if sxx <= f64::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Coefficient of determination of the least-squares line through the data.
///
/// A numerically constant response is perfectly described by a line and
/// scores `1.0`.
pub fn linear_r_squared(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 3 {
        return 0.0;
    }
    let my = mean(&ys[..n]);
    let ss_tot: f64 = ys[..n].iter().map(|y| (y - my) * (y - my)).sum();
    let scale = my.abs().max(1e-12);
    if ss_tot <= 1e-12 * scale * scale * n as f64 {
        return 1.0;
    }
    let Some((slope, intercept)) = linear_fit(&xs[..n], &ys[..n]) else {
        return 0.0;
    };
    let ss_res: f64 = (0..n)
        .map(|i| {
            let r = ys[i] - (slope * xs[i] + intercept);
            r * r
        })
        .sum();
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

/// Number of strict sign changes in a sequence, ignoring exact zeros.
pub fn sign_changes(values: &[f64]) -> usize {
    let mut last = 0.0f64;
    let mut changes = 0;
    for &v in values {
        if v == 0.0 || !v.is_finite() {
            continue;
        }
        if last != 0.0 && last.signum() != v.signum() {
            changes += 1;
        }
        last = v;
    }
    changes
}

/// Forces a window length to be odd by growing it by one when even.
#[inline]
pub fn make_odd(window: usize) -> usize {
    if window % 2 == 0 {
        window + 1
    } else {
        window
    }
}
