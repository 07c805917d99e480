//! Numerical smoothing and differentiation kernels for 1D profiles.

use crate::stats::{linear_fit, make_odd};
use nalgebra::{DMatrix, DVector};

/// Least-squares polynomial coefficients (ascending powers) through `(xs, ys)`.
pub fn polyfit(xs: &[f64], ys: &[f64], order: usize) -> Option<DVector<f64>> {
    let n = xs.len().min(ys.len());
    if n <= order {
        return None;
    }
    let a = DMatrix::from_fn(n, order + 1, |r, c| xs[r].powi(c as i32));
    let y = DVector::from_column_slice(&ys[..n]);
    let ata = a.transpose() * &a;
    let aty = a.transpose() * y;
    ata.lu().solve(&aty)
}

/// Evaluates ascending-power coefficients at `x` (Horner).
#[inline]
pub fn polyval(coeffs: &DVector<f64>, x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Savitzky–Golay smoothing on sample indices.
///
/// Interior points use the centred convolution kernel; the first and last
/// half-windows are replaced by the polynomial fitted to the first and last
/// full windows. The window is shrunk to the largest odd length that fits the
/// data; signals too short for the polynomial order are returned unchanged.
pub fn savgol_smooth(values: &[f64], window: usize, order: usize) -> Vec<f64> {
    let n = values.len();
    let max_odd = if n % 2 == 1 { n } else { n.saturating_sub(1) };
    let w = make_odd(window).min(max_odd);
    if w <= order || w < 3 {
        return values.to_vec();
    }
    let half = w / 2;
    let offsets: Vec<f64> = (0..w).map(|k| k as f64 - half as f64).collect();
    let Some(kernel) = savgol_kernel(&offsets, order) else {
        return values.to_vec();
    };

    let mut out = values.to_vec();
    for i in half..n - half {
        out[i] = kernel
            .iter()
            .zip(&values[i - half..=i + half])
            .map(|(k, v)| k * v)
            .sum();
    }

    let local: Vec<f64> = (0..w).map(|k| k as f64).collect();
    if let Some(head) = polyfit(&local, &values[..w], order) {
        for (i, slot) in out.iter_mut().enumerate().take(half) {
            *slot = polyval(&head, i as f64);
        }
    }
    if let Some(tail) = polyfit(&local, &values[n - w..], order) {
        for k in (w - half)..w {
            out[n - w + k] = polyval(&tail, k as f64);
        }
    }
    out
}

fn savgol_kernel(offsets: &[f64], order: usize) -> Option<Vec<f64>> {
    let a = DMatrix::from_fn(offsets.len(), order + 1, |r, c| offsets[r].powi(c as i32));
    let inv = (a.transpose() * &a).try_inverse()?;
    // Row 0 of (AᵀA)⁻¹Aᵀ evaluates the fitted polynomial at offset 0.
    Some(
        (0..offsets.len())
            .map(|k| (0..=order).map(|j| inv[(0, j)] * a[(k, j)]).sum::<f64>())
            .collect(),
    )
}

/// Derivative of `values` with respect to non-uniform abscissae `xs`.
///
/// Second-order accurate central differences in the interior, first-order
/// one-sided differences at both ends.
pub fn gradient(values: &[f64], xs: &[f64]) -> Vec<f64> {
    let n = values.len().min(xs.len());
    if n < 2 {
        return vec![0.0; n];
    }
    let mut out = vec![0.0; n];
    out[0] = (values[1] - values[0]) / (xs[1] - xs[0]);
    out[n - 1] = (values[n - 1] - values[n - 2]) / (xs[n - 1] - xs[n - 2]);
    for i in 1..n - 1 {
        let hl = xs[i] - xs[i - 1];
        let hr = xs[i + 1] - xs[i];
        out[i] = (hl * hl * values[i + 1] - hr * hr * values[i - 1]
            + (hr * hr - hl * hl) * values[i])
            / (hl * hr * (hl + hr));
    }
    out
}

/// Slope of a sliding least-squares line `y = a x + b`, truncated at the ends.
pub fn local_slopes(xs: &[f64], ys: &[f64], window: usize) -> Vec<f64> {
    let n = xs.len().min(ys.len());
    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            linear_fit(&xs[lo..=hi], &ys[lo..=hi])
                .map(|(slope, _)| slope)
                .unwrap_or(0.0)
        })
        .collect()
}

/// Size-3 running median; end points are kept as-is.
pub fn median_filter3(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut out = values.to_vec();
    for i in 1..n.saturating_sub(1) {
        let (a, b, c) = (values[i - 1], values[i], values[i + 1]);
        out[i] = a.max(b).min(a.min(b).max(c));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn savgol_preserves_quadratics_everywhere() {
        let xs: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x * x - 3.0 * x + 2.0).collect();
        let smoothed = savgol_smooth(&ys, 7, 2);
        for (a, b) in smoothed.iter().zip(&ys) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8, max_relative = 1e-9);
        }
    }

    #[test]
    fn savgol_returns_short_input_unchanged() {
        let ys = [1.0, 5.0];
        assert_eq!(savgol_smooth(&ys, 5, 2), ys.to_vec());
    }

    #[test]
    fn gradient_is_exact_for_quadratic_on_uneven_grid() {
        let xs = [0.0, 0.5, 1.5, 1.75, 3.0, 4.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();
        let g = gradient(&ys, &xs);
        for i in 1..xs.len() - 1 {
            assert_relative_eq!(g[i], 2.0 * xs[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn median_filter_removes_single_spike() {
        let v = [1.0, 1.0, 9.0, 1.0, 1.0];
        assert_eq!(median_filter3(&v), vec![1.0; 5]);
    }

    #[test]
    fn local_slopes_recover_linear_rate() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 78.5 * x + 10.0).collect();
        for s in local_slopes(&xs, &ys, 5) {
            assert_relative_eq!(s, 78.5, epsilon = 1e-9);
        }
    }
}
