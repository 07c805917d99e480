//! Box-constrained Levenberg–Marquardt for small parameter vectors.
//!
//! Residuals are supplied as a closure; the Jacobian is estimated by forward
//! differences (stepping inward at an upper bound). Each trial step solves the
//! damped normal equations `(JᵀJ + λ diag(JᵀJ)) δ = −Jᵀr` and is projected back
//! onto the bounds. Accepted steps shrink the damping, rejected steps grow it.
//!
//! Convergence is declared when the relative cost reduction or the relative
//! step falls below tolerance, when the gradient vanishes, or when no descent
//! direction remains inside the box (damping saturates). Exhausting the
//! iteration budget without any of these is reported as non-convergence.

use nalgebra::{DMatrix, DVector};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

#[derive(Clone, Copy, Debug)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Relative cost reduction below which an accepted step ends the solve.
    pub ftol: f64,
    /// Relative parameter change below which an accepted step ends the solve.
    pub xtol: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Solution {
    pub params: Vec<f64>,
    /// Sum of squared residuals at `params`.
    pub cost: f64,
    pub iterations: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveFailure {
    NonFinite,
    NoConvergence { iterations: usize },
}

/// Minimises `‖residuals(p)‖²` subject to `lower ≤ p ≤ upper`.
pub fn solve_bounded<F>(
    residuals: F,
    init: &[f64],
    lower: &[f64],
    upper: &[f64],
    options: &SolverOptions,
) -> Result<Solution, SolveFailure>
where
    F: Fn(&[f64]) -> DVector<f64>,
{
    let k = init.len();
    let mut params: Vec<f64> = (0..k).map(|j| init[j].clamp(lower[j], upper[j])).collect();
    let mut r = residuals(&params);
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return Err(SolveFailure::NonFinite);
    }
    let mut lambda = LAMBDA_INIT;

    for iteration in 1..=options.max_iterations.max(1) {
        let jac = forward_jacobian(&residuals, &params, &r, upper);
        let jt = jac.transpose();
        let hessian = &jt * &jac;
        let grad = &jt * &r;
        if !grad.iter().all(|g| g.is_finite()) {
            return Err(SolveFailure::NonFinite);
        }
        if grad.norm() <= 1e-14 * (1.0 + cost) {
            return Ok(Solution {
                params,
                cost,
                iterations: iteration,
            });
        }

        let mut accepted = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = hessian.clone();
            for j in 0..k {
                damped[(j, j)] += lambda * hessian[(j, j)].max(1e-12);
            }
            let Some(delta) = damped.lu().solve(&(-&grad)) else {
                lambda *= 10.0;
                continue;
            };
            let trial: Vec<f64> = (0..k)
                .map(|j| (params[j] + delta[j]).clamp(lower[j], upper[j]))
                .collect();
            let trial_r = residuals(&trial);
            let trial_cost = trial_r.norm_squared();
            if trial_cost.is_finite() && trial_cost < cost {
                let reduction = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
                let step: f64 = (0..k)
                    .map(|j| {
                        let d = (trial[j] - params[j]) / (params[j].abs() + options.xtol);
                        d * d
                    })
                    .sum::<f64>()
                    .sqrt();
                params = trial;
                r = trial_r;
                cost = trial_cost;
                lambda = (lambda * 0.1).max(LAMBDA_MIN);
                if reduction < options.ftol || step < options.xtol {
                    return Ok(Solution {
                        params,
                        cost,
                        iterations: iteration,
                    });
                }
                accepted = true;
                break;
            }
            lambda *= 10.0;
        }

        if !accepted {
            // No descent direction left inside the box.
            return Ok(Solution {
                params,
                cost,
                iterations: iteration,
            });
        }
    }

    Err(SolveFailure::NoConvergence {
        iterations: options.max_iterations,
    })
}

fn forward_jacobian<F>(residuals: &F, params: &[f64], r0: &DVector<f64>, upper: &[f64]) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> DVector<f64>,
{
    let m = r0.len();
    let k = params.len();
    let mut jac = DMatrix::<f64>::zeros(m, k);
    let mut shifted = params.to_vec();
    for j in 0..k {
        let mut h = 1e-7 * params[j].abs().max(1e-3);
        if params[j] + h > upper[j] {
            h = -h;
        }
        shifted[j] = params[j] + h;
        let rj = residuals(&shifted);
        for i in 0..m {
            jac[(i, j)] = (rj[i] - r0[i]) / h;
        }
        shifted[j] = params[j];
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exponential_rate() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * (0.7 * x).exp()).collect();
        let residual = |p: &[f64]| {
            DVector::from_iterator(
                xs.len(),
                xs.iter().zip(&ys).map(|(x, y)| p[0] * (p[1] * x).exp() - y),
            )
        };
        let sol = solve_bounded(
            residual,
            &[1.0, 0.1],
            &[0.1, 0.0],
            &[10.0, 2.0],
            &SolverOptions::default(),
        )
        .expect("converges");
        assert_relative_eq!(sol.params[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(sol.params[1], 0.7, epsilon = 1e-5);
    }

    #[test]
    fn respects_bounds() {
        // Unconstrained optimum at 5, box ends at 2.
        let residual = |p: &[f64]| DVector::from_vec(vec![p[0] - 5.0]);
        let sol = solve_bounded(residual, &[1.0], &[0.0], &[2.0], &SolverOptions::default())
            .expect("stops at the bound");
        assert_relative_eq!(sol.params[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn non_finite_start_is_reported() {
        let residual = |_: &[f64]| DVector::from_vec(vec![f64::NAN]);
        let err = solve_bounded(residual, &[1.0], &[0.0], &[2.0], &SolverOptions::default())
            .unwrap_err();
        assert_eq!(err, SolveFailure::NonFinite);
    }
}
