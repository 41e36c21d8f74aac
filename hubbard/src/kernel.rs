//! Imaginary-time integral kernel from cubic-spline quadrature
//!
//! Integrating a not-a-knot cubic spline through `n` equally spaced nodes
//! is linear in the node values, so the integral is a weight vector `w`
//! with `∫ s = Σ w_k y_k`. The kernel stacks, for every time slice `l`,
//! the weights of the two sub-integrals `[0, l]` and `[l, L]`.

use crate::error::{LatticeError, Result};
use nalgebra::{DMatrix, DVector};

/// Quadrature weights of the not-a-knot cubic spline through the nodes
/// `0, 1, .., n - 1`, integrated over `[0, n - 1]`.
///
/// Two nodes give the trapezoid rule and three the interpolating parabola
/// (Simpson), where not-a-knot degenerates.
pub fn spline_integral_weights(n: usize) -> Vec<f64> {
    match n {
        0 | 1 => vec![0.0; n],
        2 => vec![0.5, 0.5],
        3 => vec![1.0 / 3.0, 4.0 / 3.0, 1.0 / 3.0],
        _ => not_a_knot_weights(n),
    }
}

/// Slopes `s = A^{-1} B y` of the spline through `y` on a unit grid; the
/// integral of the Hermite cubic on each cell is
/// `(y_i + y_{i+1}) / 2 + (s_i - s_{i+1}) / 12`, which telescopes to the
/// trapezoid rule plus `(s_0 - s_{n-1}) / 12`.
fn not_a_knot_weights(n: usize) -> Vec<f64> {
    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut b = DMatrix::<f64>::zeros(n, n);

    // third derivative continuous across node 1
    a[(0, 0)] = 1.0;
    a[(0, 1)] = 2.0;
    b[(0, 0)] = -2.5;
    b[(0, 1)] = 2.0;
    b[(0, 2)] = 0.5;

    // second derivative continuous across interior nodes
    for i in 1..n - 1 {
        a[(i, i - 1)] = 1.0;
        a[(i, i)] = 4.0;
        a[(i, i + 1)] = 1.0;
        b[(i, i - 1)] = -3.0;
        b[(i, i + 1)] = 3.0;
    }

    // third derivative continuous across node n - 2
    a[(n - 1, n - 2)] = 2.0;
    a[(n - 1, n - 1)] = 1.0;
    b[(n - 1, n - 3)] = -0.5;
    b[(n - 1, n - 2)] = -2.0;
    b[(n - 1, n - 1)] = 2.5;

    let slopes = a
        .lu()
        .solve(&b)
        .expect("not-a-knot system is nonsingular for n >= 4");
    let correction: DVector<f64> = (slopes.row(0) - slopes.row(n - 1)).transpose() / 12.0;

    (0..n)
        .map(|k| {
            let trapezoid = if k == 0 || k == n - 1 { 0.5 } else { 1.0 };
            trapezoid + correction[k]
        })
        .collect()
}

/// `L × (L + 2)` kernel.
///
/// Row 0 is a leading zero followed by the weights of the whole interval
/// `[0, L]`. Row `l` (`1 <= l < L`) concatenates the weights of `[0, l]`
/// (`l + 1` nodes) and `[l, L]` (`L - l + 1` nodes).
pub fn integral_kernel(l: usize) -> Result<DMatrix<f64>> {
    if l == 0 {
        return Err(LatticeError::InvalidParameter(
            "integral kernel needs at least one time slice".to_string(),
        ));
    }

    let width = l + 2;
    let mut kernel = DMatrix::<f64>::zeros(l, width);
    for (k, w) in spline_integral_weights(l + 1).into_iter().enumerate() {
        kernel[(0, k + 1)] = w;
    }
    for row in 1..l {
        let prefix = spline_integral_weights(row + 1);
        let suffix = spline_integral_weights(l - row + 1);
        for (k, w) in prefix.into_iter().chain(suffix).enumerate() {
            kernel[(row, k)] = w;
        }
    }
    Ok(kernel)
}
