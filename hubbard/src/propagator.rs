//! Single-particle propagators of the Hubbard model
//!
//! Builds the nearest/diagonal-neighbour hopping matrix, dresses it with
//! Peierls phases for a uniform synthetic flux, and exponentiates it into
//! the imaginary-time propagators `exp(∓dt K)` and `exp(∓dt K / 2)`.
//! The on-site (interaction) propagator of the discrete Hubbard-Stratonovich
//! decoupling lives here as well.

use crate::error::{LatticeError, Result};
use crate::geometry::Lattice;
use crate::symmetry::ClassMap;
use nalgebra::{ComplexField, DMatrix};
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::debug;

/// Largest tolerated `|K - K^†|` entry.
pub const HERMITICITY_TOL: f64 = 1e-10;

/// Gauge choice for the vector potential; 0.5 is the symmetric gauge.
const GAUGE_ALPHA: f64 = 0.5;

/// Hopping amplitudes in units of the nearest-neighbour hopping `t = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoppingModel {
    /// diagonal hopping `t'`
    pub tp: f64,
    /// chemical potential
    pub mu: f64,
    /// flux quanta threading the torus
    pub nflux: i64,
}

/// Real hopping matrix `T[to, from]`, symmetric by construction.
///
/// Links are accumulated, so on lattices with a side of length 1 or 2 the
/// wrapped links are counted once per direction they are reached from.
pub fn hopping_matrix(lattice: &Lattice, tp: f64) -> DMatrix<f64> {
    let n = lattice.n();
    let mut t = DMatrix::<f64>::zeros(n, n);
    for iy in 0..lattice.ny {
        for ix in 0..lattice.nx {
            let i = lattice.site(ix, iy);
            let right = lattice.site(ix + 1, iy);
            let up = lattice.site(ix, iy + 1);
            let diag = lattice.site(ix + 1, iy + 1);

            t[(up, i)] += 1.0;
            t[(i, up)] += 1.0;
            t[(right, i)] += 1.0;
            t[(i, right)] += 1.0;

            t[(diag, i)] += tp;
            t[(i, diag)] += tp;
            t[(right, up)] += tp;
            t[(up, right)] += tp;
        }
    }
    t
}

/// Line integral of the vector potential along the straight path between
/// two sites, `phi[to, from]`, in units of the flux per plaquette.
///
/// For each displacement the shortest periodic image is used; on even sides
/// `-L/2` is preferred over `+L/2`.
pub fn peierls_phase(lattice: &Lattice) -> DMatrix<f64> {
    let n = lattice.n();
    let nx = lattice.nx as i64;
    let ny = lattice.ny as i64;
    let alpha = GAUGE_ALPHA;
    let beta = 1.0 - alpha;

    let mut phi = DMatrix::<f64>::zeros(n, n);
    for dy in (1 - ny).div_euclid(2)..(1 + ny).div_euclid(2) {
        for dx in (1 - nx).div_euclid(2)..(1 + nx).div_euclid(2) {
            for iy in 0..ny {
                for ix in 0..nx {
                    let jy = iy + dy;
                    let jjy = jy.rem_euclid(ny);
                    let oy = (jy - jjy) as f64;
                    let jx = ix + dx;
                    let jjx = jx.rem_euclid(nx);
                    let ox = (jx - jjx) as f64;
                    let mx = (ix + jx) as f64 / 2.0;
                    let my = (iy + jy) as f64 / 2.0;
                    let (dx, dy, jx, jy) = (dx as f64, dy as f64, jx as f64, jy as f64);

                    let to = (jjx + nx * jjy) as usize;
                    let from = (ix + nx * iy) as usize;
                    phi[(to, from)] = -alpha * my * dx + beta * mx * dy - beta * ox * jy
                        + alpha * oy * jx
                        - alpha * ox * oy;
                }
            }
        }
    }
    phi
}

/// `max |K - K^†|` over all entries.
pub fn hermiticity_error<T: ComplexField<RealField = f64>>(k: &DMatrix<T>) -> f64 {
    (k - k.adjoint())
        .iter()
        .map(|z| z.clone().modulus())
        .fold(0.0, f64::max)
}

/// `K` and its exponentials for one spin species.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagators<T: ComplexField> {
    pub k: DMatrix<T>,
    /// `exp(-dt K)`
    pub exp_k: DMatrix<T>,
    /// `exp(dt K)`
    pub inv_exp_k: DMatrix<T>,
    /// `exp(-dt K / 2)`
    pub exp_half_k: DMatrix<T>,
    /// `exp(dt K / 2)`
    pub inv_exp_half_k: DMatrix<T>,
}

impl<T: ComplexField<RealField = f64>> Propagators<T> {
    pub fn new(k: DMatrix<T>, dt: f64) -> Self {
        let scaled_exp = |s: f64| (&k * T::from_real(s)).exp();
        Self {
            exp_k: scaled_exp(-dt),
            inv_exp_k: scaled_exp(dt),
            exp_half_k: scaled_exp(-dt / 2.0),
            inv_exp_half_k: scaled_exp(dt / 2.0),
            k,
        }
    }
}

/// Peierls factors and propagators for both spin species.
///
/// The model is spin symmetric, so `up` and `down` hold identical values;
/// they are kept apart because the simulation reads them separately.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinPropagators<T: ComplexField> {
    pub peierls: DMatrix<T>,
    pub up: Propagators<T>,
    pub down: Propagators<T>,
}

impl<T: ComplexField<RealField = f64>> SpinPropagators<T> {
    /// Build `K = -T ⊙ peierls - mu I` and exponentiate it.
    ///
    /// Panics if `K` is not Hermitian.
    fn new(hopping: &DMatrix<f64>, peierls: DMatrix<T>, mu: f64, dt: f64) -> Self {
        let n = hopping.nrows();
        let mut k = hopping
            .map(|t| -T::from_real(t))
            .component_mul(&peierls);
        for i in 0..n {
            k[(i, i)] -= T::from_real(mu);
        }

        let err = hermiticity_error(&k);
        assert!(
            err < HERMITICITY_TOL,
            "dressed hopping matrix is not Hermitian: max|K - K^dagger| = {:e}",
            err
        );

        let up = Propagators::new(k, dt);
        let down = up.clone();
        Self { peierls, up, down }
    }
}

/// Hopping propagators, real when there is no flux and complex otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Hopping {
    Real(SpinPropagators<f64>),
    Complex(SpinPropagators<Complex64>),
}

impl Hopping {
    pub fn build(lattice: &Lattice, model: &HoppingModel, dt: f64) -> Self {
        let t = hopping_matrix(lattice, model.tp);
        let phi = peierls_phase(lattice);
        let scale = 2.0 * PI * model.nflux as f64 / lattice.n() as f64;
        let peierls = phi.map(|p| Complex64::from_polar(1.0, scale * p));

        if model.nflux != 0 {
            debug!("Building complex propagators for nflux = {}", model.nflux);
            Hopping::Complex(SpinPropagators::new(&t, peierls, model.mu, dt))
        } else {
            let max_im = peierls.iter().map(|z| z.im.abs()).fold(0.0, f64::max);
            assert!(
                max_im < HERMITICITY_TOL,
                "zero flux produced complex Peierls factors: {:e}",
                max_im
            );
            debug!("Building real propagators");
            Hopping::Real(SpinPropagators::new(&t, peierls.map(|z| z.re), model.mu, dt))
        }
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Hopping::Complex(_))
    }
}

/// Interaction propagator of the discrete Hubbard-Stratonovich field.
///
/// `lambda` solves `cosh(lambda) = exp(U dt / 2)`. Tables are `2 × N`,
/// indexed by field value and site.
#[derive(Debug, Clone, PartialEq)]
pub struct OnSite {
    /// `U` per site class
    pub u: Vec<f64>,
    /// rows `(exp(-lambda), exp(lambda))`
    pub exp_lambda: DMatrix<f64>,
    /// rows `(exp(2 lambda) - 1, exp(-2 lambda) - 1)`
    pub del: DMatrix<f64>,
}

impl OnSite {
    pub fn new(u: f64, dt: f64, map_i: &ClassMap) -> Result<Self> {
        if u * dt < 0.0 {
            return Err(LatticeError::InvalidParameter(format!(
                "U * dt must be non-negative, got {}",
                u * dt
            )));
        }

        let u_i = vec![u; map_i.num_classes()];
        let exp_lmbd: Vec<f64> = u_i
            .iter()
            .map(|&u| (0.5 * u * dt).exp() + (u * dt).exp_m1().sqrt())
            .collect();

        let n = map_i.num_tuples();
        let per_site = |i: usize| exp_lmbd[map_i.map[i] as usize];
        let exp_lambda = DMatrix::from_fn(2, n, |r, i| {
            let x = per_site(i);
            if r == 0 {
                1.0 / x
            } else {
                x
            }
        });
        let del = DMatrix::from_fn(2, n, |r, i| {
            let x = per_site(i);
            if r == 0 {
                x * x - 1.0
            } else {
                x.powi(-2) - 1.0
            }
        });

        Ok(Self {
            u: u_i,
            exp_lambda,
            del,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::{Observable, SymmetryMapBuilder};
    use approx::assert_relative_eq;

    fn model(tp: f64, mu: f64, nflux: i64) -> HoppingModel {
        HoppingModel { tp, mu, nflux }
    }

    #[test]
    fn test_hopping_matrix_coordination() {
        let lat = Lattice::new(4, 4, true);
        let t = hopping_matrix(&lat, 0.3);
        assert_relative_eq!(t.clone(), t.transpose());
        for i in 0..lat.n() {
            assert_relative_eq!(t.row(i).sum(), 4.0 + 4.0 * 0.3, epsilon = 1e-12);
            assert_eq!(t[(i, i)], 0.0);
        }
        assert_eq!(t[(lat.site(1, 0), 0)], 1.0);
        assert_eq!(t[(lat.site(3, 0), 0)], 1.0);
        assert_eq!(t[(lat.site(1, 1), 0)], 0.3);
        assert_eq!(t[(lat.site(2, 0), 0)], 0.0);
    }

    #[test]
    fn test_hopping_matrix_double_counts_two_site_ring() {
        let lat = Lattice::new(2, 1, false);
        let t = hopping_matrix(&lat, 0.0);
        // the +x and -x neighbours coincide; the +y link closes on itself
        assert_eq!(t[(1, 0)], 2.0);
        assert_eq!(t[(0, 0)], 2.0);
    }

    #[test]
    fn test_peierls_phase_plaquette_flux() {
        for (nx, ny) in [(4, 4), (3, 5), (5, 3), (6, 4)] {
            let lat = Lattice::new(nx, ny, false);
            let n = lat.n() as f64;
            let phi = peierls_phase(&lat);
            for y in 0..ny {
                for x in 0..nx {
                    let i = lat.site(x, y);
                    let r = lat.site(x + 1, y);
                    let d = lat.site(x + 1, y + 1);
                    let u = lat.site(x, y + 1);
                    let loop_sum = phi[(r, i)] + phi[(d, r)] + phi[(u, d)] + phi[(i, u)];
                    assert_relative_eq!(loop_sum.rem_euclid(n), 1.0, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_peierls_phase_antisymmetric_on_links() {
        let lat = Lattice::new(4, 6, true);
        let n = lat.n() as f64;
        let phi = peierls_phase(&lat);
        for b in 0..lat.num_bonds() {
            let (i, j) = lat.bond(b);
            assert_eq!((phi[(i, j)] + phi[(j, i)]).rem_euclid(n), 0.0, "bond {}", b);
        }
    }

    #[test]
    fn test_zero_flux_is_real() {
        let lat = Lattice::new(4, 4, false);
        let hop = Hopping::build(&lat, &model(0.0, 0.5, 0), 0.1);
        let Hopping::Real(p) = hop else {
            panic!("expected real propagators");
        };
        assert!(p.peierls.iter().all(|&x| x == 1.0));
        assert_relative_eq!(p.up.k.clone(), p.up.k.transpose());
        for i in 0..lat.n() {
            assert_eq!(p.up.k[(i, i)], -0.5);
        }
        assert_eq!(p.up, p.down);
    }

    #[test]
    fn test_flux_is_hermitian() {
        for (nx, ny, nflux, tp) in [(4, 4, 1, 0.0), (4, 4, 3, -0.25), (6, 3, 2, 0.0), (5, 5, -1, 0.1)] {
            let lat = Lattice::new(nx, ny, tp != 0.0);
            let hop = Hopping::build(&lat, &model(tp, 0.2, nflux), 0.1);
            assert!(hop.is_complex());
            let Hopping::Complex(p) = hop else { unreachable!() };
            assert!(hermiticity_error(&p.up.k) < HERMITICITY_TOL);
            assert!(p.peierls.iter().any(|z| z.im.abs() > 1e-6));
        }
    }

    #[test]
    fn test_hermiticity_error_of_complex_matrix() {
        let i = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        let hermitian = DMatrix::from_row_slice(2, 2, &[one, i, -i, one]);
        assert_eq!(hermiticity_error(&hermitian), 0.0);

        let skewed = DMatrix::from_row_slice(2, 2, &[one, i, i, one]);
        assert_relative_eq!(hermiticity_error(&skewed), 2.0);
        assert_relative_eq!(
            hermiticity_error(&DMatrix::from_row_slice(1, 1, &[i])),
            2.0
        );
    }

    #[test]
    fn test_propagators_are_inverse_pairs() {
        let lat = Lattice::new(4, 4, false);
        let dt = 0.115;
        let eye = DMatrix::<f64>::identity(16, 16);

        let Hopping::Real(p) = Hopping::build(&lat, &model(0.0, -0.3, 0), dt) else {
            panic!("expected real propagators");
        };
        assert_relative_eq!(&p.up.exp_k * &p.up.inv_exp_k, eye, epsilon = 1e-10);
        assert_relative_eq!(&p.up.exp_half_k * &p.up.inv_exp_half_k, eye, epsilon = 1e-10);
        assert_relative_eq!(&p.up.exp_half_k * &p.up.exp_half_k, p.up.exp_k, epsilon = 1e-10);

        let Hopping::Complex(p) = Hopping::build(&lat, &model(0.0, 0.0, 2), dt) else {
            panic!("expected complex propagators");
        };
        let prod = &p.up.exp_k * &p.up.inv_exp_k;
        let prod_half = &p.up.exp_half_k * &p.up.inv_exp_half_k;
        for i in 0..16 {
            for j in 0..16 {
                let target = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(prod[(i, j)].re, target, epsilon = 1e-10);
                assert_relative_eq!(prod[(i, j)].im, 0.0, epsilon = 1e-10);
                assert_relative_eq!(prod_half[(i, j)].re, target, epsilon = 1e-10);
                assert_relative_eq!(prod_half[(i, j)].im, 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_on_site_lambda() {
        let lat = Lattice::new(4, 4, false);
        let map_i = SymmetryMapBuilder::new(&lat, true)
            .build(Observable::Site)
            .unwrap();
        let (u, dt) = (6.0, 0.115);
        let os = OnSite::new(u, dt, &map_i).unwrap();
        assert_eq!(os.u, vec![6.0]);
        assert_eq!(os.exp_lambda.shape(), (2, 16));

        let e = os.exp_lambda[(1, 0)];
        let lambda = e.ln();
        assert_relative_eq!(lambda.cosh(), (0.5 * u * dt).exp(), epsilon = 1e-12);
        for i in 0..16 {
            assert_relative_eq!(
                os.exp_lambda[(0, i)] * os.exp_lambda[(1, i)],
                1.0,
                max_relative = 1e-15
            );
            assert_relative_eq!(os.del[(0, i)], (2.0 * lambda).exp() - 1.0, epsilon = 1e-12);
            assert_relative_eq!(os.del[(1, i)], (-2.0 * lambda).exp() - 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_on_site_without_interaction() {
        let lat = Lattice::new(2, 2, false);
        let map_i = SymmetryMapBuilder::new(&lat, false)
            .build(Observable::Site)
            .unwrap();
        let os = OnSite::new(0.0, 0.1, &map_i).unwrap();
        assert_eq!(os.u.len(), 4);
        assert!(os.exp_lambda.iter().all(|&x| x == 1.0));
        assert!(os.del.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_on_site_rejects_negative_u() {
        let lat = Lattice::new(2, 2, false);
        let map_i = SymmetryMapBuilder::new(&lat, true)
            .build(Observable::Site)
            .unwrap();
        assert!(OnSite::new(-1.0, 0.1, &map_i).is_err());
    }
}
