//! Static inputs of a determinant quantum Monte Carlo simulation of the
//! single-band Hubbard model on a periodic rectangular lattice.

pub mod error;
pub mod field;
pub mod geometry;
pub mod kernel;
pub mod propagator;
pub mod rng;
pub mod symmetry;

pub use error::LatticeError;
pub use field::HsField;
pub use geometry::Lattice;
pub use kernel::integral_kernel;
pub use propagator::{Hopping, HoppingModel, OnSite, Propagators, SpinPropagators};
pub use rng::RngState;
pub use symmetry::{ClassMap, Observable, SymmetryMapBuilder, SymmetryMaps};
