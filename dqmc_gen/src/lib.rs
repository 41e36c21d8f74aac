//! Generation of input files for determinant quantum Monte Carlo
//! simulations of the Hubbard model.

pub mod app;
pub mod config;
pub mod io;
