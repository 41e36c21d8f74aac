//! Error types for the hubbard crate.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LatticeError {
    #[error("restricted bond-triple classes are only defined without diagonal bonds (bps = 2, got {bps})")]
    RestrictedTriplesWithDiagonalBonds { bps: usize },

    #[error("invalid lattice parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, LatticeError>;
