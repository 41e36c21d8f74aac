//! Input/Output operations for simulation files
//!
//! This module handles the on-disk container and logging setup.

mod container;
mod output;

pub use container::{Container, Data, Dataset, Group};
pub use output::setup_output;
