//! Initial Hubbard-Stratonovich field

use crate::rng::RngState;

/// `L × N` auxiliary field stored slice-major, values in `{0, 1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HsField {
    pub slices: usize,
    pub sites: usize,
    pub values: Vec<i32>,
}

impl HsField {
    /// Draw one field value per (slice, site), slice-major, from the top
    /// bit of successive draws. `rng` is left advanced past the draws.
    pub fn draw(rng: &mut RngState, slices: usize, sites: usize) -> Self {
        let values = (0..slices * sites)
            .map(|_| rng.next_bit() as i32)
            .collect();
        Self {
            slices,
            sites,
            values,
        }
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.slices, self.sites]
    }
}
