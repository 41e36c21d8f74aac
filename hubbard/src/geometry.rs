//! Periodic rectangular lattice: sites, bonds and displacements
//!
//! Sites are numbered row-major, `i = x + nx * y`. Bonds are numbered
//! `b = i + n * species` where `i` is the anchor site and the species runs
//! over `+x`, `+y`, and (with diagonal hopping) `+x+y` and `+x-y`.

/// Direction of a bond relative to its anchor site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondSpecies {
    /// `(i, i + x)`
    X,
    /// `(i, i + y)`
    Y,
    /// `(i, i + x + y)`
    XPlusY,
    /// `(i + x, i + y)`
    XMinusY,
}

impl BondSpecies {
    fn from_index(s: usize) -> Self {
        match s {
            0 => BondSpecies::X,
            1 => BondSpecies::Y,
            2 => BondSpecies::XPlusY,
            3 => BondSpecies::XMinusY,
            _ => panic!("bond species {} out of range", s),
        }
    }
}

/// `nx × ny` sites on a torus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    pub nx: usize,
    pub ny: usize,
    /// Whether next-nearest-neighbour (diagonal) bonds are enumerated.
    pub diagonal: bool,
}

impl Lattice {
    pub fn new(nx: usize, ny: usize, diagonal: bool) -> Self {
        assert!(nx >= 1 && ny >= 1, "lattice must be at least 1x1");
        Self { nx, ny, diagonal }
    }

    /// Number of sites.
    pub fn n(&self) -> usize {
        self.nx * self.ny
    }

    /// Bonds per site.
    pub fn bps(&self) -> usize {
        if self.diagonal {
            4
        } else {
            2
        }
    }

    pub fn num_bonds(&self) -> usize {
        self.bps() * self.n()
    }

    pub fn site(&self, x: usize, y: usize) -> usize {
        (x % self.nx) + self.nx * (y % self.ny)
    }

    pub fn coords(&self, i: usize) -> (usize, usize) {
        (i % self.nx, i / self.nx)
    }

    /// Displacement from site `from` to site `to`, packed as `dx + nx * dy`
    /// with both components reduced onto the torus.
    pub fn displacement(&self, from: usize, to: usize) -> usize {
        let (fx, fy) = self.coords(from);
        let (tx, ty) = self.coords(to);
        let dx = (tx + self.nx - fx) % self.nx;
        let dy = (ty + self.ny - fy) % self.ny;
        dx + self.nx * dy
    }

    pub fn bond_anchor(&self, b: usize) -> usize {
        b % self.n()
    }

    pub fn bond_species(&self, b: usize) -> usize {
        b / self.n()
    }

    /// Endpoint sites `(i0, i1)` of bond `b`.
    pub fn bond(&self, b: usize) -> (usize, usize) {
        let (x, y) = self.coords(self.bond_anchor(b));
        match BondSpecies::from_index(self.bond_species(b)) {
            BondSpecies::X => (self.site(x, y), self.site(x + 1, y)),
            BondSpecies::Y => (self.site(x, y), self.site(x, y + 1)),
            BondSpecies::XPlusY => (self.site(x, y), self.site(x + 1, y + 1)),
            BondSpecies::XMinusY => (self.site(x + 1, y), self.site(x, y + 1)),
        }
    }

    /// Endpoints `[i0, i1]` of every bond, in bond order.
    pub fn bonds(&self) -> Vec<[usize; 2]> {
        (0..self.num_bonds())
            .map(|b| {
                let (i0, i1) = self.bond(b);
                [i0, i1]
            })
            .collect()
    }
}
