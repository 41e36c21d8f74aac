//! Translation-symmetry reduction of site and bond observables
//!
//! Every observable is indexed by a tuple of sites and/or bonds. A
//! [`ClassMap`] assigns each tuple a class id so that the simulation only
//! accumulates one number per equivalence class, together with the number
//! of tuples (the degeneracy) that fold into each class.
//!
//! All arities share one enumeration routine ([`SymmetryMapBuilder::build`]);
//! only the packing of the class id differs. The packing formulas fix the
//! array layout read by the simulation code and must not be reordered.

use crate::error::{LatticeError, Result};
use crate::geometry::Lattice;
use itertools::Itertools;
use tracing::{debug, warn};

/// Class id given to tuples dropped from a restricted map.
pub const EXCLUDED: i32 = -1;

/// Observable arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    /// one site `i`
    Site,
    /// two sites `[j, i]`
    SitePair,
    /// site `j` and bond `b`
    BondSite,
    /// two bonds `[bj, bi]`
    BondPair,
    /// three bonds `[b0, b1, b2]`
    BondTriple,
    /// three bonds, keeping only leaf bonds of a different species than the root
    BondTripleRestricted,
}

impl Observable {
    pub const ALL: [Observable; 6] = [
        Observable::Site,
        Observable::SitePair,
        Observable::BondSite,
        Observable::BondPair,
        Observable::BondTriple,
        Observable::BondTripleRestricted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Observable::Site => "i",
            Observable::SitePair => "ij",
            Observable::BondSite => "bs",
            Observable::BondPair => "bb",
            Observable::BondTriple => "bbb",
            Observable::BondTripleRestricted => "bbb_lim",
        }
    }
}

/// Row-major lookup from index tuples to class ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMap {
    pub shape: Vec<usize>,
    pub map: Vec<i32>,
    pub degeneracy: Vec<i32>,
}

impl ClassMap {
    pub fn num_classes(&self) -> usize {
        self.degeneracy.len()
    }

    pub fn num_tuples(&self) -> usize {
        self.map.len()
    }

    /// Class id of one tuple, [`EXCLUDED`] for dropped tuples.
    pub fn class(&self, index: &[usize]) -> i32 {
        assert_eq!(index.len(), self.shape.len());
        let flat = index
            .iter()
            .zip(self.shape.iter())
            .fold(0, |acc, (&i, &dim)| acc * dim + i);
        self.map[flat]
    }

    fn check_coverage(&self, counted: usize) {
        let max = self.map.iter().copied().max().unwrap_or(EXCLUDED);
        assert_eq!(
            max + 1,
            self.num_classes() as i32,
            "class map does not reach every class"
        );
        let total: i64 = self.degeneracy.iter().map(|&d| d as i64).sum();
        assert_eq!(total, counted as i64, "degeneracies do not add up");
    }
}

pub struct SymmetryMapBuilder<'a> {
    lattice: &'a Lattice,
    trans_sym: bool,
}

impl<'a> SymmetryMapBuilder<'a> {
    pub fn new(lattice: &'a Lattice, trans_sym: bool) -> Self {
        Self { lattice, trans_sym }
    }

    /// Number of classes of the site-pair map, the base of every bond packing.
    pub fn pair_classes(&self) -> usize {
        let n = self.lattice.n();
        if self.trans_sym {
            n
        } else {
            n * n
        }
    }

    fn pair_class(&self, j: usize, i: usize) -> usize {
        if self.trans_sym {
            self.lattice.displacement(j, i)
        } else {
            i + self.lattice.n() * j
        }
    }

    /// Split a bond index into (anchor site, species).
    fn split(&self, b: usize) -> (usize, usize) {
        (self.lattice.bond_anchor(b), self.lattice.bond_species(b))
    }

    pub fn shape(&self, obs: Observable) -> Vec<usize> {
        let n = self.lattice.n();
        let nb = self.lattice.num_bonds();
        match obs {
            Observable::Site => vec![n],
            Observable::SitePair => vec![n, n],
            Observable::BondSite => vec![n, nb],
            Observable::BondPair => vec![nb, nb],
            Observable::BondTriple | Observable::BondTripleRestricted => vec![nb, nb, nb],
        }
    }

    pub fn num_classes(&self, obs: Observable) -> usize {
        let n = self.lattice.n();
        let bps = self.lattice.bps();
        match obs {
            Observable::Site => {
                if self.trans_sym {
                    1
                } else {
                    n
                }
            }
            Observable::SitePair => self.pair_classes(),
            Observable::BondSite => self.pair_classes() * bps,
            Observable::BondPair => self.pair_classes() * bps * bps,
            Observable::BondTriple => bps * bps * bps * n * n,
            Observable::BondTripleRestricted => bps * n * n,
        }
    }

    fn class_of(&self, obs: Observable, idx: &[usize]) -> Option<usize> {
        let n = self.lattice.n();
        let bps = self.lattice.bps();
        let p = self.pair_classes();
        match obs {
            Observable::Site => Some(if self.trans_sym { 0 } else { idx[0] }),
            Observable::SitePair => Some(self.pair_class(idx[0], idx[1])),
            Observable::BondSite => {
                let (i, s) = self.split(idx[1]);
                Some(self.pair_class(idx[0], i) + p * s)
            }
            Observable::BondPair => {
                let (j, sj) = self.split(idx[0]);
                let (i, si) = self.split(idx[1]);
                Some(self.pair_class(j, i) + p * (si + bps * sj))
            }
            Observable::BondTriple | Observable::BondTripleRestricted => {
                let (j, s0) = self.split(idx[0]);
                let (i1, s1) = self.split(idx[1]);
                let (i2, s2) = self.split(idx[2]);
                let d1 = self.lattice.displacement(j, i1);
                let d2 = self.lattice.displacement(j, i2);
                if obs == Observable::BondTriple {
                    Some(d2 + n * d1 + n * n * (s2 + bps * s1 + bps * bps * s0))
                } else if s1 != s0 && s2 != s0 {
                    Some(d2 + n * d1 + n * n * s0)
                } else {
                    None
                }
            }
        }
    }

    /// Enumerate every tuple of `obs` in row-major order and assign classes.
    ///
    /// Panics if the resulting map misses a class or the degeneracies do
    /// not add up: both mean the packing is inconsistent with the lattice.
    pub fn build(&self, obs: Observable) -> Result<ClassMap> {
        if obs == Observable::BondTripleRestricted && self.lattice.diagonal {
            return Err(LatticeError::RestrictedTriplesWithDiagonalBonds {
                bps: self.lattice.bps(),
            });
        }

        let shape = self.shape(obs);
        let num_classes = self.num_classes(obs);
        let mut map = Vec::with_capacity(shape.iter().product());
        let mut degeneracy = vec![0i32; num_classes];
        let mut counted = 0usize;

        for idx in shape.iter().map(|&d| 0..d).multi_cartesian_product() {
            match self.class_of(obs, &idx) {
                Some(k) => {
                    map.push(k as i32);
                    degeneracy[k] += 1;
                    counted += 1;
                }
                None => map.push(EXCLUDED),
            }
        }

        let class_map = ClassMap {
            shape,
            map,
            degeneracy,
        };
        class_map.check_coverage(counted);
        debug!(
            "map_{}: {} tuples in {} classes",
            obs.name(),
            class_map.num_tuples(),
            class_map.num_classes()
        );
        Ok(class_map)
    }
}

/// Every class map written to a simulation file.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryMaps {
    pub site: ClassMap,
    pub pair: ClassMap,
    pub bond_site: ClassMap,
    pub bond_pair: ClassMap,
    pub bond_triple: ClassMap,
    /// Only defined for lattices without diagonal bonds.
    pub bond_triple_restricted: Option<ClassMap>,
}

impl SymmetryMaps {
    pub fn build(lattice: &Lattice, trans_sym: bool) -> Self {
        let builder = SymmetryMapBuilder::new(lattice, trans_sym);
        let always = |obs| match builder.build(obs) {
            Ok(map) => map,
            Err(e) => unreachable!("{}", e),
        };
        let bond_triple_restricted = match builder.build(Observable::BondTripleRestricted) {
            Ok(map) => Some(map),
            Err(e) => {
                warn!("Skipping map_bbb_lim: {}", e);
                None
            }
        };

        Self {
            site: always(Observable::Site),
            pair: always(Observable::SitePair),
            bond_site: always(Observable::BondSite),
            bond_pair: always(Observable::BondPair),
            bond_triple: always(Observable::BondTriple),
            bond_triple_restricted,
        }
    }

    pub fn get(&self, obs: Observable) -> Option<&ClassMap> {
        match obs {
            Observable::Site => Some(&self.site),
            Observable::SitePair => Some(&self.pair),
            Observable::BondSite => Some(&self.bond_site),
            Observable::BondPair => Some(&self.bond_pair),
            Observable::BondTriple => Some(&self.bond_triple),
            Observable::BondTripleRestricted => self.bond_triple_restricted.as_ref(),
        }
    }

    pub fn num_classes(&self, obs: Observable) -> usize {
        self.get(obs).map(ClassMap::num_classes).unwrap_or(0)
    }
}
