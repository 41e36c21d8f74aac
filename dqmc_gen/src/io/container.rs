//! Hierarchical container of typed, shaped datasets
//!
//! A simulation file is a set of named groups, each a set of named
//! datasets. Arrays are stored flat in row-major order next to their
//! shape; scalars have an empty shape. The container is written as JSON.

use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::{DMatrix, Scalar};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

/// Flat dataset payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum Data {
    Int32(Vec<i32>),
    Uint64(Vec<u64>),
    Float64(Vec<f64>),
    /// `[re, im]` pairs
    Complex128(Vec<[f64; 2]>),
    Str(String),
}

impl Data {
    fn len(&self) -> usize {
        match self {
            Data::Int32(v) => v.len(),
            Data::Uint64(v) => v.len(),
            Data::Float64(v) => v.len(),
            Data::Complex128(v) => v.len(),
            Data::Str(_) => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub shape: Vec<usize>,
    pub data: Data,
}

/// Row-major copy of a column-major matrix.
fn row_major<T: Scalar + Copy>(m: &DMatrix<T>) -> Vec<T> {
    m.transpose().iter().copied().collect()
}

impl Dataset {
    pub fn new(shape: Vec<usize>, data: Data) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            expected,
            data.len(),
            "shape {:?} does not match {} values",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// 32-bit integer scalar. Panics if `value` does not fit; settings
    /// are range checked before any dataset is built.
    pub fn int(value: i64) -> Self {
        let v = i32::try_from(value)
            .unwrap_or_else(|_| panic!("{} does not fit a 32-bit integer dataset", value));
        Self::new(vec![], Data::Int32(vec![v]))
    }

    pub fn flag(value: bool) -> Self {
        Self::int(value as i64)
    }

    pub fn float(value: f64) -> Self {
        Self::new(vec![], Data::Float64(vec![value]))
    }

    pub fn text(value: &str) -> Self {
        Self {
            shape: vec![],
            data: Data::Str(value.to_string()),
        }
    }

    pub fn ints(shape: Vec<usize>, values: Vec<i32>) -> Self {
        Self::new(shape, Data::Int32(values))
    }

    pub fn words(values: &[u64]) -> Self {
        Self::new(vec![values.len()], Data::Uint64(values.to_vec()))
    }

    pub fn floats(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self::new(shape, Data::Float64(values))
    }

    pub fn complexes(shape: Vec<usize>, values: &[Complex64]) -> Self {
        Self::new(
            shape,
            Data::Complex128(values.iter().map(|z| [z.re, z.im]).collect()),
        )
    }

    pub fn real_matrix(m: &DMatrix<f64>) -> Self {
        Self::floats(vec![m.nrows(), m.ncols()], row_major(m))
    }

    pub fn complex_matrix(m: &DMatrix<Complex64>) -> Self {
        Self::complexes(vec![m.nrows(), m.ncols()], &row_major(m))
    }

    pub fn as_ints(&self) -> Option<&[i32]> {
        match &self.data {
            Data::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_words(&self) -> Option<&[u64]> {
        match &self.data {
            Data::Uint64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match &self.data {
            Data::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            Data::Str(s) => Some(s),
            _ => None,
        }
    }

    /// First value of an integer dataset, for scalars.
    pub fn int_value(&self) -> Option<i32> {
        self.as_ints().and_then(|v| v.first().copied())
    }

    pub fn float_value(&self) -> Option<f64> {
        self.as_floats().and_then(|v| v.first().copied())
    }
}

pub type Group = BTreeMap<String, Dataset>;

/// All groups of one simulation file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub groups: BTreeMap<String, Group>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group `name`, created empty if missing.
    pub fn group_mut(&mut self, name: &str) -> &mut Group {
        self.groups.entry(name.to_string()).or_default()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn insert(&mut self, group: &str, name: &str, dataset: Dataset) {
        self.group_mut(group).insert(name.to_string(), dataset);
    }

    pub fn get(&self, group: &str, name: &str) -> Option<&Dataset> {
        self.groups.get(group).and_then(|g| g.get(name))
    }

    /// Replace an existing dataset; errors if it is not there.
    pub fn replace(&mut self, group: &str, name: &str, dataset: Dataset) -> Result<()> {
        let slot = self
            .groups
            .get_mut(group)
            .and_then(|g| g.get_mut(name))
            .ok_or_else(|| eyre!("no dataset {}/{} to replace", group, name))?;
        *slot = dataset;
        Ok(())
    }

    /// Write the container to `path`.
    ///
    /// Without `overwrite` an existing file is an error and is left untouched.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                eyre!(
                    "{} already exists; set overwrite=1 to replace it",
                    path.display()
                )
            } else {
                eyre!("Unable to create {}: {}", path.display(), e)
            }
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("Unable to open {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("dqmc_gen_container_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_matrices_are_row_major() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let ds = Dataset::real_matrix(&m);
        assert_eq!(ds.shape, vec![2, 3]);
        assert_eq!(ds.as_floats().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let z = DMatrix::from_row_slice(
            1,
            2,
            &[Complex64::new(1.0, -1.0), Complex64::new(0.0, 2.0)],
        );
        let ds = Dataset::complex_matrix(&z);
        assert_eq!(ds.data, Data::Complex128(vec![[1.0, -1.0], [0.0, 2.0]]));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_int_out_of_range_panics() {
        Dataset::int(i64::from(i32::MAX) + 1);
    }

    #[test]
    fn test_int_limits() {
        assert_eq!(Dataset::int(i64::from(i32::MIN)).int_value(), Some(i32::MIN));
        assert_eq!(Dataset::flag(true).int_value(), Some(1));
    }

    #[test]
    #[should_panic]
    fn test_shape_mismatch_panics() {
        Dataset::ints(vec![2, 2], vec![0; 3]);
    }

    #[test]
    fn test_replace_requires_existing() {
        let mut c = Container::new();
        c.insert("state", "sweep", Dataset::int(0));
        c.replace("state", "sweep", Dataset::int(3)).unwrap();
        assert_eq!(c.get("state", "sweep").unwrap().int_value(), Some(3));
        assert!(c.replace("state", "hs", Dataset::int(0)).is_err());
    }

    #[test]
    fn test_save_load_and_create_new() {
        let path = scratch("a.json");
        let mut c = Container::new();
        c.insert("metadata", "model", Dataset::text("Hubbard"));
        c.insert("params", "init_rng", Dataset::words(&[u64::MAX, 1, 2]));
        c.insert("params", "dt", Dataset::float(0.115));

        c.save(&path, false).unwrap();
        let loaded = Container::load(&path).unwrap();
        assert_eq!(loaded, c);
        assert_eq!(
            loaded.get("params", "init_rng").unwrap().as_words().unwrap()[0],
            u64::MAX
        );

        let mut other = Container::new();
        other.insert("metadata", "model", Dataset::text("other"));
        assert!(other.save(&path, false).is_err());
        assert_eq!(Container::load(&path).unwrap(), c);

        other.save(&path, true).unwrap();
        assert_eq!(Container::load(&path).unwrap(), other);
        fs::remove_file(&path).unwrap();
    }
}
