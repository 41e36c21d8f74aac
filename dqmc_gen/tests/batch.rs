use approx::assert_relative_eq;
use dqmc_gen::app::{create_batch, Artifacts};
use dqmc_gen::config::{Config, Settings};
use dqmc_gen::io::{Container, Data};
use hubbard::{HsField, RngState};
use std::fs;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dqmc_gen_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn square(dir: &PathBuf, nfiles: usize) -> Settings {
    Config {
        nx: Some(4),
        ny: Some(4),
        u: Some(6.0),
        dt: Some(0.115),
        l: Some(40),
        nflux: Some(0),
        trans_sym: Some(1),
        seed: Some(42),
        nfiles: Some(nfiles),
        prefix: Some(dir.join("hub").to_string_lossy().into_owned()),
        ..Config::default()
    }
    .resolve()
    .unwrap()
}

fn words(c: &Container, group: &str, name: &str) -> Vec<u64> {
    c.get(group, name).unwrap().as_words().unwrap().to_vec()
}

#[test]
fn test_single_file_square_lattice() {
    let dir = scratch_dir("single");
    let settings = square(&dir, 1);
    let artifacts = Artifacts::build(&settings).unwrap();
    let paths = create_batch(&settings, &artifacts).unwrap();
    assert_eq!(paths, vec![dir.join("hub_0.json")]);

    let c = Container::load(&paths[0]).unwrap();
    let int = |g: &str, n: &str| c.get(g, n).unwrap().int_value().unwrap();
    assert_eq!(int("params", "N"), 16);
    assert_eq!(int("params", "L"), 40);
    assert_eq!(int("params", "num_i"), 1);
    assert_eq!(int("params", "num_ij"), 16);
    assert_eq!(int("state", "sweep"), 0);

    let hs = c.get("state", "hs").unwrap();
    assert_eq!(hs.shape, vec![40, 16]);
    assert!(hs.as_ints().unwrap().iter().all(|&v| v == 0 || v == 1));

    let mut expected_rng = RngState::seed(42);
    let expected_hs = HsField::draw(&mut expected_rng, 40, 16);
    assert_eq!(hs.as_ints().unwrap(), expected_hs.values.as_slice());
    assert_eq!(words(&c, "state", "rng"), expected_rng.to_words().to_vec());
    assert_eq!(words(&c, "params", "init_rng"), words(&c, "state", "rng"));

    // all sites share one class, so every exp_lambda entry in a row agrees
    let exp_lambda = c.get("params", "exp_lambda").unwrap().as_floats().unwrap();
    let e = exp_lambda[16];
    assert_relative_eq!(e.ln().cosh(), (0.5 * 6.0 * 0.115f64).exp(), epsilon = 1e-12);
    assert!(exp_lambda[16..].iter().all(|&x| x == e));

    assert!(matches!(c.get("params", "Ku").unwrap().data, Data::Float64(_)));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_three_replicas_differ_only_in_stream() {
    let dir = scratch_dir("three");
    let settings = square(&dir, 3);
    let artifacts = Artifacts::build(&settings).unwrap();
    let paths = create_batch(&settings, &artifacts).unwrap();
    assert_eq!(paths.len(), 3);

    let files: Vec<Container> = paths.iter().map(|p| Container::load(p).unwrap()).collect();
    let states: Vec<Vec<u64>> = files.iter().map(|c| words(c, "state", "rng")).collect();
    assert_ne!(states[0], states[1]);
    assert_ne!(states[0], states[2]);
    assert_ne!(states[1], states[2]);

    for (k, c) in files.iter().enumerate() {
        let mut rng = RngState::seed(42).jumped(k);
        let hs = HsField::draw(&mut rng, 40, 16);
        assert_eq!(states[k], rng.to_words().to_vec(), "replica {}", k);
        assert_eq!(
            c.get("state", "hs").unwrap().as_ints().unwrap(),
            hs.values.as_slice()
        );
    }

    // everything outside the stream is shared
    for c in &files[1..] {
        for (name, group) in &files[0].groups {
            for (key, ds) in group {
                let replica_specific = matches!(
                    (name.as_str(), key.as_str()),
                    ("params", "init_rng") | ("state", "rng") | ("state", "hs")
                );
                if !replica_specific {
                    assert_eq!(c.get(name, key), Some(ds), "{}/{}", name, key);
                }
            }
        }
    }
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_existing_file_is_not_replaced() {
    let dir = scratch_dir("exists");
    let settings = square(&dir, 2);
    let artifacts = Artifacts::build(&settings).unwrap();

    let blocker = dir.join("hub_1.json");
    fs::write(&blocker, "keep").unwrap();

    assert!(create_batch(&settings, &artifacts).is_err());
    assert!(Container::load(&dir.join("hub_0.json")).is_ok());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "keep");

    let settings = Settings {
        overwrite: true,
        ..settings
    };
    let paths = create_batch(&settings, &artifacts).unwrap();
    assert!(Container::load(&paths[1]).is_ok());
    let _ = fs::remove_dir_all(&dir);
}
