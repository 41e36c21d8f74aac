//! `key=value` command-line parameters

use color_eyre::eyre::{eyre, Result};
use std::fmt;

/// A parameter value, coerced to integer, then float, then kept as text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    /// integers above `i64::MAX`, such as large seeds
    UInt(u64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn parse(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(u) = raw.parse::<u64>() {
            ParamValue::UInt(u)
        } else if let Ok(x) = raw.parse::<f64>() {
            ParamValue::Float(x)
        } else {
            ParamValue::Text(raw.to_string())
        }
    }

    pub fn as_int(&self, key: &str) -> Result<i64> {
        match self {
            ParamValue::Int(i) => Ok(*i),
            other => Err(eyre!("{} expects an integer, got {}", key, other)),
        }
    }

    pub fn as_u64(&self, key: &str) -> Result<u64> {
        match self {
            ParamValue::Int(i) => {
                u64::try_from(*i).map_err(|_| eyre!("{} must be non-negative, got {}", key, i))
            }
            ParamValue::UInt(u) => Ok(*u),
            other => Err(eyre!("{} expects an integer, got {}", key, other)),
        }
    }

    pub fn as_count(&self, key: &str) -> Result<usize> {
        let u = self.as_u64(key)?;
        usize::try_from(u).map_err(|_| eyre!("{} is out of range, got {}", key, u))
    }

    pub fn as_float(&self, key: &str) -> Result<f64> {
        match self {
            ParamValue::Int(i) => Ok(*i as f64),
            ParamValue::UInt(u) => Ok(*u as f64),
            ParamValue::Float(x) => Ok(*x),
            other => Err(eyre!("{} expects a number, got {}", key, other)),
        }
    }

    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::UInt(u) => write!(f, "{}", u),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Split `key=value` at the first `=`.
pub fn parse_assignment(arg: &str) -> Result<(String, ParamValue)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| eyre!("couldn't find \"=\" in argument {}", arg))?;
    if key.is_empty() {
        return Err(eyre!("missing key in argument {}", arg));
    }
    Ok((key.to_string(), ParamValue::parse(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion_order() {
        assert_eq!(ParamValue::parse("16"), ParamValue::Int(16));
        assert_eq!(ParamValue::parse("-3"), ParamValue::Int(-3));
        assert_eq!(ParamValue::parse("0.115"), ParamValue::Float(0.115));
        assert_eq!(
            ParamValue::parse("18446744073709551615"),
            ParamValue::UInt(u64::MAX)
        );
        assert!(matches!(
            ParamValue::parse("18446744073709551616"),
            ParamValue::Float(_)
        ));
        assert_eq!(ParamValue::parse("1e-3"), ParamValue::Float(1e-3));
        assert_eq!(ParamValue::parse("run_a"), ParamValue::Text("run_a".to_string()));
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(ParamValue::Int(4).as_float("U").unwrap(), 4.0);
        assert!(ParamValue::Float(4.5).as_int("Nx").is_err());
        assert!(ParamValue::Int(-1).as_count("L").is_err());
        assert_eq!(ParamValue::UInt(u64::MAX).as_u64("seed").unwrap(), u64::MAX);
        assert!(ParamValue::UInt(u64::MAX).as_int("nflux").is_err());
        assert!(ParamValue::Int(-1).as_u64("seed").is_err());
        assert!(ParamValue::Text("x".into()).as_float("mu").is_err());
        assert_eq!(ParamValue::Int(7).as_text(), "7");
    }

    #[test]
    fn test_parse_assignment() {
        let (key, value) = parse_assignment("t'=-0.25").unwrap();
        assert_eq!(key, "t'");
        assert_eq!(value, ParamValue::Float(-0.25));

        let (key, value) = parse_assignment("prefix=a=b").unwrap();
        assert_eq!(key, "prefix");
        assert_eq!(value, ParamValue::Text("a=b".to_string()));

        assert!(parse_assignment("Nx8").is_err());
        assert!(parse_assignment("=8").is_err());
    }
}
