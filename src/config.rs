//! Command-line configuration for both benchmark programs.
//!
//! Only the root parses flags. The parsed configuration (or the decision to
//! abort) is then broadcast so that every participant takes the same path.

use crate::error::{DistMulError, Result};
use crate::generator::DEFAULT_SEED;
use crate::kernel::Representation;
use serde::{Deserialize, Serialize};
use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;

/// Overrides the generator seed on the root.
pub const SEED_VAR: &str = "DISTMUL_SEED";
/// Number of ranks started by the in-process launcher.
pub const PROCESSES_VAR: &str = "DISTMUL_PROCESSES";

pub const DEFAULT_DUMP_LEN: usize = 10;

struct FlagSpec {
    short: char,
    name: &'static str,
    takes_value: bool,
}

const fn flag(short: char, name: &'static str, takes_value: bool) -> FlagSpec {
    FlagSpec {
        short,
        name,
        takes_value,
    }
}

/// getopt-style scan: `-x value`, `-xvalue`, or bare `-x` for switches.
fn scan_flags<S: AsRef<str>>(
    args: &[S],
    specs: &[FlagSpec],
) -> Result<Vec<(&'static str, Option<String>)>> {
    let mut found = Vec::new();
    let mut iter = args.iter().map(AsRef::as_ref);

    while let Some(arg) = iter.next() {
        let mut chars = arg.chars();
        let short = match (chars.next(), chars.next()) {
            (Some('-'), Some(c)) => c,
            _ => return Err(DistMulError::UnknownFlag(arg.to_string())),
        };
        let spec = specs
            .iter()
            .find(|spec| spec.short == short)
            .ok_or_else(|| DistMulError::UnknownFlag(arg.to_string()))?;

        let attached = chars.as_str();
        let value = if spec.takes_value {
            if attached.is_empty() {
                Some(
                    iter.next()
                        .ok_or(DistMulError::MissingArgument(spec.name))?
                        .to_string(),
                )
            } else {
                Some(attached.to_string())
            }
        } else if attached.is_empty() {
            None
        } else {
            return Err(DistMulError::UnknownFlag(arg.to_string()));
        };
        found.push((spec.name, value));
    }

    Ok(found)
}

fn parse_value<T: FromStr>(flag: &'static str, value: Option<String>) -> Result<T> {
    let value = value.ok_or(DistMulError::MissingArgument(flag))?;
    value
        .trim()
        .parse()
        .map_err(|_| DistMulError::InvalidArgument { flag, value })
}

/// Settings of the matrix-vector benchmark.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub size: usize,
    pub zero_percentage: u32,
    pub multiplications: usize,
    pub dense_only: bool,
    pub dump_len: usize,
    pub csv: bool,
    pub seed: u64,
}

impl MatrixConfig {
    const FLAGS: [FlagSpec; 6] = [
        flag('s', "-s", true),
        flag('z', "-z", true),
        flag('m', "-m", true),
        flag('d', "-d", false),
        flag('v', "-v", true),
        flag('c', "-c", false),
    ];

    pub fn new(size: usize, zero_percentage: u32, multiplications: usize) -> Result<Self> {
        let config = Self {
            size,
            zero_percentage,
            multiplications,
            dense_only: false,
            dump_len: DEFAULT_DUMP_LEN,
            csv: false,
            seed: DEFAULT_SEED,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses the flags following the program name.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut size = None;
        let mut zero_percentage = None;
        let mut multiplications = None;
        let mut dense_only = false;
        let mut dump_len = DEFAULT_DUMP_LEN;
        let mut csv = false;

        for (name, value) in scan_flags(args, &Self::FLAGS)? {
            match name {
                "-s" => size = Some(parse_value(name, value)?),
                "-z" => zero_percentage = Some(parse_value(name, value)?),
                "-m" => multiplications = Some(parse_value(name, value)?),
                "-d" => dense_only = true,
                "-v" => dump_len = parse_value(name, value)?,
                _ => csv = true,
            }
        }

        let config = Self {
            size: size.ok_or(DistMulError::MissingArgument("-s"))?,
            zero_percentage: zero_percentage.ok_or(DistMulError::MissingArgument("-z"))?,
            multiplications: multiplications.ok_or(DistMulError::MissingArgument("-m"))?,
            dense_only,
            dump_len,
            csv,
            seed: DEFAULT_SEED,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // The generator scales the cell count by a percentage.
        let cells = self
            .size
            .checked_mul(self.size)
            .and_then(|cells| cells.checked_mul(100));
        if self.size == 0 || cells.is_none() {
            return Err(DistMulError::InvalidArgument {
                flag: "-s",
                value: self.size.to_string(),
            });
        }
        if self.zero_percentage > 100 {
            return Err(DistMulError::InvalidArgument {
                flag: "-z",
                value: self.zero_percentage.to_string(),
            });
        }
        if self.multiplications == 0 {
            return Err(DistMulError::InvalidArgument {
                flag: "-m",
                value: self.multiplications.to_string(),
            });
        }
        Ok(())
    }

    /// Replaces the generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn nonzero_percentage(&self) -> u32 {
        100 - self.zero_percentage
    }

    /// Representations to run, in order. The cross-check needs both.
    pub fn representations(&self) -> Vec<Representation> {
        if self.dense_only {
            vec![Representation::Dense]
        } else {
            vec![Representation::Sparse, Representation::Dense]
        }
    }

    pub fn usage(program: &str) -> String {
        format!(
            "Usage: {program} -s size -z percentage_zeros -m multiplications [-d] [-v dump_len] [-c]"
        )
    }
}

/// Settings of the polynomial multiplication benchmark.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialConfig {
    pub grade: usize,
    pub verify: bool,
    pub csv: bool,
    pub print: bool,
    pub seed: u64,
}

impl PolynomialConfig {
    const FLAGS: [FlagSpec; 4] = [
        flag('n', "-n", true),
        flag('s', "-s", true),
        flag('c', "-c", false),
        flag('p', "-p", false),
    ];

    pub fn new(grade: usize) -> Self {
        Self {
            grade,
            verify: false,
            csv: false,
            print: false,
            seed: DEFAULT_SEED,
        }
    }

    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut grade = None;
        let mut config = Self::new(0);

        for (name, value) in scan_flags(args, &Self::FLAGS)? {
            match name {
                "-n" => grade = Some(parse_value(name, value)?),
                "-s" => config.verify = parse_value::<u32>(name, value)? != 0,
                "-c" => config.csv = true,
                _ => config.print = true,
            }
        }

        config.grade = grade.ok_or(DistMulError::MissingArgument("-n"))?;
        config.validate()?;
        Ok(config)
    }

    /// The product has `2 * grade + 1` coefficients; that count must fit.
    fn validate(&self) -> Result<()> {
        let product_len = self
            .grade
            .checked_mul(2)
            .and_then(|twice| twice.checked_add(1));
        if product_len.is_none() {
            return Err(DistMulError::InvalidArgument {
                flag: "-n",
                value: self.grade.to_string(),
            });
        }
        Ok(())
    }

    /// Replaces the generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn usage(program: &str) -> String {
        format!("Usage: {program} -n <grade of polynomial> [-s <0|1>] [-c] [-p]")
    }
}

/// Seed for the root's generator: `DISTMUL_SEED` if set, else the default.
pub fn seed_from_env() -> Result<u64> {
    match env::var(SEED_VAR) {
        Ok(value) => value.trim().parse().map_err(|_| DistMulError::InvalidArgument {
            flag: SEED_VAR,
            value,
        }),
        Err(_) => Ok(DEFAULT_SEED),
    }
}

/// Rank count for the in-process launcher: `DISTMUL_PROCESSES` if set, else
/// the available parallelism.
pub fn processes_from_env() -> Result<usize> {
    match env::var(PROCESSES_VAR) {
        Ok(value) => match value.trim().parse::<NonZeroUsize>() {
            Ok(n) => Ok(n.get()),
            Err(_) => Err(DistMulError::InvalidArgument {
                flag: PROCESSES_VAR,
                value,
            }),
        },
        Err(_) => Ok(std::thread::available_parallelism().map_or(1, NonZeroUsize::get)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_flags() {
        let config = MatrixConfig::parse(&["-s", "8", "-z", "75", "-m", "3"]).unwrap();
        assert_eq!(config.size, 8);
        assert_eq!(config.nonzero_percentage(), 25);
        assert_eq!(config.multiplications, 3);
        assert!(!config.dense_only);
        assert_eq!(
            config.representations(),
            vec![Representation::Sparse, Representation::Dense]
        );
    }

    #[test]
    fn test_attached_values_and_switches() {
        let config = MatrixConfig::parse(&["-s16", "-z0", "-m1", "-d", "-v", "4", "-c"]).unwrap();
        assert_eq!(config.size, 16);
        assert_eq!(config.nonzero_percentage(), 100);
        assert!(config.dense_only);
        assert!(config.csv);
        assert_eq!(config.dump_len, 4);
        assert_eq!(config.representations(), vec![Representation::Dense]);
    }

    #[test]
    fn test_matrix_missing_and_invalid() {
        assert!(matches!(
            MatrixConfig::parse(&["-s", "8", "-z", "10"]),
            Err(DistMulError::MissingArgument("-m"))
        ));
        assert!(matches!(
            MatrixConfig::parse(&["-s", "0", "-z", "10", "-m", "1"]),
            Err(DistMulError::InvalidArgument { flag: "-s", .. })
        ));
        assert!(matches!(
            MatrixConfig::parse(&["-s", "4", "-z", "101", "-m", "1"]),
            Err(DistMulError::InvalidArgument { flag: "-z", .. })
        ));
        assert!(matches!(
            MatrixConfig::parse(&["-s", "x", "-z", "1", "-m", "1"]),
            Err(DistMulError::InvalidArgument { flag: "-s", .. })
        ));
        assert!(matches!(
            MatrixConfig::parse(&["-s", "4", "-q"]),
            Err(DistMulError::UnknownFlag(_))
        ));
        assert!(matches!(
            MatrixConfig::parse(&["-s"]),
            Err(DistMulError::MissingArgument("-s"))
        ));
    }

    #[test]
    fn test_matrix_size_must_fit_cell_count() {
        let huge = (1usize << (usize::BITS / 2)).to_string();
        assert!(matches!(
            MatrixConfig::parse(&["-s", huge.as_str(), "-z", "50", "-m", "1"]),
            Err(DistMulError::InvalidArgument { flag: "-s", .. })
        ));
        assert!(matches!(
            MatrixConfig::new(usize::MAX, 0, 1),
            Err(DistMulError::InvalidArgument { flag: "-s", .. })
        ));
    }

    #[test]
    fn test_polynomial_flags() {
        let config = PolynomialConfig::parse(&["-n", "100"]).unwrap();
        assert_eq!(config.grade, 100);
        assert!(!config.verify);

        let config = PolynomialConfig::parse(&["-n0", "-s", "1", "-p"]).unwrap();
        assert_eq!(config.grade, 0);
        assert!(config.verify);
        assert!(config.print);

        assert!(PolynomialConfig::parse::<&str>(&[]).is_err());
        let huge = usize::MAX.to_string();
        assert!(matches!(
            PolynomialConfig::parse(&["-n", huge.as_str()]),
            Err(DistMulError::InvalidArgument { flag: "-n", .. })
        ));
        assert!(PolynomialConfig::parse(&["-n", "-3"]).is_err());
    }
}
