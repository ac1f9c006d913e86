//! Seeded input generation for the benchmarks.
//!
//! The generators only need a source of integers in `[0, k)`; any `rand::Rng`
//! qualifies, and tests can plug in scripted sources.

use crate::error::{DistMulError, Result};
use crate::matrix::DenseMatrix;
use crate::polynomial::{Polynomial, PolynomialPair};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_SEED: u64 = 63;

/// Non-zero matrix entries are drawn from `1..=MAX_ENTRY`.
pub const MAX_ENTRY: u64 = 10;
/// Vector entries are drawn from `0..VECTOR_BOUND`.
pub const VECTOR_BOUND: u64 = 10;
/// Polynomial coefficients are drawn from `0..COEFFICIENT_BOUND`.
pub const COEFFICIENT_BOUND: u64 = 100;

/// Produces integers uniformly in `[0, bound)`.
pub trait RandomSource {
    fn below(&mut self, bound: u64) -> u64;
}

impl<R: Rng> RandomSource for R {
    fn below(&mut self, bound: u64) -> u64 {
        self.gen_range(0..bound)
    }
}

/// Generator used on root; the same seed always yields the same inputs.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Number of non-zero cells requested for a `size x size` matrix.
pub fn target_nonzeros(size: usize, nonzero_percentage: u32) -> usize {
    let total = size as u128 * size as u128;
    (total * nonzero_percentage.min(100) as u128 / 100) as usize
}

/// Generates a `size x size` matrix with `nonzero_percentage` percent of its
/// cells set to values in `1..=MAX_ENTRY`.
///
/// A random cell is drawn for each entry; if it is already occupied the scan
/// moves forward (wrapping) to the next free cell. Since the target never
/// exceeds the cell count, every placement finds a free cell.
pub fn dense_matrix<S: RandomSource + ?Sized>(
    size: usize,
    nonzero_percentage: u32,
    source: &mut S,
) -> Result<DenseMatrix> {
    if nonzero_percentage > 100 {
        return Err(DistMulError::InvalidParameters(format!(
            "non-zero percentage {nonzero_percentage} exceeds 100"
        )));
    }

    let total = size.checked_mul(size).ok_or_else(|| {
        DistMulError::InvalidParameters(format!("{size} x {size} cells overflow usize"))
    })?;
    let mut matrix = DenseMatrix::zeros(size);
    let target = target_nonzeros(size, nonzero_percentage);

    for _ in 0..target {
        let i = source.below(size as u64) as usize;
        let j = source.below(size as u64) as usize;
        let mut cell = i * size + j;
        while matrix.data[cell] != 0 {
            cell = (cell + 1) % total;
        }
        matrix.data[cell] = (source.below(MAX_ENTRY) + 1) as i32;
    }

    Ok(matrix)
}

pub fn vector<S: RandomSource + ?Sized>(len: usize, source: &mut S) -> Vec<i64> {
    (0..len).map(|_| source.below(VECTOR_BOUND) as i64).collect()
}

/// Generates two polynomials of the given grade, drawing their coefficients
/// alternately.
pub fn polynomial_pair<S: RandomSource + ?Sized>(grade: usize, source: &mut S) -> PolynomialPair {
    let mut a = Vec::with_capacity(grade + 1);
    let mut b = Vec::with_capacity(grade + 1);
    for _ in 0..=grade {
        a.push(source.below(COEFFICIENT_BOUND) as i64);
        b.push(source.below(COEFFICIENT_BOUND) as i64);
    }
    PolynomialPair::new(Polynomial::new(a), Polynomial::new(b))
}
