//! Local compute kernels.
//!
//! Each kernel receives the full operands plus the caller's partition and
//! writes only the output positions inside that partition. All accumulation
//! wraps on overflow so that every representation produces the same bits.

use crate::error::{DistMulError, Result};
use crate::matrix::{CsrMatrix, DenseMatrix};
use crate::partition::Partition;
use crate::polynomial::PolynomialPair;
use num_traits::{WrappingAdd, WrappingMul, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wrapping dot product over `(lhs, rhs)` pairs.
#[inline]
pub(crate) fn wrapping_dot<T, I>(terms: I) -> T
where
    T: WrappingAdd + WrappingMul + Zero + Copy,
    I: IntoIterator<Item = (T, T)>,
{
    terms
        .into_iter()
        .fold(T::zero(), |acc, (x, y)| acc.wrapping_add(&x.wrapping_mul(&y)))
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(DistMulError::InvalidDimension { expected, got });
    }
    Ok(())
}

/// `out[i] = sum_j matrix[i][j] * vector[j]` for every row `i` in `part`.
pub fn dense_rows(
    matrix: &DenseMatrix,
    vector: &[i64],
    part: &Partition,
    out: &mut [i64],
) -> Result<()> {
    check_len(matrix.size, vector.len())?;
    check_len(matrix.size, out.len())?;

    for i in part.range() {
        let row = matrix.row(i);
        out[i] = wrapping_dot(row.iter().zip(vector).map(|(&a, &x)| (a as i64, x)));
    }
    Ok(())
}

/// CSR counterpart of [`dense_rows`]; visits only the stored entries of each row.
pub fn csr_rows(matrix: &CsrMatrix, vector: &[i64], part: &Partition, out: &mut [i64]) -> Result<()> {
    check_len(matrix.size, vector.len())?;
    check_len(matrix.size, out.len())?;

    for i in part.range() {
        let (values, cols) = matrix.row(i);
        out[i] = wrapping_dot(
            values
                .iter()
                .zip(cols)
                .map(|(&a, &col)| (a as i64, vector[col])),
        );
    }
    Ok(())
}

/// Schoolbook convolution: `out[i] = sum_j a[j] * b[i - j]` over valid `j`,
/// for every output index `i` in `part`.
pub fn convolve(pair: &PolynomialPair, part: &Partition, out: &mut [i64]) -> Result<()> {
    check_len(pair.product_len(), out.len())?;

    let a = &pair.a.coefficients;
    let b = &pair.b.coefficients;
    if a.is_empty() || b.is_empty() {
        out[part.range()].fill(0);
        return Ok(());
    }
    for i in part.range() {
        // j ranges over indices with both a[j] and b[i - j] in bounds.
        let lo = i.saturating_sub(b.len() - 1);
        let hi = i.min(a.len() - 1);
        out[i] = if lo > hi {
            0
        } else {
            wrapping_dot((lo..=hi).map(|j| (a[j], b[i - j])))
        };
    }
    Ok(())
}

/// Matrix representation used by a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    Sparse,
    Dense,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sparse => write!(f, "CSR"),
            Self::Dense => write!(f, "Dense"),
        }
    }
}

/// Shared operands, identical on every participant after broadcast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operands {
    Dense(DenseMatrix),
    Sparse(CsrMatrix),
    Polynomials(PolynomialPair),
}

impl Operands {
    /// Length of the global result vector.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Dense(m) => m.size,
            Self::Sparse(m) => m.size,
            Self::Polynomials(pair) => pair.product_len(),
        }
    }

    /// Size the operands were announced with: matrix order, or grade.
    pub fn problem_size(&self) -> u64 {
        match self {
            Self::Dense(m) => m.size as u64,
            Self::Sparse(m) => m.size as u64,
            Self::Polynomials(pair) => pair.a.grade() as u64,
        }
    }

    pub fn compute(&self, vector: Option<&[i64]>, part: &Partition, out: &mut [i64]) -> Result<()> {
        let vector = || vector.ok_or(DistMulError::PayloadType("vector"));
        match self {
            Self::Dense(m) => dense_rows(m, vector()?, part, out),
            Self::Sparse(m) => csr_rows(m, vector()?, part, out),
            Self::Polynomials(pair) => convolve(pair, part, out),
        }
    }
}
