//! Single-process reference products.
//!
//! These are the oracles the distributed results are checked against, so they
//! deliberately share no code path with the partitioned kernels beyond the
//! wrapping dot product.

use crate::kernel::wrapping_dot;
use crate::matrix::DenseMatrix;
use crate::polynomial::PolynomialPair;
use rayon::prelude::*;

/// `matrix * vector` over the whole matrix, rows in parallel.
pub fn dense_product(matrix: &DenseMatrix, vector: &[i64]) -> Vec<i64> {
    (0..matrix.size)
        .into_par_iter()
        .map(|i| {
            wrapping_dot(
                matrix
                    .row(i)
                    .iter()
                    .zip(vector)
                    .map(|(&a, &x)| (a as i64, x)),
            )
        })
        .collect()
}

/// Applies `matrix` to `vector` `times` times.
pub fn iterate(matrix: &DenseMatrix, vector: &[i64], times: usize) -> Vec<i64> {
    (0..times).fold(vector.to_vec(), |current, _| dense_product(matrix, &current))
}

/// Product coefficients computed one output index at a time, in parallel.
pub fn polynomial_product(pair: &PolynomialPair) -> Vec<i64> {
    let a = &pair.a.coefficients;
    let b = &pair.b.coefficients;
    (0..pair.product_len())
        .into_par_iter()
        .map(|i| {
            wrapping_dot(
                a.iter()
                    .enumerate()
                    .filter_map(|(j, &x)| i.checked_sub(j).and_then(|k| b.get(k)).map(|&y| (x, y))),
            )
        })
        .collect()
}

/// Sequential scatter form: every `a[i] * b[j]` is added into `c[i + j]`.
pub fn schoolbook_scatter(pair: &PolynomialPair) -> Vec<i64> {
    let mut product = vec![0i64; pair.product_len()];
    for (i, &x) in pair.a.coefficients.iter().enumerate() {
        for (j, &y) in pair.b.coefficients.iter().enumerate() {
            product[i + j] = product[i + j].wrapping_add(x.wrapping_mul(y));
        }
    }
    product
}
