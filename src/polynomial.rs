//! Integer polynomials and the operand bundle broadcast for multiplication.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficient sequence of length `grade + 1`.
///
/// Coefficient `i` is rendered with exponent `grade - i`; multiplication is
/// plain index convolution, so either reading of the indices is preserved by
/// the product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polynomial {
    pub coefficients: Vec<i64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<i64>) -> Self {
        Self { coefficients }
    }

    pub fn zero(grade: usize) -> Self {
        Self::new(vec![0; grade + 1])
    }

    /// Grade of the polynomial; an empty coefficient list is treated as grade 0.
    pub fn grade(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grade = self.grade();
        for (i, c) in self.coefficients.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}x^{}", c, grade - i)?;
        }
        Ok(())
    }
}

/// Both factors of a product, broadcast together as one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialPair {
    pub a: Polynomial,
    pub b: Polynomial,
}

impl PolynomialPair {
    pub fn new(a: Polynomial, b: Polynomial) -> Self {
        Self { a, b }
    }

    /// Length of the product coefficient vector, `len(a) + len(b) - 1`.
    pub fn product_len(&self) -> usize {
        (self.a.len() + self.b.len()).saturating_sub(1)
    }
}
