//! Square integer matrices in dense row-major and compressed sparse row form.

use crate::error::{DistMulError, Result};
use serde::{Deserialize, Serialize};

/// `size x size` matrix of `i32` entries stored row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseMatrix {
    pub size: usize,
    pub data: Vec<i32>,
}

impl DenseMatrix {
    /// All-zero matrix of order `size`.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0; size * size],
        }
    }

    /// Builds a matrix from explicit rows; every row must have `rows.len()` entries.
    pub fn from_rows(rows: &[Vec<i32>]) -> Result<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for row in rows {
            if row.len() != size {
                return Err(DistMulError::InvalidDimension {
                    expected: size,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { size, data })
    }

    /// Overwrites the entry at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: i32) {
        self.data[row * self.size + col] = value;
    }

    /// Entries of one row, in column order.
    pub fn row(&self, row: usize) -> &[i32] {
        &self.data[row * self.size..(row + 1) * self.size]
    }

    /// Number of non-zero entries, by full scan.
    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn to_csr(&self) -> CsrMatrix {
        CsrMatrix::from_dense(self)
    }
}

/// Compressed sparse row matrix.
///
/// Row `i` owns `values[row_offset[i]..row_offset[i + 1]]` with strictly
/// increasing column indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub size: usize,
    pub values: Vec<i32>,
    pub column_index: Vec<usize>,
    pub row_offset: Vec<usize>,
}

impl CsrMatrix {
    /// Builds the CSR form, counting non-zeros with a first pass.
    pub fn from_dense(dense: &DenseMatrix) -> Self {
        let nnz = dense.nnz();
        Self::from_dense_with_nnz(dense, nnz)
    }

    /// Builds the CSR form using a caller-supplied non-zero count.
    ///
    /// The count only sizes the buffers; it is not checked against the matrix.
    pub fn from_dense_with_nnz(dense: &DenseMatrix, nnz: usize) -> Self {
        let size = dense.size;
        let mut values = Vec::with_capacity(nnz);
        let mut column_index = Vec::with_capacity(nnz);
        let mut row_offset = Vec::with_capacity(size + 1);
        row_offset.push(0);

        for i in 0..size {
            for (j, &value) in dense.row(i).iter().enumerate() {
                if value != 0 {
                    values.push(value);
                    column_index.push(j);
                }
            }
            row_offset.push(values.len());
        }

        Self {
            size,
            values,
            column_index,
            row_offset,
        }
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Values and column indices of row `i`.
    pub fn row(&self, i: usize) -> (&[i32], &[usize]) {
        let span = self.row_offset[i]..self.row_offset[i + 1];
        (&self.values[span.clone()], &self.column_index[span])
    }

    /// Checks the structural invariants of a CSR triple received from elsewhere.
    pub fn validate(&self) -> Result<()> {
        if self.row_offset.len() != self.size + 1 {
            return Err(DistMulError::InvalidDimension {
                expected: self.size + 1,
                got: self.row_offset.len(),
            });
        }
        if self.values.len() != self.column_index.len() {
            return Err(DistMulError::MalformedCsr(format!(
                "{} values but {} column indices",
                self.values.len(),
                self.column_index.len()
            )));
        }
        if self.row_offset[0] != 0 || self.row_offset[self.size] != self.nnz() {
            return Err(DistMulError::MalformedCsr(format!(
                "row offsets must span [0, {}]",
                self.nnz()
            )));
        }
        if let Some(i) = self.row_offset.windows(2).position(|w| w[0] > w[1]) {
            return Err(DistMulError::MalformedCsr(format!(
                "row offsets decrease at row {i}"
            )));
        }
        for i in 0..self.size {
            let (_, cols) = self.row(i);
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                return Err(DistMulError::MalformedCsr(format!(
                    "column indices not strictly increasing in row {i}"
                )));
            }
            if cols.iter().any(|&c| c >= self.size) {
                return Err(DistMulError::MalformedCsr(format!(
                    "column index out of bounds in row {i}"
                )));
            }
        }
        Ok(())
    }

    /// Expands back to dense form; absent entries become zero.
    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros(self.size);
        for i in 0..self.size {
            let (values, cols) = self.row(i);
            for (&value, &col) in values.iter().zip(cols) {
                dense.set(i, col, value);
            }
        }
        dense
    }
}
