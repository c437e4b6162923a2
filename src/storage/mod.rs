//! Numeric column-group storage: dense and compressed sparse column.
//!
//! Both backends store `f64` cells with NaN as the missing sentinel and
//! expose the same capability surface, so tables and statistics never
//! branch on representation beyond a single dispatch point.

mod dense;
mod sparse;

pub use dense::DenseMatrix;
pub use sparse::{ColumnIter, CscMatrix};

/// Capability interface shared by the two storage kinds.
pub trait ColumnStore {
    fn n_rows(&self) -> usize;
    fn n_cols(&self) -> usize;
    /// Cell value at (row, col). Sparse storage reads unstored cells as 0.0.
    fn get(&self, row: usize, col: usize) -> f64;
    fn is_sparse(&self) -> bool;
    /// Densify one column into `out` (cleared first).
    fn copy_column_into(&self, col: usize, out: &mut Vec<f64>);
    /// Densify one row into `out` (cleared first).
    fn copy_row_into(&self, row: usize, out: &mut Vec<f64>);
}

/// A column group's backing matrix, selected at construction.
#[derive(Debug, Clone)]
pub enum Matrix {
    Dense(DenseMatrix),
    Sparse(CscMatrix),
}

impl Matrix {
    /// A dense group with every cell missing.
    pub fn missing(n_rows: usize, n_cols: usize) -> Self {
        Matrix::Dense(DenseMatrix::filled(n_rows, n_cols, f64::NAN))
    }

    /// A zero-width group that still tracks its row count.
    pub fn empty(n_rows: usize) -> Self {
        Matrix::Dense(DenseMatrix::filled(n_rows, 0, 0.0))
    }

    pub fn n_rows(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.n_rows(),
            Matrix::Sparse(m) => m.n_rows(),
        }
    }

    pub fn n_cols(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.n_cols(),
            Matrix::Sparse(m) => m.n_cols(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Matrix::Sparse(_))
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match self {
            Matrix::Dense(m) => m.get(row, col),
            Matrix::Sparse(m) => m.get(row, col),
        }
    }

    /// Write a cell. Sparse storage is densified first; writing into
    /// compressed storage would shift every later entry.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.make_dense();
        match self {
            Matrix::Dense(m) => m.set(row, col, value),
            Matrix::Sparse(_) => unreachable!("densified above"),
        }
    }

    pub fn copy_column_into(&self, col: usize, out: &mut Vec<f64>) {
        match self {
            Matrix::Dense(m) => m.copy_column_into(col, out),
            Matrix::Sparse(m) => m.copy_column_into(col, out),
        }
    }

    pub fn copy_row_into(&self, row: usize, out: &mut Vec<f64>) {
        match self {
            Matrix::Dense(m) => m.copy_row_into(row, out),
            Matrix::Sparse(m) => m.copy_row_into(row, out),
        }
    }

    /// Copy the given row window into fresh storage of the same kind.
    pub fn slice_rows(&self, rows: std::ops::Range<usize>) -> Self {
        match self {
            Matrix::Dense(m) => Matrix::Dense(m.slice_rows(rows)),
            Matrix::Sparse(m) => Matrix::Sparse(m.slice_rows(rows)),
        }
    }

    /// Copy the given rows, in order, into fresh storage of the same kind.
    pub fn gather_rows(&self, rows: &[usize]) -> Self {
        match self {
            Matrix::Dense(m) => Matrix::Dense(m.gather_rows(rows)),
            Matrix::Sparse(m) => Matrix::Sparse(m.gather_rows(rows)),
        }
    }

    /// Replace sparse storage with its dense equivalent; no-op when dense.
    pub fn make_dense(&mut self) {
        if let Matrix::Sparse(m) = self {
            *self = Matrix::Dense(m.to_dense());
        }
    }

    /// Grow or shrink the row count, filling new dense rows with NaN.
    /// Sparse storage is densified first (resizing compressed storage in
    /// place would leave new rows implicitly zero, not missing).
    pub fn resize_rows(&mut self, new_len: usize) {
        self.make_dense();
        if let Matrix::Dense(m) = self {
            m.resize_rows(new_len);
        }
    }

    /// Any NaN cell within the row window? Implicit sparse zeros are
    /// values, not missing.
    pub fn has_missing_in(&self, rows: std::ops::Range<usize>) -> bool {
        match self {
            Matrix::Dense(m) => m.has_missing_in(rows),
            Matrix::Sparse(m) => m.has_missing_in(rows),
        }
    }
}

impl ColumnStore for Matrix {
    fn n_rows(&self) -> usize {
        Matrix::n_rows(self)
    }
    fn n_cols(&self) -> usize {
        Matrix::n_cols(self)
    }
    fn get(&self, row: usize, col: usize) -> f64 {
        Matrix::get(self, row, col)
    }
    fn is_sparse(&self) -> bool {
        Matrix::is_sparse(self)
    }
    fn copy_column_into(&self, col: usize, out: &mut Vec<f64>) {
        Matrix::copy_column_into(self, col, out)
    }
    fn copy_row_into(&self, row: usize, out: &mut Vec<f64>) {
        Matrix::copy_row_into(self, row, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_matrix_is_all_nan() {
        let m = Matrix::missing(2, 3);
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 3);
        assert!(m.get(1, 2).is_nan());
        assert!(m.has_missing_in(0..2));
    }

    #[test]
    fn empty_matrix_tracks_rows() {
        let m = Matrix::empty(5);
        assert_eq!(m.n_rows(), 5);
        assert_eq!(m.n_cols(), 0);
        assert!(!m.has_missing_in(0..5));
    }

    #[test]
    fn set_densifies_sparse() {
        let dense = DenseMatrix::from_vec(vec![1.0, 0.0, 0.0, 2.0], 2, 2);
        let mut m = Matrix::Sparse(CscMatrix::from_dense(&dense));
        assert!(m.is_sparse());
        m.set(0, 1, 7.0);
        assert!(!m.is_sparse());
        assert_eq!(m.get(0, 1), 7.0);
        assert_eq!(m.get(1, 1), 2.0);
    }

    #[test]
    fn resize_fills_with_missing() {
        let mut m = Matrix::Dense(DenseMatrix::from_vec(vec![1.0, 2.0], 1, 2));
        m.resize_rows(3);
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.get(0, 0), 1.0);
        assert!(m.get(2, 1).is_nan());
        m.resize_rows(1);
        assert_eq!(m.n_rows(), 1);
    }
}
