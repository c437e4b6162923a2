//! Dense row-major matrix over `ndarray`.

use ndarray::{s, Array2, ArrayView2};

/// Dense `f64` matrix with shape `(n_rows, n_cols)`.
///
/// Missing cells are NaN. Zero-width matrices still carry a row count so
/// that tables without attributes (or classes) keep a well-defined length.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Array2<f64>,
}

impl DenseMatrix {
    /// A matrix with every cell set to `value`.
    pub fn filled(n_rows: usize, n_cols: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((n_rows, n_cols), value),
        }
    }

    pub fn from_array(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Build from a row-major flat vector.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != n_rows * n_cols`.
    pub fn from_vec(data: Vec<f64>, n_rows: usize, n_cols: usize) -> Self {
        assert_eq!(
            data.len(),
            n_rows * n_cols,
            "data length {} does not match dimensions {}x{}",
            data.len(),
            n_rows,
            n_cols
        );
        Self {
            data: Array2::from_shape_vec((n_rows, n_cols), data)
                .expect("shape checked above"),
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[[row, col]]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[[row, col]] = value;
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn copy_column_into(&self, col: usize, out: &mut Vec<f64>) {
        out.clear();
        out.extend(self.data.column(col).iter().copied());
    }

    pub fn copy_row_into(&self, row: usize, out: &mut Vec<f64>) {
        out.clear();
        out.extend(self.data.row(row).iter().copied());
    }

    pub fn slice_rows(&self, rows: std::ops::Range<usize>) -> Self {
        Self {
            data: self.data.slice(s![rows, ..]).to_owned(),
        }
    }

    pub fn gather_rows(&self, rows: &[usize]) -> Self {
        let mut out = Array2::zeros((rows.len(), self.n_cols()));
        for (i, &r) in rows.iter().enumerate() {
            out.row_mut(i).assign(&self.data.row(r));
        }
        Self { data: out }
    }

    /// Grow (NaN-filled) or shrink the row count, preserving the prefix.
    pub fn resize_rows(&mut self, new_len: usize) {
        let old_len = self.n_rows();
        if new_len == old_len {
            return;
        }
        let mut grown = Array2::from_elem((new_len, self.n_cols()), f64::NAN);
        let keep = old_len.min(new_len);
        grown
            .slice_mut(s![..keep, ..])
            .assign(&self.data.slice(s![..keep, ..]));
        self.data = grown;
    }

    pub fn has_missing_in(&self, rows: std::ops::Range<usize>) -> bool {
        self.data.slice(s![rows, ..]).iter().any(|v| v.is_nan())
    }
}
