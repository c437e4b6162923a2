//! Column-typed metadata storage.
//!
//! Meta columns are heterogeneous: discrete and continuous metas hold `f64`
//! codes like any other column, string metas hold owned strings. Each column
//! keeps its own missing sentinel (NaN vs. `None`).

use std::sync::Arc;

use crate::error::{DataError, Result};
use crate::storage::DenseMatrix;
use crate::variable::Variable;

/// One metadata column.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaColumn {
    Numeric(Vec<f64>),
    String(Vec<Option<String>>),
}

impl MetaColumn {
    pub fn len(&self) -> usize {
        match self {
            MetaColumn::Numeric(v) => v.len(),
            MetaColumn::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A column of `n_rows` missing cells matching the variable's kind.
    pub fn missing_for(var: &Variable, n_rows: usize) -> Self {
        if var.is_string() {
            MetaColumn::String(vec![None; n_rows])
        } else {
            MetaColumn::Numeric(vec![f64::NAN; n_rows])
        }
    }

    fn push_missing(&mut self) {
        match self {
            MetaColumn::Numeric(v) => v.push(f64::NAN),
            MetaColumn::String(v) => v.push(None),
        }
    }
}

/// The metadata group: columns of mixed type sharing one row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaStorage {
    columns: Vec<MetaColumn>,
    n_rows: usize,
}

impl MetaStorage {
    /// An all-missing group shaped for the given meta variables.
    pub fn missing_for(vars: &[Arc<Variable>], n_rows: usize) -> Self {
        Self {
            columns: vars
                .iter()
                .map(|v| MetaColumn::missing_for(v, n_rows))
                .collect(),
            n_rows,
        }
    }

    /// A zero-column group that still tracks its row count.
    pub fn empty(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            n_rows,
        }
    }

    /// Build from explicit columns, which must agree on length.
    pub fn from_columns(columns: Vec<MetaColumn>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, MetaColumn::len);
        for (i, col) in columns.iter().enumerate() {
            if col.len() != n_rows {
                return Err(DataError::RowCountMismatch {
                    role: "metas",
                    expected: n_rows,
                    got: columns[i].len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Adopt a dense numeric matrix as all-numeric meta columns.
    pub fn from_dense(dense: &DenseMatrix) -> Self {
        let mut columns = Vec::with_capacity(dense.n_cols());
        let mut buf = Vec::new();
        for col in 0..dense.n_cols() {
            dense.copy_column_into(col, &mut buf);
            columns.push(MetaColumn::Numeric(buf.clone()));
        }
        Self {
            columns,
            n_rows: dense.n_rows(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, col: usize) -> &MetaColumn {
        &self.columns[col]
    }

    pub fn is_string(&self, col: usize) -> bool {
        matches!(self.columns[col], MetaColumn::String(_))
    }

    pub fn numeric(&self, col: usize) -> Option<&[f64]> {
        match &self.columns[col] {
            MetaColumn::Numeric(v) => Some(v),
            MetaColumn::String(_) => None,
        }
    }

    pub fn strings(&self, col: usize) -> Option<&[Option<String>]> {
        match &self.columns[col] {
            MetaColumn::String(v) => Some(v),
            MetaColumn::Numeric(_) => None,
        }
    }

    pub fn get_numeric(&self, row: usize, col: usize) -> Option<f64> {
        self.numeric(col).map(|v| v[row])
    }

    pub fn get_string(&self, row: usize, col: usize) -> Option<Option<&str>> {
        self.strings(col).map(|v| v[row].as_deref())
    }

    /// Write a numeric cell; false when the column holds strings.
    pub fn set_numeric(&mut self, row: usize, col: usize, value: f64) -> bool {
        match &mut self.columns[col] {
            MetaColumn::Numeric(v) => {
                v[row] = value;
                true
            }
            MetaColumn::String(_) => false,
        }
    }

    /// Write a string cell; false when the column is numeric.
    pub fn set_string(&mut self, row: usize, col: usize, value: Option<String>) -> bool {
        match &mut self.columns[col] {
            MetaColumn::String(v) => {
                v[row] = value;
                true
            }
            MetaColumn::Numeric(_) => false,
        }
    }

    /// Is the cell missing under its column's native representation?
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        match &self.columns[col] {
            MetaColumn::Numeric(v) => v[row].is_nan(),
            MetaColumn::String(v) => v[row].is_none(),
        }
    }

    pub fn slice_rows(&self, rows: std::ops::Range<usize>) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| match col {
                MetaColumn::Numeric(v) => MetaColumn::Numeric(v[rows.clone()].to_vec()),
                MetaColumn::String(v) => MetaColumn::String(v[rows.clone()].to_vec()),
            })
            .collect();
        Self {
            columns,
            n_rows: rows.len(),
        }
    }

    pub fn gather_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| match col {
                MetaColumn::Numeric(v) => {
                    MetaColumn::Numeric(rows.iter().map(|&r| v[r]).collect())
                }
                MetaColumn::String(v) => {
                    MetaColumn::String(rows.iter().map(|&r| v[r].clone()).collect())
                }
            })
            .collect();
        Self {
            columns,
            n_rows: rows.len(),
        }
    }

    /// Grow (missing-filled) or shrink the row count, preserving the prefix.
    pub fn resize_rows(&mut self, new_len: usize) {
        for col in &mut self.columns {
            match col {
                MetaColumn::Numeric(v) => v.resize(new_len, f64::NAN),
                MetaColumn::String(v) => v.resize(new_len, None),
            }
        }
        self.n_rows = new_len;
    }

    /// Insert one all-missing row at `at`, shifting later rows down.
    pub fn insert_missing_row(&mut self, at: usize) {
        for col in &mut self.columns {
            match col {
                MetaColumn::Numeric(v) => v.insert(at, f64::NAN),
                MetaColumn::String(v) => v.insert(at, None),
            }
        }
        self.n_rows += 1;
    }

    /// Append one all-missing row.
    pub fn push_missing_row(&mut self) {
        for col in &mut self.columns {
            col.push_missing();
        }
        self.n_rows += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed() -> MetaStorage {
        MetaStorage::from_columns(vec![
            MetaColumn::Numeric(vec![1.0, f64::NAN, 3.0]),
            MetaColumn::String(vec![Some("a".into()), None, Some("c".into())]),
        ])
        .unwrap()
    }

    #[test]
    fn per_type_missing() {
        let vars = vec![
            Arc::new(Variable::continuous("m")),
            Arc::new(Variable::string("s")),
        ];
        let metas = MetaStorage::missing_for(&vars, 2);
        assert!(metas.get_numeric(0, 0).unwrap().is_nan());
        assert_eq!(metas.get_string(0, 1), Some(None));
        assert!(metas.is_missing(1, 0));
        assert!(metas.is_missing(1, 1));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = MetaStorage::from_columns(vec![
            MetaColumn::Numeric(vec![1.0]),
            MetaColumn::String(vec![None, None]),
        ])
        .unwrap_err();
        assert!(matches!(err, DataError::RowCountMismatch { .. }));
    }

    #[test]
    fn typed_writes_reject_cross_kind() {
        let mut metas = mixed();
        assert!(metas.set_numeric(0, 0, 9.0));
        assert!(!metas.set_numeric(0, 1, 9.0));
        assert!(metas.set_string(2, 1, None));
        assert!(!metas.set_string(2, 0, Some("x".into())));
        assert_eq!(metas.get_numeric(0, 0), Some(9.0));
        assert!(metas.is_missing(2, 1));
    }

    #[test]
    fn slice_and_gather_keep_types() {
        let metas = mixed();
        let sliced = metas.slice_rows(1..3);
        assert_eq!(sliced.n_rows(), 2);
        assert_eq!(sliced.get_string(1, 1), Some(Some("c")));

        let gathered = metas.gather_rows(&[2, 0]);
        assert_eq!(gathered.get_numeric(0, 0), Some(3.0));
        assert_eq!(gathered.get_string(1, 1), Some(Some("a")));
    }

    #[test]
    fn resize_fills_missing() {
        let mut metas = mixed();
        metas.resize_rows(5);
        assert_eq!(metas.n_rows(), 5);
        assert!(metas.is_missing(4, 0));
        assert!(metas.is_missing(4, 1));
        metas.resize_rows(1);
        assert_eq!(metas.n_rows(), 1);
    }
}
