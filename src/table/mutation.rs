//! In-place mutation of a table.
//!
//! Every entry point here performs copy-on-write before touching storage,
//! and every multi-group resize is all-or-nothing: validation happens
//! before the first group changes shape, so a failed mutation leaves the
//! table exactly as it was.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{ColumnKey, ColumnLocation};
use crate::error::{DataError, Result};
use crate::storage::Matrix;
use crate::variable::is_missing;

use super::group::SharedGroup;
use super::{RowSelection, Table};

impl Table {
    /// Write one encoded cell.
    pub fn set_value<'a>(
        &mut self,
        row: usize,
        key: impl Into<ColumnKey<'a>>,
        value: f64,
    ) -> Result<()> {
        self.check_row(row)?;
        let idx = self.domain().index(key)?;
        let location = self.domain().locate(idx)?;
        match location {
            ColumnLocation::Attribute(col) => {
                Self::set_matrix_cell(self.x_group_mut(), row, col, value);
            }
            ColumnLocation::ClassVar(col) => {
                Self::set_matrix_cell(self.y_group_mut(), row, col, value);
            }
            ColumnLocation::Meta(col) => {
                let name = self.domain().get(idx)?.name().to_string();
                let group = self.metas_group_mut();
                group.ensure_owned();
                let abs = group.abs(row);
                if !group.make_mut().set_numeric(abs, col, value) {
                    return Err(DataError::StringColumn(name));
                }
            }
        }
        Ok(())
    }

    fn set_matrix_cell(group: &mut SharedGroup<Matrix>, row: usize, col: usize, value: f64) {
        group.ensure_owned();
        if group.storage().is_sparse() {
            log::warn!("densifying sparse storage for a scalar write");
        }
        let abs = group.abs(row);
        group.make_mut().set(abs, col, value);
    }

    /// Write one string meta cell.
    pub fn set_meta_string<'a>(
        &mut self,
        row: usize,
        key: impl Into<ColumnKey<'a>>,
        value: Option<String>,
    ) -> Result<()> {
        self.check_row(row)?;
        let idx = self.domain().index(key)?;
        let var = self.domain().get(idx)?;
        let (name, kind) = (var.name().to_string(), var.kind().name());
        match self.domain().locate(idx)? {
            ColumnLocation::Meta(col) => {
                let group = self.metas_group_mut();
                group.ensure_owned();
                let abs = group.abs(row);
                if group.make_mut().set_string(abs, col, value) {
                    Ok(())
                } else {
                    Err(DataError::KindMismatch {
                        name,
                        kind,
                        expected: "string",
                    })
                }
            }
            _ => Err(DataError::KindMismatch {
                name,
                kind,
                expected: "string",
            }),
        }
    }

    /// Set every row's weight to `value`, materializing the weight column
    /// on first use.
    pub fn set_weights(&mut self, value: f64) {
        let n = self.n_rows();
        self.weights_group_mut()
            .replace(SharedGroup::new(vec![value; n]));
    }

    /// Set one row's weight; an unweighted table first materializes all
    /// ones.
    pub fn set_row_weight(&mut self, row: usize, weight: f64) -> Result<()> {
        self.check_row(row)?;
        if !self.has_weights() {
            self.set_weights(1.0);
        }
        let group = self
            .weights_group_mut()
            .as_mut()
            .expect("weights materialized above");
        group.ensure_owned();
        let abs = group.abs(row);
        group.make_mut()[abs] = weight;
        Ok(())
    }

    /// Append a row of encoded attribute and class values; metas start
    /// missing, the weight (when the table is weighted) starts at 1.
    pub fn append(&mut self, values: &[f64]) -> Result<()> {
        self.insert(self.n_rows(), values)
    }

    /// Insert a row at `at`, shifting later rows down.
    ///
    /// The row is validated before any group changes shape, so a malformed
    /// row leaves the table untouched.
    pub fn insert(&mut self, at: usize, values: &[f64]) -> Result<()> {
        if at > self.n_rows() {
            return Err(DataError::RowOutOfRange {
                index: at,
                len: self.n_rows(),
            });
        }
        self.validate_row(values)?;

        let old_len = self.n_rows();
        self.ensure_owned();

        let n_attrs = self.domain().n_attributes();
        Self::insert_matrix_row(self.x_group_mut(), old_len, at, &values[..n_attrs]);
        Self::insert_matrix_row(self.y_group_mut(), old_len, at, &values[n_attrs..]);
        self.metas_group_mut().make_mut().insert_missing_row(at);
        if let Some(w) = self.weights_group_mut() {
            w.make_mut().insert(at, 1.0);
        }
        Ok(())
    }

    fn insert_matrix_row(
        group: &mut SharedGroup<Matrix>,
        old_len: usize,
        at: usize,
        values: &[f64],
    ) {
        let matrix = group.make_mut();
        if matrix.is_sparse() {
            log::warn!("densifying sparse storage to resize");
        }
        matrix.resize_rows(old_len + 1);
        for r in (at..old_len).rev() {
            for c in 0..matrix.n_cols() {
                let v = matrix.get(r, c);
                matrix.set(r + 1, c, v);
            }
        }
        for (c, &v) in values.iter().enumerate() {
            matrix.set(at, c, v);
        }
    }

    fn validate_row(&self, values: &[f64]) -> Result<()> {
        let expected = self.domain().n_variables();
        if values.len() != expected {
            return Err(DataError::RowLengthMismatch {
                expected,
                got: values.len(),
            });
        }
        for (var, &v) in self.domain().variables().zip(values) {
            if is_missing(v) {
                continue;
            }
            if let Some(labels) = var.values() {
                if v < 0.0 || v.fract() != 0.0 || (v as usize) >= labels.len() {
                    return Err(DataError::UnknownValue {
                        variable: var.name().to_string(),
                        value: v.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Append several rows. All rows are validated before the first one is
    /// written, so a malformed row leaves the table untouched.
    pub fn extend_rows<I, R>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let rows: Vec<R> = rows.into_iter().collect();
        for row in &rows {
            self.validate_row(row.as_ref())?;
        }
        for row in &rows {
            self.append(row.as_ref())?;
        }
        Ok(())
    }

    /// Append another table's rows. A table over a different domain is
    /// converted first; conversion failures happen before any resize.
    pub fn extend_table(&mut self, other: &Table) -> Result<()> {
        if **self.domain() != **other.domain() {
            let domain = std::sync::Arc::clone(self.domain());
            let converted = Table::from_table(&domain, other, &RowSelection::All)?;
            return self.extend_table(&converted);
        }

        let old_len = self.n_rows();
        let added = other.n_rows();
        self.ensure_owned();

        Self::extend_matrix(self.x_group_mut(), other.x_group(), old_len, added);
        Self::extend_matrix(self.y_group_mut(), other.y_group(), old_len, added);

        let other_metas = other.meta_storage();
        let other_meta_base = other.meta_abs(0);
        let metas = self.metas_group_mut().make_mut();
        metas.resize_rows(old_len + added);
        for col in 0..metas.n_cols() {
            for i in 0..added {
                let src = other_meta_base + i;
                if other_metas.is_string(col) {
                    let v = other_metas.strings(col).expect("kind checked")[src].clone();
                    metas.set_string(old_len + i, col, v);
                } else {
                    let v = other_metas.numeric(col).expect("kind checked")[src];
                    metas.set_numeric(old_len + i, col, v);
                }
            }
        }

        if self.has_weights() {
            let incoming: Vec<f64> = (0..added).map(|i| other.row_weight(i)).collect();
            let w = self
                .weights_group_mut()
                .as_mut()
                .expect("checked has_weights");
            w.make_mut().extend(incoming);
        }
        Ok(())
    }

    fn extend_matrix(
        group: &mut SharedGroup<Matrix>,
        other: &SharedGroup<Matrix>,
        old_len: usize,
        added: usize,
    ) {
        let matrix = group.make_mut();
        matrix.resize_rows(old_len + added);
        let src = other.storage();
        for i in 0..added {
            for c in 0..matrix.n_cols() {
                matrix.set(old_len + i, c, src.get(other.abs(i), c));
            }
        }
    }

    /// Remove the selected rows from all four groups in lock-step.
    pub fn delete_rows(&mut self, selection: &RowSelection) -> Result<()> {
        let len = self.n_rows();
        match selection {
            RowSelection::Range(r) if r.start > r.end || r.end > len => {
                return Err(DataError::InvalidSelection(format!(
                    "range {}..{} for {} rows",
                    r.start, r.end, len
                )))
            }
            RowSelection::Mask(mask) if mask.len() != len => {
                return Err(DataError::InvalidSelection(format!(
                    "mask of length {} for {} rows",
                    mask.len(),
                    len
                )))
            }
            _ => {}
        }
        let mut remove = vec![false; len];
        for i in selection.to_indices(len) {
            if i >= len {
                return Err(DataError::RowOutOfRange { index: i, len });
            }
            remove[i] = true;
        }
        let keep: Vec<usize> = (0..len).filter(|&i| !remove[i]).collect();
        self.take_rows(&keep);
        Ok(())
    }

    /// Remove all rows.
    pub fn clear(&mut self) {
        self.take_rows(&[]);
    }

    /// Randomly permute the rows of the table.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        order.shuffle(rng);
        self.take_rows(&order);
    }

    /// Rebuild every group from the given rows, in order.
    fn take_rows(&mut self, rows: &[usize]) {
        let abs_x: Vec<usize> = rows.iter().map(|&r| self.x_group().abs(r)).collect();
        let x = self.x_group().storage().gather_rows(&abs_x);
        let y = {
            let abs: Vec<usize> = rows.iter().map(|&r| self.y_group().abs(r)).collect();
            self.y_group().storage().gather_rows(&abs)
        };
        let metas = {
            let abs: Vec<usize> = rows.iter().map(|&r| self.meta_abs(r)).collect();
            self.meta_storage().gather_rows(&abs)
        };
        let weights = self
            .has_weights()
            .then(|| rows.iter().map(|&r| self.row_weight(r)).collect::<Vec<_>>());

        self.x_group_mut().replace(x);
        self.y_group_mut().replace(y);
        self.metas_group_mut().replace(metas);
        *self.weights_group_mut() = weights.map(SharedGroup::new);
    }
}
