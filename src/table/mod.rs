//! The core table: four column groups over one schema.
//!
//! A [`Table`] holds N rows across four independently stored groups —
//! attributes X, class variables Y, metadata M, and weights W — described
//! by a [`Domain`](crate::domain::Domain). X and Y are dense or sparse
//! numeric matrices; M is column-typed mixed storage; W is absent until
//! weights are first set.
//!
//! Tables are either owners or views. Row-range selection shares backing
//! storage (a view); every mutating entry point performs copy-on-write
//! first, so writes never travel through aliases.

mod group;
mod instance;
mod meta;
mod mutation;

pub use instance::{RowInstance, RowInstanceMut};
pub use meta::{MetaColumn, MetaStorage};

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;
use std::ops::Range;
use std::sync::Arc;

use ndarray::Array2;

use crate::domain::{ColumnConversion, ColumnKey, ColumnLocation, Domain};
use crate::error::{DataError, Result};
use crate::storage::{DenseMatrix, Matrix};
use crate::variable::Variable;

use group::SharedGroup;

/// A set of rows to select, in order.
#[derive(Debug, Clone)]
pub enum RowSelection {
    /// Every row.
    All,
    /// A contiguous window; selection shares storage when possible.
    Range(Range<usize>),
    /// Explicit indices; repeats are allowed. Always copies.
    Indices(Vec<usize>),
    /// One flag per row. Always copies.
    Mask(Vec<bool>),
}

impl RowSelection {
    fn validate(&self, len: usize) -> Result<()> {
        match self {
            RowSelection::All => Ok(()),
            RowSelection::Range(r) => {
                if r.start > r.end || r.end > len {
                    Err(DataError::InvalidSelection(format!(
                        "range {}..{} for {} rows",
                        r.start, r.end, len
                    )))
                } else {
                    Ok(())
                }
            }
            RowSelection::Indices(idx) => match idx.iter().find(|&&i| i >= len) {
                Some(&i) => Err(DataError::RowOutOfRange { index: i, len }),
                None => Ok(()),
            },
            RowSelection::Mask(mask) => {
                if mask.len() != len {
                    Err(DataError::InvalidSelection(format!(
                        "mask of length {} for {} rows",
                        mask.len(),
                        len
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The selected row indices, in selection order.
    pub(crate) fn to_indices(&self, len: usize) -> Vec<usize> {
        match self {
            RowSelection::All => (0..len).collect(),
            RowSelection::Range(r) => r.clone().collect(),
            RowSelection::Indices(idx) => idx.clone(),
            RowSelection::Mask(mask) => mask
                .iter()
                .enumerate()
                .filter_map(|(i, &keep)| keep.then_some(i))
                .collect(),
        }
    }

    /// The contiguous window this selection covers, if it is one.
    fn as_range(&self, len: usize) -> Option<Range<usize>> {
        match self {
            RowSelection::All => Some(0..len),
            RowSelection::Range(r) => Some(r.clone()),
            _ => None,
        }
    }
}

impl From<Range<usize>> for RowSelection {
    fn from(r: Range<usize>) -> Self {
        RowSelection::Range(r)
    }
}

impl From<Vec<usize>> for RowSelection {
    fn from(idx: Vec<usize>) -> Self {
        RowSelection::Indices(idx)
    }
}

impl From<Vec<bool>> for RowSelection {
    fn from(mask: Vec<bool>) -> Self {
        RowSelection::Mask(mask)
    }
}

/// The core dataset entity. See the [module docs](self).
#[derive(Debug, Clone)]
pub struct Table {
    domain: Arc<Domain>,
    x: SharedGroup<Matrix>,
    y: SharedGroup<Matrix>,
    metas: SharedGroup<MetaStorage>,
    weights: Option<SharedGroup<Vec<f64>>>,
}

impl Table {
    // =========================================================================
    // Construction
    // =========================================================================

    /// A table of `n_rows` all-missing rows over `domain`. When
    /// `with_weights` is set, every row starts with weight 1.
    pub fn from_domain(domain: &Arc<Domain>, n_rows: usize, with_weights: bool) -> Self {
        Self {
            domain: Arc::clone(domain),
            x: SharedGroup::new(Matrix::missing(n_rows, domain.n_attributes())),
            y: SharedGroup::new(Matrix::missing(n_rows, domain.n_class_vars())),
            metas: SharedGroup::new(MetaStorage::missing_for(domain.metas(), n_rows)),
            weights: with_weights.then(|| SharedGroup::new(vec![1.0; n_rows])),
        }
    }

    /// Wrap existing arrays. With a domain, column counts must agree with
    /// the schema exactly; without one, a domain is inferred per column.
    /// All groups must share one row count.
    pub fn from_arrays(
        domain: Option<Arc<Domain>>,
        x: Matrix,
        y: Option<Matrix>,
        metas: Option<MetaStorage>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self> {
        let n_rows = x.n_rows();
        let y = y.unwrap_or_else(|| Matrix::empty(n_rows));
        let metas = metas.unwrap_or_else(|| MetaStorage::empty(n_rows));

        let domain = match domain {
            Some(domain) => {
                Self::check_columns(&domain, &x, &y, &metas)?;
                domain
            }
            None => Self::infer_domain(&x, &y, &metas)?,
        };

        if y.n_rows() != n_rows {
            return Err(DataError::RowCountMismatch {
                role: "Y",
                expected: n_rows,
                got: y.n_rows(),
            });
        }
        if metas.n_rows() != n_rows {
            return Err(DataError::RowCountMismatch {
                role: "metas",
                expected: n_rows,
                got: metas.n_rows(),
            });
        }
        if let Some(w) = &weights {
            if w.len() != n_rows {
                return Err(DataError::RowCountMismatch {
                    role: "weights",
                    expected: n_rows,
                    got: w.len(),
                });
            }
        }

        Ok(Self {
            domain,
            x: SharedGroup::new(x),
            y: SharedGroup::new(y),
            metas: SharedGroup::new(metas),
            weights: weights.map(SharedGroup::new),
        })
    }

    fn check_columns(domain: &Domain, x: &Matrix, y: &Matrix, metas: &MetaStorage) -> Result<()> {
        if x.n_cols() != domain.n_attributes() {
            return Err(DataError::ColumnCountMismatch {
                role: "attributes",
                expected: domain.n_attributes(),
                got: x.n_cols(),
            });
        }
        if y.n_cols() != domain.n_class_vars() {
            return Err(DataError::ColumnCountMismatch {
                role: "class variables",
                expected: domain.n_class_vars(),
                got: y.n_cols(),
            });
        }
        if metas.n_cols() != domain.n_metas() {
            return Err(DataError::ColumnCountMismatch {
                role: "metas",
                expected: domain.n_metas(),
                got: metas.n_cols(),
            });
        }
        for (i, var) in domain.metas().iter().enumerate() {
            if var.is_string() != metas.is_string(i) {
                return Err(DataError::KindMismatch {
                    name: var.name().to_string(),
                    kind: if metas.is_string(i) { "string" } else { "numeric" },
                    expected: var.kind().name(),
                });
            }
        }
        Ok(())
    }

    fn infer_domain(x: &Matrix, y: &Matrix, metas: &MetaStorage) -> Result<Arc<Domain>> {
        let named = |prefix: &str, n: usize| -> Vec<Arc<Variable>> {
            (0..n)
                .map(|i| Arc::new(Variable::continuous(format!("{} {}", prefix, i + 1))))
                .collect()
        };
        let meta_vars = (0..metas.n_cols())
            .map(|i| {
                let name = format!("Meta {}", i + 1);
                Arc::new(if metas.is_string(i) {
                    Variable::string(name)
                } else {
                    Variable::continuous(name)
                })
            })
            .collect();
        Ok(Arc::new(Domain::new(
            named("Feature", x.n_cols()),
            named("Target", y.n_cols()),
            meta_vars,
        )?))
    }

    /// Select rows of this table. Contiguous selections share storage (the
    /// result is a view); index and mask selections copy. Callers must not
    /// assume either and should call [`ensure_owned`](Self::ensure_owned)
    /// before in-place mutation.
    pub fn select_rows(&self, selection: &RowSelection) -> Result<Self> {
        selection.validate(self.n_rows())?;
        if let Some(window) = selection.as_range(self.n_rows()) {
            return Ok(Self {
                domain: Arc::clone(&self.domain),
                x: self.x.view_window(window.clone()),
                y: self.y.view_window(window.clone()),
                metas: self.metas.view_window(window.clone()),
                weights: self.weights.as_ref().map(|w| w.view_window(window)),
            });
        }

        // translate per group: windows can differ after a partial
        // copy-on-write
        let rows = selection.to_indices(self.n_rows());
        let abs = |group_start: usize| -> Vec<usize> {
            rows.iter().map(|&r| group_start + r).collect()
        };
        Ok(Self {
            domain: Arc::clone(&self.domain),
            x: SharedGroup::new(self.x.storage().gather_rows(&abs(self.x.rows().start))),
            y: SharedGroup::new(self.y.storage().gather_rows(&abs(self.y.rows().start))),
            metas: SharedGroup::new(
                self.metas
                    .storage()
                    .gather_rows(&abs(self.metas.rows().start)),
            ),
            weights: self.weights.as_ref().map(|w| {
                let storage = w.storage();
                let start = w.rows().start;
                SharedGroup::new(rows.iter().map(|&r| storage[start + r]).collect::<Vec<_>>())
            }),
        })
    }

    /// Re-express `source` (or a row selection of it) in `domain`.
    ///
    /// With an equal domain this is plain row selection. Otherwise each
    /// destination column is copied, computed, or filled missing per the
    /// conversion plan; when a whole numeric group copies out of one sparse
    /// source group it stays sparse, anything else materializes dense.
    pub fn from_table(
        domain: &Arc<Domain>,
        source: &Table,
        selection: &RowSelection,
    ) -> Result<Self> {
        if **domain == *source.domain {
            let mut out = source.select_rows(selection)?;
            out.domain = Arc::clone(domain);
            return Ok(out);
        }

        selection.validate(source.n_rows())?;
        let rows = selection.to_indices(source.n_rows());
        let plan = domain.conversion(&source.domain);

        let x = source.materialize_numeric(&plan.attributes, &rows)?;
        let y = source.materialize_numeric(&plan.class_vars, &rows)?;
        let metas = source.materialize_metas(&plan.metas, domain.metas(), &rows)?;
        let weights = source
            .weights()
            .map(|w| rows.iter().map(|&r| w[r]).collect::<Vec<_>>());

        Ok(Self {
            domain: Arc::clone(domain),
            x: SharedGroup::new(x),
            y: SharedGroup::new(y),
            metas: SharedGroup::new(metas),
            weights: weights.map(SharedGroup::new),
        })
    }

    /// Select rows and columns at once. The chosen columns form a restricted
    /// domain that keeps every variable's role, then conversion applies.
    pub fn select<'a>(
        &self,
        selection: &RowSelection,
        columns: impl IntoIterator<Item = ColumnKey<'a>>,
    ) -> Result<Self> {
        let mut attrs = Vec::new();
        let mut class_vars = Vec::new();
        let mut metas = Vec::new();
        for key in columns {
            let idx = self.domain.index(key)?;
            let var = Arc::clone(self.domain.get(idx)?);
            match self.domain.locate(idx)? {
                ColumnLocation::Attribute(_) => attrs.push(var),
                ColumnLocation::ClassVar(_) => class_vars.push(var),
                ColumnLocation::Meta(_) => metas.push(var),
            }
        }
        let restricted = Arc::new(Domain::new(attrs, class_vars, metas)?);
        Self::from_table(&restricted, self, selection)
    }

    // -- conversion helpers ---------------------------------------------------

    /// Which of X and Y a logical index addresses, when it addresses a
    /// numeric matrix group at all.
    fn numeric_group_of(&self, location: ColumnLocation) -> Option<(&SharedGroup<Matrix>, usize)> {
        match location {
            ColumnLocation::Attribute(col) => Some((&self.x, col)),
            ColumnLocation::ClassVar(col) => Some((&self.y, col)),
            ColumnLocation::Meta(_) => None,
        }
    }

    fn materialize_numeric(&self, plan: &[ColumnConversion], rows: &[usize]) -> Result<Matrix> {
        // All-copy plans drawing on a single sparse source group keep the
        // compressed representation.
        if let Some(matrix) = self.try_sparse_gather(plan, rows)? {
            return Ok(matrix);
        }

        let mut out = Array2::from_elem((rows.len(), plan.len()), f64::NAN);
        for (j, conv) in plan.iter().enumerate() {
            match conv {
                ColumnConversion::Copy(src) => {
                    let (column, sparse) = self.get_column_view(*src)?;
                    if sparse {
                        log::warn!(
                            "densifying sparse column {} during domain conversion",
                            src
                        );
                    }
                    for (i, &r) in rows.iter().enumerate() {
                        out[[i, j]] = column[r];
                    }
                }
                ColumnConversion::Compute(f) => {
                    for (i, &r) in rows.iter().enumerate() {
                        out[[i, j]] = f(self, r);
                    }
                }
                ColumnConversion::Unknown => {}
            }
        }
        Ok(Matrix::Dense(DenseMatrix::from_array(out)))
    }

    fn try_sparse_gather(
        &self,
        plan: &[ColumnConversion],
        rows: &[usize],
    ) -> Result<Option<Matrix>> {
        if plan.is_empty() {
            return Ok(Some(Matrix::empty(rows.len())));
        }
        let mut cols = Vec::with_capacity(plan.len());
        let mut group: Option<&SharedGroup<Matrix>> = None;
        for conv in plan {
            let ColumnConversion::Copy(src) = conv else {
                return Ok(None);
            };
            let location = self.domain.locate(*src)?;
            let Some((src_group, col)) = self.numeric_group_of(location) else {
                return Ok(None);
            };
            match group {
                None => group = Some(src_group),
                Some(g) if std::ptr::eq(g, src_group) => {}
                Some(_) => return Ok(None),
            }
            cols.push(col);
        }
        let group = group.expect("plan is non-empty");
        let Matrix::Sparse(csc) = group.storage() else {
            return Ok(None);
        };
        let abs: Vec<usize> = rows.iter().map(|&r| group.abs(r)).collect();
        Ok(Some(Matrix::Sparse(
            csc.gather_rows(&abs).select_columns(&cols),
        )))
    }

    fn materialize_metas(
        &self,
        plan: &[ColumnConversion],
        dest_vars: &[Arc<Variable>],
        rows: &[usize],
    ) -> Result<MetaStorage> {
        let mut columns = Vec::with_capacity(plan.len());
        for (var, conv) in dest_vars.iter().zip(plan) {
            let column = match conv {
                ColumnConversion::Copy(src) => {
                    let location = self.domain.locate(*src)?;
                    if let ColumnLocation::Meta(col) = location {
                        if let Some(strings) = self.metas.storage().strings(col) {
                            let gathered = rows
                                .iter()
                                .map(|&r| strings[self.metas.abs(r)].clone())
                                .collect();
                            columns.push(MetaColumn::String(gathered));
                            continue;
                        }
                    }
                    let (values, _) = self.get_column_view(*src)?;
                    MetaColumn::Numeric(rows.iter().map(|&r| values[r]).collect())
                }
                ColumnConversion::Compute(f) if !var.is_string() => {
                    MetaColumn::Numeric(rows.iter().map(|&r| f(self, r)).collect())
                }
                _ => MetaColumn::missing_for(var, rows.len()),
            };
            columns.push(column);
        }
        MetaStorage::from_columns(columns)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn n_rows(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn n_attributes(&self) -> usize {
        self.domain.n_attributes()
    }

    pub fn n_class_vars(&self) -> usize {
        self.domain.n_class_vars()
    }

    pub fn n_metas(&self) -> usize {
        self.domain.n_metas()
    }

    /// The attribute group as a dense array copy, `(n_rows, n_attributes)`.
    pub fn x_array(&self) -> Array2<f64> {
        self.group_array(&self.x)
    }

    /// The class group as a dense array copy, `(n_rows, n_class_vars)`.
    pub fn y_array(&self) -> Array2<f64> {
        self.group_array(&self.y)
    }

    fn group_array(&self, group: &SharedGroup<Matrix>) -> Array2<f64> {
        let storage = group.storage();
        let mut out = Array2::zeros((group.len(), storage.n_cols()));
        for i in 0..group.len() {
            for j in 0..storage.n_cols() {
                out[[i, j]] = storage.get(group.abs(i), j);
            }
        }
        out
    }

    pub(crate) fn meta_storage(&self) -> &MetaStorage {
        self.metas.storage()
    }

    pub(crate) fn meta_abs(&self, row: usize) -> usize {
        self.metas.abs(row)
    }

    pub fn x_is_sparse(&self) -> bool {
        self.x.storage().is_sparse()
    }

    pub fn y_is_sparse(&self) -> bool {
        self.y.storage().is_sparse()
    }

    /// Per-row weights, when the table is weighted.
    ///
    /// An unweighted table behaves as if every row had weight 1 in every
    /// aggregate computation.
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights
            .as_ref()
            .map(|w| &w.storage()[w.rows()])
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// Weight of one row; 1 when unweighted.
    pub fn row_weight(&self, row: usize) -> f64 {
        match &self.weights {
            Some(w) => w.storage()[w.abs(row)],
            None => 1.0,
        }
    }

    /// Total weight: the sum of weights, or the row count when unweighted.
    pub fn total_weight(&self) -> f64 {
        match self.weights() {
            Some(w) => w.iter().sum(),
            None => self.n_rows() as f64,
        }
    }

    /// Any missing attribute or class cell?
    pub fn has_missing(&self) -> bool {
        self.x.storage().has_missing_in(self.x.rows())
            || self.y.storage().has_missing_in(self.y.rows())
    }

    /// Any missing class cell?
    pub fn has_missing_class(&self) -> bool {
        self.y.storage().has_missing_in(self.y.rows())
    }

    /// Scalar read of an encoded cell.
    pub fn value<'a>(&self, row: usize, key: impl Into<ColumnKey<'a>>) -> Result<f64> {
        self.check_row(row)?;
        let idx = self.domain.index(key)?;
        match self.domain.locate(idx)? {
            ColumnLocation::Attribute(col) => Ok(self.x.storage().get(self.x.abs(row), col)),
            ColumnLocation::ClassVar(col) => Ok(self.y.storage().get(self.y.abs(row), col)),
            ColumnLocation::Meta(col) => self
                .metas
                .storage()
                .get_numeric(self.metas.abs(row), col)
                .ok_or_else(|| DataError::StringColumn(self.domain.get(idx).unwrap().name().into())),
        }
    }

    /// Scalar read of a string meta cell.
    pub fn meta_string<'a>(
        &self,
        row: usize,
        key: impl Into<ColumnKey<'a>>,
    ) -> Result<Option<&str>> {
        self.check_row(row)?;
        let idx = self.domain.index(key)?;
        let var = self.domain.get(idx)?;
        match self.domain.locate(idx)? {
            ColumnLocation::Meta(col) if var.is_string() => Ok(self
                .metas
                .storage()
                .get_string(self.metas.abs(row), col)
                .expect("string column checked by kind")),
            _ => Err(DataError::KindMismatch {
                name: var.name().to_string(),
                kind: var.kind().name(),
                expected: "string",
            }),
        }
    }

    pub(crate) fn check_row(&self, row: usize) -> Result<()> {
        if row < self.n_rows() {
            Ok(())
        } else {
            Err(DataError::RowOutOfRange {
                index: row,
                len: self.n_rows(),
            })
        }
    }

    /// One column's values plus a flag telling whether the backing storage
    /// is sparse (where implicit zeros are values, and "zero means absent"
    /// heuristics apply to some formats). For sparse storage only the
    /// requested column is densified.
    pub fn get_column_view<'a>(&self, key: impl Into<ColumnKey<'a>>) -> Result<(Vec<f64>, bool)> {
        let idx = self.domain.index(key)?;
        match self.domain.locate(idx)? {
            ColumnLocation::Attribute(col) => Ok(Self::group_column(&self.x, col)),
            ColumnLocation::ClassVar(col) => Ok(Self::group_column(&self.y, col)),
            ColumnLocation::Meta(col) => {
                let storage = self.metas.storage();
                let values = storage.numeric(col).ok_or_else(|| {
                    DataError::StringColumn(self.domain.get(idx).unwrap().name().into())
                })?;
                Ok((values[self.metas.rows()].to_vec(), false))
            }
        }
    }

    fn group_column(group: &SharedGroup<Matrix>, col: usize) -> (Vec<f64>, bool) {
        match group.storage() {
            Matrix::Dense(m) => {
                let mut out = Vec::with_capacity(group.len());
                for r in group.rows() {
                    out.push(m.get(r, col));
                }
                (out, false)
            }
            Matrix::Sparse(m) => {
                let mut full = Vec::new();
                m.copy_column_into(col, &mut full);
                (full[group.rows()].to_vec(), true)
            }
        }
    }

    /// A string meta column's cells, in row order.
    pub fn string_column<'a>(&self, key: impl Into<ColumnKey<'a>>) -> Result<&[Option<String>]> {
        let idx = self.domain.index(key)?;
        match self.domain.locate(idx)? {
            ColumnLocation::Meta(col) => {
                let storage = self.metas.storage();
                let strings = storage.strings(col).ok_or_else(|| DataError::KindMismatch {
                    name: self.domain.get(idx).unwrap().name().to_string(),
                    kind: "numeric",
                    expected: "string",
                })?;
                Ok(&strings[self.metas.rows()])
            }
            _ => Err(DataError::KindMismatch {
                name: self.domain.get(idx).unwrap().name().to_string(),
                kind: self.domain.get(idx).unwrap().kind().name(),
                expected: "string",
            }),
        }
    }

    /// A read facade over one row.
    pub fn row(&self, row: usize) -> Result<RowInstance<'_>> {
        RowInstance::new(self, row)
    }

    /// A write facade over one row. Holding it borrows the table
    /// exclusively, so the row cannot be invalidated underneath it.
    pub fn row_mut(&mut self, row: usize) -> Result<RowInstanceMut<'_>> {
        RowInstanceMut::new(self, row)
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// True when every group shares storage with another table.
    pub fn is_view(&self) -> bool {
        self.x.is_view()
            && self.y.is_view()
            && self.metas.is_view()
            && self.weights.as_ref().map_or(true, |w| w.is_view())
    }

    /// True when every group exclusively owns its storage.
    pub fn is_copy(&self) -> bool {
        !self.x.is_view()
            && !self.y.is_view()
            && !self.metas.is_view()
            && self.weights.as_ref().map_or(true, |w| !w.is_view())
    }

    /// Break aliasing: after this call the table exclusively owns all four
    /// groups (copying whatever was shared).
    pub fn ensure_owned(&mut self) {
        self.x.ensure_owned();
        self.y.ensure_owned();
        self.metas.ensure_owned();
        if let Some(w) = &mut self.weights {
            w.ensure_owned();
        }
    }

    /// Content fingerprint over all four groups, for caller-side cache
    /// invalidation. Not a cryptographic hash.
    pub fn checksum(&self, include_metas: bool) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_usize(self.n_rows());
        for group in [&self.x, &self.y] {
            let storage = group.storage();
            hasher.write_usize(storage.n_cols());
            for r in group.rows() {
                for c in 0..storage.n_cols() {
                    hasher.write_u64(storage.get(r, c).to_bits());
                }
            }
        }
        if include_metas {
            let storage = self.metas.storage();
            for c in 0..storage.n_cols() {
                for r in self.metas.rows() {
                    match storage.column(c) {
                        MetaColumn::Numeric(v) => hasher.write_u64(v[r].to_bits()),
                        MetaColumn::String(v) => match &v[r] {
                            Some(s) => {
                                hasher.write_u8(1);
                                hasher.write(s.as_bytes());
                            }
                            None => hasher.write_u8(0),
                        },
                    }
                }
            }
        }
        match self.weights() {
            Some(w) => {
                hasher.write_u8(1);
                for &v in w {
                    hasher.write_u64(v.to_bits());
                }
            }
            None => hasher.write_u8(0),
        }
        hasher.finish()
    }

    /// The compressed column behind a logical location, when its group is
    /// sparse: (storage, column, absolute row window). Statistics count
    /// straight off this representation instead of densifying.
    pub(crate) fn sparse_column(
        &self,
        location: ColumnLocation,
    ) -> Option<(&crate::storage::CscMatrix, usize, Range<usize>)> {
        let (group, col) = self.numeric_group_of(location)?;
        match group.storage() {
            Matrix::Sparse(csc) => Some((csc, col, group.rows())),
            Matrix::Dense(_) => None,
        }
    }

    // group access for sibling modules
    pub(crate) fn x_group(&self) -> &SharedGroup<Matrix> {
        &self.x
    }

    pub(crate) fn y_group(&self) -> &SharedGroup<Matrix> {
        &self.y
    }

    pub(crate) fn x_group_mut(&mut self) -> &mut SharedGroup<Matrix> {
        &mut self.x
    }

    pub(crate) fn y_group_mut(&mut self) -> &mut SharedGroup<Matrix> {
        &mut self.y
    }

    pub(crate) fn metas_group_mut(&mut self) -> &mut SharedGroup<MetaStorage> {
        &mut self.metas
    }

    pub(crate) fn weights_group_mut(&mut self) -> &mut Option<SharedGroup<Vec<f64>>> {
        &mut self.weights
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for row in 0..self.n_rows().min(5) {
            let instance = self.row(row).map_err(|_| fmt::Error)?;
            writeln!(f, " {},", instance)?;
        }
        if self.n_rows() > 5 {
            writeln!(f, " ...")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CscMatrix;
    use crate::variable::MISSING;

    fn small_domain() -> Arc<Domain> {
        Arc::new(
            Domain::new(
                vec![
                    Arc::new(Variable::continuous("a")),
                    Arc::new(Variable::continuous("b")),
                ],
                vec![Arc::new(Variable::discrete("cls", ["no", "yes"]))],
                vec![Arc::new(Variable::string("note"))],
            )
            .unwrap(),
        )
    }

    fn small_table() -> Table {
        let domain = small_domain();
        let x = Matrix::Dense(DenseMatrix::from_vec(
            vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0],
            3,
            2,
        ));
        let y = Matrix::Dense(DenseMatrix::from_vec(vec![0.0, 1.0, MISSING], 3, 1));
        let metas = MetaStorage::from_columns(vec![MetaColumn::String(vec![
            Some("r0".into()),
            Some("r1".into()),
            None,
        ])])
        .unwrap();
        Table::from_arrays(Some(domain), x, Some(y), Some(metas), None).unwrap()
    }

    #[test]
    fn from_domain_is_all_missing() {
        let t = Table::from_domain(&small_domain(), 3, false);
        assert_eq!(t.n_rows(), 3);
        assert!(t.value(0, "a").unwrap().is_nan());
        assert!(t.value(2, "cls").unwrap().is_nan());
        assert_eq!(t.meta_string(0, "note").unwrap(), None);
        assert!(!t.has_weights());
        assert_eq!(t.total_weight(), 3.0);
    }

    #[test]
    fn from_domain_with_weights_is_all_ones() {
        let t = Table::from_domain(&small_domain(), 4, true);
        assert!(t.has_weights());
        assert_eq!(t.weights().unwrap(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(t.total_weight(), 4.0);
    }

    #[test]
    fn from_arrays_validates_columns() {
        let domain = small_domain();
        let x = Matrix::Dense(DenseMatrix::filled(3, 1, 0.0)); // needs 2 cols
        let err = Table::from_arrays(Some(domain), x, None, None, None).unwrap_err();
        assert!(matches!(
            err,
            DataError::ColumnCountMismatch { role: "attributes", .. }
        ));
    }

    #[test]
    fn from_arrays_validates_rows() {
        let domain = small_domain();
        let x = Matrix::Dense(DenseMatrix::filled(3, 2, 0.0));
        let y = Matrix::Dense(DenseMatrix::filled(2, 1, 0.0)); // 2 != 3 rows
        let metas = MetaStorage::from_columns(vec![MetaColumn::String(vec![None, None, None])])
            .unwrap();
        let err = Table::from_arrays(Some(domain), x, Some(y), Some(metas), None).unwrap_err();
        assert!(matches!(err, DataError::RowCountMismatch { role: "Y", .. }));
    }

    #[test]
    fn from_arrays_infers_domain() {
        let x = Matrix::Dense(DenseMatrix::filled(2, 3, 0.0));
        let t = Table::from_arrays(None, x, None, None, None).unwrap();
        assert_eq!(t.domain().n_attributes(), 3);
        assert_eq!(t.domain().attributes()[2].name(), "Feature 3");
    }

    #[test]
    fn scalar_reads_follow_addressing() {
        let t = small_table();
        assert_eq!(t.value(1, "a").unwrap(), 2.0);
        assert_eq!(t.value(1, "b").unwrap(), 20.0);
        assert_eq!(t.value(1, "cls").unwrap(), 1.0);
        assert_eq!(t.value(1, 2).unwrap(), 1.0);
        assert_eq!(t.meta_string(1, "note").unwrap(), Some("r1"));
        assert!(matches!(
            t.value(0, "note"),
            Err(DataError::StringColumn(_))
        ));
        assert!(matches!(
            t.value(9, "a"),
            Err(DataError::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn range_selection_is_view_and_matches_source() {
        let t = small_table();
        let v = t.select_rows(&RowSelection::Range(1..3)).unwrap();
        assert_eq!(v.n_rows(), 2);
        assert!(v.is_view());
        assert_eq!(v.value(0, "a").unwrap(), 2.0);
        assert_eq!(v.meta_string(0, "note").unwrap(), Some("r1"));

        let c = t.select_rows(&RowSelection::Indices(vec![2, 0])).unwrap();
        assert!(c.is_copy());
        assert_eq!(c.value(0, "a").unwrap(), 3.0);
        assert_eq!(c.value(1, "a").unwrap(), 1.0);
    }

    #[test]
    fn mask_selection_counts_rows() {
        let t = small_table();
        let m = t
            .select_rows(&RowSelection::Mask(vec![true, false, true]))
            .unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.value(1, "b").unwrap(), 30.0);
    }

    #[test]
    fn selection_out_of_range_is_rejected() {
        let t = small_table();
        assert!(t.select_rows(&RowSelection::Indices(vec![5])).is_err());
        assert!(t
            .select_rows(&RowSelection::Mask(vec![true]))
            .is_err());
    }

    #[test]
    fn conversion_to_superset_roundtrips() {
        let t = small_table();
        let src = t.domain();
        let extra = Arc::new(Variable::continuous("fresh"));
        let superset = Arc::new(
            Domain::new(
                vec![
                    Arc::clone(&src.attributes()[0]),
                    Arc::clone(&src.attributes()[1]),
                    extra,
                ],
                src.class_vars().to_vec(),
                src.metas().to_vec(),
            )
            .unwrap(),
        );

        let wide = Table::from_table(&superset, &t, &RowSelection::All).unwrap();
        assert_eq!(wide.n_rows(), 3);
        assert!(wide.value(0, "fresh").unwrap().is_nan());
        assert_eq!(wide.value(2, "a").unwrap(), 3.0);
        assert_eq!(wide.meta_string(0, "note").unwrap(), Some("r0"));

        let back = wide
            .select(&RowSelection::All, ["a".into(), "b".into(), "cls".into(), "note".into()])
            .unwrap();
        for row in 0..3 {
            for col in ["a", "b"] {
                assert_eq!(back.value(row, col).unwrap(), t.value(row, col).unwrap());
            }
        }
        assert_eq!(back.meta_string(2, "note").unwrap(), None);
    }

    #[test]
    fn computed_columns_use_row_function() {
        let t = small_table();
        let sum: crate::variable::ComputeFn =
            Arc::new(|table, row| table.value(row, "a").unwrap() + table.value(row, "b").unwrap());
        let dest = Arc::new(
            Domain::new(
                vec![Arc::new(Variable::continuous("a+b").with_compute(sum))],
                vec![],
                vec![],
            )
            .unwrap(),
        );
        let converted = Table::from_table(&dest, &t, &RowSelection::All).unwrap();
        assert_eq!(converted.value(0, "a+b").unwrap(), 11.0);
        assert_eq!(converted.value(2, "a+b").unwrap(), 33.0);
    }

    #[test]
    fn sparse_all_copy_conversion_stays_sparse() {
        let dense = DenseMatrix::from_vec(vec![1.0, 0.0, 0.0, 2.0, 3.0, 0.0], 3, 2);
        let x = Matrix::Sparse(CscMatrix::from_dense(&dense));
        let t = Table::from_arrays(None, x, None, None, None).unwrap();

        let narrowed = t
            .select(&RowSelection::Range(0..2), ["Feature 2".into()])
            .unwrap();
        assert!(narrowed.x_is_sparse());
        assert_eq!(narrowed.value(1, "Feature 2").unwrap(), 2.0);
    }

    #[test]
    fn column_view_reports_sparseness() {
        let dense = DenseMatrix::from_vec(vec![1.0, 0.0, 0.0, 2.0], 2, 2);
        let sparse = Table::from_arrays(None, Matrix::Sparse(CscMatrix::from_dense(&dense)), None, None, None)
            .unwrap();
        let (values, is_sparse) = sparse.get_column_view("Feature 1").unwrap();
        assert!(is_sparse);
        assert_eq!(values, vec![1.0, 0.0]);

        let t = small_table();
        let (values, is_sparse) = t.get_column_view("b").unwrap();
        assert!(!is_sparse);
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn checksum_tracks_content() {
        let t = small_table();
        let before = t.checksum(true);
        assert_eq!(before, small_table().checksum(true));

        let mut changed = small_table();
        changed.set_value(0, "a", 99.0).unwrap();
        assert_ne!(before, changed.checksum(true));

        // a meta-only edit is invisible when metas are excluded
        let mut meta_changed = small_table();
        meta_changed.set_meta_string(0, "note", Some("other".into())).unwrap();
        assert_eq!(t.checksum(false), meta_changed.checksum(false));
        assert_ne!(t.checksum(true), meta_changed.checksum(true));
    }

    #[test]
    fn display_shows_rows() {
        let t = small_table();
        let shown = format!("{}", t);
        assert!(shown.contains("1.000"));
        assert!(shown.contains("no"));
    }
}
