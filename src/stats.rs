//! Weighted distributions and contingency tables.
//!
//! All aggregates weight each row by the table's weight column, defaulting
//! to 1 per row when the table is unweighted — an unweighted table and the
//! same table with explicit all-ones weights produce identical results.
//! Sparse columns are counted from the compressed representation: explicit
//! entries are tallied directly and the unstored remainder is credited to
//! the zero value, so sparse and dense storage agree exactly.

use ndarray::Array2;

use crate::domain::{ColumnKey, ColumnLocation};
use crate::error::{DataError, Result};
use crate::table::Table;
use crate::variable::{is_missing, Variable};

/// A weighted value distribution of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    /// Weighted count per category, in code order.
    Discrete { weights: Vec<f64>, missing: f64 },
    /// Ascending, duplicate-free `(value, total weight)` pairs.
    Continuous {
        values: Vec<(f64, f64)>,
        missing: f64,
    },
}

impl Distribution {
    /// Weight of rows whose cell is missing.
    pub fn missing_weight(&self) -> f64 {
        match self {
            Distribution::Discrete { missing, .. } => *missing,
            Distribution::Continuous { missing, .. } => *missing,
        }
    }

    /// Total weight of rows with a defined cell.
    pub fn defined_total(&self) -> f64 {
        match self {
            Distribution::Discrete { weights, .. } => weights.iter().sum(),
            Distribution::Continuous { values, .. } => values.iter().map(|&(_, w)| w).sum(),
        }
    }

    /// Per-category weights of a discrete distribution.
    pub fn category_weights(&self) -> Option<&[f64]> {
        match self {
            Distribution::Discrete { weights, .. } => Some(weights),
            _ => None,
        }
    }

    /// Sorted `(value, weight)` pairs of a continuous distribution.
    pub fn value_weights(&self) -> Option<&[(f64, f64)]> {
        match self {
            Distribution::Continuous { values, .. } => Some(values),
            _ => None,
        }
    }
}

/// Per-category distributions of one column against a discrete row
/// variable. Rows with a missing row-variable value are excluded entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Contingency {
    /// Weighted count matrix `(row categories, column categories)`, plus
    /// the per-row-category weight of missing column cells.
    Discrete {
        counts: Array2<f64>,
        missing: Vec<f64>,
    },
    /// Per row category, ascending duplicate-free `(value, weight)` pairs,
    /// plus the per-row-category missing weight.
    Continuous {
        values: Vec<Vec<(f64, f64)>>,
        missing: Vec<f64>,
    },
}

/// The category a code addresses, when it is a valid one of `k`.
fn category(code: f64, k: usize) -> Option<usize> {
    if is_missing(code) || code < 0.0 || code.fract() != 0.0 {
        return None;
    }
    let cat = code as usize;
    (cat < k).then_some(cat)
}

/// Sort `(value, weight)` pairs and merge equal values.
fn merge_sorted(mut pairs: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    pairs.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).expect("missing values tallied apart"));
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(pairs.len());
    for (v, w) in pairs {
        match out.last_mut() {
            Some(last) if last.0 == v => last.1 += w,
            _ => out.push((v, w)),
        }
    }
    out
}

impl Table {
    /// The weighted distribution of one column.
    ///
    /// Discrete columns produce per-category weights (a weighted bincount
    /// over codes); continuous columns produce sorted, merged
    /// `(value, weight)` pairs. Missing cells are tallied separately and
    /// never enter the category counts. Codes outside the variable's label
    /// range count as missing.
    pub fn distribution<'a>(&self, key: impl Into<ColumnKey<'a>>) -> Result<Distribution> {
        let idx = self.domain().index(key)?;
        let var = std::sync::Arc::clone(self.domain().get(idx)?);
        let location = self.domain().locate(idx)?;
        if var.is_discrete() {
            self.discrete_distribution(&var, location, idx)
        } else if var.is_continuous() {
            self.continuous_distribution(location, idx)
        } else {
            Err(DataError::KindMismatch {
                name: var.name().to_string(),
                kind: var.kind().name(),
                expected: "discrete or continuous",
            })
        }
    }

    fn discrete_distribution(
        &self,
        var: &Variable,
        location: ColumnLocation,
        idx: isize,
    ) -> Result<Distribution> {
        let k = var.n_values();
        let mut weights = vec![0.0; k];
        let mut missing = 0.0;

        if let Some((csc, col, window)) = self.sparse_column(location) {
            let mut explicit = 0.0;
            for (row, v) in csc.column(col) {
                if row < window.start || row >= window.end {
                    continue;
                }
                let w = self.row_weight(row - window.start);
                explicit += w;
                match category(v, k) {
                    Some(cat) => weights[cat] += w,
                    None => missing += w,
                }
            }
            // unstored cells are zeros: category 0
            let remainder = self.total_weight() - explicit;
            if remainder > 0.0 {
                if k > 0 {
                    weights[0] += remainder;
                } else {
                    missing += remainder;
                }
            }
        } else {
            let (column, _) = self.get_column_view(idx)?;
            for (r, &v) in column.iter().enumerate() {
                let w = self.row_weight(r);
                match category(v, k) {
                    Some(cat) => weights[cat] += w,
                    None => missing += w,
                }
            }
        }
        Ok(Distribution::Discrete { weights, missing })
    }

    fn continuous_distribution(&self, location: ColumnLocation, idx: isize) -> Result<Distribution> {
        let mut pairs: Vec<(f64, f64)> = Vec::new();
        let mut missing = 0.0;

        if let Some((csc, col, window)) = self.sparse_column(location) {
            let mut explicit_rows = 0usize;
            let mut explicit_weight = 0.0;
            for (row, v) in csc.column(col) {
                if row < window.start || row >= window.end {
                    continue;
                }
                let w = self.row_weight(row - window.start);
                explicit_rows += 1;
                explicit_weight += w;
                if is_missing(v) {
                    missing += w;
                } else {
                    pairs.push((v, w));
                }
            }
            let implicit_rows = window.len() - explicit_rows;
            if implicit_rows > 0 {
                pairs.push((0.0, self.total_weight() - explicit_weight));
            }
        } else {
            let (column, _) = self.get_column_view(idx)?;
            for (r, &v) in column.iter().enumerate() {
                let w = self.row_weight(r);
                if is_missing(v) {
                    missing += w;
                } else {
                    pairs.push((v, w));
                }
            }
        }
        Ok(Distribution::Continuous {
            values: merge_sorted(pairs),
            missing,
        })
    }

    /// Cross-tabulate one column against a discrete row variable.
    ///
    /// Per category of `row_key`, the distribution of `key` restricted to
    /// that category, with the same semantics as
    /// [`distribution`](Self::distribution) including per-category missing
    /// tallies. Rows whose row-variable cell is missing are excluded from
    /// every category.
    pub fn contingency<'a, 'b>(
        &self,
        key: impl Into<ColumnKey<'a>>,
        row_key: impl Into<ColumnKey<'b>>,
    ) -> Result<Contingency> {
        let row_idx = self.domain().index(row_key)?;
        let row_var = std::sync::Arc::clone(self.domain().get(row_idx)?);
        if !row_var.is_discrete() {
            return Err(DataError::RowVariableNotDiscrete(
                row_var.name().to_string(),
            ));
        }
        let n_cats = row_var.n_values();
        let (row_codes, _) = self.get_column_view(row_idx)?;

        let idx = self.domain().index(key)?;
        let var = std::sync::Arc::clone(self.domain().get(idx)?);
        let location = self.domain().locate(idx)?;

        if var.is_discrete() {
            self.discrete_contingency(&var, location, idx, &row_codes, n_cats)
        } else if var.is_continuous() {
            self.continuous_contingency(location, idx, &row_codes, n_cats)
        } else {
            Err(DataError::KindMismatch {
                name: var.name().to_string(),
                kind: var.kind().name(),
                expected: "discrete or continuous",
            })
        }
    }

    fn discrete_contingency(
        &self,
        var: &Variable,
        location: ColumnLocation,
        idx: isize,
        row_codes: &[f64],
        n_cats: usize,
    ) -> Result<Contingency> {
        let k = var.n_values();
        let mut counts = Array2::zeros((n_cats, k));
        let mut missing = vec![0.0; n_cats];

        if let Some((csc, col, window)) = self.sparse_column(location) {
            // single pass over the compressed column; the unstored
            // remainder per row category is credited to code 0
            let mut cat_totals = vec![0.0; n_cats];
            for (r, &rc) in row_codes.iter().enumerate() {
                if let Some(cat) = category(rc, n_cats) {
                    cat_totals[cat] += self.row_weight(r);
                }
            }
            let mut explicit = vec![0.0; n_cats];
            for (row, v) in csc.column(col) {
                if row < window.start || row >= window.end {
                    continue;
                }
                let r = row - window.start;
                let Some(cat) = category(row_codes[r], n_cats) else {
                    continue;
                };
                let w = self.row_weight(r);
                explicit[cat] += w;
                match category(v, k) {
                    Some(c) => counts[[cat, c]] += w,
                    None => missing[cat] += w,
                }
            }
            if k > 0 {
                for cat in 0..n_cats {
                    let remainder = cat_totals[cat] - explicit[cat];
                    if remainder > 0.0 {
                        counts[[cat, 0]] += remainder;
                    }
                }
            }
        } else {
            let (column, _) = self.get_column_view(idx)?;
            for (r, (&rc, &v)) in row_codes.iter().zip(&column).enumerate() {
                let Some(cat) = category(rc, n_cats) else {
                    continue;
                };
                let w = self.row_weight(r);
                match category(v, k) {
                    Some(c) => counts[[cat, c]] += w,
                    None => missing[cat] += w,
                }
            }
        }
        Ok(Contingency::Discrete { counts, missing })
    }

    fn continuous_contingency(
        &self,
        location: ColumnLocation,
        idx: isize,
        row_codes: &[f64],
        n_cats: usize,
    ) -> Result<Contingency> {
        let mut lists: Vec<Vec<(f64, f64)>> = vec![Vec::new(); n_cats];
        let mut missing = vec![0.0; n_cats];

        if let Some((csc, col, window)) = self.sparse_column(location) {
            let mut cat_rows = vec![0usize; n_cats];
            let mut cat_weights = vec![0.0; n_cats];
            for (r, &rc) in row_codes.iter().enumerate() {
                if let Some(cat) = category(rc, n_cats) {
                    cat_rows[cat] += 1;
                    cat_weights[cat] += self.row_weight(r);
                }
            }
            let mut explicit_rows = vec![0usize; n_cats];
            let mut explicit_weights = vec![0.0; n_cats];
            for (row, v) in csc.column(col) {
                if row < window.start || row >= window.end {
                    continue;
                }
                let r = row - window.start;
                let Some(cat) = category(row_codes[r], n_cats) else {
                    continue;
                };
                let w = self.row_weight(r);
                explicit_rows[cat] += 1;
                explicit_weights[cat] += w;
                if is_missing(v) {
                    missing[cat] += w;
                } else {
                    lists[cat].push((v, w));
                }
            }
            for cat in 0..n_cats {
                if cat_rows[cat] > explicit_rows[cat] {
                    lists[cat].push((0.0, cat_weights[cat] - explicit_weights[cat]));
                }
            }
        } else {
            let (column, _) = self.get_column_view(idx)?;
            for (r, (&rc, &v)) in row_codes.iter().zip(&column).enumerate() {
                let Some(cat) = category(rc, n_cats) else {
                    continue;
                };
                let w = self.row_weight(r);
                if is_missing(v) {
                    missing[cat] += w;
                } else {
                    lists[cat].push((v, w));
                }
            }
        }
        Ok(Contingency::Continuous {
            values: lists.into_iter().map(merge_sorted).collect(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::storage::{CscMatrix, DenseMatrix, Matrix};
    use crate::variable::{Variable, MISSING};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn gender_domain() -> Arc<Domain> {
        Arc::new(
            Domain::new(
                vec![Arc::new(Variable::continuous("x"))],
                vec![Arc::new(Variable::discrete("g", ["M", "F"]))],
                vec![],
            )
            .unwrap(),
        )
    }

    /// Rows: (M, 1.0), (F, 2.0), (M, missing).
    fn gender_table() -> Table {
        Table::from_arrays(
            Some(gender_domain()),
            Matrix::Dense(DenseMatrix::from_vec(vec![1.0, 2.0, MISSING], 3, 1)),
            Some(Matrix::Dense(DenseMatrix::from_vec(vec![0.0, 1.0, 0.0], 3, 1))),
            None,
            None,
        )
        .unwrap()
    }

    #[test]
    fn discrete_distribution_counts_categories() {
        let t = gender_table();
        let dist = t.distribution("g").unwrap();
        assert_eq!(dist.category_weights().unwrap(), &[2.0, 1.0]);
        assert_eq!(dist.missing_weight(), 0.0);
    }

    #[test]
    fn continuous_distribution_sorts_and_tallies_missing() {
        let t = gender_table();
        let dist = t.distribution("x").unwrap();
        assert_eq!(dist.value_weights().unwrap(), &[(1.0, 1.0), (2.0, 1.0)]);
        assert_eq!(dist.missing_weight(), 1.0);
    }

    #[test]
    fn distribution_weight_is_conserved() {
        let mut t = gender_table();
        t.set_weights(1.0);
        t.set_row_weight(0, 2.5).unwrap();
        for key in ["g", "x"] {
            let dist = t.distribution(key).unwrap();
            assert_abs_diff_eq!(
                dist.defined_total() + dist.missing_weight(),
                t.total_weight(),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn unweighted_equals_explicit_ones() {
        let t = gender_table();
        let mut ones = gender_table();
        ones.set_weights(1.0);
        assert_eq!(t.distribution("g").unwrap(), ones.distribution("g").unwrap());
        assert_eq!(t.distribution("x").unwrap(), ones.distribution("x").unwrap());
        assert_eq!(
            t.contingency("x", "g").unwrap(),
            ones.contingency("x", "g").unwrap()
        );
    }

    #[test]
    fn continuous_distribution_merges_duplicates() {
        let domain = Arc::new(
            Domain::new(vec![Arc::new(Variable::continuous("v"))], vec![], vec![]).unwrap(),
        );
        let t = Table::from_arrays(
            Some(domain),
            Matrix::Dense(DenseMatrix::from_vec(vec![3.0, 1.0, 3.0, 1.0, 2.0], 5, 1)),
            None,
            None,
            None,
        )
        .unwrap();
        let dist = t.distribution("v").unwrap();
        assert_eq!(
            dist.value_weights().unwrap(),
            &[(1.0, 2.0), (2.0, 1.0), (3.0, 2.0)]
        );
    }

    fn sparse_table(weighted: bool) -> (Table, Table) {
        // column with zeros, values, and a missing cell
        let dense = DenseMatrix::from_vec(
            vec![
                0.0, 1.0, // row 0
                2.0, 0.0, // row 1
                0.0, 1.0, // row 2
                MISSING, 0.0, // row 3
                2.0, 1.0, // row 4
            ],
            5,
            2,
        );
        let domain = Arc::new(
            Domain::new(
                vec![
                    Arc::new(Variable::continuous("a")),
                    Arc::new(Variable::discrete("d", ["zero", "one"])),
                ],
                vec![],
                vec![],
            )
            .unwrap(),
        );
        let weights = weighted.then(|| vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let as_dense = Table::from_arrays(
            Some(Arc::clone(&domain)),
            Matrix::Dense(dense.clone()),
            None,
            None,
            weights.clone(),
        )
        .unwrap();
        let as_sparse = Table::from_arrays(
            Some(domain),
            Matrix::Sparse(CscMatrix::from_dense(&dense)),
            None,
            None,
            weights,
        )
        .unwrap();
        (as_dense, as_sparse)
    }

    #[test]
    fn sparse_and_dense_distributions_agree() {
        for weighted in [false, true] {
            let (dense, sparse) = sparse_table(weighted);
            for key in ["a", "d"] {
                let d = dense.distribution(key).unwrap();
                let s = sparse.distribution(key).unwrap();
                match (d, s) {
                    (
                        Distribution::Discrete { weights: dw, missing: dm },
                        Distribution::Discrete { weights: sw, missing: sm },
                    ) => {
                        for (a, b) in dw.iter().zip(&sw) {
                            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
                        }
                        assert_abs_diff_eq!(dm, sm, epsilon = 1e-12);
                    }
                    (
                        Distribution::Continuous { values: dv, missing: dm },
                        Distribution::Continuous { values: sv, missing: sm },
                    ) => {
                        assert_eq!(dv.len(), sv.len());
                        for (a, b) in dv.iter().zip(&sv) {
                            assert_abs_diff_eq!(a.0, b.0, epsilon = 1e-12);
                            assert_abs_diff_eq!(a.1, b.1, epsilon = 1e-12);
                        }
                        assert_abs_diff_eq!(dm, sm, epsilon = 1e-12);
                    }
                    _ => panic!("storage kind changed the distribution kind"),
                }
            }
        }
    }

    #[test]
    fn contingency_requires_discrete_row_variable() {
        let t = gender_table();
        let err = t.contingency("g", "x").unwrap_err();
        assert!(matches!(err, DataError::RowVariableNotDiscrete(_)));
    }

    #[test]
    fn continuous_contingency_splits_by_category() {
        let t = gender_table();
        let Contingency::Continuous { values, missing } = t.contingency("x", "g").unwrap() else {
            panic!("expected continuous contingency");
        };
        // M rows: x = 1.0 and missing; F rows: x = 2.0
        assert_eq!(values[0], vec![(1.0, 1.0)]);
        assert_eq!(values[1], vec![(2.0, 1.0)]);
        assert_eq!(missing, vec![1.0, 0.0]);
    }

    #[test]
    fn discrete_contingency_matches_distribution_row_sums() {
        let domain = Arc::new(
            Domain::new(
                vec![Arc::new(Variable::discrete("color", ["r", "g", "b"]))],
                vec![Arc::new(Variable::discrete("cls", ["no", "yes"]))],
                vec![],
            )
            .unwrap(),
        );
        let x = Matrix::Dense(DenseMatrix::from_vec(
            vec![0.0, 1.0, 2.0, 0.0, MISSING, 1.0],
            6,
            1,
        ));
        let y = Matrix::Dense(DenseMatrix::from_vec(
            vec![0.0, 0.0, 1.0, 1.0, 0.0, MISSING],
            6,
            1,
        ));
        let t = Table::from_arrays(Some(domain), x, Some(y), None, None).unwrap();

        let Contingency::Discrete { counts, missing } = t.contingency("color", "cls").unwrap()
        else {
            panic!("expected discrete contingency");
        };
        assert_eq!(counts.shape(), &[2, 3]);
        // cls=no rows: color r, g, missing
        assert_eq!(counts.row(0).to_vec(), vec![1.0, 1.0, 0.0]);
        assert_eq!(missing[0], 1.0);
        // cls=yes rows: color b, r
        assert_eq!(counts.row(1).to_vec(), vec![1.0, 0.0, 1.0]);
        assert_eq!(missing[1], 0.0);

        // row sums reproduce the distribution over rows with a defined cls
        let defined = t.filter_has_class(false).unwrap();
        let dist = defined.distribution("color").unwrap();
        let sums: Vec<f64> = (0..3).map(|c| counts.column(c).sum()).collect();
        assert_eq!(sums, dist.category_weights().unwrap());
    }

    #[test]
    fn sparse_discrete_contingency_agrees_with_dense() {
        let domain = Arc::new(
            Domain::new(
                vec![Arc::new(Variable::discrete("d", ["zero", "one"]))],
                vec![Arc::new(Variable::discrete("cls", ["a", "b"]))],
                vec![],
            )
            .unwrap(),
        );
        let x = DenseMatrix::from_vec(vec![1.0, 0.0, 1.0, 0.0, MISSING], 5, 1);
        let y = DenseMatrix::from_vec(vec![0.0, 1.0, 1.0, 0.0, 0.0], 5, 1);

        let dt = Table::from_arrays(
            Some(Arc::clone(&domain)),
            Matrix::Dense(x.clone()),
            Some(Matrix::Dense(y.clone())),
            None,
            None,
        )
        .unwrap();
        let st = Table::from_arrays(
            Some(domain),
            Matrix::Sparse(CscMatrix::from_dense(&x)),
            Some(Matrix::Dense(y)),
            None,
            None,
        )
        .unwrap();

        assert_eq!(
            dt.contingency("d", "cls").unwrap(),
            st.contingency("d", "cls").unwrap()
        );
    }

    #[test]
    fn rows_with_missing_row_variable_are_excluded() {
        let domain = Arc::new(
            Domain::new(
                vec![Arc::new(Variable::continuous("x"))],
                vec![Arc::new(Variable::discrete("g", ["M", "F"]))],
                vec![],
            )
            .unwrap(),
        );
        let x = Matrix::Dense(DenseMatrix::from_vec(vec![1.0, 2.0, 3.0], 3, 1));
        let y = Matrix::Dense(DenseMatrix::from_vec(vec![0.0, MISSING, 1.0], 3, 1));
        let t = Table::from_arrays(Some(domain), x, Some(y), None, None).unwrap();

        let Contingency::Continuous { values, missing } = t.contingency("x", "g").unwrap() else {
            panic!("expected continuous contingency");
        };
        assert_eq!(values[0], vec![(1.0, 1.0)]);
        assert_eq!(values[1], vec![(3.0, 1.0)]);
        assert_eq!(missing, vec![0.0, 0.0]);
    }
}
