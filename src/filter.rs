//! Declarative row filters.
//!
//! A [`Filter`] combines per-column [`Condition`]s under conjunction or
//! disjunction and produces a new table by row selection — never by
//! mutating the source. Combination is commutative and associative, so
//! evaluation order cannot change the result.
//!
//! Missing cells never satisfy a positive predicate; a negated condition
//! selects the complement, so missing cells do satisfy negations.

use crate::domain::ColumnKey;
use crate::error::{DataError, Result};
use crate::table::{RowSelection, Table};
use crate::variable::is_missing;

/// How a filter's conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Combine {
    /// Conjunction: start from all-true, AND each condition in.
    #[default]
    All,
    /// Disjunction: start from all-false, OR each condition in.
    Any,
}

/// Comparison operator for continuous columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContinuousOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `min <= v <= max`.
    Between,
    /// `v < min || v > max`.
    Outside,
}

/// Match operator for string columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StringOp {
    Equal,
    Contains,
    StartsWith,
    EndsWith,
}

/// A stored column reference, resolved against the table's domain when the
/// filter runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnSel {
    Index(isize),
    Name(String),
}

impl From<isize> for ColumnSel {
    fn from(idx: isize) -> Self {
        ColumnSel::Index(idx)
    }
}

impl From<&str> for ColumnSel {
    fn from(name: &str) -> Self {
        ColumnSel::Name(name.to_string())
    }
}

impl From<String> for ColumnSel {
    fn from(name: String) -> Self {
        ColumnSel::Name(name)
    }
}

impl ColumnSel {
    fn key(&self) -> ColumnKey<'_> {
        match self {
            ColumnSel::Index(idx) => ColumnKey::Index(*idx),
            ColumnSel::Name(name) => ColumnKey::Name(name),
        }
    }
}

/// A discrete filter value: an encoded code or a label resolved against
/// the column's variable when the filter runs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterValue {
    Code(f64),
    Label(String),
}

/// What a single-column condition tests.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionKind {
    /// Cell is one of the given discrete values.
    DiscreteSet(Vec<FilterValue>),
    /// Cell compares against the threshold(s). `max` is read only by
    /// `Between` and `Outside`.
    Continuous {
        op: ContinuousOp,
        min: f64,
        max: f64,
    },
    /// Cell matches the text under the given operator.
    StringMatch {
        op: StringOp,
        text: String,
        case_sensitive: bool,
    },
    /// Cell has a non-missing value under the column's native missing
    /// representation.
    IsDefined,
}

/// A per-column predicate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    pub column: ColumnSel,
    pub kind: ConditionKind,
    pub negate: bool,
}

impl Condition {
    pub fn new(column: impl Into<ColumnSel>, kind: ConditionKind) -> Self {
        Self {
            column: column.into(),
            kind,
            negate: false,
        }
    }

    /// Discrete membership by code.
    pub fn discrete_codes(
        column: impl Into<ColumnSel>,
        codes: impl IntoIterator<Item = f64>,
    ) -> Self {
        Self::new(
            column,
            ConditionKind::DiscreteSet(codes.into_iter().map(FilterValue::Code).collect()),
        )
    }

    /// Discrete membership by label.
    pub fn discrete_labels<S: Into<String>>(
        column: impl Into<ColumnSel>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            column,
            ConditionKind::DiscreteSet(
                labels
                    .into_iter()
                    .map(|l| FilterValue::Label(l.into()))
                    .collect(),
            ),
        )
    }

    /// Single-threshold continuous comparison.
    pub fn continuous(column: impl Into<ColumnSel>, op: ContinuousOp, threshold: f64) -> Self {
        Self::new(
            column,
            ConditionKind::Continuous {
                op,
                min: threshold,
                max: threshold,
            },
        )
    }

    /// Two-threshold continuous comparison (`Between` / `Outside`).
    pub fn continuous_range(
        column: impl Into<ColumnSel>,
        op: ContinuousOp,
        min: f64,
        max: f64,
    ) -> Self {
        Self::new(column, ConditionKind::Continuous { op, min, max })
    }

    /// String match.
    pub fn string_match(
        column: impl Into<ColumnSel>,
        op: StringOp,
        text: impl Into<String>,
        case_sensitive: bool,
    ) -> Self {
        Self::new(
            column,
            ConditionKind::StringMatch {
                op,
                text: text.into(),
                case_sensitive,
            },
        )
    }

    /// The cell is defined (non-missing).
    pub fn is_defined(column: impl Into<ColumnSel>) -> Self {
        Self::new(column, ConditionKind::IsDefined)
    }

    /// Invert this condition.
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Evaluate to a per-row mask.
    fn mask(&self, table: &Table) -> Result<Vec<bool>> {
        let idx = table.domain().index(self.column.key())?;
        let var = table.domain().get(idx)?;
        let mut mask = match &self.kind {
            ConditionKind::DiscreteSet(values) => {
                if !var.is_discrete() {
                    return Err(DataError::KindMismatch {
                        name: var.name().to_string(),
                        kind: var.kind().name(),
                        expected: "discrete",
                    });
                }
                let codes: Vec<f64> = values
                    .iter()
                    .map(|v| match v {
                        FilterValue::Code(c) => Ok(*c),
                        FilterValue::Label(l) => var.to_code(l),
                    })
                    .collect::<Result<_>>()?;
                let (column, _) = table.get_column_view(idx)?;
                column
                    .iter()
                    .map(|&v| !is_missing(v) && codes.iter().any(|&c| c == v))
                    .collect()
            }
            ConditionKind::Continuous { op, min, max } => {
                if !var.is_continuous() {
                    return Err(DataError::KindMismatch {
                        name: var.name().to_string(),
                        kind: var.kind().name(),
                        expected: "continuous",
                    });
                }
                let (column, _) = table.get_column_view(idx)?;
                column
                    .iter()
                    .map(|&v| !is_missing(v) && compare(*op, v, *min, *max))
                    .collect()
            }
            ConditionKind::StringMatch {
                op,
                text,
                case_sensitive,
            } => {
                let column = table.string_column(idx)?;
                let needle = if *case_sensitive {
                    text.clone()
                } else {
                    text.to_lowercase()
                };
                column
                    .iter()
                    .map(|cell| match cell {
                        None => false,
                        Some(s) => {
                            let hay = if *case_sensitive {
                                s.clone()
                            } else {
                                s.to_lowercase()
                            };
                            match op {
                                StringOp::Equal => hay == needle,
                                StringOp::Contains => hay.contains(&needle),
                                StringOp::StartsWith => hay.starts_with(&needle),
                                StringOp::EndsWith => hay.ends_with(&needle),
                            }
                        }
                    })
                    .collect()
            }
            ConditionKind::IsDefined => defined_mask(table, idx)?,
        };
        if self.negate {
            for cell in &mut mask {
                *cell = !*cell;
            }
        }
        Ok(mask)
    }
}

fn compare(op: ContinuousOp, v: f64, min: f64, max: f64) -> bool {
    match op {
        ContinuousOp::Equal => v == min,
        ContinuousOp::NotEqual => v != min,
        ContinuousOp::Less => v < min,
        ContinuousOp::LessEqual => v <= min,
        ContinuousOp::Greater => v > min,
        ContinuousOp::GreaterEqual => v >= min,
        ContinuousOp::Between => v >= min && v <= max,
        ContinuousOp::Outside => v < min || v > max,
    }
}

/// Defined-ness under the column's native missing representation: NaN for
/// dense numeric cells, `None` for strings. For sparse columns an implicit
/// zero counts as absent (the compressed formats that feed sparse groups
/// leave unlisted cells out).
fn defined_mask(table: &Table, idx: isize) -> Result<Vec<bool>> {
    let var = table.domain().get(idx)?;
    if var.is_string() {
        return Ok(table
            .string_column(idx)?
            .iter()
            .map(|cell| cell.is_some())
            .collect());
    }
    let (column, sparse) = table.get_column_view(idx)?;
    Ok(column
        .iter()
        .map(|&v| {
            if sparse {
                v != 0.0 && !is_missing(v)
            } else {
                !is_missing(v)
            }
        })
        .collect())
}

/// A composite filter over several single-column conditions.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Filter {
    pub combine: Combine,
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Conjunction of conditions.
    pub fn all() -> Self {
        Self {
            combine: Combine::All,
            conditions: Vec::new(),
        }
    }

    /// Disjunction of conditions.
    pub fn any() -> Self {
        Self {
            combine: Combine::Any,
            conditions: Vec::new(),
        }
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// The row mask this filter selects on `table`.
    pub fn mask(&self, table: &Table) -> Result<Vec<bool>> {
        let mut mask = vec![self.combine == Combine::All; table.n_rows()];
        for condition in &self.conditions {
            let cond_mask = condition.mask(table)?;
            match self.combine {
                Combine::All => {
                    for (m, c) in mask.iter_mut().zip(cond_mask) {
                        *m = *m && c;
                    }
                }
                Combine::Any => {
                    for (m, c) in mask.iter_mut().zip(cond_mask) {
                        *m = *m || c;
                    }
                }
            }
        }
        Ok(mask)
    }

    /// Select the matching rows into a new table.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        let mask = self.mask(table)?;
        table.select_rows(&RowSelection::Mask(mask))
    }
}

impl Table {
    /// Apply a composite filter; the result is a new table.
    pub fn filter(&self, filter: &Filter) -> Result<Table> {
        filter.apply(self)
    }

    /// Rows whose listed columns (all attributes and classes, when `None`)
    /// are defined. `negate` selects the complement.
    pub fn filter_is_defined(&self, columns: Option<&[ColumnSel]>, negate: bool) -> Result<Table> {
        let mut filter = Filter::all();
        match columns {
            Some(columns) => {
                for column in columns {
                    filter = filter.with(Condition::is_defined(column.clone()));
                }
            }
            None => {
                let n_vars = self.domain().n_variables();
                for idx in 0..n_vars {
                    filter = filter.with(Condition::is_defined(idx as isize));
                }
            }
        }
        let mut mask = filter.mask(self)?;
        if negate {
            for cell in &mut mask {
                *cell = !*cell;
            }
        }
        self.select_rows(&RowSelection::Mask(mask))
    }

    /// Rows with every class value defined. `negate` selects the complement.
    pub fn filter_has_class(&self, negate: bool) -> Result<Table> {
        let n_attrs = self.domain().n_attributes();
        let columns: Vec<ColumnSel> = (0..self.domain().n_class_vars())
            .map(|i| ColumnSel::Index((n_attrs + i) as isize))
            .collect();
        self.filter_is_defined(Some(&columns), negate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::storage::{CscMatrix, DenseMatrix, Matrix};
    use crate::table::{MetaColumn, MetaStorage};
    use crate::variable::{Variable, MISSING};
    use std::sync::Arc;

    fn table() -> Table {
        let domain = Arc::new(
            Domain::new(
                vec![Arc::new(Variable::continuous("x"))],
                vec![Arc::new(Variable::discrete("g", ["M", "F"]))],
                vec![Arc::new(Variable::string("name"))],
            )
            .unwrap(),
        );
        Table::from_arrays(
            Some(domain),
            Matrix::Dense(DenseMatrix::from_vec(vec![1.0, 2.0, MISSING, 4.0], 4, 1)),
            Some(Matrix::Dense(DenseMatrix::from_vec(
                vec![0.0, 1.0, 0.0, MISSING],
                4,
                1,
            ))),
            Some(
                MetaStorage::from_columns(vec![MetaColumn::String(vec![
                    Some("Ann".into()),
                    Some("Bob".into()),
                    None,
                    Some("annabel".into()),
                ])])
                .unwrap(),
            ),
            None,
        )
        .unwrap()
    }

    #[test]
    fn discrete_set_selects_codes_and_labels() {
        let t = table();
        let by_code = t
            .filter(&Filter::all().with(Condition::discrete_codes("g", [0.0])))
            .unwrap();
        assert_eq!(by_code.n_rows(), 2);
        assert_eq!(by_code.value(0, "x").unwrap(), 1.0);
        assert!(by_code.value(1, "x").unwrap().is_nan());

        let by_label = t
            .filter(&Filter::all().with(Condition::discrete_labels("g", ["M"])))
            .unwrap();
        assert_eq!(by_label.n_rows(), 2);

        let unknown = t.filter(&Filter::all().with(Condition::discrete_labels("g", ["Z"])));
        assert!(matches!(unknown, Err(DataError::UnknownValue { .. })));
    }

    #[test]
    fn discrete_set_on_continuous_column_is_rejected() {
        let t = table();
        let err = t
            .filter(&Filter::all().with(Condition::discrete_codes("x", [1.0])))
            .unwrap_err();
        assert!(matches!(err, DataError::KindMismatch { .. }));
    }

    #[test]
    fn continuous_operators() {
        let t = table();
        let le2 = Filter::all().with(Condition::continuous("x", ContinuousOp::LessEqual, 2.0));
        assert_eq!(t.filter(&le2).unwrap().n_rows(), 2);

        let between = Filter::all().with(Condition::continuous_range(
            "x",
            ContinuousOp::Between,
            2.0,
            4.0,
        ));
        assert_eq!(t.filter(&between).unwrap().n_rows(), 2);

        let outside = Filter::all().with(Condition::continuous_range(
            "x",
            ContinuousOp::Outside,
            1.5,
            3.0,
        ));
        let picked = t.filter(&outside).unwrap();
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.value(0, "x").unwrap(), 1.0);
        assert_eq!(picked.value(1, "x").unwrap(), 4.0);

        // missing never satisfies a positive comparison
        let ne = Filter::all().with(Condition::continuous("x", ContinuousOp::NotEqual, 1.0));
        assert_eq!(t.filter(&ne).unwrap().n_rows(), 2);
    }

    #[test]
    fn string_matching_and_case() {
        let t = table();
        let starts = Filter::all().with(Condition::string_match(
            "name",
            StringOp::StartsWith,
            "ann",
            false,
        ));
        assert_eq!(t.filter(&starts).unwrap().n_rows(), 2);

        let starts_cs = Filter::all().with(Condition::string_match(
            "name",
            StringOp::StartsWith,
            "ann",
            true,
        ));
        assert_eq!(t.filter(&starts_cs).unwrap().n_rows(), 1);

        let eq = Filter::all().with(Condition::string_match(
            "name",
            StringOp::Equal,
            "Bob",
            true,
        ));
        assert_eq!(t.filter(&eq).unwrap().n_rows(), 1);
    }

    #[test]
    fn conjunction_and_disjunction() {
        let t = table();
        let both = Filter::all()
            .with(Condition::discrete_codes("g", [0.0]))
            .with(Condition::continuous("x", ContinuousOp::Less, 2.0));
        assert_eq!(t.filter(&both).unwrap().n_rows(), 1);

        let either = Filter::any()
            .with(Condition::discrete_codes("g", [1.0]))
            .with(Condition::continuous("x", ContinuousOp::Less, 2.0));
        assert_eq!(t.filter(&either).unwrap().n_rows(), 2);

        // order independence
        let swapped = Filter::any()
            .with(Condition::continuous("x", ContinuousOp::Less, 2.0))
            .with(Condition::discrete_codes("g", [1.0]));
        assert_eq!(
            t.filter(&either).unwrap().checksum(true),
            t.filter(&swapped).unwrap().checksum(true)
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let t = table();
        let f = Filter::all().with(Condition::discrete_codes("g", [0.0]));
        let once = t.filter(&f).unwrap();
        let twice = once.filter(&f).unwrap();
        assert_eq!(once.n_rows(), twice.n_rows());
        assert_eq!(once.checksum(true), twice.checksum(true));
    }

    #[test]
    fn negation_selects_complement() {
        let t = table();
        let not_m = Filter::all().with(Condition::discrete_codes("g", [0.0]).negated());
        let picked = t.filter(&not_m).unwrap();
        // F and the missing-class row
        assert_eq!(picked.n_rows(), 2);
    }

    #[test]
    fn is_defined_and_has_class() {
        let t = table();
        let defined = t.filter_is_defined(None, false).unwrap();
        assert_eq!(defined.n_rows(), 2);

        let undefined = t.filter_is_defined(None, true).unwrap();
        assert_eq!(undefined.n_rows(), 2);

        let classed = t.filter_has_class(false).unwrap();
        assert_eq!(classed.n_rows(), 3);

        let strings = t
            .filter(&Filter::all().with(Condition::is_defined("name")))
            .unwrap();
        assert_eq!(strings.n_rows(), 3);
    }

    #[test]
    fn sparse_zero_counts_as_absent_for_is_defined() {
        let dense = DenseMatrix::from_vec(vec![1.0, 0.0, 2.0, 0.0], 4, 1);
        let t = Table::from_arrays(
            None,
            Matrix::Sparse(CscMatrix::from_dense(&dense)),
            None,
            None,
            None,
        )
        .unwrap();
        let defined = t
            .filter(&Filter::all().with(Condition::is_defined("Feature 1")))
            .unwrap();
        assert_eq!(defined.n_rows(), 2);
    }
}
