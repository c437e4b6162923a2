//! Per-row facades over a table.
//!
//! [`RowInstance`] densifies one row for reading; [`RowInstanceMut`] writes
//! scalars through to the owning table's storage. Both are bound to
//! (table, row index); because they borrow the table, the borrow rules
//! guarantee the table cannot be resized while a facade is live — a stale
//! handle is unrepresentable. Accessors still bounds-check the bound row.

use std::fmt;

use crate::domain::ColumnKey;
use crate::error::Result;
use crate::variable::is_missing;

use super::Table;

/// Read facade over one row; the row's X and Y cells are densified when the
/// facade is created (sparse rows pay that once, not per read).
pub struct RowInstance<'a> {
    table: &'a Table,
    row: usize,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl<'a> RowInstance<'a> {
    pub(super) fn new(table: &'a Table, row: usize) -> Result<Self> {
        table.check_row(row)?;
        let mut x = Vec::new();
        let mut y = Vec::new();
        table
            .x_group()
            .storage()
            .copy_row_into(table.x_group().abs(row), &mut x);
        table
            .y_group()
            .storage()
            .copy_row_into(table.y_group().abs(row), &mut y);
        Ok(Self { table, row, x, y })
    }

    pub fn index(&self) -> usize {
        self.row
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    /// Encoded cell value; attribute and class reads come from the
    /// densified row, metas go to the table.
    pub fn value<'k>(&self, key: impl Into<ColumnKey<'k>>) -> Result<f64> {
        let idx = self.table.domain().index(key)?;
        let n_attrs = self.table.n_attributes() as isize;
        if idx >= 0 && idx < n_attrs {
            Ok(self.x[idx as usize])
        } else if idx >= n_attrs {
            Ok(self.y[(idx - n_attrs) as usize])
        } else {
            self.table.value(self.row, idx)
        }
    }

    /// String meta cell.
    pub fn meta_string<'k>(&self, key: impl Into<ColumnKey<'k>>) -> Result<Option<&str>> {
        self.table.meta_string(self.row, key)
    }

    /// The single class value, when the domain has exactly one class.
    pub fn class_value(&self) -> Option<f64> {
        match self.y.as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// This row's weight; 1 when the table is unweighted.
    pub fn weight(&self) -> f64 {
        self.table.row_weight(self.row)
    }

    /// Any missing attribute or class cell in this row?
    pub fn has_missing(&self) -> bool {
        self.x.iter().chain(&self.y).any(|&v| is_missing(v))
    }
}

impl fmt::Display for RowInstance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let domain = self.table.domain();
        let render = |f: &mut fmt::Formatter<'_>, values: &[f64], offset: usize| {
            for (i, &v) in values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let var = domain.get((offset + i) as isize).map_err(|_| fmt::Error)?;
                write!(f, "{}", var.repr_value(v))?;
            }
            Ok(())
        };

        write!(f, "[")?;
        render(f, &self.x, 0)?;
        if !self.y.is_empty() {
            write!(f, " | ")?;
            render(f, &self.y, self.x.len())?;
        }
        write!(f, "]")?;

        if domain.n_metas() > 0 {
            write!(f, " {{")?;
            for (i, var) in domain.metas().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if var.is_string() {
                    let s = self.meta_string(var).map_err(|_| fmt::Error)?;
                    write!(f, "{}", s.unwrap_or("?"))?;
                } else {
                    let v = self.table.value(self.row, var).map_err(|_| fmt::Error)?;
                    write!(f, "{}", var.repr_value(v))?;
                }
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// Write facade over one row. Scalar writes go through to the owning
/// table's storage (copy-on-write breaks aliasing first).
pub struct RowInstanceMut<'a> {
    table: &'a mut Table,
    row: usize,
}

impl<'a> RowInstanceMut<'a> {
    pub(super) fn new(table: &'a mut Table, row: usize) -> Result<Self> {
        table.check_row(row)?;
        Ok(Self { table, row })
    }

    pub fn index(&self) -> usize {
        self.row
    }

    pub fn value<'k>(&self, key: impl Into<ColumnKey<'k>>) -> Result<f64> {
        self.table.value(self.row, key)
    }

    /// Write an encoded cell at this row.
    pub fn set_value<'k>(&mut self, key: impl Into<ColumnKey<'k>>, value: f64) -> Result<()> {
        self.table.set_value(self.row, key, value)
    }

    /// Write the single class value.
    pub fn set_class(&mut self, value: f64) -> Result<()> {
        let n_attrs = self.table.n_attributes() as isize;
        self.table.set_value(self.row, n_attrs, value)
    }

    /// Write a string meta cell.
    pub fn set_meta_string<'k>(
        &mut self,
        key: impl Into<ColumnKey<'k>>,
        value: Option<String>,
    ) -> Result<()> {
        self.table.set_meta_string(self.row, key, value)
    }

    pub fn weight(&self) -> f64 {
        self.table.row_weight(self.row)
    }

    /// Set this row's weight, materializing the weight column (all ones)
    /// on first use.
    pub fn set_weight(&mut self, weight: f64) -> Result<()> {
        self.table.set_row_weight(self.row, weight)
    }
}
