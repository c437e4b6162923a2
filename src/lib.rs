//! tabular: a typed, columnar, in-memory dataset engine.
//!
//! A [`Domain`] describes a dataset's schema as ordered attribute, class,
//! and meta [`Variable`]s; a [`Table`] holds the rows across four column
//! groups (attributes X, classes Y, metadata M, weights W), each backed by
//! dense or sparse storage. On top of that sit zero/low-copy views,
//! schema-aware conversion between domains, declarative row filtering, and
//! weighted statistics that behave identically over every storage kind.
//!
//! # Key Types
//!
//! - [`Variable`] / [`Domain`] - schema: typed column descriptors and roles
//! - [`Table`] - the dataset: construction, indexing, views, mutation
//! - [`RowInstance`] / [`RowInstanceMut`] - per-row facades
//! - [`Filter`] / [`Condition`] - declarative row predicates
//! - [`Distribution`] / [`Contingency`] - weighted statistics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tabular::{Condition, Domain, Filter, Matrix, DenseMatrix, Table, Variable};
//!
//! let domain = Arc::new(Domain::new(
//!     vec![Arc::new(Variable::continuous("x"))],
//!     vec![Arc::new(Variable::discrete("g", ["M", "F"]))],
//!     vec![],
//! )?);
//! let table = Table::from_arrays(
//!     Some(domain),
//!     Matrix::Dense(DenseMatrix::from_vec(vec![1.0, 2.0, f64::NAN], 3, 1)),
//!     Some(Matrix::Dense(DenseMatrix::from_vec(vec![0.0, 1.0, 0.0], 3, 1))),
//!     None,
//!     None,
//! )?;
//!
//! let males = table.filter(&Filter::all().with(Condition::discrete_labels("g", ["M"])))?;
//! assert_eq!(males.n_rows(), 2);
//!
//! let dist = table.distribution("g")?;
//! assert_eq!(dist.category_weights().unwrap(), &[2.0, 1.0]);
//! # Ok::<(), tabular::DataError>(())
//! ```
//!
//! # Missing Values
//!
//! Encoded cells are `f64` with NaN as the missing sentinel ([`MISSING`]);
//! string meta cells use `None`. Sparse storage keeps NaN entries
//! explicitly, so missing survives compression, while unstored cells read
//! as the value 0.0.
//!
//! # Views and Ownership
//!
//! Contiguous row selection shares backing storage. Every mutating entry
//! point performs an explicit copy-on-write step first, so writes never
//! travel through an alias; [`Table::ensure_owned`] exposes the same step
//! to callers.

pub mod domain;
pub mod error;
pub mod filter;
pub mod io;
pub mod stats;
pub mod storage;
pub mod table;
pub mod variable;

pub use domain::{ColumnConversion, ColumnKey, ColumnLocation, Domain, DomainConversion};
pub use error::{DataError, ErrorKind, Result};
pub use filter::{
    ColumnSel, Combine, Condition, ConditionKind, ContinuousOp, Filter, FilterValue, StringOp,
};
pub use io::{FormatReader, LoadedTable};
pub use stats::{Contingency, Distribution};
pub use storage::{ColumnStore, CscMatrix, DenseMatrix, Matrix};
pub use table::{
    MetaColumn, MetaStorage, RowInstance, RowInstanceMut, RowSelection, Table,
};
pub use variable::{is_missing, ComputeFn, VarKind, Variable, MISSING};
