//! Typed column descriptors.
//!
//! A [`Variable`] names a column and fixes how its cells are encoded.
//! Discrete and continuous variables store their values as `f64` codes with
//! [`MISSING`] (NaN) as the missing sentinel; string variables keep owned
//! strings and live only in the metadata group.

use std::fmt;
use std::sync::Arc;

use crate::error::{DataError, Result};
use crate::table::Table;

/// Missing-value sentinel for encoded cells.
pub const MISSING: f64 = f64::NAN;

/// Returns true if an encoded cell is missing.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Row function used by conversion plans to derive a destination column
/// from a source table. Receives the source table and a logical row index.
pub type ComputeFn = Arc<dyn Fn(&Table, usize) -> f64 + Send + Sync>;

/// The kind of a variable, with per-kind payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarKind {
    /// Categorical variable; cells are codes into the ordered label list.
    ///
    /// The label list is append-only: once data has been encoded against it,
    /// existing codes keep their meaning and new labels only extend the tail.
    Discrete { values: Vec<String> },
    /// Numeric variable; cells are the values themselves.
    Continuous,
    /// Free-text variable; cells store owned strings, metadata-only.
    String,
}

impl VarKind {
    /// Short kind name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            VarKind::Discrete { .. } => "discrete",
            VarKind::Continuous => "continuous",
            VarKind::String => "string",
        }
    }

    fn same_kind(&self, other: &VarKind) -> bool {
        matches!(
            (self, other),
            (VarKind::Discrete { .. }, VarKind::Discrete { .. })
                | (VarKind::Continuous, VarKind::Continuous)
                | (VarKind::String, VarKind::String)
        )
    }
}

/// A typed column descriptor.
///
/// Identity is the pair (name, kind): two variables with the same name and
/// kind address the same logical column when domains are converted.
#[derive(Clone)]
pub struct Variable {
    name: String,
    kind: VarKind,
    compute: Option<ComputeFn>,
}

impl Variable {
    /// A discrete variable with the given ordered value labels.
    pub fn discrete(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Discrete {
                values: values.into_iter().map(Into::into).collect(),
            },
            compute: None,
        }
    }

    /// A continuous variable.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Continuous,
            compute: None,
        }
    }

    /// A string variable (metadata-only).
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::String,
            compute: None,
        }
    }

    /// Attach a row function used when a conversion plan must derive this
    /// column from another domain's table.
    pub fn with_compute(mut self, f: ComputeFn) -> Self {
        self.compute = Some(f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &VarKind {
        &self.kind
    }

    pub(crate) fn compute(&self) -> Option<&ComputeFn> {
        self.compute.as_ref()
    }

    /// Discrete and continuous variables are primitive: their cells are
    /// `f64` codes and they may serve as attributes or class variables.
    pub fn is_primitive(&self) -> bool {
        !matches!(self.kind, VarKind::String)
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self.kind, VarKind::Discrete { .. })
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self.kind, VarKind::Continuous)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, VarKind::String)
    }

    /// The ordered value labels of a discrete variable.
    pub fn values(&self) -> Option<&[String]> {
        match &self.kind {
            VarKind::Discrete { values } => Some(values),
            _ => None,
        }
    }

    /// Number of categories of a discrete variable, 0 otherwise.
    pub fn n_values(&self) -> usize {
        self.values().map_or(0, |v| v.len())
    }

    /// Append a label to a discrete variable and return its code.
    ///
    /// Existing codes are never renumbered. Appending requires exclusive
    /// access; a variable already shared inside a domain is frozen and a new
    /// variable must be built instead.
    pub fn add_value(&mut self, label: impl Into<String>) -> Result<usize> {
        let label = label.into();
        match &mut self.kind {
            VarKind::Discrete { values } => {
                if let Some(code) = values.iter().position(|v| *v == label) {
                    return Ok(code);
                }
                values.push(label);
                Ok(values.len() - 1)
            }
            _ => Err(DataError::KindMismatch {
                name: self.name.clone(),
                kind: self.kind.name(),
                expected: "discrete",
            }),
        }
    }

    /// Encode a textual value into this variable's `f64` code.
    ///
    /// Discrete variables resolve the label to its position; continuous
    /// variables parse the number; "?" and "" encode as missing. String
    /// variables have no numeric encoding.
    pub fn to_code(&self, value: &str) -> Result<f64> {
        if value == "?" || value.is_empty() {
            return Ok(MISSING);
        }
        match &self.kind {
            VarKind::Discrete { values } => values
                .iter()
                .position(|v| v == value)
                .map(|p| p as f64)
                .ok_or_else(|| DataError::UnknownValue {
                    variable: self.name.clone(),
                    value: value.to_string(),
                }),
            VarKind::Continuous => {
                value.parse::<f64>().map_err(|_| DataError::UnknownValue {
                    variable: self.name.clone(),
                    value: value.to_string(),
                })
            }
            VarKind::String => Err(DataError::StringColumn(self.name.clone())),
        }
    }

    /// The label behind a discrete code, if the code is in range.
    pub fn code_label(&self, code: f64) -> Option<&str> {
        let values = self.values()?;
        if is_missing(code) || code < 0.0 {
            return None;
        }
        values.get(code as usize).map(String::as_str)
    }

    /// Render an encoded cell for display. Missing renders as "?".
    pub fn repr_value(&self, code: f64) -> String {
        if is_missing(code) {
            return "?".to_string();
        }
        match &self.kind {
            VarKind::Discrete { .. } => self
                .code_label(code)
                .map(str::to_string)
                .unwrap_or_else(|| format!("<{}>", code)),
            VarKind::Continuous => format!("{:.3}", code),
            VarKind::String => format!("{}", code),
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("compute", &self.compute.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind.name())
    }
}

/// Loose kind compatibility used by conversion plans: payloads may differ
/// (a destination discrete variable may carry appended labels) but the
/// kind discriminant must agree.
pub(crate) fn compatible(a: &Variable, b: &Variable) -> bool {
    a.name == b.name && a.kind.same_kind(&b.kind)
}
