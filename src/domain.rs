//! Ordered schemas over typed variables, and conversion plans between them.
//!
//! A [`Domain`] orders its variables into three roles — attributes, class
//! variables, and metas — and owns the name→column lookup. Logical column
//! addressing follows the engine-wide convention: attributes occupy
//! `0..n_attributes`, class variables continue at `n_attributes..`, and
//! metas are negative (`-1 - position`).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{DataError, Result};
use crate::variable::{compatible, ComputeFn, Variable};

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Where a logical column index lands inside a table's column groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLocation {
    /// Position within the attribute group X.
    Attribute(usize),
    /// Position within the class group Y.
    ClassVar(usize),
    /// Position within the meta group M.
    Meta(usize),
}

/// A column reference: logical index, name, or variable.
#[derive(Debug, Clone)]
pub enum ColumnKey<'a> {
    Index(isize),
    Name(&'a str),
    Var(&'a Variable),
}

impl From<isize> for ColumnKey<'_> {
    fn from(idx: isize) -> Self {
        ColumnKey::Index(idx)
    }
}

impl From<i32> for ColumnKey<'_> {
    fn from(idx: i32) -> Self {
        ColumnKey::Index(idx as isize)
    }
}

impl From<usize> for ColumnKey<'_> {
    fn from(idx: usize) -> Self {
        ColumnKey::Index(idx as isize)
    }
}

impl<'a> From<&'a str> for ColumnKey<'a> {
    fn from(name: &'a str) -> Self {
        ColumnKey::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnKey<'a> {
    fn from(name: &'a String) -> Self {
        ColumnKey::Name(name)
    }
}

impl<'a> From<&'a Variable> for ColumnKey<'a> {
    fn from(var: &'a Variable) -> Self {
        ColumnKey::Var(var)
    }
}

impl<'a> From<&'a Arc<Variable>> for ColumnKey<'a> {
    fn from(var: &'a Arc<Variable>) -> Self {
        ColumnKey::Var(var)
    }
}

/// How one destination column is produced from a source table.
#[derive(Clone)]
pub enum ColumnConversion {
    /// Copy the source column at this logical index.
    Copy(isize),
    /// Derive each cell by calling the row function on the source table.
    Compute(ComputeFn),
    /// No source; the column is filled with the missing sentinel.
    Unknown,
}

impl fmt::Debug for ColumnConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnConversion::Copy(i) => write!(f, "Copy({})", i),
            ColumnConversion::Compute(_) => write!(f, "Compute(<fn>)"),
            ColumnConversion::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A conversion plan: per destination column, how to produce it from a
/// table over the source domain. Pure function of the two schemas.
#[derive(Debug, Clone)]
pub struct DomainConversion {
    pub attributes: Vec<ColumnConversion>,
    pub class_vars: Vec<ColumnConversion>,
    pub metas: Vec<ColumnConversion>,
}

/// An ordered schema of attribute, class, and meta variables.
pub struct Domain {
    id: u64,
    attributes: Vec<Arc<Variable>>,
    class_vars: Vec<Arc<Variable>>,
    metas: Vec<Arc<Variable>>,
    by_name: HashMap<String, isize>,
    conversions: Mutex<HashMap<u64, Arc<DomainConversion>>>,
}

impl Domain {
    /// Build a domain from the three role sequences.
    ///
    /// Fails when a variable name appears in more than one place, or when a
    /// non-primitive (string) variable is used as an attribute or class
    /// variable.
    pub fn new(
        attributes: Vec<Arc<Variable>>,
        class_vars: Vec<Arc<Variable>>,
        metas: Vec<Arc<Variable>>,
    ) -> Result<Self> {
        for var in attributes.iter().chain(&class_vars) {
            if !var.is_primitive() {
                return Err(DataError::NonPrimitiveVariable(var.name().to_string()));
            }
        }

        let n_attrs = attributes.len() as isize;
        let mut by_name = HashMap::new();
        let indexed = attributes
            .iter()
            .enumerate()
            .map(|(i, v)| (i as isize, v))
            .chain(
                class_vars
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (n_attrs + i as isize, v)),
            )
            .chain(metas.iter().enumerate().map(|(i, v)| (-1 - i as isize, v)));
        for (idx, var) in indexed {
            if by_name.insert(var.name().to_string(), idx).is_some() {
                return Err(DataError::SharedVariable(var.name().to_string()));
            }
        }

        Ok(Self {
            id: NEXT_DOMAIN_ID.fetch_add(1, Ordering::Relaxed),
            attributes,
            class_vars,
            metas,
            by_name,
            conversions: Mutex::new(HashMap::new()),
        })
    }

    /// Infer a continuous-only domain for bare numeric arrays: one variable
    /// per column, named `Feature k` / `Target k` / `Meta k`.
    pub fn infer(n_attributes: usize, n_class_vars: usize, n_metas: usize) -> Arc<Self> {
        let named = |prefix: &str, n: usize| {
            (0..n)
                .map(|i| Arc::new(Variable::continuous(format!("{} {}", prefix, i + 1))))
                .collect()
        };
        let domain = Self::new(
            named("Feature", n_attributes),
            named("Target", n_class_vars),
            named("Meta", n_metas),
        )
        .expect("inferred variable names are unique");
        Arc::new(domain)
    }

    /// Process-unique schema identity, used as a conversion-cache key.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn attributes(&self) -> &[Arc<Variable>] {
        &self.attributes
    }

    pub fn class_vars(&self) -> &[Arc<Variable>] {
        &self.class_vars
    }

    pub fn metas(&self) -> &[Arc<Variable>] {
        &self.metas
    }

    /// The single class variable, when there is exactly one.
    pub fn class_var(&self) -> Option<&Arc<Variable>> {
        match self.class_vars.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    pub fn n_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn n_class_vars(&self) -> usize {
        self.class_vars.len()
    }

    pub fn n_metas(&self) -> usize {
        self.metas.len()
    }

    /// Number of non-meta variables (attributes + class variables).
    pub fn n_variables(&self) -> usize {
        self.attributes.len() + self.class_vars.len()
    }

    /// Attributes followed by class variables.
    pub fn variables(&self) -> impl Iterator<Item = &Arc<Variable>> {
        self.attributes.iter().chain(&self.class_vars)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Resolve a name, variable, or logical index to a logical column index.
    pub fn index<'a>(&self, key: impl Into<ColumnKey<'a>>) -> Result<isize> {
        match key.into() {
            ColumnKey::Index(idx) => {
                self.locate(idx)?;
                Ok(idx)
            }
            ColumnKey::Name(name) => self
                .by_name
                .get(name)
                .copied()
                .ok_or_else(|| DataError::UnknownVariable(name.to_string())),
            ColumnKey::Var(var) => {
                let idx = self
                    .by_name
                    .get(var.name())
                    .copied()
                    .ok_or_else(|| DataError::UnknownVariable(var.name().to_string()))?;
                if compatible(self.get(idx)?.as_ref(), var) {
                    Ok(idx)
                } else {
                    Err(DataError::UnknownVariable(var.name().to_string()))
                }
            }
        }
    }

    /// The variable at a logical index.
    pub fn get(&self, index: isize) -> Result<&Arc<Variable>> {
        match self.locate(index)? {
            ColumnLocation::Attribute(i) => Ok(&self.attributes[i]),
            ColumnLocation::ClassVar(i) => Ok(&self.class_vars[i]),
            ColumnLocation::Meta(i) => Ok(&self.metas[i]),
        }
    }

    /// Map a logical index onto its column group.
    pub fn locate(&self, index: isize) -> Result<ColumnLocation> {
        let n_attrs = self.attributes.len() as isize;
        let n_vars = n_attrs + self.class_vars.len() as isize;
        if index >= 0 && index < n_attrs {
            Ok(ColumnLocation::Attribute(index as usize))
        } else if index >= n_attrs && index < n_vars {
            Ok(ColumnLocation::ClassVar((index - n_attrs) as usize))
        } else if index < 0 && (-1 - index) < self.metas.len() as isize {
            Ok(ColumnLocation::Meta((-1 - index) as usize))
        } else {
            Err(DataError::ColumnOutOfRange(index))
        }
    }

    /// The conversion plan re-expressing a table over `source` in this
    /// domain. Plans are cached per source schema identity.
    pub fn conversion(&self, source: &Domain) -> Arc<DomainConversion> {
        if let Some(plan) = self
            .conversions
            .lock()
            .expect("conversion cache lock")
            .get(&source.id)
        {
            return Arc::clone(plan);
        }

        let convert = |vars: &[Arc<Variable>]| {
            vars.iter()
                .map(|var| match source.index(var.as_ref()) {
                    Ok(idx) => ColumnConversion::Copy(idx),
                    Err(_) => match var.compute() {
                        Some(f) => ColumnConversion::Compute(Arc::clone(f)),
                        None => ColumnConversion::Unknown,
                    },
                })
                .collect()
        };

        let plan = Arc::new(DomainConversion {
            attributes: convert(&self.attributes),
            class_vars: convert(&self.class_vars),
            metas: convert(&self.metas),
        });
        self.conversions
            .lock()
            .expect("conversion cache lock")
            .insert(source.id, Arc::clone(&plan));
        plan
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            || (self.attributes == other.attributes
                && self.class_vars == other.class_vars
                && self.metas == other.metas)
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("attributes", &self.attributes)
            .field("class_vars", &self.class_vars)
            .field("metas", &self.metas)
            .finish()
    }
}
