//! The file-reading collaborator seam.
//!
//! This engine does not parse file formats. A [`FormatReader`] resolves
//! column types, discrete vocabularies, and missing-value encoding itself
//! and hands back a ready-made domain plus arrays; the engine only
//! validates and assembles the table.

use std::path::Path;
use std::sync::Arc;

use crate::domain::Domain;
use crate::error::Result;
use crate::storage::Matrix;
use crate::table::{MetaStorage, Table};

/// What a reader returns: a domain and the matching column groups.
pub struct LoadedTable {
    pub domain: Arc<Domain>,
    pub x: Matrix,
    pub y: Option<Matrix>,
    pub metas: Option<MetaStorage>,
    /// Per-row weights, when the source carries them.
    pub weights: Option<Vec<f64>>,
}

/// An external table-format parser.
pub trait FormatReader {
    /// Read the file at `path` into a domain and arrays.
    fn read_table(&self, path: &Path) -> Result<LoadedTable>;
}

impl Table {
    /// Build a table from whatever the reader produced. Validation is the
    /// same as [`Table::from_arrays`]; a reader cannot hand back a table
    /// that violates its own domain.
    pub fn from_reader(reader: &dyn FormatReader, path: impl AsRef<Path>) -> Result<Table> {
        let loaded = reader.read_table(path.as_ref())?;
        Table::from_arrays(
            Some(loaded.domain),
            loaded.x,
            loaded.y,
            loaded.metas,
            loaded.weights,
        )
    }
}
