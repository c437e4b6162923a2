//! Shared-storage column groups with explicit ownership.
//!
//! Each of a table's four groups wraps its storage in an [`Arc`] plus a row
//! window. Row-range selection clones the `Arc` and narrows the window — a
//! view. Before any write, [`SharedGroup::ensure_owned`] breaks aliasing by
//! copying the window into fresh storage, so mutation never leaks through
//! a view into its parent or siblings.

use std::ops::Range;
use std::sync::Arc;

use crate::storage::Matrix;

use super::meta::MetaStorage;

/// Storage that can report its row count and copy out a row window.
pub(crate) trait RowStore: Clone {
    fn store_rows(&self) -> usize;
    fn slice_rows(&self, rows: Range<usize>) -> Self;
}

impl RowStore for Matrix {
    fn store_rows(&self) -> usize {
        self.n_rows()
    }
    fn slice_rows(&self, rows: Range<usize>) -> Self {
        Matrix::slice_rows(self, rows)
    }
}

impl RowStore for MetaStorage {
    fn store_rows(&self) -> usize {
        self.n_rows()
    }
    fn slice_rows(&self, rows: Range<usize>) -> Self {
        MetaStorage::slice_rows(self, rows)
    }
}

impl RowStore for Vec<f64> {
    fn store_rows(&self) -> usize {
        self.len()
    }
    fn slice_rows(&self, rows: Range<usize>) -> Self {
        self[rows].to_vec()
    }
}

/// A group's storage plus the row window this table sees.
#[derive(Debug)]
pub(crate) struct SharedGroup<S: RowStore> {
    storage: Arc<S>,
    rows: Range<usize>,
}

impl<S: RowStore> Clone for SharedGroup<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            rows: self.rows.clone(),
        }
    }
}

impl<S: RowStore> SharedGroup<S> {
    /// Owned storage covering all of its rows.
    pub fn new(storage: S) -> Self {
        let rows = 0..storage.store_rows();
        Self {
            storage: Arc::new(storage),
            rows,
        }
    }

    /// Logical row count of this window.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Translate a window-relative row to a storage row.
    #[inline]
    pub fn abs(&self, row: usize) -> usize {
        debug_assert!(row < self.len());
        self.rows.start + row
    }

    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// A view sharing this storage, narrowed to a sub-window.
    pub fn view_window(&self, window: Range<usize>) -> Self {
        debug_assert!(window.end <= self.len());
        Self {
            storage: Arc::clone(&self.storage),
            rows: self.rows.start + window.start..self.rows.start + window.end,
        }
    }

    /// True when the storage is shared with another table or larger than
    /// this window.
    pub fn is_view(&self) -> bool {
        Arc::strong_count(&self.storage) > 1 || self.rows != (0..self.storage.store_rows())
    }

    /// Copy-on-write: after this call the group exclusively owns storage
    /// that exactly covers its window.
    pub fn ensure_owned(&mut self) {
        if !self.is_view() {
            return;
        }
        let owned = self.storage.slice_rows(self.rows.clone());
        *self = Self::new(owned);
    }

    /// Exclusive access to the storage, copying first when shared.
    pub fn make_mut(&mut self) -> &mut S {
        self.ensure_owned();
        Arc::get_mut(&mut self.storage).expect("storage is exclusive after ensure_owned")
    }

    /// Replace the storage wholesale (mutations that rebuild, e.g. gather).
    pub fn replace(&mut self, storage: S) {
        *self = Self::new(storage);
    }
}
