// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactional store over the entity tables.
//!
//! Transactions are flat: the closure mutates a private copy of the
//! tables, which replaces the shared state (and is persisted) only when
//! the closure returns `Ok`. Any `Err` rolls the copy away. Attempting to
//! open a transaction while one is running fails instead of deadlocking.

use crate::error::StoreError;
use crate::snapshot;
use crate::tables::Tables;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Handle to the single shared store.
#[derive(Clone)]
pub struct Store {
    tables: Arc<Mutex<Tables>>,
    /// Snapshot location; `None` keeps the store memory-only (tests).
    path: Option<PathBuf>,
}

/// A transaction over a private copy of the tables.
///
/// Derefs to [`Tables`], so every query and mutation is available inside
/// the closure passed to [`Store::with_transaction`].
pub struct Txn {
    tables: Tables,
}

impl Deref for Txn {
    type Target = Tables;

    fn deref(&self) -> &Tables {
        &self.tables
    }
}

impl DerefMut for Txn {
    fn deref_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }
}

impl Store {
    /// Open the store, loading the snapshot when one exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = snapshot::read(&path)?.unwrap_or_default();
        tracing::debug!(
            path = %path.display(),
            work_items = tables.work_items.len(),
            stories = tables.developer_stories.len(),
            "store opened"
        );
        Ok(Self { tables: Arc::new(Mutex::new(tables)), path: Some(path) })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self { tables: Arc::new(Mutex::new(Tables::default())), path: None }
    }

    /// Run a read-only closure over a consistent view of the tables.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        f(&self.tables.lock())
    }

    /// Run `f` under a flat ACID transaction.
    ///
    /// Commits (swap + snapshot write) when `f` returns `Ok`; rolls back
    /// on `Err`. Nested transactions are rejected with
    /// `StoreError::InvalidOperation`.
    pub fn with_transaction<T, E>(&self, f: impl FnOnce(&mut Txn) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        // A held lock here means a transaction is already running; the
        // single-task execution model makes that a nesting bug, not
        // contention.
        let mut shared = self
            .tables
            .try_lock()
            .ok_or(StoreError::InvalidOperation("nested transaction"))?;

        let mut txn = Txn { tables: shared.clone() };
        let value = f(&mut txn)?;

        if let Some(path) = &self.path {
            snapshot::write(path, &txn.tables).map_err(E::from)?;
        }
        *shared = txn.tables;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
