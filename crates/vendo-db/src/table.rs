//! Record tables with atomic per-table operations.

use crate::DbError;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A record that can be stored in a [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
    /// The primary key for this record.
    fn key(&self) -> String;
}

/// A keyed record table.
///
/// Every method takes the table lock for the duration of the call, so each
/// call is atomic with respect to every other call on the same table. This
/// is the same guarantee a relational store gives a single statement;
/// [`Table::update_if`] is the conditional-update
/// (`UPDATE ... WHERE ...`, check rows affected) counterpart.
pub struct Table<T: Record> {
    rows: RwLock<BTreeMap<String, T>>,
}

impl<T: Record> Table<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert a new record.
    ///
    /// Fails with [`DbError::DuplicateKey`] if a record with the same key
    /// already exists.
    pub fn insert(&self, record: T) -> Result<(), DbError> {
        let key = record.key();
        let mut rows = self.rows.write().expect("table lock poisoned");
        if rows.contains_key(&key) {
            return Err(DbError::DuplicateKey(key));
        }
        rows.insert(key, record);
        Ok(())
    }

    /// Get a record by key, if present.
    pub fn get(&self, key: &str) -> Option<T> {
        self.rows
            .read()
            .expect("table lock poisoned")
            .get(key)
            .cloned()
    }

    /// Get a record by key, failing with [`DbError::NotFound`] if absent.
    pub fn try_get(&self, key: &str) -> Result<T, DbError> {
        self.get(key).ok_or(DbError::NotFound)
    }

    /// Atomically mutate the record with the given key.
    ///
    /// Returns the updated record. Fails with [`DbError::NotFound`] if the
    /// key is absent.
    pub fn update<F>(&self, key: &str, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut T),
    {
        let mut rows = self.rows.write().expect("table lock poisoned");
        let record = rows.get_mut(key).ok_or(DbError::NotFound)?;
        f(record);
        Ok(record.clone())
    }

    /// Atomically mutate the record only if `check` passes.
    ///
    /// Returns `Ok(Some(updated))` when the check passed and the mutation
    /// was applied, `Ok(None)` when the record exists but the check failed
    /// (zero rows affected), and [`DbError::NotFound`] when the key is
    /// absent. Check and mutation run under the same write lock, so no
    /// concurrent call can interleave between them.
    pub fn update_if<P, F>(&self, key: &str, check: P, f: F) -> Result<Option<T>, DbError>
    where
        P: FnOnce(&T) -> bool,
        F: FnOnce(&mut T),
    {
        let mut rows = self.rows.write().expect("table lock poisoned");
        let record = rows.get_mut(key).ok_or(DbError::NotFound)?;
        if !check(record) {
            return Ok(None);
        }
        f(record);
        Ok(Some(record.clone()))
    }

    /// Remove a record by key, returning it.
    pub fn remove(&self, key: &str) -> Result<T, DbError> {
        self.rows
            .write()
            .expect("table lock poisoned")
            .remove(key)
            .ok_or(DbError::NotFound)
    }

    /// Delete every record matching the predicate, returning the count.
    pub fn delete_where<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let mut rows = self.rows.write().expect("table lock poisoned");
        let before = rows.len();
        rows.retain(|_, record| !predicate(record));
        before - rows.len()
    }

    /// Collect every record matching the predicate.
    pub fn find<P>(&self, mut predicate: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.rows
            .read()
            .expect("table lock poisoned")
            .values()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }

    /// Find the first record matching the predicate.
    pub fn find_one<P>(&self, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.rows
            .read()
            .expect("table lock poisoned")
            .values()
            .find(|record| predicate(record))
            .cloned()
    }

    /// Count records matching the predicate.
    pub fn count<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        self.rows
            .read()
            .expect("table lock poisoned")
            .values()
            .filter(|record| predicate(record))
            .count()
    }

    /// Collect all records in key order.
    pub fn all(&self) -> Vec<T> {
        self.rows
            .read()
            .expect("table lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.rows.read().expect("table lock poisoned").len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}
