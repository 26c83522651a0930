//! Session cache for prepared ticket tables.
//!
//! Entries are keyed by canonical path plus file modification time, so an
//! edited export is reloaded on the next lookup. Invalidation is explicit
//! through [`TableCache::invalidate`] and [`TableCache::clear`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::{LoadError, Result};
use crate::types::TicketTable;

/// Identity of a cached file version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl CacheKey {
    /// Build the key for the file currently at `path`.
    pub fn for_path(path: &Path) -> std::result::Result<Self, LoadError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Read {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        })?;
        let modified = metadata.modified().map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(Self { path, modified })
    }
}

/// Aggregate cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub loads: u64,
}

/// Holds at most one prepared table per path.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<PathBuf, (SystemTime, Arc<TicketTable>)>,
    stats: CacheStats,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, calling `load` when nothing is
    /// cached or the file changed since it was cached.
    pub fn get_or_load<F>(&mut self, path: &Path, load: F) -> Result<Arc<TicketTable>>
    where
        F: FnOnce(&Path) -> Result<TicketTable>,
    {
        let key = CacheKey::for_path(path)?;
        if let Some((modified, table)) = self.entries.get(&key.path) {
            if *modified == key.modified {
                self.stats.hits += 1;
                debug!(path = %key.path.display(), "Ticket table cache hit");
                return Ok(Arc::clone(table));
            }
            info!(path = %key.path.display(), "Ticket file changed, reloading");
        }

        let table = Arc::new(load(path)?);
        self.stats.loads += 1;
        self.entries
            .insert(key.path, (key.modified, Arc::clone(&table)));
        Ok(table)
    }

    /// Drop the entry for `path`. Returns whether one was cached.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&path).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IncidashError;
    use std::cell::Cell;
    use std::time::Duration;

    fn one_row() -> TicketTable {
        TicketTable::from_rows(vec!["Número".into()], vec![vec!["INC1".into()]])
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "Número\nINC1\n").unwrap();

        let calls = Cell::new(0);
        let mut cache = TableCache::new();
        for _ in 0..3 {
            let table = cache
                .get_or_load(&path, |_| {
                    calls.set(calls.get() + 1);
                    Ok(one_row())
                })
                .unwrap();
            assert_eq!(table.len(), 1);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 2, loads: 1 });
    }

    #[test]
    fn test_modified_file_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "Número\nINC1\n").unwrap();

        let mut cache = TableCache::new();
        cache.get_or_load(&path, |_| Ok(one_row())).unwrap();

        let file = std::fs::File::options().write(true).open(&path).unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        file.set_modified(later).unwrap();

        let reloaded = Cell::new(false);
        cache
            .get_or_load(&path, |_| {
                reloaded.set(true);
                Ok(TicketTable::default())
            })
            .unwrap();
        assert!(reloaded.get());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "Número\n").unwrap();

        let mut cache = TableCache::new();
        cache.get_or_load(&path, |_| Ok(one_row())).unwrap();
        assert!(cache.invalidate(&path));
        assert!(!cache.invalidate(&path));
        assert!(cache.is_empty());

        cache.get_or_load(&path, |_| Ok(one_row())).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().loads, 2);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let mut cache = TableCache::new();
        let err = cache
            .get_or_load(Path::new("/nonexistent/t.xlsx"), |_| Ok(one_row()))
            .unwrap_err();
        assert!(matches!(
            err,
            IncidashError::Load(LoadError::NotFound { .. })
        ));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "x").unwrap();

        let mut cache = TableCache::new();
        let result = cache.get_or_load(&path, |p| {
            Err(LoadError::MissingColumns {
                columns: vec![p.display().to_string()],
            }
            .into())
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
