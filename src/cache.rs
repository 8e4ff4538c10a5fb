//! Explicit memoization of loaded datasets.
//!
//! The cache is owned by the caller and lives as long as it does. Entries
//! never expire; call [`DatasetCache::invalidate`] or [`DatasetCache::clear`]
//! after the underlying files change.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use crate::error::Result;
use crate::frames;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dataset: String,
    pub path: PathBuf,
}

impl CacheKey {
    pub fn new(dataset: &str, path: &Path) -> Self {
        Self {
            dataset: dataset.to_string(),
            path: path.to_path_buf(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    frames: HashMap<CacheKey, DataFrame>,
    hits: usize,
    misses: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached frame for `key`, running `load` on a miss. A failed
    /// load is not cached.
    pub fn get_or_load<F>(&mut self, key: CacheKey, load: F) -> Result<&DataFrame>
    where
        F: FnOnce(&Path) -> Result<DataFrame>,
    {
        if self.frames.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            tracing::debug!(dataset = %key.dataset, path = %key.path.display(), "Dataset cache miss");
            let df = load(&key.path)?;
            self.frames.insert(key.clone(), df);
        }
        Ok(&self.frames[&key])
    }

    /// Cached string-typed CSV load.
    pub fn get_or_load_csv(&mut self, dataset: &str, path: &Path) -> Result<&DataFrame> {
        self.get_or_load(CacheKey::new(dataset, path), |p| {
            frames::read_csv_as_strings(p, None)
        })
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.frames.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use polars::prelude::*;
    use std::cell::Cell;

    fn tiny() -> DataFrame {
        DataFrame::new(vec![Column::new("x".into(), &[1i64, 2, 3])]).unwrap()
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let calls = Cell::new(0);
        let mut cache = DatasetCache::new();
        let key = CacheKey::new("owid", Path::new("energy.csv"));

        for _ in 0..3 {
            let df = cache
                .get_or_load(key.clone(), |_| {
                    calls.set(calls.get() + 1);
                    Ok(tiny())
                })
                .unwrap();
            assert_eq!(df.height(), 3);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!((cache.hits(), cache.misses()), (2, 1));
    }

    #[test]
    fn invalidate_forces_reload() {
        let mut cache = DatasetCache::new();
        let key = CacheKey::new("edgar", Path::new("edgar.csv"));
        cache.get_or_load(key.clone(), |_| Ok(tiny())).unwrap();

        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        assert!(cache.is_empty());

        cache.get_or_load(key, |_| Ok(tiny())).unwrap();
        assert_eq!(cache.misses(), 2);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache = DatasetCache::new();
        let key = CacheKey::new("nd-gain", Path::new("missing.csv"));
        let err = cache.get_or_load(key.clone(), |_| Err(PolicyError::NotFound("missing.csv".into())));
        assert!(err.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn same_path_different_dataset_is_a_separate_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let mut cache = DatasetCache::new();
        cache.get_or_load_csv("one", &path).unwrap();
        cache.get_or_load_csv("two", &path).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
