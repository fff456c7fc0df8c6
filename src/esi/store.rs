//! Fragment files under the output root.
//!
//! One file per fragment id, raw HTML, no wrapper. Files are only replaced
//! through [`write_atomic`], so a concurrent reader of a fragment URL never
//! sees a partial file.

use crate::config::SiteConfig;
use crate::error::{GenerateError, Result};
use crate::esi::id::is_safe;
use crate::paths::PathPatterns;
use crate::utils::fs::write_atomic;
use regex::Regex;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Instant,
};

/// Result of [`FragmentStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// An existing fragment was kept (no overwrite requested).
    Kept,
}

pub struct FragmentStore {
    dir: PathBuf,
    no_esi: PathPatterns,
}

impl FragmentStore {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            dir: config.esi_dir(),
            no_esi: PathPatterns::new(&config.esi.blocks_no_esi),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, fragment_id: &str) -> PathBuf {
        self.dir.join(fragment_id)
    }

    /// Exact file name match.
    pub fn has(&self, fragment_id: &str) -> bool {
        is_safe(fragment_id) && self.path_for(fragment_id).is_file()
    }

    /// Store `markup` unless the fragment exists and `overwrite` is false.
    pub fn put(&self, fragment_id: &str, markup: &str, overwrite: bool) -> Result<PutOutcome> {
        if !is_safe(fragment_id) {
            return Err(GenerateError::io(
                self.path_for(fragment_id),
                io::Error::new(io::ErrorKind::InvalidInput, "unsafe fragment id"),
            ));
        }
        if !overwrite && self.has(fragment_id) {
            return Ok(PutOutcome::Kept);
        }
        let path = self.path_for(fragment_id);
        write_atomic(&path, markup.as_bytes()).map_err(|err| GenerateError::io(&path, err))?;
        Ok(PutOutcome::Written)
    }

    pub fn get(&self, fragment_id: &str) -> Result<Option<String>> {
        if !self.has(fragment_id) {
            return Ok(None);
        }
        let path = self.path_for(fragment_id);
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|err| GenerateError::io(&path, err))
    }

    /// Remove the fragment directory tree. Returns elapsed seconds.
    pub fn delete_all(&self) -> Result<u64> {
        let start = Instant::now();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(GenerateError::io(&self.dir, err)),
        }
        Ok(start.elapsed().as_secs())
    }

    /// Stored fragment ids, sorted, optionally filtered by `pattern`.
    pub fn ids(&self, pattern: Option<&Regex>) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(GenerateError::io(&self.dir, err)),
        };

        let mut ids: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_safe(name))
            .filter(|name| pattern.is_none_or(|re| re.is_match(name)))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// False when the id is on the do-not-fragment list (exact or prefix).
    pub fn is_fragmentable(&self, fragment_id: &str) -> bool {
        !self.no_esi.matches(fragment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, no_esi: &[&str]) -> FragmentStore {
        let mut config = SiteConfig::default();
        config.generator.directory = dir.path().to_path_buf();
        config.esi.blocks_no_esi = no_esi.iter().map(|s| s.to_string()).collect();
        FragmentStore::new(&config)
    }

    #[test]
    fn test_put_skips_existing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &[]);

        assert_eq!(store.put("alpha", "A", false).unwrap(), PutOutcome::Written);
        assert_eq!(store.put("alpha", "B", false).unwrap(), PutOutcome::Kept);
        assert_eq!(store.get("alpha").unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &[]);

        store.put("alpha", "A", false).unwrap();
        assert_eq!(store.put("alpha", "B", true).unwrap(), PutOutcome::Written);
        assert_eq!(store.get("alpha").unwrap().as_deref(), Some("B"));
    }

    #[test]
    fn test_fragment_location() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &[]);

        store.put("alpha", "A", false).unwrap();
        assert!(dir.path().join("esi/block/alpha").is_file());
        assert!(store.has("alpha"));
        assert!(!store.has("alph"));
    }

    #[test]
    fn test_put_rejects_unsafe_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &[]);
        assert!(store.put("../escape", "x", true).is_err());
        assert!(!dir.path().join("esi/escape").exists());
    }

    #[test]
    fn test_delete_all() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &[]);

        store.put("alpha", "A", false).unwrap();
        store.put("beta", "B", false).unwrap();
        store.delete_all().unwrap();

        assert!(!store.dir().exists());
        assert!(store.ids(None).unwrap().is_empty());
        // Deleting an absent directory is fine.
        store.delete_all().unwrap();
    }

    #[test]
    fn test_ids_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &[]);

        for id in ["views_recent-node-1", "alpha", "views_recent-node-2"] {
            store.put(id, "x", false).unwrap();
        }

        assert_eq!(
            store.ids(None).unwrap(),
            vec!["alpha", "views_recent-node-1", "views_recent-node-2"]
        );
        let re = Regex::new("^views_").unwrap();
        assert_eq!(store.ids(Some(&re)).unwrap().len(), 2);
    }

    #[test]
    fn test_is_fragmentable() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, &["system_main_block", "views_block__*"]);

        assert!(!store.is_fragmentable("system_main_block"));
        assert!(!store.is_fragmentable("views_block__recent"));
        assert!(store.is_fragmentable("system_main"));
        assert!(store.is_fragmentable("alpha"));

        let open = self::store(&dir, &[]);
        assert!(open.is_fragmentable("system_main_block"));
    }
}
