//! Change cache for the input file.
//!
//! Keeps the exact bytes of the last input that was synced successfully, so an
//! unchanged file can skip the whole run without talking to the directory.
//! A missing or unreadable cache only costs a full run, never blocks one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Should this input be processed, given the cached bytes of the last run?
///
/// False only when a cache exists and is byte-identical to `raw`.
pub fn should_process(raw: &[u8], cached: Option<&[u8]>) -> bool {
    match cached {
        Some(cached) => cached != raw,
        None => true,
    }
}

/// Cache file plus the contents read from it at load time.
#[derive(Debug, Clone)]
pub struct ChangeCache {
    path: PathBuf,
    cached: Option<Vec<u8>>,
}

impl ChangeCache {
    /// Read the cache file once.
    ///
    /// A missing file is the normal first-run case; any other read error is
    /// logged and treated the same way.
    pub fn load(path: impl Into<PathBuf>) -> ChangeCache {
        let path = path.into();
        let cached = match fs::read(&path) {
            Ok(bytes) => {
                log::info!(
                    "Read change cache {} ({} bytes)",
                    path.display(),
                    bytes.len()
                );
                Some(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No change cache at {}", path.display());
                None
            }
            Err(e) => {
                log::warn!(
                    "Cannot read change cache {}: {e}, processing input anyway",
                    path.display()
                );
                None
            }
        };
        ChangeCache { path, cached }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cached(&self) -> Option<&[u8]> {
        self.cached.as_deref()
    }

    pub fn should_process(&self, raw: &[u8]) -> bool {
        should_process(raw, self.cached())
    }

    /// Replace the cached bytes with `raw`.
    ///
    /// Written to a sibling temp file first and renamed over the cache, so a
    /// failed write never leaves a truncated cache behind.
    pub fn store(&mut self, raw: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        if let Err(e) = write_and_rename(&tmp_path, &self.path, raw) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        log::debug!("Wrote change cache {} ({} bytes)", self.path.display(), raw.len());
        self.cached = Some(raw.to_vec());
        Ok(())
    }
}

fn write_and_rename(tmp_path: &Path, path: &Path, raw: &[u8]) -> io::Result<()> {
    {
        let mut tmp_file = File::create(tmp_path)?;
        tmp_file.write_all(raw)?;
        tmp_file.sync_all()?;
    }
    fs::rename(tmp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_process() {
        assert!(should_process(b"a,b,c", None));
        assert!(should_process(b"a,b,c", Some(b"a,b,d")));
        assert!(should_process(b"a,b,c", Some(b"a,b,c\n")));
        assert!(!should_process(b"a,b,c", Some(b"a,b,c")));
        assert!(!should_process(b"", Some(b"")));
    }

    #[test]
    fn test_load_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ChangeCache::load(dir.path().join("nope.cache"));
        assert!(cache.cached().is_none());
        assert!(cache.should_process(b"anything"));
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("last_input.cache");

        let mut cache = ChangeCache::load(&path);
        cache.store(b"Office,10.0.0.1,10.0.0.254\n").unwrap();
        assert!(!cache.should_process(b"Office,10.0.0.1,10.0.0.254\n"));

        let reloaded = ChangeCache::load(&path);
        assert_eq!(reloaded.cached(), Some(&b"Office,10.0.0.1,10.0.0.254\n"[..]));
        assert!(reloaded.should_process(b"Office,10.0.0.1,10.0.0.200\n"));

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp file left behind: {leftovers:?}");
    }

    #[test]
    fn test_store_replaces_longer_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_input.cache");
        let mut cache = ChangeCache::load(&path);
        cache.store(b"a much longer previous input").unwrap();
        cache.store(b"short").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"short");
    }

    #[test]
    fn test_unreadable_cache_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // a directory can't be read as a file
        let cache = ChangeCache::load(dir.path());
        assert!(cache.cached().is_none());
        assert!(cache.should_process(b"x"));
    }

    #[test]
    fn test_store_failure_keeps_old_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_input.cache");
        fs::create_dir(&path).unwrap();
        let mut cache = ChangeCache::load(&path);
        assert!(cache.store(b"new").is_err());
        assert!(cache.cached().is_none());
        assert!(path.is_dir());
    }
}
