//! One complete sync run: read, cache check, parse, reconcile, store.

use super::reconcile::reconcile;
use crate::directory::DirectoryClient;
use crate::error::SyncError;
use crate::input::{parse, ChangeCache, Column};
use crate::models::RunReport;
use std::path::PathBuf;

/// Options for [`sync_file`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub input: PathBuf,
    pub delimiter: String,
    pub columns: Option<Vec<Column>>,
    pub has_header: bool,
    pub manual_prefix: String,
    pub cache_path: PathBuf,
    /// Process the input even when it matches the cache.
    pub force: bool,
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// Input is byte-identical to the last successful run; nothing was done.
    Unchanged,
    Applied(RunReport),
}

/// Sync the directory with the input file.
///
/// The cache is read once before anything else and written only after the
/// reconciliation succeeded. A failing cache write is logged, not returned.
pub async fn sync_file<D>(options: &SyncOptions, directory: &D) -> Result<SyncOutcome, SyncError>
where
    D: DirectoryClient + ?Sized,
{
    let raw = std::fs::read(&options.input).map_err(|source| SyncError::Input {
        path: options.input.clone(),
        source,
    })?;
    log::info!(
        "Read {} bytes from {}",
        raw.len(),
        options.input.display()
    );

    let mut cache = ChangeCache::load(&options.cache_path);
    if !options.force && !cache.should_process(&raw) {
        log::info!("Input unchanged since last successful run");
        return Ok(SyncOutcome::Unchanged);
    }

    let text = String::from_utf8_lossy(&raw);
    let parsed = parse(
        &text,
        &options.delimiter,
        options.columns.as_deref(),
        options.has_header,
    )?;

    log::info!("Reconciling {} records in {} mode", parsed.records.len(), parsed.mode);
    let mut report = reconcile(&parsed.records, directory, &options.manual_prefix).await?;
    report.mode = Some(parsed.mode);
    report.skipped = parsed.skipped;

    if let Err(e) = cache.store(&raw) {
        log::warn!(
            "Cannot write change cache {}: {e}",
            cache.path().display()
        );
    }

    Ok(SyncOutcome::Applied(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::models::RangeMode;
    use std::fs;

    fn options(dir: &std::path::Path, body: &str) -> SyncOptions {
        let input = dir.join("segments.csv");
        fs::write(&input, body).unwrap();
        SyncOptions {
            input,
            delimiter: ",".to_string(),
            columns: None,
            has_header: true,
            manual_prefix: "Manual-".to_string(),
            cache_path: dir.join("cache").join("last_input.cache"),
            force: false,
        }
    }

    #[tokio::test]
    async fn test_cache_short_circuits_second_run() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path(), "name,starting,cidr\nLab,10.1.0.0,24\n");
        let dir = MemoryDirectory::new();

        let first = sync_file(&opts, &dir).await.unwrap();
        assert!(matches!(first, SyncOutcome::Applied(ref r) if r.created == vec!["Lab"]));

        dir.clear_calls();
        let second = sync_file(&opts, &dir).await.unwrap();
        assert!(matches!(second, SyncOutcome::Unchanged));
        assert!(dir.calls().is_empty());
    }

    #[tokio::test]
    async fn test_force_ignores_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = options(tmp.path(), "name,starting,cidr\nLab,10.1.0.0,24\n");
        let dir = MemoryDirectory::new();
        sync_file(&opts, &dir).await.unwrap();

        opts.force = true;
        let again = sync_file(&opts, &dir).await.unwrap();
        match again {
            SyncOutcome::Applied(report) => assert_eq!(report.unchanged, vec!["Lab"]),
            SyncOutcome::Unchanged => panic!("force must process"),
        }
    }

    #[tokio::test]
    async fn test_config_error_makes_no_calls_and_no_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path(), "name,starting\nLab,10.1.0.0\n");
        let dir = MemoryDirectory::new();

        let err = sync_file(&opts, &dir).await.unwrap_err();
        assert!(matches!(err, SyncError::Configuration { .. }));
        assert!(dir.calls().is_empty());
        assert!(!opts.cache_path.exists());
    }

    #[tokio::test]
    async fn test_failed_run_does_not_update_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path(), "name,starting,ending\nLab,10.1.0.1,10.1.0.9\n");
        let dir = MemoryDirectory::new();
        dir.fail_on("Lab");

        assert!(sync_file(&opts, &dir).await.is_err());
        assert!(!opts.cache_path.exists());
    }

    #[tokio::test]
    async fn test_fatal_directory_errors_do_not_update_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(tmp.path(), "name,starting,ending\nLab,10.1.0.1,10.1.0.9\n");

        let vanished = MemoryDirectory::new();
        vanished.vanish_after_collision("Lab");
        let err = sync_file(&opts, &vanished).await.unwrap_err();
        assert!(matches!(err, SyncError::Directory { operation: "lookup", .. }));
        assert!(!opts.cache_path.exists());

        let stuck = MemoryDirectory::new();
        let id = stuck.insert("Stuck", "10.5.0.1", "10.5.0.254");
        stuck.refuse_delete(id);
        let err = sync_file(&opts, &stuck).await.unwrap_err();
        assert!(matches!(err, SyncError::Directory { operation: "delete", .. }));
        assert!(!opts.cache_path.exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = options(tmp.path(), "");
        opts.input = tmp.path().join("missing.csv");
        let err = sync_file(&opts, &MemoryDirectory::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::Input { .. }));
    }

    #[tokio::test]
    async fn test_skipped_lines_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let opts = options(
            tmp.path(),
            "name,starting,ending\nLab,10.1.0.1,10.1.0.9\nBroken\n",
        );
        let outcome = sync_file(&opts, &MemoryDirectory::new()).await.unwrap();
        match outcome {
            SyncOutcome::Applied(report) => {
                assert_eq!(report.mode, Some(RangeMode::EndingAddress));
                assert_eq!(report.skipped.len(), 1);
                assert_eq!(report.skipped[0].line, 3);
            }
            SyncOutcome::Unchanged => panic!("first run must process"),
        }
    }
}
