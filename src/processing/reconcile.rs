//! Reconciliation of file records against the directory.
//!
//! Every record is created; a name collision falls back to fetch, compare and
//! update. Afterwards every remote segment the file did not name is deleted.
//! Names starting with the manual prefix are never touched on either side.

use crate::directory::{CreateOutcome, DirectoryClient};
use crate::error::SyncError;
use crate::models::{Record, RunReport};
use colored::Colorize;
use std::collections::HashSet;

/// Is `name` managed by hand rather than by the input file?
///
/// An empty prefix marks nothing as manual.
pub fn is_manual(name: &str, manual_prefix: &str) -> bool {
    !manual_prefix.is_empty() && name.starts_with(manual_prefix)
}

/// Bring the directory in line with `records`.
///
/// Operations are issued one at a time, in record order. The first failing
/// operation aborts the run; earlier operations stay applied.
///
/// # Arguments
/// * `records` - Desired segments, names unique
/// * `directory` - Directory service to converge
/// * `manual_prefix` - Names with this prefix are left alone
///
/// # Returns
/// * `Ok(RunReport)` - What was created, updated, left unchanged and deleted
/// * `Err(SyncError)` - The operation that failed and the name it failed for
pub async fn reconcile<D>(
    records: &[Record],
    directory: &D,
    manual_prefix: &str,
) -> Result<RunReport, SyncError>
where
    D: DirectoryClient + ?Sized,
{
    let mut report = RunReport::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in records {
        if is_manual(&record.name, manual_prefix) {
            log::info!(
                "{} '{}' (manual prefix '{manual_prefix}')",
                "excluded".yellow(),
                record.name
            );
            report.excluded.push(record.name.clone());
            continue;
        }

        match directory
            .create(record)
            .await
            .map_err(|e| SyncError::directory("create", &record.name, e))?
        {
            CreateOutcome::Created(segment) => {
                log::info!("{} {}", "created".green(), segment);
                report.created.push(record.name.clone());
            }
            CreateOutcome::Collided => {
                let mut segment = directory
                    .find_by_name(&record.name)
                    .await
                    .map_err(|e| SyncError::directory("lookup", &record.name, e))?;

                if segment.matches(record) {
                    log::info!("{} {}", "unchanged".dimmed(), record);
                    report.unchanged.push(record.name.clone());
                } else {
                    let old = segment.to_string();
                    segment
                        .apply(record)
                        .map_err(|source| SyncError::InvalidRange {
                            name: record.name.clone(),
                            source,
                        })?;
                    directory
                        .update(&segment)
                        .await
                        .map_err(|e| SyncError::directory("update", &record.name, e))?;
                    log::info!("{} {old} => {segment}", "updated".cyan());
                    report.updated.push(record.name.clone());
                }
            }
        }
        seen.insert(record.name.as_str());
    }

    let remote = directory
        .list_all()
        .await
        .map_err(|e| SyncError::directory("listing", "*", e))?;

    for (id, name) in remote {
        if is_manual(&name, manual_prefix) {
            log::debug!("Keeping manual segment '{name}'");
            continue;
        }
        if seen.contains(name.as_str()) {
            continue;
        }
        directory
            .delete(id)
            .await
            .map_err(|e| SyncError::directory("delete", &name, e))?;
        log::info!("{} #{id} {name}", "deleted".red());
        report.deleted.push(name);
    }

    report.finish();
    Ok(report)
}
