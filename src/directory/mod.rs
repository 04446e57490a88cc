//! Directory service access.
//!
//! The directory is the system of record for network segments:
//! - [`jamf`] - Jamf Pro Classic API client
//! - [`memory`] - In-memory directory, used by tests

mod jamf;
mod memory;

use crate::error::DirectoryError;
use crate::models::{Record, RemoteSegment, SegmentId};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use jamf::{JamfClient, JamfConfig};
pub use memory::{Call, MemoryDirectory};

/// Result of a create attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(RemoteSegment),
    /// A segment with the same name already exists; nothing was written.
    Collided,
}

/// Operations the sync engine needs from a directory service.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Create a segment for `record`, or report that its name is taken.
    async fn create(&self, record: &Record) -> Result<CreateOutcome, DirectoryError>;

    /// Fetch the one segment called `name`.
    ///
    /// Fails with [`DirectoryError::NotFound`], or with
    /// [`DirectoryError::Ambiguous`] when several segments share the name.
    async fn find_by_name(&self, name: &str) -> Result<RemoteSegment, DirectoryError>;

    /// Write back the address range of an existing segment.
    async fn update(&self, segment: &RemoteSegment) -> Result<(), DirectoryError>;

    async fn delete(&self, id: SegmentId) -> Result<(), DirectoryError>;

    /// Every segment currently in the directory, id to name.
    async fn list_all(&self) -> Result<BTreeMap<SegmentId, String>, DirectoryError>;
}
