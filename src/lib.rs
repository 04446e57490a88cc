// cargo watch -x 'fmt' -x 'test'

pub mod config;
pub mod directory;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod processing;

pub use directory::{CreateOutcome, DirectoryClient, JamfClient, JamfConfig, MemoryDirectory};
pub use error::{DirectoryError, SyncError};
pub use input::{parse, should_process, ChangeCache, Column, ParsedInput};
pub use models::{RangeEnd, RangeMode, Record, RemoteSegment, RunReport, SegmentId};
pub use processing::{reconcile, sync_file, SyncOptions, SyncOutcome};
