//! Domain models for network segment sync.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Record`] - Desired network segment read from the input file
//! - [`RemoteSegment`] - Network segment as stored by the directory service
//! - [`RunReport`] - Summary of one reconciliation run
//! - IPv4 range helpers converting between ending addresses and CIDR

mod ipv4;
mod report;
mod segment;

// Re-export public types
pub use ipv4::{
    broadcast_addr, cidr_for_range, cut_addr, ending_for_cidr, get_cidr_mask, parse_addr,
    RangeError, MAX_LENGTH,
};
pub use report::{RunReport, SkippedLine};
pub use segment::{RangeEnd, RangeMode, Record, RemoteSegment, SegmentId};
