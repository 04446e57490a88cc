//! Network segment data model.

use super::ipv4::{cidr_for_range, ending_for_cidr, RangeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the end of every range in one input file is expressed.
///
/// Decided once from the column configuration; never per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    EndingAddress,
    Cidr,
}

impl fmt::Display for RangeMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangeMode::EndingAddress => write!(f, "ending address"),
            RangeMode::Cidr => write!(f, "cidr"),
        }
    }
}

/// End of a desired range: an explicit last address or a prefix length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeEnd {
    Ending(String),
    Cidr(u8),
}

impl fmt::Display for RangeEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangeEnd::Ending(ending) => write!(f, "{ending}"),
            RangeEnd::Cidr(cidr) => write!(f, "/{cidr}"),
        }
    }
}

/// One desired network segment, as read from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub starting: String,
    pub range_end: RangeEnd,
}

impl Record {
    pub fn new(name: &str, starting: &str, range_end: RangeEnd) -> Self {
        Record {
            name: name.to_string(),
            starting: starting.to_string(),
            range_end,
        }
    }

    /// The last address of the range, computed from the CIDR when needed.
    pub fn ending_address(&self) -> Result<String, RangeError> {
        match &self.range_end {
            RangeEnd::Ending(ending) => Ok(ending.clone()),
            RangeEnd::Cidr(cidr) => ending_for_cidr(&self.starting, *cidr),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.range_end {
            RangeEnd::Ending(ending) => write!(f, "{} {} - {}", self.name, self.starting, ending),
            RangeEnd::Cidr(cidr) => write!(f, "{} {}/{}", self.name, self.starting, cidr),
        }
    }
}

/// Identifier the directory service assigns to a segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A network segment as stored by the directory service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteSegment {
    pub id: SegmentId,
    pub name: String,
    #[serde(default)]
    pub starting_address: String,
    #[serde(default)]
    pub ending_address: String,
}

impl RemoteSegment {
    /// Prefix length of the stored range, if it is an aligned block.
    pub fn cidr(&self) -> Option<u8> {
        cidr_for_range(&self.starting_address, &self.ending_address)
    }

    /// Does the stored range equal the record's range?
    ///
    /// Starting addresses are compared as text. A CIDR record is compared by
    /// the ending address it resolves to, so `10.1.2.3/24` equals a stored
    /// `10.1.2.3 - 10.1.2.255`.
    pub fn matches(&self, record: &Record) -> bool {
        if self.starting_address != record.starting {
            return false;
        }
        match &record.range_end {
            RangeEnd::Ending(ending) => &self.ending_address == ending,
            RangeEnd::Cidr(_) => {
                record.ending_address().ok().as_deref() == Some(self.ending_address.as_str())
            }
        }
    }

    /// Overwrite the stored range with the record's range.
    pub fn apply(&mut self, record: &Record) -> Result<(), RangeError> {
        self.ending_address = record.ending_address()?;
        self.starting_address = record.starting.clone();
        Ok(())
    }
}

impl fmt::Display for RemoteSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "#{} {} {} - {}",
            self.id, self.name, self.starting_address, self.ending_address
        )?;
        if let Some(cidr) = self.cidr() {
            write!(f, " (/{cidr})")?;
        }
        Ok(())
    }
}
