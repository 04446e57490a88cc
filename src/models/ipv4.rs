//! IPv4 range arithmetic for network segments.
//!
//! Network segments are stored remotely as a `starting..ending` address pair.
//! These helpers convert between that form and `starting/cidr`.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
    #[error("network length /{0} is too long")]
    MaskTooLong(u8),
}

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use netsegment_sync::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24).unwrap(), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask(len: u8) -> Result<u32, RangeError> {
    if len > MAX_LENGTH {
        Err(RangeError::MaskTooLong(len))
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Ok(mask as u32)
    }
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, RangeError> {
    let mask = get_cidr_mask(len)?;
    Ok(Ipv4Addr::from(u32::from(addr) & mask))
}

/// Calculate the broadcast address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> Result<Ipv4Addr, RangeError> {
    let mask = get_cidr_mask(len)?;
    let network_bits = u32::from(addr) & mask;
    Ok(Ipv4Addr::from(network_bits | !mask))
}

pub fn parse_addr(addr: &str) -> Result<Ipv4Addr, RangeError> {
    addr.trim()
        .parse()
        .map_err(|_| RangeError::InvalidAddress(addr.to_string()))
}

/// Last address of the block `starting/cidr`, as text.
///
/// The starting address does not have to be the network address; the block
/// it falls into is used, the same way a `10.1.2.3/24` interface address
/// names `10.1.2.0 - 10.1.2.255`.
pub fn ending_for_cidr(starting: &str, cidr: u8) -> Result<String, RangeError> {
    let start = parse_addr(starting)?;
    Ok(broadcast_addr(start, cidr)?.to_string())
}

/// Recover the prefix length of a `starting..ending` range.
///
/// Returns `None` when either address does not parse or the range is not an
/// aligned CIDR block.
pub fn cidr_for_range(starting: &str, ending: &str) -> Option<u8> {
    let start = parse_addr(starting).ok()?;
    let end = parse_addr(ending).ok()?;
    if end < start {
        return None;
    }
    let span = u32::from(start) ^ u32::from(end);
    // a block's host bits are all ones in `span`, with no gaps
    let host_bits = MAX_LENGTH - span.leading_zeros() as u8;
    let len = MAX_LENGTH - host_bits;
    if cut_addr(start, len).ok()? == start && broadcast_addr(start, len).ok()? == end {
        Some(len)
    } else {
        None
    }
}
