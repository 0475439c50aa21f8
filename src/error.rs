use std::io;

use thiserror::Error;

/// Reasons a user-supplied port range is rejected before any scanning starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortRangeError {
    #[error("port out of range: {0}")]
    OutOfRange(u32),
    #[error("invalid port value: {0}")]
    NotANumber(String),
    #[error("invalid range {start}-{end} (start > end)")]
    Inverted { start: u16, end: u16 },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to resolve {domain}: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: io::Error,
    },
    #[error("no IPv4 address found for {0}")]
    NoIpv4(String),
    #[error("failed to get local hostname: {0}")]
    Hostname(String),
    #[error("failed to read local interfaces: {0}")]
    Interfaces(#[source] io::Error),
}
