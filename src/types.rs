use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::error::PortRangeError;
use crate::ports;

/// Target address plus an inclusive port range. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    target: Ipv4Addr,
    start_port: u16,
    end_port: u16,
}

impl ScanRequest {
    /// Build a request, rejecting ranges outside `1..=65535` or with `start > end`.
    pub fn new(target: Ipv4Addr, start_port: u16, end_port: u16) -> Result<Self, PortRangeError> {
        ports::validate_range(start_port, end_port)?;
        Ok(Self {
            target,
            start_port,
            end_port,
        })
    }

    pub fn target(&self) -> Ipv4Addr {
        self.target
    }

    pub fn start_port(&self) -> u16 {
        self.start_port
    }

    pub fn end_port(&self) -> u16 {
        self.end_port
    }

    pub fn ports(&self) -> std::ops::RangeInclusive<u16> {
        self.start_port..=self.end_port
    }

    pub fn total(&self) -> u64 {
        u64::from(self.end_port - self.start_port) + 1
    }
}

/// Classification of a single connect probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Open,
    ClosedOrFiltered,
    ClosedOrFilteredTimeout,
}

impl PortStatus {
    pub fn is_open(self) -> bool {
        matches!(self, PortStatus::Open)
    }

    /// Console glyph shown in front of the line.
    pub fn glyph(self) -> &'static str {
        match self {
            PortStatus::Open => "✅",
            PortStatus::ClosedOrFiltered | PortStatus::ClosedOrFilteredTimeout => "❌",
        }
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortStatus::Open => "OPEN",
            PortStatus::ClosedOrFiltered => "CLOSED/FILTERED",
            PortStatus::ClosedOrFilteredTimeout => "CLOSED/FILTERED (timeout)",
        };
        f.write_str(s)
    }
}

/// Outcome for one port, created once and never mutated.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortResult {
    pub port: u16,
    pub status: PortStatus,
}

impl PortResult {
    /// Line written to the persisted results file.
    pub fn file_line(&self) -> String {
        format!("Port {}: {}", self.port, self.status)
    }

    /// Line written to the console.
    pub fn console_line(&self) -> String {
        format!("{} Port {} is {}", self.status.glyph(), self.port, self.status)
    }
}

/// Aggregate of one scan. Entries are in completion order, not port order.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanReport {
    pub target: String,
    pub start_port: u16,
    pub end_port: u16,
    pub scanned_total: u64,
    pub scanned_done: u64,
    pub open_count: u64,
    /// Probes that never got a socket; they count as done but add no entry.
    pub failed: u64,
    pub peak_concurrency: usize,
    pub elapsed_ms: u64,
    pub started_at: String,
    pub output: PathBuf,
    pub entries: Vec<PortResult>,
}

impl ScanReport {
    /// Ports classified OPEN, sorted ascending.
    pub fn open_ports(&self) -> Vec<u16> {
        let mut open: Vec<u16> = self
            .entries
            .iter()
            .filter(|e| e.status.is_open())
            .map(|e| e.port)
            .collect();
        open.sort_unstable();
        open
    }

    pub fn status_of(&self, port: u16) -> Option<PortStatus> {
        self.entries.iter().find(|e| e.port == port).map(|e| e.status)
    }
}
