use crate::sink::ResultSink;
use crate::types::{PortResult, PortStatus, ScanReport, ScanRequest};
use anyhow::{Context, Result};
use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpSocket;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use ::time::{format_description::well_known, OffsetDateTime};

/// Hard cap on concurrently live probes.
pub const MAX_CONCURRENCY: usize = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300);
pub const DEFAULT_OUTPUT: &str = "port_scan_results.txt";

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub concurrency: usize,
    pub timeout: Duration,
}

impl ScanConfig {
    /// Effective number of probes admitted at once, always within `1..=MAX_CONCURRENCY`.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: MAX_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Shared state for one scan invocation, handed to every probe task.
pub struct ScanContext {
    total: u64,
    scanned_done: AtomicU64,
    open_count: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    state: Mutex<ScanState>,
}

struct ScanState {
    entries: Vec<PortResult>,
    sink: ResultSink,
}

impl ScanContext {
    pub fn new(total: u64, sink: ResultSink) -> Self {
        Self {
            total,
            scanned_done: AtomicU64::new(0),
            open_count: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            state: Mutex::new(ScanState {
                entries: Vec::with_capacity(total.min(65535) as usize),
                sink,
            }),
        }
    }

    pub fn scanned_done(&self) -> u64 {
        self.scanned_done.load(Ordering::Relaxed)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    fn enter(self: &Arc<Self>) -> InFlight {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(self.clone())
    }

    /// Record one probe outcome. Entry, console line, file line and progress
    /// line are all written under the same lock.
    async fn record(&self, port: u16, outcome: io::Result<PortStatus>) {
        let mut state = self.state.lock().await;
        let written = match outcome {
            Ok(status) => {
                if status.is_open() {
                    self.open_count.fetch_add(1, Ordering::Relaxed);
                }
                let result = PortResult { port, status };
                state.entries.push(result);
                state.sink.record(&result)
            }
            Err(e) => {
                warn!(port, error = %e, "socket creation failed");
                self.failed.fetch_add(1, Ordering::Relaxed);
                state.sink.socket_error(port, &e)
            }
        };
        let done = self.scanned_done.fetch_add(1, Ordering::SeqCst) + 1;
        let written = written.and_then(|_| state.sink.progress(done, self.total));
        if let Err(e) = written {
            warn!(port, error = %e, "failed to write scan output");
        }
    }
}

struct InFlight(Arc<ScanContext>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connect-scan one port.
///
/// Returns `Err` only when the socket itself cannot be created; every connect
/// outcome is a classification. The socket is closed before returning.
pub async fn probe_port(addr: SocketAddrV4, timeout: Duration) -> io::Result<PortStatus> {
    let socket = TcpSocket::new_v4()?;
    let status = match time::timeout(timeout, socket.connect(SocketAddr::V4(addr))).await {
        Ok(Ok(_stream)) => PortStatus::Open,
        Ok(Err(_)) => PortStatus::ClosedOrFiltered,
        Err(_elapsed) => PortStatus::ClosedOrFilteredTimeout,
    };
    Ok(status)
}

/// Scan `request`, printing to stdout and writing the results file at `output`.
pub async fn scan(
    request: &ScanRequest,
    config: &ScanConfig,
    output: impl AsRef<Path>,
) -> Result<ScanReport> {
    let sink = ResultSink::stdout(output)?;
    scan_with_sink(request, config, sink).await
}

/// Scan every port of `request` with at most `config.effective_concurrency()` probes live.
///
/// Results go to `sink`, whose path is reported as `ScanReport::output`.
/// Returns once every port has an outcome and the results file is flushed and
/// closed. Entries are in completion order.
pub async fn scan_with_sink(
    request: &ScanRequest,
    config: &ScanConfig,
    mut sink: ResultSink,
) -> Result<ScanReport> {
    let target = request.target();
    let total = request.total();
    let concurrency = config.effective_concurrency();
    let timeout = config.timeout;
    let output = sink.path().to_path_buf();
    let started_at = now_iso_like();
    let start = Instant::now();

    info!(%target, start = request.start_port(), end = request.end_port(), concurrency, "starting scan");
    sink.header(&target.to_string(), request.start_port(), request.end_port())
        .context("failed to write scan header")?;

    let ctx = Arc::new(ScanContext::new(total, sink));
    let sem = Arc::new(Semaphore::new(concurrency));
    let mut set = JoinSet::new();

    for port in request.ports() {
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .context("probe semaphore closed")?;
        let ctx = ctx.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes
            let _live = ctx.enter();

            let outcome = probe_port(SocketAddrV4::new(target, port), timeout).await;
            if let Ok(status) = &outcome {
                debug!(port, %status, "probe finished");
            }
            ctx.record(port, outcome).await;
        });
    }

    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            warn!(error = %e, "probe task did not complete");
        }
    }

    let mut state = ctx.state.lock().await;
    state.sink.finish().context("failed to finish results file")?;
    let entries = std::mem::take(&mut state.entries);
    drop(state);

    let report = ScanReport {
        target: target.to_string(),
        start_port: request.start_port(),
        end_port: request.end_port(),
        scanned_total: total,
        scanned_done: ctx.scanned_done(),
        open_count: ctx.open_count.load(Ordering::Relaxed),
        failed: ctx.failed.load(Ordering::Relaxed),
        peak_concurrency: ctx.peak_in_flight(),
        elapsed_ms: start.elapsed().as_millis() as u64,
        started_at,
        output,
        entries,
    };
    info!(
        open = report.open_count,
        done = report.scanned_done,
        elapsed_ms = report.elapsed_ms,
        "scan finished"
    );
    Ok(report)
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    #[test]
    fn concurrency_is_clamped_to_cap() {
        let mut cfg = ScanConfig::default();
        assert_eq!(cfg.effective_concurrency(), 100);
        cfg.concurrency = 5_000;
        assert_eq!(cfg.effective_concurrency(), MAX_CONCURRENCY);
        cfg.concurrency = 0;
        assert_eq!(cfg.effective_concurrency(), 1);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn socket_creation_failure_counts_progress_without_entry() {
        let path = std::env::temp_dir().join(format!("ip-probe-sockfail-{}.txt", std::process::id()));
        let console = Captured::default();
        let sink = ResultSink::create(&path, Box::new(console.clone())).unwrap();
        let ctx = ScanContext::new(1, sink);

        ctx.record(7, Err(io::Error::other("boom"))).await;

        assert_eq!(ctx.scanned_done(), 1);
        assert_eq!(ctx.failed.load(Ordering::Relaxed), 1);
        assert_eq!(ctx.open_count.load(Ordering::Relaxed), 0);
        {
            let mut state = ctx.state.lock().await;
            assert!(state.entries.is_empty());
            state.sink.finish().unwrap();
        }

        let out = String::from_utf8(console.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("❌ Socket creation failed for port 7"));
        assert!(out.contains("[Progress] Scanned 1 / 1 ports"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn probe_listening_port_is_open() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let status = probe_port(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port), DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(status, PortStatus::Open);
    }

    #[tokio::test]
    async fn probe_refused_port_is_closed() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let l = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
            l.local_addr().unwrap().port()
        };
        let status = probe_port(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port), DEFAULT_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(status, PortStatus::ClosedOrFiltered);
    }

    #[tokio::test]
    #[ignore]
    async fn probe_silent_drop_times_out() {
        // TEST-NET-1 is unrouted, so SYNs go unanswered.
        let started = Instant::now();
        let status = probe_port(SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 80), DEFAULT_TIMEOUT)
            .await
            .unwrap();
        let elapsed = started.elapsed();
        assert_eq!(status, PortStatus::ClosedOrFilteredTimeout);
        assert!(elapsed >= Duration::from_millis(290) && elapsed <= Duration::from_millis(600));
    }
}
