use std::io::{self, BufRead, Write};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use ip_probe::error::PortRangeError;
use ip_probe::scanner::{self, ScanConfig, DEFAULT_OUTPUT, MAX_CONCURRENCY};
use ip_probe::types::{ScanReport, ScanRequest};
use ip_probe::{ping, ports, prompt, resolver};
use std::fs::File;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// ip-probe — resolve a domain, show local host info, optionally ping it and scan its TCP ports.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ip-probe",
    version,
    about = "Resolve a domain, optionally ping it and run a bounded-concurrency TCP connect scan.",
    long_about = None
)]
struct Cli {
    /// Domain or IPv4 address to probe. If omitted, all answers are prompted for.
    domain: Option<String>,

    /// Prompt for every choice even when a domain is given.
    #[arg(short, long, default_value_t = false)]
    interactive: bool,

    /// Ping the target with the system `ping` before scanning.
    #[arg(long, default_value_t = false)]
    ping: bool,

    /// Number of echo requests sent by `--ping`.
    #[arg(long = "ping-count", default_value_t = ping::DEFAULT_PING_COUNT)]
    ping_count: u32,

    /// Inclusive port range to scan, e.g. `1-1024` or `443`. No scan if omitted.
    #[arg(long)]
    ports: Option<String>,

    /// Max concurrent TCP connect attempts (capped at 100).
    #[arg(long, default_value_t = MAX_CONCURRENCY)]
    concurrency: usize,

    /// Socket connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 300)]
    timeout_ms: u64,

    /// Plain-text results file, truncated on every scan.
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Also write the scan report as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            concurrency: self.concurrency,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    let code = if cli.interactive || cli.domain.is_none() {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        run_interactive(&cli, &mut input, &mut io::stdout()).await?
    } else {
        run_batch(&cli).await?
    };
    Ok(code)
}

/// Diagnostics go to stderr so they never mix with the result lines on stdout.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run_interactive<R: BufRead, W: Write>(
    cli: &Cli,
    input: &mut R,
    output: &mut W,
) -> Result<ExitCode> {
    let domain = match cli.domain.clone() {
        Some(d) => d,
        None => prompt::ask(input, output, "🔍 Enter a domain to resolve (e.g. google.com): ")?,
    };

    let Some(ip) = resolve_target(&domain).await else {
        return Ok(ExitCode::FAILURE);
    };
    println!();
    show_local_host().await;
    println!();

    if prompt::confirm(input, output, "🔁 Want to ping this domain? (y/n): ")? {
        run_ping(&domain, cli.ping_count).await;
    }
    println!();

    if prompt::confirm(input, output, "📦 Want to scan open ports? (y/n): ")? {
        let start = prompt::ask_port(input, output, "🛠 Enter start port (e.g. 1): ")?;
        let end = prompt::ask_port(input, output, "🛠 Enter end port (e.g. 1024): ")?;
        run_scan(cli, ip, ports::range_from(start, end)).await?;
    }

    finish();
    Ok(ExitCode::SUCCESS)
}

async fn run_batch(cli: &Cli) -> Result<ExitCode> {
    let domain = cli.domain.as_deref().unwrap_or_default();

    let Some(ip) = resolve_target(domain).await else {
        return Ok(ExitCode::FAILURE);
    };
    println!();
    show_local_host().await;
    println!();

    if cli.ping {
        run_ping(domain, cli.ping_count).await;
        println!();
    }

    if let Some(range) = cli.ports.as_deref() {
        run_scan(cli, ip, ports::parse_range(range)).await?;
    }

    finish();
    Ok(ExitCode::SUCCESS)
}

/// Resolution failure is the only condition that ends the run early.
async fn resolve_target(domain: &str) -> Option<Ipv4Addr> {
    match resolver::resolve_domain(domain).await {
        Ok(ip) => {
            println!("🌐 IP Address of {domain}: {ip}");
            Some(ip)
        }
        Err(e) => {
            eprintln!("❌ Failed to resolve domain: {e}");
            eprintln!("Exiting due to domain resolution failure.");
            None
        }
    }
}

async fn show_local_host() {
    match resolver::local_host_info().await {
        Ok(local) => {
            println!("💻 Local Hostname: {}", local.hostname);
            println!("📡 Local IP Address: {}", local.ip);
        }
        Err(e) => eprintln!("❌ {e}"),
    }
}

async fn run_ping(target: &str, count: u32) {
    match ping::ping_target(target, count).await {
        Ok(status) if !status.success() => eprintln!("Warning: ping exited with {status}"),
        Ok(_) => {}
        Err(e) => eprintln!("❌ {e:#}"),
    }
}

/// An invalid range is reported and skipped; the run carries on.
async fn run_scan(
    cli: &Cli,
    ip: Ipv4Addr,
    range: Result<(u16, u16), PortRangeError>,
) -> Result<()> {
    let request = match range.and_then(|(start, end)| ScanRequest::new(ip, start, end)) {
        Ok(req) => req,
        Err(e) => {
            eprintln!("❌ Invalid port range: {e}");
            return Ok(());
        }
    };

    let report = scanner::scan(&request, &cli.scan_config(), &cli.output).await?;
    print_summary(&report);

    if let Some(path) = cli.json.as_deref() {
        if let Err(e) = write_results_json(path, &report) {
            eprintln!("Failed to write JSON to {}: {}", path.display(), e);
        } else {
            println!("Wrote JSON results to {}", path.display());
        }
    }
    Ok(())
}

fn print_summary(report: &ScanReport) {
    let open = report.open_ports();
    println!(
        "Scanned {}/{} ports on {} in {} ms ({} open{})",
        report.scanned_done,
        report.scanned_total,
        report.target,
        report.elapsed_ms,
        report.open_count,
        if report.failed > 0 {
            format!(", {} socket failures", report.failed)
        } else {
            String::new()
        }
    );
    if !open.is_empty() {
        let list: Vec<String> = open.iter().map(u16::to_string).collect();
        println!("Open ports: {}", list.join(", "));
    }
}

fn finish() {
    println!("\n✅ Program finished. Have a good hacking day! 🚀");
}

fn write_results_json(path: &std::path::Path, report: &ScanReport) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
