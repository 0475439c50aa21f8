use anyhow::{Context, Result};
use std::process::ExitStatus;
use tokio::process::Command;

pub const DEFAULT_PING_COUNT: u32 = 4;

/// Arguments passed to the system `ping` for `count` echo requests.
pub fn ping_args(target: &str, count: u32) -> Vec<String> {
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    vec![count_flag.to_string(), count.to_string(), target.to_string()]
}

/// Run the system `ping` against `target`, streaming its output to our stdout.
pub async fn ping_target(target: &str, count: u32) -> Result<ExitStatus> {
    println!("📶 Pinging {target}...\n");
    let status = Command::new("ping")
        .args(ping_args(target, count))
        .status()
        .await
        .context("failed to run ping")?;
    tracing::debug!(%status, "ping exited");
    Ok(status)
}
