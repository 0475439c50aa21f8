use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::types::PortResult;

/// Console plus persisted-file output for one scan.
///
/// The file is truncated on creation, so rerunning a scan replaces the previous
/// results. Callers serialize access (the scanner keeps the sink behind its
/// state mutex) so a port's console line and file line are written together.
pub struct ResultSink {
    console: Box<dyn Write + Send>,
    file: Option<BufWriter<File>>,
    path: PathBuf,
}

impl ResultSink {
    /// Create (or truncate) `path` and write console output to `console`.
    pub fn create(path: impl AsRef<Path>, console: Box<dyn Write + Send>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("failed to create results file: {}", path.display()))?;
        Ok(Self {
            console,
            file: Some(BufWriter::new(file)),
            path,
        })
    }

    /// Same as [`ResultSink::create`] with stdout as the console.
    pub fn stdout(path: impl AsRef<Path>) -> Result<Self> {
        Self::create(path, Box::new(io::stdout()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&mut self, target: &str, start: u16, end: u16) -> io::Result<()> {
        writeln!(
            self.console,
            "\n🔍 Starting port scan on {target} from port {start} to {end}..."
        )
    }

    /// Write the console line and the file line for one port.
    pub fn record(&mut self, result: &PortResult) -> io::Result<()> {
        writeln!(self.console, "{}", result.console_line())?;
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", result.file_line())?;
        }
        Ok(())
    }

    pub fn socket_error(&mut self, port: u16, err: &io::Error) -> io::Result<()> {
        writeln!(self.console, "❌ Socket creation failed for port {port}: {err}")
    }

    /// Transient progress line; carriage return so the next one overwrites it.
    pub fn progress(&mut self, done: u64, total: u64) -> io::Result<()> {
        write!(self.console, "[Progress] Scanned {done} / {total} ports\r")?;
        self.console.flush()
    }

    /// Flush and close the results file, then print the summary line.
    /// Calling it again is a no-op for the file.
    pub fn finish(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        writeln!(
            self.console,
            "\n\n📝 Port scan results saved to {}",
            self.path.display()
        )?;
        self.console.flush()
    }
}
