use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use link_protocol::Command;
use tracing::debug;

/// Append-only record of every received telecommand, one text line per
/// command: `code,params-hex,timestamp`. The file itself is the downlink
/// artifact for the get-history command, compacted to the most recent
/// `keep_last` entries right before it is sent.
pub struct HistoryLog {
    path: PathBuf,
    keep_last: usize,
}

impl HistoryLog {
    pub fn new(path: PathBuf, keep_last: usize) -> Self {
        Self { path, keep_last }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, command: &Command) -> io::Result<()> {
        let line = format!(
            "0x{:02x},{},{}\n",
            command.code,
            hex::encode(&command.params),
            Utc::now().to_rfc3339()
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Keeps only the newest `keep_last` lines, oldest first out. Rewrites
    /// through a temp file and renames over the original.
    pub fn compact(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let lines: Vec<String> = BufReader::new(File::open(&self.path)?)
            .lines()
            .collect::<io::Result<_>>()?;
        if lines.len() <= self.keep_last {
            return Ok(());
        }
        let skip = lines.len() - self.keep_last;

        let tmp = self.path.with_extension("tmp");
        let mut out = File::create(&tmp)?;
        for line in &lines[skip..] {
            writeln!(out, "{line}")?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(dropped = skip, kept = self.keep_last, "history compacted");
        Ok(())
    }
}
