//! Log file tailer.
//!
//! Each [`FileTail`] remembers how far into its file it has read. Polling
//! reads whatever was appended since, hands back the complete lines and
//! keeps any unterminated tail until its newline arrives. A file shorter
//! than the remembered offset was truncated and is read again from the
//! start.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Read position in one log file.
#[derive(Debug)]
pub struct FileTail {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
}

impl FileTail {
    /// Start at the current end of `path`. A missing file is followed from
    /// its first byte once it appears.
    pub fn at_end(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let offset = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Log file not readable yet");
                0
            }
        };
        Self {
            path,
            offset,
            partial: Vec::new(),
        }
    }

    /// Start at the first byte of `path`.
    pub fn from_start(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            partial: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read newly appended data and return the lines it completed, without
    /// their line terminators.
    pub fn poll(&mut self) -> io::Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let len = file.metadata()?.len();
        if len < self.offset {
            info!(path = %self.path.display(), "Log file truncated, reading from start");
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let read = file.take(len - self.offset).read_to_end(&mut self.partial)?;
        self.offset += read as u64;

        let mut lines = Vec::new();
        while let Some(end) = self.partial.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.partial.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(lines)
    }
}

/// Poll every tail at `every` and send completed lines down `lines`, in
/// file order. Returns once the receiving side is gone.
pub async fn tail_files(mut tails: Vec<FileTail>, every: Duration, lines: mpsc::Sender<String>) {
    info!(files = tails.len(), interval_ms = every.as_millis() as u64, "Tailer started");

    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        for tail in &mut tails {
            let new_lines = match tail.poll() {
                Ok(new_lines) => new_lines,
                Err(err) => {
                    warn!(path = %tail.path().display(), error = %err, "Cannot read log file");
                    continue;
                }
            };
            for line in new_lines {
                if lines.send(line).await.is_err() {
                    info!("Line channel closed, tailer stopped");
                    return;
                }
            }
        }
    }
}
