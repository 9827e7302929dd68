//! Follow a growing log file, yielding complete lines as they are appended.
//!
//! The follower polls: a read that returns no new data suspends for the poll
//! interval and tries again. Partial lines are kept in a buffer across polls
//! until their terminator arrives, so callers only ever see whole lines with
//! the trailing `\n` retained.

use anyhow::{Context, Result};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, warn};

/// Default wait after an empty read
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Where the follower starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPosition {
    /// Replay the whole file, then keep following
    Beginning,
    /// Live tail: only lines written after opening
    End,
}

pub struct LineFollower {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes of the file consumed so far (including buffered partial data)
    offset: u64,
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl LineFollower {
    /// Open `path` and position the follower at `start`.
    ///
    /// A missing file is an error; the follower never waits for a file to appear.
    pub async fn open<P: AsRef<Path>>(path: P, start: StartPosition) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)
            .await
            .with_context(|| format!("Failed to open log file {:?}", path))?;

        let offset = match start {
            StartPosition::Beginning => 0,
            StartPosition::End => file
                .seek(SeekFrom::End(0))
                .await
                .with_context(|| format!("Failed to seek to end of {:?}", path))?,
        };
        debug!("Following {:?} from byte offset {}", path, offset);

        Ok(Self {
            path,
            reader: BufReader::new(file),
            offset,
            pending: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the next complete line, terminator included.
    ///
    /// This never returns at end-of-file; it only returns early on an I/O error.
    /// Safe to use as a `tokio::select!` branch: bytes read before a
    /// cancellation stay in the pending buffer.
    pub async fn next_line(&mut self) -> Result<String> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.pending)
                .await
                .with_context(|| format!("Failed to read from {:?}", self.path))?;

            if read > 0 {
                self.offset += read as u64;
                if self.pending.last() == Some(&b'\n') {
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    self.pending.clear();
                    metrics::counter!("dwm.follower.lines_read_total").increment(1);
                    return Ok(line);
                }
                continue;
            }

            self.check_rotation().await?;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Restart from the top when the log was truncated in place, or follow the
    /// new file when it was rotated away and recreated under the same name.
    async fn check_rotation(&mut self) -> Result<()> {
        let current = self
            .reader
            .get_ref()
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {:?}", self.path))?;

        match tokio::fs::metadata(&self.path).await {
            Ok(on_disk) if !same_file(&current, &on_disk) => {
                let file = match File::open(&self.path).await {
                    Ok(file) => file,
                    Err(e) => {
                        debug!("{:?} was replaced but cannot be opened yet: {}", self.path, e);
                        return Ok(());
                    }
                };
                warn!(
                    "{:?} was rotated, following the new file from the beginning",
                    self.path
                );
                self.reader = BufReader::new(file);
                self.offset = 0;
                self.pending.clear();
                metrics::counter!("dwm.follower.rotations_total").increment(1);
                return Ok(());
            }
            Ok(_) => {}
            // Between the rename and the new file showing up
            Err(e) => debug!("{:?} is not there right now: {}", self.path, e),
        }

        if current.len() < self.offset {
            warn!(
                "{:?} shrank from {} to {} bytes, restarting from the beginning",
                self.path,
                self.offset,
                current.len()
            );
            self.reader
                .seek(SeekFrom::Start(0))
                .await
                .with_context(|| format!("Failed to rewind {:?}", self.path))?;
            self.offset = 0;
            self.pending.clear();
            metrics::counter!("dwm.follower.truncations_total").increment(1);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn same_file(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

/// Without inode numbers only in-place truncation is detected
#[cfg(not(unix))]
fn same_file(_a: &std::fs::Metadata, _b: &std::fs::Metadata) -> bool {
    true
}
