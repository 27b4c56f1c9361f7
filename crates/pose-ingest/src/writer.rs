//! JSONL pose stream output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use gestura_common::error::GesturaResult;
use gestura_pose_model::{PoseFrame, PoseStreamHeader};

/// Frames between automatic flushes.
const FLUSH_INTERVAL_FRAMES: u64 = 1000;

/// Writes a pose stream: a `# {header}` comment line, then one frame per line.
///
/// Output is flushed every [`FLUSH_INTERVAL_FRAMES`] frames and on drop.
/// Write failures come back as `GesturaError::Io`, never as a frame rejection.
pub struct PoseWriter<W: Write = BufWriter<File>> {
    out: W,
    frames_written: u64,
}

impl PoseWriter {
    /// Create or truncate `path`, creating parent directories as needed.
    pub fn create(path: impl AsRef<Path>, header: &PoseStreamHeader) -> GesturaResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        tracing::debug!(path = %path.display(), "Writing pose stream");
        Self::from_writer(BufWriter::new(file), header)
    }
}

impl<W: Write> PoseWriter<W> {
    pub fn from_writer(out: W, header: &PoseStreamHeader) -> GesturaResult<Self> {
        let mut writer = Self {
            out,
            frames_written: 0,
        };
        writer.out.write_all(b"# ")?;
        writer.write_line(header)?;
        Ok(writer)
    }

    pub fn write_frame(&mut self, frame: &PoseFrame) -> GesturaResult<()> {
        self.write_line(frame)?;
        self.frames_written += 1;
        if self.frames_written % FLUSH_INTERVAL_FRAMES == 0 {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> GesturaResult<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_line(&mut self, value: &impl Serialize) -> GesturaResult<()> {
        let json = serde_json::to_string(value)?;
        writeln!(self.out, "{json}")?;
        Ok(())
    }
}

impl<W: Write> Drop for PoseWriter<W> {
    fn drop(&mut self) {
        if let Err(e) = self.out.flush() {
            tracing::warn!(error = %e, frames = self.frames_written, "Failed to flush pose stream");
        }
    }
}
