//! Frame source implementations.

mod synthetic;

pub use synthetic::{parse_script, MotionStep, SyntheticConfig, SyntheticMotion, SyntheticSource};

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};

use anyhow::Context;

use gestura_common::error::{GesturaError, GesturaResult};
use gestura_pose_model::{PoseFrame, PoseStreamHeader};

/// Replays a JSONL pose stream from disk, reading lazily line by line.
pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
    header: Option<PoseStreamHeader>,
    path: PathBuf,
    line_no: usize,
    name: String,
}

impl ReplaySource {
    /// Open a stream file. The header line, if present, is read eagerly.
    pub fn open(path: impl AsRef<Path>) -> GesturaResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(GesturaError::FileNotFound { path });
        }

        let file = File::open(&path)
            .with_context(|| format!("opening pose stream {}", path.display()))?;
        let prefix = read_until_content(BufReader::new(file))?;
        let header = gestura_pose_model::parse_header(&prefix)
            .map_err(|e| GesturaError::model(format!("{}: {e}", path.display())))?;

        let file = File::open(&path)
            .with_context(|| format!("opening pose stream {}", path.display()))?;

        Ok(Self {
            lines: BufReader::new(file).lines(),
            header,
            name: format!("replay:{}", path.display()),
            path,
            line_no: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl crate::FrameSource for ReplaySource {
    fn next_frame(&mut self) -> GesturaResult<Option<PoseFrame>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Err(GesturaError::model(format!(
                        "{} line {}: {e}",
                        self.path.display(),
                        self.line_no
                    )));
                }
                Err(e) => return Err(e.into()),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(trimmed).map_err(|e| {
                GesturaError::model(format!("{} line {}: {e}", self.path.display(), self.line_no))
            })?;
            return Ok(Some(frame));
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn header(&self) -> Option<&PoseStreamHeader> {
        self.header.as_ref()
    }
}

/// Leading lines of a stream up to and including the first non-blank one.
///
/// A first content line that is not valid UTF-8 ends the prefix; it is
/// reported later as an unreadable frame.
fn read_until_content(mut reader: impl BufRead) -> GesturaResult<String> {
    let mut prefix = String::new();
    loop {
        let before = prefix.len();
        match reader.read_line(&mut prefix) {
            Ok(0) => break,
            Ok(_) if prefix[before..].trim().is_empty() => continue,
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::InvalidData => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(prefix)
}

/// In-memory frame queue.
pub struct MemorySource {
    frames: VecDeque<PoseFrame>,
    header: Option<PoseStreamHeader>,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = PoseFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            header: None,
        }
    }

    pub fn with_header(mut self, header: PoseStreamHeader) -> Self {
        self.header = Some(header);
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl crate::FrameSource for MemorySource {
    fn next_frame(&mut self) -> GesturaResult<Option<PoseFrame>> {
        Ok(self.frames.pop_front())
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn header(&self) -> Option<&PoseStreamHeader> {
        self.header.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameSource;
    use gestura_pose_model::{serialize_frames, Keypoint};

    fn frames() -> Vec<PoseFrame> {
        (0..5)
            .map(|i| {
                PoseFrame::new(i as f64 * 0.1, vec![Keypoint::new(0.5, 0.5, 0.9)]).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_memory_source_drains_in_order() {
        let mut source = MemorySource::new(frames());
        assert_eq!(source.remaining(), 5);
        let mut seen = vec![];
        while let Some(frame) = source.next_frame().unwrap() {
            seen.push(frame.timestamp());
        }
        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(source.header().is_none());
    }

    #[test]
    fn test_replay_source_reads_header_and_frames() {
        let dir = std::env::temp_dir().join("gestura_test_replay");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("poses.jsonl");

        let header = PoseStreamHeader::new("unit-test", 10, 1);
        let content = serialize_frames(Some(&header), &frames()).unwrap();
        std::fs::write(&path, format!("{content}\n# trailer\n")).unwrap();

        let mut source = ReplaySource::open(&path).unwrap();
        assert_eq!(source.header().unwrap().source, "unit-test");
        assert!(source.name().starts_with("replay:"));

        let mut count = 0;
        while source.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_replay_source_reports_bad_line_and_continues() {
        let dir = std::env::temp_dir().join("gestura_test_replay_bad");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("poses.jsonl");
        std::fs::write(
            &path,
            "{\"timestamp\":0.0,\"keypoints\":[]}\n{\"timestamp\":\"soon\"}\n{\"timestamp\":0.2,\"keypoints\":[]}\n",
        )
        .unwrap();

        let mut source = ReplaySource::open(&path).unwrap();
        assert!(source.header().is_none());
        assert!(source.next_frame().unwrap().is_some());
        let err = source.next_frame().unwrap_err();
        assert!(err.is_frame_rejection());
        assert!(err.to_string().contains("line 2"));
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp(), 0.2);
        assert!(source.next_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_replay_source_skips_invalid_utf8_line() {
        let dir = std::env::temp_dir().join("gestura_test_replay_utf8");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("poses.jsonl");

        let mut bytes = b"{\"timestamp\":0.0,\"keypoints\":[]}\n".to_vec();
        bytes.extend_from_slice(b"{\"timestamp\":0.1,\xff\xfe}\n");
        bytes.extend_from_slice(b"{\"timestamp\":0.2,\"keypoints\":[]}\n");
        std::fs::write(&path, bytes).unwrap();

        let mut source = ReplaySource::open(&path).unwrap();
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp(), 0.0);
        let err = source.next_frame().unwrap_err();
        assert!(err.is_frame_rejection());
        assert!(err.to_string().contains("line 2"));
        assert_eq!(source.next_frame().unwrap().unwrap().timestamp(), 0.2);
        assert!(source.next_frame().unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_replay_source_finds_header_after_blank_lines() {
        let dir = std::env::temp_dir().join("gestura_test_replay_blank_header");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("poses.jsonl");

        let header = PoseStreamHeader::new("unit-test", 10, 1);
        let content = serialize_frames(Some(&header), &frames()).unwrap();
        std::fs::write(&path, format!("\n   \n{content}")).unwrap();

        let mut source = ReplaySource::open(&path).unwrap();
        assert_eq!(source.header().unwrap().keypoint_count, Some(1));
        let mut count = 0;
        while source.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_replay_source_without_header_after_blank_lines() {
        let prefix = read_until_content("\n\n{\"timestamp\":0.0}\nrest\n".as_bytes()).unwrap();
        assert_eq!(prefix, "\n\n{\"timestamp\":0.0}\n");
        assert!(gestura_pose_model::parse_header(&prefix).unwrap().is_none());
        assert_eq!(read_until_content("".as_bytes()).unwrap(), "");
    }

    #[test]
    fn test_replay_missing_file() {
        let result = ReplaySource::open("/definitely/not/here.jsonl");
        assert!(matches!(result, Err(GesturaError::FileNotFound { .. })));
    }
}
