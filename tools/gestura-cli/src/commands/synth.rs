//! Write a synthetic pose stream.

use std::path::PathBuf;

use gestura_pose_ingest::{parse_script, FrameSource, PoseWriter, SyntheticConfig, SyntheticSource};

pub fn run(
    output: PathBuf,
    script: &str,
    fps: u32,
    keypoints: usize,
    start_time: f64,
) -> anyhow::Result<()> {
    if fps == 0 {
        anyhow::bail!("--fps must be positive");
    }
    let steps = parse_script(script).map_err(|e| anyhow::anyhow!("Invalid script: {e}"))?;

    let mut source = SyntheticSource::new(
        SyntheticConfig {
            frame_rate_hz: fps,
            keypoint_count: keypoints,
            start_time,
            ..Default::default()
        },
        steps,
    );

    let header = source
        .header()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("synthetic source has no header"))?;
    let mut writer = PoseWriter::create(&output, &header)?;

    while let Some(frame) = source.next_frame()? {
        writer.write_frame(&frame)?;
    }
    writer.flush()?;

    println!(
        "Wrote {} frames ({} keypoints @ {} fps) to {}",
        writer.frames_written(),
        keypoints,
        fps,
        output.display()
    );
    Ok(())
}
