//! Show pose stream information.

use std::path::PathBuf;

use gestura_pose_model::{parse_stream, FrameStats};

pub fn run(input: PathBuf) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;
    let stream =
        parse_stream(&content).map_err(|e| anyhow::anyhow!("Failed to load pose stream: {e}"))?;

    println!("Pose stream: {}", input.display());
    match stream.header {
        Some(ref h) => {
            println!("  Source: {}", h.source);
            println!("  Schema: {}", h.schema_version);
            if let Some(ref epoch) = h.epoch_wall {
                println!("  Started: {epoch}");
            }
            if let Some(fps) = h.frame_rate_hz {
                println!("  Nominal rate: {fps} Hz");
            }
            if let Some(count) = h.keypoint_count {
                println!("  Keypoints: {count}");
            }
            if !h.keypoint_names.is_empty() {
                println!("  Landmarks: {}", h.keypoint_names.join(", "));
            }
        }
        None => println!("  Header: none"),
    }
    println!();

    let stats = FrameStats::from_frames(&stream.frames);
    println!("Frames:");
    println!("  Count: {}", stats.frame_count);
    println!("  Empty: {}", stats.empty_frames);
    println!("  Duration: {:.2}s", stats.duration_secs);
    println!("  Mean rate: {:.1} Hz", stats.mean_rate_hz);
    println!("  Mean confidence: {:.3}", stats.mean_confidence);
    if stats.ordering_violations > 0 {
        println!(
            "  Ordering violations: {} (run `gestura validate`)",
            stats.ordering_violations
        );
    }

    Ok(())
}
