//! Validate a pose stream file.

use std::path::PathBuf;

use gestura_pose_ingest::{IngestConfig, PoseIngestor};
use gestura_pose_model::{parse_header, PoseFrame};

pub fn run(input: PathBuf) -> anyhow::Result<()> {
    println!("Validating pose stream at: {}", input.display());

    let content = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;

    let header = parse_header(&content).map_err(|e| anyhow::anyhow!("Invalid header: {e}"))?;
    match header {
        Some(ref h) => {
            println!("  Source: {}", h.source);
            println!("  Schema: {}", h.schema_version);
            if let Some(count) = h.keypoint_count {
                println!("  Declared keypoints: {count}");
            }
        }
        None => println!("  Header: none"),
    }

    let mut ingestor = PoseIngestor::new(IngestConfig {
        expected_keypoints: header.as_ref().and_then(|h| h.keypoint_count),
        ..Default::default()
    });

    let mut issues = vec![];
    let mut gaps = vec![];
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let frame: PoseFrame = match serde_json::from_str(trimmed) {
            Ok(frame) => frame,
            Err(e) => {
                ingestor.record_invalid();
                issues.push(format!("line {line_no}: {e}"));
                continue;
            }
        };

        match ingestor.ingest(frame) {
            Ok(ingested) if ingested.discontinuity => gaps.push(format!(
                "line {line_no}: {:.3}s gap before frame at {:.3}s",
                ingested.gap_secs.unwrap_or_default(),
                ingested.frame.timestamp()
            )),
            Ok(_) => {}
            Err(e) => issues.push(format!("line {line_no}: {e}")),
        }
    }

    let stats = ingestor.stats();
    println!("  Frames accepted: {}", stats.accepted);
    if let Some(layout) = ingestor.layout() {
        println!("  Keypoints per frame: {layout}");
    }

    if !gaps.is_empty() {
        println!("\nDiscontinuities:");
        for gap in &gaps {
            println!("  - {gap}");
        }
    }

    if issues.is_empty() {
        println!("\nPose stream is valid.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!(
            "\n{} issue(s) found ({} out of order, {} layout mismatches, {} invalid).",
            issues.len(),
            stats.out_of_order,
            stats.layout_mismatches,
            stats.invalid
        );
    }

    Ok(())
}
