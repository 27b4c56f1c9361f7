//! Run the gesture pipeline over a pose stream file.

use std::path::PathBuf;

use gestura_common::config::AppConfig;
use gestura_pipeline::run_source;
use gestura_pose_ingest::ReplaySource;
use gestura_pose_model::serialize_segments;

use super::{pipeline_config, PipelineOverrides};

pub async fn run(
    config: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    overrides: &PipelineOverrides,
    report: bool,
) -> anyhow::Result<()> {
    let pipeline_config = pipeline_config(config, overrides)?;
    let source = ReplaySource::open(&input)
        .map_err(|e| anyhow::anyhow!("Failed to open pose stream: {e}"))?;

    let result = run_source(pipeline_config, Box::new(source))
        .await
        .map_err(|e| anyhow::anyhow!("Pipeline failed: {e}"))?;

    let jsonl = serialize_segments(&result.segments)?;
    match output {
        Some(ref path) => {
            std::fs::write(path, &jsonl)?;
            eprintln!(
                "Wrote {} segment(s) to {}",
                result.segments.len(),
                path.display()
            );
        }
        None => print!("{jsonl}"),
    }

    let summary = &result.summary;
    eprintln!(
        "Frames: {} seen, {} accepted, {} rejected",
        summary.frames_seen, summary.frames_accepted, summary.frames_rejected
    );
    eprintln!(
        "Latency: p50 {:.3}ms, p95 {:.3}ms, max {:.3}ms (budget {}ms, {} over)",
        summary.latency.p50_ms,
        summary.latency.p95_ms,
        summary.latency.max_ms,
        summary.latency.budget_ms,
        summary.latency.over_budget
    );

    if report {
        eprintln!("{}", serde_json::to_string_pretty(summary)?);
    }

    if summary.segments_dropped > 0 {
        tracing::warn!(
            dropped = summary.segments_dropped,
            "Some segments were not delivered"
        );
    }

    if !summary.latency.within_budget() {
        tracing::warn!(
            over_budget = summary.latency.over_budget,
            "Some frames exceeded the latency budget"
        );
    }

    Ok(())
}
