//! Per-frame latency benchmark on a synthetic stream.

use std::time::Instant;

use gestura_common::config::AppConfig;
use gestura_pipeline::GesturePipeline;
use gestura_pose_ingest::{parse_script, SyntheticConfig, SyntheticSource};
use gestura_pose_model::PoseFrame;

use super::{pipeline_config, PipelineOverrides};

pub fn run(
    config: &AppConfig,
    frames: usize,
    script: &str,
    overrides: &PipelineOverrides,
    json: bool,
) -> anyhow::Result<()> {
    let pipeline_config = pipeline_config(config, overrides)?;
    let synth_config = SyntheticConfig {
        frame_rate_hz: config.pipeline.frame_rate_hz,
        ..Default::default()
    };

    let steps = parse_script(script).map_err(|e| anyhow::anyhow!("Invalid script: {e}"))?;
    let per_pass = SyntheticSource::new(synth_config.clone(), steps.clone()).count();
    if per_pass == 0 {
        anyhow::bail!("script produces no frames");
    }
    let passes = frames.div_ceil(per_pass);
    let repeated = steps
        .iter()
        .copied()
        .cycle()
        .take(steps.len() * passes)
        .collect();
    let input: Vec<PoseFrame> = SyntheticSource::new(synth_config, repeated)
        .take(frames)
        .collect();

    tracing::info!(frames = input.len(), "Running benchmark");

    let mut pipeline = GesturePipeline::new(pipeline_config)?;
    let started = Instant::now();
    let segments = pipeline.run_frames(input)?;
    let wall = started.elapsed();
    let summary = pipeline.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let latency = &summary.latency;
    println!("Benchmark:");
    println!("  Frames: {}", latency.frames);
    println!("  Segments: {}", segments.len());
    println!(
        "  Throughput: {:.0} frames/s",
        latency.frames as f64 / wall.as_secs_f64().max(f64::EPSILON)
    );
    println!();
    println!("Latency per frame:");
    println!("  Mean: {:.4}ms", latency.mean_ms);
    println!("  p50:  {:.4}ms", latency.p50_ms);
    println!("  p95:  {:.4}ms", latency.p95_ms);
    println!("  Max:  {:.4}ms", latency.max_ms);
    println!(
        "  Budget: {}ms ({} frame(s) over)",
        latency.budget_ms, latency.over_budget
    );
    println!();
    println!(
        "Decision lag: mean {:.3}s, max {:.3}s",
        summary.decision_lag.mean_secs, summary.decision_lag.max_secs
    );

    if latency.within_budget() {
        println!("\nAll frames within budget.");
    } else {
        println!("\nLatency budget exceeded.");
    }
    Ok(())
}
