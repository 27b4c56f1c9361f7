//! Async pipeline sessions.
//!
//! A session owns one [`GesturePipeline`] inside a tokio task. Frames go in
//! through a bounded channel (back-pressure on the producer) and completed
//! segments come out on a second channel. The worker never waits on the
//! segment channel: when it is full or nobody holds the receiver, segments
//! are dropped and counted in [`PipelineSummary::segments_dropped`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use gestura_common::clock::{RateController, StreamClock};
use gestura_common::error::{GesturaError, GesturaResult};
use gestura_pose_ingest::FrameSource;
use gestura_pose_model::{GestureSegment, PoseFrame};

use crate::orchestrator::{GesturePipeline, PipelineConfig, PipelineSummary};

/// How often the worker re-checks the stop flag while no frames arrive.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Seconds between progress log lines.
const PROGRESS_INTERVAL_SECS: f64 = 5.0;

/// State of a pipeline session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, worker not started.
    Idle,
    /// Worker running and accepting frames.
    Running,
    /// Worker finished, summary available.
    Stopped,
}

/// Segments and totals from a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub segments: Vec<GestureSegment>,
    pub summary: PipelineSummary,
}

/// A pipeline running on a tokio task.
pub struct PipelineSession {
    config: PipelineConfig,
    state: SessionState,
    stop_flag: Arc<AtomicBool>,
    frames: Option<mpsc::Sender<PoseFrame>>,
    segments: Option<mpsc::Receiver<GestureSegment>>,
    task: Option<JoinHandle<GesturaResult<PipelineSummary>>>,
    source_rejections: u64,
}

impl PipelineSession {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            stop_flag: Arc::new(AtomicBool::new(false)),
            frames: None,
            segments: None,
            task: None,
            source_rejections: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Spawn the worker task. Must be called from within a tokio runtime.
    pub fn start(&mut self) -> GesturaResult<()> {
        if self.state != SessionState::Idle {
            return Err(GesturaError::pipeline("Session already started"));
        }

        let capacity = self.config.channel_capacity.max(1);
        let (frame_tx, frame_rx) = mpsc::channel(capacity);
        let (segment_tx, segment_rx) = mpsc::channel(capacity);

        let pipeline = GesturePipeline::new(self.config.clone())?;
        let stop_flag = self.stop_flag.clone();
        self.task = Some(tokio::spawn(run_worker(
            pipeline, frame_rx, segment_tx, stop_flag,
        )));
        self.frames = Some(frame_tx);
        self.segments = Some(segment_rx);
        self.state = SessionState::Running;

        tracing::info!(
            channel_capacity = capacity,
            budget_ms = self.config.latency_budget_ms,
            "Pipeline session started"
        );
        Ok(())
    }

    /// A sender for feeding frames. Sending waits while the channel is full.
    pub fn frame_sender(&self) -> Option<mpsc::Sender<PoseFrame>> {
        self.frames.clone()
    }

    /// Take the receiving end of the segment channel.
    ///
    /// Segments are buffered up to the channel capacity. Once the buffer is
    /// full, further segments are dropped until the receiver catches up.
    pub fn take_segments(&mut self) -> Option<mpsc::Receiver<GestureSegment>> {
        self.segments.take()
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Drive a frame source until it is exhausted or the session is stopped.
    ///
    /// Frames the source cannot decode are logged and counted; other
    /// source errors end the run. Returns the number of frames sent.
    pub async fn feed_source(&mut self, source: &mut dyn FrameSource) -> GesturaResult<u64> {
        let sender = self
            .frames
            .clone()
            .ok_or_else(|| GesturaError::pipeline("Session not running"))?;

        tracing::info!(source = %source.name(), "Feeding frames from source");
        let mut sent = 0u64;

        while !self.stop_flag.load(Ordering::Relaxed) {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    if sender.send(frame).await.is_err() {
                        tracing::warn!("Pipeline worker is gone, stopping source");
                        break;
                    }
                    sent += 1;
                }
                Ok(None) => break,
                Err(e) if e.is_frame_rejection() => {
                    self.source_rejections += 1;
                    tracing::warn!(source = %source.name(), error = %e, "Skipping unreadable frame");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(source = %source.name(), frames = sent, "Source finished");
        Ok(sent)
    }

    /// Close the frame channel, wait for the worker, and return its summary.
    pub async fn finish(&mut self) -> GesturaResult<PipelineSummary> {
        if self.state != SessionState::Running {
            return Err(GesturaError::pipeline("Session not running"));
        }

        self.frames = None;
        self.segments = None;
        let handle = self
            .task
            .take()
            .ok_or_else(|| GesturaError::pipeline("Pipeline worker missing"))?;

        let result = handle
            .await
            .map_err(|e| GesturaError::pipeline(format!("Pipeline worker join failed: {e}")))?;
        self.state = SessionState::Stopped;

        let mut summary = result?;
        summary.frames_seen += self.source_rejections;
        summary.frames_rejected += self.source_rejections;
        summary.ingest.invalid += self.source_rejections;

        tracing::info!(
            frames = summary.frames_seen,
            rejected = summary.frames_rejected,
            segments = summary.segments,
            p95_ms = summary.latency.p95_ms,
            over_budget = summary.latency.over_budget,
            "Pipeline session stopped"
        );
        Ok(summary)
    }

    /// Ask the worker to stop after the frame in hand, then finish.
    pub async fn stop(&mut self) -> GesturaResult<PipelineSummary> {
        tracing::info!("Stopping pipeline session");
        self.stop_flag.store(true, Ordering::SeqCst);
        self.finish().await
    }
}

/// Start a session with the given configuration.
pub fn spawn_pipeline(config: PipelineConfig) -> GesturaResult<PipelineSession> {
    let mut session = PipelineSession::new(config);
    session.start()?;
    Ok(session)
}

/// Run a whole source through a fresh session and collect every segment.
pub async fn run_source(
    config: PipelineConfig,
    mut source: Box<dyn FrameSource>,
) -> GesturaResult<SessionReport> {
    let config = config.with_header(source.header());
    let mut session = spawn_pipeline(config)?;

    let mut segment_rx = session
        .take_segments()
        .ok_or_else(|| GesturaError::pipeline("Segment channel already taken"))?;
    let collector = tokio::spawn(async move {
        let mut segments = vec![];
        while let Some(segment) = segment_rx.recv().await {
            segments.push(segment);
        }
        segments
    });

    let fed = session.feed_source(source.as_mut()).await;
    let summary = session.finish().await;
    let segments = collector
        .await
        .map_err(|e| GesturaError::pipeline(format!("Segment collector join failed: {e}")))?;

    fed?;
    Ok(SessionReport {
        segments,
        summary: summary?,
    })
}

async fn run_worker(
    mut pipeline: GesturePipeline,
    mut frames: mpsc::Receiver<PoseFrame>,
    segments: mpsc::Sender<GestureSegment>,
    stop_flag: Arc<AtomicBool>,
) -> GesturaResult<PipelineSummary> {
    let clock = StreamClock::start();
    let mut progress = RateController::every_secs(PROGRESS_INTERVAL_SECS);
    // The first tick fires immediately; consume it so logs start after one interval.
    progress.should_tick(clock.elapsed_ns());
    let mut dropped = 0u64;

    while !stop_flag.load(Ordering::Relaxed) {
        let frame = match tokio::time::timeout(STOP_POLL_INTERVAL, frames.recv()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(_) => continue,
        };

        match pipeline.process_frame(frame) {
            Ok(done) => dropped += publish(&segments, done),
            Err(e) if e.is_frame_rejection() => {
                tracing::warn!(error = %e, "Frame rejected");
            }
            Err(e) => {
                tracing::error!(error = %e, "Pipeline failed");
                return Err(e);
            }
        }

        if progress.should_tick(clock.elapsed_ns()) {
            let summary = pipeline.summary();
            tracing::info!(
                frames = summary.frames_seen,
                segments = summary.segments,
                dropped,
                p95_ms = summary.latency.p95_ms,
                "Pipeline progress"
            );
        }
    }

    let tail = pipeline.finish()?;
    dropped += publish(&segments, tail);

    let mut summary = pipeline.summary();
    summary.segments_dropped = dropped;
    Ok(summary)
}

/// Hand segments over without waiting. Returns how many could not be delivered.
fn publish(channel: &mpsc::Sender<GestureSegment>, segments: Vec<GestureSegment>) -> u64 {
    let mut dropped = 0;
    for segment in segments {
        match channel.try_send(segment) {
            Ok(()) => {}
            Err(TrySendError::Full(segment)) => {
                dropped += 1;
                tracing::warn!(
                    gesture = %segment.gesture_type(),
                    end = segment.end_time(),
                    "Segment channel full, dropping segment"
                );
            }
            Err(TrySendError::Closed(_)) => {
                dropped += 1;
                tracing::debug!("Segment receiver dropped");
            }
        }
    }
    dropped
}
