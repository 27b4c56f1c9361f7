//! End-to-end segmentation over synthetic pose streams.

use gestura_gesture_core::{GestureSegmenter, SegmenterConfig, SmoothingAlgorithm};
use gestura_pose_ingest::{MotionStep, SyntheticConfig, SyntheticMotion, SyntheticSource};
use gestura_pose_model::{check_segment_order, GestureSegment, GestureType, PoseFrame};
use proptest::prelude::*;

fn frames(script: &str) -> Vec<PoseFrame> {
    SyntheticSource::from_script(script)
        .unwrap()
        .collect_frames()
}

fn segment(script: &str) -> Vec<GestureSegment> {
    GestureSegmenter::with_defaults()
        .segment_all(&frames(script))
        .unwrap()
}

fn labels(segments: &[GestureSegment]) -> Vec<GestureType> {
    segments.iter().map(|s| s.gesture_type()).collect()
}

#[test]
fn wave_between_pauses() {
    let segments = segment("still:0.5,wave:2,still:0.5");
    assert_eq!(labels(&segments), vec![GestureType::Wave]);

    let wave = &segments[0];
    assert!((wave.start_time() - 0.5).abs() < 1e-9);
    assert!(wave.end_time() > 2.4 && wave.end_time() < 2.7);
    assert!((wave.confidence() - 0.9).abs() < 1e-6);
}

#[test]
fn hold_then_wave_do_not_overlap() {
    let segments = segment("still:1,wave:2,still:0.5");
    assert_eq!(labels(&segments), vec![GestureType::Hold, GestureType::Wave]);
    assert!((segments[0].end_time() - 1.0).abs() < 1e-9);
    assert!(segments[1].start_time() >= segments[0].end_time());
    check_segment_order(&segments).unwrap();
}

#[test]
fn swipes_in_all_directions() {
    let segments = segment(
        "still:0.5,swipe_left:0.5,still:0.5,swipe_up:0.5,still:0.5,swipe_down:0.5,still:0.5",
    );
    assert_eq!(
        labels(&segments),
        vec![
            GestureType::SwipeLeft,
            GestureType::SwipeUp,
            GestureType::SwipeDown
        ]
    );
    for swipe in &segments {
        assert!(swipe.confidence() > 0.85);
        assert!(swipe.duration_secs() > 0.4 && swipe.duration_secs() < 0.7);
    }
}

#[test]
fn gap_closes_open_swipe() {
    let segments = segment("still:0.5,swipe_right:0.4,gap:1,still:0.5");
    assert_eq!(labels(&segments), vec![GestureType::SwipeRight]);
    assert!(segments[0].end_time() < 1.0);
}

#[test]
fn dropout_resets_tracking() {
    let mut segmenter = GestureSegmenter::with_defaults();
    let segments = segmenter
        .segment_all(&frames("still:0.5,wave:2,dropout:1,still:1.2"))
        .unwrap();
    assert_eq!(labels(&segments), vec![GestureType::Wave, GestureType::Hold]);
    assert_eq!(segmenter.stats().discontinuities, 1);
    assert!(segments[1].start_time() >= 3.5 - 1e-9);
}

#[test]
fn one_euro_smoothing_still_recognizes_swipe() {
    let mut segmenter = GestureSegmenter::new(SegmenterConfig {
        smoothing: SmoothingAlgorithm::OneEuro {
            min_cutoff: 1.0,
            beta: 0.15,
        },
        ..Default::default()
    });
    let segments = segmenter
        .segment_all(&frames("still:0.5,swipe_right:0.5,still:0.5"))
        .unwrap();
    assert_eq!(labels(&segments), vec![GestureType::SwipeRight]);
}

#[test]
fn tracking_a_single_keypoint() {
    let mut segmenter = GestureSegmenter::new(SegmenterConfig {
        tracking: gestura_gesture_core::TrackingTarget::Keypoint(0),
        ..Default::default()
    });
    let source = SyntheticSource::new(
        SyntheticConfig {
            keypoint_count: 5,
            ..Default::default()
        },
        vec![
            MotionStep::new(SyntheticMotion::Still, 0.5),
            MotionStep::new(SyntheticMotion::Swipe { dx: 0.0, dy: 0.4 }, 0.5),
            MotionStep::new(SyntheticMotion::Still, 0.5),
        ],
    );
    let segments = segmenter.segment_all(&source.collect_frames()).unwrap();
    assert_eq!(labels(&segments), vec![GestureType::SwipeDown]);
}

fn motion_strategy() -> impl Strategy<Value = SyntheticMotion> {
    prop_oneof![
        Just(SyntheticMotion::Still),
        (0.02f64..0.15, 0.5f64..3.0).prop_map(|(amplitude, frequency_hz)| SyntheticMotion::Wave {
            amplitude,
            frequency_hz
        }),
        (-0.3f64..0.3, -0.3f64..0.3).prop_map(|(dx, dy)| SyntheticMotion::Swipe { dx, dy }),
        Just(SyntheticMotion::Dropout),
        Just(SyntheticMotion::Gap),
    ]
}

proptest! {
    #[test]
    fn segments_are_ordered_bounded_and_disjoint(
        steps in prop::collection::vec((motion_strategy(), 0.1f64..2.5), 1..8)
    ) {
        let steps: Vec<MotionStep> = steps
            .into_iter()
            .map(|(motion, secs)| MotionStep::new(motion, secs))
            .collect();
        let frames = SyntheticSource::new(SyntheticConfig::default(), steps).collect_frames();
        let segments = GestureSegmenter::with_defaults().segment_all(&frames).unwrap();

        prop_assert!(check_segment_order(&segments).is_ok());
        for pair in segments.windows(2) {
            prop_assert!(!pair[0].overlaps(&pair[1]));
        }
        if let (Some(first), Some(last)) = (frames.first(), frames.last()) {
            for s in &segments {
                prop_assert!(s.start_time() >= first.timestamp() - 1e-9);
                prop_assert!(s.end_time() <= last.timestamp() + 1e-9);
                prop_assert!((0.0..=1.0).contains(&s.confidence()));
            }
        }
    }
}
