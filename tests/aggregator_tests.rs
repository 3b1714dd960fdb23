// Event routing: classifier decision feeding the frame tracker or GPS table

mod common;

use camtelemetry::aggregator::RouteOutcome;
use camtelemetry::classifier::EventKind;
use camtelemetry::error::IngestError;
use camtelemetry::models::{GpsMetric, TopSnapshot};
use chrono::Utc;
use common::{FakeFs, aggregator_with, batch, fix_json, local_aggregator, ts};
use std::path::Path;

#[test]
fn test_route_frame_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("frame-0001.jpg");
    std::fs::write(&path, vec![0u8; 2048]).unwrap();

    let aggregator = local_aggregator();
    let outcome = aggregator.route(&path);
    assert!(matches!(outcome, RouteOutcome::Routed(EventKind::Frame)));

    let last = aggregator.frames().last_frame().unwrap();
    assert_eq!(last.filename, "frame-0001.jpg");
    assert_eq!(last.size, 2048);
    assert_eq!(aggregator.frames().stats().frame_total_count, 1);
}

#[test]
fn test_route_gps_batch_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let gps_dir = dir.path().join("gps");
    std::fs::create_dir(&gps_dir).unwrap();
    let path = gps_dir.join("batch-0001.json");
    std::fs::write(&path, batch(&[fix_json("3D", 1.5, ts(12, 0, 0))])).unwrap();

    let aggregator = local_aggregator();
    let outcome = aggregator.route(&path);
    assert!(matches!(outcome, RouteOutcome::Routed(EventKind::GpsBatch)));
    assert_eq!(aggregator.gps().snapshot()[&GpsMetric::Hdop][0].value(), 1.5);
    assert_eq!(aggregator.frames().stats().frame_total_count, 0);
}

#[test]
fn test_vanished_frame_is_dropped() {
    let aggregator = aggregator_with(Box::new(FakeFs::default()));
    let outcome = aggregator.route(Path::new("/images/gone.jpg"));
    assert!(matches!(
        outcome,
        RouteOutcome::Dropped(IngestError::Stat { .. })
    ));
    assert_eq!(aggregator.frames().stats().frame_total_count, 0);
    assert!(aggregator.frames().last_frame().is_none());
}

#[test]
fn test_vanished_gps_batch_is_dropped() {
    let aggregator = aggregator_with(Box::new(FakeFs::default()));
    let outcome = aggregator.route(Path::new("/data/gps/gone.json"));
    assert!(matches!(
        outcome,
        RouteOutcome::Dropped(IngestError::Read { .. })
    ));
}

#[test]
fn test_unreadable_gps_batch_marks_stale_until_next_good_batch() {
    let fs = FakeFs::with(&[("/data/gps/good.json", "[]")]);
    let aggregator = aggregator_with(Box::new(fs));

    let outcome = aggregator.route(Path::new("/data/gps/missing.json"));
    assert!(matches!(
        outcome,
        RouteOutcome::Dropped(IngestError::Read { .. })
    ));
    assert!(aggregator.gps().is_stale());

    let outcome = aggregator.route(Path::new("/data/gps/good.json"));
    assert!(matches!(outcome, RouteOutcome::Routed(EventKind::GpsBatch)));
    assert!(!aggregator.gps().is_stale());
}

#[test]
fn test_malformed_gps_batch_is_dropped_and_stale() {
    let fs = FakeFs::with(&[("/data/gps/bad.json", "{not json")]);
    let aggregator = aggregator_with(Box::new(fs));
    let outcome = aggregator.route(Path::new("/data/gps/bad.json"));
    assert!(matches!(
        outcome,
        RouteOutcome::Dropped(IngestError::Parse(_))
    ));
    assert!(aggregator.gps().is_stale());
}

#[test]
fn test_unwatched_extension_is_dropped() {
    let fs = FakeFs::with(&[("/images/frame.tmp", "xx")]);
    let aggregator = aggregator_with(Box::new(fs));
    let outcome = aggregator.route(Path::new("/images/frame.tmp"));
    assert!(matches!(
        outcome,
        RouteOutcome::Dropped(IngestError::Unwatched { .. })
    ));
    assert_eq!(aggregator.frames().stats().frame_total_count, 0);
}

#[test]
fn test_json_without_marker_counts_as_frame() {
    let fs = FakeFs::with(&[("/images/meta.json", "{}")]);
    let aggregator = aggregator_with(Box::new(fs));
    let outcome = aggregator.route(Path::new("/images/meta.json"));
    assert!(matches!(outcome, RouteOutcome::Routed(EventKind::Frame)));
    assert_eq!(aggregator.frames().last_frame().unwrap().size, 2);
    assert_eq!(aggregator.gps().bucket_count(), 0);
}

#[test]
fn test_dropped_events_counter() {
    let aggregator = local_aggregator();
    assert_eq!(aggregator.dropped_events(), 0);
    aggregator.record_dropped(3);
    aggregator.record_dropped(1);
    assert_eq!(aggregator.dropped_events(), 4);
}

#[test]
fn test_top_publish_and_stale() {
    let aggregator = local_aggregator();
    assert_eq!(aggregator.top().top, None);
    assert!(!aggregator.top().stale);

    let snapshot = TopSnapshot {
        timestamp: Utc::now(),
        frame_stats: aggregator.frames().stats(),
        memory: Default::default(),
        cpu: Default::default(),
    };
    aggregator.publish_top(snapshot);
    assert_eq!(aggregator.top().top, Some(snapshot));

    aggregator.mark_top_stale();
    let state = aggregator.top();
    assert!(state.stale);
    assert_eq!(state.top, Some(snapshot));

    aggregator.publish_top(snapshot);
    assert!(!aggregator.top().stale);
}

#[test]
fn test_subscribers_see_published_snapshots() {
    let aggregator = local_aggregator();
    let mut rx = aggregator.subscribe_top();
    assert!(!rx.has_changed().unwrap());

    aggregator.publish_top(TopSnapshot {
        timestamp: Utc::now(),
        frame_stats: Default::default(),
        memory: Default::default(),
        cpu: Default::default(),
    });
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().top.is_some());
}
