mod common;

use app_core::{DecodeCache, DecodedImage, LoadGate, LoadStatus, StartAt};
use common::{test_config, Fixture, TIMEOUT};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

#[test]
fn test_cache_never_exceeds_capacity() {
    let cache = DecodeCache::new(3);
    for name in ["a", "b", "c", "d", "e"] {
        let path = app_fs::UniversalPath::new(format!("/loading-test/{}.png", name));
        cache.insert(Arc::new(DecodedImage::new(path, RgbaImage::new(1, 1))));
    }

    assert_eq!(cache.len(), 3);
    let keys: Vec<String> = cache
        .keys_by_recency()
        .into_iter()
        .map(|k| k.rsplit('/').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(keys, vec!["e.png", "d.png", "c.png"]);
}

#[test]
fn test_navigation_keeps_most_recent_decodes() {
    let mut config = test_config();
    config.cache.capacity = 2;
    let fx = Fixture::with_config(&["a.png", "b.png", "c.png", "d.png"], config);

    let mut controller = fx.open();
    for _ in 0..3 {
        assert!(controller.next());
        assert!(controller.wait_for_current(TIMEOUT));
    }

    let cache = &fx.state.cache;
    assert_eq!(cache.len(), 2);
    assert_eq!(
        cache.keys_by_recency(),
        vec![fx.path("d.png").key().to_string(), fx.path("c.png").key().to_string()]
    );
}

#[test]
fn test_revisit_is_served_from_cache() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let mut controller = fx.open();
    assert!(controller.next());
    assert!(controller.wait_for_current(TIMEOUT));
    assert_eq!(fx.source.decodes(), 2);

    assert!(controller.previous());
    assert!(controller.viewer().is_loaded());
    assert_eq!(fx.source.decodes(), 2);
}

#[test]
fn test_superseded_request_is_dropped() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let (a, b) = (fx.path("a.png"), fx.path("b.png"));
    let release_a = fx.source.hold(&a);

    let dispatcher = &fx.state.dispatcher;
    let gate = LoadGate::new();
    assert!(matches!(dispatcher.request(&a, &gate), LoadStatus::Pending(_)));
    let LoadStatus::Pending(second) = dispatcher.request(&b, &gate) else {
        panic!("b should not be cached yet");
    };

    let events = dispatcher.wait(TIMEOUT);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].request.path, b);
    assert_eq!(events[0].request.load_id, second);

    release_a.send(()).unwrap();
    let late = dispatcher.wait_idle(TIMEOUT);
    assert!(late.is_empty());

    // The late decode is still valid cache content
    assert!(dispatcher.cache().contains(&a));
}

#[test]
fn test_slow_previous_image_never_replaces_current() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let release_a = fx.source.hold(&fx.path("a.png"));

    let mut controller = fx.state.controller();
    controller
        .open_directory(fx.dir.path(), StartAt::First)
        .unwrap();
    assert!(controller.viewer().is_loading());
    assert!(matches!(
        controller.toggle_favorite(),
        Err(app_core::AppError::Loading(_))
    ));

    assert!(controller.next());
    assert!(controller.wait_for_current(TIMEOUT));

    release_a.send(()).unwrap();
    fx.state.dispatcher.wait_idle(TIMEOUT);
    assert_eq!(controller.pump(), 0);

    assert_eq!(controller.viewer().path(), Some(&fx.path("b.png")));
    let pixels = controller.display_pixels().unwrap();
    assert_eq!(*pixels.get_pixel(0, 0), Rgba([20, 100, 150, 255]));
}

#[test]
fn test_prefetch_warms_neighbors() {
    let mut config = test_config();
    config.viewer.prefetch_neighbors = true;
    let fx = Fixture::with_config(&["a.png", "b.png", "c.png"], config);

    let mut controller = fx.open();
    fx.state.dispatcher.wait_idle(TIMEOUT);
    assert!(fx.state.cache.contains(&fx.path("b.png")));

    assert!(controller.next());
    assert!(controller.viewer().is_loaded());
}

#[test]
fn test_broken_file_reports_load_failure() {
    let fx = Fixture::new(&["a.png"]);
    std::fs::write(fx.dir.path().join("b.png"), b"not a png").unwrap();

    let mut controller = fx.open();
    assert!(controller.next());
    assert!(controller.wait_for_current(TIMEOUT));

    assert!(controller.viewer().load_error().is_some());
    let notices = controller.take_notices();
    assert!(notices
        .iter()
        .any(|n| matches!(n, app_core::Notice::LoadFailed { .. })));
    assert!(controller.rotate_clockwise().is_err());
}

#[test]
fn test_decode_racing_an_overwrite_is_redone() {
    let fx = Fixture::new(&["a.png"]);
    let a = fx.path("a.png");
    let release = fx.source.hold(&a);

    let dispatcher = &fx.state.dispatcher;
    dispatcher.prefetch([&a]);
    fx.source.wait_for_decodes(1);

    // The held job has the old 4x2 pixels; the file now changes
    common::write_png(fx.dir.path(), "a.png", Rgba([1, 2, 3, 255]), 8, 8);
    dispatcher.invalidate(&a);

    let gate = LoadGate::new();
    assert!(matches!(dispatcher.request(&a, &gate), LoadStatus::Pending(_)));
    release.send(()).unwrap();

    let events = dispatcher.wait(TIMEOUT);
    assert_eq!(events.len(), 1);
    let image = events[0].result.as_ref().unwrap();
    assert_eq!(image.pixels.dimensions(), (8, 8));
    assert_eq!(fx.state.cache.get(&a).unwrap().pixels.dimensions(), (8, 8));
    assert_eq!(fx.source.decodes(), 2);
    assert_eq!(fx.state.cache.tracked_epochs(), 0);
}

#[test]
fn test_outdated_decode_never_reaches_cache() {
    let fx = Fixture::new(&["a.png"]);
    let a = fx.path("a.png");
    let release = fx.source.hold(&a);

    let dispatcher = &fx.state.dispatcher;
    dispatcher.prefetch([&a]);
    fx.source.wait_for_decodes(1);
    dispatcher.invalidate(&a);

    // The held decode finishes before anyone drains the channel
    release.send(()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert!(!fx.state.cache.contains(&a));
    assert_eq!(fx.source.decodes(), 1);

    // Draining redoes the decode under the new epoch
    dispatcher.wait_idle(TIMEOUT);
    assert!(fx.state.cache.contains(&a));
    assert_eq!(fx.source.decodes(), 2);
}

#[test]
fn test_invalidate_without_running_decode_tracks_nothing() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let mut controller = fx.open();
    assert!(controller.next());
    assert!(controller.wait_for_current(TIMEOUT));

    fx.state.dispatcher.invalidate(&fx.path("a.png"));
    controller.delete_current().unwrap();
    fx.state.dispatcher.wait_idle(TIMEOUT);
    assert_eq!(fx.state.cache.tracked_epochs(), 0);
}
