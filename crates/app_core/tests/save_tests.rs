mod common;

use app_core::{decode_file, Filter, JsonSidecar, MarkStore, SaveMode, StartAt};
use app_fs::UniversalPath;
use common::{current_name, names, Fixture, TIMEOUT};
use image::{Rgb, RgbImage};

#[test]
fn test_overwrite_reloads_from_disk() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let a = fx.path("a.png");
    let mut c = fx.open();
    assert_eq!(fx.state.cache.get(&a).unwrap().pixels.dimensions(), (4, 2));

    c.rotate_clockwise().unwrap();
    let written = c.save_current(SaveMode::Overwrite).unwrap();
    assert_eq!(written, a);
    assert_eq!(decode_file(a.as_path(), None).unwrap().dimensions(), (2, 4));

    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.viewer().rotation(), 0.0);
    assert!(!c.viewer().is_modified());
    assert!(!c.history().can_undo(&a));
    assert_eq!(c.display_pixels().unwrap().dimensions(), (2, 4));

    // The stale 4x2 decode is gone from the cache
    assert_eq!(fx.state.cache.get(&a).unwrap().pixels.dimensions(), (2, 4));
}

#[test]
fn test_overwrite_keeps_edits_of_other_images() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let mut c = fx.open();
    c.rotate_clockwise().unwrap();
    assert!(c.next());
    assert!(c.wait_for_current(TIMEOUT));

    c.save_current(SaveMode::Overwrite).unwrap();
    assert!(c.previous());
    assert_eq!(c.viewer().rotation(), 90.0);
}

#[test]
fn test_save_copy_names_and_selects_copy() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let mut c = fx.open();

    c.rotate_clockwise().unwrap();
    let copy = c.save_current(SaveMode::Copy).unwrap();
    assert_eq!(copy, fx.path("a_copy.png"));
    assert_eq!(names(&c), vec!["a.png", "a_copy.png", "b.png"]);
    assert_eq!(current_name(&c).as_deref(), Some("a_copy.png"));

    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.display_pixels().unwrap().dimensions(), (2, 4));

    // The original went back to its on-disk state
    assert!(c.previous());
    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.viewer().rotation(), 0.0);
    assert!(!c.viewer().is_modified());

    let second = c.save_current(SaveMode::Copy).unwrap();
    assert_eq!(second, fx.path("a_copy_1.png"));
}

#[test]
fn test_copy_of_favorite_is_favorite() {
    let fx = Fixture::new(&["a.png"]);
    let mut c = fx.open();
    c.toggle_favorite().unwrap();

    let copy = c.save_current(SaveMode::Copy).unwrap();
    assert!(c.is_favorite());
    assert_eq!(c.favorite_count(), 2);

    let stored = JsonSidecar
        .load_marked(&UniversalPath::new(fx.dir.path()))
        .unwrap();
    assert!(stored.favorites.contains(&copy));
}

#[test]
fn test_copy_hidden_by_filter_keeps_original() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let mut c = fx.open();
    c.toggle_compare().unwrap();
    c.set_filter(Filter::Compare).unwrap();
    c.rotate_clockwise().unwrap();

    c.save_current(SaveMode::Copy).unwrap();
    assert_eq!(c.filter(), Filter::Compare);
    assert_eq!(names(&c), vec!["a.png"]);
    assert_eq!(current_name(&c).as_deref(), Some("a.png"));

    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.viewer().rotation(), 0.0);
    assert!(fx.dir.path().join("a_copy.png").exists());
}

#[test]
fn test_jpeg_is_saved_without_alpha() {
    let fx = Fixture::new(&[]);
    RgbImage::from_pixel(6, 4, Rgb([200, 120, 40]))
        .save(fx.dir.path().join("photo.jpg"))
        .unwrap();

    let mut c = fx.state.controller();
    c.open_directory(fx.dir.path(), StartAt::First).unwrap();
    assert!(c.wait_for_current(TIMEOUT));

    c.rotate_clockwise().unwrap();
    c.save_current(SaveMode::Overwrite).unwrap();
    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.display_pixels().unwrap().dimensions(), (4, 6));
}

#[test]
fn test_save_without_pixels_is_rejected() {
    let fx = Fixture::new(&["a.png"]);
    let release = fx.source.hold(&fx.path("a.png"));

    let mut c = fx.state.controller();
    c.open_directory(fx.dir.path(), StartAt::First).unwrap();
    assert!(matches!(
        c.save_current(SaveMode::Copy),
        Err(app_core::AppError::Loading(_))
    ));

    release.send(()).unwrap();
    assert!(c.wait_for_current(TIMEOUT));
}

#[test]
fn test_overwrite_refuses_downscaled_image() {
    let mut config = common::test_config();
    config.viewer.max_dimension = Some(2);
    let fx = Fixture::with_config(&["a.png"], config);
    let a = fx.path("a.png");
    let mut c = fx.open();
    assert_eq!(c.display_pixels().unwrap().dimensions(), (2, 1));

    c.rotate_clockwise().unwrap();
    assert!(matches!(
        c.save_current(SaveMode::Overwrite),
        Err(app_core::AppError::Downscaled(_))
    ));
    assert_eq!(decode_file(a.as_path(), None).unwrap().dimensions(), (4, 2));
    assert_eq!(c.viewer().rotation(), 90.0);

    // A copy leaves the full-size original intact
    let copy = c.save_current(SaveMode::Copy).unwrap();
    assert_eq!(decode_file(copy.as_path(), None).unwrap().dimensions(), (1, 2));
    assert_eq!(decode_file(a.as_path(), None).unwrap().dimensions(), (4, 2));
}

#[test]
fn test_overwrite_allowed_when_image_fits_cap() {
    let mut config = common::test_config();
    config.viewer.max_dimension = Some(8);
    let fx = Fixture::with_config(&["a.png"], config);
    let a = fx.path("a.png");
    let mut c = fx.open();

    c.rotate_clockwise().unwrap();
    c.save_current(SaveMode::Overwrite).unwrap();
    assert_eq!(decode_file(a.as_path(), None).unwrap().dimensions(), (2, 4));
}
