mod common;

use app_core::transform::{apply_brightness, render, rotate};
use app_core::{AppError, CropRect, CropSpec, SharpenParams, StartAt};
use common::{Fixture, TIMEOUT};
use image::{imageops, Rgba, RgbaImage};
use std::sync::Arc;

#[test]
fn test_undo_redo_round_trip() {
    let fx = Fixture::new(&["a.png"]);
    let mut c = fx.open();

    c.rotate_clockwise().unwrap();
    c.begin_brightness().unwrap();
    c.set_brightness(0.9).unwrap();
    c.set_brightness(0.8).unwrap();
    c.end_brightness();

    assert_eq!(c.undo().unwrap(), Some(false));
    assert_eq!(c.viewer().rotation(), 90.0);
    assert_eq!(c.viewer().brightness(), 1.0);

    assert_eq!(c.undo().unwrap(), Some(false));
    assert_eq!(c.viewer().rotation(), 0.0);
    assert!(!c.viewer().is_modified());
    assert_eq!(c.undo().unwrap(), None);

    c.redo().unwrap();
    c.redo().unwrap();
    assert_eq!(c.viewer().rotation(), 90.0);
    assert_eq!(c.viewer().brightness(), 0.8);
    assert!(c.viewer().is_modified());
    assert_eq!(c.redo().unwrap(), None);
}

#[test]
fn test_new_edit_clears_redo() {
    let fx = Fixture::new(&["a.png"]);
    let path = fx.path("a.png");
    let mut c = fx.open();

    c.rotate_clockwise().unwrap();
    c.undo().unwrap();
    assert!(c.history().can_redo(&path));

    c.rotate_clockwise().unwrap();
    assert!(!c.history().can_redo(&path));
    assert_eq!(c.redo().unwrap(), None);
}

#[test]
fn test_unchanged_brightness_gesture_records_nothing() {
    let fx = Fixture::new(&["a.png"]);
    let path = fx.path("a.png");
    let mut c = fx.open();

    c.begin_brightness().unwrap();
    c.set_brightness(1.0).unwrap();
    c.end_brightness();
    assert!(!c.history().can_undo(&path));
}

#[test]
fn test_render_rotates_before_brightness() {
    let base = RgbaImage::from_fn(8, 8, |x, _| {
        if x < 4 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let original = Arc::new(base.clone());

    // Quarter turns are exact and commute with a per-pixel curve
    let mut expected = imageops::rotate90(&base);
    apply_brightness(&mut expected, 0.5);
    assert_eq!(*render(&original, 90.0, 0.5), expected);

    // Interpolated edges do not
    let rendered = render(&original, 30.0, 0.5);
    let mut brightened_first = base.clone();
    apply_brightness(&mut brightened_first, 0.5);
    let wrong_order = rotate(&brightened_first, 30.0);
    assert_eq!(rendered.dimensions(), wrong_order.dimensions());
    assert_ne!(*rendered, wrong_order);
}

#[test]
fn test_neutral_render_shares_pixels() {
    let original = Arc::new(RgbaImage::new(3, 3));
    let rendered = render(&original, 360.0, 1.0);
    assert!(Arc::ptr_eq(&original, &rendered));
}

#[test]
fn test_edits_survive_navigation() {
    let fx = Fixture::new(&["a.png", "b.png"]);
    let mut c = fx.open();

    c.rotate_clockwise().unwrap();
    assert!(c.next());
    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.viewer().rotation(), 0.0);

    assert!(c.previous());
    assert!(c.viewer().is_loaded());
    assert_eq!(c.viewer().rotation(), 90.0);
    assert!(c.viewer().is_modified());

    assert_eq!(c.undo().unwrap(), Some(false));
    assert_eq!(c.viewer().rotation(), 0.0);
}

#[test]
fn test_reopening_folder_discards_edits() {
    let fx = Fixture::new(&["a.png"]);
    let path = fx.path("a.png");
    let mut c = fx.open();
    c.rotate_clockwise().unwrap();

    c.open_directory(fx.dir.path(), StartAt::First).unwrap();
    assert!(c.wait_for_current(TIMEOUT));
    assert_eq!(c.viewer().rotation(), 0.0);
    assert!(!c.history().can_undo(&path));
}

#[test]
fn test_crop_and_undo_refits_view() {
    let fx = Fixture::new(&["a.png"]);
    let mut c = fx.open();

    let spec = CropSpec {
        rect: CropRect::new(1, 0, 2, 1),
        rotation: 0.0,
        aspect: None,
    };
    c.apply_crop(&spec, false).unwrap();
    assert_eq!(c.display_pixels().unwrap().dimensions(), (2, 1));

    c.view_mut().set_zoom(3.0);
    assert_eq!(c.undo().unwrap(), Some(true));
    assert!(c.viewer().view.auto_fit);
    assert_eq!(c.display_pixels().unwrap().dimensions(), (4, 2));
}

#[test]
fn test_crop_outside_image_is_rejected() {
    let fx = Fixture::new(&["a.png"]);
    let mut c = fx.open();

    let spec = CropSpec {
        rect: CropRect::new(10, 10, 5, 5),
        rotation: 0.0,
        aspect: None,
    };
    assert!(matches!(c.apply_crop(&spec, false), Err(AppError::InvalidEdit(_))));
    assert!(!c.viewer().is_modified());
}

#[test]
fn test_sharpen_is_undoable() {
    let fx = Fixture::new(&["a.png"]);
    let path = fx.path("a.png");
    let mut c = fx.open();

    c.rotate_clockwise().unwrap();
    c.apply_sharpen(&SharpenParams::default()).unwrap();
    assert_eq!(c.viewer().rotation(), 0.0);
    assert_eq!(c.display_pixels().unwrap().dimensions(), (2, 4));

    assert!(c.history().can_undo(&path));
    c.undo().unwrap();
    assert_eq!(c.viewer().rotation(), 90.0);
}

#[test]
fn test_edits_rejected_while_loading() {
    let fx = Fixture::new(&["a.png"]);
    let release = fx.source.hold(&fx.path("a.png"));

    let mut c = fx.state.controller();
    c.open_directory(fx.dir.path(), StartAt::First).unwrap();
    assert!(matches!(
        c.apply_sharpen(&SharpenParams::default()),
        Err(AppError::Loading(_))
    ));

    release.send(()).unwrap();
    assert!(c.wait_for_current(TIMEOUT));
    c.apply_sharpen(&SharpenParams::default()).unwrap();
}
