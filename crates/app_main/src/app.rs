//! Application main loop

use crate::command::{Command, HELP};
use anyhow::Result;
use app_core::transform::brightness_from_slider;
use app_core::{
    AppError, AppState, CropRect, CropSpec, LibraryController, MarkSet, Notice, SaveMode,
    SharpenParams, StartAt,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

/// How long a command waits for the image it selected
const LOAD_WAIT: Duration = Duration::from_secs(30);

/// What the loop should do after a command
enum Flow {
    Continue,
    Quit,
}

/// Run the interactive session until `quit` or end of input
pub fn run<R: BufRead, W: Write>(state: &AppState, start: Option<PathBuf>, input: R, mut out: W) -> Result<()> {
    let mut controller = state.controller();

    let (directory, start_at) = match start {
        Some(path) if path.is_file() => {
            let dir = path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            (Some(dir), StartAt::Path(path))
        }
        Some(path) => (Some(path), StartAt::First),
        None => {
            let config = state.config.read();
            let last = config
                .general
                .load_last_folder
                .then(|| config.general.last_directory.clone())
                .flatten();
            (last, StartAt::Index(config.general.last_index))
        }
    };

    match directory {
        Some(dir) => {
            controller.open_directory(&dir, start_at)?;
            controller.wait_for_current(LOAD_WAIT);
            print_status(&mut controller, &mut out)?;
        }
        None => writeln!(out, "No folder open. Use 'open <dir>'.")?,
    }

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{} (type 'help')", message)?;
                continue;
            }
        };

        tracing::debug!(?command, "Console command");
        match execute(&mut controller, &command, &mut out) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) if e.is_recoverable() => {
                tracing::warn!("{:?} failed: {}", command, e);
                writeln!(out, "{}", e.user_message())?;
            }
            Err(e) => return Err(e.into()),
        }

        controller.pump();
        for notice in controller.take_notices() {
            writeln!(out, "{}", describe(&notice))?;
        }
    }

    state.remember_session(&controller);
    Ok(())
}

fn execute<W: Write>(controller: &mut LibraryController, command: &Command, out: &mut W) -> Result<Flow, AppError> {
    let show_status = match command {
        Command::Next => controller.next(),
        Command::Previous => controller.previous(),
        Command::First => controller.first(),
        Command::Last => controller.last(),
        Command::GoTo(position) => controller.go_to(position - 1),
        Command::Open(dir) => {
            controller.open_directory(dir, StartAt::First)?;
            true
        }
        Command::Refresh => {
            controller.refresh()?;
            true
        }

        Command::ToggleFavorite => {
            let on = controller.toggle_favorite()?;
            writeln!(out, "{}", if on { "Added to favorites" } else { "Removed from favorites" })?;
            true
        }
        Command::ToggleCompare => {
            let on = controller.toggle_compare()?;
            writeln!(out, "{}", if on { "Added to compare" } else { "Removed from compare" })?;
            true
        }
        Command::ClearFavorites => controller.clear_favorites()?,
        Command::ClearCompare => controller.clear_compare()?,
        Command::Filter(filter) => {
            controller.set_filter(*filter)?;
            true
        }
        Command::Sort(by, order) => {
            controller.set_sort(*by, *order)?;
            true
        }

        Command::Rotate => {
            controller.rotate_clockwise()?;
            true
        }
        Command::Brightness(value) => {
            controller.begin_brightness()?;
            controller.set_brightness(brightness_from_slider(*value))?;
            controller.end_brightness();
            true
        }
        Command::Crop {
            x,
            y,
            width,
            height,
            aspect,
        } => {
            let rotation = controller.viewer().rotation();
            let spec = CropSpec {
                rect: CropRect::new(*x, *y, *width, *height),
                rotation,
                aspect: *aspect,
            };
            // The crop carries the rotation itself, so pending parameters are dropped
            controller.apply_crop(&spec, true)?;
            true
        }
        Command::Sharpen { radius, amount } => {
            let defaults = SharpenParams::default();
            let params = SharpenParams {
                radius: radius.unwrap_or(defaults.radius),
                amount: amount.unwrap_or(defaults.amount),
                ..defaults
            };
            controller.apply_sharpen(&params)?;
            true
        }
        Command::Undo => {
            if controller.undo()?.is_none() {
                writeln!(out, "Nothing to undo")?;
            }
            true
        }
        Command::Redo => {
            if controller.redo()?.is_none() {
                writeln!(out, "Nothing to redo")?;
            }
            true
        }

        Command::ZoomIn => {
            controller.view_mut().zoom_in();
            true
        }
        Command::ZoomOut => {
            controller.view_mut().zoom_out();
            true
        }
        Command::ZoomReset => {
            controller.view_mut().reset();
            true
        }

        Command::Save => {
            let path = controller.save_current(SaveMode::Overwrite)?;
            writeln!(out, "Saved {}", path)?;
            true
        }
        Command::SaveCopy => {
            let path = controller.save_current(SaveMode::Copy)?;
            writeln!(out, "Saved copy {}", path)?;
            true
        }
        Command::Delete => {
            let path = controller.delete_current()?;
            writeln!(out, "Deleted {}", path)?;
            true
        }

        Command::Info => {
            print_info(controller, out)?;
            false
        }
        Command::Help => {
            writeln!(out, "{}", HELP)?;
            false
        }
        Command::Quit => return Ok(Flow::Quit),
    };

    if show_status {
        controller.wait_for_current(LOAD_WAIT);
        print_status(controller, out)?;
    }
    Ok(Flow::Continue)
}

/// One-line summary of the current image
fn print_status<W: Write>(controller: &mut LibraryController, out: &mut W) -> std::io::Result<()> {
    let Some(path) = controller.current_path().cloned() else {
        return writeln!(out, "[0/0] (no images)");
    };

    let mut flags = String::new();
    if controller.is_favorite() {
        flags.push('*');
    }
    if controller.is_in_compare() {
        flags.push('=');
    }
    if controller.viewer().is_modified() {
        flags.push('~');
    }

    let size = match controller.display_pixels() {
        Some(pixels) => format!("{}x{}", pixels.width(), pixels.height()),
        None => controller
            .viewer()
            .load_error()
            .map(|e| format!("error: {}", e))
            .unwrap_or_else(|| "loading".to_string()),
    };

    writeln!(
        out,
        "[{}/{}] {} {} {} ({})",
        controller.current_index() + 1,
        controller.library().len(),
        path.file_name().unwrap_or_default(),
        size,
        flags,
        controller.filter().name()
    )
}

fn print_info<W: Write>(controller: &mut LibraryController, out: &mut W) -> std::io::Result<()> {
    print_status(controller, out)?;

    let viewer = controller.viewer();
    writeln!(
        out,
        "rotation {}°, brightness {:.2}, zoom {:.2}{}",
        viewer.rotation(),
        viewer.brightness(),
        viewer.view.zoom,
        if viewer.view.auto_fit { " (fit)" } else { "" }
    )?;

    if let Some(path) = controller.current_path() {
        writeln!(
            out,
            "undo {} / redo {}",
            controller.history().get(path).map(|h| h.undo_len()).unwrap_or(0),
            controller.history().get(path).map(|h| h.redo_len()).unwrap_or(0),
        )?;
    }

    writeln!(
        out,
        "favorites {}, compare {}",
        controller.favorite_count(),
        controller.compare_count()
    )
}

fn describe(notice: &Notice) -> String {
    match notice {
        Notice::FilterFallback { requested } => {
            format!("No images match '{}'; showing all images", requested.name())
        }
        Notice::FilterReset { previous } => {
            format!("Filter '{}' reset to 'all' for the new folder", previous.name())
        }
        Notice::NothingToClear(MarkSet::Favorites) => "There are no favorites to clear".to_string(),
        Notice::NothingToClear(MarkSet::Compare) => "The compare set is already empty".to_string(),
        Notice::LoadFailed { path, message } => format!("Cannot show {}: {}", path, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_core::AppConfig;

    fn session(dir: &std::path::Path, script: &str) -> (AppState, String) {
        let mut config = AppConfig::default();
        config.cache.worker_threads = 1;
        config.library.use_recycle_bin = false;
        config.general.load_last_folder = false;
        let state = AppState::new(config).unwrap();

        let mut out = Vec::new();
        run(&state, Some(dir.to_path_buf()), script.as_bytes(), &mut out).unwrap();
        (state, String::from_utf8(out).unwrap())
    }

    fn folder(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            image::RgbaImage::from_pixel(4, 2, image::Rgba([9, 9, 9, 255]))
                .save(dir.path().join(name))
                .unwrap();
        }
        dir
    }

    #[test]
    fn test_session_navigates_and_marks() {
        let dir = folder(&["a.png", "b.png"]);
        let (state, out) = session(dir.path(), "n\nfav\nfilter fav\nq\n");

        assert!(out.contains("[1/2] a.png 4x2"));
        assert!(out.contains("[2/2] b.png 4x2"));
        assert!(out.contains("Added to favorites"));
        assert!(out.contains("[1/1] b.png"));
        assert_eq!(state.config.read().general.last_index, 0);
    }

    #[test]
    fn test_session_reports_errors_and_notices() {
        let dir = folder(&["a.png"]);
        let (_, out) = session(dir.path(), "bogus\nclear-cmp\nfilter cmp\nundo\n");

        assert!(out.contains("unknown command: bogus"));
        assert!(out.contains("The compare set is already empty"));
        assert!(out.contains("No images match 'compare'"));
        assert!(out.contains("Nothing to undo"));
    }

    #[test]
    fn test_session_edits_and_saves_copy() {
        let dir = folder(&["a.png"]);
        let (_, out) = session(dir.path(), "rotate\nsave-copy\n");

        assert!(out.contains("[1/1] a.png 2x4 ~"));
        assert!(out.contains("Saved copy"));
        assert!(dir.path().join("a_copy.png").exists());
        assert!(out.contains("[2/2] a_copy.png 2x4"));
    }

    #[test]
    fn test_session_survives_oversized_sharpen() {
        let dir = folder(&["a.png"]);
        let (_, out) = session(dir.path(), "sharpen 1e30\nsharpen nan\ninfo\n");

        assert!(out.contains("Invalid edit: Sharpen radius"));
        assert!(out.contains("invalid radius: NaN"));
        assert!(out.contains("undo 0 / redo 0"));
    }

    #[test]
    fn test_session_opens_file_argument_at_that_file() {
        let dir = folder(&["a.png", "b.png"]);
        let (_, out) = session(&dir.path().join("b.png"), "");
        assert!(out.contains("[2/2] b.png"));
    }
}
