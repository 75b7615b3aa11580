//! Console commands

use app_core::Filter;
use app_fs::{SortBy, SortOrder};
use std::path::PathBuf;

/// One user action typed at the prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Previous,
    First,
    Last,
    /// 1-based position in the visible list
    GoTo(usize),
    Open(PathBuf),
    Refresh,

    ToggleFavorite,
    ToggleCompare,
    ClearFavorites,
    ClearCompare,
    Filter(Filter),
    Sort(SortBy, SortOrder),

    Rotate,
    /// Slider position in [-100, 100]
    Brightness(i32),
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        aspect: Option<(u32, u32)>,
    },
    Sharpen {
        radius: Option<f32>,
        amount: Option<f32>,
    },
    Undo,
    Redo,

    ZoomIn,
    ZoomOut,
    ZoomReset,

    Save,
    SaveCopy,
    Delete,

    Info,
    Help,
    Quit,
}

pub const HELP: &str = "\
Navigation: next (n), prev (p), first, last, go <n>, open <dir>, refresh
Marks:      fav (f), cmp (c), clear-fav, clear-cmp
Library:    filter all|fav|nonfav|cmp, sort name|modified|size [asc|desc]
Edits:      rotate (r), bright <-100..100>, crop <x> <y> <w> <h> [w:h],
            sharpen [radius] [amount], undo (u), redo
View:       zoom-in (+), zoom-out (-), zoom-reset
Files:      save, save-copy, delete
Other:      info (i), help (?), quit (q)";

impl Command {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".into());
        };
        let args: Vec<&str> = words.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "next" | "n" => Command::Next,
            "prev" | "previous" | "p" => Command::Previous,
            "first" | "home" => Command::First,
            "last" | "end" => Command::Last,
            "go" | "goto" => {
                let position: usize = parse_arg(&args, 0, "position")?;
                if position == 0 {
                    return Err("positions start at 1".into());
                }
                Command::GoTo(position)
            }
            "open" | "cd" => {
                if args.is_empty() {
                    return Err("open needs a folder".into());
                }
                Command::Open(PathBuf::from(args.join(" ")))
            }
            "refresh" => Command::Refresh,

            "fav" | "f" => Command::ToggleFavorite,
            "cmp" | "c" => Command::ToggleCompare,
            "clear-fav" => Command::ClearFavorites,
            "clear-cmp" => Command::ClearCompare,
            "filter" => Command::Filter(parse_filter(args.first().copied())?),
            "sort" => {
                let by = match args.first().copied() {
                    Some("name") => SortBy::Name,
                    Some("modified" | "date") => SortBy::Modified,
                    Some("size") => SortBy::Size,
                    other => return Err(format!("unknown sort key: {}", other.unwrap_or(""))),
                };
                let order = match args.get(1).copied() {
                    None | Some("asc") => SortOrder::Ascending,
                    Some("desc") => SortOrder::Descending,
                    Some(other) => return Err(format!("unknown sort order: {}", other)),
                };
                Command::Sort(by, order)
            }

            "rotate" | "r" => Command::Rotate,
            "bright" | "brightness" => {
                let value: i32 = parse_arg(&args, 0, "brightness")?;
                if !(-100..=100).contains(&value) {
                    return Err("brightness must be within -100..100".into());
                }
                Command::Brightness(value)
            }
            "crop" => Command::Crop {
                x: parse_arg(&args, 0, "x")?,
                y: parse_arg(&args, 1, "y")?,
                width: parse_arg(&args, 2, "width")?,
                height: parse_arg(&args, 3, "height")?,
                aspect: args.get(4).map(|a| parse_aspect(a)).transpose()?,
            },
            "sharpen" => Command::Sharpen {
                radius: parse_finite(&args, 0, "radius")?,
                amount: parse_finite(&args, 1, "amount")?,
            },
            "undo" | "u" => Command::Undo,
            "redo" => Command::Redo,

            "zoom-in" | "+" => Command::ZoomIn,
            "zoom-out" | "-" => Command::ZoomOut,
            "zoom-reset" | "fit" => Command::ZoomReset,

            "save" => Command::Save,
            "save-copy" => Command::SaveCopy,
            "delete" | "del" => Command::Delete,

            "info" | "i" => Command::Info,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command: {}", other)),
        };
        Ok(command)
    }
}

fn parse_arg<T: std::str::FromStr>(args: &[&str], index: usize, name: &str) -> Result<T, String> {
    let raw = args.get(index).ok_or_else(|| format!("missing {}", name))?;
    raw.parse().map_err(|_| format!("invalid {}: {}", name, raw))
}

fn parse_optional<T: std::str::FromStr>(args: &[&str], index: usize, name: &str) -> Result<Option<T>, String> {
    match args.get(index) {
        Some(_) => parse_arg(args, index, name).map(Some),
        None => Ok(None),
    }
}

fn parse_finite(args: &[&str], index: usize, name: &str) -> Result<Option<f32>, String> {
    match parse_optional::<f32>(args, index, name)? {
        Some(value) if !value.is_finite() => Err(format!("invalid {}: {}", name, value)),
        value => Ok(value),
    }
}

fn parse_filter(arg: Option<&str>) -> Result<Filter, String> {
    match arg {
        Some("all") | None => Ok(Filter::All),
        Some("fav" | "favorites") => Ok(Filter::Favorites),
        Some("nonfav" | "non-favorites") => Ok(Filter::NonFavorites),
        Some("cmp" | "compare") => Ok(Filter::Compare),
        Some(other) => Err(format!("unknown filter: {}", other)),
    }
}

fn parse_aspect(arg: &str) -> Result<(u32, u32), String> {
    let (w, h) = arg
        .split_once(':')
        .ok_or_else(|| format!("aspect must be 'W:H', got: {}", arg))?;
    let w: u32 = w.parse().map_err(|_| format!("invalid aspect width: {}", w))?;
    let h: u32 = h.parse().map_err(|_| format!("invalid aspect height: {}", h))?;
    if w == 0 || h == 0 {
        return Err("aspect sides must be positive".into());
    }
    Ok((w, h))
}
