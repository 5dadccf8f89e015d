//! Path normalization and file classification
//!
//! Paths arrive from several sources (review-system locations, free-form
//! user input) using either slash style. Everything downstream works on
//! plain strings in the host's canonical separator form.

use std::path::MAIN_SEPARATOR;

/// Extensions treated as single-file previews
pub const PREVIEW_EXTENSIONS: &[&str] = &[".mov", ".mp4"];

/// Extensions treated as frames of a file sequence
pub const SEQUENCE_EXTENSIONS: &[&str] = &[".exr", ".dpx", ".tif", ".tiff", ".jpg"];

/// Category of a harvested file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Preview,
    Sequence,
    Unsupported,
}

/// Replace every `/` and `\` with the host separator
pub fn normalize(path: &str) -> String {
    path.chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

/// Classify a path by its lowercased extension
///
/// Never fails; anything without a recognized extension is
/// [`FileKind::Unsupported`].
pub fn classify(path: &str) -> FileKind {
    let Some(ext) = extension(&basename(&normalize(path))) else {
        return FileKind::Unsupported;
    };

    if PREVIEW_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Preview
    } else if SEQUENCE_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Sequence
    } else {
        FileKind::Unsupported
    }
}

/// Final component of a normalized path
pub fn basename(path: &str) -> String {
    match path.rfind(MAIN_SEPARATOR) {
        Some(idx) => path[idx + MAIN_SEPARATOR.len_utf8()..].to_string(),
        None => path.to_string(),
    }
}

/// Everything before the final component of a normalized path
///
/// Empty when the path has no separator.
pub fn dirname(path: &str) -> String {
    match path.rfind(MAIN_SEPARATOR) {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// Join non-empty segments with the host separator
pub fn join(segments: &[&str]) -> String {
    let sep = MAIN_SEPARATOR.to_string();
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(&sep)
}

/// Lowercased extension including the dot, if the file name has one
///
/// Dotfiles such as `.hidden` have no extension.
fn extension(file_name: &str) -> Option<String> {
    let idx = file_name.rfind('.')?;
    if idx == 0 || idx == file_name.len() - 1 {
        return None;
    }
    Some(file_name[idx..].to_lowercase())
}
