use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::shared::constants::{FALLBACK_FONTS, FONT_EXTENSIONS};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FontResolveError {
    #[error("font '{name}' not found (searched {searched} directories)")]
    NotFound { name: String, searched: usize },
}

/// Resolve a font by file path or family name.
///
/// Resolution order:
/// 1. `font` as a path to an existing file
/// 2. `font` as a file stem in the search directories
/// 3. each of [`FALLBACK_FONTS`] in the search directories
pub fn resolve(font: &str) -> Result<PathBuf, FontResolveError> {
    resolve_in(font, &font_search_dirs())
}

/// Same as [`resolve`] but searches only the given directories.
pub fn resolve_in(font: &str, search_dirs: &[PathBuf]) -> Result<PathBuf, FontResolveError> {
    let as_path = Path::new(font);
    if as_path.is_file() {
        return Ok(as_path.to_path_buf());
    }

    let candidates = std::iter::once(font).chain(FALLBACK_FONTS.iter().copied());
    for name in candidates {
        if let Some(found) = find_by_stem(name, search_dirs) {
            if name != font {
                log::warn!("Font '{font}' not found, using '{}'", found.display());
            }
            return Ok(found);
        }
    }

    Err(FontResolveError::NotFound {
        name: font.to_string(),
        searched: search_dirs.len(),
    })
}

/// User font directory followed by the usual platform locations.
pub fn font_search_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    if let Some(user) = dirs::font_dir() {
        dirs.push(user);
    }
    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
    }
    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from("C:\\Windows\\Fonts"));
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
    }
    dirs.into_iter().filter(|d| d.is_dir()).collect()
}

fn find_by_stem(name: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let wanted = name.to_lowercase();
    search_dirs.iter().find_map(|dir| {
        WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .find(|path| is_font_named(path, &wanted))
    })
}

fn is_font_named(path: &Path, wanted_lower: &str) -> bool {
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| FONT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    let stem_ok = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase() == wanted_lower)
        .unwrap_or(false);
    ext_ok && stem_ok
}
