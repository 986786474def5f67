//! GDScript file discovery.

use std::path::{Path, PathBuf};

/// Directory names never descended into, regardless of depth.
const IGNORED_DIRS: [&str; 8] = [
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".cache",
    ".gradle",
    "build",
    "export",
];

/// Extension identifying a GDScript source file.
const SCRIPT_EXTENSION: &str = "gd";

/// Collects all `.gd` files under `root`, depth-first.
///
/// Ignored directory names and any directory starting with `.` are skipped.
/// A nonexistent root yields an empty list rather than an error; this is
/// called after project validation, so a vanished root is treated the same
/// as an empty one. Order is filesystem entry order, not sorted; callers
/// must not assume lexical order.
#[must_use]
pub fn collect_script_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    scan_dir(root, &mut files);
    files
}

fn scan_dir(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        // Unreadable or missing directory: silently skip.
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if file_type.is_dir() {
            if !IGNORED_DIRS.contains(&name) && !name.starts_with('.') {
                scan_dir(&path, files);
            }
        } else if file_type.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(SCRIPT_EXTENSION)
        {
            files.push(path);
        }
    }
}
