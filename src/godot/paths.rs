//! Path validation for request arguments.
//!
//! Every path-valued argument must be absolute before any filesystem access
//! happens; relative paths are rejected without consulting the process
//! working directory. Existence checks are best-effort: no lock is held
//! afterwards, so the environment may still remove or replace a path
//! between validation and use.

use std::path::Path;

use crate::godot::error::{CheckError, CheckResult};

/// Requires a non-empty, absolute project path.
///
/// # Errors
///
/// Returns [`CheckError::InvalidArgument`] if the path is empty or relative.
pub fn require_project_path(raw: &str) -> CheckResult<&Path> {
    if raw.is_empty() {
        return Err(CheckError::invalid("'project' must be provided"));
    }
    let path = Path::new(raw);
    if !path.is_absolute() {
        return Err(CheckError::invalid(format!(
            "project path must be absolute, got relative path: {raw}"
        )));
    }
    Ok(path)
}

/// Validates that a project path exists and is a directory.
///
/// # Errors
///
/// Returns [`CheckError::InvalidArgument`] if the path is relative or not a
/// directory, and [`CheckError::NotFound`] if it does not exist.
pub fn validate_project_dir(path: &Path) -> CheckResult<()> {
    if !path.is_absolute() {
        return Err(CheckError::invalid(format!(
            "project path must be absolute: {}",
            path.display()
        )));
    }
    if !path.exists() {
        return Err(CheckError::NotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(CheckError::invalid(format!(
            "project path is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Validates a file argument: non-empty, absolute, existing.
///
/// The path is deliberately not required to be a regular file: a directory
/// passes validation and fails later inside the tool run. Callers rely on
/// this leniency.
///
/// # Errors
///
/// Returns [`CheckError::InvalidArgument`] if the path is empty or relative,
/// and [`CheckError::NotFound`] if it does not exist.
pub fn validate_file(raw: &str) -> CheckResult<&Path> {
    if raw.is_empty() {
        return Err(CheckError::invalid("'file' must be provided"));
    }
    let path = Path::new(raw);
    if !path.is_absolute() {
        return Err(CheckError::invalid(format!(
            "file path must be absolute, got: {raw}"
        )));
    }
    if !path.exists() {
        return Err(CheckError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path)
}
