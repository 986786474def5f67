//! Per-operation check handlers.
//!
//! Each handler mirrors one MCP tool: it validates its arguments, runs the
//! external tool(s), and shapes a JSON result object with at least a
//! `success` flag. Tool failures (nonzero exit, error output, missing
//! binary) are folded into the result; only argument and path validation
//! produce a [`CheckError`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde_json::{json, Value};

use crate::config::{Config, ExportConfig, ToolsConfig};
use crate::godot::error::{CheckError, CheckResult};
use crate::godot::exec::{run_command, CommandOutput, RunOptions};
use crate::godot::paths::validate_file;
use crate::godot::scan::collect_script_files;

/// Default log file consulted by `godot_get_errors` when the caller gives
/// none: `<project>/logs/godot.log`.
const DEFAULT_LOG_NAME: &str = "godot.log";

/// How many error lines the export report keeps (from the head).
const EXPORT_ERROR_LINES: usize = 20;

/// How many log lines `get_errors` returns (from the tail).
const LOG_ERROR_LINES: usize = 50;

/// Returns whether tool output should be classified as failing.
///
/// Case-insensitive substring scan, matching how gdlint and the Godot
/// editor both spell their diagnostics.
fn contains_error(text: &str) -> bool {
    text.to_ascii_lowercase().contains("error")
}

/// Line filter for error reports: ERROR/Error/error plus the
/// `Identifier ... not declared` diagnostics Godot emits without an
/// "error" prefix.
fn error_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("(?i)error|identifier").expect("static pattern"))
}

/// Runs the project checks configured for this server.
pub struct Checker {
    tools: ToolsConfig,
    export: ExportConfig,
}

impl Checker {
    /// Creates a checker from the loaded configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            tools: config.tools.clone(),
            export: config.export.clone(),
        }
    }

    /// Runs `gdlint` for one file or for every script in the project.
    ///
    /// With `all`, every `.gd` file is linted sequentially and failures are
    /// concatenated into one report with a `[filepath]` header per file.
    /// Without it, `file` is required, validated, and linted once.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] for a missing or invalid `file` argument.
    pub async fn lint(
        &self,
        project: &Path,
        file: Option<&str>,
        all: bool,
    ) -> CheckResult<Value> {
        if all {
            return Ok(self.lint_all(project).await);
        }

        let file = file.ok_or_else(|| CheckError::invalid("'file' must be provided"))?;
        let target = validate_file(file)?;

        let result = match self.run_gdlint(target).await {
            Err(e) => json!({
                "success": false,
                "output": "",
                "errors": e.to_string(),
                "project": project_field(project),
            }),
            Ok(out) if !out.success() || contains_error(&out.stderr) => json!({
                "success": false,
                "output": out.stdout,
                "errors": out.stderr,
                "project": project_field(project),
            }),
            Ok(out) => json!({
                "success": true,
                "output": if out.stdout.is_empty() { "check passed".to_string() } else { out.stdout },
                "errors": "",
                "project": project_field(project),
            }),
        };
        Ok(result)
    }

    /// Lints every script file in the project, aggregating failures.
    async fn lint_all(&self, project: &Path) -> Value {
        let files = collect_script_files(project);
        let mut report = String::new();
        let mut has_error = false;

        for file in &files {
            let failure = match self.run_gdlint(file).await {
                Err(e) => Some(e.to_string()),
                Ok(out) if !out.success() || contains_error(&out.stderr) => {
                    Some(failure_text(&out))
                }
                Ok(_) => None,
            };

            if let Some(text) = failure {
                has_error = true;
                report.push_str(&format!("[{}]\n{text}\n", file.display()));
            }
        }

        tracing::debug!(checked = files.len(), failed = has_error, "lint pass finished");

        json!({
            "success": !has_error,
            "output": if has_error { "lint errors found" } else { "all files passed" },
            "errors": report,
            "checkedFiles": files.len(),
            "project": project_field(project),
        })
    }

    async fn run_gdlint(&self, target: &Path) -> CheckResult<CommandOutput> {
        run_command(
            &self.tools.gdlint_bin,
            [target.as_os_str()],
            RunOptions::default(),
        )
        .await
    }

    /// Runs `gdformat` on one file, either checking or rewriting in place.
    ///
    /// With `check`, the formatter runs in `--check` mode and never touches
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError`] for an invalid `file` argument.
    pub async fn format(
        &self,
        project: &Path,
        file: &str,
        check: bool,
    ) -> CheckResult<Value> {
        let target = validate_file(file)?;

        let mut args: Vec<&OsStr> = Vec::new();
        if check {
            args.push(OsStr::new("--check"));
        }
        args.push(target.as_os_str());

        let run = run_command(
            &self.tools.gdformat_bin,
            args,
            RunOptions {
                cwd: Some(project),
                ..RunOptions::default()
            },
        )
        .await;

        let result = match run {
            Err(e) => json!({
                "success": false,
                "output": "",
                "errors": e.to_string(),
                "project": project_field(project),
            }),
            Ok(out) if out.success() => json!({
                "success": true,
                "output": if check { "formatting is correct" } else { "formatting complete" },
                "formatted": !check,
                "project": project_field(project),
            }),
            Ok(out) => json!({
                "success": false,
                "output": out.stdout,
                "errors": if out.stderr.is_empty() { "format error".to_string() } else { out.stderr },
                "project": project_field(project),
            }),
        };
        Ok(result)
    }

    /// Validates project dependencies via a headless export pack build.
    ///
    /// The pack is written into a scratch directory that is removed on
    /// every exit path (success, tool failure, timeout, panic) by the
    /// [`tempfile::TempDir`] guard. Combined stdout+stderr is scanned for
    /// the error pattern; the first twenty matching lines become the
    /// report. With no `preset`, the configured default applies.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::Io`] if the scratch directory cannot be
    /// created.
    pub async fn export_validate(
        &self,
        project: &Path,
        preset: Option<&str>,
    ) -> CheckResult<Value> {
        let preset = preset.unwrap_or(&self.export.default_preset);
        let scratch = tempfile::tempdir().map_err(|e| CheckError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
        let pack_path = scratch.path().join("validate.pck");

        let args: Vec<&OsStr> = vec![
            OsStr::new("--headless"),
            OsStr::new("--path"),
            project.as_os_str(),
            OsStr::new("--export-pack"),
            OsStr::new(preset),
            pack_path.as_os_str(),
        ];

        let run = run_command(
            &self.tools.godot_bin,
            args,
            RunOptions {
                cwd: Some(project),
                timeout: Some(Duration::from_secs(self.export.timeout_secs)),
            },
        )
        .await;

        let result = match run {
            Err(e) => json!({
                "success": false,
                "output": "validation failed",
                "errors": e.to_string(),
                "cleaned": true,
                "project": project_field(project),
            }),
            Ok(out) => {
                let combined = format!("{}\n{}", out.stdout, out.stderr);
                if contains_error(&combined) || !out.success() {
                    let lines: Vec<&str> = combined
                        .lines()
                        .filter(|line| error_line_pattern().is_match(line))
                        .take(EXPORT_ERROR_LINES)
                        .collect();
                    let errors = if lines.is_empty() {
                        out.stderr.trim().to_string()
                    } else {
                        lines.join("\n")
                    };
                    json!({
                        "success": false,
                        "output": "dependency errors found",
                        "errors": errors,
                        "cleaned": true,
                        "project": project_field(project),
                    })
                } else {
                    json!({
                        "success": true,
                        "output": "project validation passed",
                        "cleaned": true,
                        "project": project_field(project),
                    })
                }
            }
        };

        // `scratch` drops here; the directory is gone before the caller
        // sees the result.
        Ok(result)
    }

    /// Runs lint, then format (in place), then export validation.
    ///
    /// All three steps always run, whatever the earlier ones report.
    /// Overall success is `lint && export`; the format step's outcome is
    /// reported but never gates the aggregate.
    pub async fn check_all(&self, project: &Path, file: Option<&str>) -> Value {
        let mut summary = Vec::with_capacity(3);

        let lint = self
            .lint(project, file, file.is_none())
            .await
            .unwrap_or_else(step_failure);
        summary.push(format!("Lint: {}", ok_or_fail(&lint)));

        let format = match file {
            Some(file) => self
                .format(project, file, false)
                .await
                .unwrap_or_else(step_failure),
            None => self.format_all(project).await,
        };
        summary.push(format!("Format: {}", ok_or_fail(&format)));

        let export = self
            .export_validate(project, None)
            .await
            .unwrap_or_else(step_failure);
        summary.push(format!("Export: {}", ok_or_fail(&export)));

        let success = step_succeeded(&lint) && step_succeeded(&export);

        json!({
            "success": success,
            "results": {
                "lint": lint,
                "format": format,
                "export": export,
                "summary": summary,
            },
            "summary": summary.join(" | "),
            "project": project_field(project),
        })
    }

    /// Formats every script file in place, stopping at the first failure.
    async fn format_all(&self, project: &Path) -> Value {
        for file in collect_script_files(project) {
            let run = run_command(
                &self.tools.gdformat_bin,
                [file.as_os_str()],
                RunOptions {
                    cwd: Some(project),
                    ..RunOptions::default()
                },
            )
            .await;

            let failure = match run {
                Err(e) => Some(e.to_string()),
                Ok(out) if !out.success() => Some(failure_text(&out)),
                Ok(_) => None,
            };

            if let Some(text) = failure {
                return json!({
                    "success": false,
                    "errors": format!("[{}]\n{text}", file.display()),
                });
            }
        }

        json!({
            "success": true,
            "output": "formatting complete",
        })
    }

    /// Extracts recent error lines from an engine log file.
    ///
    /// An explicit `log_file` must be absolute; otherwise the default
    /// `<project>/logs/godot.log` is consulted. A missing log is a normal
    /// `success: false` result, not an error. Matching lines are returned
    /// from the tail, at most fifty, in original file order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckError::InvalidArgument`] for a relative `log_file`
    /// and [`CheckError::Io`] if an existing log cannot be read.
    pub fn get_errors(&self, project: &Path, log_file: Option<&str>) -> CheckResult<Value> {
        let log_path = match log_file {
            Some(raw) => {
                if !Path::new(raw).is_absolute() {
                    return Err(CheckError::invalid(format!(
                        "log file path must be absolute, got: {raw}"
                    )));
                }
                PathBuf::from(raw)
            }
            None => project.join("logs").join(DEFAULT_LOG_NAME),
        };

        if !log_path.exists() {
            return Ok(json!({
                "success": false,
                "output": "log file not found",
                "project": project_field(project),
            }));
        }

        let content = std::fs::read_to_string(&log_path).map_err(|e| CheckError::Io {
            path: log_path.clone(),
            source: e,
        })?;

        let matches: Vec<&str> = content
            .lines()
            .filter(|line| error_line_pattern().is_match(line))
            .collect();
        let tail = &matches[matches.len().saturating_sub(LOG_ERROR_LINES)..];

        Ok(json!({
            "success": true,
            "errors": tail.join("\n"),
            "count": tail.len(),
            "project": project_field(project),
        }))
    }
}

/// The `project` field every result object carries.
fn project_field(project: &Path) -> String {
    project.display().to_string()
}

/// Best failure text for a finished-but-failed tool run.
fn failure_text(out: &CommandOutput) -> String {
    if out.stderr.trim().is_empty() {
        if out.stdout.trim().is_empty() {
            format!("exit code {}", out.exit_code.unwrap_or(-1))
        } else {
            out.stdout.clone()
        }
    } else {
        out.stderr.clone()
    }
}

/// Folds a validation error from a `check_all` step into that step's
/// result, so the remaining steps still run.
fn step_failure(error: CheckError) -> Value {
    json!({ "success": false, "errors": error.to_string() })
}

fn step_succeeded(step: &Value) -> bool {
    step["success"].as_bool().unwrap_or(false)
}

fn ok_or_fail(step: &Value) -> &'static str {
    if step_succeeded(step) {
        "OK"
    } else {
        "FAIL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_substring_is_case_insensitive() {
        assert!(contains_error("ERROR: something broke"));
        assert!(contains_error("Parse Error at line 3"));
        assert!(contains_error("scripterror"));
        assert!(!contains_error("all clear"));
    }

    #[test]
    fn line_pattern_matches_identifier_diagnostics() {
        let re = error_line_pattern();
        assert!(re.is_match("ERROR: export failed"));
        assert!(re.is_match("Identifier 'Foo' not declared in current scope"));
        assert!(re.is_match("error: bad token"));
        assert!(!re.is_match("Loading project settings"));
    }

    #[test]
    fn failure_text_prefers_stderr() {
        let out = CommandOutput {
            exit_code: Some(1),
            stdout: "partial".to_string(),
            stderr: "lint failed".to_string(),
        };
        assert_eq!(failure_text(&out), "lint failed");

        let silent = CommandOutput {
            exit_code: Some(3),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(failure_text(&silent), "exit code 3");
    }

    #[test]
    fn summary_labels() {
        assert_eq!(ok_or_fail(&json!({"success": true})), "OK");
        assert_eq!(ok_or_fail(&json!({"success": false})), "FAIL");
        assert_eq!(ok_or_fail(&json!({})), "FAIL");
    }

    #[test]
    fn get_errors_missing_log_is_soft_failure() {
        let dir = tempfile::tempdir().unwrap();
        let checker = Checker::new(&Config::default());

        let result = checker.get_errors(dir.path(), None).unwrap();
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["output"], json!("log file not found"));
    }

    #[test]
    fn get_errors_rejects_relative_log_path() {
        let dir = tempfile::tempdir().unwrap();
        let checker = Checker::new(&Config::default());

        let result = checker.get_errors(dir.path(), Some("logs/godot.log"));
        assert!(matches!(result, Err(CheckError::InvalidArgument { .. })));
    }

    #[test]
    fn get_errors_returns_tail_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        std::fs::create_dir_all(&logs).unwrap();

        let mut content = String::new();
        for i in 0..60 {
            content.push_str(&format!("ERROR: problem {i}\n"));
            content.push_str("info: fine\n");
        }
        std::fs::write(logs.join(DEFAULT_LOG_NAME), content).unwrap();

        let checker = Checker::new(&Config::default());
        let result = checker.get_errors(dir.path(), None).unwrap();

        assert_eq!(result["success"], json!(true));
        assert_eq!(result["count"], json!(50));
        let errors = result["errors"].as_str().unwrap();
        let lines: Vec<&str> = errors.lines().collect();
        assert_eq!(lines.len(), 50);
        // Tail of 60 matches: problems 10..=59, original order preserved.
        assert_eq!(lines[0], "ERROR: problem 10");
        assert_eq!(lines[49], "ERROR: problem 59");
    }

    #[tokio::test]
    async fn lint_requires_file_when_not_all() {
        let dir = tempfile::tempdir().unwrap();
        let checker = Checker::new(&Config::default());

        let result = checker.lint(dir.path(), None, false).await;
        assert!(matches!(result, Err(CheckError::InvalidArgument { .. })));
    }
}
