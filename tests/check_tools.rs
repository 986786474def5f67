//! End-to-end tests for the check handlers.
//!
//! The external tools are replaced by stub shell scripts written into a
//! temporary directory, so every path through lint, format, export
//! validation and log inspection can be exercised without gdtoolkit or a
//! Godot editor installed. Unix-only: the stubs are `/bin/sh` scripts.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tokio_test::assert_ok;

use godot_check_mcp::config::Config;
use godot_check_mcp::godot::tools::Checker;

/// Writes an executable stub script and returns its path.
fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Builds a checker whose tool binaries are the given stubs.
fn stub_checker(gdlint: &Path, gdformat: &Path, godot: &Path, timeout_secs: u64) -> Checker {
    let config: Config = serde_json::from_value(json!({
        "tools": {
            "gdlint_bin": gdlint.to_str().unwrap(),
            "gdformat_bin": gdformat.to_str().unwrap(),
            "godot_bin": godot.to_str().unwrap(),
        },
        "export": {
            "timeout_secs": timeout_secs,
        }
    }))
    .unwrap();
    Checker::new(&config)
}

/// A stub that exits zero with no output.
const CLEAN_STUB: &str = "exit 0";

fn touch_script(path: &Path) {
    fs::write(path, "extends Node\n").unwrap();
}

// =============================================================================
// Lint
// =============================================================================

#[tokio::test]
async fn lint_all_reports_the_violating_file() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    touch_script(&project.path().join("clean.gd"));
    touch_script(&project.path().join("bad.gd"));

    // Fail only for bad.gd, the way gdlint reports: stderr plus nonzero exit.
    let gdlint = write_stub(
        bins.path(),
        "gdlint",
        r#"case "$1" in
  *bad.gd) echo "Error: unused-variable 'hp'" >&2; exit 1;;
  *) exit 0;;
esac"#,
    );
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&gdlint, &other, &other, 120);

    let result = checker.lint(project.path(), None, true).await.unwrap();

    assert_eq!(result["success"], json!(false));
    assert_eq!(result["checkedFiles"], json!(2));
    let errors = result["errors"].as_str().unwrap();
    assert!(errors.contains("bad.gd"));
    assert!(errors.contains("unused-variable"));
    assert!(!errors.contains("clean.gd"), "clean file must not be reported");
}

#[tokio::test]
async fn lint_single_clean_file_passes() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let script = project.path().join("player.gd");
    touch_script(&script);

    let gdlint = write_stub(bins.path(), "gdlint", CLEAN_STUB);
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&gdlint, &other, &other, 120);

    let result = assert_ok!(checker.lint(project.path(), script.to_str(), false).await);

    assert_eq!(result["success"], json!(true));
    assert_eq!(result["output"], json!("check passed"));
    assert_eq!(result["errors"], json!(""));
}

#[tokio::test]
async fn lint_missing_binary_folds_into_result() {
    let project = tempfile::tempdir().unwrap();
    touch_script(&project.path().join("main.gd"));

    let missing = Path::new("/nonexistent/gdlint");
    let checker = stub_checker(missing, missing, missing, 120);

    let result = checker.lint(project.path(), None, true).await.unwrap();

    assert_eq!(result["success"], json!(false));
    assert!(result["errors"].as_str().unwrap().contains("failed to launch"));
}

// =============================================================================
// Format
// =============================================================================

#[tokio::test]
async fn format_check_mode_never_touches_the_file() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let script = project.path().join("ugly.gd");
    fs::write(&script, "extends Node\nvar  x=1\n").unwrap();

    // Rewrites its target unless called with --check.
    let gdformat = write_stub(
        bins.path(),
        "gdformat",
        r#"if [ "$1" = "--check" ]; then
  exit 0
fi
printf 'extends Node\nvar x = 1\n' > "$1"
exit 0"#,
    );
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&other, &gdformat, &other, 120);

    let before = fs::read(&script).unwrap();
    let result = checker
        .format(project.path(), script.to_str().unwrap(), true)
        .await
        .unwrap();
    let after = fs::read(&script).unwrap();

    assert_eq!(result["success"], json!(true));
    assert_eq!(result["formatted"], json!(false));
    assert_eq!(before, after, "check mode must not modify the file");

    // Without check, the rewrite goes through.
    let result = checker
        .format(project.path(), script.to_str().unwrap(), false)
        .await
        .unwrap();
    let rewritten = fs::read(&script).unwrap();

    assert_eq!(result["success"], json!(true));
    assert_eq!(result["formatted"], json!(true));
    assert_ne!(before, rewritten);
}

#[tokio::test]
async fn format_failure_reports_stderr() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let script = project.path().join("broken.gd");
    touch_script(&script);

    let gdformat = write_stub(
        bins.path(),
        "gdformat",
        r#"echo "unexpected token at line 3" >&2
exit 1"#,
    );
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&other, &gdformat, &other, 120);

    let result = checker
        .format(project.path(), script.to_str().unwrap(), false)
        .await
        .unwrap();

    assert_eq!(result["success"], json!(false));
    assert!(result["errors"]
        .as_str()
        .unwrap()
        .contains("unexpected token"));
}

// =============================================================================
// Export validation
// =============================================================================

/// A godot stub that records the scratch directory (the pack path's parent)
/// into `record`, then runs `tail_body`.
fn export_stub(bins: &Path, record: &Path, tail_body: &str) -> PathBuf {
    let body = format!(
        r#"for a in "$@"; do last="$a"; done
dirname "$last" > "{}"
{tail_body}"#,
        record.display()
    );
    write_stub(bins, "godot", &body)
}

fn recorded_scratch_dir(record: &Path) -> PathBuf {
    PathBuf::from(fs::read_to_string(record).unwrap().trim())
}

#[tokio::test]
async fn export_validate_passes_and_cleans_up() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let record = bins.path().join("scratch-path");

    let godot = export_stub(bins.path(), &record, "echo \"Export finished\"\nexit 0");
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&other, &other, &godot, 120);

    let result = checker
        .export_validate(project.path(), None)
        .await
        .unwrap();

    assert_eq!(result["success"], json!(true));
    assert_eq!(result["cleaned"], json!(true));

    let scratch = recorded_scratch_dir(&record);
    assert!(!scratch.exists(), "scratch dir must be removed on success");
}

#[tokio::test]
async fn export_validate_reports_error_lines_and_cleans_up() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let record = bins.path().join("scratch-path");

    let godot = export_stub(
        bins.path(),
        &record,
        r#"echo "Loading project settings"
echo "ERROR: export templates missing" >&2
echo "Identifier 'Hud' not declared in current scope" >&2
exit 1"#,
    );
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&other, &other, &godot, 120);

    let result = checker
        .export_validate(project.path(), Some("Web"))
        .await
        .unwrap();

    assert_eq!(result["success"], json!(false));
    assert_eq!(result["cleaned"], json!(true));
    let errors = result["errors"].as_str().unwrap();
    assert!(errors.contains("export templates missing"));
    assert!(errors.contains("Identifier 'Hud'"));
    assert!(!errors.contains("Loading project settings"));

    let scratch = recorded_scratch_dir(&record);
    assert!(!scratch.exists(), "scratch dir must be removed on failure");
}

#[tokio::test]
async fn export_validate_timeout_kills_and_cleans_up() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let record = bins.path().join("scratch-path");

    let godot = export_stub(bins.path(), &record, "sleep 30");
    let other = write_stub(bins.path(), "other", CLEAN_STUB);
    let checker = stub_checker(&other, &other, &godot, 1);

    let result = checker
        .export_validate(project.path(), None)
        .await
        .unwrap();

    assert_eq!(result["success"], json!(false));
    assert_eq!(result["cleaned"], json!(true));
    assert!(result["errors"].as_str().unwrap().contains("timed out"));

    let scratch = recorded_scratch_dir(&record);
    assert!(!scratch.exists(), "scratch dir must be removed on timeout");
}

// =============================================================================
// check_all
// =============================================================================

/// Stubs that append a tag to `order_log` so step ordering can be asserted.
fn ordered_stubs(
    bins: &Path,
    order_log: &Path,
    lint_tail: &str,
    format_tail: &str,
) -> (PathBuf, PathBuf, PathBuf) {
    let log = order_log.display();
    let gdlint = write_stub(bins, "gdlint", &format!("echo lint >> \"{log}\"\n{lint_tail}"));
    let gdformat = write_stub(
        bins,
        "gdformat",
        &format!("echo format >> \"{log}\"\n{format_tail}"),
    );
    let godot = write_stub(
        bins,
        "godot",
        &format!("echo export >> \"{log}\"\necho \"Export finished\"\nexit 0"),
    );
    (gdlint, gdformat, godot)
}

fn logged_order(order_log: &Path) -> Vec<String> {
    fs::read_to_string(order_log)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn check_all_runs_every_step_despite_lint_failure() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    touch_script(&project.path().join("a.gd"));
    touch_script(&project.path().join("b.gd"));
    let order_log = bins.path().join("order.log");

    let (gdlint, gdformat, godot) = ordered_stubs(
        bins.path(),
        &order_log,
        "echo \"Error: bad indent\" >&2\nexit 1",
        "exit 0",
    );
    let checker = stub_checker(&gdlint, &gdformat, &godot, 120);

    let result = checker.check_all(project.path(), None).await;

    // Lint failed, but format and export still ran, in order.
    assert_eq!(
        logged_order(&order_log),
        vec!["lint", "lint", "format", "format", "export"]
    );
    assert_eq!(result["success"], json!(false));
    assert_eq!(result["summary"], json!("Lint: FAIL | Format: OK | Export: OK"));
    assert_eq!(result["results"]["lint"]["success"], json!(false));
    assert_eq!(result["results"]["format"]["success"], json!(true));
    assert_eq!(result["results"]["export"]["success"], json!(true));
}

#[tokio::test]
async fn check_all_format_failure_does_not_gate_success() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    touch_script(&project.path().join("a.gd"));
    let order_log = bins.path().join("order.log");

    let (gdlint, gdformat, godot) = ordered_stubs(
        bins.path(),
        &order_log,
        "exit 0",
        "echo \"could not parse\" >&2\nexit 1",
    );
    let checker = stub_checker(&gdlint, &gdformat, &godot, 120);

    let result = checker.check_all(project.path(), None).await;

    assert_eq!(result["summary"], json!("Lint: OK | Format: FAIL | Export: OK"));
    // Overall success is lint AND export; format never gates it.
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["results"]["format"]["success"], json!(false));
}

#[tokio::test]
async fn check_all_scoped_to_one_file() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let script = project.path().join("a.gd");
    touch_script(&script);
    touch_script(&project.path().join("b.gd"));
    let order_log = bins.path().join("order.log");

    let (gdlint, gdformat, godot) =
        ordered_stubs(bins.path(), &order_log, "exit 0", "exit 0");
    let checker = stub_checker(&gdlint, &gdformat, &godot, 120);

    let result = checker.check_all(project.path(), script.to_str()).await;

    // One lint run and one format run for the named file only.
    assert_eq!(logged_order(&order_log), vec!["lint", "format", "export"]);
    assert_eq!(result["success"], json!(true));
}

// =============================================================================
// get_errors
// =============================================================================

#[test]
fn get_errors_reads_explicit_absolute_log() {
    let project = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log = log_dir.path().join("session.log");
    fs::write(
        &log,
        "booting\nERROR: node missing\nall good\nIdentifier 'Gem' not declared\n",
    )
    .unwrap();

    let missing = Path::new("/nonexistent/bin");
    let checker = stub_checker(missing, missing, missing, 120);

    let result = checker.get_errors(project.path(), log.to_str()).unwrap();

    assert_eq!(result["success"], json!(true));
    assert_eq!(result["count"], json!(2));
    let errors = result["errors"].as_str().unwrap();
    assert_eq!(
        errors,
        "ERROR: node missing\nIdentifier 'Gem' not declared"
    );
}

#[test]
fn get_errors_without_log_is_soft_failure() {
    let project = tempfile::tempdir().unwrap();

    let missing = Path::new("/nonexistent/bin");
    let checker = stub_checker(missing, missing, missing, 120);

    let result = checker.get_errors(project.path(), None).unwrap();

    assert_eq!(result["success"], json!(false));
    assert_eq!(result["output"], json!("log file not found"));
}

/// Result objects are plain JSON values; make sure the common fields
/// serialise the way clients expect.
#[tokio::test]
async fn results_always_carry_success_and_project() {
    let bins = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    touch_script(&project.path().join("a.gd"));

    let clean = write_stub(bins.path(), "clean", CLEAN_STUB);
    let checker = stub_checker(&clean, &clean, &clean, 120);

    let results: Vec<Value> = vec![
        checker.lint(project.path(), None, true).await.unwrap(),
        checker.export_validate(project.path(), None).await.unwrap(),
        checker.get_errors(project.path(), None).unwrap(),
    ];

    for result in results {
        assert!(result["success"].is_boolean());
        assert_eq!(
            result["project"],
            json!(project.path().display().to_string())
        );
    }
}
