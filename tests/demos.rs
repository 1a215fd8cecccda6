//! Runs every program under `demos/` through the `mino` binary
//!
//! A demo may start with `// exit: N`; otherwise it must succeed. Its standard
//! output must match the sibling `.out` file exactly.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use walkdir::WalkDir;

fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn mino() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mino"))
}

fn expected_status(source: &str) -> i32 {
    source
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("// exit:"))
        .and_then(|code| code.trim().parse().ok())
        .unwrap_or(0)
}

fn demo_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(demos_dir())
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "mino"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_demos_match_expected_output() {
    let files = demo_files();
    assert!(files.len() >= 5, "demos not found in {}", demos_dir().display());

    for file in files {
        let source = std::fs::read_to_string(&file).expect("demo is readable");
        let expected = std::fs::read_to_string(file.with_extension("out")).expect("demo has an .out file");
        let output = mino().arg("run").arg(&file).output().expect("mino runs");

        assert_eq!(
            output.status.code(),
            Some(expected_status(&source)),
            "{}: stderr was\n{}",
            file.display(),
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            expected,
            "{}: unexpected output",
            file.display()
        );
    }
}

fn run_demo(relative: &str) -> Output {
    mino()
        .arg("run")
        .arg(demos_dir().join(relative))
        .output()
        .expect("mino runs")
}

#[test]
fn test_interpreter_error_report() {
    let output = run_demo("errors/abort.mino");
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut lines = stderr.lines();
    assert_eq!(lines.next(), Some("INTERPRETER ERROR: ABORT: insufficient funds."));
    assert_eq!(lines.next(), Some(" in Object.abort()"));
    assert_eq!(lines.next(), Some(" in Account.withdraw() at line 12 position 13"));
    assert_eq!(lines.next(), Some(" in main program at line 20 position 9"));
}

#[test]
fn test_division_by_zero_report() {
    let output = run_demo("errors/division.mino");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("INTERPRETER ERROR: division by zero.\n"), "{}", stderr);
    assert!(stderr.contains(" in Ratio.of() at line 4 position 16"), "{}", stderr);
}

#[test]
fn test_semantic_error_report() {
    let output = run_demo("errors/type_mismatch.mino");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("SEMANTIC ERROR: Cannot assign a String to x.\n"), "{}", stderr);
    assert!(stderr.contains("type_mismatch.mino:3:"), "{}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_syntax_error_report() {
    let output = run_demo("errors/syntax.mino");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("SYNTAX ERROR: "), "{}", stderr);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_file() {
    let output = mino().arg("run").arg("does-not-exist.mino").output().expect("mino runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("INPUT ERROR: "));
}

#[test]
fn test_reads_standard_input() {
    let mut child = mino()
        .args(["run", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("mino starts");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"(6 * 7).to_system_out();")
        .expect("program is written");
    let output = child.wait_with_output().expect("mino finishes");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "42\n");
}

#[test]
fn test_check_dumps_tables() {
    let output = mino()
        .args(["check", "--dump-vtables", "--dump-subtypes"])
        .arg(demos_dir().join("shapes.mino"))
        .output()
        .expect("mino runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("============== SubTypes Table for Rect ==============\n1 - Rect\n2 - Square\n"));
    assert!(stdout.contains("============== Virtual Table for Square =============="));
    assert!(stdout.contains(" - Rect.area\n"));
    assert!(!stdout.contains("has area"), "check must not run the program");
}

#[test]
fn test_check_json_report() {
    let output = mino()
        .args(["check", "--format", "json"])
        .arg(demos_dir().join("shapes.mino"))
        .output()
        .expect("mino runs");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim_start().starts_with('['));
    assert!(stdout.contains("\"name\": \"Square\""), "{}", stdout);
}
