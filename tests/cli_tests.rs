mod common;

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    layout_path: PathBuf,
}

impl TestContext {
    fn new(layout_json: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let layout_path = dir.path().join("layout.json");
        fs::write(&layout_path, layout_json).unwrap();
        Self { dir, layout_path }
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }
}

fn keycad(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_keycad"))
        .args(args)
        .output()
        .expect("Failed to execute keycad")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_inspect_prints_matrix_and_legend() {
    let ctx = TestContext::new(r#"[["A","B"],["C","D"]]"#);
    let output = keycad(&["inspect", path_str(&ctx.layout_path), "--add-pro-micro"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "inspect failed: {}", stdout);
    assert!(stdout.contains("4 keys in 2 rows"));
    assert!(stdout.contains("Matrix: natural (2 rows x 2 cols)"));

    let legend_row = Regex::new(r"\|\s*ROW_1\s*\|\s*D3\s*\|\s*1\s*\|").unwrap();
    assert!(legend_row.is_match(&stdout), "legend missing ROW_1 -> D3:\n{}", stdout);
    let col_row = Regex::new(r"\|\s*COL_2\s*\|\s*D0\s*\|\s*6\s*\|").unwrap();
    assert!(col_row.is_match(&stdout));

    assert!(!ctx.out_dir().exists(), "inspect must not write artifacts");
}

#[test]
fn test_build_writes_artifacts() {
    let ctx = TestContext::new(common::JD40_JSON);
    let out = ctx.out_dir();
    let output = keycad(&[
        "build",
        path_str(&ctx.layout_path),
        "--add-blue-pill",
        "--add-per-key-rgb",
        "--out-dir",
        path_str(&out),
        "--output-prefix",
        "jd40",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "build failed:\n{}\n{}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );

    let wrote = Regex::new(r"Wrote (\d+) files").unwrap();
    let count: usize = wrote.captures(&stdout).unwrap()[1].parse().unwrap();
    assert_eq!(count, 7);

    for name in [
        "jd40.kicad_pcb",
        "jd40-top.kicad_pcb",
        "jd40-bottom.kicad_pcb",
        "jd40.net",
        "jd40-bom.csv",
        "jd40-user-guide.md",
    ] {
        assert!(out.join(name).is_file(), "{} missing", name);
    }

    let guide = fs::read_to_string(out.join("jd40-user-guide.md")).unwrap();
    assert!(guide.contains("build layout.json --add-blue-pill --add-per-key-rgb"));
    let digest = Regex::new(r"[0-9a-f]{64}").unwrap();
    assert!(digest.is_match(&guide), "layout digest missing from the guide");
}

#[test]
fn test_capacity_error_exits_nonzero_and_writes_nothing() {
    let ctx = TestContext::new(&common::rows_json(&[15, 15, 14, 14, 10]));
    let out = ctx.out_dir();
    let output = keycad(&[
        "build",
        path_str(&ctx.layout_path),
        "--add-pro-micro",
        "--add-per-key-rgb",
        "--out-dir",
        path_str(&out),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("❌"), "stderr: {}", stderr);
    assert!(stderr.contains("17"), "available pin count should be reported: {}", stderr);

    let leftovers = if out.exists() {
        fs::read_dir(&out).unwrap().count()
    } else {
        0
    };
    assert_eq!(leftovers, 0);
}

#[test]
fn test_both_controllers_are_rejected() {
    let ctx = TestContext::new(r#"[["A"]]"#);
    let output = keycad(&[
        "inspect",
        path_str(&ctx.layout_path),
        "--add-pro-micro",
        "--add-blue-pill",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_layout_reports_parse_error() {
    let ctx = TestContext::new(r#"[["A", 3]]"#);
    let output = keycad(&["inspect", path_str(&ctx.layout_path)]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("row 0"), "stderr: {}", stderr);
}
