//! Runs the built `pftree` binary against temporary trees.
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn pftree(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pftree"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn build_test_tree(root: &Path) {
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a/one.dcm"), vec![0u8; 100]).unwrap();
    fs::write(root.join("b/two.dcm"), vec![0u8; 300]).unwrap();
    fs::write(root.join("b/three.txt"), vec![0u8; 600]).unwrap();
}

#[test]
fn json_stats_are_valid_json_on_stdout() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let input = tmp.path().to_str().unwrap();

    let out = pftree(&["--input-dir", input, "--relative-dir", "--json-stats"]);
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(stats["dirs"], 2);
    assert_eq!(stats["files"], 3);
    assert_eq!(stats["totalSize"], 1000);
    assert_eq!(stats["entries"][0]["path"], "a");
}

#[test]
fn test_mode_writes_listings_and_reports_json() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    build_test_tree(&input);

    let out = pftree(&[
        "--input-dir",
        input.to_str().unwrap(),
        "--output-dir",
        output.to_str().unwrap(),
        "--relative-dir",
        "--threads",
        "2",
        "--test",
        "0:1",
        "--json",
    ]);
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["pipeline"]["filesSaved"], 2);
    assert_eq!(report["pipeline"]["processType"], "threaded");
    assert_eq!(fs::read_to_string(output.join("b/file-ls.txt")).unwrap(), "2\n");
}

#[test]
fn missing_input_dir_exits_with_failure() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("absent");
    let out = pftree(&["--input-dir", missing.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.matches("not found").count(), 1, "reported once: {stderr}");
}

#[test]
fn test_mode_without_output_dir_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let out = pftree(&["--input-dir", tmp.path().to_str().unwrap(), "--test", "0"]);
    assert_eq!(out.status.code(), Some(1));
}
